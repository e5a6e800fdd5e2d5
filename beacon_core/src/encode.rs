/*!
 * Event Encoder: event → JSON bytes.
 */
use serde::Serialize;

use crate::error::Result;

/**
 * Serializes an event into the exact bytes that go on the wire.
 *
 * Compact JSON, no trailing newline, nothing rewritten afterwards. Fails
 * when the event's representation cannot be expressed as JSON, e.g. a map
 * keyed by something other than strings or a `Serialize` impl that errors.
 */
pub fn encode<E: Serialize + ?Sized>(event: &E) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(event)?)
}
