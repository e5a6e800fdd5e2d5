/*!
 * Transport layer — HTTP delivery and background execution.
 *
 * Everything related to *how* we deliver payloads:
 * - `http` — request construction, ureq execution, status classification
 * - `dispatch` — per-send background thread, completion, flush tracking
 */

pub mod dispatch;
pub mod http;

pub use dispatch::{Delivery, Dispatcher, Finished};
pub use http::{is_success_status, OutboundRequest, Transport};
