/**
 * SDK-wide constants.
 *
 * These values identify the client to the collector, both in the
 * `X-Sentry-Auth` header and in the `sdk` block of every event.
 */

/// SDK name reported in the `sdk` block of every event.
pub const SDK_NAME: &str = "beacon-rust";

/// Client identifier sent as `sentry_client` in the auth header.
/// Derived at compile time from the `beacon_core` package version.
pub const CLIENT_VERSION: &str = concat!("beacon-rust/", env!("CARGO_PKG_VERSION"));

/// Version of the collector's store protocol this client speaks.
pub const PROTOCOL_VERSION: u32 = 7;

/// Name of the authentication header.
pub const AUTH_HEADER: &str = "X-Sentry-Auth";

/// Platform tag attached to events built by this crate.
pub const PLATFORM: &str = "rust";
