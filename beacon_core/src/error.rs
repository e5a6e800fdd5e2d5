use thiserror::Error;

/// Errors surfaced by `beacon_core`.
///
/// Only configuration (DSN parsing) returns these to the caller. Sending
/// never does: encode and transport failures are logged and reported as a
/// `false` outcome.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid DSN ({0})")]
    InvalidDsn(String),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
