/*!
 * Logging capability injected into the sender.
 *
 * The sender only ever logs at two levels: debug for the outgoing body and
 * the response, error for transport failures. Routing through a trait
 * object keeps the sender testable without a global subscriber.
 */

/// Leveled log sink used by the transport.
pub trait Log: Send + Sync {
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing` under the `beacon` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl Log for TracingLog {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "beacon", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "beacon", "{message}");
    }
}
