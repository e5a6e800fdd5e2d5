/**
 * The client — entry point that chains the encoder and the sender.
 *
 * ```text
 *  send_event(&event) ──encode──► send_data(bytes) ──► Dispatcher ──► finished(bool)
 * ```
 *
 * Each call is independent: a fresh request, a fresh background thread,
 * one outcome. The only state shared between sends is the read-only
 * endpoint and the in-flight counter used by `flush`.
 *
 * Nothing here returns an error once the client exists. Failures are
 * logged and reported as `false` through the callback and the `Delivery`.
 */
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::encode::encode;
use crate::error::Result;
use crate::log::{Log, TracingLog};
use crate::protocol::dsn::{Dsn, Endpoint};
use crate::transport::dispatch::Completion;
use crate::transport::{Delivery, Dispatcher, Finished, OutboundRequest, Transport};

/// How long dropping a `Client` waits for in-flight sends by default.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/**
 * Client configuration. All fields have defaults.
 *
 * ```ignore
 * let client = Client::from_dsn(dsn, Options {
 *     shutdown_timeout: Duration::from_secs(5),
 *     ..Default::default()
 * })?;
 * ```
 */
#[derive(Clone)]
pub struct Options {
    /// Log sink for request/response diagnostics. Defaults to `TracingLog`.
    pub log: Arc<dyn Log>,

    /// Maximum time `Drop` blocks waiting for in-flight sends.
    pub shutdown_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log: Arc::new(TracingLog),
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct Client {
    endpoint: Box<dyn Endpoint>,
    dispatcher: Dispatcher,
    shutdown_timeout: Duration,
}

impl Client {
    pub fn new(endpoint: impl Endpoint + 'static, options: Options) -> Self {
        Self {
            endpoint: Box::new(endpoint),
            dispatcher: Dispatcher::new(Transport::new(options.log)),
            shutdown_timeout: options.shutdown_timeout,
        }
    }

    /**
     * Parses `dsn` and builds a client for it.
     *
     * # Returns
     * `Err(Error::InvalidDsn)` if the DSN is malformed.
     */
    pub fn from_dsn(dsn: &str, options: Options) -> Result<Self> {
        Ok(Self::new(Dsn::parse(dsn)?, options))
    }

    pub fn endpoint(&self) -> &dyn Endpoint {
        self.endpoint.as_ref()
    }

    /**
     * Encodes `event` as JSON and sends it.
     *
     * If encoding fails nothing is sent: the error is logged and `finished`
     * is called with `false` right away, on the caller's thread.
     */
    pub fn send_event<E>(&self, event: &E, finished: Option<Finished>) -> Delivery
    where
        E: Serialize + ?Sized,
    {
        match encode(event) {
            Ok(data) => self.send_data(data, finished),
            Err(err) => {
                let log = self.dispatcher.log();
                log.error(&format!("error = {err}"));

                let (completion, delivery) = Completion::new(finished, Arc::clone(log));
                completion.complete(false);
                delivery
            }
        }
    }

    /**
     * Sends a raw payload and returns without waiting for the response.
     *
     * The payload goes out verbatim as the request body. `finished` is
     * called exactly once from the background thread with `true` iff the
     * collector answered with a 2xx status.
     */
    pub fn send_data(&self, data: impl Into<Vec<u8>>, finished: Option<Finished>) -> Delivery {
        let request = OutboundRequest::new(self.endpoint(), data.into());
        self.dispatcher.dispatch(request, finished)
    }

    /**
     * Blocks until every send issued so far has resolved, or `timeout`
     * elapses.
     *
     * # Returns
     * `true` if nothing was left in flight.
     */
    pub fn flush(&self, timeout: Duration) -> bool {
        self.dispatcher.flush(timeout)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if !self.flush(self.shutdown_timeout) {
            self.dispatcher
                .log()
                .error("error = flush timed out, some events may not have been sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crossbeam_channel::Receiver;
    use serde_json::json;

    use super::*;
    use crate::error::Error;
    use crate::testing::{unreachable_dsn, RecordingLog, TestServer, WAIT};
    use crate::Event;

    fn client(endpoint: Dsn, log: &Arc<RecordingLog>) -> Client {
        Client::new(
            endpoint,
            Options {
                log: log.clone(),
                ..Default::default()
            },
        )
    }

    /// A callback that forwards its outcome into a channel.
    fn outcome_channel() -> (Finished, Receiver<bool>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let finished: Finished = Box::new(move |success| {
            let _ = sender.send(success);
        });
        (finished, receiver)
    }

    #[test]
    fn test_event_delivered() {
        let server = TestServer::start(200, "{}");
        let log = Arc::new(RecordingLog::default());
        let client = client(server.dsn(), &log);
        let (finished, outcome) = outcome_channel();

        client.send_event(&json!({"message": "test"}), Some(finished));

        assert_eq!(outcome.recv_timeout(WAIT), Ok(true));
        let request = server.next_request().unwrap();
        assert_eq!(request.body, br#"{"message":"test"}"#);
    }

    #[test]
    fn test_not_found_reports_failure() {
        let server = TestServer::start(404, "");
        let log = Arc::new(RecordingLog::default());
        let client = client(server.dsn(), &log);
        let (finished, outcome) = outcome_channel();

        client.send_data(br#"{"message":"test"}"#.to_vec(), Some(finished));

        assert_eq!(outcome.recv_timeout(WAIT), Ok(false));
        assert!(log.debug_lines().contains(&"status = 404".to_string()));
    }

    #[test]
    fn test_status_boundaries() {
        for (status, expected) in [(299, true), (300, false)] {
            let server = TestServer::start(status, "");
            let log = Arc::new(RecordingLog::default());
            let client = client(server.dsn(), &log);
            let (finished, outcome) = outcome_channel();

            client.send_data(b"{}".to_vec(), Some(finished));
            assert_eq!(outcome.recv_timeout(WAIT), Ok(expected), "status {status}");
            assert!(log.debug_lines().contains(&format!("status = {status}")));
            assert!(log.error_lines().is_empty(), "status {status}");
        }
    }

    #[test]
    fn test_unreachable_host_reports_failure_once() {
        let log = Arc::new(RecordingLog::default());
        let client = client(unreachable_dsn(), &log);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let delivery = client.send_data(
            b"{}".to_vec(),
            Some(Box::new(move |success| {
                assert!(!success);
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert_eq!(delivery.wait_timeout(WAIT), Some(false));
        assert!(client.flush(WAIT));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.error_lines().len(), 1);
        assert!(!log.debug_lines().iter().any(|l| l.starts_with("status = ")));
    }

    /**
     * Encoding failures never reach the network, and the callback still
     * hears about them.
     */
    #[test]
    fn test_encode_failure_reports_false_without_request() {
        let server = TestServer::start(200, "");
        let log = Arc::new(RecordingLog::default());
        let client = client(server.dsn(), &log);
        let (finished, outcome) = outcome_channel();

        let mut unencodable = BTreeMap::new();
        unencodable.insert((1, 2), "tuple keys are not JSON");
        let delivery = client.send_event(&unencodable, Some(finished));

        assert_eq!(outcome.try_recv(), Ok(false));
        assert_eq!(delivery.try_outcome(), Some(false));
        assert!(server.stays_idle(std::time::Duration::from_millis(300)));
        assert_eq!(log.error_lines().len(), 1);
        assert!(log.debug_lines().is_empty());
    }

    #[test]
    fn test_send_without_callback() {
        let server = TestServer::start(200, "");
        let log = Arc::new(RecordingLog::default());
        let client = client(server.dsn(), &log);

        let delivery = client.send_event(&Event::new("no callback"), None);

        assert!(delivery.wait());
        let request = server.next_request().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["message"], "no callback");
    }

    #[test]
    fn test_concurrent_sends_resolve_independently() {
        let server = TestServer::start(201, "");
        let log = Arc::new(RecordingLog::default());
        let client = client(server.dsn(), &log);
        let (sender, outcomes) = crossbeam_channel::unbounded();

        for i in 0..8 {
            let sender = sender.clone();
            client.send_event(
                &json!({"message": format!("event {i}")}),
                Some(Box::new(move |success| {
                    let _ = sender.send(success);
                })),
            );
        }

        assert!(client.flush(WAIT));
        let results: Vec<bool> = (0..8).map(|_| outcomes.recv_timeout(WAIT).unwrap()).collect();
        assert!(results.iter().all(|ok| *ok));
        assert!(outcomes.try_recv().is_err());
    }

    #[test]
    fn test_from_dsn_rejects_invalid() {
        let result = Client::from_dsn("not a dsn", Options::default());
        assert!(matches!(result, Err(Error::InvalidDsn(_))));
    }

    #[test]
    fn test_uses_endpoint_url_verbatim() {
        let client = Client::from_dsn("https://pub@example.com/base/9", Options::default()).unwrap();
        assert_eq!(client.endpoint().server_url(), "https://example.com/base/api/9/store/");
    }
}
