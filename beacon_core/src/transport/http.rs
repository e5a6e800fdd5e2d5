/*!
 * HTTP transport layer for POSTing payloads to the collector.
 *
 * Uses `ureq`, a pure-Rust blocking HTTP client with no async runtime. Each
 * send runs on its own background thread (see `dispatch`), so blocking I/O
 * there never reaches the caller.
 *
 * - **Fresh agent per send** — no connection reuse is assumed between sends.
 * - **Best-effort delivery** — failures are logged and reported as `false`,
 *   never propagated. The client must never crash the host application.
 * - **Single attempt** — no retries.
 */

use std::sync::Arc;

use ureq::config::AutoHeaderValue;
use ureq::Agent;

use crate::log::Log;
use crate::protocol::dsn::Endpoint;

/// Content type of every payload.
const CONTENT_TYPE: &str = "application/json";

/**
 * Returns whether a status code counts as a successful delivery.
 *
 * Only `200..300` does. Redirects, client and server errors, and anything
 * outside the valid status range are failures.
 */
pub fn is_success_status(code: i32) -> bool {
    (200..300).contains(&code)
}

// ---------------------------------------------------------------------------
// OutboundRequest
// ---------------------------------------------------------------------------

/**
 * A request ready to be issued: method, URL, headers, and body.
 *
 * Built on the caller's thread so the auth header reflects the moment of
 * the send; executed later on a background thread.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    /**
     * Creates a POST to the endpoint's server URL carrying `body` verbatim.
     *
     * Exactly two headers are set: the endpoint's auth header and
     * `Content-Type: application/json`.
     */
    pub fn new(endpoint: &dyn Endpoint, body: Vec<u8>) -> Self {
        let auth = endpoint.auth_header();

        Self {
            method: "POST",
            url: endpoint.server_url().to_string(),
            headers: vec![
                (auth.key, auth.value),
                ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
            ],
            body,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/**
 * Issues requests and classifies their outcome.
 *
 * Holds only the log sink; the HTTP agent is created per request.
 */
pub struct Transport {
    log: Arc<dyn Log>,
}

impl Transport {
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Arc<dyn Log> {
        &self.log
    }

    /**
     * Sends the request and blocks until it resolves.
     *
     * # Returns
     * `true` iff a response arrived with a 2xx status. A transport error
     * without a response yields `false` and an error-level log line.
     */
    pub fn send(&self, request: OutboundRequest) -> bool {
        if let Ok(body) = std::str::from_utf8(&request.body) {
            self.log.debug(&format!("body = {body}"));
        }

        /*
         * Default configuration, except:
         * - every status, 3xx included, comes back as a response so it is
         *   logged and classified instead of followed or turned into an error;
         * - no automatic headers beyond the two the request carries.
         */
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .user_agent(AutoHeaderValue::None)
            .accept(AutoHeaderValue::None)
            .accept_encoding(AutoHeaderValue::None)
            .build()
            .into();

        let mut builder = agent.post(request.url.as_str());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let mut success = false;

        match builder.send(request.body.as_slice()) {
            Ok(response) => {
                let status = response.status().as_u16();
                self.log.debug(&format!("status = {status}"));
                success = is_success_status(i32::from(status));

                /*
                 * A response can still be followed by an error while the
                 * body streams in. The status decides the outcome; the
                 * error is only logged.
                 */
                match response.into_body().read_to_string() {
                    Ok(text) => self.log.debug(&format!("response = {text}")),
                    Err(err) => self.log.error(&format!("error = {err}")),
                }
            }
            Err(err) => {
                self.log.error(&format!("error = {err}"));
            }
        }

        success
    }
}
