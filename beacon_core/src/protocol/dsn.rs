/**
 * Endpoint configuration: where events go and how they authenticate.
 *
 * Projects are identified by a DSN of the form
 * `{scheme}://{public_key}[:{secret_key}]@{host}[:{port}]/{path/}{project_id}`.
 *
 * From it we derive:
 * 1. The store URL: `{scheme}://{host}[:{port}]{path}/api/{project_id}/store/`
 * 2. The `X-Sentry-Auth` header carrying the protocol version, client
 *    identifier, a timestamp and the project keys.
 */
use std::fmt;
use std::str::FromStr;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::protocol::constants::{AUTH_HEADER, CLIENT_VERSION, PROTOCOL_VERSION};

// ---------------------------------------------------------------------------
// Endpoint — the seam between the sender and its configuration
// ---------------------------------------------------------------------------

/**
 * A destination for events plus the authentication it requires.
 *
 * Implementations are read-only while sends are in flight and are shared
 * between background tasks, hence `Send + Sync`.
 */
pub trait Endpoint: Send + Sync {
    /// Full URL requests are POSTed to. Used verbatim.
    fn server_url(&self) -> &str;

    /// The authentication header for a request issued now.
    fn auth_header(&self) -> AuthHeader;
}

/// A single header as a key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub key: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Dsn
// ---------------------------------------------------------------------------

/**
 * A parsed DSN.
 *
 * The store URL is computed once at parse time; the auth header is computed
 * per request because it embeds the current timestamp.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    scheme: String,
    public_key: String,
    secret_key: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    project_id: String,
    server_url: String,
}

impl Dsn {
    /**
     * Parses a DSN string.
     *
     * # Returns
     * * `Ok(Dsn)` for a well-formed `http`/`https` DSN.
     * * `Err(Error::InvalidDsn)` describing the first problem found.
     */
    pub fn parse(dsn: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidDsn(format!("{reason}: {dsn}"));

        let (scheme, rest) = dsn
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        if scheme != "http" && scheme != "https" {
            return Err(invalid("unsupported scheme"));
        }

        let (credentials, location) = rest
            .split_once('@')
            .ok_or_else(|| invalid("missing public key"))?;
        let (public_key, secret_key) = match credentials.split_once(':') {
            Some((public, secret)) => (public, Some(secret)),
            None => (credentials, None),
        };
        if public_key.is_empty() {
            return Err(invalid("missing public key"));
        }

        if location.contains(['?', '#']) {
            return Err(invalid("query and fragment are not supported"));
        }

        let (authority, full_path) = location
            .split_once('/')
            .ok_or_else(|| invalid("missing project id"))?;

        /*
         * An IPv6 host is bracketed and full of colons; only a colon after
         * the closing bracket introduces a port.
         */
        let (host, port_str) = if authority.starts_with('[') {
            let end = authority.find(']').ok_or_else(|| invalid("unterminated IPv6 host"))?;
            let (host, rest) = authority.split_at(end + 1);
            match rest {
                "" => (host, None),
                _ => match rest.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(invalid("invalid port")),
                },
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };
        let port = port_str
            .map(|p| p.parse::<u16>().map_err(|_| invalid("invalid port")))
            .transpose()?;
        if host.is_empty() || host == "[]" {
            return Err(invalid("missing host"));
        }

        let full_path = full_path.trim_end_matches('/');
        let (path, project_id) = match full_path.rsplit_once('/') {
            Some((path, id)) => (format!("/{path}"), id),
            None => (String::new(), full_path),
        };
        if project_id.is_empty() {
            return Err(invalid("missing project id"));
        }

        let port_part = port.map(|p| format!(":{p}")).unwrap_or_default();
        let server_url = format!("{scheme}://{host}{port_part}{path}/api/{project_id}/store/");

        Ok(Self {
            scheme: scheme.to_string(),
            public_key: public_key.to_string(),
            secret_key: secret_key.filter(|s| !s.is_empty()).map(str::to_string),
            host: host.to_string(),
            port,
            path,
            project_id: project_id.to_string(),
            server_url,
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /**
     * Builds the auth header value for the given unix timestamp.
     *
     * Split out from `auth_header()` so the exact format can be tested
     * without depending on the clock.
     */
    pub fn auth_header_at(&self, timestamp: i64) -> AuthHeader {
        let mut value = format!(
            "Sentry sentry_version={PROTOCOL_VERSION}, sentry_client={CLIENT_VERSION}, \
             sentry_timestamp={timestamp}, sentry_key={}",
            self.public_key
        );
        if let Some(secret) = &self.secret_key {
            value.push_str(&format!(", sentry_secret={secret}"));
        }

        AuthHeader {
            key: AUTH_HEADER.to_string(),
            value,
        }
    }
}

impl Endpoint for Dsn {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    fn auth_header(&self) -> AuthHeader {
        self.auth_header_at(Utc::now().timestamp())
    }
}

impl FromStr for Dsn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Prints the DSN with the secret key left out.
impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}@{}", self.scheme, self.public_key, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}/{}", self.path, self.project_id)
    }
}
