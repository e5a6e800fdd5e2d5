/**
 * Event data model.
 *
 * The encoder accepts anything implementing `Serialize`; `Event` is the
 * structure this crate builds itself and matches the collector's store
 * protocol. Optional fields are left out of the JSON entirely when unset.
 */
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::protocol::constants::{PLATFORM, SDK_NAME};

/// Timestamp format expected by the store endpoint (UTC, no offset).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fatal,
    #[default]
    Error,
    Warning,
    Info,
    Debug,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Fatal => "fatal",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/**
 * A diagnostic event as POSTed to the store endpoint.
 *
 * ```json
 * {
 *   "event_id": "fc6d8c0c43fc4630ad850ee518f1b9d0",
 *   "message": "something broke",
 *   "timestamp": "2016-01-07T12:00:00",
 *   "level": "error",
 *   "platform": "rust",
 *   "sdk": { "name": "beacon-rust", "version": "0.1.0" }
 * }
 * ```
 */
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// 32 lowercase hex characters, no dashes.
    pub event_id: String,

    pub message: String,

    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    pub level: Level,

    pub platform: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,

    /// Where the event originated, e.g. a function or route name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Overrides the collector's default grouping when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fingerprint: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exception: Vec<Exception>,

    pub sdk: SdkInfo,
}

impl Event {
    /// Creates an error-level event with a fresh id and the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().simple().to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            level: Level::default(),
            platform: PLATFORM.to_string(),
            logger: None,
            culprit: None,
            server_name: None,
            release: None,
            environment: None,
            fingerprint: Vec::new(),
            user: None,
            tags: BTreeMap::new(),
            extra: serde_json::Map::new(),
            exception: Vec::new(),
            sdk: SdkInfo::default(),
        }
    }

    /**
     * Builds an event from an error value.
     *
     * The exception's `type` is the error's Rust type name and its `value`
     * is the `Display` text. A backtrace is captured here, so the frames
     * point at the caller of `from_error`.
     */
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let frames = crate::capture_frames();
        let exception = Exception {
            exception_type: std::any::type_name::<E>().to_string(),
            value: error.to_string(),
            stacktrace: if frames.is_empty() {
                None
            } else {
                Some(Stacktrace { frames })
            },
        };

        let mut event = Self::new(error.to_string());
        event.exception.push(exception);
        event
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

fn serialize_timestamp<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}

// ---------------------------------------------------------------------------
// Nested interfaces
// ---------------------------------------------------------------------------

/// The user affected by an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exception {
    #[serde(rename = "type")]
    pub exception_type: String,

    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stacktrace {
    /// Most recent call first.
    pub frames: Vec<Frame>,
}

/**
 * A single stack frame.
 *
 * Filled from whatever debug info `backtrace` resolves; any field may be
 * missing in stripped release builds.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
}

/// Identifies this client inside every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkInfo {
    pub name: String,
    pub version: String,
}

impl Default for SdkInfo {
    fn default() -> Self {
        Self {
            name: SDK_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
