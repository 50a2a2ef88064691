//! The event payload sent to the store endpoint.
//!
//! Every type in here serializes to the JSON accepted by the legacy
//! `/api/{project}/store/` endpoint.  Optional attributes are skipped when
//! unset so that an absent value is distinguishable from an explicit `null`.
use std::fmt;
use std::str::FromStr;

use backtrace::Backtrace;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::utils::backtrace_to_stacktrace;

pub use serde_json::Value;

/// The map type used throughout the protocol.
pub type Map<K, V> = std::collections::BTreeMap<K, V>;

/// Raised if a level cannot be parsed from a name or number.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(String);

/// The severity of an event or breadcrumb.
///
/// Levels are ordered `Debug < Info < Warning < Error < Critical` and carry
/// the numeric values 10, 20, 30, 40 and 50.  Events serialize the number,
/// breadcrumbs the lowercase name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// Debug information.
    Debug,
    /// Informational messages.
    Info,
    /// Warnings.
    Warning,
    /// Errors.
    #[default]
    Error,
    /// Critical failures.
    Critical,
}

impl Level {
    /// Returns the numeric value of the level.
    pub fn as_number(self) -> u8 {
        match self {
            Level::Debug => 10,
            Level::Info => 20,
            Level::Warning => 30,
            Level::Error => 40,
            Level::Critical => 50,
        }
    }

    /// Returns the lowest level whose numeric value is at least `value`.
    ///
    /// Values above 50 have no matching level.
    pub fn from_number(value: u64) -> Option<Level> {
        [
            Level::Debug,
            Level::Info,
            Level::Warning,
            Level::Error,
            Level::Critical,
        ]
        .into_iter()
        .find(|level| u64::from(level.as_number()) >= value)
    }

    /// Returns the lowercase name of the level.
    pub fn name(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Level, ParseLevelError> {
        let s = s.trim();
        if let Ok(number) = s.parse::<u64>() {
            return Level::from_number(number).ok_or_else(|| ParseLevelError(s.into()));
        }
        Ok(match s.to_ascii_lowercase().as_str() {
            "trace" | "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" | "warning" => Level::Warning,
            "error" => Level::Error,
            "critical" | "fatal" => Level::Critical,
            _ => return Err(ParseLevelError(s.into())),
        })
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Level {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_number())
    }
}

mod level_name {
    use super::Level;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(level.name())
    }
}

mod event_id {
    use serde::Serializer;
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&id.as_simple())
    }
}

mod iso_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, false))
    }
}

mod float_timestamp {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    use crate::utils::datetime_to_timestamp;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(datetime_to_timestamp(dt))
    }
}

/// A wrapper that serializes as `{"values": [...]}`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Values<T> {
    /// The wrapped values.
    pub values: Vec<T>,
}

impl<T> Values<T> {
    /// Creates an empty list.
    pub fn new() -> Values<T> {
        Values { values: Vec::new() }
    }

    /// Checks whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T> Default for Values<T> {
    fn default() -> Values<T> {
        Values::new()
    }
}

impl<T> From<Vec<T>> for Values<T> {
    fn from(values: Vec<T>) -> Values<T> {
        Values { values }
    }
}

impl<T> std::ops::Deref for Values<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.values
    }
}

/// Represents a single breadcrumb.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Breadcrumb {
    /// The time of the breadcrumb.
    #[serde(with = "float_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// The type of the breadcrumb.
    #[serde(rename = "type")]
    pub ty: String,
    /// The logger or other category of the breadcrumb.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The level of the breadcrumb.
    #[serde(with = "level_name")]
    pub level: Level,
    /// The rendered message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Arbitrary structured data.
    pub data: Map<String, Value>,
}

impl Default for Breadcrumb {
    fn default() -> Breadcrumb {
        Breadcrumb {
            timestamp: Utc::now(),
            ty: "default".into(),
            category: None,
            level: Level::Info,
            message: None,
            data: Map::new(),
        }
    }
}

/// Represents a single stack frame.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct Frame {
    /// The name of the function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// The raw symbol if it differs from the function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// The module path of the frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// The file name of the frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// The absolute path of the source file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abs_path: Option<String>,
    /// The line number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u64>,
    /// Whether the frame belongs to application code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_app: Option<bool>,
    /// The instruction address as hex string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_addr: Option<String>,
}

/// Represents a stacktrace; frames are ordered oldest call first.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct Stacktrace {
    /// The frames of the stacktrace.
    pub frames: Vec<Frame>,
}

impl Stacktrace {
    /// Creates a stacktrace from frames given innermost call first.
    pub fn from_frames_reversed(mut frames: Vec<Frame>) -> Option<Stacktrace> {
        if frames.is_empty() {
            None
        } else {
            frames.reverse();
            Some(Stacktrace { frames })
        }
    }
}

/// Represents a single exception.
#[derive(Serialize, Debug, Default, Clone)]
pub struct Exception {
    /// The type of the exception; the log target for log records.
    #[serde(rename = "type")]
    pub ty: String,
    /// The rendered message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// The module the exception originated in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// The stacktrace leading to the exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
    /// A captured backtrace whose symbols are not resolved yet.
    ///
    /// It replaces `stacktrace` once [`Exception::resolve_backtrace`] runs
    /// and is never serialized.
    #[serde(skip)]
    pub backtrace: Option<Backtrace>,
}

impl Exception {
    /// Symbolizes the pending backtrace into `stacktrace`.
    ///
    /// This reads debug information from disk and must not run on the
    /// logging call path.  The existing stacktrace is kept if the backtrace
    /// yields no frames.
    pub fn resolve_backtrace(&mut self) {
        if let Some(mut backtrace) = self.backtrace.take() {
            backtrace.resolve();
            if let Some(stacktrace) = backtrace_to_stacktrace(&backtrace) {
                self.stacktrace = Some(stacktrace);
            }
        }
    }
}

/// A package reported as part of the SDK information.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct ClientSdkPackage {
    /// The name of the package.
    pub name: String,
    /// The version of the package.
    pub version: String,
}

/// Information about the SDK that sent the event.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct ClientSdkInfo {
    /// The name of the SDK.
    pub name: String,
    /// The version of the SDK.
    pub version: String,
    /// Enabled integrations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<String>,
    /// The packages that make up the SDK.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<ClientSdkPackage>,
}

/// Represents a full event for Sentry.
///
/// An event is built for a single qualifying log record, handed to the
/// transport and dropped afterwards.
#[derive(Serialize, Debug, Clone)]
pub struct Event {
    /// The ID of the event.
    #[serde(with = "event_id")]
    pub event_id: Uuid,
    /// The time the event was created.
    #[serde(with = "iso_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// The level of the event.
    pub level: Level,
    /// The name of the logger that created the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    /// The rendered message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The location the event originated from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,
    /// The platform of the sender.
    pub platform: String,
    /// The project the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// The release tag.  Never serialized when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// The environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// The name of the reporting host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Tags for grouping and searching.
    pub tags: Map<String, String>,
    /// Additional arbitrary data.
    pub extra: Map<String, Value>,
    /// Breadcrumbs leading up to the event.
    pub breadcrumbs: Values<Breadcrumb>,
    /// Versions of the modules that make up the sender.
    pub modules: Map<String, String>,
    /// Source repositories.
    pub repos: Map<String, Value>,
    /// Runtime, OS and device contexts.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub contexts: Map<String, Value>,
    /// The exception the event describes.
    #[serde(skip_serializing_if = "Values::is_empty")]
    pub exception: Values<Exception>,
    /// SDK information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk: Option<ClientSdkInfo>,
}

impl Default for Event {
    fn default() -> Event {
        Event {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level: Level::Error,
            logger: None,
            message: None,
            culprit: None,
            platform: "rust".into(),
            project: None,
            release: None,
            environment: None,
            server_name: None,
            tags: Map::new(),
            extra: Map::new(),
            breadcrumbs: Values::new(),
            modules: Map::new(),
            repos: Map::new(),
            contexts: Map::new(),
            exception: Values::new(),
            sdk: None,
        }
    }
}

impl Event {
    /// Returns the formatted `asctime` of the event.
    pub fn asctime(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Resolves the pending backtraces of all exceptions.
    pub fn resolve_backtraces(&mut self) {
        for exception in &mut self.exception.values {
            exception.resolve_backtrace();
        }
    }
}
