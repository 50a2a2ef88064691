//! Reading the integration settings from a host's configuration store.
//!
//! The host exposes its settings as key/value pairs through
//! [`ConfigSource`].  The integration reads four keys, once, when it is
//! initialized:
//!
//! | Key | Required | Meaning |
//! |---|---|---|
//! | `SENTRY_DSN` | yes | destination of all events |
//! | `SENTRY_LEVEL` | no, defaults to `error` | minimum severity that is reported |
//! | `SENTRY_RELEASE` | no | release attached to every event |
//! | `SENTRY_PARAMS` | no | free-form client and transport parameters |
use std::env;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::dsn::{Dsn, DsnParseError};
use crate::protocol::{Level, Map};
use crate::transport::TransportError;

/// The key holding the DSN.
pub const DSN_KEY: &str = "SENTRY_DSN";
/// The key holding the minimum level.
pub const LEVEL_KEY: &str = "SENTRY_LEVEL";
/// The key holding the release.
pub const RELEASE_KEY: &str = "SENTRY_RELEASE";
/// The key holding the free-form parameters.
pub const PARAMS_KEY: &str = "SENTRY_PARAMS";

/// An error raised while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    /// The DSN could not be parsed.
    #[error("invalid DSN in `{key}`")]
    InvalidDsn {
        /// The key the DSN was read from.
        key: &'static str,
        /// The parse failure.
        #[source]
        source: DsnParseError,
    },
    /// The level is neither a known name nor a number up to 50.
    #[error("invalid log level `{0}`")]
    InvalidLevel(String),
    /// A setting has the wrong type.
    #[error("setting `{key}` must be {expected}")]
    InvalidType {
        /// The offending key.
        key: String,
        /// A description of the expected type.
        expected: &'static str,
    },
    /// The transport could not be built from the parameters.
    #[error("invalid transport parameters")]
    Transport(#[from] TransportError),
}

/// A read-only key/value configuration store.
pub trait ConfigSource {
    /// Looks up a single setting.
    fn get_value(&self, key: &str) -> Option<Value>;
}

impl ConfigSource for serde_json::Map<String, Value> {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl ConfigSource for std::collections::HashMap<String, Value> {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get_value(&self, key: &str) -> Option<Value> {
        (**self).get_value(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn get_value(&self, key: &str) -> Option<Value> {
        (**self).get_value(key)
    }
}

/// A simple configuration store.
///
/// # Examples
///
/// ```
/// use sentry_host::Config;
///
/// let mut config = Config::new();
/// config
///     .set("SENTRY_DSN", "https://public@sentry.example.com/1")
///     .set("SENTRY_LEVEL", "warning");
/// assert_eq!(config.get("SENTRY_LEVEL").unwrap(), "warning");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: Map<String, Value>,
}

impl Config {
    /// Creates an empty store.
    pub fn new() -> Config {
        Config::default()
    }

    /// Creates a store from the `SENTRY_*` environment variables.
    ///
    /// `SENTRY_DSN`, `SENTRY_LEVEL` and `SENTRY_RELEASE` map to the keys of
    /// the same name, `SENTRY_ENVIRONMENT` to the `environment` parameter.
    pub fn from_env() -> Config {
        let mut config = Config::new();
        for key in [DSN_KEY, LEVEL_KEY, RELEASE_KEY] {
            if let Ok(value) = env::var(key) {
                config.set(key, value);
            }
        }
        if let Ok(environment) = env::var("SENTRY_ENVIRONMENT") {
            let mut params = serde_json::Map::new();
            params.insert("environment".into(), Value::String(environment));
            config.set(PARAMS_KEY, params);
        }
        config
    }

    /// Sets a value.
    pub fn set<K, V>(&mut self, key: K, value: V) -> &mut Config
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}

impl ConfigSource for Config {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Config {
        let mut config = Config::new();
        for (key, value) in iter {
            config.set(key, value);
        }
        config
    }
}

/// The settings of the integration as read from a [`ConfigSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    /// The destination of all events.
    pub dsn: Dsn,
    /// Records below this level are dropped.
    pub level: Level,
    /// The release attached to every event.  `None` when not configured.
    pub release: Option<String>,
    /// The free-form parameters, as found in the store.
    pub params: serde_json::Map<String, Value>,
}

impl SentryConfig {
    /// Reads the settings from a configuration store.
    ///
    /// Fails if the DSN is absent or any present setting is malformed;
    /// absent optional settings fall back to their defaults.
    pub fn from_source<C: ConfigSource + ?Sized>(source: &C) -> Result<SentryConfig, ConfigError> {
        let dsn = match source.get_value(DSN_KEY) {
            None | Some(Value::Null) => return Err(ConfigError::Missing(DSN_KEY)),
            Some(Value::String(dsn)) if dsn.trim().is_empty() => {
                return Err(ConfigError::Missing(DSN_KEY))
            }
            Some(Value::String(dsn)) => dsn
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidDsn {
                    key: DSN_KEY,
                    source,
                })?,
            Some(_) => {
                return Err(ConfigError::InvalidType {
                    key: DSN_KEY.into(),
                    expected: "a string",
                })
            }
        };

        let level = match source.get_value(LEVEL_KEY) {
            None | Some(Value::Null) => Level::default(),
            Some(value) => parse_level(&value)?,
        };

        let params = match source.get_value(PARAMS_KEY) {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(params)) => params,
            Some(_) => {
                return Err(ConfigError::InvalidType {
                    key: PARAMS_KEY.into(),
                    expected: "an object",
                })
            }
        };

        let release = match source.get_value(RELEASE_KEY) {
            Some(value) => optional_string(RELEASE_KEY, &value)?,
            None => match params.get("release") {
                Some(value) => optional_string("SENTRY_PARAMS.release", value)?,
                None => None,
            },
        };

        Ok(SentryConfig {
            dsn,
            level,
            release,
            params,
        })
    }
}

fn parse_level(value: &Value) -> Result<Level, ConfigError> {
    let level = match value {
        Value::String(name) => name.parse().ok(),
        Value::Number(number) => number.as_u64().and_then(Level::from_number),
        _ => None,
    };
    level.ok_or_else(|| ConfigError::InvalidLevel(value.to_string()))
}

pub(crate) fn optional_string(key: &str, value: &Value) -> Result<Option<String>, ConfigError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(ConfigError::InvalidType {
            key: key.into(),
            expected: "a string",
        }),
    }
}
