//! This crate relays the error logs of a web server to Sentry.
//!
//! A host application (anything implementing [`Host`]) provides a
//! configuration store and a [`Logger`].  Calling [`init`] reads the
//! `SENTRY_*` settings, creates a [`Client`] and attaches a relay to the
//! logger.  From then on every log record at or above the configured
//! level (`error` by default) is turned into an event and sent to Sentry
//! in the background.  Lower records are kept as breadcrumbs and travel
//! with the next event of the same request.
//!
//! # Quickstart
//!
//! ```
//! use sentry_host::{BasicHost, Config, Logger};
//!
//! let mut config = Config::new();
//! config
//!     .set("SENTRY_DSN", "https://public@sentry.example.com/1")
//!     .set("SENTRY_LEVEL", "warning")
//!     .set("SENTRY_PARAMS", serde_json::json!({ "release": "myapp_v0.4" }));
//!
//! let logger = Logger::new("app");
//! let mut host = BasicHost::new(config, logger);
//! let client = sentry_host::init(&mut host).unwrap();
//! assert_eq!(client.options().release.as_deref(), Some("myapp_v0.4"));
//! ```
//!
//! # Configuration
//!
//! | Key | Meaning |
//! |---|---|
//! | `SENTRY_DSN` | required; where events are sent |
//! | `SENTRY_LEVEL` | threshold, a level name or number (default `error`) |
//! | `SENTRY_RELEASE` | release attached to every event |
//! | `SENTRY_PARAMS` | object of client and transport parameters |
//!
//! See [`ClientOptions::from_config`] for the recognised parameters.
//!
//! # Requests
//!
//! Hosts should run each request through [`scoped`] so that breadcrumbs do
//! not leak between concurrent requests.
//!
//! # Features
//!
//! - `env_logger`: adds [`Logger::with_env_logger_dest`] to forward records
//!   to an `env_logger`.
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod auth;
mod client;
mod config;
mod constants;
mod converters;
mod dsn;
mod handler;
mod host;
mod integration;
mod logger;
mod options;
mod project_id;
pub mod protocol;
mod scope;
mod transport;
mod utils;

pub use crate::auth::{Auth, AuthParseError};
pub use crate::client::Client;
pub use crate::config::{
    Config, ConfigError, ConfigSource, SentryConfig, DSN_KEY, LEVEL_KEY, PARAMS_KEY, RELEASE_KEY,
};
pub use crate::constants::{USER_AGENT, VERSION};
pub use crate::converters::{
    breadcrumb_from_record, event_from_record, level_from_record, SEVERITY_KEY,
};
pub use crate::dsn::{Dsn, DsnParseError, Scheme};
pub use crate::handler::{is_excluded_target, SentryHandler, EXCLUDED_TARGETS};
pub use crate::host::{BasicHost, Host};
pub use crate::integration::Sentry;
pub use crate::logger::{Handler, HandlerId, Logger};
pub use crate::options::ClientOptions;
pub use crate::project_id::{ProjectId, ProjectIdParseError};
pub use crate::protocol::{Breadcrumb, Event, Level};
pub use crate::scope::{configure_scope, scoped, with_scope, Scope};
pub use crate::transport::{
    encode_event, DefaultTransportFactory, HttpTransport, Transport, TransportError,
    TransportFactory,
};

/// Attaches Sentry to a host.
///
/// This is a shorthand for [`Sentry::init`].
pub fn init<H: Host + ?Sized>(host: &mut H) -> Result<std::sync::Arc<Client>, ConfigError> {
    Sentry::init(host)
}
