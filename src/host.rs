use crate::config::{Config, ConfigSource};
use crate::integration::Sentry;
use crate::logger::Logger;

/// The application the integration is attached to.
///
/// A host provides the three collaborators the integration needs: its
/// configuration store, its logger, and a slot that holds the attached
/// [`Sentry`] integration for later inspection.
pub trait Host {
    /// Returns the configuration store.
    fn config(&self) -> &dyn ConfigSource;

    /// Returns the logger the relay is attached to.
    fn logger(&self) -> &Logger;

    /// Returns the attached integration.
    fn sentry(&self) -> Option<&Sentry>;

    /// Stores the attached integration, returning the previous one.
    fn set_sentry(&mut self, sentry: Sentry) -> Option<Sentry>;
}

/// A minimal [`Host`] made of a [`Config`] and a [`Logger`].
///
/// # Examples
///
/// ```
/// use sentry_host::{BasicHost, Config, Logger};
///
/// let mut config = Config::new();
/// config.set("SENTRY_DSN", "https://public@sentry.example.com/1");
/// let mut host = BasicHost::new(config, Logger::new("app"));
/// let client = sentry_host::init(&mut host).unwrap();
/// assert!(client.is_enabled());
/// ```
#[derive(Debug)]
pub struct BasicHost {
    config: Config,
    logger: Logger,
    sentry: Option<Sentry>,
}

impl BasicHost {
    /// Creates a host.
    pub fn new(config: Config, logger: Logger) -> BasicHost {
        BasicHost {
            config,
            logger,
            sentry: None,
        }
    }

    /// Gives mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl Host for BasicHost {
    fn config(&self) -> &dyn ConfigSource {
        &self.config
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    fn sentry(&self) -> Option<&Sentry> {
        self.sentry.as_ref()
    }

    fn set_sentry(&mut self, sentry: Sentry) -> Option<Sentry> {
        self.sentry.replace(sentry)
    }
}
