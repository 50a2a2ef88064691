//! The host's logger registration mechanism.
//!
//! A [`Logger`] is a named, cloneable handle that implements [`log::Log`]
//! and dispatches every record it accepts to its registered [`Handler`]s.
//! Handlers can be attached and detached at any time; the integration
//! attaches its relay here rather than replacing the process-wide logger.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// Receives the records of a [`Logger`].
pub trait Handler: Send + Sync {
    /// Handles a single record.
    ///
    /// This is called on the thread that emitted the record and must not
    /// block.
    fn handle(&self, record: &Record<'_>);

    /// Flushes buffered records.
    fn flush(&self) {}
}

/// Identifies a handler attached to a [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

type Handlers = Vec<(HandlerId, Arc<dyn Handler>)>;

struct Inner {
    name: String,
    handlers: RwLock<Handlers>,
    next_id: AtomicU64,
    dest: Option<Box<dyn log::Log>>,
}

/// Provides a dispatching logger.
///
/// A logger named `"app"` accepts records whose target is `app` or starts
/// with `app::`; the root logger (empty name) accepts every record.  All
/// records, accepted or not, are passed on to the destination logger if
/// one is set.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Creates a logger for the given target prefix.
    pub fn new<S: Into<String>>(name: S) -> Logger {
        Logger::build(name.into(), None)
    }

    /// Creates a logger accepting every record.
    pub fn root() -> Logger {
        Logger::new("")
    }

    /// Creates a logger that additionally forwards to another logger.
    ///
    /// Typically a log system in Rust will call `log::set_logger` itself
    /// but since the host needs to intercept records, the other logger is
    /// passed here instead and this one is installed.
    pub fn with_dest<S: Into<String>>(name: S, dest: Box<dyn log::Log>) -> Logger {
        Logger::build(name.into(), Some(dest))
    }

    /// Creates a logger that forwards to an `env_logger` configured from
    /// the `RUST_LOG` environment variable.
    #[cfg(feature = "env_logger")]
    pub fn with_env_logger_dest<S: Into<String>>(name: S) -> Logger {
        let dest = env_logger::Builder::from_default_env().build();
        Logger::with_dest(name, Box::new(dest))
    }

    fn build(name: String, dest: Option<Box<dyn log::Log>>) -> Logger {
        Logger {
            inner: Arc::new(Inner {
                name,
                handlers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                dest,
            }),
        }
    }

    /// Returns the name of the logger.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Attaches a handler.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) -> HandlerId {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, handler));
        id
    }

    /// Detaches a handler.  Returns `false` if it was not attached.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self
            .inner
            .handlers
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Returns the number of attached handlers.
    pub fn handler_count(&self) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Checks if records of a target are dispatched to the handlers.
    pub fn accepts(&self, target: &str) -> bool {
        let name = self.name();
        name.is_empty()
            || target
                .strip_prefix(name)
                .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
    }

    /// Installs this logger as the process-wide `log` logger.
    ///
    /// This can only succeed once per process.
    pub fn install(&self) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(self.clone()))?;
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }

    fn handlers(&self) -> Handlers {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("handlers", &self.handler_count())
            .field("dest", &self.inner.dest.is_some())
            .finish()
    }
}

impl log::Log for Logger {
    fn enabled(&self, md: &Metadata<'_>) -> bool {
        (self.accepts(md.target()) && self.handler_count() > 0)
            || self.inner.dest.as_ref().map_or(false, |x| x.enabled(md))
    }

    fn log(&self, record: &Record<'_>) {
        if self.accepts(record.target()) {
            // handlers may attach or detach handlers themselves
            for (_, handler) in self.handlers() {
                handler.handle(record);
            }
        }
        if let Some(ref log) = self.inner.dest {
            if log.enabled(record.metadata()) {
                log.log(record);
            }
        }
    }

    fn flush(&self) {
        for (_, handler) in self.handlers() {
            handler.flush();
        }
        if let Some(ref log) = self.inner.dest {
            log.flush();
        }
    }
}
