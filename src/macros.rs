/// Writes an internal diagnostic line to stderr.
///
/// The first argument is a flag (usually `ClientOptions::debug`); nothing is
/// written unless it is true.  It does not go through the `log` crate since
/// the relay is attached to the logger these messages would go through.
#[macro_export]
#[doc(hidden)]
macro_rules! sentry_debug {
    ($enabled:expr, $($arg:tt)*) => {
        if $enabled {
            eprint!("[sentry] ");
            eprintln!($($arg)*);
        }
    };
}
