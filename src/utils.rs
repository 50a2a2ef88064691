use std::borrow::Cow;
use std::thread;

use backtrace::Backtrace;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::protocol::{Frame, Stacktrace};

static HASH_FUNC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^(.*)::h[a-f0-9]{16}$
    "#,
    )
    .unwrap()
});

const WELL_KNOWN_NOT_IN_APP: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "sentry_host::",
    "__rust_",
    "___rust_",
    "log::",
    "tokio::",
    "futures_core::",
    "futures_util::",
];

// Everything called from one of these frames is relay internals.
const WELL_KNOWN_BORDER_FRAMES: &[&str] = &[
    "<sentry_host::logger::Logger as log::Log>::log",
    "log::__private_api",
    "log::__private_api_log",
];

/// Converts a datetime object into a float timestamp.
pub fn datetime_to_timestamp(dt: &DateTime<Utc>) -> f64 {
    if dt.timestamp_subsec_nanos() == 0 {
        dt.timestamp() as f64
    } else {
        (dt.timestamp() as f64) + (f64::from(dt.timestamp_subsec_micros()) / 1_000_000f64)
    }
}

/// Returns the file name portion of a path.
pub fn filename(s: &str) -> &str {
    s.rsplit(&['/', '\\'][..]).next().unwrap_or(s)
}

fn strip_symbol(s: &str) -> &str {
    HASH_FUNC_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(s)
}

fn function_starts_with(mut func_name: &str, mut pattern: &str) -> bool {
    if pattern.starts_with('<') {
        while pattern.starts_with('<') {
            pattern = &pattern[1..];
            if func_name.starts_with('<') {
                func_name = &func_name[1..];
            } else {
                return false;
            }
        }
    } else {
        func_name = func_name.trim_start_matches('<').trim_start_matches('_');
    }
    func_name.starts_with(pattern)
}

fn is_well_known_not_in_app(func: &str) -> bool {
    WELL_KNOWN_NOT_IN_APP
        .iter()
        .any(|m| function_starts_with(func, m))
}

fn is_well_known_border_frame(func: &str) -> bool {
    WELL_KNOWN_BORDER_FRAMES
        .iter()
        .any(|m| function_starts_with(func, m))
}

/// Converts a captured backtrace into a stacktrace.
///
/// Frames above the outermost well-known border frame (the logger
/// dispatching into the relay) are dropped so the stacktrace ends at the
/// logging call site.
pub fn backtrace_to_stacktrace(bt: &Backtrace) -> Option<Stacktrace> {
    let frames: Vec<Frame> = bt
        .frames()
        .iter()
        .flat_map(|frame| {
            frame.symbols().iter().map(move |sym| {
                let abs_path = sym.filename().map(|m| m.to_string_lossy().to_string());
                let filename = abs_path.as_ref().map(|p| filename(p).to_string());
                let symbol = sym.name().map_or(Cow::Borrowed("<unknown>"), |n| {
                    Cow::Owned(n.to_string())
                });
                let function = strip_symbol(&symbol).to_string();
                Frame {
                    symbol: if symbol != function {
                        Some(symbol.to_string())
                    } else {
                        None
                    },
                    in_app: if is_well_known_not_in_app(&function) {
                        Some(false)
                    } else {
                        None
                    },
                    function: Some(function),
                    instruction_addr: Some(format!("{:p}", frame.ip())),
                    abs_path,
                    filename,
                    lineno: sym.lineno().map(u64::from),
                    ..Default::default()
                }
            })
        })
        .collect();

    let cutoff = frames.iter().rposition(|frame| {
        frame
            .function
            .as_deref()
            .map_or(false, is_well_known_border_frame)
    });
    let frames = match cutoff {
        Some(cutoff) => frames.into_iter().skip(cutoff + 1).collect(),
        None => frames,
    };

    Stacktrace::from_frames_reversed(frames)
}

/// Returns an identifier and the name of the current thread.
pub fn current_thread() -> (String, String) {
    let current = thread::current();
    let id = format!("{:?}", current.id());
    let id = id
        .trim_start_matches("ThreadId(")
        .trim_end_matches(')')
        .to_string();
    let name = current.name().unwrap_or("unnamed").to_string();
    (id, name)
}

/// Returns the process ID and the process name.
pub fn current_process() -> (u32, String) {
    static PROCESS_NAME: Lazy<String> = Lazy::new(|| {
        std::env::current_exe()
            .ok()
            .and_then(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .or_else(|| std::env::args().next())
            .unwrap_or_else(|| "unknown".into())
    });
    (std::process::id(), PROCESS_NAME.clone())
}

/// Returns the command line arguments of the process.
pub fn process_args() -> Vec<String> {
    std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Returns the host name of the machine.
pub fn server_name() -> Option<String> {
    hostname::get().ok().and_then(|s| s.into_string().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_symbol() {
        assert_eq!(
            strip_symbol("my_app::handlers::index::h3ad1a3a9f6b5d1c4"),
            "my_app::handlers::index"
        );
        assert_eq!(strip_symbol("my_app::main"), "my_app::main");
    }

    #[test]
    fn test_function_starts_with() {
        assert!(function_starts_with(
            "<sentry_host::logger::Logger as log::Log>::log",
            "<sentry_host::logger::Logger as log::Log>::log"
        ));
        assert!(function_starts_with("<std::io::Error as Debug>::fmt", "std::"));
        assert!(!function_starts_with("my_app::main", "std::"));
        assert!(is_well_known_not_in_app("tokio::runtime::park"));
    }

    #[test]
    fn test_filename() {
        assert_eq!(filename("src/handlers/index.rs"), "index.rs");
        assert_eq!(filename("C:\\app\\main.rs"), "main.rs");
        assert_eq!(filename("main.rs"), "main.rs");
    }

    #[test]
    fn test_backtrace_to_stacktrace() {
        let mut backtrace = Backtrace::new_unresolved();
        backtrace.resolve();
        let stacktrace = backtrace_to_stacktrace(&backtrace).unwrap();
        assert!(!stacktrace.frames.is_empty());
        assert!(stacktrace
            .frames
            .iter()
            .any(|frame| frame.in_app == Some(false)));
    }

    #[test]
    fn test_timestamp() {
        let dt = DateTime::from_timestamp(1_328_055_286, 500_000_000).unwrap();
        assert_eq!(datetime_to_timestamp(&dt), 1_328_055_286.5);
        let dt = DateTime::from_timestamp(1_328_055_286, 0).unwrap();
        assert_eq!(datetime_to_timestamp(&dt), 1_328_055_286.0);
    }
}
