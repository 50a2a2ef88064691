use backtrace::Backtrace;
use log::kv::{self, Key, VisitSource};
use serde_json::{Number, Value};

use crate::protocol::{Breadcrumb, Event, Exception, Frame, Level, Map, Stacktrace, Values};
use crate::utils::{current_process, current_thread, filename, process_args};

/// The key-value that raises a record above the `log` crate's levels.
pub const SEVERITY_KEY: &str = "severity";

/// Returns the level of a record.
///
/// A `severity` key-value naming a level wins over the record's own
/// level, which is how records reach [`Level::Critical`].
pub fn level_from_record(record: &log::Record<'_>) -> Level {
    record
        .key_values()
        .get(Key::from(SEVERITY_KEY))
        .and_then(|value| value.to_string().parse().ok())
        .unwrap_or_else(|| record.level().into())
}

struct Collector(Map<String, Value>);

impl<'kvs> VisitSource<'kvs> for Collector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        if key.as_str() != SEVERITY_KEY {
            self.0.insert(key.as_str().to_owned(), kv_to_json(&value));
        }
        Ok(())
    }
}

fn kv_to_json(value: &kv::Value<'_>) -> Value {
    if let Some(b) = value.to_bool() {
        Value::Bool(b)
    } else if let Some(n) = value.to_i64() {
        Value::Number(n.into())
    } else if let Some(n) = value.to_u64() {
        Value::Number(n.into())
    } else if let Some(n) = value.to_f64().and_then(Number::from_f64) {
        Value::Number(n)
    } else {
        Value::String(value.to_string())
    }
}

/// Collects the key-values of a record, except `severity`.
pub fn key_values_from_record(record: &log::Record<'_>) -> Map<String, Value> {
    let mut collector = Collector(Map::new());
    // the collector never fails
    let _ = record.key_values().visit(&mut collector);
    collector.0
}

/// Creates a [`Breadcrumb`] from a given [`log::Record`].
pub fn breadcrumb_from_record(record: &log::Record<'_>) -> Breadcrumb {
    Breadcrumb {
        ty: "log".into(),
        level: level_from_record(record),
        category: Some(record.target().into()),
        message: Some(format!("{}", record.args())),
        data: key_values_from_record(record),
        ..Default::default()
    }
}

fn location_frame(record: &log::Record<'_>) -> Frame {
    Frame {
        module: record.module_path().map(ToOwned::to_owned),
        filename: record.file().map(|f| filename(f).to_owned()),
        abs_path: record.file().map(ToOwned::to_owned),
        lineno: record.line().map(Into::into),
        in_app: Some(true),
        ..Default::default()
    }
}

/// Creates an [`Event`] from a given [`log::Record`].
///
/// The event carries the record as its exception with a single frame for
/// the record's location.  If `with_stacktrace` is set the backtrace of the
/// logging call is captured as well; it is only symbolized by
/// [`Event::resolve_backtraces`], off the logging call path.
pub fn event_from_record(record: &log::Record<'_>, with_stacktrace: bool) -> Event {
    let message = format!("{}", record.args());
    let stacktrace = Stacktrace {
        frames: vec![location_frame(record)],
    };
    let backtrace = if with_stacktrace {
        Some(Backtrace::new_unresolved())
    } else {
        None
    };

    let mut event = Event {
        logger: Some(record.target().into()),
        level: level_from_record(record),
        message: Some(message.clone()),
        culprit: Some(
            record
                .module_path()
                .unwrap_or_else(|| record.target())
                .to_owned(),
        ),
        exception: Values::from(vec![Exception {
            ty: record.target().into(),
            value: Some(message),
            module: record.module_path().map(ToOwned::to_owned),
            stacktrace: Some(stacktrace),
            backtrace,
        }]),
        ..Default::default()
    };

    let (thread_id, thread_name) = current_thread();
    let (process_id, process_name) = current_process();
    let file = record.file();
    let extra = &mut event.extra;
    extra.insert("sys.argv".into(), process_args().into());
    extra.insert("pathname".into(), file.into());
    extra.insert("filename".into(), file.map(filename).into());
    extra.insert("lineno".into(), record.line().into());
    extra.insert("stack_info".into(), Value::Null);
    extra.insert("thread".into(), thread_id.into());
    extra.insert("threadName".into(), thread_name.into());
    extra.insert("process".into(), process_id.into());
    extra.insert("processName".into(), process_name.into());
    let asctime = event.asctime();
    event.extra.insert("asctime".into(), asctime.into());

    for (key, value) in key_values_from_record(record) {
        event.extra.entry(key).or_insert(value);
    }

    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::kv::Source;

    const BASE_EXTRA: &[&str] = &[
        "asctime",
        "filename",
        "lineno",
        "pathname",
        "process",
        "processName",
        "stack_info",
        "sys.argv",
        "thread",
        "threadName",
    ];

    fn with_record<R>(kvs: &dyn Source, f: impl FnOnce(&log::Record<'_>) -> R) -> R {
        f(&log::Record::builder()
            .target("app::handlers")
            .level(log::Level::Error)
            .module_path(Some("app::handlers"))
            .file(Some("src/handlers.rs"))
            .line(Some(42))
            .key_values(kvs)
            .args(format_args!("Exception occurred while handling uri"))
            .build())
    }

    #[test]
    fn test_event_from_record() {
        let no_kvs: &[(&str, &str)] = &[];
        let event = with_record(&no_kvs, |record| event_from_record(record, false));

        assert_eq!(event.level, Level::Error);
        assert_eq!(event.logger.as_deref(), Some("app::handlers"));
        assert_eq!(
            event.message.as_deref(),
            Some("Exception occurred while handling uri")
        );
        let keys: Vec<&str> = event.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, BASE_EXTRA);
        assert_eq!(event.extra["lineno"], 42);
        assert_eq!(event.extra["filename"], "handlers.rs");
        assert_eq!(event.extra["pathname"], "src/handlers.rs");
        assert_eq!(event.extra["stack_info"], Value::Null);

        let exception = &event.exception[0];
        assert_eq!(exception.ty, "app::handlers");
        assert!(exception.backtrace.is_none());
        let frames = &exception.stacktrace.as_ref().unwrap().frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].lineno, Some(42));
    }

    #[test]
    fn test_event_with_stacktrace() {
        let no_kvs: &[(&str, &str)] = &[];
        let mut event = with_record(&no_kvs, |record| event_from_record(record, true));

        // captured but not symbolized at the call site
        let exception = &event.exception[0];
        let backtrace = exception.backtrace.as_ref().unwrap();
        assert!(backtrace
            .frames()
            .iter()
            .all(|frame| frame.symbols().is_empty()));
        assert_eq!(exception.stacktrace.as_ref().unwrap().frames.len(), 1);

        event.resolve_backtraces();
        let exception = &event.exception[0];
        assert!(exception.backtrace.is_none());
        let frames = &exception.stacktrace.as_ref().unwrap().frames;
        assert!(frames.iter().any(|frame| frame
            .function
            .as_deref()
            .map_or(false, |function| function.contains("test_event_with_stacktrace"))));
    }

    #[test]
    fn test_severity_key_value() {
        let kvs: &[(&str, &str)] = &[("severity", "critical"), ("user", "alice")];
        let event = with_record(&kvs, |record| event_from_record(record, false));
        assert_eq!(event.level, Level::Critical);
        assert_eq!(event.extra["user"], "alice");
        assert!(!event.extra.contains_key("severity"));

        let kvs: &[(&str, &str)] = &[("severity", "loud")];
        let level = with_record(&kvs, level_from_record);
        assert_eq!(level, Level::Error);
    }

    #[test]
    fn test_breadcrumb_from_record() {
        let kvs: &[(&str, i32)] = &[("attempt", 3)];
        let breadcrumb = with_record(&kvs, breadcrumb_from_record);
        assert_eq!(breadcrumb.ty, "log");
        assert_eq!(breadcrumb.category.as_deref(), Some("app::handlers"));
        assert_eq!(breadcrumb.level, Level::Error);
        assert_eq!(breadcrumb.data["attempt"], 3);
    }
}
