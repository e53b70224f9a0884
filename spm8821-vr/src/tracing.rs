//! Logging setup for the voltage-control daemon and tools.
//!
//! Binaries call [`init_journald_or_stdout`] once at startup. Library code
//! uses `use crate::tracing::prelude::*` for the level macros.
//!
//! Register traffic is logged at TRACE; set
//! `RUST_LOG=spm8821_vr=trace` to see every bus transaction.

use std::{env, fmt};

use time::OffsetDateTime;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{
        FmtContext, FormatEvent, FormatFields,
        format::{DefaultFields, Writer as FmtWriter},
        time::FormatTime,
    },
    prelude::*,
    registry::LookupSpan,
};

#[cfg(target_os = "linux")]
use std::{io, os::unix::io::AsRawFd};

#[cfg(target_os = "linux")]
use nix::libc;

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Module path prefix of this crate, hidden in console output.
const CRATE_PREFIX: &str = "spm8821_vr::";

/// Width of the timestamp and level columns, used to indent field lines.
const FIELD_INDENT: usize = 15;

/// True if stderr is the stream systemd advertised in `JOURNAL_STREAM`.
///
/// The variable holds `device:inode` of the journal socket; it is only
/// trusted when it matches what stderr actually points at, so a daemon
/// started from a unit but redirected elsewhere still logs to the console.
#[cfg(target_os = "linux")]
fn stderr_is_journal_stream() -> bool {
    let Some((expected_dev, expected_ino)) = env::var("JOURNAL_STREAM")
        .ok()
        .as_deref()
        .and_then(parse_journal_stream)
    else {
        return false;
    };

    let fd = io::stderr().as_raw_fd();
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    // SAFETY: fd is a valid descriptor for the life of the process and
    // `stat` is a properly sized out-parameter.
    if unsafe { libc::fstat(fd, &mut stat) } != 0 {
        return false;
    }

    stat.st_dev == expected_dev && stat.st_ino == expected_ino
}

fn parse_journal_stream(value: &str) -> Option<(u64, u64)> {
    let (dev, ino) = value.split_once(':')?;
    Some((dev.parse().ok()?, ino.parse().ok()?))
}

/// Install the global subscriber.
///
/// Under systemd, events go to journald tagged with `identifier`. Anywhere
/// else they go to stdout, filtered by `RUST_LOG` (default INFO).
pub fn init_journald_or_stdout(identifier: &str) {
    #[cfg(target_os = "linux")]
    {
        if stderr_is_journal_stream() {
            match tracing_journald::layer() {
                Ok(layer) => {
                    tracing_subscriber::registry()
                        .with(env_filter())
                        .with(layer.with_syslog_identifier(identifier.to_string()))
                        .init();
                    return;
                }
                Err(e) => eprintln!("journald unavailable ({e}), logging to stdout"),
            }
        }
    }
    #[cfg(not(target_os = "linux"))]
    let _ = identifier;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .fmt_fields(DefaultFields::new())
                .event_format(ConsoleFormatter),
        )
        .init();
    debug!("Logging to stdout");
}

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy()
}

/// Shorten an event target for display.
///
/// Our own modules lose the crate prefix. Events bridged from the `log`
/// crate carry their real target in a `log.target` field.
fn display_target<'a>(target: &'a str, log_target: Option<&'a str>) -> &'a str {
    if let Some(stripped) = target.strip_prefix(CRATE_PREFIX) {
        stripped
    } else if target == "log" {
        log_target.unwrap_or(target)
    } else {
        target
    }
}

/// Remove the `Some(..)` wrapper and string quotes from a debug-formatted
/// field value.
fn clean_value(formatted: &str) -> &str {
    let inner = formatted
        .strip_prefix("Some(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(formatted);
    inner.trim_matches('"')
}

/// Single-line message followed by an indented, dimmed field line.
struct ConsoleFormatter;

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let formatted = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(formatted);
        } else {
            self.fields.push((field.name(), formatted));
        }
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: FmtWriter<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        LocalTimer.format_time(&mut writer)?;

        let (color, label) = match *event.metadata().level() {
            Level::ERROR => ("\x1b[31m", "ERROR"),
            Level::WARN => ("\x1b[33m", "WARN "),
            Level::INFO => ("\x1b[32m", "INFO "),
            Level::DEBUG => ("\x1b[34m", "DEBUG"),
            Level::TRACE => ("\x1b[35m", "TRACE"),
        };
        write!(writer, " {}{}\x1b[0m ", color, label)?;

        let log_target = visitor
            .fields
            .iter()
            .find(|(k, _)| *k == "log.target")
            .map(|(_, v)| clean_value(v));
        write!(
            writer,
            "{}: ",
            display_target(event.metadata().target(), log_target)
        )?;

        if let Some(msg) = &visitor.message {
            write!(writer, "{}", msg.trim_matches('"'))?;
        }

        let mut fields = visitor
            .fields
            .iter()
            .filter(|(k, _)| !k.starts_with("log."))
            .peekable();
        if fields.peek().is_some() {
            write!(writer, "\n\x1b[90m{:width$}", "", width = FIELD_INDENT)?;
            for (i, (key, value)) in fields.enumerate() {
                if i > 0 {
                    write!(writer, ", ")?;
                }
                write!(writer, "{}={}", key, clean_value(value))?;
            }
            write!(writer, "\x1b[0m")?;
        }

        writeln!(writer)
    }
}

/// Local wall-clock time to the second.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut FmtWriter<'_>) -> fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!(
                "[hour]:[minute]:[second]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(w, "{}", formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_own_crate_prefix() {
        assert_eq!(display_target("spm8821_vr::service", None), "service");
        assert_eq!(display_target("hyper::proto", None), "hyper::proto");
    }

    #[test]
    fn uses_bridged_log_target() {
        assert_eq!(display_target("log", Some("reqwest::connect")), "reqwest::connect");
        assert_eq!(display_target("log", None), "log");
    }

    #[test]
    fn cleans_field_values() {
        assert_eq!(clean_value("Some(\"dcdc1\")"), "dcdc1");
        assert_eq!(clean_value("\"0x48\""), "0x48");
        assert_eq!(clean_value("None"), "None");
        assert_eq!(clean_value("42"), "42");
    }

    #[test]
    fn parses_journal_stream() {
        assert_eq!(parse_journal_stream("8:12345"), Some((8, 12345)));
        assert_eq!(parse_journal_stream("8"), None);
        assert_eq!(parse_journal_stream("a:b"), None);
    }
}
