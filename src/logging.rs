//! Log output through env_logger.
//!
//! Lines read `<timestamp> - <LEVEL> - <thread> - <message>` so output from
//! the capture, detector, aim and hotkey threads can be told apart.
//! Per-module `RUST_LOG` directives still apply; the overall level comes from
//! the command line.

use env_logger::{Builder, Env};
use log::{LevelFilter, SetLoggerError};
use std::fmt::Display;
use std::io::Write;

fn format_line(time: impl Display, level: log::Level, thread: &str, args: impl Display) -> String {
    format!("{time} - {level} - {thread} - {args}")
}

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::from_env(Env::default());
    builder.filter_level(level).format(|buf, record| {
        let thread = std::thread::current();
        let line = format_line(
            buf.timestamp_millis(),
            record.level(),
            thread.name().unwrap_or("?"),
            record.args(),
        );
        writeln!(buf, "{line}")
    });
    builder
}

/// Install the logger. Fails if another logger is already set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    builder(level).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Log, Metadata};

    #[test]
    fn test_format_line() {
        let line = format_line("12.500", log::Level::Warn, "detector", format_args!("queue full"));
        assert_eq!(line, "12.500 - WARN - detector - queue full");
    }

    #[test]
    fn test_level_filter() {
        let logger = builder(LevelFilter::Info).build();
        let debug = Metadata::builder().level(log::Level::Debug).build();
        let error = Metadata::builder().level(log::Level::Error).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&error));
    }
}
