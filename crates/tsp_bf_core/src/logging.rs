use std::{fs::File, io::Write};

use env_logger::{Builder, Target, WriteStyle, fmt::Formatter};
use log::{Level, LevelFilter, Record};

use crate::options::{LogFormat, SearchOptions};
use crate::{Error, Result};

/// HTTP stack crates that are chatty below `warn`.
const QUIET_MODULES: &[&str] = &["hyper", "reqwest", "warp", "mio"];

pub fn init_logger(options: &SearchOptions) -> Result<()> {
    let log_format = options.log_format;
    let log_timestamp = options.log_timestamp;
    let level = options.log_level.to_filter();

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .write_style(WriteStyle::Never)
        .target(log_target(options)?)
        .format(move |buf: &mut Formatter, record| {
            if log_timestamp {
                write!(buf, "{} ", buf.timestamp_millis())?;
            }
            write_record(buf, record, log_format)
        });
    for module in QUIET_MODULES {
        builder.filter_module(module, level.min(LevelFilter::Warn));
    }

    builder
        .try_init()
        .map_err(|e| Error::other(format!("logger init failed: {e}")))
}

fn log_target(options: &SearchOptions) -> Result<Target> {
    let Some(log_path) = options.log_output_path() else {
        return Ok(Target::Stderr);
    };
    let log_file = File::create(log_path).map_err(|e| {
        Error::other(format!(
            "failed to create log output file {}: {e}",
            log_path.display()
        ))
    })?;
    Ok(Target::Pipe(Box::new(log_file)))
}

fn write_record(buf: &mut Formatter, record: &Record<'_>, format: LogFormat) -> std::io::Result<()> {
    let tag = level_tag(record.level());
    match format {
        LogFormat::Compact => writeln!(buf, "{tag} {}", record.args()),
        LogFormat::Pretty => match record.line() {
            Some(line) => writeln!(buf, "{tag} [{}:{line}] {}", record.target(), record.args()),
            None => writeln!(buf, "{tag} [{}] {}", record.target(), record.args()),
        },
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}
