//! Formatting layers and file writers

use std::fs::{self, File};

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{
    self, MakeWriter,
    format::{Format, Json, JsonFields},
};
use tracing_subscriber::registry::LookupSpan;

use crate::config::{FileConfig, JsonlConfig, RotationStrategy};
use crate::error::LogResult;

/// Human-readable console layer
pub fn pretty_layer<S>(ansi: bool) -> fmt::Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer().with_ansi(ansi).with_target(true)
}

/// JSON lines layer writing to `writer`
pub fn jsonl_layer<S, W>(config: &JsonlConfig, writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(config.include_current_span)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_writer(writer)
}

/// Open a non-blocking writer for file output
///
/// `Never` truncates a single file; the other strategies append to rolling
/// files named `<prefix>.<date>.jsonl`. The guard must outlive all logging.
pub fn file_writer(config: &FileConfig) -> LogResult<(NonBlocking, WorkerGuard)> {
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&config.directory)?;
            let file = File::create(config.single_file_path())?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("jsonl");
    if let Some(max) = config.max_files {
        builder = builder.max_log_files(max);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_rotation_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::in_dir(dir.path().join("nested")).with_rotation(RotationStrategy::Never);

        let (_writer, _guard) = file_writer(&config).unwrap();
        assert!(config.single_file_path().exists());
    }

    #[test]
    fn test_daily_rotation_builds() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::in_dir(dir.path());

        assert!(file_writer(&config).is_ok());
    }
}
