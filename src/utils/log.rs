// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{any::Any, fmt as std_fmt, fs::OpenOptions, io::Write, panic::Location, path::Path};

use anyhow::Result;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::utils::ensure_dir_exists;

/// `[LEVEL] message`, the layout of the recovery log.
struct SimpleFormatter;

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let level = *event.metadata().level();
        write!(writer, "[{}] ", level)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Recovery log entry for a panic.
fn panic_line(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    let msg = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload");

    match location {
        Some(l) => format!("[ERROR] recovery-volumes aborted at {}:{}: {}", l.file(), l.line(), msg),
        None => format!("[ERROR] recovery-volumes aborted: {}", msg),
    }
}

/// Logs to stderr and, when `log_path` is given, appends to that file.
///
/// The returned guard flushes the file writer and must outlive every log call.
pub fn init_logging(verbose: bool, log_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let stderr_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_target(false)
        .event_format(SimpleFormatter);

    let mut guard = None;

    let file_layer = if let Some(path) = log_path {
        if let Some(parent) = path.parent() {
            ensure_dir_exists(parent)?;
        }
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid log filename"))?;
        let directory = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Invalid log directory"))?;

        let file_appender = tracing_appender::rolling::never(directory, file_name);
        let (non_blocking, g) = tracing_appender::non_blocking(file_appender);
        guard = Some(g);

        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .event_format(SimpleFormatter),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing_log::LogTracer::init().ok();

    if let Some(path) = log_path {
        let log_file = path.to_path_buf();
        std::panic::set_hook(Box::new(move |info| {
            let line = panic_line(info.payload(), info.location());

            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_file) {
                let _ = writeln!(file, "{}", line);
            }
            eprintln!("{}", line);
        }));
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_line_names_location_and_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("table poisoned"));
        let location = Location::caller();

        let line = panic_line(payload.as_ref(), Some(location));

        assert!(line.starts_with("[ERROR] recovery-volumes aborted at "));
        assert!(line.contains(location.file()));
        assert!(line.ends_with(": table poisoned"));
    }

    #[test]
    fn opaque_payload_still_logs() {
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(
            panic_line(payload.as_ref(), None),
            "[ERROR] recovery-volumes aborted: unknown panic payload"
        );
    }
}
