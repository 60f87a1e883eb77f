//! Console logging: `log` facade backed by env_logger, routed through
//! indicatif when progress bars are on screen.

use std::io::Write;

use indicatif::MultiProgress;

const RESET: &str = "\x1b[0m";

fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn level_color(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// How one record is rendered, shared by the TTY and plain outputs.
#[derive(Debug, Clone, Copy)]
struct LineFormat {
    color: bool,
    /// Append the module path (verbose runs)
    with_target: bool,
}

impl LineFormat {
    fn render(&self, level: log::Level, target: &str, args: &std::fmt::Arguments<'_>) -> String {
        let label = level_label(level);
        let tag = if self.color {
            format!("{}{label}{RESET}", level_color(level))
        } else {
            label.to_string()
        };
        if self.with_target {
            format!("[{tag} {target}] {args}")
        } else {
            format!("[{tag}] {args}")
        }
    }
}

/// Logger that prints above indicatif bars instead of tearing through them.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
    format: LineFormat,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress, verbose: bool) -> Self {
        Self {
            inner,
            multi,
            format: LineFormat {
                color: true,
                with_target: verbose,
            },
        }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        let line = self
            .format
            .render(record.level(), record.target(), record.args());
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the process logger. Call once, before any stage runs.
///
/// The filter is `RUST_LOG` if set, else `debug` for verbose runs and `info`
/// otherwise. `multi` is the progress context's `MultiProgress` when stderr
/// is a TTY; `None` selects plain timestamped lines for log aggregation.
pub fn init_logging(verbose: bool, multi: Option<&MultiProgress>) {
    let default_filter = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    match multi {
        Some(multi) => {
            let logger = builder.build();
            let max_level = logger.filter();
            log::set_boxed_logger(Box::new(IndicatifLogger::new(
                logger,
                multi.clone(),
                verbose,
            )))
            .expect("failed to init logger");
            log::set_max_level(max_level);
        }
        None => {
            let format = LineFormat {
                color: false,
                with_target: verbose,
            };
            builder
                .format(move |buf, record| {
                    let line = format.render(record.level(), record.target(), record.args());
                    writeln!(buf, "{} {line}", buf.timestamp_millis())
                })
                .init();
        }
    }
}
