use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{stderr, stdout, Write};
use std::sync::{Mutex, Once};

/// Log implementation for standard output streams
///
/// Errors go to standard error, everything else to standard output, each record on its own line
/// behind a marker for its level.
pub struct StdLogger(Mutex<()>);

/// Map the number of `-v` flags to the most verbose level that gets through
fn level_for(verbosity: u64) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Prefix printed in front of each record
fn marker(level: Level) -> &'static str {
    match level {
        Level::Error | Level::Warn => "[-]",
        Level::Info => "[i]",
        Level::Debug | Level::Trace => "[+]",
    }
}

impl StdLogger {
    /// Initialize logger
    ///
    /// Even if this function is called multiple times, initialization will only be done once and
    /// the verbosity of the first call sticks.
    ///
    /// If another logger has already been installed, this one stays out of the way.
    pub fn init(verbosity: u64) {
        static INIT: Once = Once::new();

        // Initialization may run from more than one thread
        INIT.call_once(|| {
            if log::set_boxed_logger(Box::new(StdLogger(Mutex::new(())))).is_ok() {
                log::set_max_level(level_for(verbosity));
            }
        });
    }
}

impl Log for StdLogger {
    /// This logger is enabled by default
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    /// Probe threads log concurrently, the lock keeps their lines apart
    fn log(&self, record: &Record) {
        let _guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let prefix = marker(record.level());

        if record.level() == Level::Error {
            let stderr = stderr();
            let mut handle = stderr.lock();
            let _ = writeln!(handle, "{} {}", prefix, record.args());
        } else {
            let stdout = stdout();
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{} {}", prefix, record.args());
        }
    }

    /// Flush buffered output stream
    fn flush(&self) {
        let _ = stdout().flush();
    }
}
