//! Diagnostic sink: timestamped reports on stderr plus an append-only log file
//!
//! The file is opened and closed on every write so that a crash never loses
//! earlier lines. Reports are also forwarded to `tracing` so an application
//! subscriber sees them alongside the crate's structured events.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

/// Log file used by [`Trace::default`].
pub const DEFAULT_TRACE_FILE: &str = "trace.log";

/// The log file is truncated before a write once it grows past this size.
pub const MAX_TRACE_FILE_SIZE: u64 = 0x1000_0000;

/// Messages are clipped to this many bytes.
pub const MAX_MESSAGE_SIZE: usize = 0x4000;

const INTERNAL_ERROR: &str = "Internal error";

/// Report severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "Info",
            Level::Warning => "Warning",
            Level::Error => "Error",
        }
    }
}

/// Diagnostic sink bound to one log file.
///
/// # Example
///
/// ```
/// use layernet::utils::trace::{Level, Trace};
///
/// let dir = std::env::temp_dir().join("layernet-trace-doc");
/// std::fs::create_dir_all(&dir).unwrap();
/// let trace = Trace::new(dir.join("trace.log"));
///
/// trace.report(Level::Info, "training started");
/// trace.check(true, "never reported");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    path: PathBuf,
}

impl Default for Trace {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_FILE)
    }
}

impl Trace {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Formats a report line as `[Level @ YYYY-MM-DD HH:MM:SS]: msg`, without newline.
    pub fn format(level: Level, msg: &str) -> String {
        format!("[{} @ {}]: {}", level.as_str(), timestamp(SystemTime::now()), clip(msg))
    }

    /// Writes a report to stderr and the log file.
    ///
    /// An `Error` report terminates the process with status 1.
    pub fn report(&self, level: Level, msg: &str) {
        let msg = clip(msg);
        eprintln!("{}", Self::format(level, msg));

        match level {
            Level::Info => info!(target: "layernet::trace", "{}", msg),
            Level::Warning => warn!(target: "layernet::trace", "{}", msg),
            Level::Error => error!(target: "layernet::trace", "{}", msg),
        }

        // Log file failures are ignored here; use `append` to observe them.
        let _ = self.append(msg);

        if level == Level::Error {
            std::process::exit(1);
        }
    }

    /// Reports `msg` as an error, terminating the process, when `condition` is false.
    pub fn check(&self, condition: bool, msg: &str) {
        if !condition {
            self.report(Level::Error, msg);
        }
    }

    /// Appends one line to the log file, truncating the file first when it is
    /// larger than [`MAX_TRACE_FILE_SIZE`].
    pub fn append(&self, msg: &str) -> io::Result<()> {
        let oversized = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() > MAX_TRACE_FILE_SIZE,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e),
        };

        let mut file = if oversized {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)?
        } else {
            OpenOptions::new().append(true).create(true).open(&self.path)?
        };

        writeln!(file, "{}", clip(msg))
    }
}

/// Clips to [`MAX_MESSAGE_SIZE`] bytes on a char boundary; empty messages
/// become a generic internal error.
fn clip(msg: &str) -> &str {
    if msg.is_empty() {
        return INTERNAL_ERROR;
    }
    if msg.len() <= MAX_MESSAGE_SIZE {
        return msg;
    }
    let mut end = MAX_MESSAGE_SIZE;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    &msg[..end]
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
fn timestamp(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Proleptic Gregorian date for a day count relative to 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}
