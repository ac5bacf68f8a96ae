//! Structured logging for the aquifer monitoring service.
//!
//! Context-rich logging with data-source and unit identifiers, timestamps,
//! and severity levels. Supports console output and an optional log file
//! for unattended runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Metamodel API: zone series and geometries.
    Metamodel,
    /// Well platform API: listings, records, forecasts, levels.
    Wells,
    /// Chart rendering backend.
    Render,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Metamodel => write!(f, "META"),
            DataSource::Wells => write!(f, "POZOS"),
            DataSource::Render => write!(f, "RENDER"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - a zone or well may simply have no data yet
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classifies an upstream failure from its error message. Missing data is
/// a normal state for young zones and wells; transport and parse problems
/// are not.
pub fn classify_api_failure(error_message: &str) -> FailureType {
    if error_message.contains("No data available") {
        FailureType::Expected
    } else if error_message.contains("HTTP error")
        || error_message.contains("Transport error")
        || error_message.contains("Parse error")
    {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
}

impl Logger {
    fn log(&self, level: LogLevel, source: DataSource, unit_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let unit_part = unit_id.map(|u| format!(" [{}]", u)).unwrap_or_default();
        let entry = format!("{} {} {}{}: {}", timestamp, level, source, unit_part, message);

        match level {
            LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, unit_part, message),
            LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, unit_part, message),
            LogLevel::Info => println!("   {}", message),
            LogLevel::Debug => println!("   [DEBUG] {}", message),
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    let logger = Logger {
        min_level,
        log_file: log_file.map(String::from),
    };
    *LOGGER.lock().unwrap() = Some(logger);
}

/// Log a general informational message
pub fn info(source: DataSource, unit_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, source, unit_id, message);
    }
}

/// Log a warning message
pub fn warn(source: DataSource, unit_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, source, unit_id, message);
    }
}

/// Log an error message
pub fn error(source: DataSource, unit_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, source, unit_id, message);
    }
}

/// Log a debug message
pub fn debug(source: DataSource, unit_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, source, unit_id, message);
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log an upstream failure with automatic classification
pub fn log_fetch_failure(
    source: DataSource,
    unit_id: &str,
    operation: &str,
    err: &dyn std::error::Error,
) {
    let error_msg = err.to_string();
    let failure_type = classify_api_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(source, Some(unit_id), &message),
        FailureType::Unexpected => error(source, Some(unit_id), &message),
        FailureType::Unknown => warn(source, Some(unit_id), &message),
    }
}

/// Log a summary line for one finished run
pub fn log_run_summary(total: usize, successful: usize, failed: usize, artifacts: usize) {
    let message = format!(
        "Run complete: {}/{} units successful, {} failed, {} artifacts written",
        successful, total, failed, artifacts
    );

    if failed == 0 {
        info(DataSource::System, None, &message);
    } else if successful == 0 {
        error(DataSource::System, None, &message);
    } else {
        warn(DataSource::System, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_failure_classification() {
        let no_data = "No data available: zone geometry features";
        assert_eq!(classify_api_failure(no_data), FailureType::Expected);

        let http = "HTTP error: 500";
        assert_eq!(classify_api_failure(http), FailureType::Unexpected);

        let parse = "Parse error: missing field `date`";
        assert_eq!(classify_api_failure(parse), FailureType::Unexpected);

        assert_eq!(
            classify_api_failure("something odd"),
            FailureType::Unknown
        );
    }
}
