//! Buffered validation messages collected by the report-model provider.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    pub level: Severity,
    #[serde(default)]
    pub code: String,
    pub message: String,
}

impl LogRecord {
    pub fn new(level: Severity, code: &str, message: &str) -> Self {
        Self {
            level,
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// A validation message as it appears in the viewer data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub sev: String,
    pub code: String,
    pub msg: String,
}

/// Logging collaborator. Only a buffering handler can supply messages.
pub trait LogHandler {
    fn log_record_buffer(&self) -> Option<&[LogRecord]>;
}

/// Handler that keeps every record it is given.
#[derive(Debug, Clone, Default)]
pub struct LogRecordBuffer {
    records: Vec<LogRecord>,
}

impl LogRecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<LogRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }
}

impl LogHandler for LogRecordBuffer {
    fn log_record_buffer(&self) -> Option<&[LogRecord]> {
        Some(&self.records)
    }
}

/// Handler for a provider that logs straight to its sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnbufferedLog;

impl LogHandler for UnbufferedLog {
    fn log_record_buffer(&self) -> Option<&[LogRecord]> {
        None
    }
}

/// Messages above INFO, in the order they were logged.
pub fn collect_messages(records: &[LogRecord]) -> Vec<ValidationMessage> {
    records
        .iter()
        .filter(|r| r.level > Severity::Info)
        .map(|r| ValidationMessage {
            sev: r.level.as_str().to_string(),
            code: r.code.clone(),
            msg: r.message.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_and_below_are_filtered() {
        let records = vec![
            LogRecord::new(Severity::Info, "info", "Loaded"),
            LogRecord::new(Severity::Debug, "dbg", "Detail"),
            LogRecord::new(Severity::Warning, "w1", "Odd"),
            LogRecord::new(Severity::Error, "code1", "Error message"),
        ];
        let messages = collect_messages(&records);
        assert_eq!(
            messages,
            vec![
                ValidationMessage {
                    sev: "WARNING".into(),
                    code: "w1".into(),
                    msg: "Odd".into()
                },
                ValidationMessage {
                    sev: "ERROR".into(),
                    code: "code1".into(),
                    msg: "Error message".into()
                },
            ]
        );
    }

    #[test]
    fn unbuffered_handler_has_no_records() {
        assert!(UnbufferedLog.log_record_buffer().is_none());
        assert_eq!(LogRecordBuffer::new().log_record_buffer().map(|r| r.len()), Some(0));
    }
}
