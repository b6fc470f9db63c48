//! Audit-trail logging for onboarding operations.
//!
//! Import and assignment runs narrate what they do (one line per row or
//! delegate) through a broadcast channel so an operator console can tail a
//! run live. Entries are also mirrored to stdout. Logging is narration only:
//! nothing in the pipeline branches on it.
//!
//! Every entry carries a `scope` - the program-year id the operation is
//! acting on - so interleaved runs can be told apart.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Log level for operator display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Program-year id (or other scope) the entry belongs to
    pub scope: String,
    /// Log message
    pub message: String,
    /// Optional raw error detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Timestamp (UTC)
    pub at: DateTime<Utc>,
}

impl LogEntry {
    pub fn info(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, scope, message)
    }

    pub fn success(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, scope, message)
    }

    pub fn warning(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, scope, message)
    }

    pub fn error(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, scope, message)
    }

    fn new(level: LogLevel, scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            scope: scope.into(),
            message: message.into(),
            detail: None,
            at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Global audit broadcaster
pub static AUDIT_LOG: Lazy<AuditLog> = Lazy::new(AuditLog::new);

/// Broadcasts audit entries to all subscribed consoles
pub struct AuditLog {
    sender: broadcast::Sender<LogEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Record an entry: print to stdout and broadcast to subscribers
    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "  ✓",
            LogLevel::Warning => "  !",
            LogLevel::Error => "  ✗",
        };
        match entry.detail {
            Some(ref detail) => {
                println!("{} [{}] {} ({})", prefix, entry.scope, entry.message, detail)
            }
            None => println!("{} [{}] {}", prefix, entry.scope, entry.message),
        }

        // Broadcast to consoles (ignore if no receivers)
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for live tailing
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient logging functions
pub fn log_info(scope: impl Into<String>, msg: impl Into<String>) {
    AUDIT_LOG.log(LogEntry::info(scope, msg));
}

pub fn log_success(scope: impl Into<String>, msg: impl Into<String>) {
    AUDIT_LOG.log(LogEntry::success(scope, msg));
}

pub fn log_warning(scope: impl Into<String>, msg: impl Into<String>) {
    AUDIT_LOG.log(LogEntry::warning(scope, msg));
}

pub fn log_error(scope: impl Into<String>, msg: impl Into<String>, detail: Option<String>) {
    let mut entry = LogEntry::error(scope, msg);
    if let Some(detail) = detail {
        entry = entry.with_detail(detail);
    }
    AUDIT_LOG.log(entry);
}

/// Subscribe to the global audit stream
pub fn subscribe() -> broadcast::Receiver<LogEntry> {
    AUDIT_LOG.subscribe()
}
