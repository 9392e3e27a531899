//! Injected log sink.
//!
//! Library code emits `tracing` events for operators. The orchestrator also
//! reports progress through a [`LogSink`] so an embedding application (a mail
//! responder, a desktop shell) can surface messages to its own user.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Receiver for leveled progress messages.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards messages to the active `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "pipemerge", "{message}"),
            LogLevel::Info => tracing::info!(target: "pipemerge", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "pipemerge", "{message}"),
            LogLevel::Error => tracing::error!(target: "pipemerge", "{message}"),
        }
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages at or above `level`.
    pub fn messages_at_least(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(entry_level, _)| *entry_level >= level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters_by_level() {
        let sink = MemorySink::new();
        sink.log(LogLevel::Debug, "scanning");
        sink.log(LogLevel::Warn, "fallback header");
        sink.log(LogLevel::Error, "failed");
        assert_eq!(sink.entries().len(), 3);
        assert_eq!(
            sink.messages_at_least(LogLevel::Warn),
            vec!["fallback header".to_string(), "failed".to_string()]
        );
    }
}
