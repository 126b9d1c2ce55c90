//! Relay journal and header diagnostics.
//!
//! The journal keeps the most recent entries in memory, appends them to a JSONL file,
//! and mirrors every entry to `tracing`. Debug entries carry per-request diagnostics and
//! only go to `tracing`; they are never written to the file.

use crate::error::Result;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_JOURNAL_ENTRIES: usize = 10_000;

/// Headers whose values never reach a log line.
const ALWAYS_REDACTED: &[&str] = &["authorization", "proxy-authorization", "cookie"];
const REDACTED: &str = "[redacted]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl JournalEntry {
    pub fn new(level: Level, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }

    fn emit_tracing(&self) {
        let context = self
            .context
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default();
        match self.level {
            Level::Debug => {
                tracing::debug!(component = %self.component, %context, "{}", self.message)
            }
            Level::Info => {
                tracing::info!(component = %self.component, %context, "{}", self.message)
            }
            Level::Warn => {
                tracing::warn!(component = %self.component, %context, "{}", self.message)
            }
            Level::Error => {
                tracing::error!(component = %self.component, %context, "{}", self.message)
            }
        }
    }
}

struct Journal {
    entries: VecDeque<JournalEntry>,
    writer: BufWriter<File>,
}

impl Journal {
    fn open(file_path: &Path) -> Result<Self> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut entries = VecDeque::with_capacity(MAX_JOURNAL_ENTRIES);

        // Resume the ring from a previous run so recent() spans restarts.
        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines().map_while(|l| l.ok()) {
                if let Ok(entry) = serde_json::from_str::<JournalEntry>(&line) {
                    if entries.len() >= MAX_JOURNAL_ENTRIES {
                        entries.pop_front();
                    }
                    entries.push_back(entry);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            entries,
            writer: BufWriter::new(file),
        })
    }

    fn record(&mut self, entry: JournalEntry) {
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = writeln!(self.writer, "{}", json);
            let _ = self.writer.flush();
        }
        if self.entries.len() >= MAX_JOURNAL_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

/// Cloneable handle to the process-wide journal.
#[derive(Clone)]
pub struct SharedJournal(Arc<Mutex<Journal>>);

impl SharedJournal {
    pub fn open(file_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Journal::open(
            file_path.as_ref(),
        )?))))
    }

    pub fn record(&self, entry: JournalEntry) {
        entry.emit_tracing();
        if entry.level == Level::Debug {
            return;
        }
        if let Ok(mut journal) = self.0.lock() {
            journal.record(entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.record(JournalEntry::new(Level::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.record(JournalEntry::new(Level::Warn, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.record(JournalEntry::new(Level::Error, component, message));
    }

    pub fn with_context(
        &self,
        level: Level,
        component: impl Into<String>,
        message: impl Into<String>,
        context: serde_json::Value,
    ) {
        self.record(JournalEntry::new(level, component, message).with_context(context));
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<JournalEntry> {
        self.0
            .lock()
            .map(|j| j.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

/// Render inbound headers for diagnostics with credentials masked.
///
/// `credential_header` is the provider key header; it is matched case-insensitively
/// together with the standard authorization and cookie headers.
pub fn redact_headers(headers: &HeaderMap, credential_header: &str) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (name, value) in headers {
        let key = name.as_str();
        let masked = key.eq_ignore_ascii_case(credential_header)
            || ALWAYS_REDACTED.contains(&key);
        let rendered = if masked {
            REDACTED.to_string()
        } else {
            String::from_utf8_lossy(value.as_bytes()).into_owned()
        };
        out.insert(key.to_string(), serde_json::Value::String(rendered));
    }
    serde_json::Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tempfile::tempdir;

    #[test]
    fn test_redact_headers_masks_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert("x-xai-api-key", HeaderValue::from_static("xai-secret"));
        headers.insert("authorization", HeaderValue::from_static("Bearer other-secret"));
        headers.insert("user-agent", HeaderValue::from_static("SillyTavern"));

        let rendered = redact_headers(&headers, "X-XAI-API-Key");
        let text = rendered.to_string();

        assert_eq!(rendered["x-xai-api-key"], "[redacted]");
        assert_eq!(rendered["authorization"], "[redacted]");
        assert_eq!(rendered["user-agent"], "SillyTavern");
        assert!(!text.contains("secret"));
    }

    #[test]
    fn test_journal_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("relay.log");

        let journal = SharedJournal::open(&path).unwrap();
        journal.info("server", "first");
        journal.with_context(
            Level::Warn,
            "models",
            "second",
            serde_json::json!({ "fallback": true }),
        );

        let recent = journal.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[0].level, Level::Warn);
        drop(journal);

        let reopened = SharedJournal::open(&path).unwrap();
        let recent = reopened.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].component, "models");
        assert_eq!(recent[0].context.as_ref().unwrap()["fallback"], true);
    }

    #[test]
    fn test_debug_entries_stay_out_of_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.log");

        let journal = SharedJournal::open(&path).unwrap();
        journal.with_context(
            Level::Debug,
            "server",
            "chat headers",
            serde_json::json!({ "user-agent": "SillyTavern" }),
        );
        journal.info("server", "kept");

        let recent = journal.recent(10);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "kept");

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("kept"));
        assert!(!on_disk.contains("SillyTavern"));
        assert!(!on_disk.contains("\"debug\""));
    }

    #[test]
    fn test_unopenable_journal_is_an_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = SharedJournal::open(blocker.join("relay.log")).err().unwrap();
        assert!(matches!(err, crate::error::RelayError::Io(_)));
        assert_eq!(
            err.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
