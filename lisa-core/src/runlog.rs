//! Ordered, hierarchical log of a run.
//!
//! Conditions with a safe default (resource fallbacks, worker advisories,
//! unmatched genes, failed assays) are appended here instead of being raised.
//! Every entry is also forwarded to the `log` facade.
use log::{info, warn};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Level {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub depth: usize,
    pub level: Level,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    depth: usize,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, level: Level, text: &str) {
        let indent = "\t".repeat(self.depth);
        match level {
            Level::Info => info!("{}{}", indent, text),
            Level::Warning => warn!("{}{}", indent, text),
        }
        self.entries.push(LogEntry {
            depth: self.depth,
            level,
            message: text.to_string(),
        });
    }

    pub fn append(&mut self, text: &str) {
        self.push(Level::Info, text);
    }

    pub fn warn(&mut self, text: &str) {
        self.push(Level::Warning, text);
    }

    pub fn start_section(&mut self, header: &str) {
        self.append(header);
        self.depth += 1;
    }

    pub fn end_section(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    ///
    /// Run `body` inside a section headed by `header`. The section is closed
    /// again whatever `body` returns.
    ///
    pub fn section<T, F>(&mut self, header: &str, body: F) -> T
    where
        F: FnOnce(&mut RunLog) -> T,
    {
        self.start_section(header);
        let result = body(self);
        self.end_section();
        result
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.level == Level::Warning)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Tab-indented text of the whole log.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}{}", "\t".repeat(e.depth), e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
