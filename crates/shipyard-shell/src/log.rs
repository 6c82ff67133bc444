//! Execution log.

use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// What kind of operation a log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// An external command.
    Command,
    /// A side-effecting task run through a step (e.g. an API call).
    Task,
}

/// One intended operation, executed or suppressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRecord {
    /// Position in the log, starting at zero.
    pub sequence: usize,
    /// Command line or task label.
    pub operation: String,
    /// Operation kind.
    pub kind: OperationKind,
    /// `false` when the operation was suppressed by dry-run.
    pub executed: bool,
    /// When the operation was recorded.
    pub at: DateTime<Utc>,
}

/// Append-only, ordered record of every operation issued during a run.
#[derive(Debug, Default)]
pub struct ExecLog {
    records: Mutex<Vec<ExecRecord>>,
}

impl ExecLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its sequence number.
    pub fn record(&self, operation: impl Into<String>, kind: OperationKind, executed: bool) -> usize {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = records.len();
        records.push(ExecRecord {
            sequence,
            operation: operation.into(),
            kind,
            executed,
            at: Utc::now(),
        });
        sequence
    }

    /// Returns a copy of all entries in call order.
    #[must_use]
    pub fn records(&self) -> Vec<ExecRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the operations in call order, ignoring whether they ran.
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.operation).collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the log one entry per line: `$` for executed, `!` for suppressed.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in self.records() {
            let marker = if record.executed { '$' } else { '!' };
            let _ = writeln!(out, "{marker} {}", record.operation);
        }
        out
    }
}
