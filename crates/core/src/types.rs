use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// One persisted credential. Field names on disk are camelCase so the file
/// stays readable by the account-list shell that consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Creation timestamp in milliseconds, rendered as a decimal string.
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    pub fn new(email: String, password: String, first_name: String, last_name: String) -> Self {
        let created_at = Utc::now();
        Self {
            id: created_at.timestamp_millis().to_string(),
            email,
            password,
            first_name,
            last_name,
            created_at,
        }
    }
}

/// Outcome of one registration attempt. Built once at the session boundary,
/// never mutated.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub success: bool,
    pub record: Option<AccountRecord>,
    pub error: Option<ErrorKind>,
    pub detail: Option<String>,
}

impl SessionResult {
    pub fn ok(record: AccountRecord) -> Self {
        Self {
            success: true,
            record: Some(record),
            error: None,
            detail: None,
        }
    }

    pub fn failed(error: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            record: None,
            error: Some(error),
            detail: Some(detail.into()),
        }
    }
}

/// Per-completion progress event: `current` sessions finished out of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// Results of a whole batch run, in completion order within each batch.
/// Aggregate counts are derived, not stored.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<SessionResult>,
}

impl BatchReport {
    pub fn push(&mut self, result: SessionResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}
