use serde::Serialize;

use crate::types::{AccountFailure, AppRecord, OperationResult, Outcome, RunState, StatusEntry};

/// Result of a status sweep across all accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub summary: AppsSummary,
    pub apps: Vec<StatusEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppsSummary {
    pub total: usize,
    pub active: usize,
    pub stopped: usize,
    pub unknown: usize,
}

impl AppsSummary {
    pub fn from_entries(entries: &[StatusEntry]) -> Self {
        let count = |state: RunState| entries.iter().filter(|e| e.state() == Some(&state)).count();
        Self {
            total: entries.iter().filter(|e| e.state().is_some()).count(),
            active: count(RunState::Active),
            stopped: count(RunState::Stopped),
            unknown: count(RunState::Unknown),
        }
    }
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_apps(&mut self, apps: Vec<AppRecord>) {
        self.apps.extend(apps.into_iter().map(StatusEntry::App));
    }

    pub fn add_failure(&mut self, account: &str, error: String) {
        self.apps.push(StatusEntry::Failed(AccountFailure {
            account: account.to_string(),
            error,
        }));
    }

    /// Recomputes the summary from the collected entries.
    pub fn finish(mut self) -> Self {
        self.summary = AppsSummary::from_entries(&self.apps);
        self
    }
}

/// Started vs failed counts for a batch of restart results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartTally {
    pub started: usize,
    pub failed: usize,
}

impl RestartTally {
    pub fn from_results(results: &[OperationResult]) -> Self {
        Self {
            started: results.iter().filter(|r| r.status == Outcome::Started).count(),
            failed: results.iter().filter(|r| r.status.is_failure()).count(),
        }
    }
}
