//! # Command Layer
//!
//! This module contains the **core logic** of vizfilter. Each step of a run
//! lives in its own submodule and works on plain domain types plus a
//! [`HostDocument`](crate::host::HostDocument).
//!
//! ## Role and Responsibilities
//!
//! - [`create`]: build rules and names per value, create or update filter objects
//! - [`graphics`]: compute and apply per-view graphic overrides
//! - [`reconcile`]: reorder a view's filter list, preserving untouched settings
//! - [`values`]: enumerate distinct parameter values for a picker
//!
//! ## What Commands Do NOT Do
//!
//! - **Transactions**: the API facade opens and commits them
//! - **Presentation**: results are structured data, never strings for a terminal
//! - **Abort on item failure**: a value or view that fails becomes a message
//!   in the report and the batch moves on
//!
//! ## Structured Returns
//!
//! Commands return a [`RunReport`]: counts, the filters touched this run (in
//! processing order), per-view reconciliation outcomes and leveled
//! [`CmdMessage`]s carrying skip reasons and warnings.
//!
//! ## Testing Strategy
//!
//! **This is where most of the testing lives.** Command tests run against
//! [`MemHost`](crate::host::memory::MemHost) fixtures and check report contents
//! and the resulting document state.

use serde::Serialize;

use crate::model::FilterId;

pub mod create;
pub mod graphics;
pub mod reconcile;
pub mod values;

pub use reconcile::ViewOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOutcome {
    Created,
    Updated,
}

/// A filter created or updated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFilter {
    pub id: FilterId,
    pub name: String,
    pub value_label: String,
    pub outcome: FilterOutcome,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub created: usize,
    pub updated: usize,
    pub processed: Vec<ProcessedFilter>,
    pub views: Vec<ViewOutcome>,
    pub messages: Vec<CmdMessage>,
}

impl RunReport {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn record(&mut self, filter: ProcessedFilter) {
        match filter.outcome {
            FilterOutcome::Created => self.created += 1,
            FilterOutcome::Updated => self.updated += 1,
        }
        self.processed.push(filter);
    }

    /// Ids touched this run, de-duplicated, in processing order.
    pub fn processed_ids(&self) -> Vec<FilterId> {
        let mut ids: Vec<FilterId> = Vec::with_capacity(self.processed.len());
        for p in &self.processed {
            if !ids.contains(&p.id) {
                ids.push(p.id);
            }
        }
        ids
    }

    /// Messages at warning level or above.
    pub fn skips(&self) -> impl Iterator<Item = &CmdMessage> {
        self.messages
            .iter()
            .filter(|m| matches!(m.level, MessageLevel::Warning | MessageLevel::Error))
    }

    pub fn merge(&mut self, other: RunReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.processed.extend(other.processed);
        self.views.extend(other.views);
        self.messages.extend(other.messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed(id: i64, outcome: FilterOutcome) -> ProcessedFilter {
        ProcessedFilter {
            id: FilterId(id),
            name: format!("F{}", id),
            value_label: "v".into(),
            outcome,
        }
    }

    #[test]
    fn record_counts_outcomes() {
        let mut report = RunReport::default();
        report.record(processed(1, FilterOutcome::Created));
        report.record(processed(2, FilterOutcome::Updated));
        report.record(processed(3, FilterOutcome::Created));
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 1);
    }

    #[test]
    fn processed_ids_are_unique_in_order() {
        let mut report = RunReport::default();
        report.record(processed(5, FilterOutcome::Created));
        report.record(processed(2, FilterOutcome::Updated));
        report.record(processed(5, FilterOutcome::Updated));
        assert_eq!(report.processed_ids(), vec![FilterId(5), FilterId(2)]);
    }

    #[test]
    fn skips_only_include_warnings_and_errors() {
        let mut report = RunReport::default();
        report.add_message(CmdMessage::success("ok"));
        report.add_message(CmdMessage::warning("skipped"));
        report.add_message(CmdMessage::error("failed"));
        assert_eq!(report.skips().count(), 2);
    }
}
