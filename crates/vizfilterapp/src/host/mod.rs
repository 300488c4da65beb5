//! # Host Layer
//!
//! The engine never owns document data. Filter objects, views and elements
//! live in a host document (a BIM model, a drawing database, ...) reached
//! through the [`HostDocument`] trait.
//!
//! ## Contract
//!
//! - **Identity**: [`HostDocument::document_id`] keys every process-lifetime
//!   cache, so two open documents never share session memory or snapshots.
//! - **Transactions**: every mutation of a top-level operation happens inside
//!   one edit transaction. [`with_transaction`] begins it, commits on success,
//!   and rolls back on any error. Failing to begin or commit is the only fatal
//!   error of an operation.
//! - **Filters**: enumerate, create, and replace name/categories/rules.
//! - **Views**: list attached filters, attach/detach, read and write per-filter
//!   visibility and overrides, and report template locks.
//! - **Elements**: enumerate elements of a category set and read their
//!   parameter values (for value enumeration).
//!
//! Host calls return [`Result`]; the engine decides per call whether a failure
//! is recorded and skipped or propagated.
//!
//! ## Implementations
//!
//! - [`memory::MemHost`]: an in-memory document with transaction rollback,
//!   template locks and injectable failures. Backs tests and the CLI.

use std::collections::BTreeSet;

use crate::error::{Result, VizError};
use crate::model::{
    CategoryId, DocumentId, ElementId, FilterId, FilterObject, OverrideRecord, ParamValue,
    ParameterId, PatternId, ViewId,
};
use crate::rules::Rule;

pub mod memory;

/// Abstract interface to the document that owns filters and views.
pub trait HostDocument {
    /// Identity of the open document.
    fn document_id(&self) -> DocumentId;

    // --- Transactions ---

    fn begin_transaction(&mut self, name: &str) -> Result<()>;

    fn commit_transaction(&mut self) -> Result<()>;

    /// Discard everything since `begin_transaction`. Must not fail.
    fn rollback_transaction(&mut self);

    // --- Filter objects ---

    /// All filter objects in the document.
    fn filters(&self) -> Result<Vec<FilterObject>>;

    fn create_filter(
        &mut self,
        name: &str,
        categories: &BTreeSet<CategoryId>,
        rules: &[Rule],
    ) -> Result<FilterId>;

    fn set_filter_name(&mut self, id: FilterId, name: &str) -> Result<()>;

    fn set_filter_categories(&mut self, id: FilterId, categories: &BTreeSet<CategoryId>)
        -> Result<()>;

    fn set_filter_rules(&mut self, id: FilterId, rules: &[Rule]) -> Result<()>;

    // --- Categories & views ---

    fn category_name(&self, id: CategoryId) -> Option<String>;

    fn active_view(&self) -> Option<ViewId>;

    fn view_name(&self, view: ViewId) -> Result<String>;

    /// Name of the template controlling the view's filters, if any.
    fn view_template_lock(&self, view: ViewId) -> Result<Option<String>>;

    /// Filters attached to the view. Order is not meaningful.
    fn view_filters(&self, view: ViewId) -> Result<Vec<FilterId>>;

    fn attach_filter(&mut self, view: ViewId, filter: FilterId) -> Result<()>;

    fn detach_filter(&mut self, view: ViewId, filter: FilterId) -> Result<()>;

    fn filter_visibility(&self, view: ViewId, filter: FilterId) -> Result<bool>;

    fn set_filter_visibility(&mut self, view: ViewId, filter: FilterId, visible: bool)
        -> Result<()>;

    fn filter_overrides(&self, view: ViewId, filter: FilterId) -> Result<OverrideRecord>;

    fn set_filter_overrides(
        &mut self,
        view: ViewId,
        filter: FilterId,
        overrides: &OverrideRecord,
    ) -> Result<()>;

    /// The document's solid fill pattern, used when a selection names none.
    fn solid_fill_pattern(&self) -> Option<PatternId>;

    // --- Elements ---

    fn elements_of(&self, categories: &BTreeSet<CategoryId>) -> Result<Vec<ElementId>>;

    /// `None` when the element lacks the parameter.
    fn parameter_value(&self, element: ElementId, parameter: ParameterId) -> Option<ParamValue>;

    fn element_name(&self, element: ElementId) -> Option<String>;
}

/// Run `f` inside one host edit transaction.
pub fn with_transaction<H, T, F>(host: &mut H, name: &str, f: F) -> Result<T>
where
    H: HostDocument + ?Sized,
    F: FnOnce(&mut H) -> Result<T>,
{
    host.begin_transaction(name)
        .map_err(|e| VizError::Transaction(format!("could not start '{}': {}", name, e)))?;

    match f(host) {
        Ok(value) => match host.commit_transaction() {
            Ok(()) => Ok(value),
            Err(e) => {
                host.rollback_transaction();
                Err(VizError::Transaction(format!(
                    "could not commit '{}': {}",
                    name, e
                )))
            }
        },
        Err(e) => {
            tracing::warn!(transaction = name, error = %e, "rolling back");
            host.rollback_transaction();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemHost;
    use super::*;

    #[test]
    fn commit_keeps_changes() {
        let mut host = MemHost::new();
        let cat = host.add_category("Walls");
        with_transaction(&mut host, "create", |h| {
            h.create_filter("A", &BTreeSet::from([cat]), &[])
        })
        .unwrap();
        assert!(host.filter_by_name("A").is_some());
        assert_eq!(host.committed_transactions(), ["create"]);
    }

    #[test]
    fn error_rolls_back_partial_work() {
        let mut host = MemHost::new();
        let cat = host.add_category("Walls");
        let result: Result<()> = with_transaction(&mut host, "create", |h| {
            h.create_filter("A", &BTreeSet::from([cat]), &[])?;
            Err(VizError::Host("boom".into()))
        });
        assert!(result.is_err());
        assert!(host.filter_by_name("A").is_none());
        assert!(host.committed_transactions().is_empty());
    }

    #[test]
    fn commit_failure_is_fatal_and_rolls_back() {
        let mut host = MemHost::new();
        let cat = host.add_category("Walls");
        host.failures_mut().commit = true;
        let result = with_transaction(&mut host, "create", |h| {
            h.create_filter("A", &BTreeSet::from([cat]), &[])
        });
        assert!(matches!(result, Err(VizError::Transaction(_))));
        assert!(host.filter_by_name("A").is_none());
    }

    #[test]
    fn begin_failure_is_fatal() {
        let mut host = MemHost::new();
        host.failures_mut().begin = true;
        let result = with_transaction(&mut host, "noop", |_| Ok(()));
        assert!(matches!(result, Err(VizError::Transaction(_))));
    }
}
