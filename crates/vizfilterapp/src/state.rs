//! Session memory: the last selection made against the open document.
//!
//! A picker uses it to pre-fill categories, parameter and options, and to
//! re-check the values picked last time. Values are stored as [`ValueKey`]s,
//! so a value is recognised again even when it is reloaded from the host as a
//! fresh [`Value`].
//!
//! Memory is bound to one [`DocumentId`]. Binding another document clears it.
//! Nothing is persisted beyond the process.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::codec::{contains_value, ValueKey};
use crate::model::{
    CategoryId, DocumentId, GraphicsOptions, NamingOptions, ParameterDescriptor, RuleKind,
    Selection, Value, ViewScope,
};

/// The fields of a selection, minus the values themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RememberedSelection {
    pub categories: BTreeSet<CategoryId>,
    pub parameter: ParameterDescriptor,
    pub rule_kind: RuleKind,
    pub naming: NamingOptions,
    pub graphics: GraphicsOptions,
    pub scope: ViewScope,
    pub override_existing: bool,
    pub value_keys: Vec<ValueKey>,
}

impl RememberedSelection {
    fn capture(selection: &Selection) -> Self {
        Self {
            categories: selection.categories.clone(),
            parameter: selection.parameter.clone(),
            rule_kind: selection.rule_kind,
            naming: selection.naming.clone(),
            graphics: selection.graphics.clone(),
            scope: selection.scope.clone(),
            override_existing: selection.override_existing,
            value_keys: selection.values.iter().filter_map(ValueKey::encode).collect(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SessionMemory {
    document: Option<DocumentId>,
    last: Option<RememberedSelection>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the memory at `document`, forgetting everything if it changed.
    pub fn bind(&mut self, document: DocumentId) {
        if self.document != Some(document) {
            if self.document.is_some() {
                tracing::debug!(document = %document, "document changed, clearing session memory");
            }
            self.document = Some(document);
            self.last = None;
        }
    }

    pub fn document(&self) -> Option<DocumentId> {
        self.document
    }

    pub fn remember(&mut self, document: DocumentId, selection: &Selection) {
        self.bind(document);
        self.last = Some(RememberedSelection::capture(selection));
    }

    pub fn recall(&self, document: DocumentId) -> Option<&RememberedSelection> {
        if self.document != Some(document) {
            return None;
        }
        self.last.as_ref()
    }

    /// Whether `value` was among the values picked last time in `document`.
    /// Reals compare within `epsilon`.
    pub fn is_previously_selected(
        &self,
        document: DocumentId,
        value: &Value,
        epsilon: f64,
    ) -> bool {
        self.recall(document)
            .is_some_and(|last| contains_value(&last.value_keys, value, epsilon))
    }
}
