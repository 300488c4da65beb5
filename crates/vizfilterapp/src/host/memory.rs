use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use super::HostDocument;
use crate::error::{Result, VizError};
use crate::model::{
    CategoryId, DocumentId, ElementId, FilterId, FilterObject, OverrideRecord, ParamValue,
    ParameterId, PatternId, ViewId,
};
use crate::rules::{all_match, Rule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
}

/// One (view, filter) binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilterRecord {
    pub filter: FilterId,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub overrides: OverrideRecord,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub id: ViewId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub filters: Vec<ViewFilterRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub parameter: ParameterId,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: ElementId,
    pub name: String,
    pub category: CategoryId,
    #[serde(default)]
    pub parameters: Vec<ParameterEntry>,
}

/// Serializable state of an in-memory document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSnapshot {
    pub document_id: DocumentId,
    pub categories: Vec<CategoryRecord>,
    pub filters: Vec<FilterObject>,
    pub views: Vec<ViewRecord>,
    pub elements: Vec<ElementRecord>,
    pub active_view: Option<ViewId>,
    pub solid_fill_pattern: Option<PatternId>,
    pub next_id: i64,
}

/// Host calls that should fail, for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFailures {
    pub begin: bool,
    pub commit: bool,
    pub create: bool,
    pub attach: HashSet<FilterId>,
    pub detach: HashSet<FilterId>,
    pub read_overrides: HashSet<FilterId>,
    pub write_overrides: HashSet<FilterId>,
}

/// In-memory host document.
///
/// View filter lists keep attach order, which is what the reconciliation
/// tests observe. Transactions snapshot the whole document on begin and
/// restore it on rollback.
#[derive(Debug, Clone, Default)]
pub struct MemHost {
    doc: DocumentSnapshot,
    open: Option<(String, DocumentSnapshot)>,
    committed: Vec<String>,
    failures: SimulatedFailures,
}

fn rejected(msg: impl Into<String>) -> VizError {
    VizError::Host(msg.into())
}

impl MemHost {
    pub fn new() -> Self {
        Self::from_snapshot(DocumentSnapshot::default())
    }

    pub fn from_snapshot(mut doc: DocumentSnapshot) -> Self {
        let highest = doc
            .categories
            .iter()
            .map(|c| c.id.0)
            .chain(doc.filters.iter().map(|f| f.id.0))
            .chain(doc.views.iter().map(|v| v.id.0))
            .chain(doc.elements.iter().map(|e| e.id.0))
            .max()
            .unwrap_or(0);
        doc.next_id = doc.next_id.max(highest + 1).max(1000);
        Self {
            doc,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: DocumentSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(doc))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.doc)?)
    }

    /// Load a document saved with [`MemHost::save`].
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn snapshot(&self) -> &DocumentSnapshot {
        &self.doc
    }

    pub fn failures_mut(&mut self) -> &mut SimulatedFailures {
        &mut self.failures
    }

    pub fn committed_transactions(&self) -> &[String] {
        &self.committed
    }

    fn next_id(&mut self) -> i64 {
        let id = self.doc.next_id;
        self.doc.next_id += 1;
        id
    }

    // --- Document setup ---

    pub fn add_category(&mut self, name: &str) -> CategoryId {
        let id = CategoryId(self.next_id());
        self.doc.categories.push(CategoryRecord {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_view(&mut self, name: &str) -> ViewId {
        let id = ViewId(self.next_id());
        self.doc.views.push(ViewRecord {
            id,
            name: name.to_string(),
            template: None,
            filters: Vec::new(),
        });
        if self.doc.active_view.is_none() {
            self.doc.active_view = Some(id);
        }
        id
    }

    pub fn set_active_view(&mut self, view: ViewId) {
        self.doc.active_view = Some(view);
    }

    pub fn lock_view(&mut self, view: ViewId, template: &str) {
        if let Some(v) = self.doc.views.iter_mut().find(|v| v.id == view) {
            v.template = Some(template.to_string());
        }
    }

    pub fn set_solid_fill_pattern(&mut self, pattern: PatternId) {
        self.doc.solid_fill_pattern = Some(pattern);
    }

    pub fn add_element(
        &mut self,
        category: CategoryId,
        name: &str,
        parameters: Vec<(ParameterId, ParamValue)>,
    ) -> ElementId {
        let id = ElementId(self.next_id());
        self.doc.elements.push(ElementRecord {
            id,
            name: name.to_string(),
            category,
            parameters: parameters
                .into_iter()
                .map(|(parameter, value)| ParameterEntry { parameter, value })
                .collect(),
        });
        id
    }

    // --- Inspection ---

    pub fn filter(&self, id: FilterId) -> Option<&FilterObject> {
        self.doc.filters.iter().find(|f| f.id == id)
    }

    pub fn filter_by_name(&self, name: &str) -> Option<&FilterObject> {
        self.doc.filters.iter().find(|f| f.name == name)
    }

    pub fn view(&self, id: ViewId) -> Option<&ViewRecord> {
        self.doc.views.iter().find(|v| v.id == id)
    }

    /// Attached filters in list order.
    pub fn view_order(&self, id: ViewId) -> Vec<FilterId> {
        self.view(id)
            .map(|v| v.filters.iter().map(|b| b.filter).collect())
            .unwrap_or_default()
    }

    pub fn binding(&self, view: ViewId, filter: FilterId) -> Option<&ViewFilterRecord> {
        self.view(view)?.filters.iter().find(|b| b.filter == filter)
    }

    /// Elements a filter selects: in its categories and matching all rules.
    pub fn matching_elements(&self, id: FilterId) -> Vec<ElementId> {
        let Some(filter) = self.filter(id) else {
            return Vec::new();
        };
        self.doc
            .elements
            .iter()
            .filter(|e| filter.categories.contains(&e.category))
            .filter(|e| {
                all_match(&filter.rules, |param| {
                    e.parameters
                        .iter()
                        .find(|p| p.parameter == param)
                        .map(|p| &p.value)
                })
            })
            .map(|e| e.id)
            .collect()
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut ViewRecord> {
        self.doc
            .views
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(VizError::ViewNotFound(id))
    }

    fn binding_mut(&mut self, view: ViewId, filter: FilterId) -> Result<&mut ViewFilterRecord> {
        self.view_mut(view)?
            .filters
            .iter_mut()
            .find(|b| b.filter == filter)
            .ok_or_else(|| rejected(format!("filter {} is not applied to view {}", filter, view)))
    }

    fn filter_mut(&mut self, id: FilterId) -> Result<&mut FilterObject> {
        self.doc
            .filters
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(VizError::FilterNotFound(id))
    }

    fn ensure_view_unlocked(&self, view: ViewId) -> Result<()> {
        match self.view(view) {
            None => Err(VizError::ViewNotFound(view)),
            Some(v) => match &v.template {
                Some(t) => Err(rejected(format!(
                    "view '{}' is controlled by template '{}'",
                    v.name, t
                ))),
                None => Ok(()),
            },
        }
    }
}

impl HostDocument for MemHost {
    fn document_id(&self) -> DocumentId {
        self.doc.document_id
    }

    fn begin_transaction(&mut self, name: &str) -> Result<()> {
        if self.failures.begin {
            return Err(rejected("simulated begin failure"));
        }
        if let Some((open, _)) = &self.open {
            return Err(rejected(format!("transaction '{}' is already open", open)));
        }
        self.open = Some((name.to_string(), self.doc.clone()));
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        if self.failures.commit {
            return Err(rejected("simulated commit failure"));
        }
        let (name, _) = self
            .open
            .take()
            .ok_or_else(|| rejected("no open transaction"))?;
        self.committed.push(name);
        Ok(())
    }

    fn rollback_transaction(&mut self) {
        if let Some((_, saved)) = self.open.take() {
            self.doc = saved;
        }
    }

    fn filters(&self) -> Result<Vec<FilterObject>> {
        Ok(self.doc.filters.clone())
    }

    fn create_filter(
        &mut self,
        name: &str,
        categories: &BTreeSet<CategoryId>,
        rules: &[Rule],
    ) -> Result<FilterId> {
        if self.failures.create {
            return Err(rejected("simulated create failure"));
        }
        if name.trim().is_empty() {
            return Err(rejected("filter name cannot be empty"));
        }
        if categories.is_empty() {
            return Err(rejected("filter needs at least one category"));
        }
        if self.filter_by_name(name).is_some() {
            return Err(rejected(format!("a filter named '{}' already exists", name)));
        }
        let id = FilterId(self.next_id());
        self.doc.filters.push(FilterObject {
            id,
            name: name.to_string(),
            categories: categories.clone(),
            rules: rules.to_vec(),
        });
        Ok(id)
    }

    fn set_filter_name(&mut self, id: FilterId, name: &str) -> Result<()> {
        if self.doc.filters.iter().any(|f| f.name == name && f.id != id) {
            return Err(rejected(format!("a filter named '{}' already exists", name)));
        }
        self.filter_mut(id)?.name = name.to_string();
        Ok(())
    }

    fn set_filter_categories(
        &mut self,
        id: FilterId,
        categories: &BTreeSet<CategoryId>,
    ) -> Result<()> {
        if categories.is_empty() {
            return Err(rejected("filter needs at least one category"));
        }
        self.filter_mut(id)?.categories = categories.clone();
        Ok(())
    }

    fn set_filter_rules(&mut self, id: FilterId, rules: &[Rule]) -> Result<()> {
        self.filter_mut(id)?.rules = rules.to_vec();
        Ok(())
    }

    fn category_name(&self, id: CategoryId) -> Option<String> {
        self.doc
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }

    fn active_view(&self) -> Option<ViewId> {
        self.doc.active_view
    }

    fn view_name(&self, view: ViewId) -> Result<String> {
        self.view(view)
            .map(|v| v.name.clone())
            .ok_or(VizError::ViewNotFound(view))
    }

    fn view_template_lock(&self, view: ViewId) -> Result<Option<String>> {
        self.view(view)
            .map(|v| v.template.clone())
            .ok_or(VizError::ViewNotFound(view))
    }

    fn view_filters(&self, view: ViewId) -> Result<Vec<FilterId>> {
        self.view(view)
            .map(|v| v.filters.iter().map(|b| b.filter).collect())
            .ok_or(VizError::ViewNotFound(view))
    }

    fn attach_filter(&mut self, view: ViewId, filter: FilterId) -> Result<()> {
        self.ensure_view_unlocked(view)?;
        if self.failures.attach.contains(&filter) {
            return Err(rejected(format!("simulated attach failure for {}", filter)));
        }
        if self.filter(filter).is_none() {
            return Err(VizError::FilterNotFound(filter));
        }
        let v = self.view_mut(view)?;
        if v.filters.iter().any(|b| b.filter == filter) {
            return Err(rejected(format!(
                "filter {} is already applied to view {}",
                filter, view
            )));
        }
        v.filters.push(ViewFilterRecord {
            filter,
            visible: true,
            overrides: OverrideRecord::default(),
        });
        Ok(())
    }

    fn detach_filter(&mut self, view: ViewId, filter: FilterId) -> Result<()> {
        self.ensure_view_unlocked(view)?;
        if self.failures.detach.contains(&filter) {
            return Err(rejected(format!("simulated detach failure for {}", filter)));
        }
        let v = self.view_mut(view)?;
        let before = v.filters.len();
        v.filters.retain(|b| b.filter != filter);
        if v.filters.len() == before {
            return Err(rejected(format!(
                "filter {} is not applied to view {}",
                filter, view
            )));
        }
        Ok(())
    }

    fn filter_visibility(&self, view: ViewId, filter: FilterId) -> Result<bool> {
        self.binding(view, filter)
            .map(|b| b.visible)
            .ok_or_else(|| rejected(format!("filter {} is not applied to view {}", filter, view)))
    }

    fn set_filter_visibility(
        &mut self,
        view: ViewId,
        filter: FilterId,
        visible: bool,
    ) -> Result<()> {
        self.binding_mut(view, filter)?.visible = visible;
        Ok(())
    }

    fn filter_overrides(&self, view: ViewId, filter: FilterId) -> Result<OverrideRecord> {
        if self.failures.read_overrides.contains(&filter) {
            return Err(rejected(format!(
                "simulated override read failure for {}",
                filter
            )));
        }
        self.binding(view, filter)
            .map(|b| b.overrides.clone())
            .ok_or_else(|| rejected(format!("filter {} is not applied to view {}", filter, view)))
    }

    fn set_filter_overrides(
        &mut self,
        view: ViewId,
        filter: FilterId,
        overrides: &OverrideRecord,
    ) -> Result<()> {
        if self.failures.write_overrides.contains(&filter) {
            return Err(rejected(format!(
                "simulated override write failure for {}",
                filter
            )));
        }
        self.binding_mut(view, filter)?.overrides = overrides.clone();
        Ok(())
    }

    fn solid_fill_pattern(&self) -> Option<PatternId> {
        self.doc.solid_fill_pattern
    }

    fn elements_of(&self, categories: &BTreeSet<CategoryId>) -> Result<Vec<ElementId>> {
        Ok(self
            .doc
            .elements
            .iter()
            .filter(|e| categories.contains(&e.category))
            .map(|e| e.id)
            .collect())
    }

    fn parameter_value(&self, element: ElementId, parameter: ParameterId) -> Option<ParamValue> {
        self.doc
            .elements
            .iter()
            .find(|e| e.id == element)?
            .parameters
            .iter()
            .find(|p| p.parameter == parameter)
            .map(|p| p.value.clone())
    }

    fn element_name(&self, element: ElementId) -> Option<String> {
        self.doc
            .elements
            .iter()
            .find(|e| e.id == element)
            .map(|e| e.name.clone())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;

    /// A document with Walls/Doors categories, two views and a few walls.
    pub struct HostFixture {
        pub host: MemHost,
        pub walls: CategoryId,
        pub doors: CategoryId,
        pub plan: ViewId,
        pub section: ViewId,
    }

    /// Parameter id of the "Comments" text parameter on fixture elements.
    pub const COMMENTS: ParameterId = ParameterId(1);
    /// Parameter id of the "Width" real parameter on fixture elements.
    pub const WIDTH: ParameterId = ParameterId(2);

    impl Default for HostFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HostFixture {
        pub fn new() -> Self {
            let mut host = MemHost::new();
            let walls = host.add_category("Walls");
            let doors = host.add_category("Doors");
            let plan = host.add_view("Level 1 Plan");
            let section = host.add_view("Section A");
            host.set_solid_fill_pattern(PatternId(3));
            Self {
                host,
                walls,
                doors,
                plan,
                section,
            }
        }

        pub fn with_wall(mut self, name: &str, comments: &str, width: f64) -> Self {
            self.host.add_element(
                self.walls,
                name,
                vec![
                    (COMMENTS, ParamValue::Text(comments.to_string())),
                    (WIDTH, ParamValue::Real(width)),
                ],
            );
            self
        }

        /// Create a plain filter outside any run and attach it to `view`.
        pub fn with_user_filter(mut self, name: &str, view: ViewId) -> Self {
            let cats = BTreeSet::from([self.walls]);
            let id = self.host.create_filter(name, &cats, &[]).unwrap();
            self.host.attach_filter(view, id).unwrap();
            self
        }

        pub fn id_of(&self, name: &str) -> FilterId {
            self.host.filter_by_name(name).unwrap().id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::HostFixture;
    use super::*;

    #[test]
    fn attach_and_detach_round_trip() {
        let mut fx = HostFixture::new();
        let plan = fx.plan;
        fx = fx.with_user_filter("A", plan).with_user_filter("B", plan);
        let (a, b) = (fx.id_of("A"), fx.id_of("B"));
        assert_eq!(fx.host.view_order(plan), vec![a, b]);

        fx.host.detach_filter(plan, a).unwrap();
        assert_eq!(fx.host.view_order(plan), vec![b]);
        assert!(fx.host.detach_filter(plan, a).is_err());
    }

    #[test]
    fn locked_view_rejects_attach() {
        let mut fx = HostFixture::new();
        let (plan, section) = (fx.plan, fx.section);
        fx = fx.with_user_filter("A", section);
        let a = fx.id_of("A");
        fx.host.lock_view(plan, "Plan Template");
        assert!(fx.host.attach_filter(plan, a).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut fx = HostFixture::new();
        let cats = BTreeSet::from([fx.walls]);
        fx.host.create_filter("A", &cats, &[]).unwrap();
        assert!(fx.host.create_filter("A", &cats, &[]).is_err());
    }

    #[test]
    fn snapshot_json_round_trip() {
        let fx = HostFixture::new().with_wall("W1", "Fire", 0.2);
        let json = fx.host.to_json().unwrap();
        let restored = MemHost::from_json(&json).unwrap();
        assert_eq!(restored.snapshot(), fx.host.snapshot());
    }

    #[test]
    fn new_ids_do_not_collide_with_loaded_ones() {
        let fx = HostFixture::new().with_wall("W1", "Fire", 0.2);
        let mut restored = MemHost::from_json(&fx.host.to_json().unwrap()).unwrap();
        let cat = restored.add_category("Floors");
        assert!(fx.host.snapshot().categories.iter().all(|c| c.id != cat));
    }

    #[test]
    fn save_then_open_restores_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let fx = HostFixture::new().with_wall("W1", "Fire", 0.2);

        fx.host.save(&path).unwrap();
        let reopened = MemHost::open(&path).unwrap();
        assert_eq!(reopened.document_id(), fx.host.document_id());
        assert_eq!(reopened.snapshot(), fx.host.snapshot());
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MemHost::open(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(VizError::Io(_))));
    }
}
