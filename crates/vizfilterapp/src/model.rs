//! # Domain Model
//!
//! This module defines the data the engine works on: the declarative
//! [`Selection`] a caller hands in, the typed [`Value`]s it carries, and the
//! host-side shapes the engine reads and writes ([`FilterObject`],
//! [`OverrideRecord`]).
//!
//! ## Identity
//!
//! Host objects are addressed by integer ids wrapped in newtypes
//! ([`CategoryId`], [`ParameterId`], [`FilterId`], [`ViewId`], [`ElementId`]).
//! The open document is addressed by a [`DocumentId`]; it keys session memory
//! and order snapshots so two documents never share cached state.
//!
//! ## Storage Types
//!
//! A parameter's [`StorageType`] decides which rule grammar applies:
//!
//! | Storage type | Payloads accepted | Rule kinds |
//! |--------------|-------------------|------------|
//! | `text` | text | equality, substring, prefix/suffix, has/has-no value |
//! | `whole-number` | integer, text that parses | equality, ranges, has/has-no value |
//! | `real-number` | real, integer, text that parses | equality (epsilon), ranges, has/has-no value |
//! | `reference` | element id | equality, has/has-no value |
//! | `composite` | two-part text tuple | always two equals rules |
//!
//! ## Placeholder Values
//!
//! `has-value` and `has-no-value` do not compare against anything, so a
//! selection using them carries exactly one [`ValuePayload::Empty`] value
//! regardless of what the caller supplied (see [`Selection::effective_values`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::codec::dedupe_values;
use crate::error::{Result, VizError};
use crate::rules::Rule;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// A host object category (walls, ducts, ...).
    CategoryId
);
id_type!(ParameterId);
id_type!(FilterId);
id_type!(ViewId);
id_type!(ElementId);
id_type!(
    /// A host fill pattern.
    PatternId
);

/// The host's "no element" reference value.
pub const INVALID_ELEMENT_ID: ElementId = ElementId(-1);

impl ElementId {
    pub fn is_valid(&self) -> bool {
        *self != INVALID_ELEMENT_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageType {
    Text,
    WholeNumber,
    RealNumber,
    Reference,
    Composite,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageType::Text => "text",
            StorageType::WholeNumber => "whole-number",
            StorageType::RealNumber => "real-number",
            StorageType::Reference => "reference",
            StorageType::Composite => "composite",
        };
        f.write_str(s)
    }
}

/// The comparison a user asks for. Also used as the operator of a built
/// primitive [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    BeginsWith,
    NotBeginsWith,
    EndsWith,
    NotEndsWith,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    HasValue,
    HasNoValue,
}

impl RuleKind {
    /// `has-value` / `has-no-value` test presence only.
    pub fn is_presence(&self) -> bool {
        matches!(self, RuleKind::HasValue | RuleKind::HasNoValue)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleKind::Equals => "equals",
            RuleKind::NotEquals => "not-equals",
            RuleKind::Contains => "contains",
            RuleKind::NotContains => "not-contains",
            RuleKind::BeginsWith => "begins-with",
            RuleKind::NotBeginsWith => "not-begins-with",
            RuleKind::EndsWith => "ends-with",
            RuleKind::NotEndsWith => "not-ends-with",
            RuleKind::Greater => "greater",
            RuleKind::GreaterOrEqual => "greater-or-equal",
            RuleKind::Less => "less",
            RuleKind::LessOrEqual => "less-or-equal",
            RuleKind::HasValue => "has-value",
            RuleKind::HasNoValue => "has-no-value",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub id: ParameterId,
    pub name: String,
    pub storage_type: StorageType,
    /// Field parameters matched by a composite descriptor, in tuple order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_fields: Option<[ParameterId; 2]>,
}

impl ParameterDescriptor {
    pub fn new(id: ParameterId, name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            id,
            name: name.into(),
            storage_type,
            composite_fields: None,
        }
    }

    pub fn composite(
        id: ParameterId,
        name: impl Into<String>,
        first: ParameterId,
        second: ParameterId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            storage_type: StorageType::Composite,
            composite_fields: Some([first, second]),
        }
    }
}

/// What an element actually holds for a parameter.
///
/// An absent parameter is modelled as `None` by callers; `Unset` means the
/// parameter exists on the element but carries no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Reference(ElementId),
    Unset,
}

impl ParamValue {
    /// True when the parameter is present but has nothing in it.
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Text(s) => s.is_empty(),
            ParamValue::Reference(id) => !id.is_valid(),
            ParamValue::Unset => true,
            ParamValue::Integer(_) | ParamValue::Real(_) => false,
        }
    }
}

/// Raw payload of a selected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ValuePayload {
    Text(String),
    Integer(i64),
    Real(f64),
    Reference(ElementId),
    Composite(String, String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    #[serde(default)]
    pub label: String,
    pub payload: ValuePayload,
    pub storage_type: StorageType,
}

impl Value {
    pub fn new(label: impl Into<String>, payload: ValuePayload, storage_type: StorageType) -> Self {
        Self {
            label: label.into(),
            payload,
            storage_type,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        Self::new(s.clone(), ValuePayload::Text(s), StorageType::Text)
    }

    pub fn integer(v: i64) -> Self {
        Self::new(v.to_string(), ValuePayload::Integer(v), StorageType::WholeNumber)
    }

    pub fn real(v: f64) -> Self {
        Self::new(v.to_string(), ValuePayload::Real(v), StorageType::RealNumber)
    }

    pub fn reference(id: ElementId, label: impl Into<String>) -> Self {
        Self::new(label, ValuePayload::Reference(id), StorageType::Reference)
    }

    pub fn composite(first: impl Into<String>, second: impl Into<String>) -> Self {
        let (first, second) = (first.into(), second.into());
        Self::new(
            format!("{} / {}", first, second),
            ValuePayload::Composite(first, second),
            StorageType::Composite,
        )
    }

    /// The single value substituted for presence rules.
    pub fn placeholder(kind: RuleKind, storage_type: StorageType) -> Self {
        let label = match kind {
            RuleKind::HasNoValue => "Has No Value",
            _ => "Has Value",
        };
        Self::new(label, ValuePayload::Empty, storage_type)
    }

    /// The label used in names: the explicit label, or one derived from the payload.
    pub fn display_label(&self) -> String {
        let label = self.label.trim();
        if !label.is_empty() {
            return label.to_string();
        }
        match &self.payload {
            ValuePayload::Text(s) => s.trim().to_string(),
            ValuePayload::Integer(v) => v.to_string(),
            ValuePayload::Real(v) => v.to_string(),
            ValuePayload::Reference(id) => format!("#{}", id),
            ValuePayload::Composite(a, b) => format!("{} / {}", a, b),
            ValuePayload::Empty => "(none)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingOptions {
    pub prefix: String,
    pub suffix: String,
    pub separator: String,
    pub include_category: bool,
    pub include_parameter: bool,
    pub case_sensitive: bool,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            separator: "_".to_string(),
            include_category: true,
            include_parameter: false,
            case_sensitive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsChannels {
    pub projection_line: bool,
    pub cut_line: bool,
    pub projection_pattern: bool,
    pub cut_pattern: bool,
    pub halftone: bool,
}

impl GraphicsChannels {
    pub fn any(&self) -> bool {
        self.projection_line
            || self.cut_line
            || self.projection_pattern
            || self.cut_pattern
            || self.halftone
    }

    /// The channel set used when nothing was picked.
    pub fn legacy() -> Self {
        Self {
            projection_line: true,
            cut_line: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    Random,
    #[default]
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsOptions {
    pub apply_graphics: bool,
    pub channels: GraphicsChannels,
    pub pattern_id: Option<PatternId>,
    pub color_mode: ColorMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "scope", content = "views")]
pub enum ViewScope {
    #[default]
    ActiveView,
    Views(Vec<ViewId>),
}

/// The declarative input of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub categories: BTreeSet<CategoryId>,
    pub parameter: ParameterDescriptor,
    #[serde(default)]
    pub rule_kind: RuleKind,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub naming: NamingOptions,
    #[serde(default)]
    pub graphics: GraphicsOptions,
    #[serde(default)]
    pub scope: ViewScope,
    #[serde(default)]
    pub override_existing: bool,
}

impl Selection {
    pub fn new(
        categories: impl IntoIterator<Item = CategoryId>,
        parameter: ParameterDescriptor,
        rule_kind: RuleKind,
        values: Vec<Value>,
    ) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            parameter,
            rule_kind,
            values,
            naming: NamingOptions::default(),
            graphics: GraphicsOptions::default(),
            scope: ViewScope::default(),
            override_existing: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(VizError::InvalidSelection(
                "at least one category is required".to_string(),
            ));
        }
        if self.values.is_empty() && !self.rule_kind.is_presence() {
            return Err(VizError::InvalidSelection(format!(
                "rule '{}' needs at least one value",
                self.rule_kind
            )));
        }
        Ok(())
    }

    /// Values to build filters for: de-duplicated (reals within `epsilon`),
    /// or the single placeholder for presence rules.
    pub fn effective_values(&self, epsilon: f64) -> Vec<Value> {
        if self.rule_kind.is_presence() {
            return vec![Value::placeholder(
                self.rule_kind,
                self.parameter.storage_type,
            )];
        }
        dedupe_values(&self.values, epsilon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Per-view graphic overrides of one filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideRecord {
    pub projection_line_color: Option<Color>,
    pub cut_line_color: Option<Color>,
    pub projection_pattern: Option<PatternId>,
    pub projection_pattern_color: Option<Color>,
    pub cut_pattern: Option<PatternId>,
    pub cut_pattern_color: Option<Color>,
    pub halftone: bool,
}

impl OverrideRecord {
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// A named rule set owned by the host document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterObject {
    pub id: FilterId,
    pub name: String,
    pub categories: BTreeSet<CategoryId>,
    /// AND-composed.
    pub rules: Vec<Rule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walls_selection(kind: RuleKind, values: Vec<Value>) -> Selection {
        Selection::new(
            [CategoryId(1)],
            ParameterDescriptor::new(ParameterId(10), "Mark", StorageType::Text),
            kind,
            values,
        )
    }

    #[test]
    fn presence_rules_substitute_single_placeholder() {
        let sel = walls_selection(
            RuleKind::HasNoValue,
            vec![Value::text("a"), Value::text("b")],
        );
        let values = sel.effective_values(1e-6);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].payload, ValuePayload::Empty);
        assert_eq!(values[0].display_label(), "Has No Value");
    }

    #[test]
    fn validate_rejects_empty_categories() {
        let mut sel = walls_selection(RuleKind::Equals, vec![Value::text("a")]);
        sel.categories.clear();
        assert!(matches!(
            sel.validate(),
            Err(VizError::InvalidSelection(_))
        ));
    }

    #[test]
    fn validate_requires_values_for_comparisons() {
        assert!(walls_selection(RuleKind::Equals, vec![]).validate().is_err());
        assert!(walls_selection(RuleKind::HasValue, vec![]).validate().is_ok());
    }

    #[test]
    fn effective_values_drop_duplicates() {
        let sel = walls_selection(
            RuleKind::Equals,
            vec![Value::text("Wall-1"), Value::text("wall-1"), Value::text("W2")],
        );
        let labels: Vec<String> = sel
            .effective_values(1e-6)
            .iter()
            .map(|v| v.display_label())
            .collect();
        assert_eq!(labels, vec!["Wall-1", "W2"]);
    }

    #[test]
    fn display_label_falls_back_to_payload() {
        let v = Value::new("  ", ValuePayload::Reference(ElementId(42)), StorageType::Reference);
        assert_eq!(v.display_label(), "#42");
    }

    #[test]
    fn selection_deserializes_with_defaults() {
        let json = r#"{
            "categories": [3],
            "parameter": {"id": 7, "name": "Comments", "storage_type": "text"},
            "values": [{"payload": {"type": "text", "value": "Fire"}, "storage_type": "text"}]
        }"#;
        let sel: Selection = serde_json::from_str(json).unwrap();
        assert_eq!(sel.rule_kind, RuleKind::Equals);
        assert_eq!(sel.naming.separator, "_");
        assert_eq!(sel.scope, ViewScope::ActiveView);
        assert!(!sel.override_existing);
    }
}
