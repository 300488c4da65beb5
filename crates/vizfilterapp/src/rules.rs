//! # Rule Building
//!
//! Turns one selected [`Value`] into the primitive rules a filter object is
//! made of. Each storage type has its own grammar:
//!
//! - **composite**: the rule kind is ignored; two equals rules are emitted,
//!   one per field parameter.
//! - **text**: equality, substring, prefix and suffix tests (and their
//!   negations), has-value, has-no-value.
//! - **reference**: equals, not-equals, has-value, has-no-value.
//! - **whole-number / real-number**: equals, not-equals, the four range
//!   comparisons, has-value, has-no-value. Reals carry an epsilon.
//!
//! Building never panics. A combination with no grammar, or a payload that
//! cannot be read as the parameter's storage type, comes back as a
//! [`RuleError`] the caller turns into a skip message.
//!
//! `has-no-value` is always a true presence test: it matches a parameter that
//! exists but holds nothing, never a parameter equal to an empty string or
//! zero.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::model::{
    ElementId, ParamValue, ParameterDescriptor, ParameterId, RuleKind, StorageType, Value,
    ValuePayload,
};

/// Right-hand side of a primitive rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operand {
    None,
    Text { value: String, case_sensitive: bool },
    Integer { value: i64 },
    Real { value: f64, epsilon: f64 },
    Reference { value: ElementId },
}

/// A single comparison against one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub parameter: ParameterId,
    pub kind: RuleKind,
    pub operand: Operand,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("rule '{kind}' is not supported for {storage} parameters")]
    Unsupported { kind: RuleKind, storage: StorageType },

    #[error("value '{label}' cannot be read as {storage}")]
    Unparseable { label: String, storage: StorageType },

    #[error("value '{label}' is not a valid element reference")]
    InvalidReference { label: String },

    #[error("composite parameter '{0}' has no field parameters")]
    MissingCompositeFields(String),
}

/// Build the rules matching `value` on `parameter`.
pub fn build_rules(
    parameter: &ParameterDescriptor,
    value: &Value,
    kind: RuleKind,
    case_sensitive: bool,
    epsilon: f64,
) -> Result<Vec<Rule>, RuleError> {
    let storage = parameter.storage_type;

    if storage == StorageType::Composite {
        return composite_rules(parameter, value, case_sensitive);
    }

    if kind.is_presence() {
        return Ok(vec![Rule {
            parameter: parameter.id,
            kind,
            operand: Operand::None,
        }]);
    }

    if !supports(storage, kind) {
        return Err(RuleError::Unsupported { kind, storage });
    }

    let operand = match storage {
        StorageType::Text => Operand::Text {
            value: text_operand(value)?,
            case_sensitive,
        },
        StorageType::WholeNumber => Operand::Integer {
            value: integer_operand(value)?,
        },
        StorageType::RealNumber => Operand::Real {
            value: real_operand(value)?,
            epsilon,
        },
        StorageType::Reference => Operand::Reference {
            value: reference_operand(value)?,
        },
        StorageType::Composite => return composite_rules(parameter, value, case_sensitive),
    };

    Ok(vec![Rule {
        parameter: parameter.id,
        kind,
        operand,
    }])
}

fn supports(storage: StorageType, kind: RuleKind) -> bool {
    use RuleKind::*;
    match storage {
        StorageType::Text => matches!(
            kind,
            Equals
                | NotEquals
                | Contains
                | NotContains
                | BeginsWith
                | NotBeginsWith
                | EndsWith
                | NotEndsWith
                | HasValue
                | HasNoValue
        ),
        StorageType::Reference => matches!(kind, Equals | NotEquals | HasValue | HasNoValue),
        StorageType::WholeNumber | StorageType::RealNumber => matches!(
            kind,
            Equals
                | NotEquals
                | Greater
                | GreaterOrEqual
                | Less
                | LessOrEqual
                | HasValue
                | HasNoValue
        ),
        StorageType::Composite => true,
    }
}

fn composite_rules(
    parameter: &ParameterDescriptor,
    value: &Value,
    case_sensitive: bool,
) -> Result<Vec<Rule>, RuleError> {
    let Some([first_param, second_param]) = parameter.composite_fields else {
        return Err(RuleError::MissingCompositeFields(parameter.name.clone()));
    };
    let ValuePayload::Composite(first, second) = &value.payload else {
        return Err(unparseable(value, StorageType::Composite));
    };

    let equals = |parameter: ParameterId, text: &str| Rule {
        parameter,
        kind: RuleKind::Equals,
        operand: Operand::Text {
            value: text.to_string(),
            case_sensitive,
        },
    };
    Ok(vec![equals(first_param, first), equals(second_param, second)])
}

fn unparseable(value: &Value, storage: StorageType) -> RuleError {
    RuleError::Unparseable {
        label: value.display_label(),
        storage,
    }
}

fn text_operand(value: &Value) -> Result<String, RuleError> {
    match &value.payload {
        ValuePayload::Text(s) => Ok(s.clone()),
        ValuePayload::Integer(v) => Ok(v.to_string()),
        ValuePayload::Real(v) => Ok(v.to_string()),
        _ => Err(unparseable(value, StorageType::Text)),
    }
}

fn integer_operand(value: &Value) -> Result<i64, RuleError> {
    let parsed = match &value.payload {
        ValuePayload::Integer(v) => Some(*v),
        ValuePayload::Real(v) if v.fract() == 0.0 && fits_i64(*v) => Some(*v as i64),
        ValuePayload::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| unparseable(value, StorageType::WholeNumber))
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn fits_i64(v: f64) -> bool {
    v >= i64::MIN as f64 && v < i64::MAX as f64
}

fn real_operand(value: &Value) -> Result<f64, RuleError> {
    let parsed = match &value.payload {
        ValuePayload::Real(v) => Some(*v),
        ValuePayload::Integer(v) => Some(*v as f64),
        ValuePayload::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| unparseable(value, StorageType::RealNumber))
}

fn reference_operand(value: &Value) -> Result<ElementId, RuleError> {
    let id = match &value.payload {
        ValuePayload::Reference(id) => Some(*id),
        ValuePayload::Integer(v) => Some(ElementId(*v)),
        ValuePayload::Text(s) => s.trim().parse::<i64>().ok().map(ElementId),
        _ => None,
    };
    match id {
        Some(id) if id.is_valid() => Ok(id),
        _ => Err(RuleError::InvalidReference {
            label: value.display_label(),
        }),
    }
}

impl Rule {
    /// Evaluate the rule against what an element holds for the parameter
    /// (`None` when the element lacks the parameter).
    pub fn matches(&self, actual: Option<&ParamValue>) -> bool {
        let Some(actual) = actual else {
            return false;
        };

        match self.kind {
            RuleKind::HasValue => return !actual.is_empty(),
            RuleKind::HasNoValue => return actual.is_empty(),
            _ => {}
        }

        match (&self.operand, actual) {
            (
                Operand::Text {
                    value,
                    case_sensitive,
                },
                ParamValue::Text(s),
            ) => compare_text(self.kind, s, value, *case_sensitive),
            (Operand::Integer { value }, ParamValue::Integer(a)) => {
                compare_ordering(self.kind, a.cmp(value))
            }
            (Operand::Real { value, epsilon }, ParamValue::Real(a)) => {
                compare_real(self.kind, *a, *value, *epsilon)
            }
            (Operand::Real { value, epsilon }, ParamValue::Integer(a)) => {
                compare_real(self.kind, *a as f64, *value, *epsilon)
            }
            (Operand::Reference { value }, ParamValue::Reference(a)) => match self.kind {
                RuleKind::Equals => a == value,
                RuleKind::NotEquals => a != value,
                _ => false,
            },
            _ => false,
        }
    }
}

/// True when every rule matches the element (AND composition).
pub fn all_match<'a, F>(rules: &[Rule], mut lookup: F) -> bool
where
    F: FnMut(ParameterId) -> Option<&'a ParamValue>,
{
    rules.iter().all(|rule| rule.matches(lookup(rule.parameter)))
}

fn compare_text(kind: RuleKind, actual: &str, expected: &str, case_sensitive: bool) -> bool {
    let (actual, expected) = if case_sensitive {
        (actual.to_string(), expected.to_string())
    } else {
        (actual.to_lowercase(), expected.to_lowercase())
    };
    match kind {
        RuleKind::Equals => actual == expected,
        RuleKind::NotEquals => actual != expected,
        RuleKind::Contains => actual.contains(&expected),
        RuleKind::NotContains => !actual.contains(&expected),
        RuleKind::BeginsWith => actual.starts_with(&expected),
        RuleKind::NotBeginsWith => !actual.starts_with(&expected),
        RuleKind::EndsWith => actual.ends_with(&expected),
        RuleKind::NotEndsWith => !actual.ends_with(&expected),
        _ => false,
    }
}

fn compare_ordering(kind: RuleKind, ord: Ordering) -> bool {
    match kind {
        RuleKind::Equals => ord == Ordering::Equal,
        RuleKind::NotEquals => ord != Ordering::Equal,
        RuleKind::Greater => ord == Ordering::Greater,
        RuleKind::GreaterOrEqual => ord != Ordering::Less,
        RuleKind::Less => ord == Ordering::Less,
        RuleKind::LessOrEqual => ord != Ordering::Greater,
        _ => false,
    }
}

fn compare_real(kind: RuleKind, actual: f64, expected: f64, epsilon: f64) -> bool {
    let diff = actual - expected;
    match kind {
        RuleKind::Equals => diff.abs() <= epsilon,
        RuleKind::NotEquals => diff.abs() > epsilon,
        RuleKind::Greater => diff > epsilon,
        RuleKind::GreaterOrEqual => diff >= -epsilon,
        RuleKind::Less => -diff > epsilon,
        RuleKind::LessOrEqual => diff <= epsilon,
        _ => false,
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param {} {}", self.parameter, self.kind)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Text { value, .. } => write!(f, " \"{}\"", value),
            Operand::Integer { value } => write!(f, " {}", value),
            Operand::Real { value, .. } => write!(f, " {}", value),
            Operand::Reference { value } => write!(f, " #{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn param(storage: StorageType) -> ParameterDescriptor {
        ParameterDescriptor::new(ParameterId(100), "Param", storage)
    }

    fn single(storage: StorageType, value: &Value, kind: RuleKind, cs: bool) -> Rule {
        let mut rules = build_rules(&param(storage), value, kind, cs, EPS).unwrap();
        assert_eq!(rules.len(), 1);
        rules.remove(0)
    }

    fn text(s: &str) -> ParamValue {
        ParamValue::Text(s.to_string())
    }

    #[test]
    fn text_equals_case_insensitive_matches_both_cases() {
        let rule = single(StorageType::Text, &Value::text("Wall-1"), RuleKind::Equals, false);
        assert!(rule.matches(Some(&text("Wall-1"))));
        assert!(rule.matches(Some(&text("wall-1"))));
        assert!(!rule.matches(Some(&text("wall-2"))));
    }

    #[test]
    fn text_equals_case_sensitive_rejects_other_case() {
        let rule = single(StorageType::Text, &Value::text("Wall-1"), RuleKind::Equals, true);
        assert!(rule.matches(Some(&text("Wall-1"))));
        assert!(!rule.matches(Some(&text("wall-1"))));
    }

    #[test]
    fn text_substring_rules() {
        let v = Value::text("Fire");
        let contains = single(StorageType::Text, &v, RuleKind::Contains, false);
        let begins = single(StorageType::Text, &v, RuleKind::BeginsWith, false);
        let not_ends = single(StorageType::Text, &v, RuleKind::NotEndsWith, false);
        assert!(contains.matches(Some(&text("2h fire rated"))));
        assert!(begins.matches(Some(&text("Fire Rated"))));
        assert!(!begins.matches(Some(&text("No Fire"))));
        assert!(not_ends.matches(Some(&text("Fire Rated"))));
        assert!(!not_ends.matches(Some(&text("Rated FIRE"))));
    }

    #[test]
    fn text_rejects_range_rules() {
        let err = build_rules(
            &param(StorageType::Text),
            &Value::text("a"),
            RuleKind::Greater,
            false,
            EPS,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::Unsupported { .. }));
    }

    #[test]
    fn real_not_equals_respects_epsilon() {
        let rule = single(StorageType::RealNumber, &Value::real(1.0), RuleKind::NotEquals, false);
        assert!(!rule.matches(Some(&ParamValue::Real(1.0000005))));
        assert!(!rule.matches(Some(&ParamValue::Real(1.0))));
        assert!(rule.matches(Some(&ParamValue::Real(1.00001))));
        assert!(rule.matches(Some(&ParamValue::Real(0.5))));
    }

    #[test]
    fn real_equals_within_epsilon() {
        let rule = single(StorageType::RealNumber, &Value::real(1.0), RuleKind::Equals, false);
        assert!(rule.matches(Some(&ParamValue::Real(1.0000005))));
        assert!(!rule.matches(Some(&ParamValue::Real(1.01))));
    }

    #[test]
    fn real_ranges() {
        let v = Value::real(2.5);
        let gt = single(StorageType::RealNumber, &v, RuleKind::Greater, false);
        let ge = single(StorageType::RealNumber, &v, RuleKind::GreaterOrEqual, false);
        let lt = single(StorageType::RealNumber, &v, RuleKind::Less, false);
        let le = single(StorageType::RealNumber, &v, RuleKind::LessOrEqual, false);
        assert!(gt.matches(Some(&ParamValue::Real(3.0))));
        assert!(!gt.matches(Some(&ParamValue::Real(2.5000001))));
        assert!(ge.matches(Some(&ParamValue::Real(2.4999999))));
        assert!(lt.matches(Some(&ParamValue::Real(1.0))));
        assert!(!lt.matches(Some(&ParamValue::Real(2.5))));
        assert!(le.matches(Some(&ParamValue::Integer(2))));
    }

    #[test]
    fn whole_number_parses_text_payloads() {
        let v = Value::new("12", ValuePayload::Text(" 12 ".into()), StorageType::WholeNumber);
        let rule = single(StorageType::WholeNumber, &v, RuleKind::LessOrEqual, false);
        assert_eq!(rule.operand, Operand::Integer { value: 12 });
        assert!(rule.matches(Some(&ParamValue::Integer(12))));
        assert!(!rule.matches(Some(&ParamValue::Integer(13))));
    }

    #[test]
    fn whole_number_rejects_garbage() {
        let v = Value::new("abc", ValuePayload::Text("abc".into()), StorageType::WholeNumber);
        let err = build_rules(&param(StorageType::WholeNumber), &v, RuleKind::Equals, false, EPS)
            .unwrap_err();
        assert_eq!(
            err,
            RuleError::Unparseable {
                label: "abc".into(),
                storage: StorageType::WholeNumber
            }
        );
    }

    #[test]
    fn whole_number_rejects_fractional_real() {
        let err = build_rules(
            &param(StorageType::WholeNumber),
            &Value::real(1.5),
            RuleKind::Equals,
            false,
            EPS,
        );
        assert!(err.is_err());
    }

    #[test]
    fn whole_number_rejects_reals_beyond_i64() {
        for v in [1e20, -1e20, i64::MAX as f64] {
            let err = build_rules(
                &param(StorageType::WholeNumber),
                &Value::real(v),
                RuleKind::Equals,
                false,
                EPS,
            )
            .unwrap_err();
            assert!(matches!(err, RuleError::Unparseable { .. }));
        }

        let rule = single(StorageType::WholeNumber, &Value::real(9e15), RuleKind::Equals, false);
        assert!(rule.matches(Some(&ParamValue::Integer(9_000_000_000_000_000))));
    }

    #[test]
    fn reference_rules() {
        let v = Value::reference(ElementId(77), "Level 1");
        let eq = single(StorageType::Reference, &v, RuleKind::Equals, false);
        assert!(eq.matches(Some(&ParamValue::Reference(ElementId(77)))));
        assert!(!eq.matches(Some(&ParamValue::Reference(ElementId(78)))));

        let err = build_rules(
            &param(StorageType::Reference),
            &v,
            RuleKind::Contains,
            false,
            EPS,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::Unsupported { .. }));
    }

    #[test]
    fn reference_invalid_id_is_rejected() {
        let v = Value::reference(ElementId(-1), "None");
        let err = build_rules(&param(StorageType::Reference), &v, RuleKind::Equals, false, EPS)
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidReference { .. }));
    }

    #[test]
    fn reference_has_no_value_ignores_invalid_placeholder() {
        let v = Value::placeholder(RuleKind::HasNoValue, StorageType::Reference);
        let rule = single(StorageType::Reference, &v, RuleKind::HasNoValue, false);
        assert_eq!(rule.operand, Operand::None);
        assert!(rule.matches(Some(&ParamValue::Reference(ElementId(-1)))));
        assert!(!rule.matches(Some(&ParamValue::Reference(ElementId(5)))));
    }

    #[test]
    fn has_no_value_is_a_presence_test_not_equals_empty() {
        let v = Value::placeholder(RuleKind::HasNoValue, StorageType::WholeNumber);
        let rule = single(StorageType::WholeNumber, &v, RuleKind::HasNoValue, false);
        assert!(rule.matches(Some(&ParamValue::Unset)));
        // A present zero is a value.
        assert!(!rule.matches(Some(&ParamValue::Integer(0))));
        // An absent parameter is not "present without value".
        assert!(!rule.matches(None));
    }

    #[test]
    fn has_value_matches_non_empty_text() {
        let v = Value::placeholder(RuleKind::HasValue, StorageType::Text);
        let rule = single(StorageType::Text, &v, RuleKind::HasValue, false);
        assert!(rule.matches(Some(&text("x"))));
        assert!(!rule.matches(Some(&text(""))));
        assert!(!rule.matches(None));
    }

    #[test]
    fn composite_emits_two_equals_rules_ignoring_kind() {
        let p = ParameterDescriptor::composite(
            ParameterId(1),
            "Family and Type",
            ParameterId(2),
            ParameterId(3),
        );
        let rules = build_rules(
            &p,
            &Value::composite("Duct", "24x12"),
            RuleKind::Contains,
            false,
            EPS,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.kind == RuleKind::Equals));
        assert_eq!(rules[0].parameter, ParameterId(2));
        assert_eq!(rules[1].parameter, ParameterId(3));

        let family = text("duct");
        let kind = text("24X12");
        assert!(all_match(&rules, |id| match id {
            ParameterId(2) => Some(&family),
            ParameterId(3) => Some(&kind),
            _ => None,
        }));
    }

    #[test]
    fn composite_without_fields_is_rejected() {
        let p = ParameterDescriptor::new(ParameterId(1), "Family and Type", StorageType::Composite);
        let err = build_rules(&p, &Value::composite("a", "b"), RuleKind::Equals, false, EPS)
            .unwrap_err();
        assert_eq!(err, RuleError::MissingCompositeFields("Family and Type".into()));
    }

    #[test]
    fn value_rules_never_match_absent_parameter() {
        let rule = single(StorageType::Text, &Value::text("x"), RuleKind::NotEquals, false);
        assert!(!rule.matches(None));
    }
}
