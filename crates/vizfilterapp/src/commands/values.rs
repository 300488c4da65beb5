//! Distinct parameter values over the elements of a category set.
//!
//! Feeds a value picker. The scan stops at the configured `scan_limit` and
//! reports that it did; a [`CancelToken`] can stop it early, in which case
//! whatever was collected so far is returned. Values are de-duplicated by
//! their key (reals within `real_epsilon`) and sorted for display.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::codec::dedupe_values;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::host::HostDocument;
use crate::model::{
    CategoryId, ElementId, ParamValue, ParameterDescriptor, StorageType, Value, ValuePayload,
};

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValueScan {
    pub values: Vec<Value>,
    /// Elements actually inspected.
    pub scanned: usize,
    pub limit_reached: bool,
    pub cancelled: bool,
}

/// Enumerate the distinct values `parameter` takes on elements of `categories`.
pub fn scan<H: HostDocument + ?Sized>(
    host: &H,
    categories: &BTreeSet<CategoryId>,
    parameter: &ParameterDescriptor,
    config: &EngineConfig,
    cancel: &CancelToken,
) -> Result<ValueScan> {
    let limit = config.scan_limit;
    let elements = host.elements_of(categories)?;
    let mut result = ValueScan {
        limit_reached: elements.len() > limit,
        ..Default::default()
    };

    let mut found = Vec::new();
    for element in elements.into_iter().take(limit) {
        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }
        result.scanned += 1;
        if let Some(value) = element_value(host, element, parameter) {
            found.push(value);
        }
    }

    let mut values = dedupe_values(&found, config.real_epsilon);
    values.sort_by(compare_values);
    result.values = values;

    tracing::debug!(
        parameter = %parameter.name,
        scanned = result.scanned,
        distinct = result.values.len(),
        limit_reached = result.limit_reached,
        "value scan finished"
    );
    Ok(result)
}

/// Run [`scan`] on a worker thread over a shared host.
pub fn spawn_scan<H>(
    host: Arc<H>,
    categories: BTreeSet<CategoryId>,
    parameter: ParameterDescriptor,
    config: EngineConfig,
    cancel: CancelToken,
) -> JoinHandle<Result<ValueScan>>
where
    H: HostDocument + Send + Sync + 'static,
{
    thread::spawn(move || scan(host.as_ref(), &categories, &parameter, &config, &cancel))
}

fn element_value<H: HostDocument + ?Sized>(
    host: &H,
    element: ElementId,
    parameter: &ParameterDescriptor,
) -> Option<Value> {
    if let Some([first, second]) = parameter.composite_fields {
        let a = host.parameter_value(element, first).map(|v| field_text(host, &v))?;
        let b = host.parameter_value(element, second).map(|v| field_text(host, &v))?;
        if a.is_empty() && b.is_empty() {
            return None;
        }
        return Some(Value::composite(a, b));
    }

    let raw = host.parameter_value(element, parameter.id)?;
    if raw.is_empty() {
        return None;
    }
    let value = match raw {
        ParamValue::Text(s) => Value::new(s.clone(), ValuePayload::Text(s), parameter.storage_type),
        ParamValue::Integer(v) if parameter.storage_type == StorageType::Reference => {
            reference_value(host, ElementId(v))
        }
        ParamValue::Integer(v) => {
            Value::new(v.to_string(), ValuePayload::Integer(v), parameter.storage_type)
        }
        ParamValue::Real(v) => Value::new(v.to_string(), ValuePayload::Real(v), parameter.storage_type),
        ParamValue::Reference(id) => reference_value(host, id),
        ParamValue::Unset => return None,
    };
    Some(value)
}

fn reference_value<H: HostDocument + ?Sized>(host: &H, id: ElementId) -> Value {
    let label = host
        .element_name(id)
        .unwrap_or_else(|| format!("#{}", id));
    Value::reference(id, label)
}

fn field_text<H: HostDocument + ?Sized>(host: &H, value: &ParamValue) -> String {
    match value {
        ParamValue::Text(s) => s.trim().to_string(),
        ParamValue::Integer(v) => v.to_string(),
        ParamValue::Real(v) => v.to_string(),
        ParamValue::Reference(id) if id.is_valid() => host
            .element_name(*id)
            .unwrap_or_else(|| format!("#{}", id)),
        ParamValue::Reference(_) | ParamValue::Unset => String::new(),
    }
}

fn numeric(payload: &ValuePayload) -> Option<f64> {
    match payload {
        ValuePayload::Integer(v) => Some(*v as f64),
        ValuePayload::Real(v) => Some(*v),
        _ => None,
    }
}

/// Numbers by value, everything else by case-insensitive label.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (numeric(&a.payload), numeric(&b.payload)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a
            .display_label()
            .to_lowercase()
            .cmp(&b.display_label().to_lowercase()),
    }
}
