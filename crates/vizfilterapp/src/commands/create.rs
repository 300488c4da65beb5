use std::collections::{BTreeSet, HashSet};

use crate::commands::{CmdMessage, FilterOutcome, ProcessedFilter, RunReport};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::host::HostDocument;
use crate::model::{CategoryId, FilterId, Selection};
use crate::naming::{compose_name, unique_name};
use crate::rules::{build_rules, Rule};

/// What happened to one composed filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Created(FilterId),
    Updated(FilterId),
    Skipped(String),
}

/// Create the filter named `name`, or update it in place when it exists and
/// the selection allows overriding.
pub fn create_or_update<H: HostDocument + ?Sized>(
    host: &mut H,
    selection: &Selection,
    categories: &BTreeSet<CategoryId>,
    rules: &[Rule],
    name: &str,
) -> Result<StoreOutcome> {
    let existing = host.filters()?.into_iter().find(|f| f.name == name);

    match existing {
        None => {
            let id = host.create_filter(name, categories, rules)?;
            tracing::debug!(filter = %id, name, "created filter");
            Ok(StoreOutcome::Created(id))
        }
        Some(filter) if selection.override_existing => {
            host.set_filter_name(filter.id, name)?;
            host.set_filter_categories(filter.id, categories)?;
            host.set_filter_rules(filter.id, rules)?;
            tracing::debug!(filter = %filter.id, name, "updated filter");
            Ok(StoreOutcome::Updated(filter.id))
        }
        Some(_) => Ok(StoreOutcome::Skipped(format!(
            "Filter '{}' already exists",
            name
        ))),
    }
}

/// Display names of the selection's categories, as the host knows them.
pub fn category_names<H: HostDocument + ?Sized>(host: &H, selection: &Selection) -> Vec<String> {
    selection
        .categories
        .iter()
        .map(|id| host.category_name(*id).unwrap_or_else(|| format!("Category {}", id)))
        .collect()
}

/// Create or update one filter per value of the selection.
pub fn run<H: HostDocument + ?Sized>(
    host: &mut H,
    selection: &Selection,
    config: &EngineConfig,
) -> Result<RunReport> {
    selection.validate()?;

    let mut report = RunReport::default();
    let cat_names = category_names(host, selection);
    let mut taken: HashSet<String> = host.filters()?.into_iter().map(|f| f.name).collect();

    for value in selection.effective_values(config.real_epsilon) {
        let label = value.display_label();

        let rules = match build_rules(
            &selection.parameter,
            &value,
            selection.rule_kind,
            selection.naming.case_sensitive,
            config.real_epsilon,
        ) {
            Ok(rules) => rules,
            Err(e) => {
                tracing::debug!(value = %label, error = %e, "no rule for value");
                report.add_message(CmdMessage::warning(format!("Skipped '{}': {}", label, e)));
                continue;
            }
        };

        let composed = compose_name(selection, &cat_names, &value, config);
        let name = if selection.override_existing {
            composed
        } else {
            unique_name(&composed, &taken, config.max_name_length)
        };

        match create_or_update(host, selection, &selection.categories, &rules, &name) {
            Ok(StoreOutcome::Created(id)) => {
                taken.insert(name.clone());
                report.add_message(CmdMessage::success(format!("Created filter '{}'", name)));
                report.record(ProcessedFilter {
                    id,
                    name,
                    value_label: label,
                    outcome: FilterOutcome::Created,
                });
            }
            Ok(StoreOutcome::Updated(id)) => {
                report.add_message(CmdMessage::success(format!("Updated filter '{}'", name)));
                report.record(ProcessedFilter {
                    id,
                    name,
                    value_label: label,
                    outcome: FilterOutcome::Updated,
                });
            }
            Ok(StoreOutcome::Skipped(reason)) => {
                report.add_message(CmdMessage::warning(format!("Skipped '{}': {}", label, reason)));
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "host rejected filter");
                report.add_message(CmdMessage::error(format!(
                    "Could not create filter '{}': {}",
                    name, e
                )));
            }
        }
    }

    Ok(report)
}
