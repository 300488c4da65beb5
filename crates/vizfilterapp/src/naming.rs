//! Filter name composition.
//!
//! A name is assembled from ordered parts:
//!
//! ```text
//! [prefix] <sep> [category label] <sep> [parameter] <sep> value <sep> [suffix]
//! ```
//!
//! Blank parts are left out and the separator is rendered with a space on
//! each side (`"Walls - Fire Rated"`). The category label lists up to three
//! category names (sorted, comma-joined) and collapses to `"<first> +"` past
//! that.
//!
//! Names are sanitized for the host: every character in `<>{}[]|;:\/?*"`
//! becomes `_`, the result is trimmed and truncated to the configured maximum.
//! When a name is taken and the caller does not want to override, [`unique_name`]
//! appends ` (2)`, ` (3)`, … keeping the total within the limit.

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::model::{Selection, Value};

pub const ILLEGAL_NAME_CHARS: &[char] = &[
    '<', '>', '{', '}', '[', ']', '|', ';', ':', '\\', '/', '?', '*', '"',
];

const MAX_LISTED_CATEGORIES: usize = 3;

/// Label for a set of category names.
pub fn category_label(names: &[String]) -> String {
    let mut sorted: Vec<&String> = names.iter().filter(|n| !n.trim().is_empty()).collect();
    sorted.sort_by_key(|n| n.to_lowercase());
    match sorted.len() {
        0 => String::new(),
        n if n > MAX_LISTED_CATEGORIES => format!("{} +", sorted[0].trim()),
        _ => sorted
            .iter()
            .map(|n| n.trim())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Compose the name for one value of a selection.
///
/// `category_names` are the display names of the selection's categories, as
/// resolved by the host.
pub fn compose_name(
    selection: &Selection,
    category_names: &[String],
    value: &Value,
    config: &EngineConfig,
) -> String {
    let naming = &selection.naming;
    let mut parts: Vec<String> = Vec::new();

    if !naming.prefix.trim().is_empty() {
        parts.push(naming.prefix.trim().to_string());
    }
    if naming.include_category {
        let label = category_label(category_names);
        if !label.is_empty() {
            parts.push(label);
        }
    }
    if naming.include_parameter && !selection.parameter.name.trim().is_empty() {
        parts.push(selection.parameter.name.trim().to_string());
    }
    parts.push(value.display_label());

    let joiner = format!(" {} ", config.separator_for(&naming.separator).trim());
    let mut name = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(&joiner);

    let suffix = naming.suffix.trim();
    if !suffix.is_empty() {
        if name.is_empty() {
            name = suffix.to_string();
        } else {
            name.push_str(&joiner);
            name.push_str(suffix);
        }
    }

    sanitize_name(&name, config.max_name_length)
}

/// Replace illegal characters, trim, truncate.
pub fn sanitize_name(raw: &str, max_len: usize) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if ILLEGAL_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    truncate(replaced.trim(), max_len)
}

fn truncate(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect::<String>().trim_end().to_string()
}

/// First free variant of `base` among `existing`.
pub fn unique_name(base: &str, existing: &HashSet<String>, max_len: usize) -> String {
    if !existing.contains(base) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let tag = format!(" ({})", n);
        let room = max_len.saturating_sub(tag.chars().count());
        let candidate = format!("{}{}", truncate(base, room), tag);
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryId, ParameterDescriptor, ParameterId, RuleKind, StorageType};

    fn selection() -> Selection {
        Selection::new(
            [CategoryId(1)],
            ParameterDescriptor::new(ParameterId(9), "Fire Rating", StorageType::Text),
            RuleKind::Equals,
            vec![Value::text("Fire Rated")],
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn composes_category_and_value_with_separator() {
        let mut sel = selection();
        sel.naming.separator = "-".into();
        let name = compose_name(
            &sel,
            &names(&["Walls"]),
            &Value::text("Fire Rated"),
            &EngineConfig::default(),
        );
        assert_eq!(name, "Walls - Fire Rated");
    }

    #[test]
    fn includes_prefix_parameter_and_suffix() {
        let mut sel = selection();
        sel.naming.prefix = "QA".into();
        sel.naming.suffix = "v2".into();
        sel.naming.include_parameter = true;
        let name = compose_name(
            &sel,
            &names(&["Walls"]),
            &Value::text("2h"),
            &EngineConfig::default(),
        );
        assert_eq!(name, "QA _ Walls _ Fire Rating _ 2h _ v2");
    }

    #[test]
    fn compose_is_deterministic() {
        let sel = selection();
        let cats = names(&["Walls", "Doors"]);
        let v = Value::text("A");
        let config = EngineConfig::default();
        assert_eq!(
            compose_name(&sel, &cats, &v, &config),
            compose_name(&sel, &cats, &v, &config)
        );
    }

    #[test]
    fn category_label_lists_up_to_three() {
        assert_eq!(category_label(&names(&["Walls", "Doors"])), "Doors, Walls");
        assert_eq!(
            category_label(&names(&["Walls", "Doors", "Floors"])),
            "Doors, Floors, Walls"
        );
        assert_eq!(
            category_label(&names(&["Walls", "Doors", "Floors", "Roofs"])),
            "Doors +"
        );
    }

    #[test]
    fn sanitize_removes_every_illegal_char() {
        let raw = "a<b>c{d}e[f]g|h;i:j\\k/l?m*n\"o";
        let clean = sanitize_name(raw, 120);
        assert!(!clean.chars().any(|c| ILLEGAL_NAME_CHARS.contains(&c)));
        assert_eq!(clean, "a_b_c_d_e_f_g_h_i_j_k_l_m_n_o");
    }

    #[test]
    fn sanitize_truncates_to_max() {
        let raw = "x".repeat(300);
        assert_eq!(sanitize_name(&raw, 120).chars().count(), 120);
    }

    #[test]
    fn unique_name_appends_counter() {
        let mut existing = HashSet::new();
        existing.insert("Walls - Fire Rated".to_string());
        let second = unique_name("Walls - Fire Rated", &existing, 120);
        assert_eq!(second, "Walls - Fire Rated (2)");

        existing.insert(second);
        assert_eq!(
            unique_name("Walls - Fire Rated", &existing, 120),
            "Walls - Fire Rated (3)"
        );
    }

    #[test]
    fn unique_name_keeps_within_limit() {
        let base = "y".repeat(20);
        let mut existing = HashSet::new();
        existing.insert(base.clone());
        let name = unique_name(&base, &existing, 20);
        assert_eq!(name.chars().count(), 20);
        assert!(name.ends_with(" (2)"));
    }

    #[test]
    fn unused_name_is_returned_unchanged() {
        assert_eq!(unique_name("Doors", &HashSet::new(), 120), "Doors");
    }
}
