//! # Rendering Module
//!
//! Turns library results into terminal text. Every function returns a
//! `String`; handlers decide where it goes. With `--json` the handlers print
//! the serialized result instead and nothing here is used.

use std::fmt::Write;

use vizfilterapp::commands::reconcile::ReconcilePath;
use vizfilterapp::commands::values::ValueScan;
use vizfilterapp::commands::{CmdMessage, MessageLevel, RunReport};
use vizfilterapp::model::OverrideRecord;

use super::styles;

/// One row of `vizfilter order`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderRow {
    pub id: i64,
    pub name: String,
    pub visible: bool,
    pub overrides: OverrideRecord,
}

fn level_marker(level: MessageLevel) -> &'static str {
    match level {
        MessageLevel::Info => "·",
        MessageLevel::Success => "✓",
        MessageLevel::Warning => "!",
        MessageLevel::Error => "✗",
    }
}

pub fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let style = styles::for_level(message.level);
        let _ = writeln!(
            out,
            "{} {}",
            style.apply_to(level_marker(message.level)),
            style.apply_to(&message.content)
        );
    }
    out
}

pub fn render_report(report: &RunReport) -> String {
    let mut out = render_messages(&report.messages);

    for view in &report.views {
        let path = match &view.path {
            ReconcilePath::NoOp => "unchanged".to_string(),
            ReconcilePath::Rebuilt => "reordered".to_string(),
            ReconcilePath::Skipped(_) => "skipped".to_string(),
        };
        let _ = writeln!(
            out,
            "{} {}",
            styles::heading().apply_to(&view.view_name),
            styles::muted().apply_to(format!("({})", path))
        );
        for (position, id) in view.order.iter().enumerate() {
            let label = report
                .processed
                .iter()
                .find(|p| p.id == *id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("#{}", id));
            let _ = writeln!(out, "  {:>2}. {}", position + 1, label);
        }
    }

    let skipped = report.skips().count();
    let _ = writeln!(
        out,
        "{}",
        styles::muted().apply_to(format!(
            "{} created, {} updated, {} skipped",
            report.created, report.updated, skipped
        ))
    );
    out
}

pub fn render_values(scan: &ValueScan) -> String {
    let mut out = String::new();
    for value in &scan.values {
        let _ = writeln!(out, "{}", styles::name().apply_to(value.display_label()));
    }
    let mut summary = format!(
        "{} distinct value(s) from {} element(s)",
        scan.values.len(),
        scan.scanned
    );
    if scan.limit_reached {
        summary.push_str(", scan limit reached");
    }
    if scan.cancelled {
        summary.push_str(", cancelled");
    }
    let _ = writeln!(out, "{}", styles::muted().apply_to(summary));
    out
}

fn describe_overrides(record: &OverrideRecord) -> String {
    let mut parts = Vec::new();
    if let Some(c) = record.projection_line_color {
        parts.push(format!("line {}", c));
    }
    if let Some(c) = record.cut_line_color {
        parts.push(format!("cut {}", c));
    }
    if let Some(c) = record.projection_pattern_color {
        parts.push(format!("fill {}", c));
    }
    if let Some(c) = record.cut_pattern_color {
        parts.push(format!("cut fill {}", c));
    }
    if record.halftone {
        parts.push("halftone".to_string());
    }
    parts.join(", ")
}

pub fn render_order(view_name: &str, rows: &[OrderRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", styles::heading().apply_to(view_name));
    if rows.is_empty() {
        let _ = writeln!(out, "{}", styles::muted().apply_to("  (no filters)"));
        return out;
    }
    for (position, row) in rows.iter().enumerate() {
        let name = if row.visible {
            styles::name().apply_to(row.name.clone())
        } else {
            styles::hidden().apply_to(format!("{} (hidden)", row.name))
        };
        let overrides = describe_overrides(&row.overrides);
        if overrides.is_empty() {
            let _ = writeln!(out, "  {:>2}. {}", position + 1, name);
        } else {
            let _ = writeln!(
                out,
                "  {:>2}. {} {}",
                position + 1,
                name,
                styles::muted().apply_to(format!("[{}]", overrides))
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizfilterapp::commands::{FilterOutcome, ProcessedFilter, ViewOutcome};
    use vizfilterapp::model::{Color, FilterId, ViewId};

    fn plain() {
        console::set_colors_enabled(false);
    }

    #[test]
    fn report_lists_views_and_summary() {
        plain();
        let mut report = RunReport::default();
        report.record(ProcessedFilter {
            id: FilterId(5),
            name: "Walls _ Fire".into(),
            value_label: "Fire".into(),
            outcome: FilterOutcome::Created,
        });
        report.add_message(CmdMessage::success("Created filter 'Walls _ Fire'"));
        report.add_message(CmdMessage::warning("Skipped 'x': nope"));
        report.views.push(ViewOutcome {
            view: ViewId(2),
            view_name: "Level 1".into(),
            path: ReconcilePath::Rebuilt,
            order: vec![FilterId(5), FilterId(9)],
        });

        let out = render_report(&report);
        assert!(out.contains("✓ Created filter 'Walls _ Fire'"));
        assert!(out.contains("Level 1 (reordered)"));
        assert!(out.contains(" 1. Walls _ Fire"));
        assert!(out.contains(" 2. #9"));
        assert!(out.contains("1 created, 0 updated, 1 skipped"));
    }

    #[test]
    fn values_summary_mentions_limit() {
        plain();
        let scan = ValueScan {
            values: vec![vizfilterapp::model::Value::text("A")],
            scanned: 10,
            limit_reached: true,
            cancelled: false,
        };
        let out = render_values(&scan);
        assert!(out.starts_with("A\n"));
        assert!(out.contains("1 distinct value(s) from 10 element(s), scan limit reached"));
    }

    #[test]
    fn order_marks_hidden_filters_and_overrides() {
        plain();
        let rows = vec![
            OrderRow {
                id: 1,
                name: "A".into(),
                visible: true,
                overrides: OverrideRecord {
                    projection_line_color: Some(Color::rgb(255, 0, 0)),
                    ..Default::default()
                },
            },
            OrderRow {
                id: 2,
                name: "B".into(),
                visible: false,
                overrides: OverrideRecord::default(),
            },
        ];
        let out = render_order("Plan", &rows);
        assert!(out.contains(" 1. A [line #FF0000]"));
        assert!(out.contains(" 2. B (hidden)"));
    }
}
