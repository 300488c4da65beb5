//! # View Reconciliation
//!
//! Hosts expose a view's filters as a list with no positional insert. The
//! only way to put a filter on top is to detach everything and re-attach in
//! the wanted order, which would wipe visibility and overrides the user set
//! on filters this run never touched. Reconciliation does that rebuild safely
//! and only when the order actually changes.
//!
//! ## Steps (per view)
//!
//! 1. **Gather**: `live` = filters attached to the view; `touched` = filters
//!    created or updated this run, de-duplicated, in processing order.
//! 2. **Baseline**: the remembered order for the view, minus filters no longer
//!    live, plus live filters it does not know yet appended. Without a
//!    remembered order, `live` as-is.
//! 3. **Desired**: `touched` first, then the baseline minus `touched`.
//! 4. **No-op**: desired equals baseline → re-apply graphics and force
//!    visibility on `touched`, remember the order, done.
//! 5. **Capture**: visibility and overrides of every live filter, best effort.
//! 6. **Clear**: detach every live filter. A filter that fails to detach is
//!    left where it is, state and all.
//! 7. **Reapply**: attach the detached filters in desired order. Touched
//!    filters get graphics and are made visible; the others get their
//!    captured state back (visible with no override when nothing was
//!    captured).
//! 8. **Remember** the order the view actually ended up with, read back from
//!    the host.
//!
//! Views whose filters are controlled by a template are skipped with a
//! reason. Every host failure inside steps 5–7 becomes a message; nothing
//! escapes the rebuild half-way.
//!
//! ## Stacking
//!
//! The remembered order of one run is the baseline of the next, so the most
//! recent run's filters always end up on top:
//!
//! ```text
//! [A,B,C] + touch [D,E] → [D,E,A,B,C]
//!         + touch [F]   → [F,D,E,A,B,C]
//! ```

use serde::Serialize;
use std::collections::HashMap;

use super::graphics::{apply_or_skip, ColorPicker};
use crate::commands::{CmdMessage, RunReport};
use crate::host::HostDocument;
use crate::model::{DocumentId, FilterId, GraphicsOptions, OverrideRecord, ViewId};

/// Last desired order per (document, view). Lives for the process only.
#[derive(Debug, Default, Clone)]
pub struct OrderSnapshots {
    orders: HashMap<(DocumentId, ViewId), Vec<FilterId>>,
}

impl OrderSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, document: DocumentId, view: ViewId) -> Option<&[FilterId]> {
        self.orders.get(&(document, view)).map(|v| v.as_slice())
    }

    pub fn set(&mut self, document: DocumentId, view: ViewId, order: Vec<FilterId>) {
        self.orders.insert((document, view), order);
    }

    pub fn remove(&mut self, document: DocumentId, view: ViewId) {
        self.orders.remove(&(document, view));
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "path", content = "reason")]
pub enum ReconcilePath {
    /// Order already right; only touched filters were refreshed.
    NoOp,
    /// The list was cleared and re-attached.
    Rebuilt,
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewOutcome {
    pub view: ViewId,
    pub view_name: String,
    pub path: ReconcilePath,
    pub order: Vec<FilterId>,
}

fn dedupe(ids: &[FilterId]) -> Vec<FilterId> {
    let mut out: Vec<FilterId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// Remembered order restricted to `live`, with unknown live filters appended.
pub fn baseline(snapshot: Option<&[FilterId]>, live: &[FilterId]) -> Vec<FilterId> {
    match snapshot {
        None => dedupe(live),
        Some(remembered) => {
            let mut order: Vec<FilterId> = dedupe(remembered)
                .into_iter()
                .filter(|id| live.contains(id))
                .collect();
            for id in live {
                if !order.contains(id) {
                    order.push(*id);
                }
            }
            order
        }
    }
}

/// Touched filters first, then the rest of the baseline in its own order.
pub fn desired_order(touched: &[FilterId], baseline: &[FilterId]) -> Vec<FilterId> {
    let mut order = dedupe(touched);
    order.extend(baseline.iter().filter(|id| !touched.contains(id)));
    order
}

/// Reorders one view's filter list. Holds the order snapshots and the color
/// source across views of a run.
pub struct Reconciler<'a> {
    pub snapshots: &'a mut OrderSnapshots,
    pub colors: &'a mut ColorPicker,
}

impl<'a> Reconciler<'a> {
    pub fn new(snapshots: &'a mut OrderSnapshots, colors: &'a mut ColorPicker) -> Self {
        Self { snapshots, colors }
    }

    pub fn reconcile_view<H: HostDocument + ?Sized>(
        &mut self,
        host: &mut H,
        view: ViewId,
        touched: &[FilterId],
        graphics: &GraphicsOptions,
        messages: &mut Vec<CmdMessage>,
    ) -> ViewOutcome {
        let view_name = host
            .view_name(view)
            .unwrap_or_else(|_| format!("#{}", view));
        let skipped = |reason: String, messages: &mut Vec<CmdMessage>| {
            messages.push(CmdMessage::warning(reason.clone()));
            ViewOutcome {
                view,
                view_name: view_name.clone(),
                path: ReconcilePath::Skipped(reason),
                order: Vec::new(),
            }
        };

        match host.view_template_lock(view) {
            Ok(Some(template)) => {
                return skipped(
                    format!(
                        "Skipped view '{}': filters are controlled by template '{}'",
                        view_name, template
                    ),
                    messages,
                );
            }
            Ok(None) => {}
            Err(e) => return skipped(format!("Skipped view '{}': {}", view_name, e), messages),
        }

        let live = match host.view_filters(view) {
            Ok(live) => live,
            Err(e) => return skipped(format!("Skipped view '{}': {}", view_name, e), messages),
        };

        let document = host.document_id();
        let touched = dedupe(touched);
        let baseline = baseline(self.snapshots.get(document, view), &live);
        let desired = desired_order(&touched, &baseline);

        if desired == baseline {
            tracing::debug!(view = %view_name, "order unchanged, refreshing touched filters");
            for id in &touched {
                self.refresh_touched(host, view, *id, graphics, messages);
            }
            self.snapshots.set(document, view, desired.clone());
            return ViewOutcome {
                view,
                view_name,
                path: ReconcilePath::NoOp,
                order: desired,
            };
        }

        tracing::debug!(view = %view_name, live = live.len(), touched = touched.len(), "rebuilding filter list");

        // Capture
        let mut visibility: HashMap<FilterId, bool> = HashMap::new();
        let mut overrides: HashMap<FilterId, OverrideRecord> = HashMap::new();
        for id in &live {
            match host.filter_visibility(view, *id) {
                Ok(v) => {
                    visibility.insert(*id, v);
                }
                Err(e) => tracing::debug!(filter = %id, error = %e, "visibility not captured"),
            }
            match host.filter_overrides(view, *id) {
                Ok(o) => {
                    overrides.insert(*id, o);
                }
                Err(e) => tracing::debug!(filter = %id, error = %e, "overrides not captured"),
            }
        }

        // Clear
        let mut stuck: Vec<FilterId> = Vec::new();
        for id in &live {
            if let Err(e) = host.detach_filter(view, *id) {
                tracing::debug!(filter = %id, error = %e, "detach failed, filter keeps its place");
                stuck.push(*id);
            }
        }

        // Reapply
        for id in &desired {
            if stuck.contains(id) {
                if touched.contains(id) {
                    self.refresh_touched(host, view, *id, graphics, messages);
                }
                continue;
            }

            if let Err(e) = host.attach_filter(view, *id) {
                tracing::warn!(filter = %id, view = %view_name, error = %e, "attach failed");
                messages.push(CmdMessage::warning(format!(
                    "Could not re-apply filter {} to view '{}': {}",
                    id, view_name, e
                )));
                continue;
            }

            if touched.contains(id) {
                self.refresh_touched(host, view, *id, graphics, messages);
                continue;
            }

            let visible = visibility.get(id).copied().unwrap_or(true);
            if let Err(e) = host.set_filter_visibility(view, *id, visible) {
                messages.push(CmdMessage::warning(format!(
                    "Could not restore visibility of filter {} in view '{}': {}",
                    id, view_name, e
                )));
            }
            if let Some(record) = overrides.get(id) {
                if let Err(e) = host.set_filter_overrides(view, *id, record) {
                    messages.push(CmdMessage::warning(format!(
                        "Could not restore overrides of filter {} in view '{}': {}",
                        id, view_name, e
                    )));
                }
            }
        }

        // Remember
        let order = match host.view_filters(view) {
            Ok(actual) => {
                let order = dedupe(&actual);
                self.snapshots.set(document, view, order.clone());
                order
            }
            Err(e) => {
                tracing::warn!(view = %view_name, error = %e, "could not read back filter order");
                self.snapshots.remove(document, view);
                desired
            }
        };
        ViewOutcome {
            view,
            view_name,
            path: ReconcilePath::Rebuilt,
            order,
        }
    }

    fn refresh_touched<H: HostDocument + ?Sized>(
        &mut self,
        host: &mut H,
        view: ViewId,
        filter: FilterId,
        graphics: &GraphicsOptions,
        messages: &mut Vec<CmdMessage>,
    ) {
        if let Some(msg) = apply_or_skip(host, view, filter, graphics, self.colors) {
            messages.push(msg);
        }
        if let Err(e) = host.set_filter_visibility(view, filter, true) {
            messages.push(CmdMessage::warning(format!(
                "Could not show filter {} in view {}: {}",
                filter, view, e
            )));
        }
    }
}

/// Reconcile every view in `views`, collecting outcomes and messages.
pub fn run<H: HostDocument + ?Sized>(
    host: &mut H,
    snapshots: &mut OrderSnapshots,
    colors: &mut ColorPicker,
    views: &[ViewId],
    touched: &[FilterId],
    graphics: &GraphicsOptions,
) -> RunReport {
    let mut report = RunReport::default();
    colors.start_run();
    let mut reconciler = Reconciler::new(snapshots, colors);
    for view in views {
        let outcome =
            reconciler.reconcile_view(host, *view, touched, graphics, &mut report.messages);
        if !matches!(outcome.path, ReconcilePath::Skipped(_)) {
            report.add_message(CmdMessage::info(format!(
                "Applied {} filter(s) to view '{}'",
                touched.len(),
                outcome.view_name
            )));
        }
        report.views.push(outcome);
    }
    report
}
