//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer and the single
//! entry point for callers (the CLI, a host add-in, tests).
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Owns state**: the host document, the [`EngineConfig`], and the two
//!   process-lifetime stores ([`OrderSnapshots`], [`SessionMemory`])
//! - **Wraps transactions**: each top-level operation runs inside exactly one
//!   host edit transaction via [`with_transaction`]; a rolled-back operation
//!   leaves the order snapshots as they were
//! - **Resolves scope**: turns a [`ViewScope`] into concrete view ids
//! - **Dispatches** to `commands/*` and returns a [`RunReport`]
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: rule building, naming and reconciliation live in
//!   `commands/*.rs`
//! - **Presentation**: no terminal output; reports are data
//!
//! ## Operations
//!
//! | Method | Transaction | Does |
//! |--------|-------------|------|
//! | [`FilterApi::create_filters`] | `Create filters` | create/update one filter per value |
//! | [`FilterApi::apply_to_views`] | `Apply filters to views` | reconcile given filters into the selection's views |
//! | [`FilterApi::reconcile`] | `Reconcile view filters` | reconcile explicit views |
//! | [`FilterApi::run`] | `Create and apply filters` | all of the above in one go |
//! | [`FilterApi::scan_values`] | none | enumerate values for a picker |
//!
//! ## Generic Over HostDocument
//!
//! `FilterApi<H: HostDocument>` runs against any host; tests and the CLI use
//! [`MemHost`](crate::host::memory::MemHost).

use std::collections::BTreeSet;

use crate::commands::graphics::ColorPicker;
use crate::commands::reconcile::OrderSnapshots;
use crate::commands::values::{self, CancelToken, ValueScan};
use crate::commands::{self, CmdMessage, RunReport};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::host::{with_transaction, HostDocument};
use crate::model::{
    CategoryId, FilterId, GraphicsOptions, ParameterDescriptor, Selection, Value, ViewId,
    ViewScope,
};
use crate::state::{RememberedSelection, SessionMemory};

pub const TX_CREATE: &str = "Create filters";
pub const TX_APPLY: &str = "Apply filters to views";
pub const TX_RECONCILE: &str = "Reconcile view filters";
pub const TX_RUN: &str = "Create and apply filters";

/// The main API facade for vizfilter operations.
pub struct FilterApi<H: HostDocument> {
    host: H,
    config: EngineConfig,
    snapshots: OrderSnapshots,
    session: SessionMemory,
    colors: ColorPicker,
}

impl<H: HostDocument> FilterApi<H> {
    pub fn new(host: H, config: EngineConfig) -> Self {
        Self {
            host,
            config,
            snapshots: OrderSnapshots::new(),
            session: SessionMemory::new(),
            colors: ColorPicker::new(),
        }
    }

    pub fn with_colors(mut self, colors: ColorPicker) -> Self {
        self.colors = colors;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &OrderSnapshots {
        &self.snapshots
    }

    pub fn session(&self) -> &SessionMemory {
        &self.session
    }

    pub fn create_filters(&mut self, selection: &Selection) -> Result<RunReport> {
        selection.validate()?;
        self.remember(selection);
        self.transact(TX_CREATE, |host, config, _, _| {
            commands::create::run(host, selection, config)
        })
    }

    /// Reconcile `filters` into every view the selection targets.
    pub fn apply_to_views(
        &mut self,
        selection: &Selection,
        filters: &[FilterId],
    ) -> Result<RunReport> {
        let (views, note) = self.resolve_views(&selection.scope);
        let mut report = self.reconcile_in(TX_APPLY, &views, filters, &selection.graphics)?;
        if let Some(note) = note {
            report.messages.insert(0, note);
        }
        Ok(report)
    }

    pub fn reconcile(
        &mut self,
        views: &[ViewId],
        touched: &[FilterId],
        graphics: &GraphicsOptions,
    ) -> Result<RunReport> {
        self.reconcile_in(TX_RECONCILE, views, touched, graphics)
    }

    /// Create or update the selection's filters and reconcile them into its
    /// views, all in one transaction.
    pub fn run(&mut self, selection: &Selection) -> Result<RunReport> {
        selection.validate()?;
        self.remember(selection);
        let (views, note) = self.resolve_views(&selection.scope);

        let report = self.transact(TX_RUN, |host, config, snapshots, colors| {
            let mut report = commands::create::run(host, selection, config)?;
            if let Some(note) = note {
                report.add_message(note);
            }
            let touched = report.processed_ids();
            if touched.is_empty() {
                tracing::debug!("nothing created or updated, views left alone");
                return Ok(report);
            }
            report.merge(commands::reconcile::run(
                host,
                snapshots,
                colors,
                &views,
                &touched,
                &selection.graphics,
            ));
            Ok(report)
        })?;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            views = report.views.len(),
            "run finished"
        );
        Ok(report)
    }

    /// Enumerate values for `parameter` over `categories`, capped at the
    /// configured scan limit.
    pub fn scan_values(
        &self,
        categories: &BTreeSet<CategoryId>,
        parameter: &ParameterDescriptor,
        cancel: &CancelToken,
    ) -> Result<ValueScan> {
        values::scan(&self.host, categories, parameter, &self.config, cancel)
    }

    /// The last selection made against the open document, if any.
    pub fn recall(&mut self) -> Option<&RememberedSelection> {
        let document = self.host.document_id();
        self.session.bind(document);
        self.session.recall(document)
    }

    pub fn is_previously_selected(&self, value: &Value) -> bool {
        self.session.is_previously_selected(
            self.host.document_id(),
            value,
            self.config.real_epsilon,
        )
    }

    fn remember(&mut self, selection: &Selection) {
        let document = self.host.document_id();
        self.session.remember(document, selection);
    }

    /// Run `op` inside one host transaction. Order snapshots only keep what
    /// `op` recorded if the transaction commits.
    fn transact<T, F>(&mut self, name: &str, op: F) -> Result<T>
    where
        F: FnOnce(&mut H, &EngineConfig, &mut OrderSnapshots, &mut ColorPicker) -> Result<T>,
    {
        let saved = self.snapshots.clone();
        let config = &self.config;
        let snapshots = &mut self.snapshots;
        let colors = &mut self.colors;
        let result = with_transaction(&mut self.host, name, |host| {
            op(host, config, snapshots, colors)
        });
        if result.is_err() {
            tracing::debug!(transaction = name, "restoring order snapshots");
            self.snapshots = saved;
        }
        result
    }

    fn resolve_views(&self, scope: &ViewScope) -> (Vec<ViewId>, Option<CmdMessage>) {
        match scope {
            ViewScope::Views(views) => {
                let mut unique = Vec::with_capacity(views.len());
                for v in views {
                    if !unique.contains(v) {
                        unique.push(*v);
                    }
                }
                (unique, None)
            }
            ViewScope::ActiveView => match self.host.active_view() {
                Some(view) => (vec![view], None),
                None => (
                    Vec::new(),
                    Some(CmdMessage::warning("No active view; filters were not applied")),
                ),
            },
        }
    }

    fn reconcile_in(
        &mut self,
        transaction: &str,
        views: &[ViewId],
        touched: &[FilterId],
        graphics: &GraphicsOptions,
    ) -> Result<RunReport> {
        self.transact(transaction, |host, _, snapshots, colors| {
            Ok(commands::reconcile::run(
                host, snapshots, colors, views, touched, graphics,
            ))
        })
    }
}
