//! # CLI Layer
//!
//! The only place that:
//! - Installs the `tracing` subscriber
//! - Reads and writes files
//! - Prints to stdout
//!
//! Handlers load the document into a [`MemHost`], call the API facade and hand
//! the result to `render` (or print it as JSON).

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use vizfilterapp::api::FilterApi;
use vizfilterapp::commands::values::CancelToken;
use vizfilterapp::config::EngineConfig;
use vizfilterapp::host::memory::MemHost;
use vizfilterapp::host::HostDocument;
use vizfilterapp::model::{
    CategoryId, ParameterDescriptor, ParameterId, Selection, StorageType, ViewId,
};

use super::render::{self, OrderRow};
use super::setup::{Cli, Commands, StorageArg};

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Apply {
            document,
            selection,
            write,
        } => handle_apply(&cli, config, document, selection, *write),
        Commands::Values {
            document,
            categories,
            parameter,
            storage,
            fields,
            name,
            limit,
        } => {
            let descriptor = descriptor(*parameter, *storage, fields, name.as_deref())?;
            handle_values(&cli, config, document, categories, &descriptor, *limit)
        }
        Commands::Order { document, view } => handle_order(&cli, document, ViewId(*view)),
    }
}

/// `RUST_LOG` wins; otherwise `-v` turns on debug for our crates.
fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "vizfilter=debug,vizfilterapp=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_document(path: &Path) -> Result<MemHost> {
    MemHost::open(path).with_context(|| format!("reading document {}", path.display()))
}

fn load_selection(path: &Path) -> Result<Selection> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading selection {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing selection {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn descriptor(
    parameter: i64,
    storage: StorageArg,
    fields: &[i64],
    name: Option<&str>,
) -> Result<ParameterDescriptor> {
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("Parameter {}", parameter));
    let storage: StorageType = storage.into();
    if storage != StorageType::Composite {
        return Ok(ParameterDescriptor::new(ParameterId(parameter), name, storage));
    }
    match fields {
        [first, second] => Ok(ParameterDescriptor::composite(
            ParameterId(parameter),
            name,
            ParameterId(*first),
            ParameterId(*second),
        )),
        _ => bail!("a composite parameter needs exactly two --field ids"),
    }
}

fn handle_apply(
    cli: &Cli,
    config: EngineConfig,
    document: &Path,
    selection: &Path,
    write: bool,
) -> Result<()> {
    let host = load_document(document)?;
    let selection = load_selection(selection)?;

    let mut api = FilterApi::new(host, config);
    let report = api.run(&selection)?;

    if write {
        api.host()
            .save(document)
            .with_context(|| format!("writing document {}", document.display()))?;
        tracing::debug!(path = %document.display(), "document saved");
    }

    if cli.json {
        print_json(&report)
    } else {
        print!("{}", render::render_report(&report));
        Ok(())
    }
}

fn handle_values(
    cli: &Cli,
    mut config: EngineConfig,
    document: &Path,
    categories: &[i64],
    parameter: &ParameterDescriptor,
    limit: Option<usize>,
) -> Result<()> {
    if let Some(limit) = limit {
        config.scan_limit = limit;
    }
    let host = load_document(document)?;
    let categories: BTreeSet<CategoryId> = categories.iter().map(|id| CategoryId(*id)).collect();

    let api = FilterApi::new(host, config);
    let scan = api.scan_values(&categories, parameter, &CancelToken::new())?;

    if cli.json {
        print_json(&scan)
    } else {
        print!("{}", render::render_values(&scan));
        Ok(())
    }
}

fn handle_order(cli: &Cli, document: &Path, view: ViewId) -> Result<()> {
    let host = load_document(document)?;
    let view_name = host.view_name(view)?;

    let mut rows = Vec::new();
    for filter in host.view_filters(view)? {
        let name = host
            .filter(filter)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| format!("#{}", filter));
        rows.push(OrderRow {
            id: filter.0,
            name,
            visible: host.filter_visibility(view, filter)?,
            overrides: host.filter_overrides(view, filter)?,
        });
    }

    if cli.json {
        print_json(&rows)
    } else {
        print!("{}", render::render_order(&view_name, &rows));
        Ok(())
    }
}
