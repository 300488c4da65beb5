//! # CLI Behavior
//!
//! This is **one possible client** for vizfilter, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes, and
//! output formatting.
//!
//! ## Commands
//!
//! - `vizfilter apply <DOCUMENT> <SELECTION>`: create/update filters and
//!   reconcile them into the selection's views. `--write` saves the document.
//! - `vizfilter values <DOCUMENT> --category <ID>... --parameter <ID>`: list
//!   the distinct values a parameter takes.
//! - `vizfilter order <DOCUMENT> <VIEW>`: show a view's filter list.
//!
//! Every command accepts `--json` for machine-readable output, `--config` for
//! an engine config file and `-v` for debug logging on stderr.
//!
//! ## Module Structure
//!
//! - `setup`: Argument parsing via clap
//! - `commands`: Logging, config loading and per-command handlers
//! - `render`: Output formatting
//! - `styles`: Terminal styles

mod commands;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
