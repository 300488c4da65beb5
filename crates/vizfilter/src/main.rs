//! # vizfilter CLI
//!
//! A thin command-line client over the `vizfilterapp` library. The binary only
//! invokes `cli::run()` and handles process termination; everything else lives
//! in `src/cli/`.
//!
//! ## Workspace Structure
//!
//! - `crates/vizfilterapp/`: UI-agnostic engine (rules, naming, reconciliation,
//!   host trait, in-memory host, API facade)
//! - `crates/vizfilter/`: this CLI
//!
//! ## Documents
//!
//! The CLI has no live host application to talk to. It loads a document
//! snapshot (JSON) into the in-memory host, runs against it, and can write the
//! mutated snapshot back with `--write`. Selections are JSON files with the
//! same shape as `vizfilterapp::model::Selection`.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/cli/)                                       │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - logging, config, dispatch (commands.rs)                  │
//! │  - terminal rendering with console styles (render.rs)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (vizfilterapp::api)                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
