//! # vizfilter Architecture
//!
//! vizfilter turns a declarative **selection** (categories, a parameter, a rule
//! kind and a list of values) into named filter objects inside a host document,
//! colors them per view, and keeps each view's filter list in a stable order
//! across repeated runs.
//!
//! The library never owns document data. Everything it reads or writes goes
//! through the [`HostDocument`](host::HostDocument) trait.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Owns host, config, order snapshots, session memory       │
//! │  - One host transaction per top-level operation             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - create / graphics / reconcile / values                   │
//! │  - Per-item failures become report messages                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Pure Building Blocks                                       │
//! │  - rules.rs (rule grammar), naming.rs, codec.rs             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Host Layer (host/)                                         │
//! │  - HostDocument trait, MemHost (in-memory, tests and CLI)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! Nothing in this crate writes to stdout/stderr. Diagnostics go through
//! `tracing`; user-facing outcomes are returned as a
//! [`RunReport`](commands::RunReport) of leveled messages.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade, entry point for all operations
//! - [`commands`]: Filter creation, graphics, reconciliation, value scans
//! - [`rules`]: Storage-type-aware rule building and evaluation
//! - [`naming`]: Filter name composition and sanitization
//! - [`codec`]: Value keys for session memory
//! - [`state`]: Session memory of the last selection
//! - [`host`]: Host trait and the in-memory host
//! - [`model`]: Core data types
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod model;
pub mod naming;
pub mod rules;
pub mod state;
