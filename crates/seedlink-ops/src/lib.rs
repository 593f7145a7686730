//! Link materialization and run orchestration for seedlink.
//!
//! This crate turns a resolved [`seedlink_match::LinkPlan`] into symbolic
//! links on disk and sequences a full run:
//!
//! - **Materialize**: ensure parent directories, preflight, create links
//! - **Relocate**: move seeded files into a new tree and link them back
//! - **Orchestrate**: walk once, then match, claim and link per manifest
//!
//! Per-entry problems never abort a run; they are recorded in the
//! [`seedlink_core::RunSummary`].

mod executor;
mod materialize;
mod pipeline;
mod progress;
mod relocate;

pub use materialize::{
    EnsuredDirs, LinkRecord, MaterializeEvent, MaterializeOptions, link_one, materialize,
    start_materialize,
};
pub use pipeline::Orchestrator;
pub use progress::LinkProgress;
pub use relocate::{RelocateItem, relocate, relocate_one};

/// Channel buffer size for materialization progress events.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
