//! ---
//! ftsim_section: "01-core-functionality"
//! ftsim_subsection: "01-bootstrap"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Core scheduling module exports."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
//! The FTSIM control loop: drives every registered site through sample,
//! aggregate, and publish once per cycle, with site-scoped failure handling.

pub mod scheduler;

pub use scheduler::{BatchScheduler, SchedulerHandle};
