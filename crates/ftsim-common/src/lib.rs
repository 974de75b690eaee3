//! ---
//! ftsim_section: "01-core-functionality"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Shared primitives and utilities for the simulator runtime."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
//! Core shared primitives for the FTSIM workspace.
//! This crate exposes configuration loading, logging bootstrap, and the
//! rounding helpers used by the telemetry data model.

pub mod config;
pub mod logging;
pub mod round;

pub use config::{
    AppConfig, CredentialConfig, EnergyConfig, EnergyScope, LoggingConfig, MachineConfig,
    PublisherConfig, PublisherKind, SamplerConfig, SchedulerConfig, SiteConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use round::{round1, round2};
