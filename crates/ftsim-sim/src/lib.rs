//! ---
//! ftsim_section: "11-simulation"
//! ftsim_subsection: "01-bootstrap"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Simulation module exports and shared telemetry types."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
//! Synthetic telemetry generation and per-site aggregation for FTSIM.
//!
//! The sampler draws noisy readings around each machine's nominal operating
//! point and injects low power-factor anomalies; the ledger turns a site's
//! batch of readings into instantaneous power and energy totals.

pub mod ledger;
pub mod readings;
pub mod sampler;

pub use ledger::{BatchTotals, EnergyLedger};
pub use readings::{MachineStatus, Reading, TelemetryEvent};
pub use sampler::SampleGenerator;
