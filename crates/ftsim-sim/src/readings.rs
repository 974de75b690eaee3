//! ---
//! ftsim_section: "11-simulation"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Telemetry data model shared across the simulator."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::BatchTotals;

/// Health status attached to a single machine reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MachineStatus {
    Normal,
    Alert,
}

/// One synthetic sensor reading for a machine within a site batch.
///
/// Field names on the wire are fixed for ingestion compatibility. Current and
/// active power are floored at 0.1 so no reading is ever zero or negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub machine_type: String,
    pub voltage: f64,
    pub current: f64,
    pub active_power: f64,
    pub power_factor: f64,
    pub status: MachineStatus,
}

/// Aggregated per-site event published once per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub factory_id: String,
    pub location: String,
    pub readings: Vec<Reading>,
    pub total_active_power: f64,
    pub total_energy_consumption: f64,
}

impl TelemetryEvent {
    /// Build the outgoing event, capturing the UTC timestamp at the moment of
    /// construction.
    pub fn new(
        site_id: &str,
        location: &str,
        readings: Vec<Reading>,
        totals: BatchTotals,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            factory_id: site_id.to_owned(),
            location: location.to_owned(),
            readings,
            total_active_power: totals.total_active_power,
            total_energy_consumption: totals.total_energy_consumption,
        }
    }
}
