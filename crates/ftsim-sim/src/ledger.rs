//! ---
//! ftsim_section: "11-simulation"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Per-site batch aggregation and cumulative energy bookkeeping."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::time::Duration;

use ftsim_common::config::EnergyScope;
use ftsim_common::round::{round1, round2};
use parking_lot::Mutex;

use crate::readings::Reading;

/// Totals computed for one site batch, already rounded for the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchTotals {
    pub total_active_power: f64,
    pub total_energy_consumption: f64,
}

/// Per-site energy bookkeeping for the life of the process.
///
/// Accumulators are created lazily at a site's first aggregation and only
/// ever grow; they are never reset and never persisted. The add-and-read is
/// performed under one lock hold so concurrent batches for the same site
/// cannot interleave.
#[derive(Debug)]
pub struct EnergyLedger {
    scope: EnergyScope,
    cumulative_kwh: Mutex<HashMap<String, f64>>,
}

impl EnergyLedger {
    pub fn new(scope: EnergyScope) -> Self {
        Self {
            scope,
            cumulative_kwh: Mutex::new(HashMap::new()),
        }
    }

    /// Fold a batch of readings into the site's accumulator and return the
    /// wire totals.
    ///
    /// Interval energy is attributed from the rounded instantaneous power
    /// over `batch_duration`. The reported energy figure follows the
    /// configured scope; cumulative bookkeeping advances either way.
    pub fn aggregate(
        &self,
        site_id: &str,
        readings: &[Reading],
        batch_duration: Duration,
    ) -> BatchTotals {
        let total_active_power = round1(readings.iter().map(|r| r.active_power).sum());
        let interval_kwh = total_active_power * batch_duration.as_secs_f64() / 3600.0;

        let mut ledger = self.cumulative_kwh.lock();
        let cumulative = ledger.entry(site_id.to_owned()).or_insert(0.0);
        *cumulative += interval_kwh;
        let reported = match self.scope {
            EnergyScope::Cumulative => *cumulative,
            EnergyScope::PerBatch => interval_kwh,
        };

        BatchTotals {
            total_active_power,
            total_energy_consumption: round2(reported),
        }
    }

    /// Cumulative energy recorded for a site, if it has aggregated at least
    /// one batch.
    pub fn cumulative_energy_kwh(&self, site_id: &str) -> Option<f64> {
        self.cumulative_kwh.lock().get(site_id).copied()
    }
}
