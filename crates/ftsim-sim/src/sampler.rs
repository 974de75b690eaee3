//! ---
//! ftsim_section: "11-simulation"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Synthetic sample generation with anomaly injection."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::f64::consts::PI;

use ftsim_common::config::{MachineConfig, SamplerConfig};
use ftsim_common::round::{round1, round2};
use rand::Rng;
use tracing::debug;

use crate::readings::{MachineStatus, Reading};

/// Relative spread of the gaussian noise around each nominal operating point.
const NOISE_FRACTION: f64 = 0.1;
/// Floor applied to current and active power so readings stay physical.
const READING_FLOOR: f64 = 0.1;

const VOLTAGE_RANGE: (f64, f64) = (410.0, 420.0);
const NORMAL_PF_RANGE: (f64, f64) = (0.92, 0.98);
const ANOMALY_PF_RANGE: (f64, f64) = (0.6, 0.84);

/// Produces one synthetic reading per machine from its nominal operating
/// point. The random source is supplied by the caller so batches are
/// reproducible under a fixed seed.
#[derive(Debug, Clone, Copy)]
pub struct SampleGenerator {
    anomaly_probability: f64,
}

impl SampleGenerator {
    pub fn new(policy: &SamplerConfig) -> Self {
        Self {
            anomaly_probability: policy.anomaly_probability,
        }
    }

    /// Generate a reading for `machine_type` around `profile`'s baseline.
    ///
    /// Active power and current are gaussian draws clamped at 0.1; with the
    /// configured probability the power factor drops into the anomalous band
    /// and the reading is flagged `Alert`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        machine_type: &str,
        profile: MachineConfig,
        rng: &mut R,
    ) -> Reading {
        let active_power = gaussian(rng, profile.base_power_kw, profile.base_power_kw * NOISE_FRACTION)
            .max(READING_FLOOR);
        let current = gaussian(rng, profile.base_current_a, profile.base_current_a * NOISE_FRACTION)
            .max(READING_FLOOR);

        let (power_factor, status) = if rng.gen::<f64>() < self.anomaly_probability {
            let pf = rng.gen_range(ANOMALY_PF_RANGE.0..ANOMALY_PF_RANGE.1);
            debug!(machine_type, power_factor = round2(pf), "anomaly injected");
            (pf, MachineStatus::Alert)
        } else {
            (
                rng.gen_range(NORMAL_PF_RANGE.0..NORMAL_PF_RANGE.1),
                MachineStatus::Normal,
            )
        };

        let voltage = rng.gen_range(VOLTAGE_RANGE.0..VOLTAGE_RANGE.1);

        Reading {
            machine_type: machine_type.to_owned(),
            voltage: round1(voltage),
            current: round1(current),
            active_power: round1(active_power),
            power_factor: round2(power_factor),
            status,
        }
    }
}

/// Box-Muller transform over two independent uniform(0, 1) draws. `u1` is
/// kept away from zero so the logarithm stays finite.
fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).sin();
    mean + std_dev * z
}
