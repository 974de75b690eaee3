//! ---
//! ftsim_section: "01-core-functionality"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Shared primitives and utilities for the simulator runtime."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
//! Fixed-precision rounding used across the telemetry data model. Electrical
//! readings carry one decimal place, power factor and energy carry two.

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
