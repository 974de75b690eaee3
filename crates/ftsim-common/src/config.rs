//! ---
//! ftsim_section: "01-core-functionality"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Shared primitives and utilities for the simulator runtime."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_cycle_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_inter_site_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_batch_duration() -> Duration {
    Duration::from_secs(60)
}

fn default_publish_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_anomaly_probability() -> f64 {
    0.5
}

fn default_random_seed() -> u64 {
    0xFAC70u64
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_sink_dir() -> PathBuf {
    PathBuf::from("target/telemetry")
}

fn default_credential_root() -> PathBuf {
    PathBuf::from("configs/credentials")
}

/// Primary configuration object for the FTSIM runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registered sites, iterated in declaration order every cycle.
    #[serde(default)]
    pub sites: IndexMap<String, SiteConfig>,
    /// Machine catalog, sampled in declaration order for every site batch.
    #[serde(default)]
    pub machines: IndexMap<String, MachineConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "FTSIM_CONFIG";

    /// Load configuration from disk, respecting the `FTSIM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Retrieve a site configuration by identifier.
    pub fn site(&self, site_id: &str) -> Option<&SiteConfig> {
        self.sites.get(site_id)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(anyhow!("configuration must contain at least one site"));
        }
        if self.machines.is_empty() {
            return Err(anyhow!("configuration must contain at least one machine"));
        }
        for (machine_type, machine) in &self.machines {
            machine.validate(machine_type)?;
        }
        self.sampler.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sites: IndexMap::new(),
            machines: IndexMap::new(),
            scheduler: SchedulerConfig::default(),
            sampler: SamplerConfig::default(),
            energy: EnergyConfig::default(),
            logging: LoggingConfig::default(),
            publisher: PublisherConfig::default(),
            credentials: CredentialConfig::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// One registered factory site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Human-readable location name carried verbatim into the wire payload.
    pub location: String,
    /// Opaque reference to the site's credential material (e.g. a PFX path
    /// relative to the credential root). Interpreted only by the store.
    pub credential_ref: String,
}

/// Nominal operating point for one machine type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MachineConfig {
    pub base_power_kw: f64,
    pub base_current_a: f64,
}

impl MachineConfig {
    pub fn validate(&self, machine_type: &str) -> Result<()> {
        if self.base_power_kw <= 0.0 || self.base_current_a <= 0.0 {
            return Err(anyhow!(
                "machine '{}' must declare positive base power and current",
                machine_type
            ));
        }
        Ok(())
    }
}

/// Timing policy for the batch scheduling loop.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Pause after a full fleet pass before the next cycle starts.
    #[serde(default = "default_cycle_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub cycle_interval: Duration,
    /// Pause between consecutive sites within one cycle.
    #[serde(default = "default_inter_site_delay")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub inter_site_delay: Duration,
    /// Nominal sampling interval each batch is assumed to cover; used for
    /// interval-energy attribution.
    #[serde(default = "default_batch_duration")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub batch_duration: Duration,
    /// Upper bound on a single publish attempt so one slow site cannot stall
    /// the whole cycle.
    #[serde(default = "default_publish_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub publish_timeout: Duration,
    /// Stop after this many cycles; unset means run until cancelled.
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval: default_cycle_interval(),
            inter_site_delay: default_inter_site_delay(),
            batch_duration: default_batch_duration(),
            publish_timeout: default_publish_timeout(),
            max_cycles: None,
        }
    }
}

/// Noise and anomaly policy for the sample generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default = "default_anomaly_probability")]
    pub anomaly_probability: f64,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.anomaly_probability) {
            return Err(anyhow!(
                "sampler anomaly_probability must be within [0, 1], got {}",
                self.anomaly_probability
            ));
        }
        Ok(())
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            anomaly_probability: default_anomaly_probability(),
            random_seed: default_random_seed(),
        }
    }
}

/// Which energy figure a site event reports.
///
/// The fleet keeps cumulative bookkeeping either way; this only selects what
/// `totalEnergyConsumption` carries on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EnergyScope {
    #[default]
    Cumulative,
    PerBatch,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct EnergyConfig {
    #[serde(default)]
    pub scope: EnergyScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Which built-in telemetry sink the daemon wires up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PublisherKind {
    #[default]
    Jsonl,
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default)]
    pub kind: PublisherKind,
    #[serde(default = "default_sink_dir")]
    pub sink_dir: PathBuf,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            kind: PublisherKind::default(),
            sink_dir: default_sink_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default = "default_credential_root")]
    pub root_dir: PathBuf,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            root_dir: default_credential_root(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [sites.chennai_fact]
        location = "Chennai"
        credential_ref = "chennai_fact/device1.pem"

        [sites.kochi_fact]
        location = "Kochi"
        credential_ref = "kochi_fact/device1.pem"

        [machines.SeedCleaner]
        base_power_kw = 5.0
        base_current_a = 12.0

        [scheduler]
        cycle_interval = 15
        inter_site_delay = 5
        batch_duration = 60

        [sampler]
        anomaly_probability = 0.5
        random_seed = 7

        [energy]
        scope = "cumulative"
        "#;

    #[test]
    fn parses_sample_configuration() {
        let config: AppConfig = SAMPLE.parse().expect("sample config must parse");
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.machines.len(), 1);
        assert_eq!(config.scheduler.cycle_interval, Duration::from_secs(15));
        assert_eq!(config.scheduler.inter_site_delay, Duration::from_secs(5));
        assert_eq!(config.sampler.random_seed, 7);
        assert_eq!(config.energy.scope, EnergyScope::Cumulative);
    }

    #[test]
    fn site_order_follows_declaration_order() {
        let config: AppConfig = SAMPLE.parse().expect("sample config must parse");
        let ids: Vec<&str> = config.sites.keys().map(String::as_str).collect();
        assert_eq!(ids, ["chennai_fact", "kochi_fact"]);
    }

    #[test]
    fn rejects_empty_site_registry() {
        let err = "[machines.Pump]\nbase_power_kw = 1.0\nbase_current_a = 1.0"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("at least one site"));
    }

    #[test]
    fn rejects_out_of_range_anomaly_probability() {
        let mut config: AppConfig = SAMPLE.parse().expect("sample config must parse");
        config.sampler.anomaly_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_machine_baseline() {
        let mut config: AppConfig = SAMPLE.parse().expect("sample config must parse");
        config.machines.insert(
            "Broken".to_owned(),
            MachineConfig {
                base_power_kw: 0.0,
                base_current_a: 3.0,
            },
        );
        assert!(config.validate().is_err());
    }
}
