//! ---
//! ftsim_section: "01-core-functionality"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Primary batch scheduling and lifecycle management."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::Result;
use ftsim_common::config::AppConfig;
use ftsim_publish::{CredentialStore, TelemetryPublisher};
use ftsim_sim::{EnergyLedger, SampleGenerator, TelemetryEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Drives the site fleet: one pass over all registered sites per cycle,
/// machines sampled in catalog order, failures isolated per site.
///
/// All registries arrive as explicit immutable configuration; the random
/// source is seeded from config so runs are reproducible.
pub struct BatchScheduler {
    config: Arc<AppConfig>,
    ledger: Arc<EnergyLedger>,
    credentials: Arc<dyn CredentialStore>,
    publisher: Arc<dyn TelemetryPublisher>,
}

impl BatchScheduler {
    pub fn new(
        config: AppConfig,
        ledger: Arc<EnergyLedger>,
        credentials: Arc<dyn CredentialStore>,
        publisher: Arc<dyn TelemetryPublisher>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            ledger,
            credentials,
            publisher,
        }
    }

    /// Spawn the scheduling loop and return a handle for lifecycle control.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(16);
        info!(
            sites = self.config.sites.len(),
            machines = self.config.machines.len(),
            seed = self.config.sampler.random_seed,
            "batch scheduler started"
        );
        let task = tokio::spawn(run_loop(self, shutdown_rx));
        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle returned from scheduler startup, used by the daemon for shutdown.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Wait for the loop to finish on its own (only happens with a cycle
    /// limit configured).
    pub async fn wait(&mut self) -> Result<()> {
        (&mut self.task).await?;
        Ok(())
    }

    /// Signal cancellation and wait for the loop to wind down. The signal is
    /// observed at every suspension point, so this returns promptly even
    /// mid-sleep.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task.await?;
        info!("scheduler shutdown complete");
        Ok(())
    }
}

async fn run_loop(scheduler: BatchScheduler, mut shutdown: broadcast::Receiver<()>) {
    let config = scheduler.config.clone();
    let sampler = SampleGenerator::new(&config.sampler);
    let mut rng = StdRng::seed_from_u64(config.sampler.random_seed);
    let mut cycle: u64 = 0;

    loop {
        if !matches!(
            shutdown.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ) {
            debug!("shutdown observed at cycle start");
            return;
        }

        cycle += 1;
        info!(cycle, "telemetry cycle started");

        for (site_id, site) in &config.sites {
            process_site(&scheduler, site_id, &site.location, &site.credential_ref, &sampler, &mut rng)
                .await;

            // Fixed pacing between sites, success or not.
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(site_id = %site_id, "shutdown observed during inter-site wait");
                    return;
                }
                _ = tokio::time::sleep(config.scheduler.inter_site_delay) => {}
            }
        }

        info!(cycle, "telemetry cycle complete");

        if let Some(limit) = config.scheduler.max_cycles {
            if cycle >= limit {
                info!(cycle, limit, "cycle limit reached; scheduler exiting");
                return;
            }
        }

        tokio::select! {
            _ = shutdown.recv() => {
                debug!("shutdown observed during inter-cycle wait");
                return;
            }
            _ = tokio::time::sleep(config.scheduler.cycle_interval) => {}
        }
    }
}

/// One site batch: resolve credentials, sample every machine in catalog
/// order, aggregate, publish. Every failure is caught here and logged with
/// the site identifier; the accumulator update is never rolled back once
/// aggregation has happened.
async fn process_site(
    scheduler: &BatchScheduler,
    site_id: &str,
    location: &str,
    credential_ref: &str,
    sampler: &SampleGenerator,
    rng: &mut StdRng,
) {
    let config = &scheduler.config;

    let handle = match scheduler.credentials.resolve(site_id, credential_ref).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(site_id, error = %err, "credential resolution failed; skipping site this cycle");
            return;
        }
    };

    let mut readings = Vec::with_capacity(config.machines.len());
    for (machine_type, profile) in &config.machines {
        readings.push(sampler.generate(machine_type, *profile, rng));
    }

    let totals = scheduler
        .ledger
        .aggregate(site_id, &readings, config.scheduler.batch_duration);
    let event = TelemetryEvent::new(site_id, location, readings, totals);

    let payload = match serde_json::to_vec(&event) {
        Ok(payload) => payload,
        Err(err) => {
            // Serialization of a freshly built event failing is a bug, not a
            // site condition.
            error!(site_id, error = %err, "failed to serialize telemetry event");
            return;
        }
    };

    let publish_timeout = config.scheduler.publish_timeout;
    match tokio::time::timeout(
        publish_timeout,
        scheduler.publisher.publish(&handle, &payload),
    )
    .await
    {
        Ok(Ok(())) => {
            info!(
                site_id,
                total_active_power = totals.total_active_power,
                total_energy_kwh = totals.total_energy_consumption,
                "telemetry published"
            );
        }
        Ok(Err(err)) => {
            warn!(site_id, error = %err, "publish failed; event dropped for this cycle");
        }
        Err(_) => {
            warn!(site_id, timeout_s = publish_timeout.as_secs(), "publish timed out; event dropped for this cycle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftsim_common::config::{
        EnergyScope, MachineConfig, SamplerConfig, SchedulerConfig, SiteConfig,
    };
    use ftsim_publish::{MemoryPublisher, StaticCredentialStore};
    use std::time::Duration;

    fn test_config(max_cycles: Option<u64>) -> AppConfig {
        let mut config = AppConfig::default();
        config.sites.insert(
            "site-a".to_owned(),
            SiteConfig {
                location: "Chennai".to_owned(),
                credential_ref: "site-a/device1.pem".to_owned(),
            },
        );
        config.sites.insert(
            "site-b".to_owned(),
            SiteConfig {
                location: "Kochi".to_owned(),
                credential_ref: "site-b/device1.pem".to_owned(),
            },
        );
        config.machines.insert(
            "SeedCleaner".to_owned(),
            MachineConfig {
                base_power_kw: 5.0,
                base_current_a: 12.0,
            },
        );
        config.machines.insert(
            "OilExpeller".to_owned(),
            MachineConfig {
                base_power_kw: 27.0,
                base_current_a: 65.0,
            },
        );
        config.scheduler = SchedulerConfig {
            cycle_interval: Duration::from_secs(15),
            inter_site_delay: Duration::from_secs(5),
            batch_duration: Duration::from_secs(60),
            publish_timeout: Duration::from_secs(10),
            max_cycles,
        };
        config.sampler = SamplerConfig {
            anomaly_probability: 0.5,
            random_seed: 42,
        };
        config
    }

    struct Fixture {
        ledger: Arc<EnergyLedger>,
        credentials: Arc<StaticCredentialStore>,
        publisher: Arc<MemoryPublisher>,
    }

    fn fixture() -> Fixture {
        Fixture {
            ledger: Arc::new(EnergyLedger::new(EnergyScope::Cumulative)),
            credentials: Arc::new(StaticCredentialStore::new()),
            publisher: Arc::new(MemoryPublisher::new()),
        }
    }

    fn start(config: AppConfig, fx: &Fixture) -> SchedulerHandle {
        BatchScheduler::new(
            config,
            fx.ledger.clone(),
            fx.credentials.clone(),
            fx.publisher.clone(),
        )
        .start()
    }

    fn parse(payload: &[u8]) -> serde_json::Value {
        serde_json::from_slice(payload).expect("published payload is JSON")
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_every_site_in_registration_order() {
        let fx = fixture();
        let mut handle = start(test_config(Some(2)), &fx);
        handle.wait().await.unwrap();

        let events = fx.publisher.events();
        let order: Vec<&str> = events.iter().map(|(site, _)| site.as_str()).collect();
        assert_eq!(order, ["site-a", "site-b", "site-a", "site-b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn readings_follow_catalog_order_and_totals_are_consistent() {
        let fx = fixture();
        let mut handle = start(test_config(Some(1)), &fx);
        handle.wait().await.unwrap();

        let payloads = fx.publisher.payloads_for("site-a");
        assert_eq!(payloads.len(), 1);
        let event = parse(&payloads[0]);

        let readings = event["readings"].as_array().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0]["machineType"], "SeedCleaner");
        assert_eq!(readings[1]["machineType"], "OilExpeller");

        let summed: f64 = readings
            .iter()
            .map(|r| r["activePower"].as_f64().unwrap())
            .sum();
        let total = event["totalActivePower"].as_f64().unwrap();
        assert!((summed - total).abs() < 0.05 + 1e-9);
        assert_eq!(event["location"], "Chennai");
    }

    #[tokio::test(start_paused = true)]
    async fn reported_energy_grows_across_cycles() {
        let fx = fixture();
        let mut handle = start(test_config(Some(3)), &fx);
        handle.wait().await.unwrap();

        let payloads = fx.publisher.payloads_for("site-b");
        assert_eq!(payloads.len(), 3);
        let mut previous = 0.0;
        for payload in payloads {
            let energy = parse(&payload)["totalEnergyConsumption"]
                .as_f64()
                .unwrap();
            assert!(energy >= previous);
            previous = energy;
        }
        assert!(previous > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_keeps_aggregation_and_sibling_sites_intact() {
        let fx = fixture();
        fx.publisher.fail_site("site-a");
        let mut handle = start(test_config(Some(1)), &fx);
        handle.wait().await.unwrap();

        assert!(fx.publisher.payloads_for("site-a").is_empty());
        assert_eq!(fx.publisher.payloads_for("site-b").len(), 1);

        // Aggregation is not rolled back on publish failure.
        let dropped = fx.ledger.cumulative_energy_kwh("site-a").unwrap();
        assert!(dropped > 0.0);
        assert!(fx.ledger.cumulative_energy_kwh("site-b").unwrap() > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn credential_failure_skips_site_without_accumulator_update() {
        let fx = fixture();
        fx.credentials.deny("site-a");
        let mut handle = start(test_config(Some(1)), &fx);
        handle.wait().await.unwrap();

        assert!(fx.publisher.payloads_for("site-a").is_empty());
        assert!(fx.ledger.cumulative_energy_kwh("site-a").is_none());

        // The cycle still completed for the healthy site.
        assert_eq!(fx.publisher.payloads_for("site-b").len(), 1);
        assert!(fx.ledger.cumulative_energy_kwh("site-b").unwrap() > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_an_unbounded_loop() {
        let fx = fixture();
        let handle = start(test_config(None), &fx);
        tokio::time::sleep(Duration::from_secs(40)).await;
        handle.shutdown().await.unwrap();

        // A couple of cycles ran before cancellation.
        assert!(!fx.publisher.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn identical_seeds_produce_identical_streams() {
        let first = fixture();
        let mut handle = start(test_config(Some(1)), &first);
        handle.wait().await.unwrap();

        let second = fixture();
        let mut handle = start(test_config(Some(1)), &second);
        handle.wait().await.unwrap();

        let a = parse(&first.publisher.payloads_for("site-a")[0]);
        let b = parse(&second.publisher.payloads_for("site-a")[0]);
        assert_eq!(a["readings"], b["readings"]);
    }
}
