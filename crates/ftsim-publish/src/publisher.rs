//! ---
//! ftsim_section: "02-external-interfaces"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Telemetry publisher trait and built-in sinks."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::credentials::ConnectionHandle;
use crate::errors::PublishError;

/// Best-effort delivery of one serialized telemetry event per site per
/// cycle. Payloads are UTF-8 encoded JSON.
#[async_trait]
pub trait TelemetryPublisher: Send + Sync {
    async fn publish(&self, handle: &ConnectionHandle, payload: &[u8])
        -> Result<(), PublishError>;
}

/// Drops every event with a debug log. Useful when exercising the scheduler
/// without a sink.
#[derive(Debug, Default, Clone)]
pub struct NullPublisher;

#[async_trait]
impl TelemetryPublisher for NullPublisher {
    async fn publish(
        &self,
        handle: &ConnectionHandle,
        payload: &[u8],
    ) -> Result<(), PublishError> {
        debug!(site_id = %handle.site_id, bytes = payload.len(), "null publisher dropped event");
        Ok(())
    }
}

/// Appends one event per line to `<sink_dir>/<site_id>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlPublisher {
    sink_dir: PathBuf,
}

impl JsonlPublisher {
    pub fn new(sink_dir: impl Into<PathBuf>) -> Result<Self, PublishError> {
        let sink_dir = sink_dir.into();
        std::fs::create_dir_all(&sink_dir)?;
        Ok(Self { sink_dir })
    }
}

#[async_trait]
impl TelemetryPublisher for JsonlPublisher {
    async fn publish(
        &self,
        handle: &ConnectionHandle,
        payload: &[u8],
    ) -> Result<(), PublishError> {
        let path = self.sink_dir.join(format!("{}.jsonl", handle.site_id));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(payload)?;
        file.write_all(b"\n")?;
        debug!(site_id = %handle.site_id, path = %path.display(), "event appended to jsonl sink");
        Ok(())
    }
}

/// Records events in memory for assertions; individual sites can be failed
/// to exercise the scheduler's drop path.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<(String, Vec<u8>)>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `publish` fail for the given site until restored.
    pub fn fail_site(&self, site_id: &str) {
        self.failing.lock().insert(site_id.to_owned());
    }

    pub fn restore_site(&self, site_id: &str) {
        self.failing.lock().remove(site_id);
    }

    /// All recorded `(site_id, payload)` pairs in publication order.
    pub fn events(&self) -> Vec<(String, Vec<u8>)> {
        self.events.lock().clone()
    }

    /// Payloads recorded for one site.
    pub fn payloads_for(&self, site_id: &str) -> Vec<Vec<u8>> {
        self.events
            .lock()
            .iter()
            .filter(|(site, _)| site == site_id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl TelemetryPublisher for MemoryPublisher {
    async fn publish(
        &self,
        handle: &ConnectionHandle,
        payload: &[u8],
    ) -> Result<(), PublishError> {
        if self.failing.lock().contains(&handle.site_id) {
            return Err(PublishError::Rejected(format!(
                "injected failure for site '{}'",
                handle.site_id
            )));
        }
        self.events
            .lock()
            .push((handle.site_id.clone(), payload.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(site_id: &str) -> ConnectionHandle {
        ConnectionHandle {
            site_id: site_id.to_owned(),
            fingerprint: "00".repeat(32),
        }
    }

    #[tokio::test]
    async fn jsonl_publisher_appends_one_line_per_event() {
        let dir = tempfile::tempdir().expect("tempdir");
        let publisher = JsonlPublisher::new(dir.path()).unwrap();

        publisher.publish(&handle("site-a"), b"{\"n\":1}").await.unwrap();
        publisher.publish(&handle("site-a"), b"{\"n\":2}").await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("site-a.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, ["{\"n\":1}", "{\"n\":2}"]);
    }

    #[tokio::test]
    async fn memory_publisher_injects_failures_per_site() {
        let publisher = MemoryPublisher::new();
        publisher.fail_site("site-a");

        assert!(publisher.publish(&handle("site-a"), b"{}").await.is_err());
        assert!(publisher.publish(&handle("site-b"), b"{}").await.is_ok());

        publisher.restore_site("site-a");
        assert!(publisher.publish(&handle("site-a"), b"{}").await.is_ok());
        assert_eq!(publisher.payloads_for("site-a").len(), 1);
        assert_eq!(publisher.events().len(), 2);
    }

    #[tokio::test]
    async fn null_publisher_always_acks() {
        let publisher = NullPublisher;
        assert!(publisher.publish(&handle("site-a"), b"{}").await.is_ok());
    }
}
