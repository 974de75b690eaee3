//! ---
//! ftsim_section: "02-external-interfaces"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Per-site credential resolution."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::errors::CredentialError;

/// Opaque handle the publisher needs to address one site's stream. The core
/// never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub site_id: String,
    /// SHA-256 fingerprint of the credential material backing the handle.
    pub fingerprint: String,
}

/// Resolves a site identifier to a connection handle, or fails with a
/// site-scoped [`CredentialError`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn resolve(
        &self,
        site_id: &str,
        credential_ref: &str,
    ) -> Result<ConnectionHandle, CredentialError>;
}

/// Credential store backed by a directory of per-site certificate files.
/// `credential_ref` is interpreted as a path relative to the root.
#[derive(Debug, Clone)]
pub struct DirectoryCredentialStore {
    root: PathBuf,
}

impl DirectoryCredentialStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CredentialStore for DirectoryCredentialStore {
    async fn resolve(
        &self,
        site_id: &str,
        credential_ref: &str,
    ) -> Result<ConnectionHandle, CredentialError> {
        let path = self.root.join(credential_ref);
        let material = std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => CredentialError::NotFound(site_id.to_owned()),
            _ => CredentialError::Unreadable {
                site_id: site_id.to_owned(),
                source: err,
            },
        })?;
        Ok(ConnectionHandle {
            site_id: site_id.to_owned(),
            fingerprint: fingerprint(&material),
        })
    }
}

/// In-memory credential store for tests and development. Sites are resolved
/// from their `credential_ref` alone; individual sites can be denied to
/// exercise the scheduler's skip path.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    denied: Mutex<HashSet<String>>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `resolve` fail with `NotFound` for the given site until allowed
    /// again.
    pub fn deny(&self, site_id: &str) {
        self.denied.lock().insert(site_id.to_owned());
    }

    pub fn allow(&self, site_id: &str) {
        self.denied.lock().remove(site_id);
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn resolve(
        &self,
        site_id: &str,
        credential_ref: &str,
    ) -> Result<ConnectionHandle, CredentialError> {
        if self.denied.lock().contains(site_id) {
            return Err(CredentialError::NotFound(site_id.to_owned()));
        }
        Ok(ConnectionHandle {
            site_id: site_id.to_owned(),
            fingerprint: fingerprint(credential_ref.as_bytes()),
        })
    }
}

fn fingerprint(material: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(material);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_store_fingerprints_existing_material() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("device1.pem"), b"fake certificate").unwrap();

        let store = DirectoryCredentialStore::new(dir.path());
        let handle = store.resolve("chennai_fact", "device1.pem").await.unwrap();
        assert_eq!(handle.site_id, "chennai_fact");
        assert_eq!(handle.fingerprint.len(), 64);
    }

    #[tokio::test]
    async fn directory_store_reports_missing_material_as_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectoryCredentialStore::new(dir.path());
        let err = store.resolve("kochi_fact", "missing.pem").await.unwrap_err();
        assert!(matches!(err, CredentialError::NotFound(site) if site == "kochi_fact"));
    }

    #[tokio::test]
    async fn static_store_denies_and_restores_sites() {
        let store = StaticCredentialStore::new();
        assert!(store.resolve("site-a", "ref-a").await.is_ok());

        store.deny("site-a");
        assert!(store.resolve("site-a", "ref-a").await.is_err());
        assert!(store.resolve("site-b", "ref-b").await.is_ok());

        store.allow("site-a");
        assert!(store.resolve("site-a", "ref-a").await.is_ok());
    }
}
