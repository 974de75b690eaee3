//! ---
//! ftsim_section: "02-external-interfaces"
//! ftsim_subsection: "module"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Error taxonomy for the external collaborator boundary."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::time::Duration;

use thiserror::Error;

/// A site's credential material could not be resolved. The scheduler skips
/// the site for the current cycle.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential material registered for site '{0}'")]
    NotFound(String),
    #[error("credential material for site '{site_id}' is unreadable")]
    Unreadable {
        site_id: String,
        #[source]
        source: std::io::Error,
    },
}

/// A site's event could not be delivered. The event is dropped for the
/// current cycle; the site's accumulator has already been updated.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish did not complete within {0:?}")]
    Timeout(Duration),
    #[error("telemetry sink rejected the event: {0}")]
    Rejected(String),
    #[error("I/O error writing to telemetry sink: {0}")]
    Io(#[from] std::io::Error),
}
