//! ---
//! ftsim_section: "02-external-interfaces"
//! ftsim_subsection: "01-bootstrap"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Publisher and credential boundary exports."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
//! External-collaborator boundary for FTSIM.
//!
//! The scheduler only ever sees the two traits exported here: credential
//! resolution per site and best-effort event publication. Everything behind
//! them (certificate material, wire transport) stays opaque to the core.

pub mod credentials;
pub mod errors;
pub mod publisher;

pub use credentials::{
    ConnectionHandle, CredentialStore, DirectoryCredentialStore, StaticCredentialStore,
};
pub use errors::{CredentialError, PublishError};
pub use publisher::{JsonlPublisher, MemoryPublisher, NullPublisher, TelemetryPublisher};
