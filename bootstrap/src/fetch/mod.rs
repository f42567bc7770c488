//! Fetching artifacts from the model hub.
//!
//! This module provides the two fetch strategies (repository snapshots and
//! the hub cache) and the per-attempt containment boundary used by the
//! orchestrator.
//!
//! # Sub-modules
//!
//! - [`download`] - HTTP client trait and `ureq` implementation
//! - [`error`] - Transfer and attempt error types
//! - [`extraction`] - Zip extraction for hub code archives
//! - [`fetcher`] - Strategy dispatch and per-attempt status output
//! - [`hub_cache`] - Hub cache population
//! - [`snapshot`] - Repository snapshots with atomic file writes
//! - [`verification`] - SHA-256 checks for downloaded files

pub mod download;
pub mod error;
pub mod extraction;
pub mod fetcher;
pub mod hub_cache;
pub mod snapshot;
pub mod verification;

pub use download::{HttpHubClient, HubClient, RepoFile};
pub use error::{DownloadError, FetchError};
pub use fetcher::{ArtifactSource, FetchContext, FetchOutcome, HubArtifactSource, fetch_variant};
