//! Trellis bootstrap library.
//!
//! This crate provides the setup tooling for a Trellis/StableNormal
//! deployment: acquiring model weights from the Hugging Face hub through
//! ordered fallback variants, and deriving a path-independent copy of the
//! application entry script. It backs the `trellis-download-weights` and
//! `trellis-fix-app-paths` binaries.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Directory layout, endpoints, `.env` and manifest loading
//! - [`credential`] - Hugging Face token resolution
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Setup-phase error types
//! - [`fetch`] - Snapshot and hub cache fetch strategies
//! - [`manifest`] - Artifact requests and their variants
//! - [`normalize`] - Entry script rewriting
//! - [`orchestrator`] - Fallback cascades across variants
//! - [`output`] - Console output formatting

pub mod cli;
pub mod config;
pub mod credential;
pub mod dirs;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod normalize;
pub mod orchestrator;
pub mod output;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
