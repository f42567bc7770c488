//! Entry script normalization.
//!
//! Produces a fixed copy of the application entry script whose imports and
//! example gallery resolve relative to the script's own directory, so the
//! application can be launched from any working directory.
//!
//! # Sub-modules
//!
//! - [`normalizer`] - Reading, rewriting and writing the derived script
//! - [`rules`] - Rewrite rule data and the generic rule application

pub mod normalizer;
pub mod rules;

pub use normalizer::{
    APP_FILE_NAME, NormalizeError, default_source_path, derived_path, normalize, normalize_with,
    run_normalize,
};
pub use rules::{RewriteRule, apply_rule, default_rules};
