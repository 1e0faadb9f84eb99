// src/config/mod.rs

//! Configuration loading and validation for benchrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate values the runner relies on (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ClassifyRuleConfig, ClassifySection, ConfigFile, DefaultsSection, PathsSection,
    PythonSection, RawConfigFile, RepoSection, RerunSection, RunnerSection, ALL_TESTS,
    DEFAULT_DATA_REPO_URL,
};
