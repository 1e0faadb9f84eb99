// src/config/validate.rs

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BenchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BenchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_defaults(cfg)?;
    validate_paths(cfg)?;
    validate_rerun_pattern(cfg)?;
    validate_classify_rules(cfg)?;
    validate_env(cfg)?;
    Ok(())
}

fn validate_defaults(cfg: &RawConfigFile) -> Result<()> {
    if cfg.defaults.threads == 0 {
        return Err(BenchError::ConfigError(
            "[defaults].threads must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.defaults.model.trim().is_empty() {
        return Err(BenchError::ConfigError(
            "[defaults].model must not be empty".to_string(),
        ));
    }
    if cfg.defaults.edit_format.trim().is_empty() {
        return Err(BenchError::ConfigError(
            "[defaults].edit_format must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let paths = [
        ("benchmark_script", &cfg.paths.benchmark_script),
        ("results_root", &cfg.paths.results_root),
        ("credentials_file", &cfg.paths.credentials_file),
        ("data_repo", &cfg.paths.data_repo),
    ];
    for (key, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(BenchError::ConfigError(format!(
                "[paths].{key} must not be empty"
            )));
        }
    }
    if cfg.python.interpreter.as_os_str().is_empty() {
        return Err(BenchError::ConfigError(
            "[python].interpreter must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_rerun_pattern(cfg: &RawConfigFile) -> Result<()> {
    Glob::new(&cfg.rerun.pattern).map_err(|e| {
        BenchError::ConfigError(format!(
            "[rerun].pattern '{}' is not a valid glob: {}",
            cfg.rerun.pattern, e
        ))
    })?;
    Ok(())
}

fn validate_classify_rules(cfg: &RawConfigFile) -> Result<()> {
    for (idx, rule) in cfg.classify.rule.iter().enumerate() {
        if let Err(e) = Regex::new(&rule.pattern) {
            return Err(BenchError::ConfigError(format!(
                "[[classify.rule]] #{} has invalid pattern '{}': {}",
                idx + 1,
                rule.pattern,
                e
            )));
        }
    }
    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(BenchError::ConfigError(format!(
                "[env] has invalid variable name '{key}'"
            )));
        }
    }
    Ok(())
}
