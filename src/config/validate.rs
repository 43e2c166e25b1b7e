// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipewatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_url("[engine].url", &cfg.engine.url)?;
    validate_url("[cluster].api_url", &cfg.cluster.api_url)?;
    validate_engine(cfg)?;
    validate_watch(cfg)?;
    validate_pipeline(cfg)?;
    Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(PipewatchError::ConfigError(format!(
            "{field} must be an http(s) URL (got '{url}')"
        )));
    }
    Ok(())
}

fn validate_engine(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.page_size == 0 {
        return Err(PipewatchError::ConfigError(
            "[engine].page_size must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.engine.timeout_secs == 0 {
        return Err(PipewatchError::ConfigError(
            "[engine].timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    let fields = [
        ("[cluster].namespace", &cfg.cluster.namespace),
        ("[watch].group", &cfg.watch.group),
        ("[watch].version", &cfg.watch.version),
        ("[watch].plural", &cfg.watch.plural),
    ];

    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(PipewatchError::ConfigError(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.image.trim().is_empty() {
        return Err(PipewatchError::ConfigError(
            "[pipeline].image must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ConfigFile::try_from(RawConfigFile::default()).is_ok());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.engine.page_size = 0;
        match ConfigFile::try_from(raw) {
            Err(PipewatchError::ConfigError(msg)) => assert!(msg.contains("page_size")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn empty_plural_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.plural = " ".into();
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(PipewatchError::ConfigError(msg)) if msg.contains("plural")
        ));
    }
}
