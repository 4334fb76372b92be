//! Tracker configuration, read from `.marktrack/config.toml`.

use super::count::default_multiplicity;
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "config.toml";

/// Settings for count validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Fractional unit a non-integer count must be a multiple of.
    pub count_multiplicity: Decimal,
    /// Mark unit weight must be strictly greater than this.
    pub min_unit_weight: Decimal,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            count_multiplicity: default_multiplicity(),
            min_unit_weight: Decimal::ZERO,
        }
    }
}

impl TrackerConfig {
    /// Loads `config.toml` from `dir`, falling back to defaults if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or a value is out of range.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.count_multiplicity <= Decimal::ZERO {
            bail!("count_multiplicity must be positive");
        }
        if config.min_unit_weight < Decimal::ZERO {
            bail!("min_unit_weight must not be negative");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::load(dir.path()).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.count_multiplicity, Decimal::new(5, 1));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "count_multiplicity = \"0.25\"\nmin_unit_weight = \"1.5\"\n",
        )
        .unwrap();
        let config = TrackerConfig::load(dir.path()).unwrap();
        assert_eq!(config.count_multiplicity, Decimal::new(25, 2));
        assert_eq!(config.min_unit_weight, Decimal::new(15, 1));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = TrackerConfig::parse("min_unit_weight = \"2\"").unwrap();
        assert_eq!(config.count_multiplicity, Decimal::new(5, 1));
        assert_eq!(config.min_unit_weight, Decimal::from(2));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(TrackerConfig::parse("count_multiplicity = \"0\"").is_err());
        assert!(TrackerConfig::parse("min_unit_weight = \"-1\"").is_err());
        assert!(TrackerConfig::parse("unknown = 1").is_err());
    }
}
