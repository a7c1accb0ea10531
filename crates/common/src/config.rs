use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::Result;
use serde::Deserialize;

use crate::types::Unit;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub data: Data,
    pub report: Report,
    /// Declared unit per canonical column name (uppercase keys).
    #[serde(default)]
    pub units: BTreeMap<String, Unit>,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Data {
    pub dir: String,
}

#[derive(Debug, Deserialize)]
pub struct Report {
    pub bridge_hub_min_growth_pct: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let content = std::fs::read_to_string("config/default.toml")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Declared unit for a canonical column; undeclared columns are taken as
    /// already-fractional and left unscaled.
    pub fn unit_for(&self, column: &str) -> Unit {
        self.units
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map_or(Unit::Fraction, |(_, u)| *u)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.data.dir, "data");
        assert!(config.report.bridge_hub_min_growth_pct > 0.0);
    }

    #[test]
    fn test_declared_units() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.unit_for("RATES_PROBABILITY"), Unit::Percent);
        assert_eq!(config.unit_for("rates_probability"), Unit::Percent);
        assert_eq!(config.unit_for("ACTIVITY_INDEX"), Unit::Fraction);
    }

    #[test]
    fn test_units_section_optional() {
        // Config without [units] should still parse.
        let toml = r#"
[general]
log_level = "debug"

[data]
dir = "data"

[report]
bridge_hub_min_growth_pct = 50.0
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert!(config.units.is_empty());
        assert_eq!(config.unit_for("RATES_PROBABILITY"), Unit::Fraction);
    }
}
