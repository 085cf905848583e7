//! Demo-binary configuration, grounded in the teacher's layered TOML
//! config structs (`config/` in the source proxy) — here reduced to the
//! handful of knobs the dump binary actually needs.

use crate::error::{DissectError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub dump_protocols: bool,
    #[serde(default)]
    pub dump_fields: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            log_level: default_log_level(),
            dump_protocols: false,
            dump_fields: false,
        }
    }
}

impl DemoConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| DissectError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: DemoConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.dump_protocols);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let cfg: DemoConfig = toml::from_str("log_level = \"debug\"\ndump_fields = true").unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.dump_fields);
    }
}
