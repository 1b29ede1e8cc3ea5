//! The single configuration record for the core (spec.md §9 "Configurable
//! knobs ... must be a single configuration record loaded once").
//!
//! Follows the teacher's `SimulationConfig` pattern: a serde-derived struct
//! with `#[serde(default)]` per tunable field, loadable from YAML or TOML via
//! [`CoreConfig::from_file`], constructed in code via [`CoreConfig::default`]
//! otherwise. There is no CLI in this crate (spec.md §6 "the CORE has none");
//! an embedding host is expected to own the file path and call
//! `from_file`/`from_str` itself.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seizure, ceiling, and malfunction tuning (spec.md §9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReliabilityConfig {
    #[serde(default = "defaults::progressive_failure_exponent")]
    pub progressive_failure_exponent: f64,
    #[serde(default = "defaults::progressive_failure_multiplier")]
    pub progressive_failure_multiplier: f64,
    #[serde(default = "defaults::enable_seizure_escalation")]
    pub enable_seizure_escalation: bool,
    #[serde(default = "defaults::seizure_base_threshold")]
    pub seizure_base_threshold: f64,
    #[serde(default = "defaults::seizure_dna_reduction")]
    pub seizure_dna_reduction: f64,
    #[serde(default = "defaults::seizure_min_chance")]
    pub seizure_min_chance: f64,
    #[serde(default = "defaults::seizure_max_chance")]
    pub seizure_max_chance: f64,
    #[serde(default = "defaults::seizure_lemon_penalty")]
    pub seizure_lemon_penalty: f64,
    #[serde(default = "defaults::seizure_repair_cost_mult")]
    pub seizure_repair_cost_mult: f64,
    #[serde(default = "defaults::seizure_repair_min_reliability")]
    pub seizure_repair_min_reliability: f32,
    #[serde(default = "defaults::paint_cost_multiplier")]
    pub paint_cost_multiplier: f64,
    #[serde(default = "defaults::malfunction_frequency")]
    pub malfunction_frequency: f64,
    #[serde(default = "defaults::legendary_dna_threshold")]
    pub legendary_dna_threshold: f32,
    #[serde(default = "defaults::ceiling_floor")]
    pub ceiling_floor: f32,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        ReliabilityConfig {
            progressive_failure_exponent: defaults::progressive_failure_exponent(),
            progressive_failure_multiplier: defaults::progressive_failure_multiplier(),
            enable_seizure_escalation: defaults::enable_seizure_escalation(),
            seizure_base_threshold: defaults::seizure_base_threshold(),
            seizure_dna_reduction: defaults::seizure_dna_reduction(),
            seizure_min_chance: defaults::seizure_min_chance(),
            seizure_max_chance: defaults::seizure_max_chance(),
            seizure_lemon_penalty: defaults::seizure_lemon_penalty(),
            seizure_repair_cost_mult: defaults::seizure_repair_cost_mult(),
            seizure_repair_min_reliability: defaults::seizure_repair_min_reliability(),
            paint_cost_multiplier: defaults::paint_cost_multiplier(),
            malfunction_frequency: defaults::malfunction_frequency(),
            legendary_dna_threshold: defaults::legendary_dna_threshold(),
            ceiling_floor: defaults::ceiling_floor(),
        }
    }
}

/// The single configuration record consumed by [`crate::core::Core::new`].
///
/// The agent-tier, quality-tier, and price-tier tables ([`crate::search::AgentTier`],
/// [`crate::listing::QualityTier`], [`crate::sale_listing::SaleAgentTier`],
/// [`crate::sale_listing::PriceTier`]) are fixed lookup tables spec.md §4.4
/// documents by name and value, not host-tunable knobs, so they live as
/// `match` arms on those enums rather than fields here — only the
/// reliability/search knobs spec.md §9 calls out as configurable are part
/// of this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    pub reliability: ReliabilityConfig,
    #[serde(default = "defaults::max_active_searches")]
    pub max_active_searches: usize,
    #[serde(default = "defaults::starting_credit_score")]
    pub starting_credit_score: u16,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            reliability: ReliabilityConfig::default(),
            max_active_searches: defaults::max_active_searches(),
            starting_credit_score: defaults::starting_credit_score(),
        }
    }
}

impl CoreConfig {
    /// Loads a config from a YAML or TOML file, inferred from extension,
    /// mirroring the teacher's `SimulationConfig::from_file`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)
                .map_err(|e| CoreError::Serialize(format!("yaml parse: {e}"))),
            Some("toml") => {
                toml::from_str(&contents).map_err(|e| CoreError::Serialize(format!("toml parse: {e}")))
            }
            other => Err(CoreError::Serialize(format!(
                "unsupported config format: {:?}; use .yaml, .yml, or .toml",
                other
            ))),
        }
    }
}

mod defaults {
    pub fn progressive_failure_exponent() -> f64 {
        2.0
    }
    pub fn progressive_failure_multiplier() -> f64 {
        0.025
    }
    pub fn enable_seizure_escalation() -> bool {
        true
    }
    pub fn seizure_base_threshold() -> f64 {
        0.40
    }
    pub fn seizure_dna_reduction() -> f64 {
        0.30
    }
    pub fn seizure_min_chance() -> f64 {
        0.05
    }
    pub fn seizure_max_chance() -> f64 {
        0.50
    }
    pub fn seizure_lemon_penalty() -> f64 {
        0.20
    }
    pub fn seizure_repair_cost_mult() -> f64 {
        0.05
    }
    pub fn seizure_repair_min_reliability() -> f32 {
        0.30
    }
    pub fn paint_cost_multiplier() -> f64 {
        1.0
    }
    pub fn malfunction_frequency() -> f64 {
        1.0
    }
    pub fn max_active_searches() -> usize {
        5
    }
    pub fn starting_credit_score() -> u16 {
        650
    }
    pub fn legendary_dna_threshold() -> f32 {
        0.90
    }
    pub fn ceiling_floor() -> f32 {
        0.30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let c = CoreConfig::default();
        assert_eq!(c.reliability.progressive_failure_exponent, 2.0);
        assert_eq!(c.reliability.progressive_failure_multiplier, 0.025);
        assert!(c.reliability.enable_seizure_escalation);
        assert_eq!(c.max_active_searches, 5);
    }

    #[test]
    fn loads_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = CoreConfig::default();
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded = CoreConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn loads_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = CoreConfig::default();
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = CoreConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(CoreConfig::from_file(&path).is_err());
    }
}
