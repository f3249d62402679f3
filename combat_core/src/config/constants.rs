//! Game constants configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ConfigError;

/// Tunable game constants
///
/// Held by the combat context and passed down to every pipeline call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConstants {
    #[serde(default)]
    pub mitigation: MitigationConstants,
    #[serde(default)]
    pub crit: CritConstants,
    #[serde(default)]
    pub damage: DamageConstants,
    #[serde(default)]
    pub control: ControlConstants,
    #[serde(default)]
    pub feed: FeedConstants,
    #[serde(default)]
    pub progression: ProgressionConstants,
}

impl GameConstants {
    /// Load constants from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            error,
            path: Some(path.to_path_buf()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse constants from TOML text (missing sections fall back to defaults)
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let constants: GameConstants = toml::from_str(content)?;
        constants.validate()?;
        Ok(constants)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.mitigation.cap) {
            return Err(ConfigError::Validation(format!(
                "mitigation.cap must be within [0, 1], got {}",
                self.mitigation.cap
            )));
        }
        if self.mitigation.divisor <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "mitigation.divisor must be positive, got {}",
                self.mitigation.divisor
            )));
        }
        if self.progression.max_level == 0 {
            return Err(ConfigError::Validation("progression.max_level must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MitigationConstants {
    /// Highest fraction armor or magical resistance can remove
    #[serde(default = "default_mitigation_cap")]
    pub cap: f64,
    /// Defense points per 100% mitigation: fraction = defense / divisor
    #[serde(default = "default_mitigation_divisor")]
    pub divisor: f64,
}

impl Default for MitigationConstants {
    fn default() -> Self {
        MitigationConstants {
            cap: 0.8,
            divisor: 100.0,
        }
    }
}

fn default_mitigation_cap() -> f64 {
    0.8
}
fn default_mitigation_divisor() -> f64 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritConstants {
    /// Multiplier used when a combatant's own multiplier is missing or invalid
    #[serde(default = "default_crit_multiplier")]
    pub default_multiplier: f64,
}

impl Default for CritConstants {
    fn default() -> Self {
        CritConstants {
            default_multiplier: 1.5,
        }
    }
}

fn default_crit_multiplier() -> f64 {
    1.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageConstants {
    /// Floor applied to a landed hit after each stage
    #[serde(default = "default_minimum_damage")]
    pub minimum: f64,
}

impl Default for DamageConstants {
    fn default() -> Self {
        DamageConstants { minimum: 1.0 }
    }
}

fn default_minimum_damage() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConstants {
    /// Chance that a landed hit clears one stun on the target
    #[serde(default = "default_stun_break_chance")]
    pub stun_break_on_hit_chance: f64,
}

impl Default for ControlConstants {
    fn default() -> Self {
        ControlConstants {
            stun_break_on_hit_chance: 0.7,
        }
    }
}

fn default_stun_break_chance() -> f64 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConstants {
    /// Battle feed lines kept before the oldest are dropped
    #[serde(default = "default_feed_capacity")]
    pub capacity: usize,
}

impl Default for FeedConstants {
    fn default() -> Self {
        FeedConstants { capacity: 200 }
    }
}

fn default_feed_capacity() -> usize {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConstants {
    #[serde(default = "default_max_level")]
    pub max_level: u32,
}

impl Default for ProgressionConstants {
    fn default() -> Self {
        ProgressionConstants { max_level: 200 }
    }
}

fn default_max_level() -> u32 {
    200
}
