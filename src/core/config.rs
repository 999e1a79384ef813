// Simulation configuration
//
// Tunables for the physics bookkeeping and the tile grid. Everything has a
// sensible default; a RON file can override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Physics tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Seconds a body must stay below the sleep tolerances before it sleeps
    pub time_to_sleep: f32,
    /// Linear speed below which a body counts as resting
    pub linear_sleep_tolerance: f32,
    /// Angular speed below which a body counts as resting
    pub angular_sleep_tolerance: f32,
    /// Default linear damping for new bodies
    pub linear_damping: f32,
    /// Default angular damping for new bodies
    pub angular_damping: f32,
    /// Whether new bodies start with rotation locked
    pub fixed_rotation: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            time_to_sleep: 0.5,
            linear_sleep_tolerance: 0.01,
            angular_sleep_tolerance: 2.0_f32.to_radians(),
            linear_damping: 0.2,
            angular_damping: 0.2,
            fixed_rotation: false,
        }
    }
}

/// Tile grid tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Side length of a square chunk, in tiles
    pub chunk_size: u16,
    /// Side length of a square tile, in world units
    pub tile_size: u16,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            tile_size: 1,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub map: MapConfig,
}

impl SimConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig =
            ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file (RON)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading simulation config from {}", path.as_ref().display());
        Self::from_ron(&contents)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, Default::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.map.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be non-zero".into()));
        }
        if self.map.tile_size == 0 {
            return Err(ConfigError::Invalid("tile_size must be non-zero".into()));
        }
        if self.physics.time_to_sleep < 0.0 {
            return Err(ConfigError::Invalid("time_to_sleep must not be negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = SimConfig::from_ron("(map: (chunk_size: 8))").unwrap();
        assert_eq!(config.map.chunk_size, 8);
        assert_eq!(config.map.tile_size, 1);
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = SimConfig::from_ron("(map: (chunk_size: 0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_ron_roundtrip() {
        let config = SimConfig::default();
        let text = config.to_ron().unwrap();
        assert_eq!(SimConfig::from_ron(&text).unwrap(), config);
    }
}
