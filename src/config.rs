// Engine configuration - RON file with defaults for every field

use crate::error::EngineError;
use crate::sequencer::timeline::Tempo;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON write error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Storage representation used by every slot of the pattern bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternMode {
    /// Boolean matrix [pad][step]
    Grid,
    /// Sparse list of timed hits
    Hits,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pattern_mode: PatternMode,
    /// Number of slots in the pattern bank
    pub pattern_slots: usize,
    /// Grid length in steps
    pub steps_per_pattern: usize,
    /// Hit-list pattern length (bars)
    pub bars_per_pattern: usize,
    pub beats_per_bar: usize,
    pub initial_bpm: f64,
    /// Velocity used for sequenced grid triggers and toggled hits
    pub default_velocity: f32,
    pub quantize: bool,
    pub metronome: bool,
    /// Window around the playhead in which a hit fires
    pub hit_tolerance_ms: f64,
    /// How long a pad reads as active after a trigger
    pub pad_flash_ms: u64,
    /// Capacity of the recorder's pending-hit queue
    pub record_capacity: usize,
    /// Capacity of the event notification channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pattern_mode: PatternMode::Grid,
            pattern_slots: 4,
            steps_per_pattern: 16,
            bars_per_pattern: 4,
            beats_per_bar: 4,
            initial_bpm: 120.0,
            default_velocity: 1.0,
            quantize: true,
            metronome: false,
            hit_tolerance_ms: 10.0,
            pad_flash_ms: 100,
            record_capacity: 1024,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Configuration for a hit-list (sampler style) bank
    pub fn hits() -> Self {
        Self {
            pattern_mode: PatternMode::Hits,
            default_velocity: 0.8,
            ..Self::default()
        }
    }

    /// Load configuration from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Parse and validate configuration from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty RON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern_slots == 0 {
            return Err(ConfigError::Invalid("pattern_slots must be at least 1".into()));
        }
        if self.steps_per_pattern == 0 {
            return Err(ConfigError::Invalid(
                "steps_per_pattern must be at least 1".into(),
            ));
        }
        if self.bars_per_pattern == 0 || self.beats_per_bar == 0 {
            return Err(ConfigError::Invalid(
                "bars_per_pattern and beats_per_bar must be at least 1".into(),
            ));
        }
        if !Tempo::is_valid_bpm(self.initial_bpm) {
            return Err(ConfigError::Invalid(format!(
                "initial_bpm {} outside {}..={}",
                self.initial_bpm,
                Tempo::MIN_BPM,
                Tempo::MAX_BPM
            )));
        }
        if !(0.0..=1.0).contains(&self.default_velocity) {
            return Err(ConfigError::Invalid(format!(
                "default_velocity {} outside 0..=1",
                self.default_velocity
            )));
        }
        if !self.hit_tolerance_ms.is_finite() || self.hit_tolerance_ms < 0.0 {
            return Err(ConfigError::Invalid("hit_tolerance_ms must be >= 0".into()));
        }
        if self.record_capacity == 0 || self.event_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacities must be non-zero".into()));
        }
        Ok(())
    }

    /// Number of steps in one pattern for the configured mode
    pub fn pattern_steps(&self) -> usize {
        match self.pattern_mode {
            PatternMode::Grid => self.steps_per_pattern,
            PatternMode::Hits => self.bars_per_pattern * self.beats_per_bar * STEPS_PER_BEAT,
        }
    }
}

/// Sixteenth-note grid
pub const STEPS_PER_BEAT: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pattern_steps(), 16);
        assert_eq!(EngineConfig::hits().pattern_steps(), 64);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = EngineConfig::from_ron("(initial_bpm: 96.0, metronome: true)").unwrap();
        assert_eq!(config.initial_bpm, 96.0);
        assert!(config.metronome);
        assert_eq!(config.pattern_slots, 4);
        assert_eq!(config.pattern_mode, PatternMode::Grid);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_ron("(initial_bpm: 500.0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_ron("(pattern_slots: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_ron("(default_velocity: 1.5)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = EngineConfig::from_ron("(initial_bpm: ").unwrap_err();
        assert!(matches!(err, ConfigError::Ron(_)));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.ron");

        let mut config = EngineConfig::hits();
        config.initial_bpm = 90.0;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_error_converts_to_engine_error() {
        let err: EngineError = ConfigError::Invalid("bad".into()).into();
        assert_eq!(err, EngineError::Config("Invalid configuration: bad".into()));
    }
}
