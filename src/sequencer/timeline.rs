// Timeline - Tempo and step-grid timing
// Converts BPM into the sixteenth-note step grid the sequencer runs on

use super::quantizer;
use crate::error::{EngineError, EngineResult};
use std::time::Duration;

/// Tempo in beats per minute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 300.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 300.0]
    pub fn new(bpm: f64) -> EngineResult<Self> {
        if !Self::is_valid_bpm(bpm) {
            return Err(EngineError::InvalidTempo(bpm));
        }
        Ok(Self { bpm })
    }

    pub fn is_valid_bpm(bpm: f64) -> bool {
        bpm.is_finite() && (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm)
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one sixteenth-note step in seconds (60 / bpm / 4)
    pub fn step_duration_seconds(&self) -> f64 {
        quantizer::step_duration(self.bpm)
    }

    /// Tick interval of the sequencer
    pub fn step_interval(&self) -> Duration {
        Duration::from_secs_f64(self.step_duration_seconds())
    }

    /// Length of a pattern of `steps` steps, in seconds
    pub fn pattern_duration_seconds(&self, steps: usize) -> f64 {
        self.step_duration_seconds() * steps as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_step_duration() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.step_duration_seconds(), 0.125);
        assert_eq!(tempo.pattern_duration_seconds(16), 2.0);
        assert_eq!(tempo.step_interval(), Duration::from_millis(125));
    }

    #[test]
    fn test_tempo_range() {
        assert!(Tempo::new(20.0).is_ok());
        assert!(Tempo::new(300.0).is_ok());
        assert_eq!(Tempo::new(19.9), Err(EngineError::InvalidTempo(19.9)));
        assert!(Tempo::new(300.1).is_err());
        assert!(Tempo::new(f64::NAN).is_err());
        assert!(Tempo::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_step_interval_monotonic_in_inverse_bpm() {
        let mut previous = Tempo::new(21.0).unwrap().step_duration_seconds();
        for bpm in 22..300 {
            let current = Tempo::new(bpm as f64).unwrap().step_duration_seconds();
            assert!(current < previous, "interval must shrink as BPM grows");
            previous = current;
        }
    }
}
