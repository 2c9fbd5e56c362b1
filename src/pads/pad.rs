// Pad - One triggerable sound slot and its mix settings

use crate::audio::repository::SampleRef;
use serde::{Deserialize, Serialize};

/// Pitch offset range in semitones
pub const PITCH_RANGE: f32 = 24.0;

pub const DEFAULT_VOLUME: f32 = 0.8;

/// Display labels of a fresh kit, in pad order
pub const DEFAULT_LABELS: [&str; 16] = [
    "KICK", "SNARE", "HAT", "OPEN", "CLAP", "PERC 1", "PERC 2", "CRASH", "808", "RIM", "SHAKER",
    "RIDE", "FX 1", "FX 2", "VOX", "FILL",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub index: usize,
    pub label: String,
    pub sample: Option<SampleRef>,
    /// 0.0 to 1.0
    pub volume: f32,
    /// -1.0 (left) to 1.0 (right)
    pub pan: f32,
    /// Semitone offset, -24 to +24
    pub pitch: f32,
    pub muted: bool,
    pub solo: bool,
}

impl Pad {
    pub fn new(index: usize) -> Self {
        let label = DEFAULT_LABELS
            .get(index)
            .map(|l| l.to_string())
            .unwrap_or_else(|| format!("PAD {}", index + 1));

        Self {
            index,
            label,
            sample: None,
            volume: DEFAULT_VOLUME,
            pan: 0.0,
            pitch: 0.0,
            muted: false,
            solo: false,
        }
    }

    pub fn has_sample(&self) -> bool {
        self.sample.is_some()
    }

    /// Playback rate multiplier for the pitch offset
    pub fn rate(&self) -> f32 {
        2.0_f32.powf(self.pitch / 12.0)
    }

    /// Apply mix settings, clamping each into range
    pub fn configure(&mut self, volume: f32, pan: f32, pitch: f32) {
        self.volume = clamp_or(volume, 0.0, 1.0, self.volume);
        self.pan = clamp_or(pan, -1.0, 1.0, self.pan);
        self.pitch = clamp_or(pitch, -PITCH_RANGE, PITCH_RANGE, self.pitch);
    }
}

/// NaN keeps the previous value
fn clamp_or(value: f32, min: f32, max: f32, previous: f32) -> f32 {
    if value.is_nan() {
        previous
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pad_defaults() {
        let pad = Pad::new(0);
        assert_eq!(pad.label, "KICK");
        assert_eq!(pad.volume, 0.8);
        assert_eq!(pad.rate(), 1.0);
        assert!(!pad.has_sample());
        assert_eq!(Pad::new(15).label, "FILL");
    }

    #[test]
    fn test_configure_clamps() {
        let mut pad = Pad::new(3);
        pad.configure(1.5, -2.0, 40.0);
        assert_eq!(pad.volume, 1.0);
        assert_eq!(pad.pan, -1.0);
        assert_eq!(pad.pitch, 24.0);

        pad.configure(f32::NAN, 0.25, -12.0);
        assert_eq!(pad.volume, 1.0);
        assert_eq!(pad.pan, 0.25);
        assert_eq!(pad.rate(), 0.5);
    }

    #[test]
    fn test_octave_up_doubles_rate() {
        let mut pad = Pad::new(0);
        pad.configure(0.8, 0.0, 12.0);
        assert!((pad.rate() - 2.0).abs() < 1e-6);
    }
}
