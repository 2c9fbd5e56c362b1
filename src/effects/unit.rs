// Effect units - Parameterized stages of the send chain
//
// Units do not process audio here. They hold the wet/dry mix and named
// parameters that the audio sink receives as an `EffectSend` snapshot with
// every scheduled voice. A mix of 0 is the bypass state; the unit stays in
// the chain.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mix range used by every unit (percent wet)
pub const MIX_MIN: f32 = 0.0;
pub const MIX_MAX: f32 = 100.0;

/// Effect kinds, declared in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Distortion,
    Delay,
    Reverb,
    Filter,
}

/// Range and default of one named parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

const DISTORTION_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "pre_gain",
    min: -80.0,
    max: 20.0,
    default: -6.0,
}];

const DELAY_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "time",
        min: 0.0,
        max: 2.0,
        default: 0.5,
    },
    ParamSpec {
        name: "feedback",
        min: 0.0,
        max: 100.0,
        default: 30.0,
    },
];

const REVERB_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "room_size",
    min: 0.0,
    max: 1.0,
    default: 0.6,
}];

const FILTER_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "cutoff",
        min: 20.0,
        max: 20000.0,
        default: 20000.0,
    },
    ParamSpec {
        name: "resonance",
        min: 0.0,
        max: 1.0,
        default: 0.0,
    },
];

impl EffectKind {
    /// Fixed processing order
    pub const CHAIN: [EffectKind; 4] = [
        EffectKind::Distortion,
        EffectKind::Delay,
        EffectKind::Reverb,
        EffectKind::Filter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Distortion => "distortion",
            EffectKind::Delay => "delay",
            EffectKind::Reverb => "reverb",
            EffectKind::Filter => "filter",
        }
    }

    /// Mix applied when the unit is enabled with no remembered value
    pub fn preset_mix(&self) -> f32 {
        match self {
            EffectKind::Distortion => 50.0,
            EffectKind::Delay => 25.0,
            EffectKind::Reverb => 30.0,
            EffectKind::Filter => 40.0,
        }
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            EffectKind::Distortion => DISTORTION_PARAMS,
            EffectKind::Delay => DELAY_PARAMS,
            EffectKind::Reverb => REVERB_PARAMS,
            EffectKind::Filter => FILTER_PARAMS,
        }
    }

    /// Position in the chain
    pub fn chain_index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        EffectKind::CHAIN
            .into_iter()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| EngineError::UnknownEffect(s.to_string()))
    }
}

/// Snapshot of one unit attached to a playback request
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSend {
    pub kind: EffectKind,
    pub mix: f32,
    pub params: Vec<(&'static str, f32)>,
}

impl EffectSend {
    pub fn is_bypassed(&self) -> bool {
        self.mix <= MIX_MIN
    }

    pub fn param(&self, name: &str) -> Option<f32> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Wet fraction 0.0 to 1.0
    pub fn wet(&self) -> f32 {
        self.mix / MIX_MAX
    }
}

/// One stage of the chain
#[derive(Debug, Clone, PartialEq)]
pub struct EffectUnit {
    kind: EffectKind,
    mix: f32,
    /// Last non-zero mix, restored by `toggle`
    last_mix: Option<f32>,
    params: Vec<(&'static str, f32)>,
}

impl EffectUnit {
    /// New unit, bypassed, parameters at their defaults
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            mix: MIX_MIN,
            last_mix: None,
            params: kind.params().iter().map(|p| (p.name, p.default)).collect(),
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Enabled is derived from the mix
    pub fn is_enabled(&self) -> bool {
        self.mix > MIX_MIN
    }

    /// Set the wet/dry mix, clamped to 0..=100; returns the applied value
    pub fn set_mix(&mut self, value: f32) -> f32 {
        let value = if value.is_nan() {
            MIX_MIN
        } else {
            value.clamp(MIX_MIN, MIX_MAX)
        };
        self.mix = value;
        if value > MIX_MIN {
            self.last_mix = Some(value);
        }
        value
    }

    /// Enable with the remembered (or preset) mix, or bypass with mix 0
    /// Returns the new enabled state
    pub fn toggle(&mut self) -> bool {
        if self.is_enabled() {
            self.last_mix = Some(self.mix);
            self.mix = MIX_MIN;
            false
        } else {
            self.mix = self.last_mix.unwrap_or_else(|| self.kind.preset_mix());
            true
        }
    }

    pub fn param(&self, name: &str) -> Option<f32> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Set a named parameter, clamped to its range; returns the applied value
    pub fn set_param(&mut self, name: &str, value: f32) -> EngineResult<f32> {
        let spec = self
            .kind
            .params()
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::UnknownParameter {
                effect: self.kind.name().to_string(),
                param: name.to_string(),
            })?;
        let value = if value.is_nan() {
            spec.default
        } else {
            value.clamp(spec.min, spec.max)
        };

        if let Some(slot) = self.params.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        }
        Ok(value)
    }

    pub fn snapshot(&self) -> EffectSend {
        EffectSend {
            kind: self.kind,
            mix: self.mix,
            params: self.params.clone(),
        }
    }
}
