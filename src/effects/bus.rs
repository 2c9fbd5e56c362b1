// EffectsBus - Fixed send chain applied to every triggered voice
// Distortion -> Delay -> Reverb -> Filter; the order cannot change at runtime

use super::unit::{EffectKind, EffectUnit};
use crate::audio::sink::PlaybackRequest;
use crate::error::EngineResult;
use log::debug;
use std::sync::{PoisonError, RwLock};

pub struct EffectsBus {
    units: RwLock<Vec<EffectUnit>>,
}

impl EffectsBus {
    /// Chain with every unit bypassed
    pub fn new() -> Self {
        Self {
            units: RwLock::new(EffectKind::CHAIN.into_iter().map(EffectUnit::new).collect()),
        }
    }

    fn with_unit<R>(&self, kind: EffectKind, f: impl FnOnce(&mut EffectUnit) -> R) -> R {
        let mut units = self.units.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut units[kind.chain_index()])
    }

    /// Set the wet/dry mix of one unit; returns the clamped value
    pub fn set_mix(&self, kind: EffectKind, value: f32) -> f32 {
        let applied = self.with_unit(kind, |unit| unit.set_mix(value));
        debug!("Effect {} mix set to {}", kind, applied);
        applied
    }

    /// Enable or bypass one unit; returns the new enabled state
    pub fn toggle(&self, kind: EffectKind) -> bool {
        let enabled = self.with_unit(kind, EffectUnit::toggle);
        debug!(
            "Effect {} {}",
            kind,
            if enabled { "enabled" } else { "bypassed" }
        );
        enabled
    }

    pub fn set_param(&self, kind: EffectKind, param: &str, value: f32) -> EngineResult<f32> {
        self.with_unit(kind, |unit| unit.set_param(param, value))
    }

    pub fn unit(&self, kind: EffectKind) -> EffectUnit {
        let units = self.units.read().unwrap_or_else(PoisonError::into_inner);
        units[kind.chain_index()].clone()
    }

    /// All units in chain order
    pub fn units(&self) -> Vec<EffectUnit> {
        self.units
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attach a snapshot of the whole chain, in order, to a voice request
    pub fn apply_chain_to(&self, request: &mut PlaybackRequest) {
        let units = self.units.read().unwrap_or_else(PoisonError::into_inner);
        request.effects.clear();
        request
            .effects
            .extend(units.iter().map(EffectUnit::snapshot));
    }
}

impl Default for EffectsBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::AudioBuffer;
    use std::sync::Arc;

    fn request() -> PlaybackRequest {
        PlaybackRequest::new(Arc::new(AudioBuffer::silence(44100, 1, 16)), 1.0, 0.0, 1.0)
    }

    #[test]
    fn test_chain_applied_in_order() {
        let bus = EffectsBus::new();
        bus.set_mix(EffectKind::Reverb, 30.0);

        let mut req = request();
        bus.apply_chain_to(&mut req);

        let kinds: Vec<EffectKind> = req.effects.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, EffectKind::CHAIN.to_vec());
        assert_eq!(req.effects[2].mix, 30.0);
        assert!(req.effects[0].is_bypassed());
    }

    #[test]
    fn test_apply_replaces_previous_sends() {
        let bus = EffectsBus::new();
        let mut req = request();
        bus.apply_chain_to(&mut req);
        bus.apply_chain_to(&mut req);
        assert_eq!(req.effects.len(), 4);
    }

    #[test]
    fn test_disable_keeps_other_parameters() {
        let bus = EffectsBus::new();
        bus.set_mix(EffectKind::Delay, 60.0);
        bus.set_param(EffectKind::Delay, "feedback", 45.0).unwrap();
        bus.set_mix(EffectKind::Filter, 20.0);

        assert!(!bus.toggle(EffectKind::Delay));

        let delay = bus.unit(EffectKind::Delay);
        assert_eq!(delay.mix(), 0.0);
        assert_eq!(delay.param("feedback"), Some(45.0));
        assert_eq!(delay.param("time"), Some(0.5));
        assert_eq!(bus.unit(EffectKind::Filter).mix(), 20.0);

        assert!(bus.toggle(EffectKind::Delay));
        assert_eq!(bus.unit(EffectKind::Delay).mix(), 60.0);
    }
}
