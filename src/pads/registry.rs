// PadRegistry - Pad configuration and the trigger path
//
// Owns the 16 pad definitions and one sink voice per pad. Triggering is
// monophonic per pad: the pad's voice is stopped and reused for the new
// buffer, so the last trigger always wins.
//
// Trigger path: pad snapshot -> SampleRepository -> PlaybackRequest
// -> EffectsBus::apply_chain_to -> AudioSink.

use super::PAD_COUNT;
use super::activity::PadActivity;
use super::feedback::{HapticFeedback, SampleAnalysis};
use super::pad::Pad;
use crate::audio::repository::{SampleRef, SampleRepository};
use crate::audio::sink::{AudioSink, PlaybackRequest, SinkError, VoiceId};
use crate::audio::status::SinkStatus;
use crate::effects::EffectsBus;
use crate::error::{EngineError, EngineResult};
use crate::messaging::{EngineEvent, EventSender};
use crate::sequencer::clock::Clock;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// A started voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceHandle {
    pub pad: usize,
    pub voice: VoiceId,
}

/// Result of a successful trigger call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started(VoiceHandle),
    /// No sample assigned, or the repository could not resolve it.
    /// Nothing was played and no state changed.
    SampleNotFound,
}

impl TriggerOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, TriggerOutcome::Started(_))
    }
}

pub struct PadRegistry {
    pads: RwLock<Vec<Pad>>,
    voices: Vec<Mutex<Option<VoiceId>>>,
    sink: Arc<dyn AudioSink>,
    repository: Arc<dyn SampleRepository>,
    effects: Arc<EffectsBus>,
    activity: PadActivity,
    haptics: Option<Arc<dyn HapticFeedback>>,
    analysis: Option<Arc<dyn SampleAnalysis>>,
    events: EventSender,
    sink_healthy: AtomicBool,
}

impl PadRegistry {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        repository: Arc<dyn SampleRepository>,
        effects: Arc<EffectsBus>,
        clock: Arc<dyn Clock>,
        flash: Duration,
        events: EventSender,
    ) -> Self {
        Self {
            pads: RwLock::new((0..PAD_COUNT).map(Pad::new).collect()),
            voices: (0..PAD_COUNT).map(|_| Mutex::new(None)).collect(),
            sink,
            repository,
            effects,
            activity: PadActivity::new(PAD_COUNT, flash, clock),
            haptics: None,
            analysis: None,
            events,
            sink_healthy: AtomicBool::new(true),
        }
    }

    pub fn with_haptics(mut self, haptics: Arc<dyn HapticFeedback>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    pub fn with_analysis(mut self, analysis: Arc<dyn SampleAnalysis>) -> Self {
        self.analysis = Some(analysis);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Pad>> {
        self.pads.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Pad>> {
        self.pads.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn voice_slot(&self, pad: usize) -> MutexGuard<'_, Option<VoiceId>> {
        self.voices[pad]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_pad(pad: usize) -> EngineResult<()> {
        if pad >= PAD_COUNT {
            return Err(EngineError::PadOutOfRange {
                pad,
                count: PAD_COUNT,
            });
        }
        Ok(())
    }

    /// Assign a sample; out-of-range pads are ignored
    pub fn assign_sample(&self, pad: usize, sample: SampleRef) {
        if pad >= PAD_COUNT {
            debug!("Ignoring sample {} for out-of-range pad {}", sample, pad);
            return;
        }

        let label = self
            .analysis
            .as_ref()
            .and_then(|analysis| analysis.classify(&sample))
            .and_then(|instrument| instrument.label());

        let mut pads = self.write();
        if let Some(label) = label {
            pads[pad].label = label.to_string();
        }
        debug!("Pad {} assigned sample {}", pad, sample);
        pads[pad].sample = Some(sample);
    }

    /// Remove the pad's sample and silence it
    pub fn clear(&self, pad: usize) -> EngineResult<()> {
        Self::check_pad(pad)?;
        self.write()[pad].sample = None;
        if let Some(voice) = *self.voice_slot(pad) {
            self.sink.stop_voice(voice);
        }
        Ok(())
    }

    /// Set mix settings; values are clamped into range
    pub fn configure(&self, pad: usize, volume: f32, pan: f32, pitch: f32) -> EngineResult<()> {
        Self::check_pad(pad)?;
        self.write()[pad].configure(volume, pan, pitch);
        Ok(())
    }

    pub fn set_muted(&self, pad: usize, muted: bool) -> EngineResult<()> {
        Self::check_pad(pad)?;
        self.write()[pad].muted = muted;
        Ok(())
    }

    pub fn set_solo(&self, pad: usize, solo: bool) -> EngineResult<()> {
        Self::check_pad(pad)?;
        self.write()[pad].solo = solo;
        Ok(())
    }

    pub fn set_label(&self, pad: usize, label: impl Into<String>) -> EngineResult<()> {
        Self::check_pad(pad)?;
        self.write()[pad].label = label.into();
        Ok(())
    }

    /// Snapshot of one pad
    pub fn pad(&self, pad: usize) -> EngineResult<Pad> {
        Self::check_pad(pad)?;
        Ok(self.read()[pad].clone())
    }

    pub fn pads(&self) -> Vec<Pad> {
        self.read().clone()
    }

    /// Whether the sequencer should play this pad (mute/solo)
    pub fn is_audible(&self, pad: usize) -> bool {
        self.audibility().get(pad).copied().unwrap_or(false)
    }

    /// Mute/solo resolution for every pad
    pub fn audibility(&self) -> [bool; PAD_COUNT] {
        let pads = self.read();
        let any_solo = pads.iter().any(|p| p.solo);
        let mut audible = [false; PAD_COUNT];
        for (slot, pad) in audible.iter_mut().zip(pads.iter()) {
            *slot = !pad.muted && (!any_solo || pad.solo);
        }
        audible
    }

    pub fn is_active(&self, pad: usize) -> bool {
        self.activity.is_active(pad)
    }

    pub fn active_pads(&self) -> Vec<usize> {
        self.activity.active_pads()
    }

    pub fn sink_status(&self) -> SinkStatus {
        self.sink.status()
    }

    /// Play the pad's sample at `velocity` (0.0 to 1.0)
    pub fn trigger(&self, pad: usize, velocity: f32) -> EngineResult<TriggerOutcome> {
        Self::check_pad(pad)?;

        let (sample, volume, pan, rate) = {
            let pads = self.read();
            let p = &pads[pad];
            match &p.sample {
                Some(sample) => (sample.clone(), p.volume, p.pan, p.rate()),
                None => return Ok(TriggerOutcome::SampleNotFound),
            }
        };

        let Some(buffer) = self.repository.resolve(&sample) else {
            debug!("Pad {}: sample {} not found", pad, sample);
            return Ok(TriggerOutcome::SampleNotFound);
        };

        let status = self.sink.status();
        if !status.is_running() {
            return Err(self.sink_failed(SinkError::Unavailable));
        }

        let velocity = if velocity.is_nan() { 0.0 } else { velocity.clamp(0.0, 1.0) };
        let mut request = PlaybackRequest::new(buffer, volume * velocity, pan, rate);
        self.effects.apply_chain_to(&mut request);

        let voice = {
            let mut slot = self.voice_slot(pad);
            let voice = match *slot {
                Some(voice) => {
                    // Last trigger wins
                    self.sink.stop_voice(voice);
                    voice
                }
                None => {
                    let voice = self.sink.attach_voice().map_err(|e| self.sink_failed(e))?;
                    *slot = Some(voice);
                    voice
                }
            };

            if let Err(e) = self.sink.schedule_buffer(voice, request) {
                // Re-attach on the next trigger; the backend may have restarted
                *slot = None;
                return Err(self.sink_failed(e));
            }
            voice
        };

        self.sink_recovered();
        self.activity.mark(pad);
        if let Some(haptics) = &self.haptics {
            haptics.impact(pad);
        }
        self.events.send(EngineEvent::PadTriggered(pad));

        Ok(TriggerOutcome::Started(VoiceHandle { pad, voice }))
    }

    /// Stop every voice this registry started
    pub fn panic(&self) {
        for pad in 0..PAD_COUNT {
            if let Some(voice) = *self.voice_slot(pad) {
                self.sink.stop_voice(voice);
            }
        }
    }

    fn sink_failed(&self, err: SinkError) -> EngineError {
        if self.sink_healthy.swap(false, Ordering::AcqRel) {
            warn!("Audio output unavailable: {}", err);
            self.events.send(EngineEvent::AudioStatus(self.sink.status()));
        }
        EngineError::AudioUnavailable(err.to_string())
    }

    fn sink_recovered(&self) {
        if !self.sink_healthy.swap(true, Ordering::AcqRel) {
            info!("Audio output recovered");
            self.events.send(EngineEvent::AudioStatus(SinkStatus::Running));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::AudioBuffer;
    use crate::audio::repository::InMemorySampleRepository;
    use crate::audio::sink::{MemorySink, SinkCall};
    use crate::effects::EffectKind;
    use crate::pads::feedback::Instrument;
    use crate::sequencer::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;

    struct Fixture {
        sink: Arc<MemorySink>,
        repo: Arc<InMemorySampleRepository>,
        effects: Arc<EffectsBus>,
        clock: ManualClock,
        registry: PadRegistry,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(MemorySink::new());
        let repo = Arc::new(InMemorySampleRepository::new());
        let effects = Arc::new(EffectsBus::new());
        let clock = ManualClock::new();
        let registry = PadRegistry::new(
            sink.clone(),
            repo.clone(),
            effects.clone(),
            Arc::new(clock.clone()),
            Duration::from_millis(100),
            EventSender::new(16),
        );
        Fixture {
            sink,
            repo,
            effects,
            clock,
            registry,
        }
    }

    fn load(f: &Fixture, pad: usize, name: &str) {
        let sample = f.repo.insert(name, AudioBuffer::silence(44100, 1, 441));
        f.registry.assign_sample(pad, sample);
    }

    #[test]
    fn test_trigger_without_sample_is_not_found() {
        let f = fixture();
        let before = f.registry.pad(4).unwrap();

        assert_eq!(f.registry.trigger(4, 1.0).unwrap(), TriggerOutcome::SampleNotFound);
        assert!(f.sink.calls().is_empty());
        assert_eq!(f.registry.pad(4).unwrap(), before);
        assert!(!f.registry.is_active(4));
    }

    #[test]
    fn test_unresolvable_sample_is_not_found() {
        let f = fixture();
        f.registry.assign_sample(0, SampleRef::new("missing.wav"));
        assert_eq!(f.registry.trigger(0, 1.0).unwrap(), TriggerOutcome::SampleNotFound);
        assert!(f.sink.calls().is_empty());
    }

    #[test]
    fn test_trigger_out_of_range() {
        let f = fixture();
        assert_eq!(
            f.registry.trigger(16, 1.0),
            Err(EngineError::PadOutOfRange { pad: 16, count: 16 })
        );
    }

    #[test]
    fn test_assign_out_of_range_is_noop() {
        let f = fixture();
        f.registry.assign_sample(99, SampleRef::new("kick"));
        assert!(f.registry.pads().iter().all(|p| p.sample.is_none()));
    }

    #[test]
    fn test_trigger_builds_request() {
        let f = fixture();
        load(&f, 2, "hat");
        f.registry.configure(2, 0.5, -0.5, 12.0).unwrap();
        f.effects.set_mix(EffectKind::Delay, 25.0);

        let outcome = f.registry.trigger(2, 0.5).unwrap();
        assert!(outcome.is_started());

        let scheduled = f.sink.scheduled();
        assert_eq!(scheduled.len(), 1);
        let request = &scheduled[0].1;
        assert_eq!(request.gain, 0.25);
        assert_eq!(request.pan, -0.5);
        assert!((request.rate - 2.0).abs() < 1e-6);
        assert_eq!(request.effects.len(), 4);
        assert_eq!(request.effects[1].mix, 25.0);
        assert!(f.registry.is_active(2));
    }

    #[test]
    fn test_retrigger_is_monophonic() {
        let f = fixture();
        load(&f, 0, "kick");

        let first = f.registry.trigger(0, 1.0).unwrap();
        let second = f.registry.trigger(0, 1.0).unwrap();

        let (TriggerOutcome::Started(a), TriggerOutcome::Started(b)) = (first, second) else {
            panic!("expected started voices");
        };
        assert_eq!(a.voice, b.voice);

        let calls = f.sink.calls();
        assert!(matches!(calls[0], SinkCall::Attach(_)));
        assert!(matches!(calls[1], SinkCall::Schedule(..)));
        assert_eq!(calls[2], SinkCall::Stop(a.voice));
        assert!(matches!(calls[3], SinkCall::Schedule(..)));
    }

    #[test]
    fn test_velocity_clamped() {
        let f = fixture();
        load(&f, 1, "snare");
        f.registry.trigger(1, 3.0).unwrap();
        assert_eq!(f.sink.scheduled()[0].1.gain, 0.8);
    }

    #[test]
    fn test_clear_removes_sample_and_stops_voice() {
        let f = fixture();
        load(&f, 5, "clap");
        let TriggerOutcome::Started(handle) = f.registry.trigger(5, 1.0).unwrap() else {
            panic!("expected started voice");
        };

        f.registry.clear(5).unwrap();
        assert!(f.sink.stopped().contains(&handle.voice));
        assert_eq!(f.registry.trigger(5, 1.0).unwrap(), TriggerOutcome::SampleNotFound);
    }

    #[test]
    fn test_panic_stops_all_voices() {
        let f = fixture();
        load(&f, 0, "kick");
        load(&f, 1, "snare");
        f.registry.trigger(0, 1.0).unwrap();
        f.registry.trigger(1, 1.0).unwrap();
        f.sink.clear();

        f.registry.panic();
        assert_eq!(f.sink.stopped().len(), 2);
    }

    #[test]
    fn test_failed_sink_reports_unavailable_then_recovers() {
        let f = fixture();
        load(&f, 0, "kick");
        f.sink.set_status(SinkStatus::Failed);

        assert!(matches!(
            f.registry.trigger(0, 1.0),
            Err(EngineError::AudioUnavailable(_))
        ));

        f.sink.set_status(SinkStatus::Running);
        assert!(f.registry.trigger(0, 1.0).unwrap().is_started());
    }

    #[test]
    fn test_mute_and_solo_audibility() {
        let f = fixture();
        assert!(f.registry.is_audible(3));

        f.registry.set_muted(3, true).unwrap();
        assert!(!f.registry.is_audible(3));

        f.registry.set_solo(7, true).unwrap();
        assert!(f.registry.is_audible(7));
        assert!(!f.registry.is_audible(0));

        f.registry.set_solo(3, true).unwrap();
        assert!(!f.registry.is_audible(3), "mute beats solo");
    }

    #[test]
    fn test_activity_expires() {
        let f = fixture();
        load(&f, 0, "kick");
        f.registry.trigger(0, 1.0).unwrap();
        assert_eq!(f.registry.active_pads(), vec![0]);
        f.clock.advance(Duration::from_millis(150));
        assert!(f.registry.active_pads().is_empty());
    }

    struct CountingHaptics(AtomicUsize);

    impl HapticFeedback for CountingHaptics {
        fn impact(&self, _pad: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NameAnalysis;

    impl SampleAnalysis for NameAnalysis {
        fn classify(&self, sample: &SampleRef) -> Option<Instrument> {
            if sample.as_str().contains("bass") {
                Some(Instrument::Bass)
            } else {
                Some(Instrument::Other)
            }
        }
    }

    #[test]
    fn test_haptics_fire_on_started_triggers_only() {
        let haptics = Arc::new(CountingHaptics(AtomicUsize::new(0)));
        let f = fixture();
        let registry = PadRegistry::new(
            f.sink.clone(),
            f.repo.clone(),
            f.effects.clone(),
            Arc::new(f.clock.clone()),
            Duration::from_millis(100),
            EventSender::new(4),
        )
        .with_haptics(haptics.clone());

        registry.trigger(0, 1.0).unwrap();
        let sample = f.repo.insert("kick", AudioBuffer::silence(44100, 1, 10));
        registry.assign_sample(0, sample);
        registry.trigger(0, 1.0).unwrap();

        assert_eq!(haptics.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_analysis_labels_pad() {
        let f = fixture();
        let registry = PadRegistry::new(
            f.sink.clone(),
            f.repo.clone(),
            f.effects.clone(),
            Arc::new(f.clock.clone()),
            Duration::from_millis(100),
            EventSender::new(4),
        )
        .with_analysis(Arc::new(NameAnalysis));

        registry.assign_sample(8, SampleRef::new("sub_bass.wav"));
        assert_eq!(registry.pad(8).unwrap().label, "BASS");

        registry.assign_sample(9, SampleRef::new("noise.wav"));
        assert_eq!(registry.pad(9).unwrap().label, "RIM");
    }
}
