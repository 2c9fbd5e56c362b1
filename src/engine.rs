// DrumEngine - Control-surface API over the sequencing core
//
// Wires PadRegistry, PatternStore, EffectsBus and Transport together and
// exposes the operations a UI or controller calls. Every call is safe to
// make from any thread while playback is running.

use crate::audio::repository::{InMemorySampleRepository, SampleRef, SampleRepository};
use crate::audio::sink::{AudioSink, NullSink};
use crate::audio::status::SinkStatus;
use crate::config::EngineConfig;
use crate::effects::{EffectKind, EffectUnit, EffectsBus};
use crate::error::EngineResult;
use crate::messaging::{EngineEvent, EventReceiver, EventSender};
use crate::pads::{HapticFeedback, Pad, PadRegistry, SampleAnalysis, TriggerOutcome};
use crate::sequencer::clock::{Clock, SystemClock};
use crate::sequencer::metronome::Metronome;
use crate::sequencer::pattern::{Pattern, PatternEntry};
use crate::sequencer::recorder::Recorder;
use crate::sequencer::scheduler::{Scheduler, ThreadScheduler};
use crate::sequencer::store::PatternStore;
use crate::sequencer::timeline::Tempo;
use crate::sequencer::transport::{Transport, TransportParts, TransportState};
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Assembles a [`DrumEngine`] from its collaborators
///
/// Unset collaborators default to a silent sink, an empty in-memory sample
/// repository, a thread-backed scheduler and the system clock.
pub struct EngineBuilder {
    config: EngineConfig,
    sink: Option<Arc<dyn AudioSink>>,
    repository: Option<Arc<dyn SampleRepository>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    clock: Option<Arc<dyn Clock>>,
    haptics: Option<Arc<dyn HapticFeedback>>,
    analysis: Option<Arc<dyn SampleAnalysis>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sink: None,
            repository: None,
            scheduler: None,
            clock: None,
            haptics: None,
            analysis: None,
        }
    }

    /// Builder configured from a RON file
    pub fn from_config_file(path: &Path) -> EngineResult<Self> {
        Ok(Self::new(EngineConfig::load(path)?))
    }

    pub fn sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn SampleRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn haptics(mut self, haptics: Arc<dyn HapticFeedback>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    pub fn analysis(mut self, analysis: Arc<dyn SampleAnalysis>) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn build(self) -> EngineResult<DrumEngine> {
        self.config.validate()?;
        let config = self.config;

        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSink::new()));
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemorySampleRepository::new()));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(ThreadScheduler::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));

        let events = EventSender::new(config.event_capacity);
        let effects = Arc::new(EffectsBus::new());

        let mut registry = PadRegistry::new(
            Arc::clone(&sink),
            repository,
            Arc::clone(&effects),
            Arc::clone(&clock),
            Duration::from_millis(config.pad_flash_ms),
            events.clone(),
        );
        if let Some(haptics) = self.haptics {
            registry = registry.with_haptics(haptics);
        }
        if let Some(analysis) = self.analysis {
            registry = registry.with_analysis(analysis);
        }
        let pads = Arc::new(registry);

        let store = Arc::new(PatternStore::new(&config));
        let transport = Transport::new(
            TransportParts {
                store: Arc::clone(&store),
                pads: Arc::clone(&pads),
                sink,
                recorder: Arc::new(Recorder::new(config.record_capacity)),
                metronome: Arc::new(Metronome::new(config.metronome, config.beats_per_bar)),
                scheduler,
                clock,
                events: events.clone(),
            },
            Tempo::new(config.initial_bpm)?,
            config.hit_tolerance_ms,
            config.quantize,
        );

        info!(
            "Engine ready: {:?} bank, {} slots x {} steps, {} BPM",
            config.pattern_mode,
            config.pattern_slots,
            store.steps(),
            config.initial_bpm
        );

        Ok(DrumEngine {
            config,
            store,
            pads,
            effects,
            transport,
            events,
        })
    }
}

/// The pad sequencer
pub struct DrumEngine {
    config: EngineConfig,
    store: Arc<PatternStore>,
    pads: Arc<PadRegistry>,
    effects: Arc<EffectsBus>,
    transport: Transport,
    events: EventSender,
}

impl DrumEngine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive change notifications; replaces any previous subscriber
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    // ---- Pads ----

    /// Play a pad live
    ///
    /// While recording the hit is captured even when the pad has no
    /// sample, so a take can be laid down before the kit is loaded.
    pub fn trigger(&self, pad: usize, velocity: f32) -> EngineResult<TriggerOutcome> {
        // Index errors must not reach the recorder
        self.pads.pad(pad)?;
        self.transport.capture_hit(pad, velocity);
        self.pads.trigger(pad, velocity)
    }

    pub fn assign_sample(&self, pad: usize, sample: impl Into<SampleRef>) {
        self.pads.assign_sample(pad, sample.into());
    }

    pub fn clear_pad(&self, pad: usize) -> EngineResult<()> {
        self.pads.clear(pad)
    }

    pub fn configure_pad(&self, pad: usize, volume: f32, pan: f32, pitch: f32) -> EngineResult<()> {
        self.pads.configure(pad, volume, pan, pitch)
    }

    pub fn set_pad_muted(&self, pad: usize, muted: bool) -> EngineResult<()> {
        self.pads.set_muted(pad, muted)
    }

    pub fn set_pad_solo(&self, pad: usize, solo: bool) -> EngineResult<()> {
        self.pads.set_solo(pad, solo)
    }

    pub fn set_pad_label(&self, pad: usize, label: impl Into<String>) -> EngineResult<()> {
        self.pads.set_label(pad, label)
    }

    pub fn pad(&self, pad: usize) -> EngineResult<Pad> {
        self.pads.pad(pad)
    }

    pub fn pads(&self) -> Vec<Pad> {
        self.pads.pads()
    }

    /// Advisory flash state for UI
    pub fn is_pad_active(&self, pad: usize) -> bool {
        self.pads.is_active(pad)
    }

    pub fn active_pads(&self) -> Vec<usize> {
        self.pads.active_pads()
    }

    /// Silence every voice without touching the transport
    pub fn panic(&self) {
        self.pads.panic();
    }

    pub fn audio_status(&self) -> SinkStatus {
        self.pads.sink_status()
    }

    // ---- Patterns ----

    pub fn toggle_step(&self, pattern: usize, pad: usize, step: usize) -> EngineResult<bool> {
        let active = self.store.toggle_step(pattern, pad, step)?;
        self.events.send(EngineEvent::PatternEdited(pattern));
        Ok(active)
    }

    pub fn clear_pattern(&self, pattern: usize) -> EngineResult<()> {
        self.store.clear(pattern)?;
        self.events.send(EngineEvent::PatternEdited(pattern));
        Ok(())
    }

    pub fn copy_pattern(&self, from: usize, to: usize) -> EngineResult<()> {
        self.store.copy(from, to)?;
        self.events.send(EngineEvent::PatternEdited(to));
        Ok(())
    }

    /// Switch the current pattern; while playing the switch lands on the
    /// next step boundary
    pub fn select_pattern(&self, index: usize) -> EngineResult<()> {
        self.store.select_current(index)?;
        if self.store.pending_index().is_none() {
            self.events.send(EngineEvent::PatternSelected(index));
        }
        Ok(())
    }

    /// Steps per pattern slot
    pub fn pattern_steps(&self) -> usize {
        self.store.steps()
    }

    pub fn current_pattern(&self) -> usize {
        self.store.current_index()
    }

    pub fn pattern(&self, index: usize) -> EngineResult<Pattern> {
        self.store.pattern(index)
    }

    /// Replace a slot with an externally loaded pattern
    pub fn load_pattern(&self, index: usize, pattern: Pattern) -> EngineResult<()> {
        self.store.replace(index, pattern)?;
        self.events.send(EngineEvent::PatternEdited(index));
        Ok(())
    }

    /// Read-only export of a slot: (pad, step or time, velocity) entries
    pub fn pattern_entries(&self, pattern: usize) -> EngineResult<Vec<PatternEntry>> {
        self.store.entries(pattern, self.transport.step_duration())
    }

    // ---- Transport ----

    pub fn play(&self) -> EngineResult<()> {
        self.transport.play()
    }

    pub fn stop(&self) {
        self.transport.stop();
    }

    pub fn toggle_recording(&self) -> EngineResult<TransportState> {
        self.transport.toggle_recording()
    }

    pub fn set_tempo(&self, bpm: f64) -> EngineResult<()> {
        self.transport.set_tempo(bpm)
    }

    pub fn set_metronome(&self, enabled: bool) {
        self.transport.set_metronome(enabled);
    }

    pub fn set_quantize(&self, enabled: bool) {
        self.transport.set_quantize(enabled);
    }

    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn current_step(&self) -> usize {
        self.transport.current_step()
    }

    pub fn bpm(&self) -> f64 {
        self.transport.bpm()
    }

    pub fn step_duration(&self) -> f64 {
        self.transport.step_duration()
    }

    // ---- Effects ----

    /// Set an effect's wet/dry mix (0 to 100); returns the applied value
    pub fn set_effect_mix(&self, name: &str, value: f32) -> EngineResult<f32> {
        let kind: EffectKind = name.parse()?;
        let mix = self.effects.set_mix(kind, value);
        self.events.send(EngineEvent::EffectChanged { kind, mix });
        Ok(mix)
    }

    /// Enable or bypass an effect; returns the new enabled state
    pub fn toggle_effect(&self, name: &str) -> EngineResult<bool> {
        let kind: EffectKind = name.parse()?;
        let enabled = self.effects.toggle(kind);
        self.events.send(EngineEvent::EffectChanged {
            kind,
            mix: self.effects.unit(kind).mix(),
        });
        Ok(enabled)
    }

    pub fn set_effect_param(&self, name: &str, param: &str, value: f32) -> EngineResult<f32> {
        let kind: EffectKind = name.parse()?;
        self.effects.set_param(kind, param, value)
    }

    pub fn effect(&self, name: &str) -> EngineResult<EffectUnit> {
        let kind: EffectKind = name.parse()?;
        Ok(self.effects.unit(kind))
    }

    pub fn effects(&self) -> Vec<EffectUnit> {
        self.effects.units()
    }
}

impl Drop for DrumEngine {
    fn drop(&mut self) {
        if self.transport.state().is_playing() {
            self.transport.stop();
        }
    }
}
