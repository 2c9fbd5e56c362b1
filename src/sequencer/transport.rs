// Transport - Playback control and the sequencer tick
// Controls play/stop/record state and drives the step playhead
//
// Control calls (play, stop, toggle_recording, set_tempo) are serialized by
// the schedule-handle lock. The tick never takes that lock: it only reads
// the atomics in `SharedTransportState` and the owning components' APIs,
// so `stop()` can join an in-flight tick without deadlocking.
//
// Live hits are placed by the playhead: every tick marks the step it played
// and when, and a hit lands at that step plus the elapsed fraction of the
// current step interval.

use super::clock::Clock;
use super::metronome::Metronome;
use super::pattern::Pattern;
use super::recorder::Recorder;
use super::scheduler::{ScheduleHandle, Scheduler};
use super::store::PatternStore;
use super::timeline::Tempo;
use crate::audio::sink::AudioSink;
use crate::error::EngineResult;
use crate::messaging::{EngineEvent, EventSender};
use crate::pads::PadRegistry;
use log::{debug, info, trace};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Transport state (play/stop/record)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    /// Always also playing
    Recording,
}

impl TransportState {
    /// Check if transport is in a playing state (Playing or Recording)
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing | TransportState::Recording)
    }

    /// Check if transport is recording
    pub fn is_recording(&self) -> bool {
        matches!(self, TransportState::Recording)
    }
}

/// Last step the playhead sounded, and when
#[derive(Debug, Clone, Copy, Default)]
struct Playhead {
    step: f64,
    at: Duration,
}

/// Shared transport state
/// Thread-safe via atomics for communication with the tick thread
#[derive(Debug)]
pub struct SharedTransportState {
    playing: AtomicBool,
    recording: AtomicBool,
    current_step: AtomicUsize,
    bpm_bits: AtomicU64,
    playhead: Mutex<Playhead>,
}

impl SharedTransportState {
    pub fn new(tempo: Tempo) -> Arc<Self> {
        Arc::new(Self {
            playing: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            current_step: AtomicUsize::new(0),
            bpm_bits: AtomicU64::new(tempo.bpm().to_bits()),
            playhead: Mutex::new(Playhead::default()),
        })
    }

    /// Get current transport state
    pub fn state(&self) -> TransportState {
        if !self.playing.load(Ordering::Acquire) {
            TransportState::Stopped
        } else if self.recording.load(Ordering::Acquire) {
            TransportState::Recording
        } else {
            TransportState::Playing
        }
    }

    /// Step the next tick will play
    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::Acquire)
    }

    pub fn bpm(&self) -> f64 {
        f64::from_bits(self.bpm_bits.load(Ordering::Acquire))
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.bpm()).unwrap_or_default()
    }

    /// Playhead position in steps at `now`, unwrapped
    ///
    /// May run slightly past the pattern end or below 0 around the loop
    /// point; merging wraps it back in.
    pub fn position_at(&self, now: Duration) -> f64 {
        let playhead = self.lock_playhead();
        let elapsed = now.saturating_sub(playhead.at).as_secs_f64();
        playhead.step + elapsed / self.tempo().step_duration_seconds()
    }

    fn lock_playhead(&self) -> MutexGuard<'_, Playhead> {
        self.playhead.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_step(&self, step: usize, at: Duration) {
        *self.lock_playhead() = Playhead {
            step: step as f64,
            at,
        };
    }

    /// Switch tempo; while playing the next step is one new interval away,
    /// so the playhead restarts the current interval from `now`
    fn retime(&self, tempo: Tempo, now: Duration) {
        let mut playhead = self.lock_playhead();
        self.bpm_bits.store(tempo.bpm().to_bits(), Ordering::Release);
        if self.playing.load(Ordering::Acquire) {
            *playhead = Playhead {
                step: self.current_step() as f64 - 1.0,
                at: now,
            };
        }
    }
}

/// Everything a tick reads
struct TickContext {
    shared: Arc<SharedTransportState>,
    store: Arc<PatternStore>,
    pads: Arc<PadRegistry>,
    sink: Arc<dyn AudioSink>,
    metronome: Arc<Metronome>,
    clock: Arc<dyn Clock>,
    events: EventSender,
    hit_tolerance_secs: f64,
    default_velocity: f32,
}

impl TickContext {
    /// Play the current step and advance the playhead
    fn tick(&self) {
        if !self.shared.playing.load(Ordering::Acquire) {
            return;
        }

        // Pattern swaps only happen here, between two steps
        if let Some(index) = self.store.commit_pending() {
            debug!("Pattern {} now current", index);
            self.events.send(EngineEvent::PatternSelected(index));
        }

        let steps = self.store.steps();
        let step = self.shared.current_step() % steps;
        self.shared.mark_step(step, self.clock.now());

        // Ticks are inert while the output is down
        if self.sink.status().is_running() {
            let audible = self.pads.audibility();
            let tolerance = self.hit_tolerance_secs / self.shared.tempo().step_duration_seconds();
            let triggers: Vec<(usize, f32)> = self.store.with_current(|pattern| match pattern {
                Pattern::Grid(grid) => grid
                    .pads_at(step)
                    .filter(|&pad| audible[pad])
                    .map(|pad| (pad, self.default_velocity))
                    .collect(),
                Pattern::Hits(hits) => hits
                    .hits_near(step as f64, tolerance)
                    .filter(|hit| audible.get(hit.pad).copied().unwrap_or(false))
                    .map(|hit| (hit.pad, hit.velocity))
                    .collect(),
            });

            for (pad, velocity) in triggers {
                match self.pads.trigger(pad, velocity) {
                    Ok(outcome) => trace!("Step {} pad {}: {:?}", step, pad, outcome),
                    Err(e) => trace!("Step {} pad {} skipped: {}", step, pad, e),
                }
            }

            self.metronome.tick(step, self.sink.as_ref());
        }

        self.events.send(EngineEvent::StepAdvanced(step));
        self.shared
            .current_step
            .store((step + 1) % steps, Ordering::Release);
    }
}

/// Transport controller
/// Owns play/stop/record state and the periodic tick schedule
pub struct Transport {
    shared: Arc<SharedTransportState>,
    ctx: Arc<TickContext>,
    recorder: Arc<Recorder>,
    scheduler: Arc<dyn Scheduler>,
    handle: Mutex<Option<Box<dyn ScheduleHandle>>>,
    quantize: AtomicBool,
}

/// Collaborators of a transport
pub struct TransportParts {
    pub store: Arc<PatternStore>,
    pub pads: Arc<PadRegistry>,
    pub sink: Arc<dyn AudioSink>,
    pub recorder: Arc<Recorder>,
    pub metronome: Arc<Metronome>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub events: EventSender,
}

impl Transport {
    pub fn new(parts: TransportParts, tempo: Tempo, hit_tolerance_ms: f64, quantize: bool) -> Self {
        let shared = SharedTransportState::new(tempo);
        let ctx = Arc::new(TickContext {
            shared: Arc::clone(&shared),
            default_velocity: parts.store.default_velocity(),
            store: parts.store,
            pads: parts.pads,
            sink: parts.sink,
            metronome: parts.metronome,
            clock: parts.clock,
            events: parts.events,
            hit_tolerance_secs: hit_tolerance_ms / 1000.0,
        });

        Self {
            shared,
            ctx,
            recorder: parts.recorder,
            scheduler: parts.scheduler,
            handle: Mutex::new(None),
            quantize: AtomicBool::new(quantize),
        }
    }

    pub fn state(&self) -> TransportState {
        self.shared.state()
    }

    pub fn current_step(&self) -> usize {
        self.shared.current_step()
    }

    pub fn bpm(&self) -> f64 {
        self.shared.bpm()
    }

    /// Seconds per step at the current tempo
    pub fn step_duration(&self) -> f64 {
        self.shared.tempo().step_duration_seconds()
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    pub fn set_quantize(&self, enabled: bool) {
        self.quantize.store(enabled, Ordering::Relaxed);
    }

    pub fn quantize(&self) -> bool {
        self.quantize.load(Ordering::Relaxed)
    }

    pub fn set_metronome(&self, enabled: bool) {
        self.ctx.metronome.set_enabled(enabled);
    }

    pub fn metronome_enabled(&self) -> bool {
        self.ctx.metronome.is_enabled()
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<Box<dyn ScheduleHandle>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_tick(handle: &mut Option<Box<dyn ScheduleHandle>>) {
        if let Some(mut running) = handle.take() {
            running.cancel();
        }
    }

    fn schedule_tick(&self, handle: &mut Option<Box<dyn ScheduleHandle>>) -> EngineResult<()> {
        let ctx = Arc::clone(&self.ctx);
        let interval = self.shared.tempo().step_interval();
        *handle = Some(
            self.scheduler
                .schedule_repeating(interval, Box::new(move || ctx.tick()))?,
        );
        Ok(())
    }

    fn emit_state(&self) {
        self.ctx
            .events
            .send(EngineEvent::TransportChanged(self.state()));
    }

    /// Start (or restart) playback from step 0
    ///
    /// Step 0 plays immediately; the following steps follow at the step
    /// interval. Recording, if on, stays on and later hits are placed
    /// against the restarted playhead.
    pub fn play(&self) -> EngineResult<()> {
        let mut handle = self.lock_handle();
        self.play_locked(&mut handle)
    }

    fn play_locked(&self, handle: &mut Option<Box<dyn ScheduleHandle>>) -> EngineResult<()> {
        Self::cancel_tick(handle);

        self.shared.current_step.store(0, Ordering::Release);
        self.shared.playing.store(true, Ordering::Release);
        self.ctx.store.set_live(true);

        if let Err(e) = self.schedule_tick(handle) {
            self.shared.playing.store(false, Ordering::Release);
            self.shared.recording.store(false, Ordering::Release);
            self.ctx.store.set_live(false);
            return Err(e);
        }

        info!("Transport playing at {} BPM", self.bpm());
        self.emit_state();
        self.ctx.tick();
        Ok(())
    }

    /// Stop playback
    ///
    /// Synchronous: when this returns the tick is cancelled and will not
    /// run again, every voice has been stopped, pending recorded hits are
    /// merged, and the playhead is back at step 0.
    pub fn stop(&self) {
        let mut handle = self.lock_handle();
        Self::cancel_tick(&mut handle);

        self.shared.playing.store(false, Ordering::Release);
        self.shared.recording.store(false, Ordering::Release);

        self.ctx.pads.panic();
        self.ctx.metronome.stop(self.ctx.sink.as_ref());

        self.merge_recording();

        self.shared.current_step.store(0, Ordering::Release);
        self.ctx.store.set_live(false);
        info!("Transport stopped");
        self.emit_state();
    }

    /// Toggle recording; turning it on while stopped starts playback
    pub fn toggle_recording(&self) -> EngineResult<TransportState> {
        let mut handle = self.lock_handle();

        if self.recorder.is_recording() {
            self.shared.recording.store(false, Ordering::Release);
            self.merge_recording();
            info!("Recording off");
        } else {
            self.shared.recording.store(true, Ordering::Release);
            if !self.shared.playing.load(Ordering::Acquire) {
                self.play_locked(&mut handle)?;
            }
            self.recorder.start();
            info!("Recording on at step {}", self.current_step());
        }

        self.emit_state();
        Ok(self.state())
    }

    /// Change tempo; while playing the tick is rescheduled at the new
    /// interval and the playhead keeps its step
    pub fn set_tempo(&self, bpm: f64) -> EngineResult<()> {
        let tempo = Tempo::new(bpm)?;
        let mut handle = self.lock_handle();

        self.shared.retime(tempo, self.ctx.clock.now());
        if self.shared.playing.load(Ordering::Acquire) {
            Self::cancel_tick(&mut handle);
            self.schedule_tick(&mut handle)?;
        }

        debug!("Tempo set to {} BPM", bpm);
        self.ctx.events.send(EngineEvent::TempoChanged(bpm));
        Ok(())
    }

    /// Capture a live hit at the playhead if recording
    pub fn capture_hit(&self, pad: usize, velocity: f32) -> bool {
        if !self.recorder.is_recording() {
            return false;
        }
        let position = self.shared.position_at(self.ctx.clock.now());
        self.recorder.capture_hit(pad, velocity, position)
    }

    fn merge_recording(&self) {
        if !self.recorder.is_recording() {
            return;
        }
        let hits = self
            .recorder
            .stop(&self.ctx.store, self.quantize());
        let pattern = self.ctx.store.current_index();
        self.ctx
            .events
            .send(EngineEvent::RecordingMerged { pattern, hits });
        if hits > 0 {
            self.ctx.events.send(EngineEvent::PatternEdited(pattern));
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        Self::cancel_tick(&mut self.lock_handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::AudioBuffer;
    use crate::audio::repository::InMemorySampleRepository;
    use crate::audio::sink::MemorySink;
    use crate::config::EngineConfig;
    use crate::effects::EffectsBus;
    use crate::sequencer::clock::ManualClock;
    use crate::sequencer::scheduler::ManualScheduler;
    use std::time::Duration;

    struct Rig {
        transport: Transport,
        store: Arc<PatternStore>,
        pads: Arc<PadRegistry>,
        sink: Arc<MemorySink>,
        scheduler: ManualScheduler,
    }

    fn rig(config: EngineConfig) -> Rig {
        let clock = ManualClock::new();
        let scheduler = ManualScheduler::new(clock.clone());
        let sink = Arc::new(MemorySink::new());
        let repo = Arc::new(InMemorySampleRepository::new());
        let events = EventSender::new(64);
        let pads = Arc::new(PadRegistry::new(
            sink.clone(),
            repo.clone(),
            Arc::new(EffectsBus::new()),
            Arc::new(clock.clone()),
            Duration::from_millis(100),
            events.clone(),
        ));
        for pad in 0..16 {
            let sample = repo.insert(format!("pad{}", pad), AudioBuffer::silence(44100, 1, 64));
            pads.assign_sample(pad, sample);
        }
        let store = Arc::new(PatternStore::new(&config));
        let transport = Transport::new(
            TransportParts {
                store: store.clone(),
                pads: pads.clone(),
                sink: sink.clone(),
                recorder: Arc::new(Recorder::new(64)),
                metronome: Arc::new(Metronome::new(false, 4)),
                scheduler: Arc::new(scheduler.clone()),
                clock: Arc::new(clock),
                events,
            },
            Tempo::new(config.initial_bpm).unwrap(),
            config.hit_tolerance_ms,
            config.quantize,
        );
        Rig {
            transport,
            store,
            pads,
            sink,
            scheduler,
        }
    }

    fn scheduled_count(sink: &MemorySink) -> usize {
        sink.scheduled().len()
    }

    #[test]
    fn test_initial_state() {
        let r = rig(EngineConfig::default());
        assert_eq!(r.transport.state(), TransportState::Stopped);
        assert_eq!(r.transport.current_step(), 0);
        assert_eq!(r.transport.bpm(), 120.0);
        assert_eq!(r.transport.step_duration(), 0.125);
    }

    #[test]
    fn test_play_fires_step_zero_and_advances() {
        let r = rig(EngineConfig::default());
        r.store.toggle_step(0, 0, 0).unwrap();
        r.store.toggle_step(0, 1, 2).unwrap();

        r.transport.play().unwrap();
        assert_eq!(r.transport.state(), TransportState::Playing);
        assert_eq!(r.transport.current_step(), 1);
        assert_eq!(scheduled_count(&r.sink), 1);

        r.scheduler.advance(Duration::from_millis(125));
        assert_eq!(r.transport.current_step(), 2);
        assert_eq!(scheduled_count(&r.sink), 1);

        r.scheduler.advance(Duration::from_millis(125));
        assert_eq!(r.transport.current_step(), 3);
        assert_eq!(scheduled_count(&r.sink), 2);
    }

    #[test]
    fn test_step_wraps_after_pattern() {
        let r = rig(EngineConfig::default());
        r.transport.play().unwrap();
        r.scheduler.advance(Duration::from_millis(125 * 15));
        assert_eq!(r.transport.current_step(), 0);
    }

    #[test]
    fn test_stop_cancels_and_resets() {
        let r = rig(EngineConfig::default());
        r.store.toggle_step(0, 0, 0).unwrap();
        r.transport.play().unwrap();
        r.scheduler.advance(Duration::from_millis(125 * 5));
        assert_eq!(r.transport.current_step(), 6);

        r.transport.stop();
        assert_eq!(r.transport.state(), TransportState::Stopped);
        assert_eq!(r.transport.current_step(), 0);
        assert_eq!(r.scheduler.active_schedules(), 0);
        assert!(!r.sink.stopped().is_empty());

        let before = r.sink.calls().len();
        r.scheduler.advance(Duration::from_secs(2));
        assert_eq!(r.sink.calls().len(), before);
    }

    #[test]
    fn test_set_tempo_reschedules_keeping_step() {
        let r = rig(EngineConfig::default());
        r.transport.play().unwrap();
        r.scheduler.advance(Duration::from_millis(250));
        assert_eq!(r.transport.current_step(), 3);

        r.transport.set_tempo(60.0).unwrap();
        assert_eq!(r.transport.current_step(), 3);
        assert_eq!(r.scheduler.active_schedules(), 1);
        assert_eq!(r.scheduler.current_interval(), Some(Duration::from_millis(250)));

        r.scheduler.advance(Duration::from_millis(249));
        assert_eq!(r.transport.current_step(), 3);
        r.scheduler.advance(Duration::from_millis(1));
        assert_eq!(r.transport.current_step(), 4);
    }

    #[test]
    fn test_set_tempo_rejects_out_of_range() {
        let r = rig(EngineConfig::default());
        assert!(r.transport.set_tempo(10.0).is_err());
        assert!(r.transport.set_tempo(301.0).is_err());
        assert_eq!(r.transport.bpm(), 120.0);
    }

    #[test]
    fn test_toggle_recording_starts_playback() {
        let r = rig(EngineConfig::default());
        assert_eq!(r.transport.toggle_recording().unwrap(), TransportState::Recording);
        assert!(r.transport.state().is_playing());
        assert!(r.transport.recorder().is_recording());

        assert_eq!(r.transport.toggle_recording().unwrap(), TransportState::Playing);
        assert!(!r.transport.recorder().is_recording());
    }

    #[test]
    fn test_recorded_hit_merges_on_stop() {
        let r = rig(EngineConfig::default());
        r.transport.toggle_recording().unwrap();
        r.scheduler.advance(Duration::from_millis(490));
        assert!(r.transport.capture_hit(3, 1.0));

        r.transport.stop();
        assert!(r.store.pattern(0).unwrap().is_step_active(3, 4));
        assert!(!r.transport.recorder().is_recording());
    }

    #[test]
    fn test_recording_armed_mid_pattern_writes_at_playhead() {
        let r = rig(EngineConfig::default());
        r.transport.play().unwrap();
        r.scheduler.advance(Duration::from_millis(875));

        assert_eq!(r.transport.toggle_recording().unwrap(), TransportState::Recording);
        assert!(r.transport.capture_hit(3, 1.0));
        r.scheduler.advance(Duration::from_millis(130));
        assert!(r.transport.capture_hit(4, 1.0));
        r.transport.stop();

        let pattern = r.store.pattern(0).unwrap();
        assert!(pattern.is_step_active(3, 7));
        assert!(pattern.is_step_active(4, 8));
        assert_eq!(pattern.active_count(), 2);
    }

    #[test]
    fn test_tempo_change_keeps_recorded_positions() {
        let r = rig(EngineConfig::default());
        r.transport.toggle_recording().unwrap();
        r.scheduler.advance(Duration::from_secs(1));
        r.transport.capture_hit(5, 1.0);

        r.transport.set_tempo(60.0).unwrap();
        r.scheduler.advance(Duration::from_millis(200));
        r.transport.capture_hit(6, 1.0);
        r.transport.stop();

        let pattern = r.store.pattern(0).unwrap();
        assert!(pattern.is_step_active(5, 8));
        assert!(pattern.is_step_active(6, 9));
        assert_eq!(pattern.active_count(), 2);
    }

    #[test]
    fn test_replay_while_recording_restarts_positions() {
        let r = rig(EngineConfig::default());
        r.transport.toggle_recording().unwrap();
        r.scheduler.advance(Duration::from_millis(500));

        r.transport.play().unwrap();
        assert_eq!(r.transport.state(), TransportState::Recording);
        r.scheduler.advance(Duration::from_millis(250));
        r.transport.capture_hit(2, 1.0);
        r.transport.stop();

        assert!(r.store.pattern(0).unwrap().is_step_active(2, 2));
    }

    #[test]
    fn test_hit_just_before_loop_point_wraps_to_step_0() {
        let r = rig(EngineConfig::default());
        r.transport.toggle_recording().unwrap();
        r.scheduler.advance(Duration::from_millis(1990));
        r.transport.capture_hit(1, 1.0);
        r.transport.stop();

        let pattern = r.store.pattern(0).unwrap();
        assert!(pattern.is_step_active(1, 0));
        assert_eq!(pattern.active_count(), 1);
    }

    #[test]
    fn test_muted_pad_skipped_by_sequencer() {
        let r = rig(EngineConfig::default());
        r.store.toggle_step(0, 0, 0).unwrap();
        r.store.toggle_step(0, 1, 0).unwrap();
        r.pads.set_muted(1, true).unwrap();

        r.transport.play().unwrap();
        assert_eq!(r.sink.scheduled().len(), 1);
    }

    #[test]
    fn test_pattern_switch_waits_for_tick() {
        let r = rig(EngineConfig::default());
        r.store.toggle_step(1, 5, 1).unwrap();
        r.transport.play().unwrap();

        r.store.select_current(1).unwrap();
        assert_eq!(r.store.current_index(), 0);

        r.scheduler.advance(Duration::from_millis(125));
        assert_eq!(r.store.current_index(), 1);
        assert_eq!(r.sink.scheduled().len(), 1);
    }

    #[test]
    fn test_hits_mode_triggers_within_tolerance() {
        let r = rig(EngineConfig::hits());
        r.store.merge_hits(
            &[
                crate::sequencer::store::StepHit { pad: 2, velocity: 0.5, position: 1.0 },
                crate::sequencer::store::StepHit { pad: 3, velocity: 0.5, position: 2.5 },
            ],
            false,
        );

        r.transport.play().unwrap();
        assert!(r.sink.scheduled().is_empty());

        r.scheduler.advance(Duration::from_millis(125));
        let scheduled = r.sink.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].1.gain, 0.8 * 0.5);

        r.scheduler.advance(Duration::from_millis(250));
        assert_eq!(r.sink.scheduled().len(), 1);
    }

    #[test]
    fn test_failed_sink_makes_ticks_inert() {
        let r = rig(EngineConfig::default());
        r.store.toggle_step(0, 0, 1).unwrap();
        r.sink.set_status(crate::audio::status::SinkStatus::Failed);

        r.transport.play().unwrap();
        r.scheduler.advance(Duration::from_millis(125));
        assert!(r.sink.scheduled().is_empty());
        assert_eq!(r.transport.current_step(), 2);

        r.sink.set_status(crate::audio::status::SinkStatus::Running);
        r.scheduler.advance(Duration::from_millis(125 * 16));
        assert_eq!(r.sink.scheduled().len(), 1);
    }

    #[test]
    fn test_metronome_clicks_on_beats() {
        let r = rig(EngineConfig::default());
        r.transport.set_metronome(true);
        assert!(r.transport.metronome_enabled());

        r.transport.play().unwrap();
        assert_eq!(scheduled_count(&r.sink), 1);

        r.scheduler.advance_ticks(3);
        assert_eq!(scheduled_count(&r.sink), 1);
        r.scheduler.advance_ticks(1);
        assert_eq!(scheduled_count(&r.sink), 2);

        r.transport.set_metronome(false);
        r.scheduler.advance_ticks(4);
        assert_eq!(scheduled_count(&r.sink), 2);
    }

    #[test]
    fn test_unquantized_take_keeps_offsets() {
        let r = rig(EngineConfig::hits());
        r.transport.set_quantize(false);
        assert!(!r.transport.quantize());

        r.transport.toggle_recording().unwrap();
        r.scheduler.advance(Duration::from_millis(260));
        r.transport.capture_hit(4, 1.0);
        r.transport.stop();

        let Pattern::Hits(hits) = r.store.pattern(0).unwrap() else {
            panic!("expected hit pattern");
        };
        assert_eq!(hits.len(), 1);
        assert!((hits.hits()[0].position - 2.08).abs() < 1e-9);
    }
}
