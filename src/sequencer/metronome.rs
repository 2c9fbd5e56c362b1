// Metronome - Click track on quarter notes
// Clicks are rendered once at construction and played on a dedicated sink voice

use crate::audio::buffer::AudioBuffer;
use crate::audio::sink::{AudioSink, PlaybackRequest, VoiceId};
use crate::config::STEPS_PER_BEAT;
use log::trace;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on first beat of bar (accent/downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

/// Pre-rendered click sounds
#[derive(Debug, Clone)]
pub struct MetronomeSound {
    accent: Arc<AudioBuffer>,
    regular: Arc<AudioBuffer>,
}

impl MetronomeSound {
    const CLICK_DURATION_MS: f32 = 50.0;
    const SAMPLE_RATE: u32 = 44100;

    pub fn new() -> Self {
        Self {
            accent: Arc::new(Self::generate_click(1500.0, 0.6)),
            regular: Arc::new(Self::generate_click(1000.0, 0.4)),
        }
    }

    /// Sine burst with a linear decay envelope
    fn generate_click(frequency: f32, amplitude: f32) -> AudioBuffer {
        let sample_rate = Self::SAMPLE_RATE as f32;
        let num_samples = ((Self::CLICK_DURATION_MS / 1000.0) * sample_rate) as usize;
        let phase_increment = 2.0 * PI * frequency / sample_rate;

        let samples = (0..num_samples)
            .map(|i| {
                let envelope = 1.0 - i as f32 / num_samples as f32;
                (i as f32 * phase_increment).sin() * envelope * amplitude
            })
            .collect();

        AudioBuffer::new(samples, 1, Self::SAMPLE_RATE)
    }

    pub fn get_click(&self, click_type: ClickType) -> Arc<AudioBuffer> {
        match click_type {
            ClickType::Accent => Arc::clone(&self.accent),
            ClickType::Regular => Arc::clone(&self.regular),
        }
    }
}

impl Default for MetronomeSound {
    fn default() -> Self {
        Self::new()
    }
}

/// Quarter-note click, independent of pattern content
pub struct Metronome {
    sound: MetronomeSound,
    enabled: AtomicBool,
    steps_per_bar: usize,
    voice: Mutex<Option<VoiceId>>,
}

impl Metronome {
    pub fn new(enabled: bool, beats_per_bar: usize) -> Self {
        Self {
            sound: MetronomeSound::new(),
            enabled: AtomicBool::new(enabled),
            steps_per_bar: beats_per_bar.max(1) * STEPS_PER_BEAT,
            voice: Mutex::new(None),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Click type for `step`, or None between beats
    pub fn click_for_step(&self, step: usize) -> Option<ClickType> {
        if step % STEPS_PER_BEAT != 0 {
            return None;
        }
        if step % self.steps_per_bar == 0 {
            Some(ClickType::Accent)
        } else {
            Some(ClickType::Regular)
        }
    }

    /// Play the click for `step` if enabled and on a beat
    /// Returns the click played
    pub fn tick(&self, step: usize, sink: &dyn AudioSink) -> Option<ClickType> {
        if !self.is_enabled() {
            return None;
        }
        let click = self.click_for_step(step)?;

        let mut slot = self.voice.lock().unwrap_or_else(PoisonError::into_inner);
        let voice = match *slot {
            Some(voice) => voice,
            None => match sink.attach_voice() {
                Ok(voice) => {
                    *slot = Some(voice);
                    voice
                }
                Err(e) => {
                    trace!("Metronome click skipped: {}", e);
                    return None;
                }
            },
        };

        let request = PlaybackRequest::new(self.sound.get_click(click), 1.0, 0.0, 1.0);
        if let Err(e) = sink.schedule_buffer(voice, request) {
            trace!("Metronome click skipped: {}", e);
            *slot = None;
            return None;
        }
        Some(click)
    }

    /// Silence a sounding click
    pub fn stop(&self, sink: &dyn AudioSink) {
        if let Some(voice) = *self.voice.lock().unwrap_or_else(PoisonError::into_inner) {
            sink.stop_voice(voice);
        }
    }
}
