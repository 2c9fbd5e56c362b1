// AudioSink - Boundary between the engine and whatever renders audio
//
// The engine never touches sample data beyond handing a shared buffer and
// mix settings to the sink. Calls are fire-and-forget: implementations
// must return quickly and never wait on the audio thread.

use super::buffer::AudioBuffer;
use super::status::{AtomicSinkStatus, SinkStatus};
use crate::effects::EffectSend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Sink-assigned voice identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Sink error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    #[error("Audio output not running")]
    Unavailable,

    #[error("Unknown voice {0:?}")]
    UnknownVoice(VoiceId),

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Everything a sink needs to start one voice
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub buffer: Arc<AudioBuffer>,
    /// Linear gain (pad volume x velocity)
    pub gain: f32,
    /// -1.0 (left) to 1.0 (right)
    pub pan: f32,
    /// Playback rate multiplier
    pub rate: f32,
    /// Effect chain snapshot, in processing order
    pub effects: Vec<EffectSend>,
}

impl PlaybackRequest {
    pub fn new(buffer: Arc<AudioBuffer>, gain: f32, pan: f32, rate: f32) -> Self {
        Self {
            buffer,
            gain,
            pan,
            rate,
            effects: Vec::new(),
        }
    }
}

/// Output backend
pub trait AudioSink: Send + Sync {
    /// Allocate a voice slot
    fn attach_voice(&self) -> Result<VoiceId, SinkError>;

    /// Start playing `request` on `voice`, replacing whatever it played
    fn schedule_buffer(&self, voice: VoiceId, request: PlaybackRequest) -> Result<(), SinkError>;

    /// Silence a voice; unknown voices are ignored
    fn stop_voice(&self, voice: VoiceId);

    fn status(&self) -> SinkStatus;
}

/// Sink that accepts everything and renders nothing
#[derive(Debug, Default)]
pub struct NullSink {
    next_voice: AtomicU64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for NullSink {
    fn attach_voice(&self) -> Result<VoiceId, SinkError> {
        Ok(VoiceId(self.next_voice.fetch_add(1, Ordering::Relaxed)))
    }

    fn schedule_buffer(&self, _voice: VoiceId, _request: PlaybackRequest) -> Result<(), SinkError> {
        Ok(())
    }

    fn stop_voice(&self, _voice: VoiceId) {}

    fn status(&self) -> SinkStatus {
        SinkStatus::Running
    }
}

/// One recorded sink interaction
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Attach(VoiceId),
    Schedule(VoiceId, PlaybackRequest),
    Stop(VoiceId),
}

/// Sink that records every call, for tests and offline inspection
///
/// While its status is not `Running`, attach and schedule fail with
/// `SinkError::Unavailable`, which lets callers simulate a dead backend.
#[derive(Debug)]
pub struct MemorySink {
    calls: Mutex<Vec<SinkCall>>,
    next_voice: AtomicU64,
    status: AtomicSinkStatus,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_voice: AtomicU64::new(0),
            status: AtomicSinkStatus::new(SinkStatus::Running),
        }
    }

    pub fn set_status(&self, status: SinkStatus) {
        self.status.set(status);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scheduled requests in call order
    pub fn scheduled(&self) -> Vec<(VoiceId, PlaybackRequest)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Schedule(voice, request) => Some((voice, request)),
                _ => None,
            })
            .collect()
    }

    pub fn stopped(&self) -> Vec<VoiceId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Stop(voice) => Some(voice),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: SinkCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for MemorySink {
    fn attach_voice(&self) -> Result<VoiceId, SinkError> {
        if !self.status.get().is_running() {
            return Err(SinkError::Unavailable);
        }
        let voice = VoiceId(self.next_voice.fetch_add(1, Ordering::Relaxed));
        self.record(SinkCall::Attach(voice));
        Ok(voice)
    }

    fn schedule_buffer(&self, voice: VoiceId, request: PlaybackRequest) -> Result<(), SinkError> {
        if !self.status.get().is_running() {
            return Err(SinkError::Unavailable);
        }
        self.record(SinkCall::Schedule(voice, request));
        Ok(())
    }

    fn stop_voice(&self, voice: VoiceId) {
        self.record(SinkCall::Stop(voice));
    }

    fn status(&self) -> SinkStatus {
        self.status.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PlaybackRequest {
        PlaybackRequest::new(Arc::new(AudioBuffer::silence(44100, 1, 8)), 0.5, 0.0, 1.0)
    }

    #[test]
    fn test_memory_sink_records_calls() {
        let sink = MemorySink::new();
        let voice = sink.attach_voice().unwrap();
        sink.schedule_buffer(voice, request()).unwrap();
        sink.stop_voice(voice);

        let calls = sink.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], SinkCall::Attach(voice));
        assert_eq!(sink.scheduled().len(), 1);
        assert_eq!(sink.stopped(), vec![voice]);
    }

    #[test]
    fn test_memory_sink_failure_mode() {
        let sink = MemorySink::new();
        let voice = sink.attach_voice().unwrap();
        sink.set_status(SinkStatus::Failed);

        assert_eq!(sink.attach_voice(), Err(SinkError::Unavailable));
        assert_eq!(sink.schedule_buffer(voice, request()), Err(SinkError::Unavailable));

        sink.set_status(SinkStatus::Running);
        assert!(sink.schedule_buffer(voice, request()).is_ok());
    }

    #[test]
    fn test_null_sink_hands_out_distinct_voices() {
        let sink = NullSink::new();
        let a = sink.attach_voice().unwrap();
        let b = sink.attach_voice().unwrap();
        assert_ne!(a, b);
        assert!(sink.status().is_running());
    }
}
