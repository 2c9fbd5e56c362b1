// DeviceSink - Pad voices rendered to the default output device (cpal)
//
// # Stream ownership
// cpal streams are not Send on every platform, so the stream lives on a
// dedicated "padgroove-audio" thread for the lifetime of the sink. The sink
// talks to the audio callback through a lock-free ring buffer of mixer
// commands; the callback owns all voice state.

use super::sink::{AudioSink, PlaybackRequest, SinkError, VoiceId};
use super::status::{AtomicSinkStatus, SinkStatus};
use crate::effects::{EffectKind, EffectSend};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info, warn};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

const COMMAND_CAPACITY: usize = 256;
const MAX_VOICES: usize = 32;

enum MixerCommand {
    Play(VoiceId, PlaybackRequest),
    Stop(VoiceId),
}

/// Per-voice playback state owned by the audio callback
struct ActiveVoice {
    id: VoiceId,
    request: PlaybackRequest,
    position: f64,
    step: f64,
    left_gain: f32,
    right_gain: f32,
    drive: Option<(f32, f32)>,
    lowpass: Option<(f32, f32)>,
    lowpass_state: (f32, f32),
}

impl ActiveVoice {
    fn new(id: VoiceId, request: PlaybackRequest, output_rate: f32) -> Self {
        // Equal-power pan law
        let angle = (request.pan.clamp(-1.0, 1.0) * 0.5 + 0.5) * FRAC_PI_2;
        let step = request.rate as f64 * request.buffer.sample_rate() as f64 / output_rate as f64;

        // TODO: render the delay and reverb sends once the mixer has shared
        // delay lines; they are passed through untouched for now
        let drive = active_send(&request.effects, EffectKind::Distortion).map(|send| {
            let pre_gain_db = send.param("pre_gain").unwrap_or(-6.0);
            (10_f32.powf((pre_gain_db + 20.0) / 20.0), send.wet())
        });
        let lowpass = active_send(&request.effects, EffectKind::Filter).map(|send| {
            let cutoff = send.param("cutoff").unwrap_or(20000.0);
            ((-2.0 * PI * cutoff / output_rate).exp(), send.wet())
        });

        Self {
            id,
            left_gain: request.gain * angle.cos(),
            right_gain: request.gain * angle.sin(),
            request,
            position: 0.0,
            step,
            drive,
            lowpass,
            lowpass_state: (0.0, 0.0),
        }
    }

    fn is_finished(&self) -> bool {
        self.position as usize >= self.request.buffer.frames()
    }

    fn next_frame(&mut self) -> (f32, f32) {
        let (mut l, mut r) = self.request.buffer.stereo_frame(self.position as usize);
        self.position += self.step;

        if let Some((drive, wet)) = self.drive {
            l = l * (1.0 - wet) + (l * drive).tanh() * wet;
            r = r * (1.0 - wet) + (r * drive).tanh() * wet;
        }
        if let Some((coeff, wet)) = self.lowpass {
            let (pl, pr) = self.lowpass_state;
            let fl = (1.0 - coeff) * l + coeff * pl;
            let fr = (1.0 - coeff) * r + coeff * pr;
            self.lowpass_state = (fl, fr);
            l = l * (1.0 - wet) + fl * wet;
            r = r * (1.0 - wet) + fr * wet;
        }

        (l * self.left_gain, r * self.right_gain)
    }
}

fn active_send(effects: &[EffectSend], kind: EffectKind) -> Option<&EffectSend> {
    effects.iter().find(|e| e.kind == kind && !e.is_bypassed())
}

/// Voice mixer driven by the cpal callback
struct Mixer {
    commands: HeapCons<MixerCommand>,
    voices: Vec<ActiveVoice>,
    output_rate: f32,
}

impl Mixer {
    fn drain_commands(&mut self) {
        while let Some(command) = self.commands.try_pop() {
            match command {
                MixerCommand::Play(id, request) => {
                    self.voices.retain(|v| v.id != id);
                    if self.voices.len() >= MAX_VOICES {
                        // Steal the oldest voice
                        self.voices.remove(0);
                    }
                    self.voices.push(ActiveVoice::new(id, request, self.output_rate));
                }
                MixerCommand::Stop(id) => self.voices.retain(|v| v.id != id),
            }
        }
    }

    fn render<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        self.drain_commands();

        for frame in data.chunks_mut(channels) {
            let (mut left, mut right) = (0.0_f32, 0.0_f32);
            for voice in self.voices.iter_mut() {
                let (l, r) = voice.next_frame();
                left += l;
                right += r;
            }

            let left = left.clamp(-1.0, 1.0);
            let right = right.clamp(-1.0, 1.0);
            for (i, sample) in frame.iter_mut().enumerate() {
                let value = match i {
                    0 => left,
                    1 => right,
                    _ => 0.0,
                };
                *sample = T::from_sample(if channels == 1 { (left + right) * 0.5 } else { value });
            }
        }

        self.voices.retain(|v| !v.is_finished());
    }
}

/// Output sink playing through the default cpal device
pub struct DeviceSink {
    commands: Arc<Mutex<HeapProd<MixerCommand>>>,
    status: AtomicSinkStatus,
    next_voice: AtomicU64,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceSink {
    /// Open the default output device and start its stream
    pub fn open() -> Result<Self, SinkError> {
        let (producer, consumer) = HeapRb::<MixerCommand>::new(COMMAND_CAPACITY).split();
        let status = AtomicSinkStatus::new(SinkStatus::Starting);
        let status_clone = status.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), SinkError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("padgroove-audio".into())
            .spawn(move || {
                let stream = match Self::start_stream(consumer, status_clone.clone()) {
                    Ok(stream) => stream,
                    Err(e) => {
                        status_clone.set(SinkStatus::Failed);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                status_clone.set(SinkStatus::Running);
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive until the sink is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| SinkError::Stream(format!("failed to spawn audio thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(SinkError::Stream("audio thread exited during start".into()));
            }
        }

        Ok(Self {
            commands: Arc::new(Mutex::new(producer)),
            status,
            next_voice: AtomicU64::new(0),
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn start_stream(
        consumer: HeapCons<MixerCommand>,
        status: AtomicSinkStatus,
    ) -> Result<Stream, SinkError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SinkError::Stream("No audio device found".into()))?;
        info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| SinkError::Stream(format!("Configuration error: {}", e)))?;
        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();

        let mixer = Mixer {
            commands: consumer,
            voices: Vec::with_capacity(MAX_VOICES),
            output_rate: config.sample_rate.0 as f32,
        };

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, mixer, status),
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, mixer, status),
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, mixer, status),
            other => {
                return Err(SinkError::Stream(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        }?;

        stream
            .play()
            .map_err(|e| SinkError::Stream(format!("Failed to start stream: {}", e)))?;
        Ok(stream)
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut mixer: Mixer,
        status: AtomicSinkStatus,
    ) -> Result<Stream, SinkError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = config.channels as usize;
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    mixer.render(data, channels);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    status.set(SinkStatus::Failed);
                },
                None,
            )
            .map_err(|e| SinkError::Stream(format!("Failed to build stream: {}", e)))
    }

    fn send(&self, command: MixerCommand) -> Result<(), SinkError> {
        let mut producer = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if producer.try_push(command).is_err() {
            warn!("Mixer command queue full, dropping command");
            return Err(SinkError::Stream("command queue full".into()));
        }
        Ok(())
    }
}

impl AudioSink for DeviceSink {
    fn attach_voice(&self) -> Result<VoiceId, SinkError> {
        if !self.status.get().is_running() {
            return Err(SinkError::Unavailable);
        }
        Ok(VoiceId(self.next_voice.fetch_add(1, Ordering::Relaxed)))
    }

    fn schedule_buffer(&self, voice: VoiceId, request: PlaybackRequest) -> Result<(), SinkError> {
        if !self.status.get().is_running() {
            return Err(SinkError::Unavailable);
        }
        self.send(MixerCommand::Play(voice, request))
    }

    fn stop_voice(&self, voice: VoiceId) {
        let _ = self.send(MixerCommand::Stop(voice));
    }

    fn status(&self) -> SinkStatus {
        self.status.get()
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
