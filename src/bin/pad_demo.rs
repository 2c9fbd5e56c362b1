// Pad demo - programs a four-on-the-floor beat and plays it for a few bars
//
// Usage: pad_demo [config.ron]
// Build with `--features device` to hear it; otherwise voices go to a silent sink.

use padgroove::audio::{AudioBuffer, AudioSink, InMemorySampleRepository, NullSink};
use padgroove::{DrumEngine, EngineConfig, EngineEvent, ThreadScheduler};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const PLAY_SECONDS: u64 = 4;

/// Exponentially decaying sine, pitched down over its length
fn synth_drum(start_hz: f32, end_hz: f32, length_ms: f32, noise: f32) -> AudioBuffer {
    let frames = (SAMPLE_RATE as f32 * length_ms / 1000.0) as usize;
    let mut phase = 0.0f32;
    let mut seed = 0x1234_5678u32;

    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / frames as f32;
            let freq = start_hz + (end_hz - start_hz) * t;
            phase += 2.0 * PI * freq / SAMPLE_RATE as f32;

            // xorshift noise for hats and snares
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let white = (seed as f32 / u32::MAX as f32) * 2.0 - 1.0;

            let envelope = (-5.0 * t).exp();
            (phase.sin() * (1.0 - noise) + white * noise) * envelope * 0.8
        })
        .collect();

    AudioBuffer::new(samples, 1, SAMPLE_RATE)
}

fn open_sink() -> Arc<dyn AudioSink> {
    #[cfg(feature = "device")]
    {
        match padgroove::audio::DeviceSink::open() {
            Ok(sink) => return Arc::new(sink),
            Err(e) => eprintln!("Audio device unavailable ({}), using silent output", e),
        }
    }
    Arc::new(NullSink::new())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Padgroove ===");

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return;
            }
        },
        None => EngineConfig::default(),
    };

    let repository = Arc::new(InMemorySampleRepository::new());
    let kick = repository.insert("kick", synth_drum(150.0, 45.0, 300.0, 0.0));
    let snare = repository.insert("snare", synth_drum(220.0, 180.0, 180.0, 0.6));
    let hat = repository.insert("hat", synth_drum(8000.0, 8000.0, 60.0, 0.95));

    let engine = match DrumEngine::builder(config)
        .sink(open_sink())
        .repository(repository)
        .scheduler(Arc::new(ThreadScheduler::new()))
        .build()
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };
    let mut events = engine.subscribe();

    engine.assign_sample(0, kick);
    engine.assign_sample(1, snare);
    engine.assign_sample(2, hat);

    let steps = engine.pattern_steps();
    let program = (0..steps)
        .filter(|s| s % 4 == 0)
        .map(|s| (0, s))
        .chain((0..steps).filter(|s| s % 8 == 4).map(|s| (1, s)))
        .chain((0..steps).filter(|s| s % 2 == 0).map(|s| (2, s)));
    for (pad, step) in program {
        if let Err(e) = engine.toggle_step(0, pad, step) {
            eprintln!("ERROR: {}", e);
            return;
        }
    }

    if let Err(e) = engine.set_effect_mix("reverb", 20.0) {
        eprintln!("ERROR: {}", e);
    }

    if let Err(e) = engine.play() {
        eprintln!("ERROR: {}", e);
        return;
    }

    let mut steps_played = 0usize;
    for _ in 0..PLAY_SECONDS * 10 {
        thread::sleep(Duration::from_millis(100));
        for event in events.drain() {
            match event {
                EngineEvent::StepAdvanced(_) => steps_played += 1,
                EngineEvent::AudioStatus(status) => println!("Audio status: {:?}", status),
                _ => {}
            }
        }
    }

    engine.stop();
    println!(
        "Played {} steps at {} BPM ({:.3}s per step)",
        steps_played,
        engine.bpm(),
        engine.step_duration()
    );
}
