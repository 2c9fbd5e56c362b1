// Padgroove - Pad sampler and step sequencer engine
// Library exports for the demo binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod messaging;
pub mod pads;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use audio::{AudioBuffer, AudioSink, InMemorySampleRepository, SampleRef, SampleRepository};
pub use config::{EngineConfig, PatternMode};
pub use effects::{EffectKind, EffectsBus};
pub use engine::{DrumEngine, EngineBuilder};
pub use error::{EngineError, EngineResult};
pub use messaging::{EngineEvent, EventReceiver};
pub use pads::{PAD_COUNT, Pad, PadRegistry, TriggerOutcome};
pub use sequencer::{
    ManualClock, ManualScheduler, Pattern, PatternEntry, Tempo, ThreadScheduler, TransportState,
};
