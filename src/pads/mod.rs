// Pads - the 16 trigger slots of the kit

pub mod activity;
pub mod feedback;
pub mod pad;
pub mod registry;

/// Pads per engine instance
pub const PAD_COUNT: usize = 16;

pub use feedback::{HapticFeedback, Instrument, SampleAnalysis};
pub use pad::Pad;
pub use registry::{PadRegistry, TriggerOutcome, VoiceHandle};
