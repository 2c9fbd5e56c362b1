// Optional collaborators of the trigger path

use crate::audio::repository::SampleRef;

/// Fire-and-forget tactile notification on trigger
///
/// Implementations must return immediately; a panic or failure inside
/// is the implementation's problem, the trigger has already been issued.
pub trait HapticFeedback: Send + Sync {
    fn impact(&self, pad: usize);
}

/// Instrument family guessed from a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    Kick,
    Snare,
    Percussion,
    Bass,
    Vocal,
    Other,
}

impl Instrument {
    /// Pad label for this family, if it has one
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Instrument::Kick => Some("KICK"),
            Instrument::Snare => Some("SNARE"),
            Instrument::Percussion => Some("PERC"),
            Instrument::Bass => Some("BASS"),
            Instrument::Vocal => Some("VOX"),
            Instrument::Other => None,
        }
    }
}

/// Sample classification used only to label pads
pub trait SampleAnalysis: Send + Sync {
    fn classify(&self, sample: &SampleRef) -> Option<Instrument>;
}
