// Engine events - state-change notifications for UI consumers

use crate::audio::status::SinkStatus;
use crate::effects::EffectKind;
use crate::sequencer::transport::TransportState;

/// Change notification emitted by the engine components
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TransportChanged(TransportState),
    /// Step that just played
    StepAdvanced(usize),
    PadTriggered(usize),
    /// Pattern slot whose content changed
    PatternEdited(usize),
    PatternSelected(usize),
    TempoChanged(f64),
    EffectChanged { kind: EffectKind, mix: f32 },
    RecordingMerged { pattern: usize, hits: usize },
    AudioStatus(SinkStatus),
}
