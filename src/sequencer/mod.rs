// Sequencer module
// Patterns, timing grid, live recording and the transport that drives playback

pub mod clock;
pub mod metronome;
pub mod pattern;
pub mod quantizer;
pub mod recorder;
pub mod scheduler;
pub mod store;
pub mod timeline;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use metronome::{ClickType, Metronome, MetronomeSound};
pub use pattern::{EntryPosition, GridPattern, Hit, HitPattern, Pattern, PatternEntry};
pub use recorder::{RecordedHit, Recorder};
pub use scheduler::{ManualScheduler, ScheduleHandle, Scheduler, ThreadScheduler};
pub use store::{PatternStore, StepHit};
pub use timeline::Tempo;
pub use transport::{SharedTransportState, Transport, TransportParts, TransportState};
