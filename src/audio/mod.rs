// Audio boundary - sample sources and output sinks

pub mod buffer;
#[cfg(feature = "device")]
pub mod device;
pub mod loader;
pub mod repository;
pub mod sink;
pub mod status;

pub use buffer::AudioBuffer;
#[cfg(feature = "device")]
pub use device::DeviceSink;
pub use loader::{FileSampleRepository, SampleLoadError, load_sample};
pub use repository::{InMemorySampleRepository, SampleRef, SampleRepository};
pub use sink::{AudioSink, MemorySink, NullSink, PlaybackRequest, SinkCall, SinkError, VoiceId};
pub use status::{AtomicSinkStatus, SinkStatus};
