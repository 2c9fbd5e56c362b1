// Output backend status, shared between the sink and the engine

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Starting = 0,
    Running = 1,
    Failed = 2,
}

impl SinkStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SinkStatus::Running)
    }
}

impl From<u8> for SinkStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => SinkStatus::Starting,
            1 => SinkStatus::Running,
            _ => SinkStatus::Failed,
        }
    }
}

/// Atomic wrapper to share the status between threads
#[derive(Debug, Clone)]
pub struct AtomicSinkStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicSinkStatus {
    pub fn new(status: SinkStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> SinkStatus {
        SinkStatus::from(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, status: SinkStatus) {
        self.inner.store(status as u8, Ordering::Release);
    }
}

impl Default for AtomicSinkStatus {
    fn default() -> Self {
        Self::new(SinkStatus::Starting)
    }
}
