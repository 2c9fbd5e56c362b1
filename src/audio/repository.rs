// SampleRepository - Resolves opaque sample references to decoded audio

use super::buffer::AudioBuffer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Opaque handle to an external audio asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleRef(String);

impl SampleRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SampleRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SampleRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Source of playable audio
///
/// `None` is a normal outcome (missing or undecodable asset); the trigger
/// path reports it as "sample not found".
pub trait SampleRepository: Send + Sync {
    fn resolve(&self, sample: &SampleRef) -> Option<Arc<AudioBuffer>>;
}

/// Repository holding pre-decoded buffers
#[derive(Debug, Default)]
pub struct InMemorySampleRepository {
    buffers: RwLock<HashMap<SampleRef, Arc<AudioBuffer>>>,
}

impl InMemorySampleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sample: impl Into<SampleRef>, buffer: AudioBuffer) -> SampleRef {
        let sample = sample.into();
        self.buffers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sample.clone(), Arc::new(buffer));
        sample
    }

    pub fn remove(&self, sample: &SampleRef) -> bool {
        self.buffers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(sample)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.buffers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleRepository for InMemorySampleRepository {
    fn resolve(&self, sample: &SampleRef) -> Option<Arc<AudioBuffer>> {
        self.buffers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sample)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_resolve_shares_buffer() {
        let repo = InMemorySampleRepository::new();
        let kick = repo.insert("kick", AudioBuffer::silence(44100, 1, 100));

        let a = repo.resolve(&kick).unwrap();
        let b = repo.resolve(&kick).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_missing_sample_is_none() {
        let repo = InMemorySampleRepository::new();
        assert!(repo.resolve(&SampleRef::new("nope")).is_none());

        let snare = repo.insert("snare", AudioBuffer::silence(44100, 1, 10));
        assert!(repo.remove(&snare));
        assert!(repo.resolve(&snare).is_none());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_sample_ref_serializes_as_string() {
        let json = serde_json::to_string(&SampleRef::new("kits/808/kick.wav")).unwrap();
        assert_eq!(json, "\"kits/808/kick.wav\"");
    }
}
