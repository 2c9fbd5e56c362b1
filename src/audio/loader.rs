// Sample loading - WAV (hound) and FLAC (claxon) files on disk
//
// `FileSampleRepository` resolves sample references as paths relative to
// a root directory and caches each decoded buffer after the first load.

use super::buffer::AudioBuffer;
use super::repository::{SampleRef, SampleRepository};
use claxon::FlacReader;
use hound::{SampleFormat, WavReader};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Sample loading error types
#[derive(Debug, thiserror::Error)]
pub enum SampleLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("FLAC error: {0}")]
    Flac(#[from] claxon::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Decode a WAV or FLAC file into an interleaved f32 buffer
pub fn load_sample(path: &Path) -> Result<AudioBuffer, SampleLoadError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" | "wave" => load_wav(path),
        "flac" => load_flac(path),
        _ => Err(SampleLoadError::UnsupportedFormat(extension)),
    }
}

fn load_wav(path: &Path) -> Result<AudioBuffer, SampleLoadError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(AudioBuffer::new(samples, spec.channels, spec.sample_rate))
}

fn load_flac(path: &Path) -> Result<AudioBuffer, SampleLoadError> {
    let mut reader = FlacReader::open(path)?;
    let info = reader.streaminfo();
    let scale = (1_i64 << (info.bits_per_sample.max(1) - 1)) as f32;

    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / scale))
        .collect::<Result<_, _>>()?;

    Ok(AudioBuffer::new(samples, info.channels as u16, info.sample_rate))
}

/// Repository reading samples from a directory tree
pub struct FileSampleRepository {
    root: PathBuf,
    cache: RwLock<HashMap<SampleRef, Arc<AudioBuffer>>>,
}

impl FileSampleRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, sample: &SampleRef) -> PathBuf {
        let relative = Path::new(sample.as_str());
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.root.join(relative)
        }
    }

    /// Decode a sample now, bypassing and refreshing the cache
    pub fn preload(&self, sample: &SampleRef) -> Result<Arc<AudioBuffer>, SampleLoadError> {
        let buffer = Arc::new(load_sample(&self.path_for(sample))?);
        debug!(
            "Loaded sample {} ({} frames, {} Hz)",
            sample,
            buffer.frames(),
            buffer.sample_rate()
        );
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sample.clone(), Arc::clone(&buffer));
        Ok(buffer)
    }

    pub fn evict(&self, sample: &SampleRef) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(sample);
    }
}

impl SampleRepository for FileSampleRepository {
    fn resolve(&self, sample: &SampleRef) -> Option<Arc<AudioBuffer>> {
        if let Some(buffer) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sample)
        {
            return Some(Arc::clone(buffer));
        }

        match self.preload(sample) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                warn!("Sample {} could not be loaded: {}", sample, e);
                None
            }
        }
    }
}
