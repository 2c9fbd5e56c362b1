// Recorder - Live hit capture and merge into the current pattern
//
// Captured hits go into a single-producer ring buffer; a full buffer drops
// the hit rather than blocking the trigger path. Each hit arrives already
// placed on the pattern (the transport reads it off the playhead), so
// neither re-arming mid-pattern nor a tempo change mid-take moves it.

use crate::sequencer::store::{PatternStore, StepHit};
use log::{debug, warn};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// One captured hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedHit {
    pub pad: usize,
    pub velocity: f32,
    /// Playhead position in steps when the hit landed
    pub position: f64,
}

pub struct Recorder {
    recording: AtomicBool,
    producer: Mutex<HeapProd<RecordedHit>>,
    consumer: Mutex<HeapCons<RecordedHit>>,
    dropped: AtomicU64,
}

impl Recorder {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = HeapRb::<RecordedHit>::new(capacity.max(1)).split();
        Self {
            recording: AtomicBool::new(false),
            producer: Mutex::new(producer),
            consumer: Mutex::new(consumer),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Begin a take: clears pending hits
    pub fn start(&self) {
        self.consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.dropped.store(0, Ordering::Relaxed);
        self.recording.store(true, Ordering::Release);
        debug!("Recording started");
    }

    /// Capture a live hit at `position` steps into the pattern; ignored
    /// unless recording. Returns true when the hit was queued
    pub fn capture_hit(&self, pad: usize, velocity: f32, position: f64) -> bool {
        if !self.is_recording() {
            return false;
        }
        let hit = RecordedHit {
            pad,
            velocity: velocity.clamp(0.0, 1.0),
            position,
        };

        let mut producer = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        if producer.try_push(hit).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Record buffer full, dropping hit on pad {}", pad);
            return false;
        }
        true
    }

    /// Hits waiting to be merged
    pub fn pending_len(&self) -> usize {
        self.consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .occupied_len()
    }

    /// Hits lost to a full buffer during the current take
    pub fn dropped_hits(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// End the take and merge pending hits into the store's current pattern
    ///
    /// Returns the number of hits merged; 0 when not recording.
    pub fn stop(&self, store: &PatternStore, quantize: bool) -> usize {
        if !self.recording.swap(false, Ordering::AcqRel) {
            return 0;
        }

        let hits: Vec<StepHit> = {
            let mut consumer = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);
            consumer
                .pop_iter()
                .map(|hit| StepHit {
                    pad: hit.pad,
                    velocity: hit.velocity,
                    position: hit.position,
                })
                .collect()
        };

        let merged = store.merge_hits(&hits, quantize);
        debug!("Recording stopped, merged {} of {} hits", merged, hits.len());
        merged
    }
}
