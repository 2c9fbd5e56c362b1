// Pad activity - advisory "recently triggered" flags for UI flashing
// Derived from trigger timestamps; nothing needs to clear them

use crate::sequencer::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const NEVER: u64 = u64::MAX;

pub struct PadActivity {
    last_trigger: Vec<AtomicU64>,
    flash: Duration,
    clock: Arc<dyn Clock>,
}

impl PadActivity {
    pub fn new(pads: usize, flash: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_trigger: (0..pads).map(|_| AtomicU64::new(NEVER)).collect(),
            flash,
            clock,
        }
    }

    pub fn mark(&self, pad: usize) {
        if let Some(slot) = self.last_trigger.get(pad) {
            slot.store(self.clock.now().as_nanos() as u64, Ordering::Relaxed);
        }
    }

    /// True for `flash` after the pad's last trigger
    pub fn is_active(&self, pad: usize) -> bool {
        let Some(slot) = self.last_trigger.get(pad) else {
            return false;
        };
        let at = slot.load(Ordering::Relaxed);
        if at == NEVER {
            return false;
        }
        let now = self.clock.now().as_nanos() as u64;
        now.saturating_sub(at) < self.flash.as_nanos() as u64
    }

    pub fn active_pads(&self) -> Vec<usize> {
        (0..self.last_trigger.len())
            .filter(|&pad| self.is_active(pad))
            .collect()
    }
}
