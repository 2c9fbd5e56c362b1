// PatternStore - Owns the pattern bank
//
// Every pattern write (editing, recording merge, loading) goes through this
// API. Readers get either a closure over the current pattern or a cloned
// snapshot; nothing outside the store holds a reference into the bank.
//
// Pattern selection is two-phase while the transport is live: the request
// is parked in `pending` and committed by the sequencer at the next tick
// boundary, so a step never plays half from one pattern and half from
// another.

use crate::config::{EngineConfig, PatternMode};
use crate::error::{EngineError, EngineResult};
use crate::pads::PAD_COUNT;
use crate::sequencer::pattern::{GridPattern, HitPattern, Pattern, PatternEntry};
use crate::sequencer::quantizer;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const NO_PENDING: usize = usize::MAX;

/// A hit ready to be merged, positioned in (fractional) steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepHit {
    pub pad: usize,
    pub velocity: f32,
    pub position: f64,
}

pub struct PatternStore {
    patterns: RwLock<Vec<Pattern>>,
    current: AtomicUsize,
    pending: AtomicUsize,
    live: AtomicBool,
    mode: PatternMode,
    steps: usize,
    default_velocity: f32,
}

impl PatternStore {
    pub fn new(config: &EngineConfig) -> Self {
        let steps = config.pattern_steps();
        let patterns = (0..config.pattern_slots)
            .map(|_| Self::empty_pattern(config.pattern_mode, steps))
            .collect();

        Self {
            patterns: RwLock::new(patterns),
            current: AtomicUsize::new(0),
            pending: AtomicUsize::new(NO_PENDING),
            live: AtomicBool::new(false),
            mode: config.pattern_mode,
            steps,
            default_velocity: config.default_velocity,
        }
    }

    fn empty_pattern(mode: PatternMode, steps: usize) -> Pattern {
        match mode {
            PatternMode::Grid => Pattern::Grid(GridPattern::new(PAD_COUNT, steps)),
            PatternMode::Hits => Pattern::Hits(HitPattern::new(PAD_COUNT, steps)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Pattern>> {
        self.patterns.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Pattern>> {
        self.patterns.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_index(&self, index: usize) -> EngineResult<()> {
        let slots = self.slots();
        if index >= slots {
            return Err(EngineError::PatternOutOfRange { index, slots });
        }
        Ok(())
    }

    /// Number of slots in the bank
    pub fn slots(&self) -> usize {
        self.read().len()
    }

    /// Steps per pattern
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    pub fn default_velocity(&self) -> f32 {
        self.default_velocity
    }

    /// Flip one step; out-of-range indices change nothing
    pub fn toggle_step(&self, pattern: usize, pad: usize, step: usize) -> EngineResult<bool> {
        self.check_index(pattern)?;
        let mut patterns = self.write();
        patterns[pattern].toggle_step(pad, step, self.default_velocity)
    }

    pub fn clear(&self, pattern: usize) -> EngineResult<()> {
        self.check_index(pattern)?;
        self.write()[pattern].clear();
        Ok(())
    }

    /// Value copy of slot `from` into slot `to`
    pub fn copy(&self, from: usize, to: usize) -> EngineResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        let mut patterns = self.write();
        if from != to {
            let copy = patterns[from].clone();
            patterns[to] = copy;
        }
        Ok(())
    }

    /// Request a new current pattern
    ///
    /// Applied immediately when the transport is stopped, otherwise at
    /// the next tick boundary.
    pub fn select_current(&self, index: usize) -> EngineResult<()> {
        self.check_index(index)?;
        if self.live.load(Ordering::Acquire) {
            self.pending.store(index, Ordering::Release);
        } else {
            self.pending.store(NO_PENDING, Ordering::Release);
            self.current.store(index, Ordering::Release);
        }
        Ok(())
    }

    /// Apply a parked selection; returns the new index if one was applied
    pub fn commit_pending(&self) -> Option<usize> {
        let pending = self.pending.swap(NO_PENDING, Ordering::AcqRel);
        if pending == NO_PENDING {
            return None;
        }
        let previous = self.current.swap(pending, Ordering::AcqRel);
        (previous != pending).then_some(pending)
    }

    /// Mark whether selections must wait for a tick boundary
    pub(crate) fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Release);
        if !live {
            self.commit_pending();
        }
    }

    /// Committed current pattern index
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Selection waiting for the next tick boundary
    pub fn pending_index(&self) -> Option<usize> {
        match self.pending.load(Ordering::Acquire) {
            NO_PENDING => None,
            index => Some(index),
        }
    }

    /// Run `f` against the current pattern under the read lock
    pub fn with_current<R>(&self, f: impl FnOnce(&Pattern) -> R) -> R {
        let patterns = self.read();
        f(&patterns[self.current_index()])
    }

    /// Snapshot of one slot
    pub fn pattern(&self, index: usize) -> EngineResult<Pattern> {
        self.check_index(index)?;
        Ok(self.read()[index].clone())
    }

    /// Replace a slot wholesale (external loaders); the pattern must match
    /// the bank's mode and length
    pub fn replace(&self, index: usize, pattern: Pattern) -> EngineResult<()> {
        self.check_index(index)?;
        let matches_mode = matches!(
            (&pattern, self.mode),
            (Pattern::Grid(_), PatternMode::Grid) | (Pattern::Hits(_), PatternMode::Hits)
        );
        if !matches_mode || pattern.steps() != self.steps {
            return Err(EngineError::Config(format!(
                "pattern shape does not match bank ({:?}, {} steps)",
                self.mode, self.steps
            )));
        }
        self.write()[index] = pattern;
        Ok(())
    }

    pub fn active_step_count(&self, index: usize) -> EngineResult<usize> {
        self.check_index(index)?;
        Ok(self.read()[index].active_count())
    }

    /// Read-only export of one slot
    pub fn entries(&self, index: usize, step_duration: f64) -> EngineResult<Vec<PatternEntry>> {
        self.check_index(index)?;
        Ok(self.read()[index].entries(step_duration, self.default_velocity))
    }

    /// Merge recorded hits into the current pattern
    ///
    /// Grid banks set the cell at the nearest step. Hit banks append every
    /// hit and, when `quantize` is set, snap the whole pattern afterwards.
    /// Returns the number of hits merged.
    pub fn merge_hits(&self, hits: &[StepHit], quantize: bool) -> usize {
        if hits.is_empty() {
            return 0;
        }
        let mut patterns = self.write();
        let index = self.current_index();
        let mut merged = 0;

        match &mut patterns[index] {
            Pattern::Grid(grid) => {
                for hit in hits {
                    let step = quantizer::quantize(hit.position, 1.0) as i64;
                    let step = quantizer::wrap_step(step, self.steps);
                    if grid.set(hit.pad, step, true).is_ok() {
                        merged += 1;
                    }
                }
            }
            Pattern::Hits(list) => {
                for hit in hits {
                    if list.add_hit(hit.pad, hit.velocity, hit.position).is_ok() {
                        merged += 1;
                    }
                }
                if quantize {
                    list.quantize_all();
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_store() -> PatternStore {
        PatternStore::new(&EngineConfig::default())
    }

    #[test]
    fn test_bank_shape() {
        let store = grid_store();
        assert_eq!(store.slots(), 4);
        assert_eq!(store.steps(), 16);
        assert_eq!(store.current_index(), 0);

        let hits = PatternStore::new(&EngineConfig::hits());
        assert_eq!(hits.steps(), 64);
        assert!(matches!(hits.pattern(0).unwrap(), Pattern::Hits(_)));
    }

    #[test]
    fn test_toggle_out_of_range() {
        let store = grid_store();
        assert_eq!(
            store.toggle_step(4, 0, 0),
            Err(EngineError::PatternOutOfRange { index: 4, slots: 4 })
        );
        assert!(store.toggle_step(0, 16, 0).unwrap_err().is_index_error());
        assert!(store.toggle_step(0, 0, 16).unwrap_err().is_index_error());
        assert_eq!(store.active_step_count(0).unwrap(), 0);
    }

    #[test]
    fn test_clear_empties_pattern() {
        let store = grid_store();
        for step in 0..16 {
            store.toggle_step(1, step % 16, step).unwrap();
        }
        assert_eq!(store.active_step_count(1).unwrap(), 16);
        store.clear(1).unwrap();
        assert_eq!(store.active_step_count(1).unwrap(), 0);
    }

    #[test]
    fn test_copy_is_value_copy() {
        let store = grid_store();
        store.toggle_step(0, 2, 3).unwrap();
        store.copy(0, 1).unwrap();
        assert!(store.pattern(1).unwrap().is_step_active(2, 3));

        store.toggle_step(0, 0, 0).unwrap();
        assert!(!store.pattern(1).unwrap().is_step_active(0, 0));
    }

    #[test]
    fn test_selection_immediate_when_stopped() {
        let store = grid_store();
        store.select_current(2).unwrap();
        assert_eq!(store.current_index(), 2);
        assert_eq!(store.pending_index(), None);
    }

    #[test]
    fn test_selection_deferred_while_live() {
        let store = grid_store();
        store.set_live(true);
        store.select_current(3).unwrap();
        assert_eq!(store.current_index(), 0);
        assert_eq!(store.pending_index(), Some(3));

        assert_eq!(store.commit_pending(), Some(3));
        assert_eq!(store.current_index(), 3);
        assert_eq!(store.commit_pending(), None);
    }

    #[test]
    fn test_going_idle_commits_pending() {
        let store = grid_store();
        store.set_live(true);
        store.select_current(1).unwrap();
        store.set_live(false);
        assert_eq!(store.current_index(), 1);
    }

    #[test]
    fn test_merge_into_grid_wraps() {
        let store = grid_store();
        let merged = store.merge_hits(
            &[
                StepHit { pad: 3, velocity: 0.8, position: 3.92 },
                StepHit { pad: 1, velocity: 0.8, position: 15.7 },
                StepHit { pad: 99, velocity: 0.8, position: 1.0 },
            ],
            true,
        );
        assert_eq!(merged, 2);
        let pattern = store.pattern(0).unwrap();
        assert!(pattern.is_step_active(3, 4));
        assert!(pattern.is_step_active(1, 0));
    }

    #[test]
    fn test_merge_into_hits_quantizes() {
        let store = PatternStore::new(&EngineConfig::hits());
        store.merge_hits(&[StepHit { pad: 2, velocity: 0.6, position: 7.8 }], true);
        let entries = store.entries(0, 0.125).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].position, crate::sequencer::pattern::EntryPosition::Time(1.0));

        store.merge_hits(&[StepHit { pad: 2, velocity: 0.6, position: 9.3 }], false);
        let pattern = store.pattern(0).unwrap();
        match pattern {
            Pattern::Hits(list) => assert_eq!(list.hits()[1].position, 9.3),
            Pattern::Grid(_) => panic!("expected hit pattern"),
        }
    }

    #[test]
    fn test_replace_checks_shape() {
        let store = grid_store();
        let wrong = Pattern::Hits(HitPattern::new(PAD_COUNT, 16));
        assert!(store.replace(0, wrong).is_err());

        let mut grid = GridPattern::new(PAD_COUNT, 16);
        grid.set(5, 5, true).unwrap();
        store.replace(0, Pattern::Grid(grid)).unwrap();
        assert!(store.pattern(0).unwrap().is_step_active(5, 5));
    }
}
