// Pattern - Per-pad step data for one slot of the pattern bank
// Two storage forms: a dense boolean grid and a sparse, sorted hit list

use crate::error::{EngineError, EngineResult};
use crate::sequencer::quantizer;
use serde::{Deserialize, Serialize};

/// Dense [pad][step] matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPattern {
    pads: usize,
    steps: usize,
    /// Row-major: cells[pad * steps + step]
    cells: Vec<bool>,
}

impl GridPattern {
    pub fn new(pads: usize, steps: usize) -> Self {
        Self {
            pads,
            steps,
            cells: vec![false; pads * steps],
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn pads(&self) -> usize {
        self.pads
    }

    fn index(&self, pad: usize, step: usize) -> EngineResult<usize> {
        if pad >= self.pads {
            return Err(EngineError::PadOutOfRange {
                pad,
                count: self.pads,
            });
        }
        if step >= self.steps {
            return Err(EngineError::StepOutOfRange {
                step,
                steps: self.steps,
            });
        }
        Ok(pad * self.steps + step)
    }

    /// Read a cell; out-of-range reads as false
    pub fn is_set(&self, pad: usize, step: usize) -> bool {
        self.index(pad, step)
            .map(|i| self.cells[i])
            .unwrap_or(false)
    }

    pub fn set(&mut self, pad: usize, step: usize, value: bool) -> EngineResult<()> {
        let i = self.index(pad, step)?;
        self.cells[i] = value;
        Ok(())
    }

    /// Flip a cell, returning the new value
    pub fn toggle(&mut self, pad: usize, step: usize) -> EngineResult<bool> {
        let i = self.index(pad, step)?;
        self.cells[i] = !self.cells[i];
        Ok(self.cells[i])
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Pads with a set cell at `step`
    pub fn pads_at(&self, step: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.pads).filter(move |&pad| self.is_set(pad, step))
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// One recorded or programmed hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub pad: usize,
    /// 0.0 to 1.0
    pub velocity: f32,
    /// Position inside the pattern, in steps: [0, steps)
    pub position: f64,
}

/// Sparse list of hits, kept sorted by position
#[derive(Debug, Clone, PartialEq)]
pub struct HitPattern {
    pads: usize,
    steps: usize,
    hits: Vec<Hit>,
}

impl HitPattern {
    pub fn new(pads: usize, steps: usize) -> Self {
        Self {
            pads,
            steps,
            hits: Vec::new(),
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Add a hit, wrapping its position into the pattern
    pub fn add_hit(&mut self, pad: usize, velocity: f32, position: f64) -> EngineResult<()> {
        if pad >= self.pads {
            return Err(EngineError::PadOutOfRange {
                pad,
                count: self.pads,
            });
        }
        let hit = Hit {
            pad,
            velocity: velocity.clamp(0.0, 1.0),
            position: quantizer::wrap_position(position, self.steps),
        };
        // Sorted by (position, pad) for playback scans
        let insert_pos = self.hits.partition_point(|h| {
            h.position
                .total_cmp(&hit.position)
                .then(h.pad.cmp(&hit.pad))
                .is_le()
        });
        self.hits.insert(insert_pos, hit);
        Ok(())
    }

    /// Add or remove the hit of `pad` sitting exactly on `step`
    /// Returns true when a hit is now present
    pub fn toggle_at(&mut self, pad: usize, step: usize, velocity: f32) -> EngineResult<bool> {
        if step >= self.steps {
            return Err(EngineError::StepOutOfRange {
                step,
                steps: self.steps,
            });
        }
        if pad >= self.pads {
            return Err(EngineError::PadOutOfRange {
                pad,
                count: self.pads,
            });
        }
        let position = step as f64;
        if let Some(index) = self
            .hits
            .iter()
            .position(|h| h.pad == pad && h.position == position)
        {
            self.hits.remove(index);
            Ok(false)
        } else {
            self.add_hit(pad, velocity, position)?;
            Ok(true)
        }
    }

    pub fn has_hit(&self, pad: usize, step: usize) -> bool {
        let position = step as f64;
        self.hits
            .iter()
            .any(|h| h.pad == pad && h.position == position)
    }

    /// Hits whose position lies within `tolerance` steps of `position`,
    /// measured around the loop
    pub fn hits_near(&self, position: f64, tolerance: f64) -> impl Iterator<Item = &Hit> + '_ {
        let steps = self.steps;
        self.hits
            .iter()
            .filter(move |h| quantizer::circular_distance(h.position, position, steps) <= tolerance)
    }

    /// Snap every hit to its nearest step
    ///
    /// Hits of the same pad landing on the same step collapse into one,
    /// keeping the loudest velocity.
    pub fn quantize_all(&mut self) {
        for hit in &mut self.hits {
            hit.position = quantizer::wrap_position(quantizer::quantize(hit.position, 1.0), self.steps);
        }
        self.hits.sort_by(|a, b| {
            a.position
                .total_cmp(&b.position)
                .then(a.pad.cmp(&b.pad))
                .then(b.velocity.total_cmp(&a.velocity))
        });
        self.hits
            .dedup_by(|later, earlier| later.pad == earlier.pad && later.position == earlier.position);
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Where an exported entry sits in its pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPosition {
    /// Grid step index
    Step(usize),
    /// Seconds from pattern start
    Time(f64),
}

/// Read-only view of one pattern entry, for external persistence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pad: usize,
    pub position: EntryPosition,
    pub velocity: f32,
}

/// One slot of the pattern bank
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Grid(GridPattern),
    Hits(HitPattern),
}

impl Pattern {
    pub fn steps(&self) -> usize {
        match self {
            Pattern::Grid(grid) => grid.steps(),
            Pattern::Hits(hits) => hits.steps(),
        }
    }

    /// Flip the step of `pad` at `step`; `velocity` applies to new hits
    pub fn toggle_step(&mut self, pad: usize, step: usize, velocity: f32) -> EngineResult<bool> {
        match self {
            Pattern::Grid(grid) => grid.toggle(pad, step),
            Pattern::Hits(hits) => hits.toggle_at(pad, step, velocity),
        }
    }

    pub fn is_step_active(&self, pad: usize, step: usize) -> bool {
        match self {
            Pattern::Grid(grid) => grid.is_set(pad, step),
            Pattern::Hits(hits) => hits.has_hit(pad, step),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Pattern::Grid(grid) => grid.clear(),
            Pattern::Hits(hits) => hits.clear(),
        }
    }

    /// Set cells or hits count
    pub fn active_count(&self) -> usize {
        match self {
            Pattern::Grid(grid) => grid.active_count(),
            Pattern::Hits(hits) => hits.len(),
        }
    }

    /// Export entries; grid entries carry `grid_velocity`, hit entries
    /// their time in seconds at `step_duration`
    pub fn entries(&self, step_duration: f64, grid_velocity: f32) -> Vec<PatternEntry> {
        match self {
            Pattern::Grid(grid) => (0..grid.steps())
                .flat_map(|step| {
                    grid.pads_at(step).map(move |pad| PatternEntry {
                        pad,
                        position: EntryPosition::Step(step),
                        velocity: grid_velocity,
                    })
                })
                .collect(),
            Pattern::Hits(hits) => hits
                .hits()
                .iter()
                .map(|h| PatternEntry {
                    pad: h.pad,
                    position: EntryPosition::Time(h.position * step_duration),
                    velocity: h.velocity,
                })
                .collect(),
        }
    }
}
