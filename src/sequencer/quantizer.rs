// Quantizer - Snap raw timestamps onto the step grid
//
// Pure functions. `time` and `step` share a unit: seconds for raw
// timestamps, steps (with `step = 1.0`) for recorded playhead positions.

use crate::config::STEPS_PER_BEAT;

/// Duration of one sixteenth-note step at `bpm`
pub fn step_duration(bpm: f64) -> f64 {
    60.0 / bpm / STEPS_PER_BEAT as f64
}

/// Snap `time` to the nearest multiple of `step`
///
/// `|quantize(t, d) - t| <= d / 2` and `quantize` is idempotent.
/// Ties round away from zero. A non-positive step leaves `time` untouched.
pub fn quantize(time: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return time;
    }
    (time / step).round() * step
}

/// Wrap a step index into `[0, steps)`
pub fn wrap_step(step: i64, steps: usize) -> usize {
    if steps == 0 {
        return 0;
    }
    step.rem_euclid(steps as i64) as usize
}

/// Wrap a fractional position (in steps) into `[0, steps)`
pub fn wrap_position(position: f64, steps: usize) -> f64 {
    if steps == 0 {
        return 0.0;
    }
    let wrapped = position.rem_euclid(steps as f64);
    // rem_euclid can return exactly `steps` for tiny negative inputs
    if wrapped >= steps as f64 { 0.0 } else { wrapped }
}

/// Shortest distance between two positions on a loop of `steps` steps
pub fn circular_distance(a: f64, b: f64, steps: usize) -> f64 {
    let length = steps as f64;
    let diff = (a - b).rem_euclid(length);
    diff.min(length - diff)
}
