// SPDX-License-Identifier: MIT OR Apache-2.0
//! Piecewise Bezier curve evaluation over timed samples.
//!
//! A [`Curve`] holds a time-sorted copy of `(value, time)` samples and can be
//! evaluated in three modes:
//! - [`CurveMode::Linear`]: straight interpolation between neighbouring samples
//! - [`CurveMode::Quadratic`]: consecutive groups of 3 samples form one Bezier segment
//! - [`CurveMode::Cubic`]: consecutive groups of 4 samples form one Bezier segment
//!
//! In the Bezier modes the inner samples of a group are control points. Their
//! time only orders and groups them; the curve does not pass through them.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A value type that can be blended between two samples.
pub trait Interpolate: Copy {
    /// Blend from `a` (at `t = 0`) to `b` (at `t = 1`).
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

impl Interpolate for Quat {
    /// Spherical interpolation along the shortest arc.
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }
}

/// Inverse of linear interpolation: where `value` sits between `start` and `end`.
pub fn inverse_lerp(start: f32, end: f32, value: f32) -> f32 {
    (value - start) / (end - start)
}

/// Evaluation algorithm for a curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurveMode {
    /// Degree 1, pairwise interpolation
    #[default]
    Linear,
    /// Degree 2, groups of 3 samples
    Quadratic,
    /// Degree 3, groups of 4 samples
    Cubic,
}

impl CurveMode {
    /// Number of samples forming one segment
    pub fn group_size(&self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Quadratic => 3,
            Self::Cubic => 4,
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Quadratic => "Quadratic",
            Self::Cubic => "Cubic",
        }
    }
}

/// Error building or evaluating a curve
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    /// Value and time arrays differ in length
    #[error("Curve has {values} values but {times} times")]
    LengthMismatch {
        /// Number of values supplied
        values: usize,
        /// Number of times supplied
        times: usize,
    },

    /// No samples were supplied
    #[error("Curve needs at least one sample")]
    Empty,

    /// The interval needed for interpolation has zero duration
    #[error("Zero-duration interval at time {time}")]
    DegenerateInterval {
        /// Start time of the degenerate interval
        time: f32,
        /// Index of the earlier sample of the interval
        index: usize,
    },

    /// No interval contains an in-range query time
    #[error("No interval contains time {0}")]
    NoInterval(f32),
}

/// A sorted, piecewise-interpolated set of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve<T> {
    values: Vec<T>,
    times: Vec<f32>,
    time_start: f32,
    time_end: f32,
}

impl<T: Interpolate> Curve<T> {
    /// Build a curve from parallel value and time arrays.
    ///
    /// Samples are copied and stably sorted by time, so equal times keep
    /// their input order.
    pub fn new(values: &[T], times: &[f32]) -> Result<Self, CurveError> {
        if values.len() != times.len() {
            return Err(CurveError::LengthMismatch {
                values: values.len(),
                times: times.len(),
            });
        }
        if values.is_empty() {
            return Err(CurveError::Empty);
        }

        let mut samples: Vec<(T, f32)> = values.iter().copied().zip(times.iter().copied()).collect();
        samples.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (values, times): (Vec<T>, Vec<f32>) = samples.into_iter().unzip();

        let time_start = times[0];
        let time_end = times[times.len() - 1];

        Ok(Self {
            values,
            times,
            time_start,
            time_end,
        })
    }

    /// Time of the first sample
    pub fn time_start(&self) -> f32 {
        self.time_start
    }

    /// Time of the last sample
    pub fn time_end(&self) -> f32 {
        self.time_end
    }

    /// Time covered between the first and last sample
    pub fn duration(&self) -> f32 {
        self.time_end - self.time_start
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a built curve
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sorted sample values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Sorted sample times
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    fn first(&self) -> T {
        self.values[0]
    }

    fn last(&self) -> T {
        self.values[self.values.len() - 1]
    }

    /// Boundary value for queries outside `(time_start, time_end)`.
    fn clamped(&self, t: f32) -> Option<T> {
        if t < self.time_start {
            Some(self.first())
        } else if t >= self.time_end {
            Some(self.last())
        } else {
            None
        }
    }

    /// Evaluate with the given algorithm
    pub fn evaluate_mode(&self, t: f32, mode: CurveMode) -> Result<T, CurveError> {
        match mode {
            CurveMode::Linear => self.evaluate(t),
            CurveMode::Quadratic => self.evaluate_quadratic(t),
            CurveMode::Cubic => self.evaluate_cubic(t),
        }
    }

    /// Evaluate, resolving a degenerate interval to its earlier sample.
    ///
    /// Other errors are still returned.
    pub fn evaluate_or_hold(&self, t: f32, mode: CurveMode) -> Result<T, CurveError> {
        match self.evaluate_mode(t, mode) {
            Err(CurveError::DegenerateInterval { time, index }) => {
                tracing::warn!("Holding sample {} over zero-duration interval at t={}", index, time);
                Ok(self.values[index])
            }
            other => other,
        }
    }

    /// Linear evaluation.
    ///
    /// Uses the first sample whose time is strictly greater than `t` as the
    /// end of the interval.
    pub fn evaluate(&self, t: f32) -> Result<T, CurveError> {
        if let Some(value) = self.clamped(t) {
            return Ok(value);
        }

        let next = self
            .times
            .iter()
            .position(|&time| time > t)
            .ok_or(CurveError::NoInterval(t))?;
        if next == 0 {
            return Err(CurveError::NoInterval(t));
        }

        self.lerp_between(next - 1, next, t)
    }

    /// Quadratic Bezier evaluation over groups of 3 samples.
    pub fn evaluate_quadratic(&self, t: f32) -> Result<T, CurveError> {
        self.evaluate_grouped(t, CurveMode::Quadratic.group_size())
    }

    /// Cubic Bezier evaluation over groups of 4 samples.
    pub fn evaluate_cubic(&self, t: f32) -> Result<T, CurveError> {
        self.evaluate_grouped(t, CurveMode::Cubic.group_size())
    }

    fn lerp_between(&self, a: usize, b: usize, t: f32) -> Result<T, CurveError> {
        let (start, end) = (self.times[a], self.times[b]);
        if end == start {
            return Err(CurveError::DegenerateInterval { time: start, index: a });
        }
        let u = inverse_lerp(start, end, t);
        Ok(T::interpolate(self.values[a], self.values[b], u))
    }

    /// Index into the samples, repeating the final sample as padding.
    fn padded(&self, index: usize) -> usize {
        index.min(self.values.len() - 1)
    }

    fn evaluate_grouped(&self, t: f32, size: usize) -> Result<T, CurveError> {
        if let Some(value) = self.clamped(t) {
            return Ok(value);
        }

        let mut group_start = 0;
        while group_start < self.values.len() {
            let first = group_start;
            let last = self.padded(group_start + size - 1);
            let (start, end) = (self.times[first], self.times[last]);

            if t >= start && t <= end {
                if end == start {
                    return Err(CurveError::DegenerateInterval { time: start, index: first });
                }
                let u = inverse_lerp(start, end, t);
                let points: Vec<T> = (0..size)
                    .map(|i| self.values[self.padded(group_start + i)])
                    .collect();
                return Ok(de_casteljau(points, u));
            }

            // Gap between this group and the next one
            let next = group_start + size;
            if next < self.values.len() && t > end && t < self.times[next] {
                return self.lerp_between(last, next, t);
            }

            group_start = next;
        }

        Err(CurveError::NoInterval(t))
    }
}

/// Collapse control points by repeated pairwise interpolation.
fn de_casteljau<T: Interpolate>(mut points: Vec<T>, u: f32) -> T {
    while points.len() > 1 {
        points = points
            .windows(2)
            .map(|pair| T::interpolate(pair[0], pair[1], u))
            .collect();
    }
    points[0]
}
