//! Keyframe tracks
//!
//! A track holds values at normalized time offsets. Sampling finds the
//! segment around the requested progress and applies the track's easing to
//! the local position inside that segment, the way CSS and most web motion
//! libraries ease multi-keyframe animations.

use std::time::Duration;

use thiserror::Error;

use super::easing::Easing;
use super::values::Interpolate;

/// Problems building a [`KeyframeTrack`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyframeError {
    /// No values supplied
    #[error("keyframe track needs at least one value")]
    Empty,

    /// `times` and `values` differ in length
    #[error("{times} offsets supplied for {values} values")]
    LengthMismatch {
        /// Number of time offsets
        times: usize,
        /// Number of values
        values: usize,
    },

    /// Offsets outside `[0, 1]` or decreasing
    #[error("keyframe offsets must be non-decreasing within [0, 1]")]
    BadOffsets,
}

/// Values over normalized time with an easing per segment.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T: Interpolate> {
    values: Vec<T>,
    times: Vec<f32>,
    easing: Easing,
}

impl<T: Interpolate> KeyframeTrack<T> {
    /// Builds a track with explicit offsets.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError`] if `values` is empty, lengths differ, or
    /// offsets are not non-decreasing inside `[0, 1]`.
    pub fn try_new(values: Vec<T>, times: Vec<f32>, easing: Easing) -> Result<Self, KeyframeError> {
        if values.is_empty() {
            return Err(KeyframeError::Empty);
        }
        if values.len() != times.len() {
            return Err(KeyframeError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        let in_range = times.iter().all(|t| (0.0..=1.0).contains(t));
        let sorted = times.windows(2).all(|w| w[0] <= w[1]);
        if !in_range || !sorted {
            return Err(KeyframeError::BadOffsets);
        }
        Ok(Self {
            values,
            times,
            easing,
        })
    }

    /// Builds a track with offsets spread evenly over `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::Empty`] if `values` is empty.
    pub fn evenly_spaced(values: Vec<T>, easing: Easing) -> Result<Self, KeyframeError> {
        let times = even_offsets(values.len());
        Self::try_new(values, times, easing)
    }

    /// Builds a track from a built-in table known to be well formed.
    pub(crate) fn from_table(values: &[T], times: &[f32], easing: Easing) -> Self {
        debug_assert!(!values.is_empty() && values.len() == times.len());
        Self {
            values: values.to_vec(),
            times: times.to_vec(),
            easing,
        }
    }

    /// A single-value track; sampling always returns `value`.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            values: vec![value],
            times: vec![0.0],
            easing: Easing::Linear,
        }
    }

    /// Keyframe values in order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Keyframe offsets in order.
    #[must_use]
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// Segment easing.
    #[must_use]
    pub const fn easing(&self) -> Easing {
        self.easing
    }

    /// Samples at normalized progress, clamped to `[0, 1]`.
    #[must_use]
    pub fn sample(&self, progress: f32) -> T {
        let p = progress.clamp(0.0, 1.0);
        let last = self.values.len() - 1;
        if last == 0 || p <= self.times[0] {
            return self.values[0].clone();
        }
        if p >= self.times[last] {
            return self.values[last].clone();
        }

        // First segment whose end offset reaches p.
        let end = self
            .times
            .iter()
            .position(|t| *t >= p)
            .unwrap_or(last)
            .max(1);
        let start = end - 1;
        let span = self.times[end] - self.times[start];
        let local = if span <= f32::EPSILON {
            1.0
        } else {
            (p - self.times[start]) / span
        };
        self.values[start].lerp(&self.values[end], self.easing.apply(local))
    }

    /// Samples at `elapsed` into an animation lasting `duration`.
    #[must_use]
    pub fn sample_at(&self, elapsed: Duration, duration: Duration) -> T {
        self.sample(progress(elapsed, duration))
    }
}

/// `elapsed / duration` clamped to `[0, 1]`; a zero duration is complete.
#[must_use]
pub fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let p = (elapsed.as_secs_f64() / duration.as_secs_f64()) as f32;
    p.clamp(0.0, 1.0)
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn even_offsets(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| i as f32 / (n - 1) as f32).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::values::Color;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            KeyframeTrack::<f32>::try_new(vec![], vec![], Easing::Linear),
            Err(KeyframeError::Empty)
        );
        assert_eq!(
            KeyframeTrack::try_new(vec![1.0_f32, 2.0], vec![0.0], Easing::Linear),
            Err(KeyframeError::LengthMismatch { times: 1, values: 2 })
        );
        assert_eq!(
            KeyframeTrack::try_new(vec![1.0_f32, 2.0], vec![0.5, 0.2], Easing::Linear),
            Err(KeyframeError::BadOffsets)
        );
        assert_eq!(
            KeyframeTrack::try_new(vec![1.0_f32, 2.0], vec![0.0, 1.5], Easing::Linear),
            Err(KeyframeError::BadOffsets)
        );
    }

    #[test]
    fn test_evenly_spaced_offsets() {
        let track = KeyframeTrack::evenly_spaced(vec![0.0, 1.0, 0.0], Easing::Linear).unwrap();
        assert_eq!(track.times(), &[0.0, 0.5, 1.0]);
        assert!(approx(track.sample(0.25), 0.5));
        assert!(approx(track.sample(0.5), 1.0));
        assert!(approx(track.sample(0.75), 0.5));
    }

    #[test]
    fn test_sample_hits_keyframes_exactly() {
        let track = KeyframeTrack::try_new(
            vec![0.0, -45.0, 45.0, 0.0],
            vec![0.0, 0.1, 0.3, 1.0],
            Easing::EaseInOut,
        )
        .unwrap();
        assert!(approx(track.sample(0.0), 0.0));
        assert!(approx(track.sample(0.1), -45.0));
        assert!(approx(track.sample(0.3), 45.0));
        assert!(approx(track.sample(1.0), 0.0));
    }

    #[test]
    fn test_easing_applies_within_each_segment() {
        let track = KeyframeTrack::evenly_spaced(vec![0.0, 10.0, 20.0], Easing::EaseIn).unwrap();
        let local = Easing::EaseIn.apply(0.5);
        // Midpoint of the second segment, eased on its own.
        assert!(approx(track.sample(0.75), 10.0 + 10.0 * local));
        assert!(approx(track.sample(0.25), 10.0 * local));
        assert!(track.sample(0.75) < 15.0);
    }

    #[test]
    fn test_sample_clamps() {
        let track = KeyframeTrack::evenly_spaced(vec![2.0, 4.0], Easing::Linear).unwrap();
        assert!(approx(track.sample(-1.0), 2.0));
        assert!(approx(track.sample(9.0), 4.0));
    }

    #[test]
    fn test_constant_track() {
        let track = KeyframeTrack::constant(Color::GOLD);
        assert_eq!(track.sample(0.0), Color::GOLD);
        assert_eq!(track.sample(0.7), Color::GOLD);
    }

    #[test]
    fn test_sample_at_duration() {
        let track = KeyframeTrack::evenly_spaced(vec![0.0, 100.0], Easing::Linear).unwrap();
        let d = Duration::from_millis(400);
        assert!(approx(track.sample_at(Duration::from_millis(100), d), 25.0));
        assert!(approx(track.sample_at(Duration::from_secs(5), d), 100.0));
    }

    #[test]
    fn test_progress_zero_duration_is_complete() {
        assert!(approx(progress(Duration::ZERO, Duration::ZERO), 1.0));
        assert!(approx(
            progress(Duration::from_millis(350), Duration::from_millis(700)),
            0.5
        ));
    }
}
