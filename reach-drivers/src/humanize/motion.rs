//! Pointer trajectories shaped like a hand on a mouse.
//!
//! A move is a quadratic Bézier arc through a noisy midpoint, sampled at a
//! fixed number of steps with per-sample jitter. Some moves overshoot the
//! destination along the direction of travel and correct back after a short
//! reaction pause; callers see one sample stream either way.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A viewport coordinate in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// One pointer position plus the pause to hold after dispatching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub point: Point,
    pub delay: Duration,
}

/// Tunables for [`MotionSynthesizer`].
#[derive(Debug, Clone)]
pub struct MotionProfile {
    /// Samples per arc, endpoints included.
    pub steps: usize,
    /// Half-width of the uniform noise added to the control point on each axis.
    pub control_noise: f64,
    /// Half-width of the uniform noise added to every sample on each axis.
    pub jitter: f64,
    pub overshoot_probability: f64,
    pub overshoot_min: f64,
    pub overshoot_max: f64,
    pub correction_pause_ms: (u64, u64),
    pub sample_delay_ms: (u64, u64),
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            steps: 50,
            control_noise: 50.0,
            jitter: 1.0,
            overshoot_probability: 0.3,
            overshoot_min: 10.0,
            overshoot_max: 60.0,
            correction_pause_ms: (50, 150),
            sample_delay_ms: (5, 14),
        }
    }
}

/// Generates fresh pointer paths from an owned random source.
#[derive(Debug)]
pub struct MotionSynthesizer {
    rng: StdRng,
    profile: MotionProfile,
}

impl MotionSynthesizer {
    pub fn new(rng: StdRng) -> Self {
        Self::with_profile(rng, MotionProfile::default())
    }

    pub fn with_profile(rng: StdRng, profile: MotionProfile) -> Self {
        Self { rng, profile }
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Sample a single jittered arc from `from` to `to`.
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use reach_drivers::humanize::motion::{MotionSynthesizer, Point};
    ///
    /// let mut synth = MotionSynthesizer::new(rand::rngs::StdRng::seed_from_u64(1));
    /// let arc = synth.arc(Point::new(0.0, 0.0), Point::new(300.0, 120.0));
    /// assert_eq!(arc.len(), 50);
    /// assert!(arc[49].distance(&Point::new(300.0, 120.0)) <= 2f64.sqrt());
    /// ```
    pub fn arc(&mut self, from: Point, to: Point) -> Vec<Point> {
        let noise = self.profile.control_noise;
        let control = Point::new(
            (from.x + to.x) / 2.0 + self.symmetric(noise),
            (from.y + to.y) / 2.0 + self.symmetric(noise),
        );

        let steps = self.profile.steps.max(2);
        let last = (steps - 1) as f64;
        let jitter = self.profile.jitter;
        (0..steps)
            .map(|i| {
                let t = i as f64 / last;
                let inv = 1.0 - t;
                let x = inv * inv * from.x + 2.0 * inv * t * control.x + t * t * to.x;
                let y = inv * inv * from.y + 2.0 * inv * t * control.y + t * t * to.y;
                Point::new(x + self.symmetric(jitter), y + self.symmetric(jitter))
            })
            .collect()
    }

    /// Plan a complete move, possibly with an overshoot and correction.
    pub fn plan_move(&mut self, from: Point, to: Point) -> Vec<MotionSample> {
        let overshoot = self.rng.gen_bool(self.profile.overshoot_probability.clamp(0.0, 1.0));
        let length = from.distance(&to);

        if overshoot && length > f64::EPSILON {
            let dir = Point::new((to.x - from.x) / length, (to.y - from.y) / length);
            let past = self
                .rng
                .gen_range(self.profile.overshoot_min..=self.profile.overshoot_max);
            let beyond = Point::new(to.x + dir.x * past, to.y + dir.y * past);

            let mut samples = self.timed(from, beyond);
            let (lo, hi) = self.profile.correction_pause_ms;
            let pause = Duration::from_millis(self.rng.gen_range(lo..=hi.max(lo)));
            if let Some(last) = samples.last_mut() {
                last.delay += pause;
            }
            samples.extend(self.timed(beyond, to));
            samples
        } else {
            self.timed(from, to)
        }
    }

    fn timed(&mut self, from: Point, to: Point) -> Vec<MotionSample> {
        let (lo, hi) = self.profile.sample_delay_ms;
        self.arc(from, to)
            .into_iter()
            .map(|point| MotionSample {
                point,
                delay: Duration::from_millis(self.rng.gen_range(lo..=hi.max(lo))),
            })
            .collect()
    }

    fn symmetric(&mut self, half_width: f64) -> f64 {
        if half_width <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-half_width..=half_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn synth(seed: u64) -> MotionSynthesizer {
        MotionSynthesizer::new(StdRng::seed_from_u64(seed))
    }

    fn jitter_bound(profile: &MotionProfile) -> f64 {
        profile.jitter * 2f64.sqrt() + 1e-9
    }

    #[test]
    fn endpoints_stay_within_jitter() {
        let start = Point::new(12.0, 40.0);
        let end = Point::new(640.0, 380.0);
        for seed in 0..200 {
            let mut s = synth(seed);
            let bound = jitter_bound(s.profile());
            let path = s.plan_move(start, end);
            assert!(!path.is_empty());
            assert!(path[0].point.distance(&start) <= bound, "seed {seed}");
            assert!(path[path.len() - 1].point.distance(&end) <= bound, "seed {seed}");
        }
    }

    #[test]
    fn overshoot_extends_past_destination_and_returns() {
        let profile = MotionProfile {
            overshoot_probability: 1.0,
            ..MotionProfile::default()
        };
        let mut s = MotionSynthesizer::with_profile(StdRng::seed_from_u64(3), profile);
        let start = Point::new(0.0, 0.0);
        let end = Point::new(400.0, 0.0);
        let path = s.plan_move(start, end);

        assert_eq!(path.len(), 100);
        let turn = path[49].point;
        assert!(turn.x >= end.x + 10.0 - 1.0, "overshoot landed at {turn:?}");
        assert!(turn.x <= end.x + 60.0 + 1.0);
        assert!(path[49].delay >= Duration::from_millis(55));
        assert!(path[99].point.distance(&end) <= jitter_bound(s.profile()));
    }

    #[test]
    fn zero_length_move_is_finite() {
        let profile = MotionProfile {
            overshoot_probability: 1.0,
            ..MotionProfile::default()
        };
        let mut s = MotionSynthesizer::with_profile(StdRng::seed_from_u64(9), profile);
        let here = Point::new(200.0, 200.0);
        let path = s.plan_move(here, here);
        assert_eq!(path.len(), 50);
        assert!(path
            .iter()
            .all(|s| s.point.x.is_finite() && s.point.y.is_finite()));
    }

    #[test]
    fn consecutive_paths_differ() {
        let mut s = synth(11);
        let a = s.plan_move(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        let b = s.plan_move(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        assert_ne!(a, b);
    }

    #[test]
    fn sample_delays_respect_profile() {
        let mut s = synth(5);
        for sample in s.plan_move(Point::new(0.0, 0.0), Point::new(50.0, 900.0)) {
            assert!(sample.delay >= Duration::from_millis(5));
            assert!(sample.delay <= Duration::from_millis(14 + 150));
        }
    }
}
