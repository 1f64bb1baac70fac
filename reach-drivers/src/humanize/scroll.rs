//! Reading a page: scroll bursts, reading pauses, the odd re-read, and idle
//! pointer wandering.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::cadence::CadenceModel;
use super::motion::Point;

/// Visible page area in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// One step of a reading session.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadAction {
    /// Scroll by `delta_y` pixels (negative scrolls back up), then hold.
    Scroll { delta_y: f64, delay: Duration },
    /// Read without moving.
    Dwell(Duration),
    /// Drift the pointer to `target` and rest there.
    Wander { target: Point, dwell: Duration },
}

#[derive(Debug, Clone)]
pub struct ReadProfile {
    pub bursts: RangeInclusive<u32>,
    pub steps_per_burst: RangeInclusive<usize>,
    pub step_px: RangeInclusive<f64>,
    pub reading_pause_ms: RangeInclusive<u64>,
    pub reversal_probability: f64,
    pub reversal_steps: RangeInclusive<usize>,
    pub wander_probability: f64,
    pub wander_dwell_ms: RangeInclusive<u64>,
    /// Fraction of each viewport dimension kept clear on every side.
    pub inset: f64,
}

impl Default for ReadProfile {
    fn default() -> Self {
        Self {
            bursts: 3..=7,
            steps_per_burst: 4..=10,
            step_px: 40.0..=90.0,
            reading_pause_ms: 800..=3_000,
            reversal_probability: 0.12,
            reversal_steps: 1..=3,
            wander_probability: 0.35,
            wander_dwell_ms: 400..=1_800,
            inset: 0.1,
        }
    }
}

/// Plans reading sessions on top of the scroll cadence.
#[derive(Debug)]
pub struct ScrollReader {
    rng: StdRng,
    cadence: CadenceModel,
    profile: ReadProfile,
}

impl ScrollReader {
    pub fn new(rng: StdRng, profile: ReadProfile) -> Self {
        let mut rng = rng;
        let cadence = CadenceModel::new(StdRng::seed_from_u64(rng.gen()));
        Self {
            rng,
            cadence,
            profile,
        }
    }

    pub fn profile(&self) -> &ReadProfile {
        &self.profile
    }

    /// A random point inside the viewport's safe inset.
    pub fn wander_target(&mut self, viewport: Viewport) -> Point {
        let inset = self.profile.inset.clamp(0.0, 0.49);
        let (x0, x1) = (viewport.width * inset, viewport.width * (1.0 - inset));
        let (y0, y1) = (viewport.height * inset, viewport.height * (1.0 - inset));
        Point::new(self.uniform(x0, x1), self.uniform(y0, y1))
    }

    pub fn wander(&mut self, viewport: Viewport) -> ReadAction {
        let target = self.wander_target(viewport);
        let dwell = self.draw_ms(self.profile.wander_dwell_ms.clone());
        ReadAction::Wander { target, dwell }
    }

    /// Plan a full reading session over a page.
    pub fn plan_read(&mut self, viewport: Viewport) -> Vec<ReadAction> {
        let bursts = self.rng.gen_range(self.profile.bursts.clone());
        let mut plan = Vec::new();

        for _ in 0..bursts {
            self.push_burst(&mut plan, 1.0);

            if self.rng.gen_bool(self.profile.reversal_probability.clamp(0.0, 1.0)) {
                let steps = self.rng.gen_range(self.profile.reversal_steps.clone());
                self.push_steps(&mut plan, steps, -1.0);
                plan.push(ReadAction::Dwell(
                    self.draw_ms(self.profile.reading_pause_ms.clone()),
                ));
                self.push_steps(&mut plan, steps, 1.0);
            }

            if self.rng.gen_bool(self.profile.wander_probability.clamp(0.0, 1.0)) {
                plan.push(self.wander(viewport));
            }
            plan.push(ReadAction::Dwell(
                self.draw_ms(self.profile.reading_pause_ms.clone()),
            ));
        }
        plan
    }

    fn push_burst(&mut self, plan: &mut Vec<ReadAction>, direction: f64) {
        let steps = self.rng.gen_range(self.profile.steps_per_burst.clone());
        self.push_steps(plan, steps, direction);
    }

    fn push_steps(&mut self, plan: &mut Vec<ReadAction>, steps: usize, direction: f64) {
        for delay in self.cadence.scroll_delays(steps) {
            let px = self.rng.gen_range(self.profile.step_px.clone());
            plan.push(ReadAction::Scroll {
                delta_y: direction * px,
                delay,
            });
        }
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo {
            self.rng.gen_range(lo..hi)
        } else {
            lo
        }
    }

    fn draw_ms(&mut self, range: RangeInclusive<u64>) -> Duration {
        Duration::from_millis(self.rng.gen_range(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: Viewport = Viewport {
        width: 1440.0,
        height: 900.0,
    };

    fn reader(seed: u64, profile: ReadProfile) -> ScrollReader {
        ScrollReader::new(StdRng::seed_from_u64(seed), profile)
    }

    #[test]
    fn wander_targets_respect_inset() {
        let mut r = reader(1, ReadProfile::default());
        for _ in 0..500 {
            let p = r.wander_target(VIEW);
            assert!(p.x >= 144.0 && p.x <= 1296.0, "{p:?}");
            assert!(p.y >= 90.0 && p.y <= 810.0, "{p:?}");
        }
    }

    #[test]
    fn reading_session_makes_net_forward_progress() {
        for seed in 0..40 {
            let mut r = reader(seed, ReadProfile::default());
            let plan = r.plan_read(VIEW);
            let net: f64 = plan
                .iter()
                .filter_map(|a| match a {
                    ReadAction::Scroll { delta_y, .. } => Some(*delta_y),
                    _ => None,
                })
                .sum();
            assert!(net > 0.0, "seed {seed}");
            let dwells = plan
                .iter()
                .filter(|a| matches!(a, ReadAction::Dwell(_)))
                .count();
            assert!(dwells >= 3, "at least one reading pause per burst");
        }
    }

    #[test]
    fn forced_reversal_scrolls_back_up() {
        let profile = ReadProfile {
            reversal_probability: 1.0,
            wander_probability: 0.0,
            bursts: 1..=1,
            ..ReadProfile::default()
        };
        let mut r = reader(4, profile);
        let plan = r.plan_read(VIEW);
        assert!(plan
            .iter()
            .any(|a| matches!(a, ReadAction::Scroll { delta_y, .. } if *delta_y < 0.0)));
    }

    #[test]
    fn burst_count_follows_profile() {
        let profile = ReadProfile {
            bursts: 2..=2,
            reversal_probability: 0.0,
            wander_probability: 0.0,
            ..ReadProfile::default()
        };
        let mut r = reader(6, profile);
        let plan = r.plan_read(VIEW);
        let dwells = plan
            .iter()
            .filter(|a| matches!(a, ReadAction::Dwell(_)))
            .count();
        assert_eq!(dwells, 2);
    }
}
