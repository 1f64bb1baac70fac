//! Keystroke and scroll-step timing.
//!
//! Typing draws a words-per-minute rate once per field, then samples each
//! character's delay from a Gaussian around the implied per-character mean.
//! Scroll steps get an accelerate / cruise / decelerate profile.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;

/// A single key event produced by a typing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Char(char),
    Backspace,
}

/// A key event with the pause to hold after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedKeystroke {
    pub key: Keystroke,
    pub delay: Duration,
}

/// Whether a plan may contain simulated mistakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingStyle {
    /// Typos and corrections allowed.
    Natural,
    /// Every keystroke is the intended one. Used for credentials.
    Precise,
}

#[derive(Debug, Clone)]
pub struct TypingProfile {
    pub wpm_min: f64,
    pub wpm_max: f64,
    /// Standard deviation as a fraction of the mean delay.
    pub spread: f64,
    pub floor_ms: f64,
    pub ceiling_ms: f64,
    pub hesitation_probability: f64,
    pub hesitation_ms: (u64, u64),
    pub typo_probability: f64,
    /// Correct characters typed after a typo before it is noticed.
    pub typo_run_on: (usize, usize),
    pub notice_pause_ms: (u64, u64),
}

impl Default for TypingProfile {
    fn default() -> Self {
        Self {
            wpm_min: 45.0,
            wpm_max: 60.0,
            spread: 0.3,
            floor_ms: 20.0,
            ceiling_ms: 300.0,
            hesitation_probability: 0.2,
            hesitation_ms: (300, 500),
            typo_probability: 0.03,
            typo_run_on: (0, 2),
            notice_pause_ms: (250, 600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollProfile {
    pub floor_ms: u64,
    pub ceiling_ms: u64,
    /// Nominal delay of the constant phase.
    pub cruise_ms: u64,
    pub cruise_jitter_ms: u64,
}

impl Default for ScrollProfile {
    fn default() -> Self {
        Self {
            floor_ms: 20,
            ceiling_ms: 150,
            cruise_ms: 35,
            cruise_jitter_ms: 10,
        }
    }
}

/// Sizes of the three scroll phases; they always sum to the step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPhases {
    pub accelerate: usize,
    pub constant: usize,
    pub decelerate: usize,
}

impl ScrollPhases {
    /// Quarter / half / quarter, with rounding slack absorbed by the constant phase.
    ///
    /// ```
    /// use reach_drivers::humanize::cadence::ScrollPhases;
    ///
    /// let p = ScrollPhases::split(10);
    /// assert_eq!((p.accelerate, p.constant, p.decelerate), (2, 6, 2));
    /// assert_eq!(ScrollPhases::split(1).constant, 1);
    /// ```
    pub fn split(steps: usize) -> Self {
        let accelerate = steps / 4;
        let decelerate = steps / 4;
        Self {
            accelerate,
            constant: steps - accelerate - decelerate,
            decelerate,
        }
    }

    pub fn total(&self) -> usize {
        self.accelerate + self.constant + self.decelerate
    }
}

#[derive(Debug)]
pub struct CadenceModel {
    rng: StdRng,
    typing: TypingProfile,
    scroll: ScrollProfile,
}

const KEYBOARD_ROWS: [&str; 4] = ["1234567890", "qwertyuiop", "asdfghjkl", "zxcvbnm"];

impl CadenceModel {
    pub fn new(rng: StdRng) -> Self {
        Self::with_profiles(rng, TypingProfile::default(), ScrollProfile::default())
    }

    pub fn with_profiles(rng: StdRng, typing: TypingProfile, scroll: ScrollProfile) -> Self {
        Self { rng, typing, scroll }
    }

    pub fn typing_profile(&self) -> &TypingProfile {
        &self.typing
    }

    pub fn scroll_profile(&self) -> &ScrollProfile {
        &self.scroll
    }

    /// Draw a typing speed for one field.
    pub fn draw_wpm(&mut self) -> f64 {
        self.rng.gen_range(self.typing.wpm_min..=self.typing.wpm_max)
    }

    /// Delay after one character at `wpm`, hesitation included.
    pub fn keystroke_delay(&mut self, wpm: f64) -> Duration {
        let chars_per_minute = wpm * 5.0;
        let mean = 60_000.0 / chars_per_minute;
        let sampled = self
            .gaussian(mean, mean * self.typing.spread)
            .clamp(self.typing.floor_ms, self.typing.ceiling_ms);

        let mut ms = sampled.round() as u64;
        if self.rng.gen_bool(self.typing.hesitation_probability.clamp(0.0, 1.0)) {
            let (lo, hi) = self.typing.hesitation_ms;
            ms += self.rng.gen_range(lo..=hi.max(lo));
        }
        Duration::from_millis(ms)
    }

    /// Plan every key event needed to enter `text`.
    ///
    /// Whatever mistakes the plan contains, replaying it yields `text` exactly.
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use reach_drivers::humanize::cadence::{replay, CadenceModel, TypingStyle};
    ///
    /// let mut model = CadenceModel::new(rand::rngs::StdRng::seed_from_u64(4));
    /// let plan = model.plan_typing("Software Engineer", TypingStyle::Natural);
    /// assert_eq!(replay(&plan), "Software Engineer");
    /// ```
    pub fn plan_typing(&mut self, text: &str, style: TypingStyle) -> Vec<TimedKeystroke> {
        let chars: Vec<char> = text.chars().collect();
        let wpm = self.draw_wpm();
        let typo_probability = match style {
            TypingStyle::Natural => self.typing.typo_probability.clamp(0.0, 1.0),
            TypingStyle::Precise => 0.0,
        };

        let mut plan = Vec::with_capacity(chars.len() + 4);
        let mut i = 0;
        while i < chars.len() {
            let intended = chars[i];
            let wrong = if self.rng.gen_bool(typo_probability) {
                self.neighbour_of(intended)
            } else {
                None
            };

            let Some(wrong) = wrong else {
                let delay = self.keystroke_delay(wpm);
                plan.push(TimedKeystroke {
                    key: Keystroke::Char(intended),
                    delay,
                });
                i += 1;
                continue;
            };

            let delay = self.keystroke_delay(wpm);
            plan.push(TimedKeystroke {
                key: Keystroke::Char(wrong),
                delay,
            });
            let (lo, hi) = self.typing.typo_run_on;
            let run_on = self.rng.gen_range(lo..=hi.max(lo)).min(chars.len() - i - 1);
            for &c in &chars[i + 1..i + 1 + run_on] {
                let delay = self.keystroke_delay(wpm);
                plan.push(TimedKeystroke {
                    key: Keystroke::Char(c),
                    delay,
                });
            }

            let (lo, hi) = self.typing.notice_pause_ms;
            if let Some(last) = plan.last_mut() {
                last.delay += Duration::from_millis(self.rng.gen_range(lo..=hi.max(lo)));
            }
            for _ in 0..=run_on {
                let delay = self.keystroke_delay(wpm).min(Duration::from_millis(
                    self.typing.ceiling_ms as u64,
                ));
                plan.push(TimedKeystroke {
                    key: Keystroke::Backspace,
                    delay,
                });
            }
            // Resume at the mistyped position; no second typo on the same char.
            let delay = self.keystroke_delay(wpm);
            plan.push(TimedKeystroke {
                key: Keystroke::Char(intended),
                delay,
            });
            i += 1;
        }
        plan
    }

    /// Per-step delays for a scroll gesture of `steps` increments.
    ///
    /// Acceleration delays fall towards cruise speed, the constant phase
    /// jitters around it, deceleration delays climb back. Every value lies
    /// in `[floor_ms, ceiling_ms]`.
    pub fn scroll_delays(&mut self, steps: usize) -> Vec<Duration> {
        let phases = ScrollPhases::split(steps);
        let ScrollProfile {
            floor_ms,
            ceiling_ms,
            cruise_ms,
            cruise_jitter_ms,
        } = self.scroll.clone();
        let floor = floor_ms as f64;
        let ceiling = ceiling_ms.max(floor_ms) as f64;
        let cruise = (cruise_ms as f64).clamp(floor, ceiling);
        let clamp = |v: f64| Duration::from_millis(v.clamp(floor, ceiling).round() as u64);

        let mut out = Vec::with_capacity(steps);
        for i in 0..phases.accelerate {
            let progress = (i + 1) as f64 / (phases.accelerate + 1) as f64;
            out.push(clamp(ceiling - (ceiling - cruise) * progress));
        }
        for _ in 0..phases.constant {
            let j = cruise_jitter_ms as f64;
            let wobble = if j > 0.0 { self.rng.gen_range(-j..=j) } else { 0.0 };
            out.push(clamp(cruise + wobble));
        }
        for i in 0..phases.decelerate {
            let progress = (i + 1) as f64 / (phases.decelerate + 1) as f64;
            out.push(clamp(cruise + (ceiling - cruise) * progress));
        }
        out
    }

    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(1e-10);
        let u2: f64 = self.rng.gen();
        let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + z0 * std_dev
    }

    /// A plausible adjacent-key mistake, only for ASCII letters and digits.
    fn neighbour_of(&mut self, c: char) -> Option<char> {
        let lower = c.to_ascii_lowercase();
        let row = KEYBOARD_ROWS.iter().find(|r| r.contains(lower))?;
        let keys: Vec<char> = row.chars().collect();
        let idx = keys.iter().position(|&k| k == lower)?;
        let candidates: Vec<char> = [idx.checked_sub(1), Some(idx + 1)]
            .into_iter()
            .flatten()
            .filter_map(|j| keys.get(j).copied())
            .collect();
        let pick = candidates[self.rng.gen_range(0..candidates.len())];
        Some(if c.is_ascii_uppercase() {
            pick.to_ascii_uppercase()
        } else {
            pick
        })
    }
}

/// Apply a plan to an empty field and return the visible text.
pub fn replay(plan: &[TimedKeystroke]) -> String {
    let mut out = String::new();
    for k in plan {
        match k.key {
            Keystroke::Char(c) => out.push(c),
            Keystroke::Backspace => {
                out.pop();
            }
        }
    }
    out
}
