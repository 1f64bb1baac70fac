//! Humanised actuation over an [`ActionSurface`].
//!
//! The actuator owns the pointer position and every synthesizer, so each
//! click, keystroke and scroll step is paced the same way regardless of
//! which flow requested it.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::humanize::cadence::{CadenceModel, Keystroke, ScrollProfile, TypingProfile, TypingStyle};
use crate::humanize::motion::{MotionSynthesizer, Point};
use crate::humanize::pacing::{ActuationResult, Pacer, Span, AIM, PAGE_SETTLE};
use crate::humanize::scroll::{ReadAction, ReadProfile, ScrollReader};
use crate::reach_browser::signals::Signal;
use crate::reach_browser::surface::{ActionSurface, Key};

/// Knobs for every random source owned by an [`Actuator`].
#[derive(Debug, Clone)]
pub struct HumanizeOptions {
    pub delay_factor: f64,
    pub typo_probability: f64,
    pub seed: Option<u64>,
    pub scroll_bursts: RangeInclusive<u32>,
}

impl Default for HumanizeOptions {
    fn default() -> Self {
        Self {
            delay_factor: 1.0,
            typo_probability: 0.03,
            seed: None,
            scroll_bursts: 3..=7,
        }
    }
}

pub struct Actuator<S: ActionSurface> {
    surface: S,
    motion: MotionSynthesizer,
    cadence: CadenceModel,
    reader: ScrollReader,
    pacer: Pacer,
    pointer: Option<Point>,
}

impl<S: ActionSurface> Actuator<S> {
    pub fn new(surface: S, options: HumanizeOptions, cancel: CancellationToken) -> Self {
        let mut master = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut child = || StdRng::seed_from_u64(master.gen());

        let typing = TypingProfile {
            typo_probability: options.typo_probability,
            ..TypingProfile::default()
        };
        let read = ReadProfile {
            bursts: options.scroll_bursts.clone(),
            ..ReadProfile::default()
        };

        Self {
            motion: MotionSynthesizer::new(child()),
            cadence: CadenceModel::with_profiles(child(), typing, ScrollProfile::default()),
            reader: ScrollReader::new(child(), read),
            pacer: Pacer::new(child(), options.delay_factor, cancel),
            surface,
            pointer: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn pacer(&mut self) -> &mut Pacer {
        &mut self.pacer
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.pacer.cancellation().clone()
    }

    pub async fn pause(&mut self, span: Span) -> ActuationResult<()> {
        self.pacer.pause(span).await
    }

    /// Load `url` and let the page settle.
    pub async fn navigate(&mut self, url: &str) -> ActuationResult<()> {
        debug!(%url, "actuator.navigate");
        self.surface.navigate(url).await?;
        self.pacer.pause(PAGE_SETTLE).await
    }

    pub async fn current_url(&self) -> ActuationResult<String> {
        Ok(self.surface.current_url().await?)
    }

    /// Look for `signal` without touching the page.
    pub async fn probe(&self, signal: Signal, timeout: Duration) -> ActuationResult<Option<S::Element>> {
        let found = self.surface.find(signal, timeout).await?;
        trace!(signal = %signal, found = found.is_some(), "actuator.probe");
        Ok(found)
    }

    pub async fn read_text(&self, element: &S::Element) -> ActuationResult<String> {
        Ok(self.surface.read_text(element).await?)
    }

    pub async fn read_attribute(
        &self,
        element: &S::Element,
        name: &str,
    ) -> ActuationResult<Option<String>> {
        Ok(self.surface.read_attribute(element, name).await?)
    }

    pub async fn collect_links(&self) -> ActuationResult<Vec<String>> {
        Ok(self.surface.collect_links().await?)
    }

    /// Glide the pointer to `target` along a synthesized path.
    pub async fn move_to(&mut self, target: Point) -> ActuationResult<()> {
        let from = match self.pointer {
            Some(p) => p,
            None => self.surface.viewport().await?.center(),
        };
        let path = self.motion.plan_move(from, target);
        trace!(samples = path.len(), "actuator.move");
        for sample in path {
            self.surface.move_pointer(sample.point).await?;
            self.pointer = Some(sample.point);
            self.pacer.wait("motion", sample.delay).await?;
        }
        Ok(())
    }

    /// Move onto `element`, aim, and click. `Ok(false)` if it has no box.
    pub async fn click(&mut self, element: &S::Element) -> ActuationResult<bool> {
        let Some(center) = self.surface.element_center(element).await? else {
            return Ok(false);
        };
        self.move_to(center).await?;
        self.pacer.pause(AIM).await?;
        self.surface.click(element).await?;
        Ok(true)
    }

    /// Probe for `signal` and click it if present.
    pub async fn click_signal(&mut self, signal: Signal, timeout: Duration) -> ActuationResult<bool> {
        match self.probe(signal, timeout).await? {
            Some(el) => self.click(&el).await,
            None => Ok(false),
        }
    }

    /// Focus `element` and type `text` with a synthesized cadence.
    pub async fn type_into(
        &mut self,
        element: &S::Element,
        text: &str,
        style: TypingStyle,
    ) -> ActuationResult<()> {
        self.click(element).await?;
        let plan = self.cadence.plan_typing(text, style);
        for stroke in plan {
            let key = match stroke.key {
                Keystroke::Char(c) => Key::Char(c),
                Keystroke::Backspace => Key::Backspace,
            };
            self.surface.send_key(element, key).await?;
            self.pacer.wait("keystroke", stroke.delay).await?;
        }
        Ok(())
    }

    pub async fn submit(&mut self, element: &S::Element) -> ActuationResult<()> {
        self.surface.send_key(element, Key::Enter).await?;
        Ok(())
    }

    /// Read through the current page: scroll bursts, pauses and wandering.
    pub async fn read_page(&mut self) -> ActuationResult<()> {
        let viewport = self.surface.viewport().await?;
        let plan = self.reader.plan_read(viewport);
        debug!(actions = plan.len(), "actuator.read_page");
        for action in plan {
            self.perform(action).await?;
        }
        Ok(())
    }

    /// Drift the pointer somewhere harmless and rest.
    pub async fn wander(&mut self) -> ActuationResult<()> {
        let viewport = self.surface.viewport().await?;
        let action = self.reader.wander(viewport);
        self.perform(action).await
    }

    async fn perform(&mut self, action: ReadAction) -> ActuationResult<()> {
        match action {
            ReadAction::Scroll { delta_y, delay } => {
                self.surface.scroll_by(delta_y).await?;
                self.pacer.wait("scroll", delay).await
            }
            ReadAction::Dwell(d) => self.pacer.wait("reading", d).await,
            ReadAction::Wander { target, dwell } => {
                self.move_to(target).await?;
                self.pacer.wait("wander", dwell).await
            }
        }
    }
}
