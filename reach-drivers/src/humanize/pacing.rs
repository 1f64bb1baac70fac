//! Named, cancellable suspension points.
//!
//! Every pause in a run goes through a [`Pacer`]: it draws from a [`Span`]
//! with its own random source, scales by the configured delay factor, and
//! races the shared cancellation token so Ctrl-C ends the run between
//! actuations instead of mid-sleep.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A labelled pause range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub label: &'static str,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Span {
    pub const fn new(label: &'static str, min_ms: u64, max_ms: u64) -> Self {
        Self {
            label,
            min_ms,
            max_ms,
        }
    }
}

/// Hesitation before pressing a located control.
pub const AIM: Span = Span::new("aim", 300, 700);
/// Settle time after a navigation.
pub const PAGE_SETTLE: Span = Span::new("page_settle", 2_000, 4_000);
/// Short beat after a click that opens a menu or dialog.
pub const UI_SETTLE: Span = Span::new("ui_settle", 800, 1_500);
/// Pause between fields of a form.
pub const FIELD_GAP: Span = Span::new("field_gap", 400, 900);

/// Failure of a humanised action.
#[derive(thiserror::Error, Debug)]
pub enum ActuationError {
    /// Shutdown was requested while waiting.
    #[error("interrupted during {0}")]
    Interrupted(&'static str),

    /// The action surface reported an error.
    #[error(transparent)]
    Surface(#[from] anyhow::Error),
}

impl ActuationError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ActuationError::Interrupted(_))
    }
}

pub type ActuationResult<T> = std::result::Result<T, ActuationError>;

#[derive(Debug)]
pub struct Pacer {
    rng: StdRng,
    factor: f64,
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(rng: StdRng, factor: f64, cancel: CancellationToken) -> Self {
        Self {
            rng,
            factor: factor.max(0.0),
            cancel,
        }
    }

    pub fn delay_factor(&self) -> f64 {
        self.factor
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Unscaled duration drawn from `span`.
    pub fn draw(&mut self, span: Span) -> Duration {
        let hi = span.max_ms.max(span.min_ms);
        Duration::from_millis(self.rng.gen_range(span.min_ms..=hi))
    }

    /// Wait for a random duration within `span`.
    pub async fn pause(&mut self, span: Span) -> ActuationResult<()> {
        let d = self.draw(span);
        self.wait(span.label, d).await
    }

    /// Wait for an already computed duration, scaled by the delay factor.
    pub async fn wait(&self, label: &'static str, base: Duration) -> ActuationResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ActuationError::Interrupted(label));
        }
        let scaled = base.mul_f64(self.factor);
        if scaled.is_zero() {
            tokio::task::yield_now().await;
            return Ok(());
        }
        trace!(label, ms = scaled.as_millis() as u64, "pacer.wait");
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ActuationError::Interrupted(label)),
            _ = tokio::time::sleep(scaled) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn draw_stays_in_span() {
        let mut p = Pacer::new(StdRng::seed_from_u64(1), 1.0, CancellationToken::new());
        for _ in 0..1_000 {
            let d = p.draw(AIM).as_millis() as u64;
            assert!((300..=700).contains(&d));
        }
    }

    #[test]
    fn negative_factor_is_treated_as_zero() {
        let p = Pacer::new(StdRng::seed_from_u64(1), -3.0, CancellationToken::new());
        assert_eq!(p.delay_factor(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn scaled_wait_elapses_virtual_time() {
        let mut p = Pacer::new(StdRng::seed_from_u64(1), 0.5, CancellationToken::new());
        let start = tokio::time::Instant::now();
        p.pause(Span::new("fixed", 1_000, 1_000)).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_long_wait() {
        let cancel = CancellationToken::new();
        let mut p = Pacer::new(StdRng::seed_from_u64(1), 1.0, cancel.clone());
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        let err = p
            .pause(Span::new("coffee", 60_000, 60_000))
            .await
            .unwrap_err();
        assert!(err.is_interrupted());
    }
}
