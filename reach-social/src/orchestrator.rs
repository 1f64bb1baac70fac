//! Drives targets through their lifecycle, one visit at a time.
//!
//! Every stage starts by recounting today's quota from the store, pulls the
//! oldest eligible records bounded by what is left, and charges the budget as
//! it goes. A visit that cannot be completed leaves the record untouched and
//! is tallied as a failure; only store errors and interruption end a run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reach_common::RunMode;
use reach_config::{ReachConfig, SearchConfig, TemplatesConfig};
use reach_drivers::{ActionSurface, ActuationError, ActuationResult, Actuator, Span};
use reach_store::{InsertOutcome, LifecycleStatus, SelectOrder, StoreStats, TargetStore, TargetUrl};
use tracing::{info, warn};

use crate::guard::{start_of_today, Operation, QuotaBudget, QuotaGuard};
use crate::linkedin::invite::{visit_and_invite, InviteOutcome};
use crate::linkedin::message::{visit_and_message, MessageOutcome};
use crate::linkedin::{
    discovery, BREAK_EVERY, COFFEE_BREAK, DEMO_SETTLE, MESSAGE_BREAK, MESSAGE_COOLDOWN,
    SAFETY_SPACING,
};
use crate::RunError;

/// Counters for one stage of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTally {
    pub visited: u32,
    /// Reached the stage's produced state.
    pub succeeded: u32,
    /// Recorded in some other state (pending, connected, premium).
    pub parked: u32,
    /// Left unchanged for a later retry.
    pub failed: u32,
    pub duplicates: u32,
    /// The daily cap was already reached when the stage began.
    pub skipped: bool,
}

/// Stages a run executed; `None` for stages outside its mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    pub discovery: Option<StageTally>,
    pub invitation: Option<StageTally>,
    pub messaging: Option<StageTally>,
}

impl RunTally {
    pub fn failures(&self) -> u32 {
        [self.discovery, self.invitation, self.messaging]
            .iter()
            .flatten()
            .map(|t| t.failed)
            .sum()
    }
}

/// End-of-run snapshot of the store and today's budgets.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: StoreStats,
    pub today: Vec<QuotaBudget>,
}

impl RunReport {
    pub fn log(&self) {
        info!(total = self.stats.total, "report.targets");
        for (status, n) in &self.stats.by_status {
            info!(status = *status, count = *n, "report.status");
        }
        for b in &self.today {
            info!(
                operation = %b.operation,
                used = b.used,
                cap = b.cap,
                "report.today"
            );
        }
    }
}

pub struct Orchestrator<S: ActionSurface> {
    act: Actuator<S>,
    store: TargetStore,
    quota: QuotaGuard,
    templates: TemplatesConfig,
    search: SearchConfig,
    inspect: Duration,
    day_start: Option<DateTime<Utc>>,
}

impl<S: ActionSurface> Orchestrator<S> {
    pub fn new(act: Actuator<S>, store: TargetStore, config: &ReachConfig) -> Self {
        Self {
            act,
            store,
            quota: QuotaGuard::new(config.limits.clone()),
            templates: config.templates.clone(),
            search: config.search.clone(),
            inspect: Duration::from_secs(config.inspect_minutes.saturating_mul(60)),
            day_start: None,
        }
    }

    /// Count quotas from a fixed instant instead of local midnight.
    pub fn with_day_start(mut self, at: DateTime<Utc>) -> Self {
        self.day_start = Some(at);
        self
    }

    pub fn actuator_mut(&mut self) -> &mut Actuator<S> {
        &mut self.act
    }

    pub fn store(&self) -> &TargetStore {
        &self.store
    }

    pub fn into_parts(self) -> (Actuator<S>, TargetStore) {
        (self.act, self.store)
    }

    fn day_start(&self) -> DateTime<Utc> {
        self.day_start.unwrap_or_else(start_of_today)
    }

    async fn budget(&self, op: Operation) -> Result<QuotaBudget, RunError> {
        Ok(self.quota.budget(&self.store, op, self.day_start()).await?)
    }

    /// Execute the unit of work selected by `mode`.
    pub async fn run(&mut self, mode: RunMode) -> Result<RunTally, RunError> {
        info!(mode = %mode, "run.start");
        let mut tally = RunTally::default();
        match mode {
            RunMode::Discovery => tally.discovery = Some(self.discover().await?),
            RunMode::Invitation => tally.invitation = Some(self.invite().await?),
            RunMode::Messaging => tally.messaging = Some(self.message().await?),
            RunMode::Demo => {
                tally.discovery = Some(self.discover().await?);
                self.act.pause(DEMO_SETTLE).await?;
                tally.invitation = Some(self.invite().await?);
            }
            RunMode::Auth => self.hold().await?,
        }
        info!(mode = %mode, failures = tally.failures(), "run.finish");
        Ok(tally)
    }

    /// Search for people and record every new profile as `found`.
    pub async fn discover(&mut self) -> Result<StageTally, RunError> {
        let mut tally = StageTally::default();
        let mut budget = self.budget(Operation::Discovery).await?;
        if budget.is_exhausted() {
            info!(stage = "discovery", used = budget.used, cap = budget.cap, "stage.skip");
            tally.skipped = true;
            return Ok(tally);
        }

        let keyword = self.search.keyword.clone();
        let opened = discovery::open_search(&mut self.act, &keyword).await;
        if !settle(opened, "search")?.unwrap_or(false) {
            tally.failed += 1;
            return Ok(tally);
        }

        let max_pages = self.search.max_pages.max(1);
        for page in 1..=max_pages {
            if budget.is_exhausted() {
                info!(page, "discovery.quota_reached");
                break;
            }
            let harvested = discovery::harvest_page(&mut self.act).await;
            let Some(targets) = settle(harvested, "results")? else {
                tally.failed += 1;
                break;
            };
            tally.visited += 1;

            let mut added = 0u32;
            for url in &targets {
                if budget.is_exhausted() {
                    break;
                }
                match self.store.insert_if_absent(url).await? {
                    InsertOutcome::Inserted => {
                        budget.consume();
                        added += 1;
                    }
                    InsertOutcome::Duplicate => tally.duplicates += 1,
                }
            }
            tally.succeeded += added;
            info!(page, found = targets.len(), added, "discovery.page");

            if page == max_pages || budget.is_exhausted() {
                break;
            }
            let turned = discovery::next_page(&mut self.act).await;
            if !settle(turned, "next_page")?.unwrap_or(false) {
                info!(page, "discovery.last_page");
                break;
            }
        }
        info!(stage = "discovery", added = tally.succeeded, duplicates = tally.duplicates, "stage.finish");
        Ok(tally)
    }

    /// Send connection requests to the oldest `found` targets.
    pub async fn invite(&mut self) -> Result<StageTally, RunError> {
        let mut tally = StageTally::default();
        let mut budget = self.budget(Operation::Invitation).await?;
        if budget.is_exhausted() {
            info!(stage = "invitation", used = budget.used, cap = budget.cap, "stage.skip");
            tally.skipped = true;
            return Ok(tally);
        }

        let batch = self
            .store
            .select_oldest(&[LifecycleStatus::Found], SelectOrder::Created, budget.remaining())
            .await?;
        info!(stage = "invitation", batch = batch.len(), remaining = budget.remaining(), "stage.start");

        let note = self.templates.connect_note.clone();
        for (i, record) in batch.iter().enumerate() {
            if budget.is_exhausted() {
                break;
            }
            tally.visited += 1;
            let visit = visit_and_invite(&mut self.act, &record.url, &note).await;
            let outcome = settle(visit, record.url.as_str())?
                .unwrap_or(InviteOutcome::Unresolved("surface_error"));

            let sent = outcome == InviteOutcome::Invited;
            self.record(&record.url, outcome.status(), sent, &mut tally).await?;
            if sent {
                budget.consume();
            }

            let more = i + 1 < batch.len() && !budget.is_exhausted();
            self.rest(sent, tally.succeeded, more, SAFETY_SPACING, COFFEE_BREAK)
                .await?;
        }
        info!(stage = "invitation", sent = tally.succeeded, failed = tally.failed, "stage.finish");
        Ok(tally)
    }

    /// Follow up with invited or pending targets, least recently checked first.
    pub async fn message(&mut self) -> Result<StageTally, RunError> {
        let mut tally = StageTally::default();
        let mut budget = self.budget(Operation::Messaging).await?;
        if budget.is_exhausted() {
            info!(stage = "messaging", used = budget.used, cap = budget.cap, "stage.skip");
            tally.skipped = true;
            return Ok(tally);
        }

        let batch = self
            .store
            .select_oldest(
                &[LifecycleStatus::Invited, LifecycleStatus::Pending],
                SelectOrder::Updated,
                budget.remaining(),
            )
            .await?;
        info!(stage = "messaging", batch = batch.len(), remaining = budget.remaining(), "stage.start");

        let template = self.templates.follow_up.clone();
        for (i, record) in batch.iter().enumerate() {
            if budget.is_exhausted() {
                break;
            }
            tally.visited += 1;
            let visit = visit_and_message(&mut self.act, &record.url, &template).await;
            let outcome = settle(visit, record.url.as_str())?
                .unwrap_or(MessageOutcome::Unresolved("surface_error"));

            let sent = outcome == MessageOutcome::Messaged;
            self.record(&record.url, outcome.status(), sent, &mut tally).await?;
            if sent {
                budget.consume();
            }

            let more = i + 1 < batch.len() && !budget.is_exhausted();
            self.rest(sent, tally.succeeded, more, MESSAGE_COOLDOWN, MESSAGE_BREAK)
                .await?;
        }
        info!(stage = "messaging", sent = tally.succeeded, failed = tally.failed, "stage.finish");
        Ok(tally)
    }

    async fn record(
        &self,
        url: &TargetUrl,
        status: Option<LifecycleStatus>,
        succeeded: bool,
        tally: &mut StageTally,
    ) -> Result<(), RunError> {
        match status {
            Some(status) => {
                self.store.update_status(url, status).await?;
                if succeeded {
                    tally.succeeded += 1;
                } else {
                    tally.parked += 1;
                }
            }
            None => tally.failed += 1,
        }
        Ok(())
    }

    /// Spacing between visits, with a longer break after every few successes.
    async fn rest(
        &mut self,
        sent: bool,
        successes: u32,
        more: bool,
        spacing: Span,
        long_break: Span,
    ) -> Result<(), RunError> {
        if !more {
            return Ok(());
        }
        settle(self.act.wander().await, "wander")?;
        if sent && successes % BREAK_EVERY == 0 {
            info!(successes, "stage.break");
            self.act.pause(long_break).await?;
        } else {
            self.act.pause(spacing).await?;
        }
        Ok(())
    }

    /// Keep the signed-in browser open for manual inspection.
    pub async fn hold(&mut self) -> Result<(), RunError> {
        let cancel = self.act.cancellation();
        let minute = Duration::from_secs(60);
        let mut left = self.inspect;
        while !left.is_zero() {
            info!(remaining_minutes = left.as_secs().div_ceil(60), "auth.hold");
            let step = left.min(minute);
            tokio::select! {
                _ = cancel.cancelled() => return Err(ActuationError::Interrupted("inspect").into()),
                _ = tokio::time::sleep(step) => {}
            }
            left -= step;
        }
        Ok(())
    }

    pub async fn report(&self) -> Result<RunReport, RunError> {
        let stats = self.store.stats().await?;
        let mut today = Vec::with_capacity(3);
        for op in [Operation::Discovery, Operation::Invitation, Operation::Messaging] {
            today.push(self.budget(op).await?);
        }
        Ok(RunReport { stats, today })
    }
}

/// Separate interruption from a per-visit surface failure.
fn settle<T>(res: ActuationResult<T>, context: &str) -> Result<Option<T>, RunError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_interrupted() => Err(e.into()),
        Err(e) => {
            warn!(context, error = %e, "visit.failed");
            Ok(None)
        }
    }
}
