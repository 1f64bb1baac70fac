//! Run gates: a local time-of-day window and per-operation daily caps.
//!
//! Quota usage is never cached across runs. It is recounted from the store's
//! transition history on every call, so a crashed run cannot leave a counter
//! out of step with the records.

use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use reach_config::{LimitsConfig, ScheduleWindow};
use reach_store::{LifecycleStatus, TargetStore};
use tracing::info;

/// A throttled class of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Discovery,
    Invitation,
    Messaging,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Discovery => "discovery",
            Operation::Invitation => "invitation",
            Operation::Messaging => "messaging",
        }
    }

    /// The status whose arrivals count against this operation's cap.
    pub fn produces(&self) -> LifecycleStatus {
        match self {
            Operation::Discovery => LifecycleStatus::Found,
            Operation::Invitation => LifecycleStatus::Invited,
            Operation::Messaging => LifecycleStatus::Messaged,
        }
    }

    pub fn daily_cap(&self, limits: &LimitsConfig) -> u32 {
        match self {
            Operation::Discovery => limits.daily_discoveries,
            Operation::Invitation => limits.daily_invitations,
            Operation::Messaging => limits.daily_messages,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleVerdict {
    Open,
    ClosedDay(Weekday),
    BeforeStart,
    AfterEnd,
}

impl ScheduleVerdict {
    pub fn is_open(&self) -> bool {
        matches!(self, ScheduleVerdict::Open)
    }
}

impl fmt::Display for ScheduleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleVerdict::Open => f.write_str("inside the working window"),
            ScheduleVerdict::ClosedDay(day) => write!(f, "{day} is not a working day"),
            ScheduleVerdict::BeforeStart => f.write_str("before the working window opens"),
            ScheduleVerdict::AfterEnd => f.write_str("after the working window closed"),
        }
    }
}

/// Time-of-day and day-of-week gate. Start is inclusive, end exclusive.
#[derive(Debug, Clone)]
pub struct ScheduleGuard {
    window: ScheduleWindow,
}

impl ScheduleGuard {
    pub fn new(window: ScheduleWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &ScheduleWindow {
        &self.window
    }

    pub fn check_at(&self, at: NaiveDateTime) -> ScheduleVerdict {
        let day = at.weekday();
        if !self.window.weekdays.contains(&day) {
            return ScheduleVerdict::ClosedDay(day);
        }
        let time = at.time();
        if time < self.window.start {
            ScheduleVerdict::BeforeStart
        } else if time >= self.window.end {
            ScheduleVerdict::AfterEnd
        } else {
            ScheduleVerdict::Open
        }
    }

    pub fn check_now(&self) -> ScheduleVerdict {
        self.check_at(Local::now().naive_local())
    }
}

/// Today's standing for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaBudget {
    pub operation: Operation,
    pub cap: u32,
    pub used: u32,
}

impl QuotaBudget {
    pub fn remaining(&self) -> u32 {
        self.cap.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.cap
    }

    /// Charge one unit produced by the current run.
    pub fn consume(&mut self) {
        self.used = self.used.saturating_add(1);
    }
}

#[derive(Debug, Clone)]
pub struct QuotaGuard {
    limits: LimitsConfig,
}

impl QuotaGuard {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Count today's arrivals into `op`'s produced state since `day_start`.
    pub async fn budget(
        &self,
        store: &TargetStore,
        op: Operation,
        day_start: DateTime<Utc>,
    ) -> reach_store::Result<QuotaBudget> {
        let used = store
            .count_transitions_since(op.produces(), day_start)
            .await?;
        let budget = QuotaBudget {
            operation: op,
            cap: op.daily_cap(&self.limits),
            used: u32::try_from(used).unwrap_or(u32::MAX),
        };
        info!(
            operation = %op,
            used = budget.used,
            cap = budget.cap,
            "guard.quota"
        );
        Ok(budget)
    }
}

/// Midnight of `now`'s calendar day in its own zone, as UTC.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        // A zone that skips midnight: fall back to reading it as UTC.
        .unwrap_or_else(|| midnight.and_utc())
}

/// Start of the current local calendar day.
pub fn start_of_today() -> DateTime<Utc> {
    start_of_day(&Local::now())
}
