//! Outreach automation on top of the driver and store layers.
//!
//! - [`guard`]: schedule window and daily quota gates
//! - [`session`]: credential bundle persistence and the sign-in state machine
//! - [`linkedin`]: page protocols for search, invitation and messaging visits
//! - [`orchestrator`]: pulls targets from the store, runs visits, records outcomes
pub mod guard;
pub mod linkedin;
pub mod orchestrator;
pub mod session;

pub use guard::{Operation, QuotaBudget, QuotaGuard, ScheduleGuard, ScheduleVerdict};
pub use orchestrator::{Orchestrator, RunReport, RunTally, StageTally};
pub use session::{AuthPath, Credentials, SessionError, SessionManager, SessionSettings};

use reach_common::ReachError;
use reach_drivers::ActuationError;
use reach_store::StoreError;

/// A failure that ends a run.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Actuation(#[from] ActuationError),
}

impl RunError {
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            RunError::Actuation(ActuationError::Interrupted(_))
                | RunError::Session(SessionError::Actuation(ActuationError::Interrupted(_)))
        )
    }
}

impl From<RunError> for ReachError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Store(e) => e.into(),
            RunError::Session(e) => e.into(),
            RunError::Actuation(ActuationError::Interrupted(_)) => ReachError::Interrupted,
            RunError::Actuation(ActuationError::Surface(e)) => ReachError::Driver(e),
        }
    }
}
