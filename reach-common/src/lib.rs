//! Common types shared across the Reach crates.
//!
//! This crate holds the operator-facing error taxonomy, the run-mode and
//! stealth enums that several crates agree on, and the logging initialiser.
//! It stays dependency-light so every crate in the workspace can pull it in.
//!
//! # Overview
//!
//! - [`ReachError`] and [`Result`]: fatal-versus-recoverable error handling
//! - [`RunMode`]: the unit of work selected for one invocation
//! - [`StealthLevel`]: how aggressively the browser hides automation traces
//! - [`observability`]: centralised tracing initialisation
//!
//! # Examples
//!
//! ```rust
//! use reach_common::{ReachError, RunMode};
//!
//! let mode: RunMode = "connect".parse().unwrap();
//! assert_eq!(mode, RunMode::Invitation);
//!
//! let err = ReachError::Config("missing account.email".into());
//! assert_eq!(err.exit_code(), 1);
//! ```
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod observability;

/// The unit of work a single run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Search and record new targets.
    #[serde(alias = "search")]
    Discovery,
    /// Send connection requests to recorded targets.
    #[default]
    #[serde(alias = "connect")]
    Invitation,
    /// Discovery, a short settle, then invitation.
    Demo,
    /// Authenticate and hold the session open for inspection.
    #[serde(alias = "login")]
    Auth,
    /// Follow up with targets that accepted.
    #[serde(alias = "message")]
    Messaging,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Discovery => "discovery",
            RunMode::Invitation => "invitation",
            RunMode::Demo => "demo",
            RunMode::Auth => "auth",
            RunMode::Messaging => "messaging",
        }
    }

    /// Whether this mode performs automated outreach and therefore has to
    /// pass the schedule window.
    pub fn is_scheduled(&self) -> bool {
        !matches!(self, RunMode::Auth)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = ReachError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discovery" | "search" => Ok(RunMode::Discovery),
            "invitation" | "connect" => Ok(RunMode::Invitation),
            "demo" => Ok(RunMode::Demo),
            "auth" | "login" => Ok(RunMode::Auth),
            "messaging" | "message" => Ok(RunMode::Messaging),
            other => Err(ReachError::Config(format!("unknown mode `{other}`"))),
        }
    }
}

/// Browser automation stealth level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    Lightweight,
    #[default]
    Balanced,
    Maximum,
}

/// Errors surfaced to the operator at the process boundary.
///
/// Only configuration and authentication failures are fatal job failures.
/// Per-target failures never reach this type; the orchestrator tallies them.
#[derive(thiserror::Error, Debug)]
pub enum ReachError {
    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The session could not be established.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The target store could not be opened or written.
    #[error("store error: {0}")]
    Store(String),

    /// A driver (browser, webdriver endpoint) reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Shutdown was requested while a wait was in flight.
    #[error("interrupted")]
    Interrupted,
}

impl ReachError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReachError::Config(_) => 1,
            ReachError::Auth(_) => 2,
            ReachError::Store(_) | ReachError::Driver(_) => 3,
            ReachError::Interrupted => 130,
        }
    }
}

/// Convenient alias for results that use [`ReachError`].
pub type Result<T> = std::result::Result<T, ReachError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_with_aliases() {
        assert_eq!("search".parse::<RunMode>().unwrap(), RunMode::Discovery);
        assert_eq!("LOGIN".parse::<RunMode>().unwrap(), RunMode::Auth);
        assert_eq!("message".parse::<RunMode>().unwrap(), RunMode::Messaging);
        assert!("scrape".parse::<RunMode>().is_err());
    }

    #[test]
    fn modes_deserialize_with_aliases() {
        let mode: RunMode = serde_json::from_str("\"connect\"").unwrap();
        assert_eq!(mode, RunMode::Invitation);
    }

    #[test]
    fn only_auth_skips_schedule() {
        assert!(!RunMode::Auth.is_scheduled());
        assert!(RunMode::Demo.is_scheduled());
    }

    #[test]
    fn exit_codes_follow_failure_class() {
        assert_eq!(ReachError::Auth("rejected".into()).exit_code(), 2);
        assert_eq!(ReachError::Interrupted.exit_code(), 130);
        assert_eq!(
            ReachError::Driver(anyhow::anyhow!("webdriver down")).exit_code(),
            3
        );
    }
}
