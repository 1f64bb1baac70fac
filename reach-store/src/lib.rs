//! Durable record of every discovered target and its lifecycle.
//!
//! - [`TargetUrl`]: canonical identity of a target
//! - [`LifecycleStatus`]: closed status enum with its transition rules
//! - [`TargetStore`]: SQLite-backed store honouring the query contract the
//!   orchestrator and the quota guard rely on
mod status;
mod store;
mod target_url;

pub use status::LifecycleStatus;
pub use store::{InsertOutcome, SelectOrder, StoreStats, TargetRecord, TargetStore, Transition};
pub use target_url::TargetUrl;

/// Errors raised at the store boundary.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("not a target url: {0}")]
    InvalidUrl(String),

    #[error("unknown lifecycle status `{0}`")]
    UnknownStatus(String),

    #[error("illegal transition for {url}: {from} -> {to}")]
    IllegalTransition {
        url: String,
        from: LifecycleStatus,
        to: LifecycleStatus,
    },

    #[error("no target recorded for {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for reach_common::ReachError {
    fn from(err: StoreError) -> Self {
        reach_common::ReachError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
