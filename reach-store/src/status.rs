use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Where a target stands in the outreach pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Discovered, nothing attempted yet.
    Found,
    /// Connection request confirmed sent.
    Invited,
    /// A request is outstanding and not yet accepted.
    Pending,
    AlreadyConnected,
    /// Reaching this target needs a paid messaging tier.
    PremiumOnly,
    /// Follow-up message delivered.
    Messaged,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 6] = [
        LifecycleStatus::Found,
        LifecycleStatus::Invited,
        LifecycleStatus::Pending,
        LifecycleStatus::AlreadyConnected,
        LifecycleStatus::PremiumOnly,
        LifecycleStatus::Messaged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Found => "found",
            LifecycleStatus::Invited => "invited",
            LifecycleStatus::Pending => "pending",
            LifecycleStatus::AlreadyConnected => "already_connected",
            LifecycleStatus::PremiumOnly => "premium_only",
            LifecycleStatus::Messaged => "messaged",
        }
    }

    /// States this one may move to.
    ///
    /// `pending` may repeat so a re-check can refresh its position in the
    /// follow-up queue.
    pub fn successors(&self) -> &'static [LifecycleStatus] {
        use LifecycleStatus::*;
        match self {
            Found => &[Invited, Pending, AlreadyConnected, PremiumOnly],
            Invited => &[Messaged, Pending, PremiumOnly],
            Pending => &[Messaged, Pending, PremiumOnly],
            AlreadyConnected | PremiumOnly | Messaged => &[],
        }
    }

    pub fn can_become(&self, next: LifecycleStatus) -> bool {
        self.successors().contains(&next)
    }

    /// No further automated transition is attempted from here.
    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StoreError::UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleStatus::*;
    use super::*;

    #[test]
    fn names_round_trip_and_unknowns_fail() {
        for s in LifecycleStatus::ALL {
            assert_eq!(s.as_str().parse::<LifecycleStatus>().unwrap(), s);
        }
        assert!("connected".parse::<LifecycleStatus>().is_err());
        assert!("Found".parse::<LifecycleStatus>().is_err());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(AlreadyConnected.is_terminal());
        assert!(PremiumOnly.is_terminal());
        assert!(Messaged.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn found_cannot_skip_to_messaged() {
        assert!(!Found.can_become(Messaged));
        assert!(Found.can_become(Pending));
        assert!(Invited.can_become(Messaged));
        assert!(!Invited.can_become(Found));
        assert!(!Invited.can_become(AlreadyConnected));
    }
}
