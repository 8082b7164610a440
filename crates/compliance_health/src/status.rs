//! The health status lattice (§4.10): "Overall = worst component;
//! Unhealthy dominates Degraded dominates Healthy." `Unknown` ranks above
//! `Healthy` — a probe that could not determine a status is treated as
//! worse than one that affirmatively passed, but better than a probe that
//! affirmatively found a problem.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Unknown,
    Degraded,
    Unhealthy,
}

impl Health {
    fn rank(self) -> u8 {
        match self {
            Health::Healthy => 0,
            Health::Unknown => 1,
            Health::Degraded => 2,
            Health::Unhealthy => 3,
        }
    }

    /// The more severe of `self` and `other`.
    pub fn worst(self, other: Health) -> Health {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }

    /// Fold an iterator of component statuses into the overall status.
    /// An empty iterator is `Unknown` — no component was checked.
    pub fn overall(statuses: impl IntoIterator<Item = Health>) -> Health {
        let mut iter = statuses.into_iter();
        let Some(first) = iter.next() else {
            return Health::Unknown;
        };
        iter.fold(first, Health::worst)
    }
}
