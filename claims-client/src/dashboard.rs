//! Client-side aggregation over a fetched claim list.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::lifecycle::{ClaimStatus, TransitionError};
use crate::models::{Claim, Role};

pub const RECENT_CLAIMS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub total_amount: f64,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl DashboardStats {
    pub fn from_claims(claims: &[Claim]) -> Self {
        claims.iter().fold(Self::default(), |mut stats, claim| {
            stats.total += 1;
            stats.total_amount += claim.amount;
            match claim.status {
                ClaimStatus::Approved => stats.approved += 1,
                ClaimStatus::Rejected => stats.rejected += 1,
                _ => stats.pending += 1,
            }
            stats
        })
    }
}

/// Newest `n` claims by submission date; undated claims sort last.
pub fn recent_claims(claims: &[Claim], n: usize) -> Vec<&Claim> {
    let mut sorted: Vec<&Claim> = claims.iter().collect();
    sorted.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
    sorted.truncate(n);
    sorted
}

/// Which claim list a role sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimScope {
    /// `GET /claims/my`
    Mine,
    /// `GET /claims`
    All,
}

impl ClaimScope {
    pub fn for_role(role: Role) -> Self {
        if role.is_staff() {
            ClaimScope::All
        } else {
            ClaimScope::Mine
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ClaimStatus),
}

impl StatusFilter {
    pub fn matches(self, claim: &Claim) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => claim.status == status,
        }
    }

    pub fn apply(self, claims: Vec<Claim>) -> Vec<Claim> {
        claims.into_iter().filter(|c| self.matches(c)).collect()
    }

    pub fn status(self) -> Option<ClaimStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("ALL"),
            StatusFilter::Only(status) => write!(f, "{status}"),
        }
    }
}
