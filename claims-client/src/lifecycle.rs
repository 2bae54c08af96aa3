//! Claim status state machine and the actor → transition table.
//!
//! ```text
//! SUBMITTED ──(backend, on agent assignment)──▶ IN_REVIEW
//!     │                                            │
//!     └────────────┬───────────────────────────────┘
//!                  ▼  agent / admin, with a response note
//!          APPROVED | REJECTED   (terminal)
//! ```
//!
//! Every check here runs before a mutating gateway call is issued. A failed
//! check is a client-side refusal, distinct from a backend rejection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Claim, Role};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    #[default]
    Submitted,
    InReview,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 4] = [
        ClaimStatus::Submitted,
        ClaimStatus::InReview,
        ClaimStatus::Approved,
        ClaimStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "SUBMITTED",
            ClaimStatus::InReview => "IN_REVIEW",
            ClaimStatus::Approved => "APPROVED",
            ClaimStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ClaimStatus::Approved | ClaimStatus::Rejected)
    }

    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }

    /// Whether the status graph has an edge `self → next`, regardless of who
    /// drives it.
    pub fn can_transition_to(self, next: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self, next),
            (Submitted, InReview)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (InReview, Approved)
                | (InReview, Rejected)
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| TransitionError::UnknownStatus(s.to_string()))
    }
}

/// An agent/admin adjudication. Approve and reject are distinct backend
/// actions, each with its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(self) -> ClaimStatus {
        match self {
            Decision::Approve => ClaimStatus::Approved,
            Decision::Reject => ClaimStatus::Rejected,
        }
    }

    /// Path segment of the backend endpoint for this decision.
    pub fn endpoint(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }
}

impl FromStr for Decision {
    type Err = TransitionError;

    /// Accepts exactly `APPROVED` or `REJECTED`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Ok(Decision::Approve),
            "REJECTED" => Ok(Decision::Reject),
            _ => Err(TransitionError::UnsupportedDecision(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Role {role} may not {action}")]
    RoleNotPermitted { role: Role, action: &'static str },

    #[error("Claim is already {0} and can no longer be changed")]
    Terminal(ClaimStatus),

    #[error("Claim cannot move from {from} to {to}")]
    Illegal { from: ClaimStatus, to: ClaimStatus },

    #[error("Please write a response to the customer before you {0}")]
    MissingResponseNote(&'static str),

    #[error("Only the customer who submitted this claim may delete it")]
    NotOwner,

    #[error("Description has already been verified for this claim")]
    AlreadyVerified,

    #[error("Status must be APPROVED or REJECTED, got '{0}'")]
    UnsupportedDecision(String),

    #[error("Unknown claim status '{0}'")]
    UnknownStatus(String),
}

fn is_staff(role: Role) -> bool {
    matches!(role, Role::Agent | Role::Admin)
}

/// Customers create claims; they enter the lifecycle at SUBMITTED.
pub fn check_create(role: Role) -> Result<ClaimStatus, TransitionError> {
    if role != Role::Customer {
        return Err(TransitionError::RoleNotPermitted {
            role,
            action: "submit claims",
        });
    }
    Ok(ClaimStatus::Submitted)
}

/// A customer may delete their own claim while it is still pending.
pub fn check_delete(session: &Session, claim: &Claim) -> Result<(), TransitionError> {
    if session.role != Role::Customer {
        return Err(TransitionError::RoleNotPermitted {
            role: session.role,
            action: "delete claims",
        });
    }
    let owner = claim.customer.as_ref().and_then(|c| c.email.as_deref());
    if let Some(owner) = owner {
        if !owner.eq_ignore_ascii_case(&session.email) {
            return Err(TransitionError::NotOwner);
        }
    }
    if claim.status.is_terminal() {
        return Err(TransitionError::Terminal(claim.status));
    }
    Ok(())
}

/// Agent/admin adjudication of a pending claim. Returns the trimmed note that
/// must accompany the transition.
pub fn check_decision(
    role: Role,
    current: ClaimStatus,
    decision: Decision,
    note: &str,
) -> Result<String, TransitionError> {
    if !is_staff(role) {
        return Err(TransitionError::RoleNotPermitted {
            role,
            action: "change claim status",
        });
    }
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current));
    }
    if !current.can_transition_to(decision.target()) {
        return Err(TransitionError::Illegal {
            from: current,
            to: decision.target(),
        });
    }
    let note = note.trim();
    if note.is_empty() {
        return Err(TransitionError::MissingResponseNote(decision.verb()));
    }
    Ok(note.to_string())
}

/// `descriptionVerified` only moves false → true, and only by staff.
pub fn check_verify(role: Role, already_verified: bool) -> Result<(), TransitionError> {
    if !is_staff(role) {
        return Err(TransitionError::RoleNotPermitted {
            role,
            action: "verify claim descriptions",
        });
    }
    if already_verified {
        return Err(TransitionError::AlreadyVerified);
    }
    Ok(())
}

/// Staff-only operations that do not touch status (assignment, fraud analysis).
pub fn check_staff(role: Role, action: &'static str) -> Result<(), TransitionError> {
    if !is_staff(role) {
        return Err(TransitionError::RoleNotPermitted { role, action });
    }
    Ok(())
}
