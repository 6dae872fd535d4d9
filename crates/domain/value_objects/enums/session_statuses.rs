use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    PendingPayment,
    WaitingList,
    Scheduled,
    Completed,
    Cancelled,
}

/// The only ways a session's status may change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionTransition {
    Waitlist,
    Settle,
    Cancel,
    Complete,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot {transition} a session that is {from}")]
pub struct IllegalTransition {
    pub from: SessionStatus,
    pub transition: SessionTransition,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::PendingPayment => "PENDING_PAYMENT",
            SessionStatus::WaitingList => "WAITING_LIST",
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PENDING_PAYMENT" => Some(SessionStatus::PendingPayment),
            "WAITING_LIST" => Some(SessionStatus::WaitingList),
            "SCHEDULED" => Some(SessionStatus::Scheduled),
            "COMPLETED" => Some(SessionStatus::Completed),
            "CANCELLED" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    /// `paid` must be true exactly in these states.
    pub fn implies_paid(&self) -> bool {
        matches!(self, SessionStatus::Scheduled | SessionStatus::Completed)
    }

    pub fn apply(self, transition: SessionTransition) -> Result<SessionStatus, IllegalTransition> {
        if transition.sources().contains(&self) {
            Ok(transition.target())
        } else {
            Err(IllegalTransition {
                from: self,
                transition,
            })
        }
    }
}

impl SessionTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionTransition::Waitlist => "waitlist",
            SessionTransition::Settle => "settle",
            SessionTransition::Cancel => "cancel",
            SessionTransition::Complete => "complete",
        }
    }

    pub fn sources(&self) -> &'static [SessionStatus] {
        match self {
            SessionTransition::Waitlist => &[SessionStatus::PendingPayment],
            SessionTransition::Settle | SessionTransition::Cancel => {
                &[SessionStatus::PendingPayment, SessionStatus::WaitingList]
            }
            SessionTransition::Complete => &[SessionStatus::Scheduled],
        }
    }

    pub fn target(&self) -> SessionStatus {
        match self {
            SessionTransition::Waitlist => SessionStatus::WaitingList,
            SessionTransition::Settle => SessionStatus::Scheduled,
            SessionTransition::Cancel => SessionStatus::Cancelled,
            SessionTransition::Complete => SessionStatus::Completed,
        }
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for SessionTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
