use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents, TransactionId, format_cents};

pub type WithdrawalRequestId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

/// Something that can happen to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalEvent {
    Approve,
    Reject,
    Cancel,
}

/// An admin decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestAction {
    Approved,
    Rejected,
}

impl RequestAction {
    pub fn event(&self) -> WithdrawalEvent {
        match self {
            RequestAction::Approved => WithdrawalEvent::Approve,
            RequestAction::Rejected => WithdrawalEvent::Reject,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approve" | "approved" => Some(RequestAction::Approved),
            "reject" | "rejected" => Some(RequestAction::Rejected),
            _ => None,
        }
    }
}

impl WithdrawalStatus {
    pub const ALL: [WithdrawalStatus; 4] = [
        WithdrawalStatus::Pending,
        WithdrawalStatus::Approved,
        WithdrawalStatus::Rejected,
        WithdrawalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(WithdrawalStatus::Pending),
            "approved" => Some(WithdrawalStatus::Approved),
            "rejected" => Some(WithdrawalStatus::Rejected),
            "cancelled" => Some(WithdrawalStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }

    /// The only place request state changes are decided.
    /// PENDING moves exactly once; terminal states accept nothing.
    pub fn transition(self, event: WithdrawalEvent) -> Result<WithdrawalStatus, TransitionError> {
        match (self, event) {
            (WithdrawalStatus::Pending, WithdrawalEvent::Approve) => Ok(WithdrawalStatus::Approved),
            (WithdrawalStatus::Pending, WithdrawalEvent::Reject) => Ok(WithdrawalStatus::Rejected),
            (WithdrawalStatus::Pending, WithdrawalEvent::Cancel) => Ok(WithdrawalStatus::Cancelled),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: WithdrawalStatus,
    pub event: WithdrawalEvent,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot {:?} a request with status {}",
            self.event, self.from
        )
    }
}

impl std::error::Error for TransitionError {}

/// A user's ask to be paid out, gated by an admin.
/// Filing one moves no money; only approval does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalRequestId,
    pub account_id: AccountId,
    pub amount: Cents,
    pub description: String,
    pub status: WithdrawalStatus,
    pub admin_id: Option<AccountId>,
    pub admin_note: Option<String>,
    /// Set iff the request was approved
    pub transaction_id: Option<TransactionId>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    pub fn new(account_id: AccountId, amount: Cents, description: Option<String>) -> Self {
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Withdrawal request - {}", format_cents(amount)));
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            description,
            status: WithdrawalStatus::Pending,
            admin_id: None,
            admin_note: None,
            transaction_id: None,
            requested_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Apply an event, stamping processed_at. The request is untouched on error.
    pub fn apply(&mut self, event: WithdrawalEvent, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status = self.status.transition(event)?;
        self.processed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_accepts_every_event_once() {
        assert_eq!(
            WithdrawalStatus::Pending.transition(WithdrawalEvent::Approve),
            Ok(WithdrawalStatus::Approved)
        );
        assert_eq!(
            WithdrawalStatus::Pending.transition(WithdrawalEvent::Reject),
            Ok(WithdrawalStatus::Rejected)
        );
        assert_eq!(
            WithdrawalStatus::Pending.transition(WithdrawalEvent::Cancel),
            Ok(WithdrawalStatus::Cancelled)
        );
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        for status in WithdrawalStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for event in [
                WithdrawalEvent::Approve,
                WithdrawalEvent::Reject,
                WithdrawalEvent::Cancel,
            ] {
                assert_eq!(
                    status.transition(event),
                    Err(TransitionError { from: status, event })
                );
            }
        }
    }

    #[test]
    fn test_apply_leaves_request_untouched_on_error() {
        let mut request = WithdrawalRequest::new(Uuid::new_v4(), 5000, None);
        let now = Utc::now();
        request.apply(WithdrawalEvent::Reject, now).unwrap();
        assert_eq!(request.status, WithdrawalStatus::Rejected);
        assert_eq!(request.processed_at, Some(now));

        let later = Utc::now();
        assert!(request.apply(WithdrawalEvent::Approve, later).is_err());
        assert_eq!(request.status, WithdrawalStatus::Rejected);
        assert_eq!(request.processed_at, Some(now));
    }

    #[test]
    fn test_default_description() {
        let request = WithdrawalRequest::new(Uuid::new_v4(), 500000, Some("  ".into()));
        assert_eq!(request.description, "Withdrawal request - 5000.00");

        let request = WithdrawalRequest::new(Uuid::new_v4(), 100, Some("school fees".into()));
        assert_eq!(request.description, "school fees");
    }

    #[test]
    fn test_request_action_parsing() {
        assert_eq!(RequestAction::from_str("APPROVED"), Some(RequestAction::Approved));
        assert_eq!(RequestAction::from_str("reject"), Some(RequestAction::Rejected));
        assert_eq!(RequestAction::from_str("cancel"), None);
        assert_eq!(RequestAction::Approved.event(), WithdrawalEvent::Approve);
    }
}
