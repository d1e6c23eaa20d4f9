//! Purchase/payment/upload state machines
//!
//! Both the purchase ledger and the payment record share one state machine:
//! `pending -> {paid, failed, cancelled}` and `paid -> refunded`. Every other
//! edge is rejected. Upload sessions follow the same shape with their own
//! terminal vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Shared status for purchases and payments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

impl FlowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStatus::Pending => "pending",
            FlowStatus::Paid => "paid",
            FlowStatus::Failed => "failed",
            FlowStatus::Cancelled => "cancelled",
            FlowStatus::Refunded => "refunded",
        }
    }

    /// Is `self -> to` a forward edge of the state machine?
    ///
    /// Self-transitions are not forward edges: a redelivered webhook carrying
    /// the current status must be collapsed, not re-applied.
    pub fn can_transition(&self, to: FlowStatus) -> bool {
        matches!(
            (self, to),
            (
                FlowStatus::Pending,
                FlowStatus::Paid | FlowStatus::Failed | FlowStatus::Cancelled
            ) | (FlowStatus::Paid, FlowStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FlowStatus::Pending | FlowStatus::Paid)
    }
}

impl Display for FlowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FlowStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FlowStatus::Pending),
            "paid" => Ok(FlowStatus::Paid),
            "failed" => Ok(FlowStatus::Failed),
            "cancelled" => Ok(FlowStatus::Cancelled),
            "refunded" => Ok(FlowStatus::Refunded),
            _ => Err(anyhow::anyhow!("Invalid flow status: {}", s)),
        }
    }
}

/// Lifecycle of one multipart upload session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Completed,
    Error,
    Cancelled,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
            UploadStatus::Cancelled => "cancelled",
        }
    }

    /// The provider-side multipart session id is only usable while uploading.
    pub fn session_open(&self) -> bool {
        matches!(self, UploadStatus::Uploading)
    }

    pub fn can_transition(&self, to: UploadStatus) -> bool {
        matches!(
            (self, to),
            (
                UploadStatus::Uploading,
                UploadStatus::Completed | UploadStatus::Error | UploadStatus::Cancelled
            )
        )
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(UploadStatus::Uploading),
            "completed" => Ok(UploadStatus::Completed),
            "error" => Ok(UploadStatus::Error),
            "cancelled" => Ok(UploadStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid upload status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_forward_edges() {
        assert!(FlowStatus::Pending.can_transition(FlowStatus::Paid));
        assert!(FlowStatus::Pending.can_transition(FlowStatus::Failed));
        assert!(FlowStatus::Pending.can_transition(FlowStatus::Cancelled));
        assert!(!FlowStatus::Pending.can_transition(FlowStatus::Refunded));
    }

    #[test]
    fn test_refund_only_from_paid() {
        assert!(FlowStatus::Paid.can_transition(FlowStatus::Refunded));
        assert!(!FlowStatus::Failed.can_transition(FlowStatus::Refunded));
        assert!(!FlowStatus::Cancelled.can_transition(FlowStatus::Refunded));
    }

    #[test]
    fn test_no_backward_or_self_edges() {
        // Redelivered webhooks carrying the current or an earlier status must
        // be collapsed, never re-applied.
        assert!(!FlowStatus::Paid.can_transition(FlowStatus::Pending));
        assert!(!FlowStatus::Paid.can_transition(FlowStatus::Paid));
        assert!(!FlowStatus::Refunded.can_transition(FlowStatus::Paid));
        assert!(!FlowStatus::Failed.can_transition(FlowStatus::Paid));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!FlowStatus::Pending.is_terminal());
        assert!(!FlowStatus::Paid.is_terminal());
        assert!(FlowStatus::Failed.is_terminal());
        assert!(FlowStatus::Cancelled.is_terminal());
        assert!(FlowStatus::Refunded.is_terminal());
    }

    #[test]
    fn test_upload_session_open_only_while_uploading() {
        assert!(UploadStatus::Uploading.session_open());
        assert!(!UploadStatus::Completed.session_open());
        assert!(!UploadStatus::Error.session_open());
        assert!(!UploadStatus::Cancelled.session_open());
    }

    #[test]
    fn test_upload_terminal_states_reject_all_edges() {
        for terminal in [
            UploadStatus::Completed,
            UploadStatus::Error,
            UploadStatus::Cancelled,
        ] {
            assert!(!terminal.can_transition(UploadStatus::Uploading));
            assert!(!terminal.can_transition(UploadStatus::Completed));
        }
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [
            FlowStatus::Pending,
            FlowStatus::Paid,
            FlowStatus::Failed,
            FlowStatus::Cancelled,
            FlowStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<FlowStatus>().unwrap(), status);
        }
    }
}
