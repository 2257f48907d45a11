//! Opportunity workflow status enumeration.

use std::fmt;

use serde::{Deserialize, Serialize};

use opptrack_core::AppError;

/// Integer-coded workflow status of an opportunity.
///
/// The numeric codes are part of the stored data model and must not be
/// reordered. Status `TransferredToRfp` (11) is system-assigned by the
/// transfer operation and never accepted from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i32", into = "i32")]
#[repr(i32)]
pub enum OpportunityStatus {
    /// Initial state, forced at creation.
    Entered = 1,
    /// Decision to pursue the bid.
    Go = 2,
    /// Decision not to pursue the bid.
    NoGo = 3,
    /// Still under consideration.
    Consider = 4,
    /// Proposal submitted to the funding agency.
    Submitted = 5,
    /// Bid lost.
    Lost = 6,
    /// Bid won.
    Won = 7,
    /// Bid cancelled by the agency.
    Cancelled = 8,
    /// No result received within the validity window.
    AssumedLost = 9,
    /// Outcome not applicable.
    NotApplicable = 10,
    /// EOI transferred into a linked RFP; terminal for the parent.
    TransferredToRfp = 11,
}

impl OpportunityStatus {
    /// The stored integer code.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Human-readable label, as shown in screens and messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Entered => "Entered",
            Self::Go => "Go",
            Self::NoGo => "NO-Go",
            Self::Consider => "Consider",
            Self::Submitted => "Submitted",
            Self::Lost => "Lost",
            Self::Won => "Won",
            Self::Cancelled => "Cancelled",
            Self::AssumedLost => "Assumed Lost",
            Self::NotApplicable => "N/A",
            Self::TransferredToRfp => "Transferred to RFP",
        }
    }

    /// Parse a stored integer code.
    pub fn from_code(code: i32) -> Result<Self, AppError> {
        match code {
            1 => Ok(Self::Entered),
            2 => Ok(Self::Go),
            3 => Ok(Self::NoGo),
            4 => Ok(Self::Consider),
            5 => Ok(Self::Submitted),
            6 => Ok(Self::Lost),
            7 => Ok(Self::Won),
            8 => Ok(Self::Cancelled),
            9 => Ok(Self::AssumedLost),
            10 => Ok(Self::NotApplicable),
            11 => Ok(Self::TransferredToRfp),
            other => Err(AppError::validation(format!(
                "Invalid opportunity status code: {other}"
            ))),
        }
    }

    /// Whether this status records a final bid outcome and therefore
    /// requires a result date to enter.
    pub fn requires_result_date(&self) -> bool {
        matches!(
            self,
            Self::Lost | Self::Won | Self::Cancelled | Self::AssumedLost
        )
    }

    /// Whether this status ends the normal workflow for the record.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Lost
                | Self::Won
                | Self::Cancelled
                | Self::AssumedLost
                | Self::NotApplicable
                | Self::TransferredToRfp
        )
    }

    /// Whether a caller may request this status directly.
    ///
    /// `TransferredToRfp` is only ever assigned by the transfer operation.
    pub fn is_user_selectable(&self) -> bool {
        !matches!(self, Self::TransferredToRfp)
    }
}

impl TryFrom<i32> for OpportunityStatus {
    type Error = AppError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<OpportunityStatus> for i32 {
    fn from(status: OpportunityStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in 1..=11 {
            let status = OpportunityStatus::from_code(code).expect("valid code");
            assert_eq!(status.code(), code);
        }
        assert!(OpportunityStatus::from_code(0).is_err());
        assert!(OpportunityStatus::from_code(12).is_err());
    }

    #[test]
    fn test_result_date_statuses() {
        assert!(OpportunityStatus::Lost.requires_result_date());
        assert!(OpportunityStatus::Won.requires_result_date());
        assert!(OpportunityStatus::Cancelled.requires_result_date());
        assert!(OpportunityStatus::AssumedLost.requires_result_date());
        assert!(!OpportunityStatus::Submitted.requires_result_date());
        assert!(!OpportunityStatus::NotApplicable.requires_result_date());
    }

    #[test]
    fn test_transfer_status_not_user_selectable() {
        assert!(!OpportunityStatus::TransferredToRfp.is_user_selectable());
        assert!(OpportunityStatus::Won.is_user_selectable());
    }

    #[test]
    fn test_labels() {
        assert_eq!(OpportunityStatus::NoGo.label(), "NO-Go");
        assert_eq!(
            OpportunityStatus::TransferredToRfp.label(),
            "Transferred to RFP"
        );
    }
}
