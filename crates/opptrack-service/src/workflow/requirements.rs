//! Per-status data requirements.
//!
//! Every mutation path runs the same checks against the fully merged
//! candidate record, so a requirement can never be bypassed by choosing
//! a different entry point. Violations are reported per field, all at
//! once, rather than failing on the first problem.

use chrono::NaiveDate;

use opptrack_core::result::AppResult;
use opptrack_core::types::FieldErrors;
use opptrack_core::AppError;
use opptrack_entity::opportunity::{Opportunity, OpportunityStatus};

pub const MSG_TITLE_REQUIRED: &str = "Title is required";
pub const MSG_REF_NO_REQUIRED: &str = "Reference number is required";
pub const MSG_PROPOSAL_LEAD_REQUIRED: &str = "Proposal Lead is required";
pub const MSG_LEAD_UNIT_REQUIRED: &str = "Lead Unit is required";
pub const MSG_SUBMISSION_DATE_REQUIRED: &str = "Please provide a submission date";
pub const MSG_LEAD_INSTITUTE_REQUIRED: &str = "Select a Lead Organization";
pub const MSG_RESULT_DATE_REQUIRED: &str = "Result date is required";
pub const MSG_RESULT_BEFORE_SUBMISSION: &str = "Result date cannot be before the submission date";
pub const MSG_RESULT_IN_FUTURE: &str = "Result date cannot be in the future";
pub const MSG_CURRENCY_REQUIRED: &str = "Please select a currency.";
pub const MSG_STATUS_NOT_SELECTABLE: &str =
    "The Transferred to RFP status is assigned by the transfer operation";

/// Which mutation path produced the candidate under validation.
///
/// Most requirements apply everywhere; the few that differ (the lead
/// institute is only demanded by the dedicated submit operation, and
/// only general edits re-check the title) branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Creation or general update.
    General,
    /// The status-only update operation.
    StatusOnly,
    /// The dedicated submit operation.
    Submit,
}

/// Reject statuses a caller may not request directly.
pub fn validate_requested_status(status: OpportunityStatus) -> AppResult<()> {
    if status.is_user_selectable() {
        Ok(())
    } else {
        let mut errors = FieldErrors::new();
        errors.add("status", MSG_STATUS_NOT_SELECTABLE);
        Err(AppError::validation_fields(errors))
    }
}

/// Check a fully merged candidate against the requirement table.
///
/// `today` is passed in rather than read from the clock so the future
/// check is deterministic under test.
pub fn validate_candidate(
    candidate: &Opportunity,
    entry: EntryPoint,
    today: NaiveDate,
) -> AppResult<()> {
    let mut errors = FieldErrors::new();

    if entry == EntryPoint::General {
        if is_blank(candidate.ref_no.as_str()) {
            errors.add("ref_no", MSG_REF_NO_REQUIRED);
        }
        if candidate.title.as_deref().is_none_or(is_blank) {
            errors.add("title", MSG_TITLE_REQUIRED);
        }
    }

    match candidate.status {
        OpportunityStatus::Go => {
            if candidate.proposal_lead_id.is_none() {
                errors.add("proposal_lead_id", MSG_PROPOSAL_LEAD_REQUIRED);
            }
            if candidate.lead_unit_id.is_none() {
                errors.add("lead_unit_id", MSG_LEAD_UNIT_REQUIRED);
            }
        }
        OpportunityStatus::Submitted => {
            if candidate.submission_date.is_none() {
                errors.add("submission_date", MSG_SUBMISSION_DATE_REQUIRED);
            }
            if entry == EntryPoint::Submit && candidate.lead_institute_id.is_none() {
                errors.add("lead_institute_id", MSG_LEAD_INSTITUTE_REQUIRED);
            }
        }
        status if status.requires_result_date() => match candidate.result_date {
            None => errors.add("result_date", MSG_RESULT_DATE_REQUIRED),
            Some(result_date) => {
                if candidate
                    .submission_date
                    .is_some_and(|submitted| result_date < submitted)
                {
                    errors.add("result_date", MSG_RESULT_BEFORE_SUBMISSION);
                }
                if result_date > today {
                    errors.add("result_date", MSG_RESULT_IN_FUTURE);
                }
            }
        },
        _ => {}
    }

    let has_amount = candidate.proposal_amount.is_some() || candidate.net_amount.is_some();
    if has_amount && candidate.currency.as_deref().is_none_or(is_blank) {
        errors.add("currency", MSG_CURRENCY_REQUIRED);
    }

    errors.into_result().map_err(AppError::validation_fields)
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use opptrack_entity::opportunity::NewOpportunity;

    use super::*;

    fn candidate() -> Opportunity {
        let new = NewOpportunity {
            ref_no: "EOI-2026-014".to_string(),
            title: Some("Water Access Baseline Study".to_string()),
            ..Default::default()
        };
        Opportunity::from_new(&new, Uuid::new_v4())
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn field_errors(result: AppResult<()>) -> FieldErrors {
        match result {
            Err(err) => err.fields.expect("validation error with fields"),
            Ok(()) => panic!("expected validation failure"),
        }
    }

    #[test]
    fn test_entered_candidate_passes() {
        let opp = candidate();
        assert!(validate_candidate(&opp, EntryPoint::General, today()).is_ok());
    }

    #[test]
    fn test_go_requires_both_lead_fields() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::Go;

        let errors = field_errors(validate_candidate(&opp, EntryPoint::General, today()));
        assert_eq!(
            errors.get("proposal_lead_id"),
            Some(&[MSG_PROPOSAL_LEAD_REQUIRED.to_string()][..])
        );
        assert_eq!(
            errors.get("lead_unit_id"),
            Some(&[MSG_LEAD_UNIT_REQUIRED.to_string()][..])
        );
    }

    #[test]
    fn test_go_passes_with_leads_assigned() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::Go;
        opp.proposal_lead_id = Some(Uuid::new_v4());
        opp.lead_unit_id = Some(Uuid::new_v4());
        assert!(validate_candidate(&opp, EntryPoint::StatusOnly, today()).is_ok());
    }

    #[test]
    fn test_submitted_requires_submission_date() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::Submitted;

        let errors = field_errors(validate_candidate(&opp, EntryPoint::General, today()));
        assert!(errors.contains("submission_date"));
        // Lead institute is only demanded by the submit operation.
        assert!(!errors.contains("lead_institute_id"));
    }

    #[test]
    fn test_submit_entry_requires_lead_institute() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::Submitted;
        opp.submission_date = Some(today());

        let errors = field_errors(validate_candidate(&opp, EntryPoint::Submit, today()));
        assert_eq!(
            errors.get("lead_institute_id"),
            Some(&[MSG_LEAD_INSTITUTE_REQUIRED.to_string()][..])
        );
    }

    #[test]
    fn test_outcome_statuses_require_result_date() {
        for status in [
            OpportunityStatus::Lost,
            OpportunityStatus::Won,
            OpportunityStatus::Cancelled,
            OpportunityStatus::AssumedLost,
        ] {
            let mut opp = candidate();
            opp.status = status;
            let errors = field_errors(validate_candidate(&opp, EntryPoint::StatusOnly, today()));
            assert_eq!(
                errors.get("result_date"),
                Some(&[MSG_RESULT_DATE_REQUIRED.to_string()][..]),
                "status {status}"
            );
        }
    }

    #[test]
    fn test_result_date_before_submission_rejected() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::Won;
        opp.submission_date = Some(today());
        opp.result_date = Some(today() - Duration::days(1));

        let errors = field_errors(validate_candidate(&opp, EntryPoint::StatusOnly, today()));
        assert_eq!(
            errors.get("result_date"),
            Some(&[MSG_RESULT_BEFORE_SUBMISSION.to_string()][..])
        );
    }

    #[test]
    fn test_result_date_equal_to_submission_accepted() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::Won;
        opp.submission_date = Some(today());
        opp.result_date = Some(today());
        assert!(validate_candidate(&opp, EntryPoint::StatusOnly, today()).is_ok());
    }

    #[test]
    fn test_result_date_in_future_rejected() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::Lost;
        opp.result_date = Some(today() + Duration::days(1));

        let errors = field_errors(validate_candidate(&opp, EntryPoint::StatusOnly, today()));
        assert_eq!(
            errors.get("result_date"),
            Some(&[MSG_RESULT_IN_FUTURE.to_string()][..])
        );
    }

    #[test]
    fn test_not_applicable_needs_no_result_date() {
        let mut opp = candidate();
        opp.status = OpportunityStatus::NotApplicable;
        assert!(validate_candidate(&opp, EntryPoint::StatusOnly, today()).is_ok());
    }

    #[test]
    fn test_amount_without_currency_rejected() {
        let mut opp = candidate();
        opp.proposal_amount = Some(Decimal::new(250_000, 0));

        let errors = field_errors(validate_candidate(&opp, EntryPoint::General, today()));
        assert_eq!(
            errors.get("currency"),
            Some(&[MSG_CURRENCY_REQUIRED.to_string()][..])
        );
    }

    #[test]
    fn test_net_amount_alone_also_needs_currency() {
        let mut opp = candidate();
        opp.net_amount = Some(Decimal::new(90_000, 0));
        assert!(validate_candidate(&opp, EntryPoint::General, today()).is_err());

        opp.currency = Some("EUR".to_string());
        assert!(validate_candidate(&opp, EntryPoint::General, today()).is_ok());
    }

    #[test]
    fn test_missing_title_flagged_on_general_entry_only() {
        let mut opp = candidate();
        opp.title = None;

        let errors = field_errors(validate_candidate(&opp, EntryPoint::General, today()));
        assert!(errors.contains("title"));

        assert!(validate_candidate(&opp, EntryPoint::StatusOnly, today()).is_ok());
    }

    #[test]
    fn test_transfer_status_cannot_be_requested() {
        let err = validate_requested_status(OpportunityStatus::TransferredToRfp)
            .expect_err("transfer status must be rejected");
        assert!(err.is_validation());
        assert!(validate_requested_status(OpportunityStatus::Won).is_ok());
    }
}
