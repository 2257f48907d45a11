//! Opportunity entity model and operation payloads.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::opp_type::OppType;
use super::status::OpportunityStatus;

/// A tracked funding bid/application record.
///
/// Partner institutes and target countries live in join tables and are
/// loaded separately by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Opportunity {
    /// Unique opportunity identifier.
    pub id: Uuid,
    /// Human-assigned unique reference code. Immutable after creation.
    pub ref_no: String,
    /// Opportunity title.
    pub title: Option<String>,
    /// Opportunity sub-type.
    pub opp_type: OppType,
    /// Current workflow status.
    pub status: OpportunityStatus,
    /// Funding agency issuing the bid.
    pub funding_agency_id: Option<Uuid>,
    /// Client on whose behalf the bid runs.
    pub client_id: Option<Uuid>,
    /// Unit leading the proposal.
    pub lead_unit_id: Option<Uuid>,
    /// Institute leading the submission.
    pub lead_institute_id: Option<Uuid>,
    /// User acting as proposal lead.
    pub proposal_lead_id: Option<Uuid>,
    /// Source opportunity when this record was created by an EOI transfer.
    pub parent_id: Option<Uuid>,
    /// Bid due date.
    pub due_date: Option<NaiveDate>,
    /// Clarification deadline.
    pub clarification_date: Option<NaiveDate>,
    /// Intent-to-bid deadline.
    pub intent_bid_date: Option<NaiveDate>,
    /// Date the proposal was submitted.
    pub submission_date: Option<NaiveDate>,
    /// Date the result was communicated.
    pub result_date: Option<NaiveDate>,
    /// Project duration in months.
    pub duration_months: Option<i32>,
    /// How long the submission remains valid, in days.
    pub submission_validity_days: Option<i32>,
    /// ISO currency code for the amount fields.
    pub currency: Option<String>,
    /// Gross proposal amount.
    pub proposal_amount: Option<Decimal>,
    /// Net amount retained.
    pub net_amount: Option<Decimal>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Short note recorded with the result.
    pub result_note: Option<String>,
    /// User who created the record. Immutable.
    pub created_by: Uuid,
    /// User who last updated the record.
    pub updated_by: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Build a new record from a creation payload.
    ///
    /// The status is always forced to `Entered`; any status carried in the
    /// payload is discarded.
    pub fn from_new(new: &NewOpportunity, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ref_no: new.ref_no.clone(),
            title: new.title.clone(),
            opp_type: new.opp_type,
            status: OpportunityStatus::Entered,
            funding_agency_id: new.funding_agency_id,
            client_id: new.client_id,
            lead_unit_id: None,
            lead_institute_id: None,
            proposal_lead_id: None,
            parent_id: None,
            due_date: new.due_date,
            clarification_date: new.clarification_date,
            intent_bid_date: new.intent_bid_date,
            submission_date: None,
            result_date: None,
            duration_months: new.duration_months,
            submission_validity_days: None,
            currency: new.currency.clone(),
            proposal_amount: new.proposal_amount,
            net_amount: new.net_amount,
            notes: new.notes.clone(),
            result_note: None,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a general-update payload into this record.
    ///
    /// `ref_no` and `created_by` in the payload are always ignored; the
    /// stored values survive any input. Status is merged here but must
    /// have been validated by the workflow engine beforehand.
    pub fn apply_update(&mut self, changes: &UpdateOpportunity, updated_by: Uuid) {
        if let Some(title) = &changes.title {
            self.title = Some(title.clone());
        }
        if let Some(opp_type) = changes.opp_type {
            self.opp_type = opp_type;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(id) = changes.funding_agency_id {
            self.funding_agency_id = Some(id);
        }
        if let Some(id) = changes.client_id {
            self.client_id = Some(id);
        }
        if let Some(id) = changes.lead_unit_id {
            self.lead_unit_id = Some(id);
        }
        if let Some(id) = changes.proposal_lead_id {
            self.proposal_lead_id = Some(id);
        }
        if let Some(date) = changes.due_date {
            self.due_date = Some(date);
        }
        if let Some(date) = changes.clarification_date {
            self.clarification_date = Some(date);
        }
        if let Some(date) = changes.intent_bid_date {
            self.intent_bid_date = Some(date);
        }
        if let Some(date) = changes.result_date {
            self.result_date = Some(date);
        }
        if let Some(months) = changes.duration_months {
            self.duration_months = Some(months);
        }
        if let Some(currency) = &changes.currency {
            self.currency = Some(currency.clone());
        }
        if let Some(amount) = changes.proposal_amount {
            self.proposal_amount = Some(amount);
        }
        if let Some(amount) = changes.net_amount {
            self.net_amount = Some(amount);
        }
        if let Some(notes) = &changes.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(note) = &changes.result_note {
            self.result_note = Some(note.clone());
        }
        self.updated_by = Some(updated_by);
        self.updated_at = Utc::now();
    }

    /// Build the RFP child record for a transfer of this opportunity.
    ///
    /// Descriptive fields are copied; the child starts the workflow from
    /// `Entered` with `parent_id` pointing back at this record. The
    /// caller is responsible for writing child and parent atomically.
    pub fn transfer_child(&self, ref_no: impl Into<String>, created_by: Uuid) -> Opportunity {
        let now = Utc::now();
        Opportunity {
            id: Uuid::new_v4(),
            ref_no: ref_no.into(),
            title: self.title.clone(),
            opp_type: OppType::Rfp,
            status: OpportunityStatus::Entered,
            funding_agency_id: self.funding_agency_id,
            client_id: self.client_id,
            lead_unit_id: self.lead_unit_id,
            lead_institute_id: None,
            proposal_lead_id: self.proposal_lead_id,
            parent_id: Some(self.id),
            due_date: self.due_date,
            clarification_date: self.clarification_date,
            intent_bid_date: self.intent_bid_date,
            submission_date: None,
            result_date: None,
            duration_months: self.duration_months,
            submission_validity_days: None,
            currency: self.currency.clone(),
            proposal_amount: self.proposal_amount,
            net_amount: self.net_amount,
            notes: self.notes.clone(),
            result_note: None,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload for creating an opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOpportunity {
    /// Human-assigned unique reference code.
    pub ref_no: String,
    /// Opportunity title.
    pub title: Option<String>,
    /// Opportunity sub-type.
    pub opp_type: OppType,
    /// Status carried by the caller. Always ignored; creation forces `Entered`.
    #[serde(default)]
    pub status: Option<i32>,
    /// Funding agency.
    pub funding_agency_id: Option<Uuid>,
    /// Client.
    pub client_id: Option<Uuid>,
    /// Target country codes.
    #[serde(default)]
    pub countries: Vec<String>,
    /// Bid due date.
    pub due_date: Option<NaiveDate>,
    /// Clarification deadline.
    pub clarification_date: Option<NaiveDate>,
    /// Intent-to-bid deadline.
    pub intent_bid_date: Option<NaiveDate>,
    /// Project duration in months.
    pub duration_months: Option<i32>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Gross proposal amount.
    pub proposal_amount: Option<Decimal>,
    /// Net amount retained.
    pub net_amount: Option<Decimal>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Payload for a general update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOpportunity {
    /// Ignored: the stored reference code is immutable.
    #[serde(default)]
    pub ref_no: Option<String>,
    /// New title.
    pub title: Option<String>,
    /// New sub-type.
    pub opp_type: Option<OppType>,
    /// Requested status change, validated by the workflow engine.
    pub status: Option<OpportunityStatus>,
    /// New funding agency.
    pub funding_agency_id: Option<Uuid>,
    /// New client.
    pub client_id: Option<Uuid>,
    /// Replacement target country codes, when supplied.
    #[serde(default)]
    pub countries: Option<Vec<String>>,
    /// New lead unit.
    pub lead_unit_id: Option<Uuid>,
    /// New proposal lead.
    pub proposal_lead_id: Option<Uuid>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New clarification deadline.
    pub clarification_date: Option<NaiveDate>,
    /// New intent-to-bid deadline.
    pub intent_bid_date: Option<NaiveDate>,
    /// New result date.
    pub result_date: Option<NaiveDate>,
    /// New duration in months.
    pub duration_months: Option<i32>,
    /// New ISO currency code.
    pub currency: Option<String>,
    /// New gross proposal amount.
    pub proposal_amount: Option<Decimal>,
    /// New net amount.
    pub net_amount: Option<Decimal>,
    /// New notes.
    pub notes: Option<String>,
    /// New result note.
    pub result_note: Option<String>,
}

/// Payload for the status-only update operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    /// The requested status.
    pub status: OpportunityStatus,
    /// Proposal lead, required when moving to `Go`.
    pub proposal_lead_id: Option<Uuid>,
    /// Lead unit, required when moving to `Go`.
    pub lead_unit_id: Option<Uuid>,
    /// Result date, required for outcome statuses.
    pub result_date: Option<NaiveDate>,
    /// Short note recorded with the result.
    pub result_note: Option<String>,
}

/// Payload for the dedicated submit operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitProposal {
    /// Date the proposal was submitted.
    pub submission_date: Option<NaiveDate>,
    /// Lead institute for the submission.
    pub lead_institute_id: Option<Uuid>,
    /// Partner institutes.
    #[serde(default)]
    pub partners: Vec<Uuid>,
    /// How long the submission remains valid, in days.
    pub submission_validity_days: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new() -> NewOpportunity {
        NewOpportunity {
            ref_no: "OPP-2026-001".to_string(),
            title: Some("Health Systems RFP".to_string()),
            opp_type: OppType::Rfp,
            countries: vec!["KE".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_creation_forces_entered_status() {
        let mut new = sample_new();
        new.status = Some(OpportunityStatus::Submitted.code());

        let opp = Opportunity::from_new(&new, Uuid::new_v4());
        assert_eq!(opp.status, OpportunityStatus::Entered);
    }

    #[test]
    fn test_apply_update_ignores_ref_no() {
        let creator = Uuid::new_v4();
        let mut opp = Opportunity::from_new(&sample_new(), creator);

        let changes = UpdateOpportunity {
            ref_no: Some("HIJACKED-001".to_string()),
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        opp.apply_update(&changes, Uuid::new_v4());

        assert_eq!(opp.ref_no, "OPP-2026-001");
        assert_eq!(opp.title.as_deref(), Some("Renamed"));
        assert_eq!(opp.created_by, creator);
    }

    #[test]
    fn test_apply_update_leaves_unset_fields() {
        let mut opp = Opportunity::from_new(&sample_new(), Uuid::new_v4());
        opp.notes = Some("original notes".to_string());

        let changes = UpdateOpportunity {
            duration_months: Some(24),
            ..Default::default()
        };
        opp.apply_update(&changes, Uuid::new_v4());

        assert_eq!(opp.duration_months, Some(24));
        assert_eq!(opp.notes.as_deref(), Some("original notes"));
    }

    #[test]
    fn test_transfer_child_links_parent() {
        let opp = Opportunity::from_new(&sample_new(), Uuid::new_v4());
        let actor = Uuid::new_v4();
        let child = opp.transfer_child("OPP-2026-001-RFP", actor);

        assert_eq!(child.parent_id, Some(opp.id));
        assert_eq!(child.status, OpportunityStatus::Entered);
        assert_eq!(child.opp_type, OppType::Rfp);
        assert_eq!(child.title, opp.title);
        assert_eq!(child.created_by, actor);
        assert!(child.submission_date.is_none());
        assert!(child.result_date.is_none());
    }
}
