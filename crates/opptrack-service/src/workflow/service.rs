//! Opportunity workflow service.
//!
//! Every mutation follows the same shape: load the stored record, merge
//! the incoming change into a candidate, validate the candidate against
//! the requirement table, persist, then hand the save to the
//! notification dispatcher. Dispatch failures are logged and swallowed;
//! a notice must never undo a valid save.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use opptrack_core::events::OpportunitySaved;
use opptrack_core::result::AppResult;
use opptrack_core::AppError;
use opptrack_database::repositories::OpportunityRepository;
use opptrack_entity::opportunity::{
    NewOpportunity, Opportunity, OpportunityStatus, StatusChange, SubmitProposal,
    UpdateOpportunity,
};

use crate::context::RequestContext;
use crate::notification::NotificationDispatcher;

use super::requirements::{validate_candidate, validate_requested_status, EntryPoint};

/// Persistence seam for opportunity records.
///
/// The workflow engine's merge and validation rules are pure; this trait
/// is the only place they touch storage, so they can be exercised
/// against an in-memory stand-in.
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Load one record by ID.
    async fn load(&self, id: Uuid) -> AppResult<Option<Opportunity>>;

    /// Load one record by its reference number.
    async fn load_by_ref_no(&self, ref_no: &str) -> AppResult<Option<Opportunity>>;

    /// Insert a freshly created record with its target countries.
    async fn insert(&self, opp: &Opportunity, countries: &[String]) -> AppResult<()>;

    /// Write back a fully merged record, optionally replacing the
    /// country and partner join rows.
    async fn persist(
        &self,
        opp: &Opportunity,
        countries: Option<&[String]>,
        partners: Option<&[Uuid]>,
    ) -> AppResult<()>;

    /// Atomically insert the transfer child and mark the parent
    /// Transferred. Either both writes land or neither does.
    async fn transfer(&self, parent_id: Uuid, child: &Opportunity, actor_id: Uuid)
        -> AppResult<()>;

    /// The RFP child created by transferring the given record, if any.
    async fn transferred_child(&self, parent_id: Uuid) -> AppResult<Option<Opportunity>>;
}

#[async_trait]
impl OpportunityStore for OpportunityRepository {
    async fn load(&self, id: Uuid) -> AppResult<Option<Opportunity>> {
        self.find_by_id(id).await
    }

    async fn load_by_ref_no(&self, ref_no: &str) -> AppResult<Option<Opportunity>> {
        self.find_by_ref_no(ref_no).await
    }

    async fn insert(&self, opp: &Opportunity, countries: &[String]) -> AppResult<()> {
        self.create(opp, countries).await
    }

    async fn persist(
        &self,
        opp: &Opportunity,
        countries: Option<&[String]>,
        partners: Option<&[Uuid]>,
    ) -> AppResult<()> {
        self.update(opp, countries, partners).await
    }

    async fn transfer(
        &self,
        parent_id: Uuid,
        child: &Opportunity,
        actor_id: Uuid,
    ) -> AppResult<()> {
        OpportunityRepository::transfer(self, parent_id, child, actor_id).await
    }

    async fn transferred_child(&self, parent_id: Uuid) -> AppResult<Option<Opportunity>> {
        self.find_transferred_child(parent_id).await
    }
}

/// Validates and persists opportunity state changes.
pub struct WorkflowService {
    opportunities: Arc<dyn OpportunityStore>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl WorkflowService {
    /// Create a workflow service.
    pub fn new(
        opportunities: Arc<dyn OpportunityStore>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            opportunities,
            dispatcher,
        }
    }

    /// Fetch one opportunity or fail with not-found.
    pub async fn find(&self, id: Uuid) -> AppResult<Opportunity> {
        self.opportunities
            .load(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Opportunity {id} does not exist")))
    }

    /// Create a new opportunity.
    ///
    /// The record always starts in `Entered`; a status carried in the
    /// payload is discarded, not rejected.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        new: NewOpportunity,
    ) -> AppResult<Opportunity> {
        let candidate = Opportunity::from_new(&new, ctx.user_id);
        validate_candidate(&candidate, EntryPoint::General, Utc::now().date_naive())?;

        self.opportunities.insert(&candidate, &new.countries).await?;
        info!(
            opportunity_id = %candidate.id,
            ref_no = %candidate.ref_no,
            user = %ctx.username,
            "opportunity created"
        );

        self.notify_saved(&candidate, true, ctx.user_id).await;
        Ok(candidate)
    }

    /// Apply a general update.
    ///
    /// `ref_no` and `created_by` in the payload are ignored; the stored
    /// values always survive. A requested status change goes through the
    /// same requirement checks as the status-only operation.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        changes: UpdateOpportunity,
    ) -> AppResult<Opportunity> {
        if let Some(status) = changes.status {
            validate_requested_status(status)?;
        }

        let stored = self.find(id).await?;
        let mut candidate = stored.clone();
        candidate.apply_update(&changes, ctx.user_id);
        validate_candidate(&candidate, EntryPoint::General, Utc::now().date_naive())?;

        self.opportunities
            .persist(&candidate, changes.countries.as_deref(), None)
            .await?;
        info!(
            opportunity_id = %candidate.id,
            ref_no = %candidate.ref_no,
            user = %ctx.username,
            "opportunity updated"
        );

        self.notify_saved(&candidate, false, ctx.user_id).await;
        Ok(candidate)
    }

    /// Apply a status-only change with its companion fields.
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        change: StatusChange,
    ) -> AppResult<Opportunity> {
        validate_requested_status(change.status)?;

        let stored = self.find(id).await?;
        let mut candidate = stored.clone();
        candidate.status = change.status;
        if let Some(lead) = change.proposal_lead_id {
            candidate.proposal_lead_id = Some(lead);
        }
        if let Some(unit) = change.lead_unit_id {
            candidate.lead_unit_id = Some(unit);
        }
        if let Some(date) = change.result_date {
            candidate.result_date = Some(date);
        }
        if let Some(note) = change.result_note {
            candidate.result_note = Some(note);
        }
        candidate.updated_by = Some(ctx.user_id);
        candidate.updated_at = Utc::now();

        validate_candidate(&candidate, EntryPoint::StatusOnly, Utc::now().date_naive())?;

        self.opportunities.persist(&candidate, None, None).await?;
        info!(
            opportunity_id = %candidate.id,
            status = %candidate.status,
            user = %ctx.username,
            "opportunity status changed"
        );

        self.notify_saved(&candidate, false, ctx.user_id).await;
        Ok(candidate)
    }

    /// Record a proposal submission.
    ///
    /// The only path that sets the lead institute and the partner list;
    /// it moves the record to `Submitted` as a side effect.
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        submission: SubmitProposal,
    ) -> AppResult<Opportunity> {
        let stored = self.find(id).await?;
        let mut candidate = stored.clone();
        candidate.status = OpportunityStatus::Submitted;
        if let Some(date) = submission.submission_date {
            candidate.submission_date = Some(date);
        }
        if let Some(institute) = submission.lead_institute_id {
            candidate.lead_institute_id = Some(institute);
        }
        if let Some(days) = submission.submission_validity_days {
            candidate.submission_validity_days = Some(days);
        }
        candidate.updated_by = Some(ctx.user_id);
        candidate.updated_at = Utc::now();

        validate_candidate(&candidate, EntryPoint::Submit, Utc::now().date_naive())?;

        self.opportunities
            .persist(&candidate, None, Some(&submission.partners))
            .await?;
        info!(
            opportunity_id = %candidate.id,
            ref_no = %candidate.ref_no,
            user = %ctx.username,
            "proposal submitted"
        );

        self.notify_saved(&candidate, false, ctx.user_id).await;
        Ok(candidate)
    }

    /// Transfer an EOI into a new RFP record.
    ///
    /// Creates the child under `new_ref_no` and marks the parent
    /// `TransferredToRfp` in one transaction; returns the child.
    pub async fn transfer(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        new_ref_no: &str,
    ) -> AppResult<Opportunity> {
        if new_ref_no.trim().is_empty() {
            return Err(AppError::validation("Reference number is required"));
        }
        if self
            .opportunities
            .load_by_ref_no(new_ref_no)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Reference number '{new_ref_no}' already exists"
            )));
        }

        let parent = self.find(id).await?;
        if parent.status == OpportunityStatus::TransferredToRfp {
            let message = match self.opportunities.transferred_child(parent.id).await? {
                Some(child) => format!(
                    "Opportunity {} has already been transferred to {}",
                    parent.ref_no, child.ref_no
                ),
                None => format!("Opportunity {} has already been transferred", parent.ref_no),
            };
            return Err(AppError::conflict(message));
        }

        let child = parent.transfer_child(new_ref_no, ctx.user_id);
        self.opportunities
            .transfer(parent.id, &child, ctx.user_id)
            .await?;
        info!(
            parent_id = %parent.id,
            child_id = %child.id,
            child_ref_no = %child.ref_no,
            user = %ctx.username,
            "opportunity transferred to RFP"
        );

        self.notify_saved(&child, true, ctx.user_id).await;

        let mut parent_after = parent;
        parent_after.status = OpportunityStatus::TransferredToRfp;
        parent_after.updated_by = Some(ctx.user_id);
        self.notify_saved(&parent_after, false, ctx.user_id).await;

        Ok(child)
    }

    /// Hand a persisted save to the dispatcher. Failures are logged and
    /// swallowed; the write has already committed.
    async fn notify_saved(&self, opp: &Opportunity, was_created: bool, actor_id: Uuid) {
        let event = OpportunitySaved::new(
            opp.id,
            opp.ref_no.clone(),
            opp.title.clone(),
            was_created,
            Some(actor_id),
        );
        if let Err(error) = self.dispatcher.on_saved(&event).await {
            warn!(
                opportunity_id = %opp.id,
                was_created,
                %error,
                "notification dispatch failed; save is unaffected"
            );
        }
    }
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::DateTime;

    use opptrack_core::config::NotificationConfig;
    use opptrack_core::error::ErrorKind;
    use opptrack_entity::job::{CreateJob, Job};
    use opptrack_entity::notification::{NotificationChannel, SubscriberContact};

    use crate::notification::{AudienceSource, DigestSource, JobSink, MessageRenderer};

    use super::*;

    /// In-memory opportunity store. `transfer` applies both writes under
    /// one lock or, when `fail_transfer` is set, errors without touching
    /// anything, mirroring the transactional contract.
    #[derive(Default)]
    struct InMemoryStore {
        rows: Mutex<HashMap<Uuid, Opportunity>>,
        fail_transfer: bool,
    }

    impl InMemoryStore {
        fn seeded(rows: impl IntoIterator<Item = Opportunity>) -> Self {
            Self {
                rows: Mutex::new(rows.into_iter().map(|o| (o.id, o)).collect()),
                fail_transfer: false,
            }
        }

        fn stored(&self, id: Uuid) -> Opportunity {
            self.rows.lock().unwrap().get(&id).cloned().unwrap()
        }
    }

    #[async_trait]
    impl OpportunityStore for InMemoryStore {
        async fn load(&self, id: Uuid) -> AppResult<Option<Opportunity>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn load_by_ref_no(&self, ref_no: &str) -> AppResult<Option<Opportunity>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|o| o.ref_no == ref_no)
                .cloned())
        }

        async fn insert(&self, opp: &Opportunity, _countries: &[String]) -> AppResult<()> {
            self.rows.lock().unwrap().insert(opp.id, opp.clone());
            Ok(())
        }

        async fn persist(
            &self,
            opp: &Opportunity,
            _countries: Option<&[String]>,
            _partners: Option<&[Uuid]>,
        ) -> AppResult<()> {
            let mut rows = self.rows.lock().unwrap();
            if !rows.contains_key(&opp.id) {
                return Err(AppError::not_found(format!(
                    "Opportunity {} does not exist",
                    opp.id
                )));
            }
            rows.insert(opp.id, opp.clone());
            Ok(())
        }

        async fn transfer(
            &self,
            parent_id: Uuid,
            child: &Opportunity,
            actor_id: Uuid,
        ) -> AppResult<()> {
            if self.fail_transfer {
                return Err(AppError::database("connection reset during transfer"));
            }
            let mut rows = self.rows.lock().unwrap();
            let parent = rows
                .get_mut(&parent_id)
                .ok_or_else(|| AppError::not_found("parent missing"))?;
            parent.status = OpportunityStatus::TransferredToRfp;
            parent.updated_by = Some(actor_id);
            rows.insert(child.id, child.clone());
            Ok(())
        }

        async fn transferred_child(&self, parent_id: Uuid) -> AppResult<Option<Opportunity>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|o| o.parent_id == Some(parent_id))
                .cloned())
        }
    }

    struct NullAudience;

    #[async_trait]
    impl AudienceSource for NullAudience {
        async fn channel_by_name(&self, _name: &str) -> AppResult<Option<NotificationChannel>> {
            Ok(None)
        }

        async fn channel_contacts(&self, _channel_id: Uuid) -> AppResult<Vec<SubscriberContact>> {
            Ok(Vec::new())
        }

        async fn opportunity_contacts(
            &self,
            _opportunity_id: Uuid,
        ) -> AppResult<Vec<SubscriberContact>> {
            Ok(Vec::new())
        }
    }

    struct NullDigest;

    #[async_trait]
    impl DigestSource for NullDigest {
        async fn entered_since(&self, _cutoff: DateTime<Utc>) -> AppResult<Vec<Opportunity>> {
            Ok(Vec::new())
        }
    }

    struct NullSink;

    #[async_trait]
    impl JobSink for NullSink {
        async fn submit(&self, _job: CreateJob) -> AppResult<Job> {
            Err(AppError::internal("no jobs expected in these tests"))
        }
    }

    fn service_over(store: InMemoryStore) -> (WorkflowService, Arc<InMemoryStore>) {
        let store = Arc::new(store);
        let renderer = Arc::new(MessageRenderer::new("http://localhost:8000").unwrap());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(NullAudience),
            Arc::new(NullDigest),
            renderer,
            Arc::new(NullSink),
            NotificationConfig::default(),
        ));
        (
            WorkflowService::new(store.clone(), dispatcher),
            store,
        )
    }

    fn entered(ref_no: &str) -> Opportunity {
        let new = NewOpportunity {
            ref_no: ref_no.to_string(),
            title: Some("Coastal Resilience Programme".to_string()),
            ..Default::default()
        };
        Opportunity::from_new(&new, Uuid::new_v4())
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Uuid::new_v4(), "asha")
    }

    fn status_change(status: OpportunityStatus) -> StatusChange {
        StatusChange {
            status,
            proposal_lead_id: None,
            lead_unit_id: None,
            result_date: None,
            result_note: None,
        }
    }

    #[tokio::test]
    async fn test_rejected_transition_leaves_stored_status_unchanged() {
        let opp = entered("EOI-2026-040");
        let id = opp.id;
        let (service, store) = service_over(InMemoryStore::seeded([opp]));

        // Won demands a result date; the merged candidate fails validation.
        let err = service
            .update_status(&ctx(), id, status_change(OpportunityStatus::Won))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.stored(id).status, OpportunityStatus::Entered);
    }

    #[tokio::test]
    async fn test_failed_transfer_leaves_parent_untouched() {
        let parent = entered("EOI-2026-041");
        let id = parent.id;
        let mut store = InMemoryStore::seeded([parent]);
        store.fail_transfer = true;
        let (service, store) = service_over(store);

        let err = service
            .transfer(&ctx(), id, "RFP-2026-041")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        let stored = store.stored(id);
        assert_eq!(stored.status, OpportunityStatus::Entered);
        assert!(store.transferred_child(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transfer_creates_child_and_marks_parent() {
        let parent = entered("EOI-2026-042");
        let id = parent.id;
        let (service, store) = service_over(InMemoryStore::seeded([parent]));

        let child = service.transfer(&ctx(), id, "RFP-2026-042").await.unwrap();
        assert_eq!(child.ref_no, "RFP-2026-042");
        assert_eq!(child.parent_id, Some(id));
        assert_eq!(child.status, OpportunityStatus::Entered);

        assert_eq!(store.stored(id).status, OpportunityStatus::TransferredToRfp);
        let found = store.transferred_child(id).await.unwrap().unwrap();
        assert_eq!(found.id, child.id);
    }

    #[tokio::test]
    async fn test_transfer_rejects_ref_no_already_in_use() {
        let parent = entered("EOI-2026-043");
        let other = entered("RFP-2026-043");
        let id = parent.id;
        let (service, store) = service_over(InMemoryStore::seeded([parent, other]));

        let err = service
            .transfer(&ctx(), id, "RFP-2026-043")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(store.stored(id).status, OpportunityStatus::Entered);
    }

    #[tokio::test]
    async fn test_repeat_transfer_reports_existing_child() {
        let parent = entered("EOI-2026-044");
        let id = parent.id;
        let (service, _store) = service_over(InMemoryStore::seeded([parent]));

        service.transfer(&ctx(), id, "RFP-2026-044").await.unwrap();
        let err = service
            .transfer(&ctx(), id, "RFP-2026-044b")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.message.contains("RFP-2026-044"));
    }

    #[tokio::test]
    async fn test_transfer_requires_a_ref_no() {
        let parent = entered("EOI-2026-045");
        let id = parent.id;
        let (service, _store) = service_over(InMemoryStore::seeded([parent]));

        let err = service.transfer(&ctx(), id, "   ").await.unwrap_err();
        assert!(err.is_validation());
    }
}
