//! Notification dispatcher.
//!
//! Runs on the write path, after an opportunity row has been persisted.
//! It resolves the audience, renders the notice, and enqueues send jobs;
//! it never performs delivery itself. Dispatch failures are the caller's
//! to swallow: the workflow service logs them and the save stands.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use opptrack_core::config::NotificationConfig;
use opptrack_core::events::OpportunitySaved;
use opptrack_core::result::AppResult;
use opptrack_database::repositories::{JobRepository, OpportunityRepository, SubscriptionRepository};
use opptrack_entity::job::{CreateJob, Job};
use opptrack_entity::notification::{DeliveryMethod, NotificationChannel, SubscriberContact};
use opptrack_entity::opportunity::Opportunity;

use super::render::MessageRenderer;
use super::{NoticeContent, SEND_JOB_TYPE};

/// Destination for newly built jobs.
///
/// The dispatcher only needs to hand a job over; abstracting the queue
/// behind this trait keeps the fan-out logic testable without a
/// database.
#[async_trait]
pub trait JobSink: Send + Sync {
    /// Persist one job for later execution.
    async fn submit(&self, job: CreateJob) -> AppResult<Job>;
}

#[async_trait]
impl JobSink for JobRepository {
    async fn submit(&self, job: CreateJob) -> AppResult<Job> {
        self.create(&job).await
    }
}

/// Read side of the audience resolution, the counterpart of [`JobSink`].
#[async_trait]
pub trait AudienceSource: Send + Sync {
    /// Look up a broadcast channel by its unique name.
    async fn channel_by_name(&self, name: &str) -> AppResult<Option<NotificationChannel>>;

    /// Resolved contacts of a channel's active subscribers.
    async fn channel_contacts(&self, channel_id: Uuid) -> AppResult<Vec<SubscriberContact>>;

    /// Resolved contacts of one opportunity's active followers.
    async fn opportunity_contacts(
        &self,
        opportunity_id: Uuid,
    ) -> AppResult<Vec<SubscriberContact>>;
}

#[async_trait]
impl AudienceSource for SubscriptionRepository {
    async fn channel_by_name(&self, name: &str) -> AppResult<Option<NotificationChannel>> {
        self.find_channel_by_name(name).await
    }

    async fn channel_contacts(&self, channel_id: Uuid) -> AppResult<Vec<SubscriberContact>> {
        self.channel_subscriber_contacts(channel_id).await
    }

    async fn opportunity_contacts(
        &self,
        opportunity_id: Uuid,
    ) -> AppResult<Vec<SubscriberContact>> {
        self.opportunity_subscriber_contacts(opportunity_id).await
    }
}

/// Source of digest content.
#[async_trait]
pub trait DigestSource: Send + Sync {
    /// Opportunities created since `cutoff` and still in the initial
    /// status, newest first.
    async fn entered_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Opportunity>>;
}

#[async_trait]
impl DigestSource for OpportunityRepository {
    async fn entered_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Opportunity>> {
        self.find_recent_entered(cutoff).await
    }
}

/// Result of a digest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    /// The trailing window held nothing to report; no jobs were enqueued.
    NoContent,
    /// The digest was rendered and fanned out.
    Dispatched {
        /// Send jobs enqueued (at most one per delivery method).
        jobs: usize,
        /// Recipient addresses covered across those jobs.
        recipients: usize,
    },
}

/// Fans persisted opportunity changes out into queued send jobs.
pub struct NotificationDispatcher {
    subscriptions: Arc<dyn AudienceSource>,
    opportunities: Arc<dyn DigestSource>,
    renderer: Arc<MessageRenderer>,
    sink: Arc<dyn JobSink>,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    /// Create a dispatcher over the given sources and job sink.
    pub fn new(
        subscriptions: Arc<dyn AudienceSource>,
        opportunities: Arc<dyn DigestSource>,
        renderer: Arc<MessageRenderer>,
        sink: Arc<dyn JobSink>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            subscriptions,
            opportunities,
            renderer,
            sink,
            config,
        }
    }

    /// React to a persisted save. Creation and update audiences are
    /// disjoint: a single save triggers exactly one of the two paths.
    pub async fn on_saved(&self, event: &OpportunitySaved) -> AppResult<usize> {
        if event.was_created {
            self.on_created(event).await
        } else {
            self.on_updated(event).await
        }
    }

    /// Announce a new opportunity to the configured broadcast channel.
    ///
    /// Silent no-op when no channel is configured or the configured
    /// channel has not been provisioned.
    pub async fn on_created(&self, event: &OpportunitySaved) -> AppResult<usize> {
        let Some(channel_name) = self.config.new_opportunity_channel.as_deref() else {
            debug!("no new-opportunity channel configured; skipping creation notice");
            return Ok(0);
        };
        let Some(channel) = self.subscriptions.channel_by_name(channel_name).await? else {
            info!(channel = channel_name, "alert channel not provisioned; skipping");
            return Ok(0);
        };

        let contacts = self.subscriptions.channel_contacts(channel.id).await?;
        if contacts.is_empty() {
            debug!(channel = channel_name, "channel has no active subscribers");
            return Ok(0);
        }

        let notice = self.renderer.created(event)?;
        let jobs = dispatch_to_sink(self.sink.as_ref(), &contacts, &notice).await?;
        info!(
            opportunity_id = %event.opportunity_id,
            channel = channel_name,
            jobs,
            "creation notice enqueued"
        );
        Ok(jobs)
    }

    /// Notify the followers of one opportunity about an update.
    pub async fn on_updated(&self, event: &OpportunitySaved) -> AppResult<usize> {
        let contacts = self
            .subscriptions
            .opportunity_contacts(event.opportunity_id)
            .await?;
        if contacts.is_empty() {
            return Ok(0);
        }

        let notice = self.renderer.updated(event)?;
        let jobs = dispatch_to_sink(self.sink.as_ref(), &contacts, &notice).await?;
        info!(opportunity_id = %event.opportunity_id, jobs, "update notice enqueued");
        Ok(jobs)
    }

    /// Build and fan out the periodic digest of recently entered
    /// opportunities.
    ///
    /// Only records still in the initial status count: anything already
    /// moved along the workflow has had its own notices.
    pub async fn on_digest(&self) -> AppResult<DigestOutcome> {
        let Some(channel_name) = self.config.digest.channel.as_deref() else {
            debug!("no digest channel configured; skipping digest");
            return Ok(DigestOutcome::NoContent);
        };

        let days = self.config.digest.days;
        let cutoff = Utc::now() - Duration::days(days);
        let recent = self.opportunities.entered_since(cutoff).await?;
        if recent.is_empty() {
            info!(days, "digest window empty; nothing to send");
            return Ok(DigestOutcome::NoContent);
        }

        let Some(channel) = self.subscriptions.channel_by_name(channel_name).await? else {
            info!(channel = channel_name, "digest channel not provisioned; skipping");
            return Ok(DigestOutcome::NoContent);
        };
        let contacts = self.subscriptions.channel_contacts(channel.id).await?;
        if contacts.is_empty() {
            info!(channel = channel_name, "digest channel has no active subscribers");
            return Ok(DigestOutcome::Dispatched {
                jobs: 0,
                recipients: 0,
            });
        }

        let notice = self.renderer.digest(&recent, days)?;
        let recipients = contacts.iter().filter(|c| c.address.is_some()).count();
        let jobs = dispatch_to_sink(self.sink.as_ref(), &contacts, &notice).await?;
        info!(days, entries = recent.len(), jobs, recipients, "digest enqueued");
        Ok(DigestOutcome::Dispatched { jobs, recipients })
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Group contacts by delivery method and enqueue one send job per
/// method present. Returns the number of jobs enqueued.
async fn dispatch_to_sink(
    sink: &dyn JobSink,
    contacts: &[SubscriberContact],
    notice: &NoticeContent,
) -> AppResult<usize> {
    let groups = group_by_method(contacts);
    let mut jobs = 0;
    for method in DeliveryMethod::ALL {
        let Some(recipients) = groups.get(&method) else {
            continue;
        };
        let payload = notice.payload_for(method, recipients.clone());
        let job = CreateJob::notification(SEND_JOB_TYPE, serde_json::to_value(&payload)?);
        sink.submit(job).await?;
        jobs += 1;
    }
    Ok(jobs)
}

/// Bucket contacts into per-method recipient lists.
///
/// Contacts whose user record lacks the address needed by their chosen
/// method are dropped with a warning rather than failing the batch.
fn group_by_method(contacts: &[SubscriberContact]) -> HashMap<DeliveryMethod, Vec<String>> {
    let mut groups: HashMap<DeliveryMethod, Vec<String>> = HashMap::new();
    for contact in contacts {
        match &contact.address {
            Some(address) if !address.trim().is_empty() => {
                groups
                    .entry(contact.preferred_method)
                    .or_default()
                    .push(address.clone());
            }
            _ => warn!(
                user_id = %contact.user_id,
                method = %contact.preferred_method,
                "subscriber has no address for preferred method; skipping"
            ),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use opptrack_entity::opportunity::{NewOpportunity, OpportunityStatus};

    use super::*;
    use crate::notification::SendJobPayload;

    #[derive(Default)]
    struct RecordingSink {
        jobs: Mutex<Vec<CreateJob>>,
    }

    #[async_trait]
    impl JobSink for RecordingSink {
        async fn submit(&self, job: CreateJob) -> AppResult<Job> {
            let stored = Job {
                id: Uuid::new_v4(),
                job_type: job.job_type.clone(),
                queue: job.queue.clone(),
                priority: job.priority,
                payload: job.payload.clone(),
                error_message: None,
                status: opptrack_entity::job::JobStatus::Pending,
                attempts: 0,
                max_attempts: job.max_attempts,
                scheduled_at: job.scheduled_at,
                started_at: None,
                completed_at: None,
                worker_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.jobs.lock().unwrap().push(job);
            Ok(stored)
        }
    }

    impl RecordingSink {
        fn payloads(&self) -> Vec<SendJobPayload> {
            self.jobs
                .lock()
                .unwrap()
                .iter()
                .map(|j| serde_json::from_value(j.payload.clone()).unwrap())
                .collect()
        }
    }

    fn notice() -> NoticeContent {
        NoticeContent {
            subject: "New opportunity: Cold Chain Logistics".to_string(),
            long_body: "<p>long</p>".to_string(),
            short_body: "short".to_string(),
        }
    }

    #[tokio::test]
    async fn test_no_contacts_enqueues_nothing() {
        let sink = RecordingSink::default();
        let jobs = dispatch_to_sink(&sink, &[], &notice()).await.unwrap();
        assert_eq!(jobs, 0);
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_job_per_delivery_method() {
        let contacts = vec![
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Email, Some("a@example.org")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Email, Some("b@example.org")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Email, Some("c@example.org")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Sms, Some("+254700000001")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Sms, Some("+254700000002")),
        ];

        let sink = RecordingSink::default();
        let jobs = dispatch_to_sink(&sink, &contacts, &notice()).await.unwrap();
        assert_eq!(jobs, 2);

        let payloads = sink.payloads();
        let email = payloads
            .iter()
            .find(|p| p.method == DeliveryMethod::Email)
            .unwrap();
        assert_eq!(email.recipients.len(), 3);
        assert_eq!(
            email.subject.as_deref(),
            Some("New opportunity: Cold Chain Logistics")
        );
        assert_eq!(email.message, "<p>long</p>");

        let sms = payloads
            .iter()
            .find(|p| p.method == DeliveryMethod::Sms)
            .unwrap();
        assert_eq!(sms.recipients, vec!["+254700000001", "+254700000002"]);
        assert!(sms.subject.is_none());
        assert_eq!(sms.message, "short");
    }

    #[tokio::test]
    async fn test_all_three_methods_cap_at_three_jobs() {
        let contacts = vec![
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Email, Some("a@example.org")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Sms, Some("+254700000001")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Whatsapp, Some("+254700000002")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Whatsapp, Some("+254700000003")),
        ];

        let sink = RecordingSink::default();
        let jobs = dispatch_to_sink(&sink, &contacts, &notice()).await.unwrap();
        assert_eq!(jobs, 3);
        assert_eq!(sink.jobs.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_contacts_without_address_are_skipped() {
        let contacts = vec![
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Email, None),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Sms, Some("  ")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Whatsapp, Some("+254700000009")),
        ];

        let sink = RecordingSink::default();
        let jobs = dispatch_to_sink(&sink, &contacts, &notice()).await.unwrap();
        assert_eq!(jobs, 1);

        let payloads = sink.payloads();
        assert_eq!(payloads[0].method, DeliveryMethod::Whatsapp);
        assert_eq!(payloads[0].recipients, vec!["+254700000009"]);
    }

    /// In-memory stand-in for the channel and opportunity stores. The
    /// digest lookup mirrors the repository contract: only records still
    /// in `Entered` status and inside the window are returned.
    #[derive(Default)]
    struct FakeDirectory {
        channels: Vec<NotificationChannel>,
        contacts: Vec<SubscriberContact>,
        opportunities: Vec<Opportunity>,
    }

    #[async_trait]
    impl AudienceSource for FakeDirectory {
        async fn channel_by_name(&self, name: &str) -> AppResult<Option<NotificationChannel>> {
            Ok(self.channels.iter().find(|c| c.name == name).cloned())
        }

        async fn channel_contacts(&self, _channel_id: Uuid) -> AppResult<Vec<SubscriberContact>> {
            Ok(self.contacts.clone())
        }

        async fn opportunity_contacts(
            &self,
            _opportunity_id: Uuid,
        ) -> AppResult<Vec<SubscriberContact>> {
            Ok(self.contacts.clone())
        }
    }

    #[async_trait]
    impl DigestSource for FakeDirectory {
        async fn entered_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Opportunity>> {
            Ok(self
                .opportunities
                .iter()
                .filter(|o| o.status == OpportunityStatus::Entered && o.created_at >= cutoff)
                .cloned()
                .collect())
        }
    }

    fn channel(name: &str) -> NotificationChannel {
        NotificationChannel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            default_method: DeliveryMethod::Email,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn opportunity(ref_no: &str) -> Opportunity {
        let new = NewOpportunity {
            ref_no: ref_no.to_string(),
            title: Some("Rural Electrification Feasibility".to_string()),
            ..Default::default()
        };
        Opportunity::from_new(&new, Uuid::new_v4())
    }

    fn digest_config(channel: &str) -> NotificationConfig {
        let mut config = NotificationConfig::default();
        config.digest.channel = Some(channel.to_string());
        config.digest.days = 7;
        config
    }

    fn dispatcher_over(
        directory: FakeDirectory,
        sink: Arc<RecordingSink>,
        config: NotificationConfig,
    ) -> NotificationDispatcher {
        let directory = Arc::new(directory);
        let renderer = Arc::new(MessageRenderer::new("http://localhost:8000").unwrap());
        NotificationDispatcher::new(directory.clone(), directory, renderer, sink, config)
    }

    #[tokio::test]
    async fn test_digest_with_only_advanced_records_sends_nothing() {
        let mut moved_along = opportunity("EOI-2026-030");
        moved_along.status = OpportunityStatus::Submitted;
        let directory = FakeDirectory {
            channels: vec![channel("digest")],
            contacts: vec![SubscriberContact::new(
                Uuid::new_v4(),
                DeliveryMethod::Email,
                Some("a@example.org"),
            )],
            opportunities: vec![moved_along],
        };

        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_over(directory, sink.clone(), digest_config("digest"));

        let outcome = dispatcher.on_digest().await.unwrap();
        assert_eq!(outcome, DigestOutcome::NoContent);
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_digest_ignores_records_outside_the_window() {
        let mut stale = opportunity("EOI-2026-002");
        stale.created_at = Utc::now() - Duration::days(30);
        let directory = FakeDirectory {
            channels: vec![channel("digest")],
            contacts: vec![SubscriberContact::new(
                Uuid::new_v4(),
                DeliveryMethod::Email,
                Some("a@example.org"),
            )],
            opportunities: vec![stale],
        };

        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_over(directory, sink.clone(), digest_config("digest"));

        let outcome = dispatcher.on_digest().await.unwrap();
        assert_eq!(outcome, DigestOutcome::NoContent);
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_digest_fans_out_recent_entered_records() {
        let mut moved_along = opportunity("EOI-2026-031");
        moved_along.status = OpportunityStatus::Go;
        let directory = FakeDirectory {
            channels: vec![channel("digest")],
            contacts: vec![SubscriberContact::new(
                Uuid::new_v4(),
                DeliveryMethod::Email,
                Some("a@example.org"),
            )],
            opportunities: vec![opportunity("EOI-2026-032"), moved_along],
        };

        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_over(directory, sink.clone(), digest_config("digest"));

        let outcome = dispatcher.on_digest().await.unwrap();
        assert_eq!(
            outcome,
            DigestOutcome::Dispatched {
                jobs: 1,
                recipients: 1
            }
        );

        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            payloads[0].subject.as_deref(),
            Some("Opportunity digest: 1 new in the last 7 days")
        );
    }

    #[test]
    fn test_grouping_preserves_contact_order() {
        let contacts = vec![
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Email, Some("first@example.org")),
            SubscriberContact::new(Uuid::new_v4(), DeliveryMethod::Email, Some("second@example.org")),
        ];
        let groups = group_by_method(&contacts);
        assert_eq!(
            groups[&DeliveryMethod::Email],
            vec!["first@example.org", "second@example.org"]
        );
    }
}
