//! Notification fan-out.
//!
//! The dispatcher reacts to persisted opportunity changes: it resolves
//! the audience, renders one notice in long and short form, groups the
//! recipients by delivery method, and enqueues at most one send job per
//! method. Delivery itself happens later, on the worker, through the
//! per-method transports defined here.

pub mod dispatcher;
pub mod email;
pub mod render;
pub mod sms;
pub mod transport;
pub mod whatsapp;

use serde::{Deserialize, Serialize};

use opptrack_entity::notification::DeliveryMethod;

pub use dispatcher::{
    AudienceSource, DigestOutcome, DigestSource, JobSink, NotificationDispatcher,
};
pub use render::MessageRenderer;
pub use transport::{ChannelTransport, OutboundMessage, TransportRegistry};

/// One rendered notice, in both delivery forms.
///
/// Email carries the subject and the long body; SMS and WhatsApp carry
/// only the short body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeContent {
    /// Subject line for long-form delivery.
    pub subject: String,
    /// HTML body for long-form delivery.
    pub long_body: String,
    /// Plain-text body for short-form delivery.
    pub short_body: String,
}

impl NoticeContent {
    /// The job payload for delivering this notice via one method.
    pub fn payload_for(&self, method: DeliveryMethod, recipients: Vec<String>) -> SendJobPayload {
        if method.is_long_form() {
            SendJobPayload {
                method,
                recipients,
                subject: Some(self.subject.clone()),
                message: self.long_body.clone(),
            }
        } else {
            SendJobPayload {
                method,
                recipients,
                subject: None,
                message: self.short_body.clone(),
            }
        }
    }
}

/// Payload of a `notification_send` job.
///
/// Written by the dispatcher, read back by the worker handler. One job
/// covers every recipient of one delivery method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendJobPayload {
    /// The delivery method to use.
    pub method: DeliveryMethod,
    /// Resolved delivery addresses.
    pub recipients: Vec<String>,
    /// Subject line; present for long-form methods only.
    pub subject: Option<String>,
    /// Message body in the form the method delivers.
    pub message: String,
}

/// Job type written by the dispatcher and claimed by the worker.
pub const SEND_JOB_TYPE: &str = "notification_send";
