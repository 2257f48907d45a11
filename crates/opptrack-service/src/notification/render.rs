//! Notice rendering.
//!
//! Templates are compiled once at construction; rendering failures are
//! programming errors surfaced as internal errors rather than silently
//! dropped notices.

use chrono::Utc;
use handlebars::Handlebars;
use serde_json::json;

use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::events::OpportunitySaved;
use opptrack_core::result::AppResult;
use opptrack_entity::opportunity::Opportunity;

use super::NoticeContent;

const CREATED_SUBJECT: &str = "New opportunity: {{display_title}}";
const CREATED_LONG: &str = "<p>A new opportunity has been added to the tracker.</p>\
<p><strong>{{display_title}}</strong> ({{ref_no}})</p>\
<p><a href=\"{{site_url}}/opportunities/{{opportunity_id}}\">Open the opportunity</a></p>";
const CREATED_SHORT: &str =
    "New opportunity {{ref_no}}: {{display_title}}. {{site_url}}/opportunities/{{opportunity_id}}";

const UPDATED_SUBJECT: &str = "Opportunity updated: {{display_title}}";
const UPDATED_LONG: &str = "<p>An opportunity you follow was updated.</p>\
<p><strong>{{display_title}}</strong> ({{ref_no}})</p>\
<p><a href=\"{{site_url}}/opportunities/{{opportunity_id}}\">Review the changes</a></p>";
const UPDATED_SHORT: &str =
    "Opportunity {{ref_no}} updated: {{display_title}}. {{site_url}}/opportunities/{{opportunity_id}}";

const DIGEST_SUBJECT: &str = "Opportunity digest: {{count}} new in the last {{days}} days";
const DIGEST_LONG: &str = "<p>Opportunities entered in the last {{days}} days:</p><ul>\
{{#each opportunities}}<li><a href=\"{{../site_url}}/opportunities/{{id}}\">{{ref_no}}</a> \
&mdash; {{title}}</li>{{/each}}</ul>";
const DIGEST_SHORT: &str =
    "{{count}} new opportunities in the last {{days}} days: {{ref_list}}. {{site_url}}/opportunities";

/// Renders notices from compiled templates.
#[derive(Debug)]
pub struct MessageRenderer {
    registry: Handlebars<'static>,
    site_url: String,
}

impl MessageRenderer {
    /// Compile the built-in templates.
    pub fn new(site_url: impl Into<String>) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        for (name, template) in [
            ("created_subject", CREATED_SUBJECT),
            ("created_long", CREATED_LONG),
            ("created_short", CREATED_SHORT),
            ("updated_subject", UPDATED_SUBJECT),
            ("updated_long", UPDATED_LONG),
            ("updated_short", UPDATED_SHORT),
            ("digest_subject", DIGEST_SUBJECT),
            ("digest_long", DIGEST_LONG),
            ("digest_short", DIGEST_SHORT),
        ] {
            registry.register_template_string(name, template).map_err(|e| {
                AppError::with_source(
                    ErrorKind::Internal,
                    format!("Failed to compile template '{name}'"),
                    e,
                )
            })?;
        }
        Ok(Self {
            registry,
            site_url: site_url.into(),
        })
    }

    /// The notice announcing a newly created opportunity.
    pub fn created(&self, event: &OpportunitySaved) -> AppResult<NoticeContent> {
        self.saved_notice("created", event)
    }

    /// The notice announcing an update to a followed opportunity.
    pub fn updated(&self, event: &OpportunitySaved) -> AppResult<NoticeContent> {
        self.saved_notice("updated", event)
    }

    /// The periodic digest listing recently entered opportunities.
    pub fn digest(&self, opportunities: &[Opportunity], days: i64) -> AppResult<NoticeContent> {
        let ref_list = opportunities
            .iter()
            .map(|o| o.ref_no.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let data = json!({
            "site_url": self.site_url,
            "days": days,
            "count": opportunities.len(),
            "ref_list": ref_list,
            "generated_at": Utc::now().to_rfc3339(),
            "opportunities": opportunities
                .iter()
                .map(|o| json!({
                    "id": o.id,
                    "ref_no": o.ref_no,
                    "title": o.title.as_deref().unwrap_or(&o.ref_no),
                }))
                .collect::<Vec<_>>(),
        });
        Ok(NoticeContent {
            subject: self.render("digest_subject", &data)?,
            long_body: self.render("digest_long", &data)?,
            short_body: self.render("digest_short", &data)?,
        })
    }

    fn saved_notice(&self, prefix: &str, event: &OpportunitySaved) -> AppResult<NoticeContent> {
        let data = json!({
            "site_url": self.site_url,
            "opportunity_id": event.opportunity_id,
            "ref_no": event.ref_no,
            "display_title": event.display_title(),
            "occurred_at": event.occurred_at.to_rfc3339(),
        });
        Ok(NoticeContent {
            subject: self.render(&format!("{prefix}_subject"), &data)?,
            long_body: self.render(&format!("{prefix}_long"), &data)?,
            short_body: self.render(&format!("{prefix}_short"), &data)?,
        })
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> AppResult<String> {
        self.registry.render(name, data).map_err(|e| {
            AppError::with_source(
                ErrorKind::Internal,
                format!("Failed to render template '{name}'"),
                e,
            )
        })
    }
}
