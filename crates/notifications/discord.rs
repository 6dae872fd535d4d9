use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::{BookingNotification, notifier::NotificationProvider};

const DISCORD_CONTENT_LIMIT: usize = 2000;

/// Posts booking alerts to an admin Discord channel.
pub struct DiscordWebhookProvider {
    webhook_url: Url,
    client: Client,
}

impl DiscordWebhookProvider {
    pub fn new(webhook_url: Url) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            webhook_url,
            client,
        }
    }
}

pub(crate) fn format_content(notification: &BookingNotification) -> String {
    let session = &notification.session;
    let mut lines = vec![
        format!(
            "**Booking {}** `{}` `{}`",
            notification.event.as_str(),
            session.id,
            session.status
        ),
        format!("> {} <{}>", session.full_name, session.contact_email),
        format!(
            "purpose: `{}` field: `{}`",
            session.purpose,
            session.custom_field.as_deref().unwrap_or(&session.field)
        ),
        format!(
            "slot: `{} {}` (lead {} days)",
            session.scheduled_date,
            session.scheduled_time.format("%H:%M"),
            session.lead_time_days
        ),
    ];

    if let Some(plan) = &notification.plan {
        lines.push(format!("plan: `{}` ({})", plan.id, plan.display_name));
    }
    if let Some(charge) = session.committed_charge {
        lines.push(format!("committed charge: `{charge}`"));
    }

    truncate_for_discord(lines.join("\n"))
}

#[async_trait]
impl NotificationProvider for DiscordWebhookProvider {
    async fn send(&self, notification: &BookingNotification) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": format_content(notification) }))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "discord webhook returned non-success status: {}",
            response.status()
        ))
    }

    fn provider_name(&self) -> &'static str {
        "discord"
    }
}

// reqwest errors embed the URL, which carries the webhook token
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("discord webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("discord webhook connection failed");
    }
    anyhow!("discord webhook request failed")
}

fn truncate_for_discord(content: String) -> String {
    const SUFFIX: &str = "\n… (truncated)";

    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }

    let allowed = DISCORD_CONTENT_LIMIT.saturating_sub(SUFFIX.chars().count());
    let mut truncated: String = content.chars().take(allowed).collect();
    truncated.push_str(SUFFIX);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::sessions::SessionEntity;
    use crate::domain::value_objects::{
        enums::{purposes::Purpose, session_statuses::SessionStatus},
        sessions::{OTHER_FIELD, SessionProfile},
    };
    use crate::notifications::BookingEvent;
    use crate::pricing::catalog::PricingCatalog;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    fn waitlisted_alert() -> BookingNotification {
        let now = Utc::now();
        BookingNotification {
            event: BookingEvent::Waitlisted,
            session: SessionEntity {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                contact_email: "femi@example.com".to_string(),
                full_name: "Femi Alade".to_string(),
                institution: None,
                field: OTHER_FIELD.to_string(),
                custom_field: Some("Maritime Logistics".to_string()),
                purpose: Purpose::Promotion,
                scheduled_date: NaiveDate::from_ymd_opt(2026, 6, 12).unwrap(),
                scheduled_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
                lead_time_days: 6,
                profile: SessionProfile::default(),
                selected_plan_id: Some("int_gold_once".to_string()),
                status: SessionStatus::WaitingList,
                paid: false,
                committed_charge: Some(8500),
                created_at: now,
                updated_at: now,
            },
            plan: PricingCatalog::standard().lookup_plan("int_gold_once").cloned(),
        }
    }

    #[test]
    fn alert_names_the_candidate_slot_and_charge() {
        let content = format_content(&waitlisted_alert());

        assert!(content.starts_with("**Booking waitlisted**"));
        assert!(content.contains("Femi Alade <femi@example.com>"));
        assert!(content.contains("field: `Maritime Logistics`"));
        assert!(content.contains("slot: `2026-06-12 14:30`"));
        assert!(content.contains("plan: `int_gold_once` (Gold Interview)"));
        assert!(content.contains("committed charge: `8500`"));
    }

    #[test]
    fn long_content_is_truncated() {
        let content = truncate_for_discord("x".repeat(DISCORD_CONTENT_LIMIT + 10));
        assert_eq!(content.chars().count(), DISCORD_CONTENT_LIMIT);
        assert!(content.ends_with("(truncated)"));
    }
}
