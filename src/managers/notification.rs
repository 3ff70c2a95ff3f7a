//! Discord webhook notification manager
//!
//! Sends one message per enabled event at the end of a backup run.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::{NotificationConfig, NotifyEvent};
use crate::managers::report::RunSummary;

/// Maximum number of failed devices listed in one message
const MAX_LISTED_DEVICES: usize = 15;

/// Notification manager for sending Discord webhooks
pub struct NotificationManager {
    config: NotificationConfig,
    client: reqwest::Client,
}

/// Discord embed color codes (decimal)
#[derive(Debug, Clone, Copy)]
pub enum NotificationColor {
    /// Red - for failures
    Failure = 15158332,    // #E74C3C
    /// Blue - for configuration changes
    Changes = 3447003,     // #3498DB
    /// Green - for success
    Success = 3066993,     // #2ECC71
}

impl NotificationColor {
    fn as_decimal(&self) -> u32 {
        *self as u32
    }
}

/// Discord webhook payload
#[derive(Debug, Serialize)]
struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<DiscordFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct DiscordFooter {
    text: String,
}

impl NotificationManager {
    /// Create a new notification manager
    pub fn new(config: NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Check if notifications are enabled for an event type
    pub fn is_enabled(&self, event: &NotifyEvent) -> bool {
        if self.config.discord_webhook_url.is_empty() {
            return false;
        }
        self.config.notify_on.contains(event)
    }

    /// Events a run summary triggers, before filtering by configuration
    pub fn events_for(summary: &RunSummary) -> Vec<NotifyEvent> {
        let mut events = Vec::new();
        if summary.failed > 0 {
            events.push(NotifyEvent::Failure);
        } else {
            events.push(NotifyEvent::Success);
        }
        if summary.changes_detected > 0 {
            events.push(NotifyEvent::Changes);
        }
        events
    }

    /// Send every enabled notification for a finished run
    pub async fn notify_run(&self, summary: &RunSummary) -> Result<()> {
        for event in Self::events_for(summary) {
            if !self.is_enabled(&event) {
                debug!("Notification type {:?} not enabled, skipping", event);
                continue;
            }

            let payload = self.build_payload(&event, summary);
            self.send_webhook(&payload).await?;
            info!("Sent {:?} notification", event);
        }
        Ok(())
    }

    /// Build Discord webhook payload
    fn build_payload(&self, event: &NotifyEvent, summary: &RunSummary) -> DiscordPayload {
        let (color, emoji, description) = match event {
            NotifyEvent::Failure => (
                NotificationColor::Failure,
                "\u{274C}", // Red X
                format!("{} of {} device(s) failed to back up", summary.failed, summary.total),
            ),
            NotifyEvent::Success => (
                NotificationColor::Success,
                "\u{2705}", // Green check
                format!("All {} device(s) backed up", summary.total),
            ),
            NotifyEvent::Changes => (
                NotificationColor::Changes,
                "\u{1F4DD}", // Memo
                format!(
                    "Configuration changed on {} device(s)",
                    summary.changes_detected
                ),
            ),
        };

        let mut fields = vec![
            DiscordField {
                name: "Succeeded".to_string(),
                value: summary.succeeded.to_string(),
                inline: true,
            },
            DiscordField {
                name: "Failed".to_string(),
                value: summary.failed.to_string(),
                inline: true,
            },
        ];

        if let Some(finished) = summary.finished_at {
            let secs = (finished - summary.started_at).num_seconds().max(0) as u64;
            fields.push(DiscordField {
                name: "Duration".to_string(),
                value: format_duration(secs),
                inline: true,
            });
        }

        let listing = match event {
            NotifyEvent::Failure => Some((
                "Failed devices",
                summary
                    .errors
                    .iter()
                    .map(|f| format!("{} [{}] {}", f.hostname, f.category, f.message))
                    .collect::<Vec<_>>(),
            )),
            NotifyEvent::Changes => Some((
                "Changed devices",
                summary
                    .changed_devices()
                    .map(|r| r.hostname.clone())
                    .collect::<Vec<_>>(),
            )),
            NotifyEvent::Success => None,
        };

        if let Some((name, lines)) = listing {
            fields.push(DiscordField {
                name: name.to_string(),
                value: format!("```\n{}\n```", truncate_lines(&lines, MAX_LISTED_DEVICES)),
                inline: false,
            });
        }

        let embed = DiscordEmbed {
            title: format!("{} Network Config Backup: {:?}", emoji, event),
            description: Some(description),
            color: color.as_decimal(),
            fields,
            footer: Some(DiscordFooter {
                text: "netcfg-backup".to_string(),
            }),
            timestamp: summary
                .finished_at
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        };

        DiscordPayload {
            username: Some("Network Config Backup".to_string()),
            embeds: vec![embed],
        }
    }

    /// Send webhook to Discord
    async fn send_webhook(&self, payload: &DiscordPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.config.discord_webhook_url)
            .json(payload)
            .send()
            .await
            .context("Failed to send Discord webhook")?;

        let status = response.status();
        if status.is_success() {
            debug!("Discord webhook sent successfully");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Discord webhook failed with status {}: {}", status, body);
            anyhow::bail!("Discord webhook failed with status {}: {}", status, body)
        }
    }
}

/// Join lines, cutting off after `max` with a count of the rest
fn truncate_lines(lines: &[String], max: usize) -> String {
    let mut shown: Vec<String> = lines.iter().take(max).cloned().collect();
    if lines.len() > max {
        shown.push(format!("... and {} more", lines.len() - max));
    }
    shown.join("\n")
}

/// Format duration in human-readable form
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let secs = seconds % 60;
        if secs == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, secs)
        }
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}
