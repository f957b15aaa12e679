/// Best-effort operator notifications. Failures are logged and swallowed;
/// a dead webhook must never change what the supervisor does next.
use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;

/// Capability interface for state-transition notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Used when no webhook is configured, and by tests.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _message: &str) {}
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts messages to a Discord webhook, optionally @-mentioning a user.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
    mention_target: Option<String>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>, mention_target: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
            mention_target,
        }
    }

    fn format_message(&self, message: &str) -> String {
        match &self.mention_target {
            Some(id) => format!("<@{id}> {message}"),
            None => message.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, message: &str) {
        let content = self.format_message(message);
        let result = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { content: &content })
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(_) => tracing::debug!("notification delivered"),
            Err(e) => tracing::warn!(error = %e, "notification failed"),
        }
    }
}

/// Pick the notifier implied by the configuration.
pub fn from_config(config: &Config) -> Box<dyn Notifier> {
    match &config.webhook_url {
        Some(url) => Box::new(DiscordNotifier::new(url, config.mention_target.clone())),
        None => Box::new(NoopNotifier),
    }
}
