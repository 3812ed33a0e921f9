//! Pushover notification transport.

use crate::config::PushoverSettings;
use crate::core::{NoopNotifier, Notifier};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Pushover message endpoint.
const PUSHOVER_MESSAGES_URL: &str = "https://api.pushover.net/1/messages.json";

/// Upper bound for a single notification request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pushover's reply body; only the fields we inspect.
#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i64,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct PushoverNotifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    settings: PushoverSettings,
}

impl PushoverNotifier {
    pub fn new(settings: PushoverSettings) -> Result<Self> {
        Self::with_endpoint(settings, PUSHOVER_MESSAGES_URL)
    }

    /// Build a notifier that posts to `endpoint` instead of the public API.
    pub fn with_endpoint(settings: PushoverSettings, endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("snapsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            settings,
        })
    }
}

impl Notifier for PushoverNotifier {
    fn notify(&mut self, message: &str) -> Result<()> {
        tracing::info!("Sending pushover notification...");
        tracing::info!("Message: {message}");

        let form = [
            ("token", self.settings.app_key.as_str()),
            ("user", self.settings.user_key.as_str()),
            ("message", message),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .context("Failed to send pushover message")?;

        let status = response.status();
        let body = response
            .text()
            .context("Failed to read pushover response")?;

        check_response(status, &body)
    }
}

/// Accept the response only if HTTP succeeded and Pushover reported status 1.
fn check_response(status: reqwest::StatusCode, body: &str) -> Result<()> {
    let parsed: Option<PushoverResponse> = serde_json::from_str(body).ok();

    match parsed {
        Some(reply) if status.is_success() && reply.status == 1 => {
            tracing::debug!(
                "Pushover response: request {}",
                reply.request.as_deref().unwrap_or("<none>")
            );
            Ok(())
        }
        Some(reply) if !reply.errors.is_empty() => {
            anyhow::bail!("Pushover rejected message ({status}): {}", reply.errors.join("; "))
        }
        _ => anyhow::bail!("Pushover returned {status}: {body}"),
    }
}

/// Pick the notifier for the configured settings.
pub fn notifier_for(settings: Option<&PushoverSettings>) -> Result<Box<dyn Notifier>> {
    match settings {
        Some(settings) => Ok(Box::new(PushoverNotifier::new(settings.clone())?)),
        None => Ok(Box::new(NoopNotifier)),
    }
}
