//! Rocket.Chat incoming-webhook delivery of issued credentials

use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::constants::env as vars;
use crate::issuer::IssuedCredentials;

const DEFAULT_ALIAS: &str = "StsIssuer";
const DEFAULT_EMOJI: &str = ":key:";
const DEFAULT_COLOR: &str = "#8fce00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RocketChatPayload {
    pub alias: String,
    pub emoji: String,
    pub channel: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl RocketChatPayload {
    pub fn new(creds: &IssuedCredentials, title: &str, channel: &str) -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
            emoji: DEFAULT_EMOJI.to_string(),
            channel: channel.to_string(),
            text: format!(
                ":key: S3 Credentials: {title}\n:alarm_clock: Expires: ~{}",
                creds.expiration
            ),
            attachments: vec![Attachment {
                text: shell_exports(creds),
                color: DEFAULT_COLOR.to_string(),
            }],
        }
    }
}

/// Shell lines exporting the credentials as standard AWS variables
pub fn shell_exports(creds: &IssuedCredentials) -> String {
    format!(
        "export AWS_ACCESS_KEY_ID=\"{}\";\n\nexport AWS_SECRET_ACCESS_KEY=\"{}\";\n\nexport AWS_SESSION_TOKEN=\"{}\";",
        creds.access_key_id, creds.secret_access_key, creds.session_token
    )
}

/// Where and how an identifier's credentials are announced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub webhook: String,
    pub channel: String,
    pub title: String,
}

impl NotifyTarget {
    /// Webhook and channel come from the lookup; the title is the
    /// identifier's configured `TITLE`
    pub fn from_lookup<F>(identifier: &str, title: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let webhook = get(vars::WEBHOOK)
            .with_context(|| format!("{} environment variable is not set", vars::WEBHOOK))?;

        let channel_key = format!("{}{identifier}", vars::CHANNEL_PREFIX);
        let channel = get(channel_key.as_str())
            .with_context(|| format!("{channel_key} environment variable is not set"))?;

        let title = title
            .filter(|t| !t.is_empty())
            .with_context(|| format!("No title configured for identifier: {identifier}"))?
            .to_string();

        Ok(Self {
            webhook,
            channel,
            title,
        })
    }
}

pub struct RocketChatNotifier {
    client: Client,
}

impl RocketChatNotifier {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub async fn send(&self, target: &NotifyTarget, creds: &IssuedCredentials) -> Result<()> {
        let payload = RocketChatPayload::new(creds, &target.title, &target.channel);

        let response = self
            .client
            .post(&target.webhook)
            .json(&payload)
            .send()
            .await
            .context("Failed to send notification")?;

        if response.status() != StatusCode::OK {
            bail!(
                "Unexpected response from Rocket.Chat: {}",
                response.status()
            );
        }

        info!("Rocket.Chat notification sent to {}", target.channel);
        Ok(())
    }
}
