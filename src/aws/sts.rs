use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, ConfigLoader, Region};
use aws_sdk_sts::{Client as StsClient, error::DisplayErrorContext};
use tracing::{debug, info};

use super::{AssumeRole, AssumeRoleRequest, Credentials, DEFAULT_AWS_REGION};
use crate::config::Settings;

/// AssumeRole backed by an SDK client pointed at the configured endpoint
#[derive(Debug, Clone)]
pub struct StsAssumeRole {
    client: StsClient,
}

impl StsAssumeRole {
    pub fn new(client: StsClient) -> Self {
        Self { client }
    }

    /// Load SDK configuration once and build the client.
    ///
    /// Region priority: settings -> ENV vars / config file -> DEFAULT_AWS_REGION
    pub async fn from_settings(settings: &Settings) -> Self {
        let loader = || {
            let loader: ConfigLoader = aws_config::defaults(BehaviorVersion::latest())
                .endpoint_url(settings.sts_url.clone());
            match &settings.region {
                Some(region) => loader.region(Region::new(region.clone())),
                None => loader,
            }
        };

        let loaded = loader().load().await;
        let config = match loaded.region() {
            Some(region) => {
                info!("Using region: {}", region);
                loaded
            }
            None => {
                info!(
                    "No region configured, using default {} for STS",
                    DEFAULT_AWS_REGION
                );
                loader()
                    .region(Region::new(DEFAULT_AWS_REGION))
                    .load()
                    .await
            }
        };

        info!("STS endpoint: {}", settings.sts_url);
        Self::new(StsClient::new(&config))
    }
}

#[async_trait]
impl AssumeRole for StsAssumeRole {
    async fn assume_role(&self, request: AssumeRoleRequest) -> Result<Credentials> {
        info!("Calling STS AssumeRole");
        debug!("Role ARN: {}", request.role_arn);
        debug!("Session name: {}", request.session_name);
        debug!("Duration: {} seconds", request.duration_seconds);

        let response = self
            .client
            .assume_role()
            .role_arn(request.role_arn)
            .role_session_name(request.session_name)
            .policy(request.policy)
            .duration_seconds(request.duration_seconds)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        let sts_creds = response
            .credentials()
            .context("STS returned no credentials")?;

        Ok(Credentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration: *sts_creds.expiration(),
        })
    }
}
