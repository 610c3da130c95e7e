use aws_smithy_types::DateTime;
use chrono::FixedOffset;
use serde::Serialize;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, warn};

use crate::aws::{AssumeRole, AssumeRoleRequest};
use crate::config::Settings;
use crate::constants::EXPIRATION_FORMAT;
use crate::error::{Error, Result};
use crate::policy::PolicyDocument;
use crate::registry::Registry;

/// Credentials in the shape handed to HTTP clients and notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCredentials {
    #[serde(rename = "access_key")]
    pub access_key_id: String,
    #[serde(rename = "secret_key")]
    pub secret_access_key: String,
    pub session_token: String,
    /// `YYYY-MM-DD HH:MM:SS` in the configured fixed offset
    pub expiration: String,
}

/// Turns an identifier into scoped temporary credentials.
///
/// Stateless per call: every `issue` builds a fresh policy and request and
/// makes exactly one upstream call, so concurrent use needs no locking.
pub struct Issuer {
    registry: Arc<Registry>,
    client: Arc<dyn AssumeRole>,
    expiration_offset: FixedOffset,
    timeout: Duration,
}

impl Issuer {
    pub fn new(registry: Arc<Registry>, client: Arc<dyn AssumeRole>, settings: &Settings) -> Self {
        Self {
            registry,
            client,
            expiration_offset: settings.expiration_offset,
            timeout: settings.sts_timeout,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve duration, role and policy for an identifier without calling STS
    pub fn build_request(&self, identifier: &str) -> Result<AssumeRoleRequest> {
        let metadata = self.registry.lookup(identifier)?;

        let duration_seconds = metadata
            .expires_in
            .parse::<i32>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| Error::InvalidDuration {
                identifier: identifier.to_string(),
                value: metadata.expires_in.clone(),
            })?;

        let role_arn = metadata
            .arn
            .clone()
            .ok_or_else(|| Error::MissingRoleArn(identifier.to_string()))?;

        let document = PolicyDocument::from_fragments(identifier, &metadata.policies)?;
        let policy = document.to_json().map_err(|source| Error::PolicyBuild {
            identifier: identifier.to_string(),
            source,
        })?;
        debug!("Policy for {}: {}", identifier, policy);

        Ok(AssumeRoleRequest {
            role_arn,
            policy,
            duration_seconds,
            session_name: session_name(),
        })
    }

    pub async fn issue(&self, identifier: &str) -> Result<IssuedCredentials> {
        let request = self.build_request(identifier)?;

        let credentials = match tokio::time::timeout(self.timeout, self.client.assume_role(request))
            .await
        {
            Ok(Ok(credentials)) => credentials,
            Ok(Err(e)) => {
                warn!("AssumeRole failed for {}: {:#}", identifier, e);
                return Err(Error::AssumeRole(format!("{e:#}")));
            }
            Err(_) => {
                warn!("AssumeRole timed out for {}", identifier);
                return Err(Error::AssumeRole(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f64()
                )));
            }
        };

        info!("STS credentials issued for {}", identifier);

        Ok(IssuedCredentials {
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: credentials.session_token,
            expiration: format_expiration(&credentials.expiration, self.expiration_offset)?,
        })
    }
}

/// Render an instant as `YYYY-MM-DD HH:MM:SS` in a fixed offset
pub fn format_expiration(expiration: &DateTime, offset: FixedOffset) -> Result<String> {
    let instant = chrono::DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
        .ok_or_else(|| Error::Timezone(format!("instant out of range: {}s", expiration.secs())))?;

    Ok(instant
        .with_timezone(&offset)
        .format(EXPIRATION_FORMAT)
        .to_string())
}

fn session_name() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "session-{}-{}",
        nanos,
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}
