use anyhow::Result;
use async_trait::async_trait;
use aws_smithy_types::DateTime;

pub mod sts;

pub use crate::constants::DEFAULT_AWS_REGION;
pub use sts::StsAssumeRole;

/// AWS temporary credentials structure
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

/// Parameters of a single AssumeRole call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    /// Serialized inline session policy
    pub policy: String,
    pub duration_seconds: i32,
    pub session_name: String,
}

/// Anything that can exchange a role ARN and policy for temporary credentials
#[async_trait]
pub trait AssumeRole: Send + Sync {
    async fn assume_role(&self, request: AssumeRoleRequest) -> Result<Credentials>;
}
