//! Error types for identifier lookup and credential issuance

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the registry and the issuer
#[derive(Error, Debug)]
pub enum Error {
    /// No configuration entry names the identifier
    #[error("no configuration found for identifier: {0}")]
    NotFound(String),

    /// A field required to describe the identifier is absent
    #[error("missing required field '{field}' for identifier: {identifier}")]
    MissingRequiredField {
        identifier: String,
        field: &'static str,
    },

    /// Configured duration is not a positive 32-bit integer
    #[error("invalid duration '{value}' for identifier: {identifier}")]
    InvalidDuration { identifier: String, value: String },

    /// No role ARN resolved for the identifier
    #[error("missing role ARN for identifier: {0}")]
    MissingRoleArn(String),

    /// A policy fragment could not be parsed
    #[error("failed to create policy for identifier {identifier}: {source}")]
    PolicyBuild {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },

    /// The upstream STS rejected or failed the request
    #[error("failed to assume role: {0}")]
    AssumeRole(String),

    /// The returned expiration cannot be rendered in the configured offset
    #[error("failed to convert expiration to configured timezone: {0}")]
    Timezone(String),
}

/// Coarse classification used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Upstream,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::MissingRequiredField { .. }
            | Error::InvalidDuration { .. }
            | Error::MissingRoleArn(_)
            | Error::PolicyBuild { .. } => ErrorKind::Configuration,
            Error::AssumeRole(_) => ErrorKind::Upstream,
            Error::Timezone(_) => ErrorKind::Internal,
        }
    }
}
