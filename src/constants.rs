/// Namespace prefix for identifier entries in the process environment
pub const ENV_NAMESPACE: &str = "STS_";

/// Field prefix for the session duration of an identifier
pub const EXPIRES_IN_FIELD: &str = "EXPIRES_IN_";

/// Field prefix for the role ARN of an identifier
pub const ARN_FIELD: &str = "ARN_";

/// Field prefix for policy statement fragments of an identifier
pub const POLICY_FIELD: &str = "POLICY_";

/// Field prefix for the human-readable title of an identifier
pub const TITLE_FIELD: &str = "TITLE_";

/// Session duration used when an identifier does not configure one
pub const DEFAULT_EXPIRES_IN: &str = "900";

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Sid injected into every statement
pub const STATEMENT_SID: &str = "All";

/// Principal injected into every statement
pub const STATEMENT_PRINCIPAL: &str = "*";

/// Layout of the normalized expiration string
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default STS endpoint (Yandex Cloud exposes an AWS-compatible STS)
pub const DEFAULT_STS_URL: &str = "https://sts.yandexcloud.net/";

/// Region used for request signing when none is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default fixed offset for rendered expirations (UTC+3)
pub const DEFAULT_EXPIRATION_UTC_OFFSET: &str = "+03:00";

/// Default upstream call timeout in seconds
pub const DEFAULT_STS_TIMEOUT_SECS: u64 = 30;

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 3333;

/// Grace period for in-flight requests on shutdown
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

/// Environment variables read by the process
pub mod env {
    pub const STS_URL: &str = "YC_STS_URL";
    pub const REGION: &str = "STS_REGION";
    pub const TIMEOUT_SECS: &str = "STS_TIMEOUT_SECS";
    pub const EXPIRATION_UTC_OFFSET: &str = "STS_EXPIRATION_UTC_OFFSET";
    pub const PORT: &str = "STS_PORTS";
    pub const CRON_IDENTIFIER: &str = "STS_CRON_IDENTIFIER";
    pub const WEBHOOK: &str = "RC_WEBHOOK";
    pub const CHANNEL_PREFIX: &str = "RC_CHANNEL_";
}
