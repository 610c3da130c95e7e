use anyhow::{Context, Result};
use std::sync::Arc;

use crate::{aws::StsAssumeRole, config::Settings, issuer::Issuer, registry::Registry};

pub mod completions;
pub mod issue;
pub mod list;
pub mod notify;
pub mod serve;

pub use completions::CompletionsCommand;
pub use issue::IssueCommand;
pub use list::ListCommand;
pub use notify::NotifyCommand;
pub use serve::ServeCommand;

/// Validate settings, snapshot identifiers and build the STS client once
async fn build_issuer() -> Result<Issuer> {
    let settings = Settings::from_env().context("Invalid configuration")?;
    let registry = Arc::new(Registry::from_env());
    let client = Arc::new(StsAssumeRole::from_settings(&settings).await);
    Ok(Issuer::new(registry, client, &settings))
}
