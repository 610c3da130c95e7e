use anyhow::{Context, Result};
use clap::{Args, Command, FromArgMatches};
use std::sync::Arc;
use tracing::info;

use crate::api::{self, AppState};
use crate::constants::{DEFAULT_PORT, env as vars};

#[derive(Debug, Clone, Args)]
pub struct ServeCommand {
    #[arg(short = 'p', long, env = vars::PORT, default_value_t = DEFAULT_PORT, help = "HTTP listen port")]
    pub port: u16,
}

impl ServeCommand {
    /// Arguments as clap resolves them with no flags given, so the port
    /// still honors the environment
    pub fn from_env() -> Result<Self> {
        let matches = Self::augment_args(Command::new("serve"))
            .try_get_matches_from(["serve"])
            .with_context(|| format!("Invalid {}", vars::PORT))?;
        Ok(Self::from_arg_matches(&matches)?)
    }

    pub async fn execute(self) -> Result<()> {
        let issuer = super::build_issuer().await?;
        info!(
            "Serving {} configured identifiers",
            issuer.registry().len()
        );
        api::serve(Arc::new(AppState::new(issuer)), self.port).await
    }
}
