use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct IssueCommand {
    #[arg(help = "Identifier to issue credentials for")]
    pub id: String,
}

impl IssueCommand {
    pub async fn execute(self) -> Result<()> {
        let issuer = super::build_issuer().await?;
        let creds = issuer
            .issue(&self.id)
            .await
            .with_context(|| format!("Failed to issue credentials for '{}'", self.id))?;

        println!("{}", serde_json::to_string_pretty(&creds)?);
        Ok(())
    }
}
