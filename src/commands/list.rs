use anyhow::Result;
use clap::Args;

use crate::registry::Registry;

#[derive(Debug, Clone, Args)]
pub struct ListCommand {
    #[arg(help = "Show a single identifier instead of all of them")]
    pub id: Option<String>,
}

impl ListCommand {
    pub fn execute(self) -> Result<()> {
        let registry = Registry::from_env();
        let json = match self.id {
            Some(id) => serde_json::to_string_pretty(&registry.resolve_metadata(&id)?)?,
            None => serde_json::to_string_pretty(&registry.list_identifiers())?,
        };
        println!("{json}");
        Ok(())
    }
}
