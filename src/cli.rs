use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::env;

use crate::commands::{CompletionsCommand, IssueCommand, ListCommand, NotifyCommand, ServeCommand};
use crate::constants::env as vars;

#[derive(Debug, Clone, Parser)]
#[command(name = "sts-issuer", version, about = "Issue scoped temporary STS credentials", long_about = None)]
pub struct Cli {
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v debug, -vv trace)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Serve credentials over HTTP")]
    Serve(ServeCommand),
    #[command(about = "Issue credentials once and post them to Rocket.Chat")]
    Notify(NotifyCommand),
    #[command(about = "Issue credentials and print them as JSON")]
    Issue(IssueCommand),
    #[command(about = "Print configured identifiers as JSON")]
    List(ListCommand),
    #[command(about = "Generate shell completion scripts for sts-issuer")]
    Completions(CompletionsCommand),
}

impl Commands {
    /// Command used when none is given: a configured cron identifier selects
    /// a one-shot notification, otherwise the HTTP server runs
    pub fn fallback(cron_identifier: Option<String>) -> Result<Self> {
        match cron_identifier.filter(|id| !id.is_empty()) {
            Some(id) => Ok(Commands::Notify(NotifyCommand { id })),
            None => Ok(Commands::Serve(ServeCommand::from_env()?)),
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let command = match self.command {
            Some(command) => command,
            None => Commands::fallback(env::var(vars::CRON_IDENTIFIER).ok())?,
        };

        match command {
            Commands::Serve(cmd) => cmd.execute().await,
            Commands::Notify(cmd) => cmd.execute().await,
            Commands::Issue(cmd) => cmd.execute().await,
            Commands::List(cmd) => cmd.execute(),
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}
