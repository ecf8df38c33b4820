mod check;
mod serve;

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::args::GlobalArgs;

pub trait Command {
    async fn execute(&self, args: &GlobalArgs) -> Result<ExitCode>;
}

#[derive(Debug, Subcommand)]
pub enum BlsCommand {
    /// Start the LSP server on stdio
    Serve(serve::Serve),
    /// Validate every template in a project and report findings
    Check(check::Check),
}

impl Command for BlsCommand {
    async fn execute(&self, args: &GlobalArgs) -> Result<ExitCode> {
        match self {
            BlsCommand::Serve(command) => command.execute(args).await,
            BlsCommand::Check(command) => command.execute(args).await,
        }
    }
}
