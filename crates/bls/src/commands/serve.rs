use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::args::GlobalArgs;
use crate::commands::Command;

#[derive(Args, Debug)]
pub struct Serve {}

impl Command for Serve {
    async fn execute(&self, _args: &GlobalArgs) -> Result<ExitCode> {
        bls_server::serve().await?;
        Ok(ExitCode::SUCCESS)
    }
}
