use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use bls_templates::BlockSpecs;
use clap::Args;

use crate::args::GlobalArgs;
use crate::commands::Command;

#[derive(Args, Debug)]
pub struct Check {
    /// Project directories to validate.
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,
}

impl Command for Check {
    async fn execute(&self, args: &GlobalArgs) -> Result<ExitCode> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter())),
            )
            .with_target(false)
            .init();

        let mut total_findings = 0usize;

        for path in &self.paths {
            let root = path.canonicalize()?;
            let settings = bls_conf::Settings::new(&root)
                .unwrap_or_else(|_| bls_conf::Settings::default());
            let specs = BlockSpecs::from_settings(&settings);

            for (file, diagnostics) in bls_server::workspace::validate_workspace(&root, &specs) {
                for diagnostic in &diagnostics {
                    total_findings += 1;
                    let code = match &diagnostic.code {
                        Some(tower_lsp_server::ls_types::NumberOrString::String(code)) => {
                            code.as_str()
                        }
                        _ => "",
                    };
                    if !args.quiet {
                        println!(
                            "{}:{}:{}: {code} {}",
                            file.display(),
                            diagnostic.range.start.line + 1,
                            diagnostic.range.start.character + 1,
                            diagnostic.message
                        );
                    }
                }
            }
        }

        if total_findings == 0 {
            if !args.quiet {
                println!("No template issues found.");
            }
            Ok(ExitCode::SUCCESS)
        } else {
            if !args.quiet {
                println!("{total_findings} issue(s) found.");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
