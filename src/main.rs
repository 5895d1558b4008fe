//! Entry point of the `ozxcheck` command.
//!
//! Validates one archive, or writes a synthetic fixture first with
//! `--generate`, and prints the report as a table or as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use ozxcheck::{Cli, ValidationReport, Validator};

const EXIT_CONFORMANT: u8 = 0;
const EXIT_RULE_FAILED: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .init();

    match run(&cli).await {
        Ok(report) => {
            if let Err(e) = print_report(&report, &cli) {
                eprintln!("error: {e:#}");
                return ExitCode::from(EXIT_ERROR);
            }
            if report.is_conformant() {
                ExitCode::from(EXIT_CONFORMANT)
            } else {
                ExitCode::from(EXIT_RULE_FAILED)
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: &Cli) -> Result<ValidationReport> {
    let validator = Validator::new(cli.validator_config())?;

    if cli.generate {
        if cli.is_http_url() {
            anyhow::bail!("--generate needs a local file, not a URL");
        }
        let options = cli.fixture_options()?;
        let data = cli.synthetic_data()?;
        return validator
            .generate_and_validate(&cli.file, data, &options)
            .await
            .with_context(|| format!("generating {}", cli.file));
    }

    validator
        .validate_location(&cli.file)
        .await
        .with_context(|| format!("validating {}", cli.file))
}

fn print_report(report: &ValidationReport, cli: &Cli) -> Result<()> {
    if cli.json {
        println!("{}", report.to_json()?);
    } else if !(cli.quiet && report.is_conformant()) {
        println!("{report}");
    }
    Ok(())
}
