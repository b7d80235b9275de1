//! # Command-Line Arguments

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::config::EstimationStrategy;
use crate::pipeline::{RunOptions, Stage};

pub const USAGE: &str = "\
Usage: menu_pipeline [OPTIONS]

Options:
  --config PATH        Pipeline configuration file (TOML); defaults to $PIPELINE_CONFIG
  --stage STAGE        clean | allergens | dedup | estimate | all (default: all)
  --strategy STRATEGY  table | inference; overrides the configured estimation strategy
  --limit N            Estimate only the first N unique dishes
  -h, --help           Print this help";

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub stage: Stage,
    pub strategy: Option<EstimationStrategy>,
    pub limit: Option<usize>,
    pub help: bool,
}

impl CliOptions {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            stage: self.stage,
            limit: self.limit,
        }
    }
}

/// Parse arguments, excluding the program name
pub fn parse_args<I, S>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().context("missing value for --config")?;
                options.config = Some(PathBuf::from(value));
            }
            "--stage" => {
                let value = args.next().context("missing value for --stage")?;
                options.stage = value.parse().map_err(|e: String| anyhow!(e))?;
            }
            "--strategy" => {
                let value = args.next().context("missing value for --strategy")?;
                options.strategy = Some(value.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--limit" => {
                let value = args.next().context("missing value for --limit")?;
                let limit: usize = value
                    .parse()
                    .with_context(|| format!("invalid --limit value '{value}'"))?;
                options.limit = Some(limit);
            }
            "-h" | "--help" => options.help = true,
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(options)
}
