use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use menu_pipeline::cli::{self, USAGE};
use menu_pipeline::config::{EstimationStrategy, PipelineConfig};
use menu_pipeline::inference::InferenceBackend;
use menu_pipeline::ollama::OllamaClient;
use menu_pipeline::pipeline;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_logging();

    let options = cli::parse_args(env::args().skip(1)).context("invalid command line")?;
    if options.help {
        println!("{USAGE}");
        return Ok(());
    }

    info!("Starting menu pipeline v{}", env!("CARGO_PKG_VERSION"));

    let mut config = PipelineConfig::load(options.config.as_deref()).context("failed to load configuration")?;
    if let Some(strategy) = options.strategy {
        config.estimation.strategy = strategy;
    }

    let backend: Option<Arc<dyn InferenceBackend>> = match config.estimation.strategy {
        EstimationStrategy::Inference => {
            let client = OllamaClient::from_config(&config.estimation.inference)
                .context("failed to create inference client")?;
            info!(
                "Using inference backend {} at {}",
                config.estimation.inference.model, config.estimation.inference.base_url
            );
            Some(Arc::new(client))
        }
        EstimationStrategy::Table => None,
    };

    let report = pipeline::run(&config, options.run_options(), backend)
        .await
        .context("pipeline run failed")?;
    report.log_summary();

    Ok(())
}
