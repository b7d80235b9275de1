//! # Pipeline Orchestrator
//!
//! Runs the stages in order over JSON snapshots:
//!
//! | Stage       | Reads                   | Writes                                 |
//! |-------------|-------------------------|----------------------------------------|
//! | `clean`     | raw restaurants         | clean restaurants, clean dishes        |
//! | `allergens` | clean dishes            | dishes with allergens                  |
//! | `dedup`     | dishes with allergens   | unique dishes                          |
//! | `estimate`  | unique dishes           | unique estimates, final dishes         |
//!
//! Each stage reads its input from disk, so a single stage can be rerun
//! against the previous stage's snapshot. The quality report is written at
//! the end of every run.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::allergens::AllergenClassifier;
use crate::cleaning::RestaurantCleaner;
use crate::config::{EstimationStrategy, PipelineConfig};
use crate::dedup::Deduplicator;
use crate::dish_model::{Dish, DishCluster, EstimatedDish, RawRestaurant};
use crate::errors::{ConfigError, PipelineError};
use crate::estimator::{apply_estimates, CalorieEstimator};
use crate::inference::InferenceBackend;
use crate::quality_filter::QualityFilter;
use crate::report::{DatasetAnalysis, DedupSummary, RunReport};
use crate::snapshot::{read_snapshot, write_json, write_snapshot};

/// Pipeline stage selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    Clean,
    Allergens,
    Dedup,
    Estimate,
    #[default]
    All,
}

impl Stage {
    const ORDER: [Stage; 4] = [Stage::Clean, Stage::Allergens, Stage::Dedup, Stage::Estimate];

    /// Concrete stages to run, in order
    pub fn expand(self) -> Vec<Stage> {
        match self {
            Stage::All => Self::ORDER.to_vec(),
            single => vec![single],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Allergens => "allergens",
            Stage::Dedup => "dedup",
            Stage::Estimate => "estimate",
            Stage::All => "all",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clean" => Ok(Stage::Clean),
            "allergens" => Ok(Stage::Allergens),
            "dedup" => Ok(Stage::Dedup),
            "estimate" => Ok(Stage::Estimate),
            "all" => Ok(Stage::All),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

/// Per-run options that are not part of the configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub stage: Stage,
    /// Estimate only the first N unique dishes
    pub limit: Option<usize>,
}

/// Pipeline bound to one configuration
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    backend: Option<Arc<dyn InferenceBackend>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config, backend: None }
    }

    /// Backend used when the inference strategy is configured
    pub fn with_backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    fn estimator(&self) -> Result<CalorieEstimator, ConfigError> {
        match self.config.estimation.strategy {
            EstimationStrategy::Table => Ok(CalorieEstimator::table(self.config)),
            EstimationStrategy::Inference => match &self.backend {
                Some(backend) => Ok(CalorieEstimator::inference(self.config, Arc::clone(backend))),
                None => Err(ConfigError::Invalid(
                    "inference strategy selected but no inference backend is available".to_string(),
                )),
            },
        }
    }

    /// Run the selected stages and write the quality report
    pub async fn run(&self, options: RunOptions) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::new();
        for stage in options.stage.expand() {
            info!(stage = stage.as_str(), "Starting stage");
            match stage {
                Stage::Clean => self.clean(&mut report)?,
                Stage::Allergens => self.allergens(&mut report)?,
                Stage::Dedup => self.dedup(&mut report)?,
                Stage::Estimate => self.estimate(&mut report, options.limit).await?,
                Stage::All => {}
            }
            report.stages.push(stage.to_string());
        }

        let paths = &self.config.paths;
        write_json(&paths.resolve(&paths.quality_report), &report)?;
        Ok(report)
    }

    fn clean(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        let paths = &self.config.paths;
        let raw: Vec<RawRestaurant> = read_snapshot(&paths.resolve(&paths.raw_restaurants))?;
        let cleaner = RestaurantCleaner::from_config(self.config)?;
        let output = cleaner.clean(&raw);

        write_snapshot(&paths.resolve(&paths.clean_restaurants), &output.restaurants)?;
        write_snapshot(&paths.resolve(&paths.clean_dishes), &output.dishes)?;
        report.cleaning = Some(output.stats);
        Ok(())
    }

    fn allergens(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        let paths = &self.config.paths;
        let dishes: Vec<Dish> = read_snapshot(&paths.resolve(&paths.clean_dishes))?;

        let (mut kept, stats) = QualityFilter::from_config(self.config).partition(dishes);
        AllergenClassifier::from_config(self.config)?.enrich(&mut kept);

        write_snapshot(&paths.resolve(&paths.dishes_with_allergens), &kept)?;
        report.filtering = Some(stats);
        Ok(())
    }

    fn dedup(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        let paths = &self.config.paths;
        let dishes: Vec<Dish> = read_snapshot(&paths.resolve(&paths.dishes_with_allergens))?;
        let unique = Deduplicator::new(self.config.dedup.lenient_rule()).cluster(&dishes);

        write_snapshot(&paths.resolve(&paths.unique_dishes), &unique)?;
        report.dedup = Some(DedupSummary {
            input_dishes: dishes.len(),
            unique_dishes: unique.len(),
        });
        Ok(())
    }

    async fn estimate(&self, report: &mut RunReport, limit: Option<usize>) -> Result<(), PipelineError> {
        let paths = &self.config.paths;
        let estimator = self.estimator()?;
        let unique: Vec<DishCluster> = read_snapshot(&paths.resolve(&paths.unique_dishes))?;

        let (estimated, mut summary): (Vec<EstimatedDish>, _) = estimator.estimate_all(&unique, limit).await;
        write_snapshot(&paths.resolve(&paths.unique_estimates), &estimated)?;

        let mut dishes: Vec<Dish> = read_snapshot(&paths.resolve(&paths.dishes_with_allergens))?;
        summary.merge_misses = apply_estimates(&mut dishes, &estimated);
        write_snapshot(&paths.resolve(&paths.final_dishes), &dishes)?;

        report.analysis = Some(DatasetAnalysis::from_dishes(&dishes));
        report.estimation = Some(summary);
        Ok(())
    }
}

/// Run a pipeline with `config` and an optional inference backend
pub async fn run(
    config: &PipelineConfig,
    options: RunOptions,
    backend: Option<Arc<dyn InferenceBackend>>,
) -> Result<RunReport, PipelineError> {
    let mut pipeline = Pipeline::new(config);
    if let Some(backend) = backend {
        pipeline = pipeline.with_backend(backend);
    }
    pipeline.run(options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_parsing() {
        assert_eq!("Dedup".parse::<Stage>(), Ok(Stage::Dedup));
        assert!("load".parse::<Stage>().is_err());
        assert_eq!(Stage::default(), Stage::All);
    }

    #[test]
    fn test_expand_all_keeps_order() {
        assert_eq!(
            Stage::All.expand(),
            vec![Stage::Clean, Stage::Allergens, Stage::Dedup, Stage::Estimate]
        );
        assert_eq!(Stage::Estimate.expand(), vec![Stage::Estimate]);
    }

    #[tokio::test]
    async fn test_inference_without_backend_is_config_error() {
        let mut config = PipelineConfig::default();
        config.estimation.strategy = EstimationStrategy::Inference;
        let dir = tempfile::TempDir::new().unwrap();
        config.paths.data_dir = dir.path().to_path_buf();
        let result = run(
            &config,
            RunOptions {
                stage: Stage::Estimate,
                limit: None,
            },
            None,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
