//! # Pipeline Configuration Module
//!
//! Configuration structures for every stage: snapshot paths, data-quality
//! thresholds, fuzzy-matching thresholds, keyword dictionaries and the
//! estimation strategy. Every section has a `Default` impl, so a TOML file
//! only needs to name what it overrides.
//!
//! The configuration is built once at process start and passed by reference
//! to each component.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::dedup::MergeRule;
use crate::dish_model::Allergen;
use crate::dish_type::DishTypeRule;
use crate::errors::ConfigError;
use crate::similarity::FuzzyThresholds;
use crate::vocabulary;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "PIPELINE_CONFIG";

/// Snapshot file locations, relative to `data_dir` unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub raw_restaurants: PathBuf,
    pub clean_restaurants: PathBuf,
    pub clean_dishes: PathBuf,
    pub dishes_with_allergens: PathBuf,
    pub unique_dishes: PathBuf,
    pub unique_estimates: PathBuf,
    pub final_dishes: PathBuf,
    pub quality_report: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_restaurants: PathBuf::from("raw_restaurants.json"),
            clean_restaurants: PathBuf::from("clean_restaurants.json"),
            clean_dishes: PathBuf::from("clean_dishes.json"),
            dishes_with_allergens: PathBuf::from("dishes_with_allergens.json"),
            unique_dishes: PathBuf::from("unique_dishes.json"),
            unique_estimates: PathBuf::from("unique_dishes_estimated.json"),
            final_dishes: PathBuf::from("dishes_final.json"),
            quality_report: PathBuf::from("quality_report.json"),
        }
    }
}

impl PathsConfig {
    /// Resolve a snapshot path against `data_dir`
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}

/// Data-quality thresholds applied by the cleaning stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_price: f64,
    pub max_price: f64,
    pub min_dish_name_length: usize,
    pub max_dish_name_length: usize,
    pub min_dishes_per_restaurant: usize,
    /// Source tag stamped on every cleaned record
    pub source: String,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_price: 0.5,
            max_price: 150.0,
            min_dish_name_length: 3,
            max_dish_name_length: 100,
            min_dishes_per_restaurant: 2,
            source: "Glovo".to_string(),
        }
    }
}

/// Clustering thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Name similarity that merges on its own
    pub name_threshold: u8,
    /// Lower name similarity that merges when ingredients overlap enough
    pub weak_name_threshold: u8,
    pub min_overlap: f64,
    /// Name similarity that must be exceeded in the type-aware rule
    pub type_aware_name_threshold: u8,
    pub type_aware_min_overlap: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            name_threshold: 90,
            weak_name_threshold: 80,
            min_overlap: 0.5,
            type_aware_name_threshold: 90,
            type_aware_min_overlap: 0.8,
        }
    }
}

impl DedupConfig {
    pub fn lenient_rule(&self) -> MergeRule {
        MergeRule::NameOrOverlap {
            name_threshold: self.name_threshold,
            weak_name_threshold: self.weak_name_threshold,
            min_overlap: self.min_overlap,
        }
    }

    pub fn type_aware_rule(&self) -> MergeRule {
        MergeRule::TypeAware {
            name_threshold: self.type_aware_name_threshold,
            min_overlap: self.type_aware_min_overlap,
        }
    }
}

/// Milan locality heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalityConfig {
    pub keywords: Vec<String>,
    pub postal_codes: Vec<String>,
    pub zones: Vec<String>,
}

impl Default for LocalityConfig {
    fn default() -> Self {
        Self {
            keywords: vocabulary::milan_keywords(),
            postal_codes: vocabulary::milan_postal_codes(),
            zones: vocabulary::milan_zones(),
        }
    }
}

/// Regex alias that canonicalizes a restaurant name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameAlias {
    pub pattern: String,
    pub replacement: String,
}

fn default_aliases() -> Vec<NameAlias> {
    vocabulary::restaurant_aliases()
        .into_iter()
        .map(|(pattern, replacement)| NameAlias { pattern, replacement })
        .collect()
}

/// Allergen dictionaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllergenConfig {
    /// Allergen tag name to keyword variants
    pub keywords: BTreeMap<String, Vec<String>>,
    /// Dish type to implied tags
    pub type_rules: BTreeMap<String, Vec<Allergen>>,
}

impl Default for AllergenConfig {
    fn default() -> Self {
        Self {
            keywords: vocabulary::allergen_keywords(),
            type_rules: vocabulary::type_allergen_rules(),
        }
    }
}

/// Non-dish record filter vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub non_dish_types: Vec<String>,
    pub exclusion_keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            non_dish_types: vocabulary::non_dish_types(),
            exclusion_keywords: vocabulary::exclusion_keywords(),
        }
    }
}

/// Estimation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationStrategy {
    #[default]
    Table,
    Inference,
}

impl std::str::FromStr for EstimationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(EstimationStrategy::Table),
            "inference" => Ok(EstimationStrategy::Inference),
            other => Err(format!("unknown estimation strategy: {other}")),
        }
    }
}

impl std::fmt::Display for EstimationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EstimationStrategy::Table => "table",
            EstimationStrategy::Inference => "inference",
        })
    }
}

/// Table-lookup estimation data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub calories_per_100g: BTreeMap<String, f64>,
    pub serving_weights: BTreeMap<String, f64>,
    pub default_serving_weight: f64,
    /// Estimates above this many kcal are unhealthy
    pub calorie_ceiling: f64,
    pub unhealthy_terms: Vec<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            calories_per_100g: vocabulary::calories_per_100g(),
            serving_weights: vocabulary::serving_weights(),
            default_serving_weight: 300.0,
            calorie_ceiling: 600.0,
            unhealthy_terms: vocabulary::unhealthy_terms(),
        }
    }
}

/// Recovery configuration for inference calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Linear backoff step in milliseconds
    pub base_retry_delay_ms: u64,
    /// Upper bound on a single backoff delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Per-call timeout in seconds
    pub operation_timeout_secs: u64,
    /// Consecutive failures before the circuit opens
    pub circuit_breaker_threshold: u32,
    /// Seconds the circuit stays open
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_retry_delay_ms: 600,
            max_retry_delay_ms: 5000,
            operation_timeout_secs: 15,
            circuit_breaker_threshold: 10,
            circuit_breaker_reset_secs: 60,
        }
    }
}

/// External inference service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub model: String,
    pub max_workers: usize,
    /// Ingredients named in the prompt
    pub top_ingredients: usize,
    pub calorie_ranges: BTreeMap<String, String>,
    pub default_calorie_range: String,
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
    pub stop: Vec<String>,
    pub recovery: RecoveryConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            max_workers: 3,
            top_ingredients: 5,
            calorie_ranges: vocabulary::calorie_ranges(),
            default_calorie_range: "300-800".to_string(),
            temperature: 0.1,
            top_p: 0.9,
            num_predict: 80,
            stop: vec!["\n\n".to_string(), "Spiegazione:".to_string(), "Nota:".to_string()],
            recovery: RecoveryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    pub strategy: EstimationStrategy,
    pub table: TableConfig,
    pub inference: InferenceConfig,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub quality: QualityConfig,
    pub fuzzy: FuzzyThresholds,
    pub dedup: DedupConfig,
    pub milan: LocalityConfig,
    pub restaurant_aliases: Vec<NameAlias>,
    pub dish_types: Vec<DishTypeRule>,
    pub allergens: AllergenConfig,
    pub filter: FilterConfig,
    pub estimation: EstimationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            quality: QualityConfig::default(),
            fuzzy: FuzzyThresholds::default(),
            dedup: DedupConfig::default(),
            milan: LocalityConfig::default(),
            restaurant_aliases: default_aliases(),
            dish_types: vocabulary::dish_type_rules(),
            allergens: AllergenConfig::default(),
            filter: FilterConfig::default(),
            estimation: EstimationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an explicit path, `PIPELINE_CONFIG`, or defaults
    ///
    /// An explicitly named file that does not exist is an error; with no file
    /// named at all the built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        let config = match path {
            Some(path) => {
                info!("Loading pipeline configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                info!("No configuration file given, using built-in defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings no stage can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.quality;
        if q.min_price > q.max_price {
            return Err(ConfigError::Invalid(format!(
                "min_price {} exceeds max_price {}",
                q.min_price, q.max_price
            )));
        }
        if q.min_dish_name_length > q.max_dish_name_length {
            return Err(ConfigError::Invalid(format!(
                "min_dish_name_length {} exceeds max_dish_name_length {}",
                q.min_dish_name_length, q.max_dish_name_length
            )));
        }

        let scores = [
            ("fuzzy.strict", self.fuzzy.strict),
            ("fuzzy.loose", self.fuzzy.loose),
            ("dedup.name_threshold", self.dedup.name_threshold),
            ("dedup.weak_name_threshold", self.dedup.weak_name_threshold),
            ("dedup.type_aware_name_threshold", self.dedup.type_aware_name_threshold),
        ];
        if let Some((name, value)) = scores.iter().find(|(_, value)| *value > 100) {
            return Err(ConfigError::Invalid(format!("{name} = {value} is above 100")));
        }

        let overlaps = [
            ("dedup.min_overlap", self.dedup.min_overlap),
            ("dedup.type_aware_min_overlap", self.dedup.type_aware_min_overlap),
        ];
        if let Some((name, value)) = overlaps.iter().find(|(_, value)| !(0.0..=1.0).contains(value)) {
            return Err(ConfigError::Invalid(format!("{name} = {value} is outside 0..=1")));
        }

        if let Some(tag) = self
            .allergens
            .keywords
            .keys()
            .find(|tag| tag.parse::<Allergen>().is_err())
        {
            return Err(ConfigError::Invalid(format!("unknown allergen tag '{tag}'")));
        }

        if self.estimation.inference.max_workers == 0 {
            return Err(ConfigError::Invalid("inference.max_workers must be at least 1".to_string()));
        }

        debug!("Configuration validated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fuzzy.strict, 86);
        assert_eq!(config.fuzzy.loose, 92);
        assert_eq!(config.estimation.inference.recovery.max_retries, 2);
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let toml_text = r#"
            [quality]
            min_price = 1.0

            [fuzzy]
            strict = 80

            [estimation]
            strategy = "inference"
        "#;
        let config: PipelineConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.quality.min_price, 1.0);
        assert_eq!(config.quality.max_price, 150.0);
        assert_eq!(config.fuzzy.strict, 80);
        assert_eq!(config.fuzzy.loose, 92);
        assert_eq!(config.estimation.strategy, EstimationStrategy::Inference);
        assert!(!config.dish_types.is_empty());
    }

    #[test]
    fn test_allergen_keywords_from_toml() {
        let toml_text = r#"
            [allergens.keywords]
            "tree nuts" = ["noci"]
            gluten = ["farina"]
        "#;
        let config: PipelineConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.allergens.keywords.len(), 2);
        assert_eq!(config.allergens.keywords["tree nuts"], vec!["noci".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_allergen_tag() {
        let mut config = PipelineConfig::default();
        config.allergens.keywords.insert("nuts".to_string(), vec!["noci".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_price_bounds() {
        let mut config = PipelineConfig::default();
        config.quality.min_price = 200.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_threshold_above_100() {
        let mut config = PipelineConfig::default();
        config.dedup.name_threshold = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = PipelineConfig::load(Some(Path::new("/nonexistent/pipeline.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let paths = PathsConfig::default();
        assert_eq!(paths.resolve(Path::new("a.json")), PathBuf::from("data/a.json"));
        assert_eq!(paths.resolve(Path::new("/tmp/a.json")), PathBuf::from("/tmp/a.json"));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Inference".parse::<EstimationStrategy>(), Ok(EstimationStrategy::Inference));
        assert!("llm".parse::<EstimationStrategy>().is_err());
    }
}
