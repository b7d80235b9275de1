//! # Inference Estimation Module
//!
//! Calorie and health estimation through an external text-generation
//! service. The service is reached through the [`InferenceBackend`] trait so
//! tests can substitute a scripted backend for the HTTP client.
//!
//! Each request is bounded by a timeout, retried with linear backoff and
//! jitter, and skipped outright while the shared [`CircuitBreaker`] is open.
//! Every failure path ends in an absent estimate; nothing here aborts a run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{InferenceConfig, RecoveryConfig};
use crate::dish_model::{DishCluster, Estimate};
use crate::errors::InferenceError;

lazy_static! {
    static ref CODE_FENCE_REGEX: Regex = Regex::new(r"```json|```").expect("code fence pattern should be valid");
    static ref ESTIMATE_OBJECT_REGEX: Regex = Regex::new(r#"\{[^{}]*"calorie"[^{}]*"healthy"[^{}]*\}"#)
        .expect("estimate object pattern should be valid");
    static ref BARE_NUMBER_REGEX: Regex = Regex::new(r"\b\d{2,5}\b").expect("number pattern should be valid");
}

/// Text-generation service used for estimates
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Complete a prompt and return the raw generated text
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
    fn model_id(&self) -> &str;
}

/// Builds the estimation prompt for one unique dish
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    top_ingredients: usize,
    calorie_ranges: HashMap<String, String>,
    default_range: String,
}

impl PromptBuilder {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            top_ingredients: config.top_ingredients,
            calorie_ranges: config
                .calorie_ranges
                .iter()
                .map(|(key, range)| (key.to_lowercase(), range.clone()))
                .collect(),
            default_range: config.default_calorie_range.clone(),
        }
    }

    /// Plausible kcal range, looked up by dish type, then category
    pub fn calorie_range(&self, dish_type: Option<&str>, category: Option<&str>) -> &str {
        [dish_type, category]
            .into_iter()
            .flatten()
            .find_map(|key| self.calorie_ranges.get(&key.to_lowercase()))
            .map_or(self.default_range.as_str(), String::as_str)
    }

    pub fn build(&self, dish: &DishCluster) -> String {
        let dish_type = dish.dish_type.as_deref().unwrap_or("piatto");
        let ingredients = dish
            .ingredients
            .iter()
            .take(self.top_ingredients)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let range = self.calorie_range(dish.dish_type.as_deref(), dish.category.as_deref());

        format!(
            r#"Analizza questo piatto italiano: {dish_type} - {name} ({ingredients})

IMPORTANTE: Per {dish_type}, le calorie devono essere nel range {range}.

Rispondi SOLO con JSON valido, senza spiegazioni:
{{"calorie": [numero_intero], "healthy": [true/false]}}

Esempi realistici:
- Pizza margherita: {{"calorie": 750, "healthy": false}}
- Hamburger con patatine: {{"calorie": 750, "healthy": false}}
- Pasta al pomodoro: {{"calorie": 300, "healthy": true}}
- Insalata mista: {{"calorie": 100, "healthy": true}}

Risposta:"#,
            name = dish.name,
        )
    }
}

/// Interpret a loosely typed healthy flag
///
/// Booleans pass through; strings and numbers such as "sano", "yes", "1",
/// "no" or "0" are mapped; anything else is unknown.
pub fn normalize_healthy(value: &Value) -> Option<bool> {
    let text = match value {
        Value::Bool(flag) => return Some(*flag),
        Value::String(text) => text.trim().to_lowercase(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    match text.as_str() {
        "true" | "healthy" | "1" | "yes" | "y" | "si" | "sì" | "sano" => Some(true),
        "false" | "unhealthy" | "0" | "no" | "n" | "non sano" => Some(false),
        _ => None,
    }
}

fn parse_calories(value: &Value) -> Option<f64> {
    let calories = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (calories.is_finite() && calories >= 0.0).then(|| calories.trunc())
}

/// Extract an estimate from generated text
///
/// Looks for a JSON object with `calorie` and `healthy` keys, ignoring code
/// fences and surrounding prose. Without one, an isolated 2-5 digit number is
/// taken as the calorie value and the healthy flag stays unknown.
///
/// # Examples
///
/// ```rust
/// use menu_pipeline::inference::parse_response;
///
/// let estimate = parse_response("```json\n{\"calorie\": 750, \"healthy\": false}\n```").unwrap();
/// assert_eq!(estimate.calories, Some(750.0));
/// assert_eq!(estimate.healthy, Some(false));
///
/// assert!(parse_response("non saprei").is_err());
/// ```
pub fn parse_response(response: &str) -> Result<Estimate, InferenceError> {
    let cleaned = CODE_FENCE_REGEX.replace_all(response, "");
    let cleaned = cleaned.trim();

    if let Some(object) = ESTIMATE_OBJECT_REGEX.find(cleaned) {
        match serde_json::from_str::<Value>(object.as_str()) {
            Ok(parsed) => {
                let estimate = Estimate {
                    calories: parsed.get("calorie").and_then(parse_calories),
                    healthy: parsed.get("healthy").and_then(normalize_healthy),
                };
                if !estimate.is_absent() {
                    return Ok(estimate);
                }
            }
            Err(e) => debug!("Estimate object is not valid JSON: {}", e),
        }
    }

    if let Some(number) = BARE_NUMBER_REGEX.find(cleaned) {
        if let Ok(calories) = number.as_str().parse::<f64>() {
            return Ok(Estimate {
                calories: Some(calories),
                healthy: None,
            });
        }
    }

    let preview: String = cleaned.chars().take(100).collect();
    Err(InferenceError::MalformedResponse(preview))
}

/// Backoff before retry `attempt` (1-based), in milliseconds
///
/// Linear in the attempt number plus up to one base step of jitter, capped at
/// `max_retry_delay_ms`.
pub fn calculate_retry_delay(attempt: u32, recovery: &RecoveryConfig) -> u64 {
    let linear = recovery.base_retry_delay_ms.saturating_mul(u64::from(attempt));
    let jitter = if recovery.base_retry_delay_ms > 0 {
        rand::thread_rng().gen_range(0..recovery.base_retry_delay_ms)
    } else {
        0
    };
    linear.saturating_add(jitter).min(recovery.max_retry_delay_ms)
}

/// Result of estimating one unique dish
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InferenceOutcome {
    pub estimate: Estimate,
    /// Attempts that failed, including ones later recovered by a retry
    pub failed_attempts: usize,
    /// Skipped because the circuit breaker was open
    pub short_circuited: bool,
}

/// Inference strategy: prompt, call, parse, retry
pub struct InferenceEstimator {
    backend: Arc<dyn InferenceBackend>,
    prompts: PromptBuilder,
    recovery: RecoveryConfig,
    breaker: CircuitBreaker,
}

impl InferenceEstimator {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: &InferenceConfig) -> Self {
        Self {
            backend,
            prompts: PromptBuilder::from_config(config),
            recovery: config.recovery.clone(),
            breaker: CircuitBreaker::new(&config.recovery),
        }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    async fn attempt(&self, prompt: &str) -> Result<Estimate, InferenceError> {
        let limit = Duration::from_secs(self.recovery.operation_timeout_secs);
        let response = match tokio::time::timeout(limit, self.backend.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout(limit)),
        };
        match response {
            Ok(text) => {
                self.breaker.record_success();
                parse_response(&text)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }

    /// Estimate one unique dish; never fails, at worst the estimate is absent
    pub async fn estimate(&self, dish: &DishCluster) -> InferenceOutcome {
        let mut outcome = InferenceOutcome::default();
        let prompt = self.prompts.build(dish);

        for attempt in 0..=self.recovery.max_retries {
            if self.breaker.is_open() {
                debug!("Circuit open, skipping '{}'", dish.name);
                outcome.short_circuited = outcome.failed_attempts == 0;
                return outcome;
            }
            if attempt > 0 {
                let delay = calculate_retry_delay(attempt, &self.recovery);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.attempt(&prompt).await {
                Ok(estimate) => {
                    outcome.estimate = estimate;
                    return outcome;
                }
                Err(e) => {
                    outcome.failed_attempts += 1;
                    warn!(
                        "Estimate for '{}' failed (attempt {}/{}): {}",
                        dish.name,
                        attempt + 1,
                        self.recovery.max_retries + 1,
                        e
                    );
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_json() {
        let estimate = parse_response(r#"{"calorie": 420, "healthy": true}"#).unwrap();
        assert_eq!(estimate.calories, Some(420.0));
        assert_eq!(estimate.healthy, Some(true));
    }

    #[test]
    fn test_parse_string_fields_with_prose() {
        let estimate = parse_response(r#"Ecco: {"calorie": "650", "healthy": "sano"} spero aiuti"#).unwrap();
        assert_eq!(estimate.calories, Some(650.0));
        assert_eq!(estimate.healthy, Some(true));
    }

    #[test]
    fn test_parse_number_fallback() {
        let estimate = parse_response("Circa 780 kcal").unwrap();
        assert_eq!(estimate.calories, Some(780.0));
        assert_eq!(estimate.healthy, None);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(matches!(
            parse_response("non lo so"),
            Err(InferenceError::MalformedResponse(_))
        ));
        assert!(parse_response("").is_err());
    }

    #[test]
    fn test_normalize_healthy() {
        assert_eq!(normalize_healthy(&json!(false)), Some(false));
        assert_eq!(normalize_healthy(&json!("Yes")), Some(true));
        assert_eq!(normalize_healthy(&json!("non sano")), Some(false));
        assert_eq!(normalize_healthy(&json!(1)), Some(true));
        assert_eq!(normalize_healthy(&json!("forse")), None);
        assert_eq!(normalize_healthy(&Value::Null), None);
    }

    #[test]
    fn test_calculate_retry_delay() {
        let recovery = RecoveryConfig::default();
        let first = calculate_retry_delay(1, &recovery);
        assert!(first >= recovery.base_retry_delay_ms);
        assert!(calculate_retry_delay(50, &recovery) <= recovery.max_retry_delay_ms);
    }

    #[test]
    fn test_calorie_range_lookup_order() {
        let prompts = PromptBuilder::from_config(&InferenceConfig::default());
        assert_eq!(prompts.calorie_range(Some("pizza"), Some("dessert")), "700-1200");
        assert_eq!(prompts.calorie_range(Some("poke"), Some("dessert")), "250-600");
        assert_eq!(prompts.calorie_range(None, None), "300-800");
    }

    #[test]
    fn test_prompt_limits_ingredients() {
        let prompts = PromptBuilder::from_config(&InferenceConfig::default());
        let dish = DishCluster {
            name: "Poke salmone".to_string(),
            ingredients: ["riso", "salmone", "avocado", "edamame", "sesamo", "zenzero"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dish_type: Some("poke".to_string()),
            ..Default::default()
        };
        let prompt = prompts.build(&dish);
        assert!(prompt.contains("riso, salmone, avocado, edamame, sesamo"));
        assert!(!prompt.contains("zenzero"));
        assert!(prompt.contains("300-800"));
    }
}
