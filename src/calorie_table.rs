//! # Calorie Table Estimator
//!
//! Deterministic estimation strategy: average kcal/100 g of the ingredient
//! keywords found in the lookup table, scaled by a per-dish-type serving
//! weight.

use std::collections::HashMap;

use log::trace;

use crate::config::TableConfig;
use crate::dish_model::Estimate;
use crate::text_processing::extract_keywords;

/// Lookup-table calorie and health estimator
#[derive(Debug, Clone)]
pub struct TableEstimator {
    calories_per_100g: HashMap<String, f64>,
    serving_weights: HashMap<String, f64>,
    default_serving_weight: f64,
    calorie_ceiling: f64,
    unhealthy_terms: Vec<String>,
}

impl TableEstimator {
    pub fn new(config: &TableConfig) -> Self {
        let lower = |(key, value): (&String, &f64)| (key.trim().to_lowercase(), *value);
        Self {
            calories_per_100g: config.calories_per_100g.iter().map(lower).collect(),
            serving_weights: config.serving_weights.iter().map(lower).collect(),
            default_serving_weight: config.default_serving_weight,
            calorie_ceiling: config.calorie_ceiling,
            unhealthy_terms: config.unhealthy_terms.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Estimated kcal for a keyword list, `None` when no keyword is in the table
    pub fn calories<S: AsRef<str>>(&self, keywords: &[S], dish_type: Option<&str>) -> Option<f64> {
        let known: Vec<f64> = keywords
            .iter()
            .filter_map(|k| self.calories_per_100g.get(k.as_ref().trim()).copied())
            .collect();
        if known.is_empty() {
            return None;
        }
        let per_100g = known.iter().sum::<f64>() / known.len() as f64;
        let weight = dish_type
            .and_then(|t| self.serving_weights.get(&t.to_lowercase()).copied())
            .unwrap_or(self.default_serving_weight);
        Some((per_100g * weight / 100.0 * 10.0).round() / 10.0)
    }

    /// Unhealthy above the calorie ceiling or when any keyword contains an
    /// unhealthy term
    pub fn is_healthy<S: AsRef<str>>(&self, calories: f64, keywords: &[S]) -> bool {
        if calories > self.calorie_ceiling {
            return false;
        }
        !keywords
            .iter()
            .any(|k| self.unhealthy_terms.iter().any(|term| k.as_ref().contains(term.as_str())))
    }

    /// Estimate one dish from its ingredient strings
    ///
    /// # Examples
    ///
    /// ```rust
    /// use menu_pipeline::calorie_table::TableEstimator;
    /// use menu_pipeline::config::TableConfig;
    ///
    /// let estimator = TableEstimator::new(&TableConfig::default());
    /// let estimate = estimator.estimate(&["mozzarella", "pomodoro"], Some("pizza"));
    /// assert_eq!(estimate.calories, Some(447.0));
    /// ```
    pub fn estimate<S: AsRef<str>>(&self, ingredients: &[S], dish_type: Option<&str>) -> Estimate {
        let keywords: Vec<String> = ingredients.iter().flat_map(|i| extract_keywords(i.as_ref())).collect();
        match self.calories(&keywords, dish_type) {
            Some(calories) => {
                let healthy = self.is_healthy(calories, &keywords);
                trace!("Table estimate {:?}: {} kcal, healthy {}", keywords, calories, healthy);
                Estimate {
                    calories: Some(calories),
                    healthy: Some(healthy),
                }
            }
            None => Estimate::absent(),
        }
    }
}
