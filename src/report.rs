//! # Quality Report Module
//!
//! Counters collected by each stage, the structured end-of-run report written
//! next to the snapshots, and the human-readable log summary.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dish_model::Dish;
use crate::errors::RejectReason;
use crate::quality_filter::FilterStats;

/// Number of entries kept in "top N" lists
const TOP_N: usize = 10;

/// Cleaning-stage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityStats {
    pub restaurants_processed: usize,
    pub restaurants_kept: usize,
    pub restaurants_rejected: usize,
    pub duplicate_restaurants: usize,
    pub non_milan_addresses: usize,
    pub dishes_processed: usize,
    pub dishes_kept: usize,
    pub dishes_rejected: usize,
    /// Prices outside the configured bounds; the dish is kept
    pub anomalous_prices: usize,
    pub duplicate_dishes_removed: usize,
    pub reject_reasons: BTreeMap<String, usize>,
    pub dish_types: BTreeMap<String, usize>,
}

impl QualityStats {
    /// Tally a dropped record under its reason
    pub fn record_rejection(&mut self, reason: RejectReason) {
        *self.reject_reasons.entry(reason.as_str().to_string()).or_insert(0) += 1;
        if reason.is_dish_level() {
            self.dishes_rejected += 1;
        } else {
            self.restaurants_rejected += 1;
            match reason {
                RejectReason::DuplicateRestaurant => self.duplicate_restaurants += 1,
                RejectReason::AddressNotMilan => self.non_milan_addresses += 1,
                _ => {}
            }
        }
    }

    pub fn restaurant_success_rate(&self) -> f64 {
        percentage(self.restaurants_kept, self.restaurants_processed)
    }

    pub fn dish_success_rate(&self) -> f64 {
        percentage(self.dishes_kept, self.dishes_processed)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Deduplication-stage summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupSummary {
    pub input_dishes: usize,
    pub unique_dishes: usize,
}

/// Estimation-stage summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimationSummary {
    pub strategy: String,
    /// Unique dishes considered
    pub unique_dishes: usize,
    /// Distinct estimate requests after type-aware grouping
    pub requests: usize,
    pub estimated: usize,
    pub absent: usize,
    /// Failed inference attempts, including retried ones
    pub failed_attempts: usize,
    /// Requests skipped while the circuit breaker was open
    pub short_circuited: usize,
    /// Dishes with no matching unique-dish estimate
    pub merge_misses: usize,
}

/// Completeness analysis of the final dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetAnalysis {
    pub total_dishes: usize,
    pub missing_calories: usize,
    pub missing_healthy: usize,
    pub without_allergens: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub average_calories: Option<f64>,
    pub missing_calories_by_type: BTreeMap<String, usize>,
    pub without_allergens_by_type: BTreeMap<String, usize>,
    pub top_allergens: Vec<(String, usize)>,
    /// Most common ingredients among dishes with no allergen tag
    pub top_ingredients_without_allergens: Vec<(String, usize)>,
}

fn top_counts(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_N);
    entries
}

impl DatasetAnalysis {
    pub fn from_dishes(dishes: &[Dish]) -> Self {
        let mut analysis = DatasetAnalysis {
            total_dishes: dishes.len(),
            ..Default::default()
        };
        let mut allergen_counts: HashMap<String, usize> = HashMap::new();
        let mut ingredient_counts: HashMap<String, usize> = HashMap::new();
        let mut calorie_sum = 0.0;
        let mut calorie_count = 0usize;

        for dish in dishes {
            match dish.estimated_calories {
                Some(calories) => {
                    calorie_sum += calories;
                    calorie_count += 1;
                }
                None => {
                    analysis.missing_calories += 1;
                    *analysis.missing_calories_by_type.entry(dish.dish_type.clone()).or_insert(0) += 1;
                }
            }
            match dish.healthy {
                Some(true) => analysis.healthy += 1,
                Some(false) => analysis.unhealthy += 1,
                None => analysis.missing_healthy += 1,
            }
            if dish.allergens.is_empty() {
                analysis.without_allergens += 1;
                *analysis.without_allergens_by_type.entry(dish.dish_type.clone()).or_insert(0) += 1;
                for ingredient in &dish.ingredients {
                    *ingredient_counts.entry(ingredient.trim().to_lowercase()).or_insert(0) += 1;
                }
            }
            for allergen in &dish.allergens {
                *allergen_counts.entry(allergen.to_string()).or_insert(0) += 1;
            }
        }

        if calorie_count > 0 {
            analysis.average_calories = Some((calorie_sum / calorie_count as f64 * 10.0).round() / 10.0);
        }
        analysis.top_allergens = top_counts(allergen_counts);
        analysis.top_ingredients_without_allergens = top_counts(ingredient_counts);
        analysis
    }
}

/// Structured end-of-run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub pipeline_version: String,
    pub stages: Vec<String>,
    pub cleaning: Option<QualityStats>,
    pub filtering: Option<FilterStats>,
    pub dedup: Option<DedupSummary>,
    pub estimation: Option<EstimationSummary>,
    pub analysis: Option<DatasetAnalysis>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            pipeline_version: env!("CARGO_PKG_VERSION").to_string(),
            stages: Vec::new(),
            cleaning: None,
            filtering: None,
            dedup: None,
            estimation: None,
            analysis: None,
        }
    }

    /// Log a human-readable summary of every stage that ran
    pub fn log_summary(&self) {
        info!("=== Run {} summary ({}) ===", self.run_id, self.stages.join(", "));

        if let Some(stats) = &self.cleaning {
            info!(
                "Restaurants: {} processed, {} kept ({:.1}%), {} duplicates, {} outside Milan",
                stats.restaurants_processed,
                stats.restaurants_kept,
                stats.restaurant_success_rate(),
                stats.duplicate_restaurants,
                stats.non_milan_addresses
            );
            info!(
                "Dishes: {} processed, {} kept ({:.1}%), {} anomalous prices, {} exact duplicates removed",
                stats.dishes_processed,
                stats.dishes_kept,
                stats.dish_success_rate(),
                stats.anomalous_prices,
                stats.duplicate_dishes_removed
            );
            for (reason, count) in &stats.reject_reasons {
                info!("  rejected ({}): {}", reason, count);
            }
        }

        if let Some(filter) = &self.filtering {
            info!(
                "Filter: {} kept, {} excluded by type, {} excluded by keyword",
                filter.kept, filter.excluded_by_type, filter.excluded_by_keyword
            );
        }

        if let Some(dedup) = &self.dedup {
            info!("Dedup: {} dishes -> {} unique", dedup.input_dishes, dedup.unique_dishes);
        }

        if let Some(est) = &self.estimation {
            info!(
                "Estimation ({}): {} requests, {} estimated, {} absent, {} failed attempts, {} short-circuited, {} merge misses",
                est.strategy,
                est.requests,
                est.estimated,
                est.absent,
                est.failed_attempts,
                est.short_circuited,
                est.merge_misses
            );
        }

        if let Some(analysis) = &self.analysis {
            let total = analysis.total_dishes;
            info!("Final dataset: {} dishes", total);
            info!(
                "  missing calories: {} ({:.1}%)",
                analysis.missing_calories,
                percentage(analysis.missing_calories, total)
            );
            info!(
                "  missing healthy flag: {} ({:.1}%)",
                analysis.missing_healthy,
                percentage(analysis.missing_healthy, total)
            );
            info!(
                "  without allergens: {} ({:.1}%)",
                analysis.without_allergens,
                percentage(analysis.without_allergens, total)
            );
            info!("  healthy / unhealthy: {} / {}", analysis.healthy, analysis.unhealthy);
            for (allergen, count) in &analysis.top_allergens {
                info!("  allergen {}: {}", allergen, count);
            }
        }
    }
}
