//! # Calorie/Health Estimator
//!
//! Runs the configured estimation strategy over the unique dishes and merges
//! the results back into every allergen-enriched dish record.
//!
//! Unique dishes are first grouped with the type-aware merge rule, so one
//! estimate request serves clusters that differ only by small naming
//! variations. With the inference strategy the requests run concurrently on
//! a `JoinSet` bounded by a semaphore of `max_workers` permits; results are
//! collected by the single `join_next` consumer into a map keyed by content
//! key, so arrival order does not matter.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::calorie_table::TableEstimator;
use crate::config::{EstimationStrategy, PipelineConfig};
use crate::dedup::Deduplicator;
use crate::dish_model::{Dish, DishCluster, DishKey, Estimate, EstimatedDish};
use crate::inference::{InferenceBackend, InferenceEstimator};
use crate::report::EstimationSummary;

/// Completed requests between progress lines
const PROGRESS_INTERVAL: usize = 50;

enum Strategy {
    Table(TableEstimator),
    Inference(Arc<InferenceEstimator>),
}

/// Strategy-agnostic estimator for unique dishes
pub struct CalorieEstimator {
    strategy: Strategy,
    grouper: Deduplicator,
    max_workers: usize,
}

impl CalorieEstimator {
    /// Lookup-table strategy; synchronous and deterministic
    pub fn table(config: &PipelineConfig) -> Self {
        Self {
            strategy: Strategy::Table(TableEstimator::new(&config.estimation.table)),
            grouper: Deduplicator::new(config.dedup.type_aware_rule()),
            max_workers: 1,
        }
    }

    /// External-inference strategy through `backend`
    pub fn inference(config: &PipelineConfig, backend: Arc<dyn InferenceBackend>) -> Self {
        let inference = &config.estimation.inference;
        Self {
            strategy: Strategy::Inference(Arc::new(InferenceEstimator::new(backend, inference))),
            grouper: Deduplicator::new(config.dedup.type_aware_rule()),
            max_workers: inference.max_workers.max(1),
        }
    }

    pub fn strategy(&self) -> EstimationStrategy {
        match self.strategy {
            Strategy::Table(_) => EstimationStrategy::Table,
            Strategy::Inference(_) => EstimationStrategy::Inference,
        }
    }

    /// Estimate unique dishes
    ///
    /// With `limit`, only the first `limit` unique dishes are estimated; the
    /// rest are returned with absent estimates. The output keeps input order.
    pub async fn estimate_all(
        &self,
        unique: &[DishCluster],
        limit: Option<usize>,
    ) -> (Vec<EstimatedDish>, EstimationSummary) {
        let considered = limit.map_or(unique.len(), |n| n.min(unique.len()));
        let groups = self.grouper.cluster(&unique[..considered]);

        let mut group_of_member: HashMap<&str, usize> = HashMap::new();
        for (index, group) in groups.iter().enumerate() {
            for id in &group.member_ids {
                group_of_member.insert(id.as_str(), index);
            }
        }

        // one request per distinct content key; dishes without member ids
        // are requested on their own
        let mut jobs: HashMap<DishKey, DishCluster> = HashMap::new();
        let mut request_keys: Vec<DishKey> = Vec::with_capacity(considered);
        for dish in &unique[..considered] {
            let request = dish
                .member_ids
                .first()
                .and_then(|id| group_of_member.get(id.as_str()))
                .map_or(dish, |&index| &groups[index]);
            let key = request.key();
            jobs.entry(key.clone()).or_insert_with(|| request.clone());
            request_keys.push(key);
        }

        let mut summary = EstimationSummary {
            strategy: self.strategy().to_string(),
            unique_dishes: unique.len(),
            requests: jobs.len(),
            ..Default::default()
        };
        info!(
            "Estimating {} unique dishes with {} requests ({} strategy)",
            considered, summary.requests, summary.strategy
        );

        let results = match &self.strategy {
            Strategy::Table(table) => jobs
                .into_iter()
                .map(|(key, cluster)| {
                    let estimate = table.estimate(&cluster.ingredients, cluster.dish_type.as_deref());
                    (key, estimate)
                })
                .collect(),
            Strategy::Inference(inference) => self.run_inference(inference, jobs, &mut summary).await,
        };

        let estimated: Vec<EstimatedDish> = unique
            .iter()
            .enumerate()
            .map(|(index, dish)| {
                let estimate = request_keys
                    .get(index)
                    .and_then(|key| results.get(key))
                    .copied()
                    .unwrap_or_default();
                EstimatedDish::new(dish.clone(), estimate)
            })
            .collect();

        summary.estimated = estimated.iter().filter(|d| d.estimated_calories.is_some()).count();
        summary.absent = estimated.len() - summary.estimated;
        info!(
            "Estimation finished: {} with calories, {} absent",
            summary.estimated, summary.absent
        );
        (estimated, summary)
    }

    async fn run_inference(
        &self,
        inference: &Arc<InferenceEstimator>,
        jobs: HashMap<DishKey, DishCluster>,
        summary: &mut EstimationSummary,
    ) -> HashMap<DishKey, Estimate> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();
        let total = jobs.len();
        info!(
            "Dispatching {} requests to model {} with {} workers",
            total,
            inference.model_id(),
            self.max_workers
        );

        for (key, cluster) in jobs {
            let inference = Arc::clone(inference);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = inference.estimate(&cluster).await;
                (key, outcome)
            });
        }

        let mut results = HashMap::with_capacity(total);
        let mut completed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok((key, outcome)) => {
                    summary.failed_attempts += outcome.failed_attempts;
                    if outcome.short_circuited {
                        summary.short_circuited += 1;
                    }
                    debug!("Estimate for {}: {:?}", key, outcome.estimate);
                    results.insert(key, outcome.estimate);
                }
                Err(e) => warn!("Estimation task failed: {}", e),
            }
            if completed % PROGRESS_INTERVAL == 0 {
                info!("Completed {}/{} estimate requests", completed, total);
            }
        }
        results
    }
}

/// Copy unique-dish estimates onto every source dish
///
/// Dishes are matched through cluster member ids, then by content key.
/// Returns the number of dishes left without a match; those keep absent
/// estimates.
pub fn apply_estimates(dishes: &mut [Dish], estimated: &[EstimatedDish]) -> usize {
    let mut by_member: HashMap<&str, Estimate> = HashMap::new();
    let mut by_key: HashMap<DishKey, Estimate> = HashMap::new();
    for dish in estimated {
        let estimate = dish.estimate();
        for id in &dish.cluster.member_ids {
            by_member.insert(id.as_str(), estimate);
        }
        by_key.entry(dish.cluster.key()).or_insert(estimate);
    }

    let mut misses = 0;
    for dish in dishes.iter_mut() {
        let estimate = by_member
            .get(dish.id.as_str())
            .copied()
            .or_else(|| by_key.get(&dish.key()).copied());
        match estimate {
            Some(estimate) => {
                dish.estimated_calories = estimate.calories;
                dish.healthy = estimate.healthy;
            }
            None => {
                misses += 1;
                dish.estimated_calories = None;
                dish.healthy = None;
            }
        }
    }
    if misses > 0 {
        warn!("{} dishes had no matching unique-dish estimate", misses);
    }
    misses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(name: &str, ingredients: &[&str], dish_type: &str, ids: &[&str]) -> DishCluster {
        DishCluster {
            name: name.to_string(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            dish_type: Some(dish_type.to_string()),
            member_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_table_strategy_groups_requests() {
        let estimator = CalorieEstimator::table(&PipelineConfig::default());
        let unique = vec![
            cluster("Pizza Margherita", &["mozzarella", "pomodoro"], "pizza", &["a"]),
            cluster("Pizza Margherita!", &["mozzarella", "pomodoro"], "pizza", &["b"]),
            cluster("Insalata", &["ingrediente ignoto"], "salad", &["c"]),
        ];
        let (estimated, summary) = estimator.estimate_all(&unique, None).await;
        assert_eq!(summary.requests, 2);
        assert_eq!(estimated[0].estimated_calories, Some(447.0));
        assert_eq!(estimated[1].estimated_calories, Some(447.0));
        assert_eq!(estimated[2].estimated_calories, None);
        assert_eq!(summary.estimated, 2);
        assert_eq!(summary.absent, 1);
    }

    #[tokio::test]
    async fn test_limit_leaves_rest_absent() {
        let estimator = CalorieEstimator::table(&PipelineConfig::default());
        let unique = vec![
            cluster("Margherita", &["mozzarella", "pomodoro"], "pizza", &["a"]),
            cluster("Marinara", &["pomodoro", "aglio"], "pizza", &["b"]),
        ];
        let (estimated, summary) = estimator.estimate_all(&unique, Some(1)).await;
        assert_eq!(estimated.len(), 2);
        assert!(estimated[0].estimated_calories.is_some());
        assert!(estimated[1].estimated_calories.is_none());
        assert_eq!(summary.requests, 1);
    }

    #[test]
    fn test_apply_estimates_counts_misses() {
        let mut dishes = vec![
            Dish::new("Margherita", "A").with_ingredients(["mozzarella"]),
            Dish::new("Sconosciuto", "A").with_ingredients(["x"]),
        ];
        let estimated = vec![EstimatedDish::new(
            cluster("Margherita", &["mozzarella"], "pizza", &[dishes[0].id.as_str()]),
            Estimate {
                calories: Some(800.0),
                healthy: Some(false),
            },
        )];
        let misses = apply_estimates(&mut dishes, &estimated);
        assert_eq!(misses, 1);
        assert_eq!(dishes[0].estimated_calories, Some(800.0));
        assert_eq!(dishes[0].healthy, Some(false));
        assert_eq!(dishes[1].estimated_calories, None);
    }
}
