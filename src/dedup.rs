//! # Dish Deduplication Module
//!
//! Greedy single-pass clustering of near-duplicate dishes.
//!
//! Each incoming dish is compared, in cluster-creation order, against every
//! existing cluster's representative name and ingredient set. It merges into
//! the first cluster its [`MergeRule`] accepts, otherwise it starts a new
//! cluster. Cost is O(n·k) for n dishes and k clusters, and the result
//! depends on input order, so callers must feed dishes in a stable order.
//!
//! A single pass is not a fixed point: a cluster whose ingredient set grows
//! after an earlier dish was rejected by it can absorb that dish's cluster
//! when the output is clustered again.

use std::collections::{BTreeSet, HashSet};

use log::{debug, info};

use crate::dish_model::{Allergen, Dish, DishCluster};
use crate::similarity::full_ratio;
use crate::text_processing::{normalize_text, normalize_token, tokenize_list};

/// Decides whether a dish joins a cluster
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeRule {
    /// `name >= name_threshold`, or `name >= weak_name_threshold` with
    /// `overlap >= min_overlap`
    NameOrOverlap {
        name_threshold: u8,
        weak_name_threshold: u8,
        min_overlap: f64,
    },
    /// `name > name_threshold`, `overlap >= min_overlap` and equal dish types
    TypeAware { name_threshold: u8, min_overlap: f64 },
}

impl MergeRule {
    pub fn accepts(&self, name_similarity: u8, overlap: f64, same_type: bool) -> bool {
        match *self {
            MergeRule::NameOrOverlap {
                name_threshold,
                weak_name_threshold,
                min_overlap,
            } => {
                name_similarity >= name_threshold
                    || (name_similarity >= weak_name_threshold && overlap >= min_overlap)
            }
            MergeRule::TypeAware {
                name_threshold,
                min_overlap,
            } => name_similarity > name_threshold && overlap >= min_overlap && same_type,
        }
    }
}

/// Anything that can be clustered: source dishes or earlier clusters
pub trait ClusterSource {
    fn name(&self) -> &str;
    fn ingredients(&self) -> &[String];
    fn allergens(&self) -> &BTreeSet<Allergen>;
    fn dish_type(&self) -> Option<&str>;
    fn category(&self) -> Option<&str>;
    fn subcategory(&self) -> Option<&str>;
    fn member_ids(&self) -> Vec<String>;
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ClusterSource for Dish {
    fn name(&self) -> &str {
        &self.name
    }

    fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    fn allergens(&self) -> &BTreeSet<Allergen> {
        &self.allergens
    }

    fn dish_type(&self) -> Option<&str> {
        Some(self.dish_type.as_str()).filter(|t| !t.trim().is_empty())
    }

    fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }

    fn subcategory(&self) -> Option<&str> {
        non_empty(&self.subcategory)
    }

    fn member_ids(&self) -> Vec<String> {
        vec![self.id.clone()]
    }
}

impl ClusterSource for DishCluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    fn allergens(&self) -> &BTreeSet<Allergen> {
        &self.allergens
    }

    fn dish_type(&self) -> Option<&str> {
        non_empty(&self.dish_type)
    }

    fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }

    fn subcategory(&self) -> Option<&str> {
        non_empty(&self.subcategory)
    }

    fn member_ids(&self) -> Vec<String> {
        self.member_ids.clone()
    }
}

/// `|A ∩ B| / max(|A|, |B|, 1)`; zero when either set is empty
pub fn ingredient_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / a.len().max(b.len()).max(1) as f64
}

/// Cluster plus the comparison keys cached for it
struct WorkingCluster {
    cluster: DishCluster,
    normalized_name: String,
    tokens: HashSet<String>,
}

impl WorkingCluster {
    fn start<T: ClusterSource>(item: &T, normalized_name: String, tokens: HashSet<String>) -> Self {
        let ingredients: BTreeSet<String> = tokens.iter().cloned().collect();
        Self {
            cluster: DishCluster {
                name: item.name().to_string(),
                ingredients: ingredients.into_iter().collect(),
                allergens: item.allergens().clone(),
                dish_type: item.dish_type().map(str::to_string),
                category: item.category().map(str::to_string),
                subcategory: item.subcategory().map(str::to_string),
                member_ids: item.member_ids(),
            },
            normalized_name,
            tokens,
        }
    }

    fn absorb<T: ClusterSource>(&mut self, item: &T, tokens: HashSet<String>) {
        self.tokens.extend(tokens);
        let mut ingredients: Vec<String> = self.tokens.iter().cloned().collect();
        ingredients.sort();
        self.cluster.ingredients = ingredients;

        self.cluster.allergens.extend(item.allergens().iter().copied());

        let cluster = &mut self.cluster;
        fill_gap(&mut cluster.dish_type, item.dish_type());
        fill_gap(&mut cluster.category, item.category());
        fill_gap(&mut cluster.subcategory, item.subcategory());

        cluster.member_ids.extend(item.member_ids());
    }
}

fn fill_gap(slot: &mut Option<String>, incoming: Option<&str>) {
    let empty = slot.as_deref().map_or(true, |v| v.trim().is_empty());
    if empty {
        if let Some(value) = incoming {
            *slot = Some(value.to_string());
        }
    }
}

fn normalized_type(value: Option<&str>) -> Option<String> {
    value.map(normalize_token)
}

/// Greedy dish clusterer
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    rule: MergeRule,
}

impl Deduplicator {
    pub fn new(rule: MergeRule) -> Self {
        Self { rule }
    }

    /// Cluster items in input order; first matching cluster wins
    ///
    /// # Examples
    ///
    /// ```rust
    /// use menu_pipeline::config::DedupConfig;
    /// use menu_pipeline::dedup::Deduplicator;
    /// use menu_pipeline::dish_model::Dish;
    ///
    /// let dedup = Deduplicator::new(DedupConfig::default().lenient_rule());
    /// let dishes = vec![
    ///     Dish::new("Spaghetti alla Carbonara", "A").with_ingredients(["spaghetti", "guanciale", "uova", "pecorino"]),
    ///     Dish::new("Spaghetti Carbonara", "B").with_ingredients(["spaghetti", "guanciale", "uova", "pecorino", "pepe"]),
    /// ];
    /// assert_eq!(dedup.cluster(&dishes).len(), 1);
    /// ```
    pub fn cluster<T: ClusterSource>(&self, items: &[T]) -> Vec<DishCluster> {
        let mut clusters: Vec<WorkingCluster> = Vec::new();

        for item in items {
            let normalized_name = normalize_text(item.name());
            let tokens: HashSet<String> = tokenize_list(item.ingredients()).into_iter().collect();
            let item_type = normalized_type(item.dish_type());

            let target = clusters.iter().position(|candidate| {
                let name_similarity = full_ratio(&normalized_name, &candidate.normalized_name);
                let overlap = ingredient_overlap(&tokens, &candidate.tokens);
                let same_type = normalized_type(candidate.cluster.dish_type.as_deref()) == item_type;
                self.rule.accepts(name_similarity, overlap, same_type)
            });

            match target {
                Some(index) => {
                    debug!("Merging '{}' into cluster '{}'", item.name(), clusters[index].cluster.name);
                    clusters[index].absorb(item, tokens);
                }
                None => clusters.push(WorkingCluster::start(item, normalized_name, tokens)),
            }
        }

        info!("Clustered {} records into {} unique dishes", items.len(), clusters.len());
        clusters.into_iter().map(|working| working.cluster).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupConfig;

    fn lenient() -> Deduplicator {
        Deduplicator::new(DedupConfig::default().lenient_rule())
    }

    fn type_aware() -> Deduplicator {
        Deduplicator::new(DedupConfig::default().type_aware_rule())
    }

    #[test]
    fn test_rule_boundaries() {
        let rule = DedupConfig::default().lenient_rule();
        assert!(rule.accepts(90, 0.0, false));
        assert!(rule.accepts(80, 0.5, false));
        assert!(!rule.accepts(79, 1.0, true));
        assert!(!rule.accepts(89, 0.49, true));

        let strict = DedupConfig::default().type_aware_rule();
        assert!(!strict.accepts(90, 1.0, true));
        assert!(strict.accepts(91, 0.8, true));
        assert!(!strict.accepts(100, 1.0, false));
    }

    #[test]
    fn test_overlap_uses_larger_set() {
        let a: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let b: HashSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ingredient_overlap(&a, &b), 0.5);
        assert_eq!(ingredient_overlap(&a, &HashSet::new()), 0.0);
    }

    #[test]
    fn test_merge_unions_and_fills_gaps() {
        let first = Dish::new("Pizza Margherita", "A")
            .with_ingredients(["Mozzarella", "Pomodoro"])
            .with_allergens([Allergen::Milk]);
        let mut second = Dish::new("Pizza margherita", "B")
            .with_dish_type("pizza")
            .with_category("pizze classiche")
            .with_ingredients(["mozzarella", "basilico"])
            .with_allergens([Allergen::Gluten]);
        second.subcategory = Some("rosse".to_string());

        let clusters = lenient().cluster(&[first.clone(), second.clone()]);
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.name, "Pizza Margherita");
        assert_eq!(cluster.ingredients, vec!["basilico", "mozzarella", "pomodoro"]);
        assert_eq!(cluster.allergens.len(), 2);
        assert_eq!(cluster.dish_type.as_deref(), Some("pizza"));
        assert_eq!(cluster.category.as_deref(), Some("pizze classiche"));
        assert_eq!(cluster.subcategory.as_deref(), Some("rosse"));
        assert_eq!(cluster.member_ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_first_matching_cluster_wins() {
        let dishes = vec![
            Dish::new("Pizza Diavola", "A").with_ingredients(["salame"]),
            Dish::new("Pizza Diavolo", "B").with_ingredients(["salame"]),
            Dish::new("Pizza Diavola", "C").with_ingredients(["salame"]),
        ];
        let clusters = lenient().cluster(&dishes);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_ids.len(), 3);
    }

    #[test]
    fn test_distinct_dishes_stay_apart() {
        let dishes = vec![
            Dish::new("Pizza Margherita", "A").with_ingredients(["mozzarella", "pomodoro"]),
            Dish::new("Insalata Greca", "A").with_ingredients(["feta", "olive", "pomodoro"]),
        ];
        assert_eq!(lenient().cluster(&dishes).len(), 2);
    }

    #[test]
    fn test_type_aware_requires_same_type() {
        let dishes = vec![
            Dish::new("Poke Salmone", "A").with_dish_type("poke").with_ingredients(["riso", "salmone"]),
            Dish::new("Poke Salmone", "B").with_dish_type("salad").with_ingredients(["riso", "salmone"]),
        ];
        assert_eq!(type_aware().cluster(&dishes).len(), 2);
        assert_eq!(lenient().cluster(&dishes).len(), 1);
    }

    #[test]
    fn test_recluster_keeps_count() {
        let dishes = vec![
            Dish::new("Spaghetti alla Carbonara", "A").with_ingredients(["spaghetti", "guanciale", "uova"]),
            Dish::new("Spaghetti Carbonara", "B").with_ingredients(["spaghetti", "guanciale", "uova"]),
            Dish::new("Tiramisù", "A").with_ingredients(["mascarpone", "savoiardi"]),
        ];
        let first_pass = lenient().cluster(&dishes);
        let second_pass = lenient().cluster(&first_pass);
        assert_eq!(first_pass.len(), 2);
        assert_eq!(second_pass.len(), first_pass.len());
    }
}
