//! # Record Quality Filter
//!
//! Drops records that are not real dishes before allergen classification and
//! deduplication: beverages, the catch-all "other" type, and bundles whose
//! name or ingredients mention menu, box or combo words.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::dish_model::Dish;
use crate::similarity::{FuzzyMatcher, FuzzyThresholds};
use crate::text_processing::{normalize_text, normalize_token, tokenize_list};

/// Why a dish was excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Declared type is a non-dish category
    NonDishType(String),
    /// Name or an ingredient matched the exclusion vocabulary
    ExclusionKeyword { keyword: String, field: MatchedField },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedField {
    Name,
    Ingredient,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NonDishType(dish_type) => write!(f, "non-dish type '{dish_type}'"),
            ExclusionReason::ExclusionKeyword { keyword, field } => {
                let field = match field {
                    MatchedField::Name => "name",
                    MatchedField::Ingredient => "ingredient",
                };
                write!(f, "{field} matches '{keyword}'")
            }
        }
    }
}

/// Counters produced by [`QualityFilter::partition`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub kept: usize,
    pub excluded_by_type: usize,
    pub excluded_by_keyword: usize,
    /// Exclusions per matched keyword or type
    pub by_term: BTreeMap<String, usize>,
}

impl FilterStats {
    pub fn excluded(&self) -> usize {
        self.excluded_by_type + self.excluded_by_keyword
    }
}

/// Non-dish record filter
#[derive(Debug, Clone)]
pub struct QualityFilter {
    matcher: FuzzyMatcher,
    non_dish_types: HashSet<String>,
    exclusion_keywords: Vec<String>,
}

impl QualityFilter {
    pub fn new<S: AsRef<str>>(non_dish_types: &[S], exclusion_keywords: &[S], thresholds: FuzzyThresholds) -> Self {
        Self {
            matcher: FuzzyMatcher::new(thresholds).with_word_match(),
            non_dish_types: non_dish_types.iter().map(|t| normalize_token(t.as_ref())).collect(),
            exclusion_keywords: exclusion_keywords
                .iter()
                .map(|k| normalize_text(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            &config.filter.non_dish_types,
            &config.filter.exclusion_keywords,
            config.fuzzy,
        )
    }

    /// Reason a record should be dropped, if any
    pub fn exclusion_reason<S: AsRef<str>>(&self, dish_type: &str, name: &str, ingredients: &[S]) -> Option<ExclusionReason> {
        let dish_type = normalize_token(dish_type);
        if self.non_dish_types.contains(&dish_type) {
            return Some(ExclusionReason::NonDishType(dish_type));
        }

        if let Some(hit) = self.matcher.find(&normalize_text(name), &self.exclusion_keywords) {
            return Some(ExclusionReason::ExclusionKeyword {
                keyword: hit.keyword.to_string(),
                field: MatchedField::Name,
            });
        }

        tokenize_list(ingredients).iter().find_map(|token| {
            self.matcher
                .find(token, &self.exclusion_keywords)
                .map(|hit| ExclusionReason::ExclusionKeyword {
                    keyword: hit.keyword.to_string(),
                    field: MatchedField::Ingredient,
                })
        })
    }

    pub fn dish_exclusion_reason(&self, dish: &Dish) -> Option<ExclusionReason> {
        self.exclusion_reason(&dish.dish_type, &dish.name, &dish.ingredients)
    }

    /// Whether a dish is a beverage, "other", or a bundle
    pub fn is_excluded(&self, dish: &Dish) -> bool {
        self.dish_exclusion_reason(dish).is_some()
    }

    /// Split dishes into kept records and exclusion statistics
    ///
    /// Input order is preserved among kept dishes.
    pub fn partition(&self, dishes: Vec<Dish>) -> (Vec<Dish>, FilterStats) {
        let mut stats = FilterStats::default();
        let mut kept = Vec::with_capacity(dishes.len());

        for dish in dishes {
            match self.dish_exclusion_reason(&dish) {
                None => kept.push(dish),
                Some(reason) => {
                    debug!("Excluding '{}': {}", dish.name, reason);
                    let term = match &reason {
                        ExclusionReason::NonDishType(dish_type) => {
                            stats.excluded_by_type += 1;
                            dish_type.clone()
                        }
                        ExclusionReason::ExclusionKeyword { keyword, .. } => {
                            stats.excluded_by_keyword += 1;
                            keyword.clone()
                        }
                    };
                    *stats.by_term.entry(term).or_insert(0) += 1;
                }
            }
        }

        stats.kept = kept.len();
        info!(
            "Quality filter kept {} dishes, excluded {} ({} by type, {} by keyword)",
            stats.kept,
            stats.excluded(),
            stats.excluded_by_type,
            stats.excluded_by_keyword
        );
        (kept, stats)
    }
}
