//! # Dish Type Classification
//!
//! Assigns each cleaned dish a tag from the configured dish-type set by
//! weighted keyword scoring over the restaurant name, the dish name and the
//! ingredient list.

use log::trace;
use serde::{Deserialize, Serialize};

/// Tag used when no rule scores
pub const OTHER_DISH_TYPE: &str = "other";

const RESTAURANT_WEIGHT: u32 = 3;
const DISH_WEIGHT: u32 = 5;
const INGREDIENT_WEIGHT: u32 = 2;

/// Keywords that vote for one dish type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DishTypeRule {
    pub name: String,
    pub restaurant_keywords: Vec<String>,
    pub dish_keywords: Vec<String>,
    pub ingredient_keywords: Vec<String>,
}

impl DishTypeRule {
    pub fn new(name: &str, restaurant: &[&str], dish: &[&str], ingredient: &[&str]) -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            name: name.to_string(),
            restaurant_keywords: owned(restaurant),
            dish_keywords: owned(dish),
            ingredient_keywords: owned(ingredient),
        }
    }

    fn lowercased(&self) -> Self {
        let lower = |words: &[String]| words.iter().map(|w| w.to_lowercase()).collect();
        Self {
            name: self.name.clone(),
            restaurant_keywords: lower(&self.restaurant_keywords),
            dish_keywords: lower(&self.dish_keywords),
            ingredient_keywords: lower(&self.ingredient_keywords),
        }
    }
}

/// Weighted keyword classifier
///
/// Each restaurant-name hit scores 3, each dish-name hit 5 and each
/// ingredient hit 2. The highest total wins; on a tie the rule declared first
/// wins. Hits are plain case-insensitive substring matches.
#[derive(Debug, Clone)]
pub struct DishTypeClassifier {
    rules: Vec<DishTypeRule>,
}

impl DishTypeClassifier {
    pub fn new(rules: &[DishTypeRule]) -> Self {
        Self {
            rules: rules.iter().map(DishTypeRule::lowercased).collect(),
        }
    }

    /// Score of every rule, in declaration order
    pub fn scores<S: AsRef<str>>(
        &self,
        dish_name: &str,
        restaurant_name: &str,
        ingredients: &[S],
    ) -> Vec<(&str, u32)> {
        let dish = dish_name.to_lowercase();
        let restaurant = restaurant_name.to_lowercase();
        let ingredients = ingredients
            .iter()
            .map(|i| i.as_ref().to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let hits = |haystack: &str, keywords: &[String]| {
            keywords.iter().filter(|kw| haystack.contains(kw.as_str())).count() as u32
        };

        self.rules
            .iter()
            .map(|rule| {
                let score = hits(&restaurant, &rule.restaurant_keywords) * RESTAURANT_WEIGHT
                    + hits(&dish, &rule.dish_keywords) * DISH_WEIGHT
                    + hits(&ingredients, &rule.ingredient_keywords) * INGREDIENT_WEIGHT;
                (rule.name.as_str(), score)
            })
            .collect()
    }

    /// Best-scoring dish type, or [`OTHER_DISH_TYPE`] when nothing scores
    pub fn classify<S: AsRef<str>>(&self, dish_name: &str, restaurant_name: &str, ingredients: &[S]) -> String {
        let mut best: Option<(&str, u32)> = None;
        for (name, score) in self.scores(dish_name, restaurant_name, ingredients) {
            if score == 0 {
                continue;
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }
        let dish_type = best.map_or(OTHER_DISH_TYPE, |(name, _)| name).to_string();
        trace!("Dish '{}' classified as '{}'", dish_name, dish_type);
        dish_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> DishTypeClassifier {
        DishTypeClassifier::new(&[
            DishTypeRule::new("pizza", &["pizzeria"], &["pizza", "margherita"], &["mozzarella"]),
            DishTypeRule::new("pasta", &["trattoria"], &["spaghetti", "lasagne"], &["parmigiano"]),
            DishTypeRule::new("dessert", &[], &["tiramisù"], &["mascarpone"]),
        ])
    }

    #[test]
    fn test_dish_name_weighs_most() {
        let c = classifier();
        // restaurant says pizza (3), dish says pasta (5)
        assert_eq!(c.classify("Spaghetti al pomodoro", "Pizzeria Bella", &["pomodoro"]), "pasta");
    }

    #[test]
    fn test_tie_goes_to_first_rule() {
        let c = classifier();
        // pizza: ingredient mozzarella (2); pasta: ingredient parmigiano (2)
        assert_eq!(c.classify("Speciale", "Da Gino", &["mozzarella", "parmigiano"]), "pizza");
    }

    #[test]
    fn test_no_score_is_other() {
        let c = classifier();
        assert_eq!(c.classify("Insalata", "Da Gino", &["lattuga"]), OTHER_DISH_TYPE);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify("TIRAMISÙ", "Bar", &Vec::<String>::new()), "dessert");
    }

    #[test]
    fn test_scores_accumulate_per_keyword() {
        let c = classifier();
        let scores = c.scores("Pizza Margherita", "Pizzeria Bella", &["Mozzarella"]);
        assert_eq!(scores[0], ("pizza", 3 + 5 + 5 + 2));
    }
}
