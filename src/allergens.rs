//! # Allergen Classification Module
//!
//! Maps a dish's ingredient tokens, dish type and name to a set of tags from
//! the 14-tag allergen taxonomy.
//!
//! ## Algorithm
//!
//! 1. Dish-type fast-path rules add their tags unconditionally
//!    (e.g. `pizza` implies gluten)
//! 2. Each tag's keywords are matched against every ingredient token with a
//!    [`FuzzyMatcher`] (exact substring, full ratio or partial ratio; no
//!    per-word comparison); a tag stops scanning on its first hit
//! 3. Tags still missing are matched against the normalized dish name, which
//!    catches names like "tiramisù" that imply eggs and milk
//!
//! The classifier is pure: the same inputs always give the same tag set.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, trace};

use crate::config::PipelineConfig;
use crate::dish_model::{Allergen, Dish};
use crate::errors::ConfigError;
use crate::similarity::{FuzzyMatcher, FuzzyThresholds};
use crate::text_processing::{normalize_text, normalize_token, tokenize_list};

/// Keyword and fuzzy-match allergen classifier
#[derive(Debug, Clone)]
pub struct AllergenClassifier {
    matcher: FuzzyMatcher,
    /// Normalized keywords per tag, in taxonomy order
    keywords: Vec<(Allergen, Vec<String>)>,
    /// Normalized dish type to implied tags
    type_rules: HashMap<String, Vec<Allergen>>,
}

impl AllergenClassifier {
    /// Build a classifier from keyword and fast-path dictionaries
    ///
    /// Keyword map keys are allergen tag names such as `"tree nuts"`; an
    /// unknown tag is a configuration error.
    pub fn new<'a, K, R>(keywords: K, type_rules: R, thresholds: FuzzyThresholds) -> Result<Self, ConfigError>
    where
        K: IntoIterator<Item = (&'a String, &'a Vec<String>)>,
        R: IntoIterator<Item = (&'a String, &'a Vec<Allergen>)>,
    {
        let mut parsed = Vec::new();
        for (tag, words) in keywords {
            let tag: Allergen = tag.parse().map_err(ConfigError::Invalid)?;
            let words: Vec<String> = words
                .iter()
                .map(|word| normalize_text(word))
                .filter(|word| !word.is_empty())
                .collect();
            parsed.push((tag, words));
        }
        parsed.sort_by_key(|(tag, _)| *tag);

        let type_rules = type_rules
            .into_iter()
            .map(|(dish_type, tags)| (normalize_token(dish_type), tags.clone()))
            .collect();

        Ok(Self {
            matcher: FuzzyMatcher::new(thresholds),
            keywords: parsed,
            type_rules,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Self::new(&config.allergens.keywords, &config.allergens.type_rules, config.fuzzy)
    }

    /// Allergen tags for one dish
    ///
    /// # Arguments
    ///
    /// * `ingredient_tokens` - ingredient strings; normalized internally
    /// * `dish_type` - classification tag used for fast-path rules
    /// * `dish_name` - display name, scanned after the ingredients
    ///
    /// # Examples
    ///
    /// ```rust
    /// use menu_pipeline::allergens::AllergenClassifier;
    /// use menu_pipeline::config::PipelineConfig;
    /// use menu_pipeline::dish_model::Allergen;
    ///
    /// let classifier = AllergenClassifier::from_config(&PipelineConfig::default())?;
    /// let tags = classifier.classify(&["mozzarella", "pomodoro", "basilico"], "pizza", "Pizza Margherita");
    /// assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec![Allergen::Gluten, Allergen::Milk]);
    /// # Ok::<(), menu_pipeline::errors::ConfigError>(())
    /// ```
    pub fn classify<S: AsRef<str>>(&self, ingredient_tokens: &[S], dish_type: &str, dish_name: &str) -> BTreeSet<Allergen> {
        let mut found = BTreeSet::new();

        if let Some(implied) = self.type_rules.get(&normalize_token(dish_type)) {
            trace!("Dish type '{}' implies {:?}", dish_type, implied);
            found.extend(implied.iter().copied());
        }

        let tokens = tokenize_list(ingredient_tokens);
        let name = normalize_text(dish_name);

        for (tag, keywords) in &self.keywords {
            if found.contains(tag) {
                continue;
            }
            let hit = tokens
                .iter()
                .chain(std::iter::once(&name))
                .find_map(|text| self.matcher.find(text, keywords));
            if let Some(hit) = hit {
                trace!("Tag '{}' from keyword '{}' ({:?})", tag, hit.keyword, hit.kind);
                found.insert(*tag);
            }
        }

        found
    }

    /// Tags for a cleaned dish record
    pub fn classify_dish(&self, dish: &Dish) -> BTreeSet<Allergen> {
        self.classify(&dish.ingredients, &dish.dish_type, &dish.name)
    }

    /// Replace each dish's allergen set with the classified one
    pub fn enrich(&self, dishes: &mut [Dish]) {
        for dish in dishes.iter_mut() {
            dish.allergens = self.classify_dish(dish);
            debug!("Dish '{}' allergens: {:?}", dish.name, dish.allergens);
        }
        let tagged = dishes.iter().filter(|d| !d.allergens.is_empty()).count();
        info!("Classified allergens for {} dishes ({} with at least one tag)", dishes.len(), tagged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> AllergenClassifier {
        AllergenClassifier::from_config(&PipelineConfig::default()).unwrap()
    }

    fn tags(list: &[Allergen]) -> BTreeSet<Allergen> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_fast_path_without_ingredients() {
        let c = classifier();
        let empty: [&str; 0] = [];
        assert_eq!(c.classify(&empty, "pizza", ""), tags(&[Allergen::Gluten]));
        assert_eq!(c.classify(&empty, "sushi", ""), tags(&[Allergen::Fish]));
        assert_eq!(c.classify(&empty, "Flatbread", ""), tags(&[Allergen::Gluten]));
    }

    #[test]
    fn test_empty_input_is_empty_set() {
        let c = classifier();
        let empty: [&str; 0] = [];
        assert!(c.classify(&empty, "salad", "").is_empty());
    }

    #[test]
    fn test_fuzzy_typo_in_ingredient() {
        let c = classifier();
        assert_eq!(c.classify(&["mozzarela"], "salad", "Caprese"), tags(&[Allergen::Milk]));
    }

    #[test]
    fn test_single_word_similarity_is_not_a_hit() {
        let c = classifier();
        // "fetta" is one edit from "feta" but the whole token is not
        assert!(c.classify(&["fetta biscottata"], "dessert", "Colazione").is_empty());
    }

    #[test]
    fn test_short_token_does_not_match_longer_keyword() {
        let c = classifier();
        assert_eq!(c.classify(&["burro"], "dessert", ""), tags(&[Allergen::Milk]));
        assert_eq!(
            c.classify(&["burro di arachidi"], "dessert", ""),
            tags(&[Allergen::Milk, Allergen::Peanuts])
        );
    }

    #[test]
    fn test_dish_name_source() {
        let c = classifier();
        let result = c.classify(&["savoiardi", "caffè"], "dessert", "Tiramisù");
        assert!(result.contains(&Allergen::Eggs));
        assert!(result.contains(&Allergen::Milk));
        assert!(result.contains(&Allergen::Gluten));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let keywords: HashMap<String, Vec<String>> =
            [("nuts".to_string(), vec!["noci".to_string()])].into_iter().collect();
        let rules: HashMap<String, Vec<Allergen>> = HashMap::new();
        assert!(AllergenClassifier::new(&keywords, &rules, FuzzyThresholds::default()).is_err());
    }

    #[test]
    fn test_enrich_overwrites_allergens() {
        let c = classifier();
        let mut dishes = vec![Dish::new("Insalata di tonno", "Da Gino")
            .with_dish_type("salad")
            .with_ingredients(["lattuga", "tonno"])
            .with_allergens([Allergen::Lupin])];
        c.enrich(&mut dishes);
        assert_eq!(dishes[0].allergens, tags(&[Allergen::Fish]));
    }
}
