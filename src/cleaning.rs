//! # Restaurant Cleaning Module
//!
//! First pipeline stage: turns scraped restaurants into validated
//! [`Restaurant`] and [`Dish`] records.
//!
//! ## Restaurant checks, in order
//!
//! 1. Name and address present
//! 2. Cleaned address lies in Milan (keyword, postal code or neighborhood)
//! 3. Not a duplicate of an earlier restaurant (hash of name and address
//!    without house numbers)
//! 4. At least `min_dishes_per_restaurant` valid dishes
//!
//! ## Dish checks
//!
//! Name length and content, price bounds (out-of-range prices are counted
//! but kept) and at least one valid ingredient. Every kept dish gets a dish
//! type from [`DishTypeClassifier`].

use std::collections::HashSet;

use chrono::Utc;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{LocalityConfig, PipelineConfig, QualityConfig};
use crate::dish_model::{Dish, RawDish, RawRestaurant, Restaurant};
use crate::dish_type::DishTypeClassifier;
use crate::errors::{ConfigError, RejectReason};
use crate::report::QualityStats;
use crate::text_processing::{clean_ingredients, collapse_whitespace, fold_diacritics};

lazy_static! {
    static ref REPEATED_COMMAS_REGEX: Regex = Regex::new(r",{2,}").expect("comma pattern should be valid");
    static ref DIGITS_REGEX: Regex = Regex::new(r"\d+").expect("digit pattern should be valid");
    static ref INVALID_DISH_NAME_REGEX: Regex =
        Regex::new(r"^[\d\s\-_]+$").expect("dish name pattern should be valid");
    static ref HOURS_SEPARATOR_REGEX: Regex =
        Regex::new(r"[\s\-–—]+").expect("hours separator pattern should be valid");
    static ref NON_ALPHANUMERIC_REGEX: Regex =
        Regex::new(r"[^a-z0-9]+").expect("word boundary pattern should be valid");
    /// Street-type abbreviations; "v.le" must be tried before the bare "v."
    static ref ADDRESS_ABBREVIATIONS: Vec<(Regex, &'static str)> = [
        (r"(?i)\bv\.?\s?le\b\.?\s*", "Viale "),
        (r"(?i)\bp\.?\s?za\b\.?\s*", "Piazza "),
        (r"(?i)\bc\.?\s?so\b\.?\s*", "Corso "),
        (r"(?i)\bv\b\.?\s*", "Via "),
        (r"(?i)\blargo\b\s*", "Largo "),
    ]
    .iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("address abbreviation pattern should be valid"), *replacement)
    })
    .collect();
}

/// Clean an address for display and locality checks
///
/// Diacritics are folded, whitespace and repeated commas collapsed and
/// street-type abbreviations expanded.
///
/// # Examples
///
/// ```rust
/// use menu_pipeline::cleaning::clean_address;
///
/// assert_eq!(clean_address("v.le  Monza 12,, Milano"), "Viale Monza 12, Milano");
/// assert_eq!(clean_address("P.za Città di Castello"), "Piazza Citta di Castello");
/// ```
pub fn clean_address(address: &str) -> String {
    let mut cleaned = collapse_whitespace(&fold_diacritics(address));
    cleaned = REPEATED_COMMAS_REGEX.replace_all(&cleaned, ",").into_owned();
    for (pattern, replacement) in ADDRESS_ABBREVIATIONS.iter() {
        cleaned = pattern.replace_all(&cleaned, *replacement).into_owned();
    }
    collapse_whitespace(&cleaned)
}

/// Standardize opening-hour strings; anything other than a list gives no hours
pub fn clean_opening_hours(value: &Value) -> Vec<String> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| HOURS_SEPARATOR_REGEX.replace_all(entry, "-").into_owned())
        .collect()
}

/// Parse a scraped price and check it against the configured bounds
///
/// Returns the parsed value (0.0 when unparseable) and whether it is in range.
pub fn parse_price(value: &Value, quality: &QualityConfig) -> (f64, bool) {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let digits: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            digits.parse::<f64>().ok()
        }
        _ => None,
    };
    match parsed {
        Some(price) => (price, price >= quality.min_price && price <= quality.max_price),
        None => (0.0, false),
    }
}

/// Milan-locality heuristic matched on whole words
#[derive(Debug, Clone)]
pub struct LocalityMatcher {
    terms: Vec<String>,
}

impl LocalityMatcher {
    pub fn new(config: &LocalityConfig) -> Self {
        let terms = config
            .keywords
            .iter()
            .chain(&config.postal_codes)
            .chain(&config.zones)
            .map(|term| Self::words(term))
            .filter(|term| !term.trim().is_empty())
            .collect();
        Self { terms }
    }

    /// Lowercased, diacritic-free text with every word padded by spaces
    fn words(text: &str) -> String {
        let folded = fold_diacritics(text).to_lowercase();
        let spaced = NON_ALPHANUMERIC_REGEX.replace_all(&folded, " ");
        format!(" {} ", collapse_whitespace(&spaced))
    }

    pub fn matches(&self, address: &str) -> bool {
        let address = Self::words(address);
        self.terms.iter().any(|term| address.contains(term.as_str()))
    }
}

/// Duplicate-detection hash of a restaurant
///
/// SHA-256 over the lowercased name and the lowercased address with house
/// numbers removed.
pub fn restaurant_hash(name: &str, address: &str) -> String {
    let address = DIGITS_REGEX.replace_all(&address.to_lowercase(), "").into_owned();
    let combined = format!("{}|{}", name.to_lowercase(), collapse_whitespace(&address));
    hex::encode(Sha256::digest(combined.as_bytes()))
}

/// Records produced by the cleaning stage
#[derive(Debug, Clone, Default)]
pub struct CleaningOutput {
    pub restaurants: Vec<Restaurant>,
    /// Flat dish list, deduplicated on (name, restaurant)
    pub dishes: Vec<Dish>,
    pub stats: QualityStats,
}

/// Restaurant and dish cleaner
#[derive(Debug, Clone)]
pub struct RestaurantCleaner {
    quality: QualityConfig,
    locality: LocalityMatcher,
    aliases: Vec<(Regex, String)>,
    classifier: DishTypeClassifier,
}

impl RestaurantCleaner {
    /// Build a cleaner; fails if a name alias pattern does not compile
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let aliases = config
            .restaurant_aliases
            .iter()
            .map(|alias| {
                Regex::new(&format!("(?i){}", alias.pattern))
                    .map(|re| (re, alias.replacement.clone()))
                    .map_err(|e| ConfigError::Invalid(format!("restaurant alias '{}': {}", alias.pattern, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            quality: config.quality.clone(),
            locality: LocalityMatcher::new(&config.milan),
            aliases,
            classifier: DishTypeClassifier::new(&config.dish_types),
        })
    }

    /// Apply the configured aliases (e.g. "mcdonalds" to "McDonald's")
    pub fn normalize_restaurant_name(&self, name: &str) -> String {
        let mut normalized = name.trim().to_string();
        for (pattern, replacement) in &self.aliases {
            normalized = pattern.replace_all(&normalized, replacement.as_str()).into_owned();
        }
        collapse_whitespace(&normalized)
    }

    /// Validate a trimmed dish name
    pub fn check_dish_name(&self, name: &str) -> Result<(), RejectReason> {
        let length = name.chars().count();
        if length == 0 {
            Err(RejectReason::DishEmptyName)
        } else if length < self.quality.min_dish_name_length {
            Err(RejectReason::DishNameTooShort)
        } else if length > self.quality.max_dish_name_length {
            Err(RejectReason::DishNameTooLong)
        } else if INVALID_DISH_NAME_REGEX.is_match(name) {
            Err(RejectReason::DishNameInvalid)
        } else {
            Ok(())
        }
    }

    fn clean_dish(&self, raw: &RawDish, restaurant_name: &str, stats: &mut QualityStats) -> Result<Dish, RejectReason> {
        let name = raw.name.as_deref().unwrap_or_default().trim();
        self.check_dish_name(name)?;

        let (price, valid_price) = parse_price(&raw.price, &self.quality);
        if !valid_price && price > 0.0 {
            stats.anomalous_prices += 1;
            warn!("Anomalous price for dish '{}': €{}", name, price);
        }

        let ingredients = clean_ingredients(&raw.ingredients);
        if ingredients.is_empty() {
            return Err(RejectReason::DishNoValidIngredients);
        }

        let dish_type = self.classifier.classify(name, restaurant_name, &ingredients);
        let mut dish = Dish::new(name, restaurant_name)
            .with_dish_type(dish_type)
            .with_ingredients(ingredients)
            .with_price(price);
        dish.category = raw.category.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);
        dish.subcategory = raw
            .subcategory
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        dish.source = self.quality.source.clone();
        Ok(dish)
    }

    fn clean_restaurant(
        &self,
        raw: &RawRestaurant,
        seen: &mut HashSet<String>,
        stats: &mut QualityStats,
    ) -> Result<Restaurant, RejectReason> {
        let (Some(name), Some(address)) = (
            raw.name.as_deref().filter(|n| !n.trim().is_empty()),
            raw.address.as_deref().filter(|a| !a.trim().is_empty()),
        ) else {
            return Err(RejectReason::MissingNameOrAddress);
        };

        let name = self.normalize_restaurant_name(name);
        let address = clean_address(address);

        if !self.locality.matches(&address) {
            warn!("Restaurant '{}' rejected: address '{}' is not in Milan", name, address);
            return Err(RejectReason::AddressNotMilan);
        }

        if !seen.insert(restaurant_hash(&name, &address)) {
            warn!("Duplicate restaurant '{}'", name);
            return Err(RejectReason::DuplicateRestaurant);
        }

        let mut menu = Vec::new();
        for raw_dish in raw.dishes.iter().flatten() {
            stats.dishes_processed += 1;
            match self.clean_dish(raw_dish, &name, stats) {
                Ok(dish) => menu.push(dish),
                Err(reason) => {
                    debug!("Dish {:?} of '{}' rejected: {}", raw_dish.name, name, reason);
                    stats.record_rejection(reason);
                }
            }
        }

        if menu.len() < self.quality.min_dishes_per_restaurant {
            warn!("Restaurant '{}' rejected: only {} valid dishes", name, menu.len());
            return Err(RejectReason::TooFewDishes);
        }

        Ok(Restaurant {
            id: Uuid::new_v4().to_string(),
            name,
            cuisine: raw.cuisine.as_deref().map(str::trim).unwrap_or_default().to_string(),
            address,
            phone: raw.phone.as_deref().map(str::trim).unwrap_or_default().to_string(),
            opening_hours: clean_opening_hours(&raw.opening_hours),
            dish_count: menu.len(),
            menu,
            source: self.quality.source.clone(),
            processed_at: Utc::now(),
        })
    }

    /// Clean every scraped restaurant
    pub fn clean(&self, raw: &[RawRestaurant]) -> CleaningOutput {
        let mut output = CleaningOutput::default();
        let mut seen = HashSet::new();
        info!("Cleaning {} scraped restaurants", raw.len());

        for (index, record) in raw.iter().enumerate() {
            output.stats.restaurants_processed += 1;
            match self.clean_restaurant(record, &mut seen, &mut output.stats) {
                Ok(restaurant) => {
                    output.stats.restaurants_kept += 1;
                    output.stats.dishes_kept += restaurant.menu.len();
                    output.dishes.extend(restaurant.menu.iter().cloned());
                    output.restaurants.push(restaurant);
                }
                Err(reason) => output.stats.record_rejection(reason),
            }
            if (index + 1) % 100 == 0 {
                info!("Processed {}/{} restaurants", index + 1, raw.len());
            }
        }

        let before = output.dishes.len();
        let mut keys = HashSet::new();
        output.dishes.retain(|dish| {
            keys.insert(format!(
                "{}|{}",
                dish.name.trim().to_lowercase(),
                dish.restaurant_name.trim().to_lowercase()
            ))
        });
        output.stats.duplicate_dishes_removed = before - output.dishes.len();

        for dish in &output.dishes {
            *output.stats.dish_types.entry(dish.dish_type.clone()).or_insert(0) += 1;
        }

        info!(
            "Kept {} restaurants and {} dishes ({} duplicate dishes removed)",
            output.restaurants.len(),
            output.dishes.len(),
            output.stats.duplicate_dishes_removed
        );
        output
    }
}
