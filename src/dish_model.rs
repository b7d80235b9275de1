//! # Dish and Restaurant Data Model
//!
//! Records exchanged between pipeline stages through JSON snapshots.
//!
//! ## Core Concepts
//!
//! - **Raw records**: the scraper's loosely typed output, accepted with its
//!   Italian keys as aliases
//! - **Dish / Restaurant**: cleaned records, progressively enriched by later
//!   stages (allergens, calorie estimate, healthy flag)
//! - **DishCluster**: the merged representative of near-duplicate dishes
//! - **Allergen**: the closed 14-tag allergen taxonomy
//!
//! ## Usage
//!
//! ```rust
//! use menu_pipeline::dish_model::Dish;
//!
//! let dish = Dish::new("Pizza Margherita", "Pizzeria Da Michele")
//!     .with_dish_type("pizza")
//!     .with_ingredients(["mozzarella", "pomodoro", "basilico"]);
//! assert_eq!(dish.ingredients.len(), 3);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text_processing::{normalize_text, tokenize_list};

/// Allergen tag from the fixed 14-member taxonomy
///
/// Variants are declared in alphabetical order of their serialized names, so
/// a `BTreeSet<Allergen>` serializes as a sorted array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Allergen {
    #[serde(rename = "celery")]
    Celery,
    #[serde(rename = "crustaceans")]
    Crustaceans,
    #[serde(rename = "eggs")]
    Eggs,
    #[serde(rename = "fish")]
    Fish,
    #[serde(rename = "gluten")]
    Gluten,
    #[serde(rename = "lupin")]
    Lupin,
    #[serde(rename = "milk")]
    Milk,
    #[serde(rename = "molluscs")]
    Molluscs,
    #[serde(rename = "mustard")]
    Mustard,
    #[serde(rename = "peanuts")]
    Peanuts,
    #[serde(rename = "sesame")]
    Sesame,
    #[serde(rename = "soy")]
    Soy,
    #[serde(rename = "sulphites")]
    Sulphites,
    #[serde(rename = "tree nuts")]
    TreeNuts,
}

impl Allergen {
    /// Every tag of the taxonomy, in serialized-name order
    pub const ALL: [Allergen; 14] = [
        Allergen::Celery,
        Allergen::Crustaceans,
        Allergen::Eggs,
        Allergen::Fish,
        Allergen::Gluten,
        Allergen::Lupin,
        Allergen::Milk,
        Allergen::Molluscs,
        Allergen::Mustard,
        Allergen::Peanuts,
        Allergen::Sesame,
        Allergen::Soy,
        Allergen::Sulphites,
        Allergen::TreeNuts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Allergen::Celery => "celery",
            Allergen::Crustaceans => "crustaceans",
            Allergen::Eggs => "eggs",
            Allergen::Fish => "fish",
            Allergen::Gluten => "gluten",
            Allergen::Lupin => "lupin",
            Allergen::Milk => "milk",
            Allergen::Molluscs => "molluscs",
            Allergen::Mustard => "mustard",
            Allergen::Peanuts => "peanuts",
            Allergen::Sesame => "sesame",
            Allergen::Soy => "soy",
            Allergen::Sulphites => "sulphites",
            Allergen::TreeNuts => "tree nuts",
        }
    }
}

impl fmt::Display for Allergen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Allergen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', " ");
        Allergen::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| format!("unknown allergen tag: {s}"))
    }
}

/// Ingredient field as produced by the scraper
///
/// Either a JSON list, a comma-delimited string, or anything else (null,
/// numbers, objects). Resolved once into an ordered list of strings by
/// [`IngredientField::items`]; decoding never fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngredientField {
    List(Vec<serde_json::Value>),
    Text(String),
    Other(serde_json::Value),
}

impl Default for IngredientField {
    fn default() -> Self {
        IngredientField::Other(serde_json::Value::Null)
    }
}

impl IngredientField {
    /// Raw ingredient strings in input order, untrimmed
    ///
    /// List items that are not strings are stringified; nulls are skipped.
    pub fn items(&self) -> Vec<String> {
        match self {
            IngredientField::List(values) => values
                .iter()
                .filter_map(|value| match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect(),
            IngredientField::Text(text) => text.split(',').map(str::to_string).collect(),
            IngredientField::Other(_) => Vec::new(),
        }
    }
}

impl From<Vec<String>> for IngredientField {
    fn from(items: Vec<String>) -> Self {
        IngredientField::List(items.into_iter().map(serde_json::Value::String).collect())
    }
}

impl From<&str> for IngredientField {
    fn from(text: &str) -> Self {
        IngredientField::Text(text.to_string())
    }
}

/// Restaurant exactly as scraped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRestaurant {
    #[serde(default, alias = "nome")]
    pub name: Option<String>,
    #[serde(default, alias = "indirizzo")]
    pub address: Option<String>,
    #[serde(default, alias = "tipo", alias = "tipo_cucina")]
    pub cuisine: Option<String>,
    #[serde(default, alias = "telefono")]
    pub phone: Option<String>,
    /// Usually a list of strings; anything else is treated as no hours
    #[serde(default, alias = "orari")]
    pub opening_hours: serde_json::Value,
    #[serde(default, alias = "piatti")]
    pub dishes: Option<Vec<RawDish>>,
}

/// Dish exactly as scraped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDish {
    #[serde(default, alias = "nome")]
    pub name: Option<String>,
    /// Number or display string such as "€ 8,50"
    #[serde(default, alias = "prezzo")]
    pub price: serde_json::Value,
    #[serde(default, alias = "ingredienti")]
    pub ingredients: IngredientField,
    #[serde(default, alias = "categoria")]
    pub category: Option<String>,
    #[serde(default, alias = "sottocategoria")]
    pub subcategory: Option<String>,
}

/// A cleaned dish record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: String,
    pub name: String,
    pub restaurant_name: String,
    pub dish_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub estimated_calories: Option<f64>,
    #[serde(default)]
    pub healthy: Option<bool>,
    pub processed_at: DateTime<Utc>,
}

impl Dish {
    /// Create a dish with a fresh identifier and no enrichment
    pub fn new(name: impl Into<String>, restaurant_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            restaurant_name: restaurant_name.into(),
            dish_type: String::new(),
            category: None,
            subcategory: None,
            ingredients: Vec::new(),
            price: 0.0,
            source: String::new(),
            allergens: BTreeSet::new(),
            estimated_calories: None,
            healthy: None,
            processed_at: Utc::now(),
        }
    }

    pub fn with_dish_type(mut self, dish_type: impl Into<String>) -> Self {
        self.dish_type = dish_type.into();
        self
    }

    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_allergens<I: IntoIterator<Item = Allergen>>(mut self, allergens: I) -> Self {
        self.allergens = allergens.into_iter().collect();
        self
    }

    /// Content identity used to merge estimates back into records
    pub fn key(&self) -> DishKey {
        DishKey::new(&self.name, &self.ingredients)
    }
}

/// A cleaned restaurant with its embedded menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub cuisine: String,
    pub address: String,
    pub phone: String,
    pub opening_hours: Vec<String>,
    pub dish_count: usize,
    pub menu: Vec<Dish>,
    pub source: String,
    pub processed_at: DateTime<Utc>,
}

/// Merged representative of one or more near-duplicate dishes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DishCluster {
    /// Display name of the first member
    pub name: String,
    /// Sorted, deduplicated union of normalized ingredient tokens
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub dish_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Identifiers of every source dish merged into this cluster
    #[serde(default)]
    pub member_ids: Vec<String>,
}

impl DishCluster {
    pub fn key(&self) -> DishKey {
        DishKey::new(&self.name, &self.ingredients)
    }
}

/// Calorie and health estimate for one dish
///
/// `None` means "could not be estimated", which is distinct from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub calories: Option<f64>,
    pub healthy: Option<bool>,
}

impl Estimate {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.calories.is_none() && self.healthy.is_none()
    }
}

/// A unique dish together with its estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedDish {
    #[serde(flatten)]
    pub cluster: DishCluster,
    pub estimated_calories: Option<f64>,
    pub healthy: Option<bool>,
}

impl EstimatedDish {
    pub fn new(cluster: DishCluster, estimate: Estimate) -> Self {
        Self {
            cluster,
            estimated_calories: estimate.calories,
            healthy: estimate.healthy,
        }
    }

    pub fn estimate(&self) -> Estimate {
        Estimate {
            calories: self.estimated_calories,
            healthy: self.healthy,
        }
    }
}

/// Stable content identity: normalized name plus sorted ingredient tokens
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DishKey {
    pub name: String,
    pub ingredients: Vec<String>,
}

impl DishKey {
    pub fn new<S: AsRef<str>>(name: &str, ingredients: &[S]) -> Self {
        let mut tokens = tokenize_list(ingredients);
        tokens.sort();
        tokens.dedup();
        Self {
            name: normalize_text(name),
            ingredients: tokens,
        }
    }
}

impl fmt::Display for DishKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.ingredients.join(", "))
    }
}
