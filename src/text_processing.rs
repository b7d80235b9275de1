//! # Text Processing Module
//!
//! Normalization helpers shared by every downstream component.
//!
//! ## Features
//!
//! - Token normalization: lowercase, apostrophe unification, whitespace collapse
//! - Dish-name normalization restricted to Italian letters, digits and apostrophes
//! - Diacritic folding for restaurant names and addresses
//! - Ingredient tokenization from list or comma-delimited input
//! - Ingredient cleaning that drops placeholder text such as "non specificato"
//! - Keyword extraction from free-text ingredient descriptions
//!
//! None of these functions fail: empty or odd input degrades to an empty result.

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::dish_model::IngredientField;

/// Minimum length, in characters, of a cleaned ingredient
pub const MIN_INGREDIENT_LENGTH: usize = 2;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").expect("whitespace pattern should be valid");
    static ref DISALLOWED_CHARS_REGEX: Regex =
        Regex::new(r"[^a-z0-9àèéìòóùç' ]").expect("allowed-character pattern should be valid");
    static ref KEYWORD_SPLIT_REGEX: Regex =
        Regex::new(r"[,\-–\n]| con | e | ed | alla | al | ai | alle | di ")
            .expect("keyword split pattern should be valid");
    static ref PLACEHOLDER_PATTERNS: Vec<Regex> = [
        r"ingredienti non disponibili",
        r"non specificat[io]",
        r"da definire",
        r"^-+$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("placeholder pattern should be valid"))
    .collect();
}

/// Collapse every run of whitespace to a single space and trim
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

/// Lowercase, unify apostrophes, collapse whitespace
///
/// # Examples
///
/// ```rust
/// use menu_pipeline::text_processing::normalize_token;
///
/// assert_eq!(normalize_token("  Olio  d’Oliva "), "olio d'oliva");
/// ```
pub fn normalize_token(text: &str) -> String {
    let unified: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '’' | '‘' | '`' | '´' => '\'',
            other => other,
        })
        .collect();
    collapse_whitespace(&unified)
}

/// Normalize for dish-name and ingredient comparison
///
/// Applies [`normalize_token`] then removes every character outside
/// `a-z`, the Italian accented vowels, `ç`, digits, apostrophe and space.
///
/// # Examples
///
/// ```rust
/// use menu_pipeline::text_processing::normalize_text;
///
/// assert_eq!(normalize_text("Tiramisù (fatto in casa!)"), "tiramisù fatto in casa");
/// ```
pub fn normalize_text(text: &str) -> String {
    let token = normalize_token(text);
    let stripped = DISALLOWED_CHARS_REGEX.replace_all(&token, "");
    collapse_whitespace(&stripped)
}

/// Transliterate accented Latin letters to ASCII by dropping combining marks
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalized ingredient tokens from a scraped ingredient field
///
/// Accepts a list or a comma-delimited string. Tokens are normalized with
/// [`normalize_text`]; empty tokens are dropped.
pub fn tokenize_ingredients(field: &IngredientField) -> Vec<String> {
    tokenize_list(&field.items())
}

/// Normalized tokens from an already-resolved ingredient list
pub fn tokenize_list<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|item| normalize_text(item.as_ref()))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Display-form ingredients kept by the cleaning stage
///
/// Entries are trimmed but keep their case. Placeholders (for example
/// "Ingredienti non disponibili"), dash-only entries and entries shorter than
/// [`MIN_INGREDIENT_LENGTH`] characters are dropped.
pub fn clean_ingredients(field: &IngredientField) -> Vec<String> {
    field
        .items()
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .filter(|item| {
            let lower = item.to_lowercase();
            let placeholder = PLACEHOLDER_PATTERNS.iter().any(|re| re.is_match(&lower));
            if placeholder {
                trace!("Dropping placeholder ingredient '{}'", item);
            }
            !placeholder
        })
        .filter(|item| item.chars().count() >= MIN_INGREDIENT_LENGTH)
        .map(str::to_string)
        .collect()
}

/// Split a free-text ingredient description into lookup keywords
///
/// Splits on commas, dashes, newlines and the Italian connectives
/// "con", "e", "ed", "alla", "al", "ai", "alle", "di".
///
/// # Examples
///
/// ```rust
/// use menu_pipeline::text_processing::extract_keywords;
///
/// assert_eq!(
///     extract_keywords("Pomodoro con mozzarella e basilico"),
///     vec!["pomodoro", "mozzarella", "basilico"]
/// );
/// ```
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    KEYWORD_SPLIT_REGEX
        .split(&lower)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
