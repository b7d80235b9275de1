//! # Menu Pipeline
//!
//! Batch ETL over scraped restaurant menus: cleans restaurants and dishes,
//! drops non-dish records, tags allergens, merges near-duplicate dishes and
//! estimates calories and a healthy flag per unique dish.

pub mod allergens;
pub mod calorie_table;
pub mod circuit_breaker;
pub mod cleaning;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod dish_model;
pub mod dish_type;
pub mod errors;
pub mod estimator;
pub mod inference;
pub mod ollama;
pub mod pipeline;
pub mod quality_filter;
pub mod report;
pub mod similarity;
pub mod snapshot;
pub mod text_processing;
pub mod vocabulary;
