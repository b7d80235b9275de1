//! # Error Types Module
//!
//! Structured error types for the pipeline. Infrastructure failures
//! (missing snapshots, unwritable outputs, bad configuration) are fatal to a
//! run; record-level problems are tallied as [`RejectReason`]s and inference
//! problems degrade to an absent estimate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that terminate a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage input snapshot does not exist
    #[error("input snapshot not found: {}", path.display())]
    InputMissing { path: PathBuf },
    /// A stage input snapshot exists but cannot be read or decoded
    #[error("input snapshot {} is unreadable: {message}", path.display())]
    InputMalformed { path: PathBuf, message: String },
    /// A stage output could not be written
    #[error("cannot write output {}: {source}", path.display())]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Output serialization failed
    #[error("cannot serialize output {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of a single inference call
///
/// Every variant is recoverable: the caller retries and finally records the
/// estimate as absent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("inference request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service returned status {status}: {message}")]
    Service { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            InferenceError::Service {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            InferenceError::MalformedResponse(err.to_string())
        } else {
            InferenceError::Transport(err.to_string())
        }
    }
}

/// Why a restaurant or dish record was dropped during cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    MissingNameOrAddress,
    AddressNotMilan,
    DuplicateRestaurant,
    TooFewDishes,
    DishEmptyName,
    DishNameTooShort,
    DishNameTooLong,
    DishNameInvalid,
    DishNoValidIngredients,
}

impl RejectReason {
    /// Stable key used in the quality report
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingNameOrAddress => "missing_name_or_address",
            RejectReason::AddressNotMilan => "address_not_milan",
            RejectReason::DuplicateRestaurant => "duplicate_restaurant",
            RejectReason::TooFewDishes => "too_few_dishes",
            RejectReason::DishEmptyName => "dish_empty_name",
            RejectReason::DishNameTooShort => "dish_name_too_short",
            RejectReason::DishNameTooLong => "dish_name_too_long",
            RejectReason::DishNameInvalid => "dish_name_invalid",
            RejectReason::DishNoValidIngredients => "dish_no_valid_ingredients",
        }
    }

    /// Whether the reason applies to a dish rather than a restaurant
    pub fn is_dish_level(&self) -> bool {
        matches!(
            self,
            RejectReason::DishEmptyName
                | RejectReason::DishNameTooShort
                | RejectReason::DishNameTooLong
                | RejectReason::DishNameInvalid
                | RejectReason::DishNoValidIngredients
        )
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
