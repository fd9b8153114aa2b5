//! Diabetes risk insights over the Pima Indians Diabetes features.
//!
//! [`scorer::score`] evaluates a fixed-coefficient logistic regression for a
//! [`PatientRecord`] and flags the features above their clinical thresholds.
//! [`knowledge`] holds the static tables the dashboard renders, and
//! [`pipeline`] scores whole CSV files with polars.

pub mod error;
pub mod knowledge;
pub mod pipeline;
pub mod records;
pub mod scorer;

pub use error::{InsightsError, Result};
pub use records::{Feature, PatientRecord, PimaRow};
pub use scorer::{score, PredictionResult, RiskFactor, RiskLevel};
