use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::records::Feature;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("unknown feature {key:?}")]
    UnknownFeature { key: String },
    #[error("feature {feature} is not a finite number ({value})")]
    NonFiniteFeature { feature: Feature, value: f64 },
    #[error("invalid output format for {path:?}")]
    OutputFormat { path: PathBuf },
    #[error("no patient records in {path:?}")]
    EmptyInput { path: PathBuf },
    #[error("missing column {column:?}")]
    MissingColumn { column: String },
    #[error("column {column:?} has no non-null values")]
    EmptyColumn { column: String },
    #[error("{path:?} has no Outcome labels; statistics need a labelled dataset")]
    Unlabelled { path: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, InsightsError>;
