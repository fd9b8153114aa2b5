use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use log::{debug, info, warn};
use polars::prelude::*;
use polars_io::parquet::{ParquetReader, ParquetWriter};
use serde::Serialize;
use smartcore::metrics::accuracy;

use crate::error::{InsightsError, Result};
use crate::knowledge::{self, DatasetStatistics};
use crate::records::{Feature, PatientRecord, PimaRow};
use crate::scorer::{self, PredictionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteFormat {
    Csv,
    Parquet,
}

impl WriteFormat {
    pub fn infer<P: AsRef<Path>>(path: P) -> Option<WriteFormat> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(WriteFormat::Csv),
            "parquet" | "pq" => Some(WriteFormat::Parquet),
            _ => None,
        }
    }
}

/// Reads labelled or unlabelled Pima rows. The `Outcome` column is optional.
pub async fn read_patients<P: AsRef<Path>>(path: P) -> Result<Vec<PimaRow>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<PimaRow>, csv::Error>>()?;
    if rows.is_empty() {
        return Err(InsightsError::EmptyInput {
            path: path.as_ref().to_path_buf(),
        });
    }
    debug!("read {} rows from {:?}", rows.len(), path.as_ref());
    Ok(rows)
}

pub async fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;

    Ok(CsvReader::new(file)
        .has_header(true)
        .with_dtypes(Some(Arc::new(PimaRow::raw_schema())))
        .finish()?)
}

pub async fn read_parquet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;

    Ok(ParquetReader::new(file).finish()?)
}

pub async fn write_csv<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub async fn write_parquet<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

const OUTCOME: &str = "Outcome";

fn column_mean(df: &DataFrame, column: &str) -> Result<f64> {
    if !df.get_column_names().contains(&column) {
        return Err(InsightsError::MissingColumn {
            column: column.to_string(),
        });
    }
    let series = df.column(column)?.cast(&DataType::Float64)?;
    series.mean().ok_or_else(|| InsightsError::EmptyColumn {
        column: column.to_string(),
    })
}

/// Aggregate statistics of a real dataset, rounded like the baked constants.
pub fn dataset_statistics(df: &DataFrame) -> Result<DatasetStatistics> {
    Ok(DatasetStatistics {
        total_patients: df.height(),
        diabetes_prevalence: one_decimal(column_mean(df, OUTCOME)? * 100.0),
        average_age: one_decimal(column_mean(df, Feature::Age.column())?),
        average_glucose: one_decimal(column_mean(df, Feature::Glucose.column())?),
        average_bmi: one_decimal(column_mean(df, Feature::Bmi.column())?),
    })
}

/// Statistics of a labelled Pima CSV or of a scored parquet/CSV output
/// produced from labelled input. Prevalence needs the `Outcome` column.
pub async fn dataset_statistics_from_file<P: AsRef<Path>>(path: P) -> Result<DatasetStatistics> {
    let df = match WriteFormat::infer(&path) {
        Some(WriteFormat::Parquet) => read_parquet(&path).await?,
        _ => read_csv(&path).await?,
    };
    if !df.get_column_names().contains(&OUTCOME) {
        return Err(InsightsError::Unlabelled {
            path: path.as_ref().to_path_buf(),
        });
    }
    debug!("computing statistics over {} rows", df.height());
    dataset_statistics(&df)
}

/// Input columns followed by the prediction for each row.
pub fn score_frame(rows: &[PimaRow], results: &[PredictionResult]) -> Result<DataFrame> {
    let mut columns: Vec<Series> = Feature::ALL
        .iter()
        .map(|&feature| {
            let values: Vec<f64> = rows.iter().map(|row| row.patient().get(feature)).collect();
            Series::new(feature.column(), values)
        })
        .collect();

    let probability: Vec<f64> = results.iter().map(|r| r.probability).collect();
    let prediction: Vec<bool> = results.iter().map(|r| r.prediction).collect();
    let risk_level: Vec<String> = results.iter().map(|r| r.risk_level().to_string()).collect();
    let risk_factors: Vec<String> = results
        .iter()
        .map(|r| {
            r.risk_factors
                .iter()
                .map(|f| f.name.key())
                .collect::<Vec<_>>()
                .join(";")
        })
        .collect();

    columns.push(Series::new("probability", probability));
    columns.push(Series::new("prediction", prediction));
    columns.push(Series::new("risk_level", risk_level));
    columns.push(Series::new("risk_factors", risk_factors));

    if rows.iter().any(|row| row.outcome.is_some()) {
        let outcome: Vec<Option<i32>> = rows.iter().map(|row| row.outcome).collect();
        columns.push(Series::new(OUTCOME, outcome));
    }

    Ok(DataFrame::new(columns)?)
}

/// How the fixed model fares against labelled rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub samples: usize,
    pub accuracy: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

/// `None` when no row carries an `Outcome` label.
pub fn evaluate(rows: &[PimaRow], results: &[PredictionResult]) -> Option<Evaluation> {
    let (y_true, y_pred): (Vec<i32>, Vec<i32>) = rows
        .iter()
        .zip(results)
        .filter_map(|(row, result)| row.outcome.map(|label| (label, i32::from(result.prediction))))
        .unzip();
    if y_true.is_empty() {
        return None;
    }

    let count = |truth: i32, predicted: i32| {
        y_true
            .iter()
            .zip(&y_pred)
            .filter(|&(&t, &p)| (t != 0) == (truth != 0) && p == predicted)
            .count()
    };

    Some(Evaluation {
        samples: y_true.len(),
        accuracy: accuracy(&y_true, &y_pred),
        true_positives: count(1, 1),
        false_positives: count(0, 1),
        true_negatives: count(0, 0),
        false_negatives: count(1, 0),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub output: PathBuf,
    pub scored: usize,
    pub skipped: usize,
    pub positives: usize,
    pub evaluation: Option<Evaluation>,
}

/// Scores every finite row of `input` and writes the predictions to `output`.
pub async fn run_batch(
    input: &Path,
    output: &Path,
    format: Option<WriteFormat>,
) -> Result<BatchSummary> {
    let format = format
        .or_else(|| WriteFormat::infer(output))
        .ok_or_else(|| InsightsError::OutputFormat {
            path: output.to_path_buf(),
        })?;

    let all_rows = read_patients(input).await?;
    let total = all_rows.len();
    let rows: Vec<PimaRow> = all_rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match row.patient().validate() {
            Ok(()) => Some(row),
            Err(e) => {
                warn!("skipping row {}: {}", index + 1, e);
                None
            }
        })
        .collect();

    let results: Vec<PredictionResult> = rows.iter().map(|row| scorer::score(&row.patient())).collect();
    let mut df = score_frame(&rows, &results)?;
    debug!("{}", df.head(Some(5)));

    match format {
        WriteFormat::Csv => write_csv(output, &mut df).await?,
        WriteFormat::Parquet => write_parquet(output, &mut df).await?,
    }
    info!("wrote {} predictions to {:?}", df.height(), output);

    let evaluation = evaluate(&rows, &results);
    if let Some(eval) = &evaluation {
        info!(
            "accuracy against {} labelled rows: {:.3}",
            eval.samples, eval.accuracy
        );
    }

    Ok(BatchSummary {
        output: output.to_path_buf(),
        scored: rows.len(),
        skipped: total - rows.len(),
        positives: results.iter().filter(|r| r.prediction).count(),
        evaluation,
    })
}

/// Warns about values outside the dashboard entry ranges. They are still scored.
pub fn warn_out_of_range(patient: &PatientRecord) {
    for (feature, value) in patient.values() {
        let meta = knowledge::meta_for(feature);
        if !meta.input.contains(value) {
            warn!(
                "{} = {} is outside the usual range {}..={} {}",
                meta.display_name, value, meta.input.min, meta.input.max, meta.unit
            );
        }
    }
}
