//! Static knowledge base about the eight Pima features.
//!
//! Every table here is a literal constant built once on first use and never
//! mutated. Lookups by raw string key never fail: unknown keys fall back to
//! the raw key (display name), an empty string (unit, description), `0.0`
//! (importance) or an empty/absent result (correlations, distributions).

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::records::Feature;

/// Range and step of the dashboard entry field for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl InputRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMeta {
    pub feature: Feature,
    pub display_name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
    pub importance: f64,
    pub threshold: f64,
    pub input: InputRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: Feature,
    pub importance: f64,
}

/// One row of the correlation heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationRow {
    pub feature: Feature,
    pub values: Vec<(&'static str, f64)>,
}

impl CorrelationRow {
    pub fn get(&self, other: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(key, _)| *key == other)
            .map(|&(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatistics {
    pub total_patients: usize,
    pub diabetes_prevalence: f64,
    pub average_age: f64,
    pub average_glucose: f64,
    #[serde(rename = "averageBMI")]
    pub average_bmi: f64,
}

/// Sample values for the diabetic and non-diabetic groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDistribution {
    pub feature: String,
    pub diabetic: Vec<f64>,
    pub non_diabetic: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub midpoint: f64,
    pub diabetic: usize,
    pub non_diabetic: usize,
}

pub const DEFAULT_BINS: usize = 10;

/// Upper bound on histogram bins; larger requests are clamped.
pub const MAX_BINS: usize = 1000;

/// Name of the outcome column in the correlation table.
pub const DIABETES_RISK: &str = "diabetesRisk";

impl FeatureDistribution {
    pub fn is_empty(&self) -> bool {
        self.diabetic.is_empty() && self.non_diabetic.is_empty()
    }

    /// Equal-width histogram over both groups.
    ///
    /// Bins are half-open `[start, start + width)`, so the overall maximum
    /// lands in no bin. At most [`MAX_BINS`] bins are produced.
    pub fn histogram(&self, bins: usize) -> Vec<HistogramBin> {
        if bins == 0 || self.is_empty() {
            return Vec::new();
        }
        let bins = bins.min(MAX_BINS);
        let all = self.diabetic.iter().chain(self.non_diabetic.iter());
        let min = all.clone().copied().fold(f64::INFINITY, f64::min);
        let max = all.copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (max - min) / bins as f64;

        (0..bins)
            .map(|i| {
                let start = min + i as f64 * width;
                let end = start + width;
                let count = |values: &[f64]| values.iter().filter(|&&v| v >= start && v < end).count();
                HistogramBin {
                    midpoint: (start + end) / 2.0,
                    diabetic: count(self.diabetic.as_slice()),
                    non_diabetic: count(self.non_diabetic.as_slice()),
                }
            })
            .collect()
    }
}

fn meta(
    feature: Feature,
    display_name: &'static str,
    unit: &'static str,
    importance: f64,
    threshold: f64,
    (min, max, step): (f64, f64, f64),
    description: &'static str,
) -> FeatureMeta {
    FeatureMeta {
        feature,
        display_name,
        unit,
        description,
        importance,
        threshold,
        input: InputRange { min, max, step },
    }
}

lazy_static! {
    static ref FEATURE_META: HashMap<Feature, FeatureMeta> = {
        let table = vec![
            meta(Feature::Pregnancies, "Pregnancies", "count", 0.06, 4.0, (0.0, 17.0, 1.0),
                "Number of pregnancies can affect long-term blood sugar regulation."),
            meta(Feature::Glucose, "Glucose", "mg/dL", 0.32, 140.0, (0.0, 200.0, 1.0),
                "Blood glucose levels are a direct indicator of how well your body processes sugar."),
            meta(Feature::BloodPressure, "Blood Pressure", "mmHg", 0.05, 90.0, (0.0, 150.0, 1.0),
                "Blood pressure correlates with cardiovascular health and diabetes risk."),
            meta(Feature::SkinThickness, "Skin Thickness", "mm", 0.04, 35.0, (0.0, 100.0, 1.0),
                "Skin fold thickness can be an indicator of body fat distribution."),
            meta(Feature::Insulin, "Insulin", "μU/mL", 0.09, 150.0, (0.0, 350.0, 1.0),
                "Insulin levels show how effectively your body is using insulin to process glucose."),
            meta(Feature::Bmi, "BMI", "kg/m²", 0.18, 30.0, (0.0, 70.0, 0.1),
                "Body Mass Index measures body fat based on height and weight. High BMI is linked to insulin resistance."),
            meta(Feature::DiabetesPedigree, "Diabetes Pedigree", "score", 0.11, 0.8, (0.0, 2.5, 0.01),
                "Family history function calculates diabetes risk based on family history."),
            meta(Feature::Age, "Age", "years", 0.15, 45.0, (0.0, 100.0, 1.0),
                "Age is a non-modifiable risk factor. Diabetes risk increases with age."),
        ];
        table.into_iter().map(|m| (m.feature, m)).collect()
    };

    static ref CORRELATIONS: Vec<CorrelationRow> = vec![
        CorrelationRow {
            feature: Feature::Glucose,
            values: vec![(DIABETES_RISK, 0.67), ("bmi", 0.22), ("age", 0.26)],
        },
        CorrelationRow {
            feature: Feature::Bmi,
            values: vec![(DIABETES_RISK, 0.31), ("glucose", 0.22), ("age", 0.04)],
        },
        CorrelationRow {
            feature: Feature::Age,
            values: vec![(DIABETES_RISK, 0.24), ("glucose", 0.26), ("bmi", 0.04)],
        },
        CorrelationRow {
            feature: Feature::Insulin,
            values: vec![(DIABETES_RISK, 0.28), ("glucose", 0.61), ("bmi", 0.19)],
        },
        CorrelationRow {
            feature: Feature::DiabetesPedigree,
            values: vec![(DIABETES_RISK, 0.20), ("age", 0.03), ("bmi", 0.14)],
        },
    ];

    static ref DISTRIBUTIONS: HashMap<Feature, ([f64; 10], [f64; 10])> = {
        let mut m = HashMap::new();
        m.insert(
            Feature::Glucose,
            (
                [140.0, 155.0, 165.0, 145.0, 180.0, 160.0, 170.0, 175.0, 195.0, 150.0],
                [85.0, 110.0, 90.0, 105.0, 100.0, 115.0, 95.0, 120.0, 125.0, 130.0],
            ),
        );
        m.insert(
            Feature::Bmi,
            (
                [32.0, 35.0, 31.0, 36.0, 29.0, 38.0, 33.0, 30.0, 34.0, 37.0],
                [22.0, 25.0, 26.0, 24.0, 21.0, 27.0, 23.0, 28.0, 20.0, 23.0],
            ),
        );
        m.insert(
            Feature::Age,
            (
                [55.0, 65.0, 45.0, 50.0, 60.0, 42.0, 58.0, 53.0, 48.0, 62.0],
                [25.0, 30.0, 22.0, 35.0, 28.0, 33.0, 26.0, 32.0, 24.0, 31.0],
            ),
        );
        m
    };
}

pub fn meta_for(feature: Feature) -> &'static FeatureMeta {
    // every variant is inserted above
    &FEATURE_META[&feature]
}

pub fn feature_meta(key: &str) -> Option<&'static FeatureMeta> {
    key.parse::<Feature>().ok().map(meta_for)
}

pub fn display_name(key: &str) -> String {
    feature_meta(key)
        .map(|m| m.display_name.to_string())
        .unwrap_or_else(|| key.to_string())
}

pub fn unit(key: &str) -> &'static str {
    feature_meta(key).map(|m| m.unit).unwrap_or("")
}

pub fn description(key: &str) -> &'static str {
    feature_meta(key).map(|m| m.description).unwrap_or("")
}

pub fn importance(key: &str) -> f64 {
    feature_meta(key).map(|m| m.importance).unwrap_or(0.0)
}

pub fn threshold(key: &str) -> Option<f64> {
    feature_meta(key).map(|m| m.threshold)
}

/// Importances, most important first.
pub fn feature_importances() -> Vec<FeatureImportance> {
    let mut importances: Vec<FeatureImportance> = Feature::ALL
        .iter()
        .map(|&feature| FeatureImportance {
            feature,
            importance: meta_for(feature).importance,
        })
        .collect();
    importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    importances
}

pub fn correlation_data() -> &'static [CorrelationRow] {
    &CORRELATIONS
}

pub fn correlations(key: &str) -> Option<&'static CorrelationRow> {
    CORRELATIONS.iter().find(|row| row.feature.key() == key)
}

pub fn correlation(feature: &str, other: &str) -> Option<f64> {
    correlations(feature).and_then(|row| row.get(other))
}

pub fn correlation_pairs() -> Vec<CorrelationPair> {
    CORRELATIONS
        .iter()
        .flat_map(|row| {
            row.values.iter().map(move |&(other, correlation)| CorrelationPair {
                feature1: row.feature.key().to_string(),
                feature2: other.to_string(),
                correlation,
            })
        })
        .collect()
}

pub fn feature_distribution(key: &str) -> FeatureDistribution {
    let samples = key
        .parse::<Feature>()
        .ok()
        .and_then(|feature| DISTRIBUTIONS.get(&feature));
    match samples {
        Some((diabetic, non_diabetic)) => FeatureDistribution {
            feature: key.to_string(),
            diabetic: diabetic.to_vec(),
            non_diabetic: non_diabetic.to_vec(),
        },
        None => FeatureDistribution {
            feature: key.to_string(),
            diabetic: Vec::new(),
            non_diabetic: Vec::new(),
        },
    }
}

pub fn dataset_statistics() -> DatasetStatistics {
    DatasetStatistics {
        total_patients: 768,
        diabetes_prevalence: 34.9,
        average_age: 33.2,
        average_glucose: 121.7,
        average_bmi: 32.5,
    }
}
