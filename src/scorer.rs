//! Fixed-coefficient logistic regression over the eight Pima features.
//!
//! `score` is total: any input, including zero, negative and non-finite
//! values, produces a result. Non-finite values yield a NaN (or saturated)
//! probability; reject them upstream with [`PatientRecord::validate`].

use std::fmt;

use num::Float;
use serde::{Deserialize, Serialize};

use crate::knowledge;
use crate::records::{Feature, PatientRecord};

pub const INTERCEPT: f64 = -8.4;

/// Probability at or above which a patient is classified as diabetic.
pub const DECISION_THRESHOLD: f64 = 0.5;

pub fn coefficient(feature: Feature) -> f64 {
    match feature {
        Feature::Pregnancies => 0.12,
        Feature::Glucose => 0.04,
        Feature::BloodPressure => 0.02,
        Feature::SkinThickness => 0.001,
        Feature::Insulin => 0.0001,
        Feature::Bmi => 0.09,
        Feature::DiabetesPedigree => 1.8,
        Feature::Age => 0.04,
    }
}

pub fn sigmoid<T: Float>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

/// Log-odds, accumulated from the intercept in field order.
pub fn logit(patient: &PatientRecord) -> f64 {
    patient
        .values()
        .fold(INTERCEPT, |acc, (feature, value)| acc + coefficient(feature) * value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: Feature,
    pub value: f64,
    pub importance: f64,
    pub threshold: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Banding on the rounded percentage: below 30 low, below 70 moderate.
    pub fn from_probability(probability: f64) -> Self {
        let percentage = (probability * 100.0).round();
        if percentage >= 70.0 {
            RiskLevel::High
        } else if percentage >= 30.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low Risk"),
            RiskLevel::Moderate => write!(f, "Moderate Risk"),
            RiskLevel::High => write!(f, "High Risk"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub probability: f64,
    pub prediction: bool,
    pub risk_factors: Vec<RiskFactor>,
}

impl PredictionResult {
    pub fn percentage(&self) -> f64 {
        (self.probability * 100.0).round()
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_probability(self.probability)
    }
}

/// Features whose value is strictly above their threshold, most important
/// first. Equal importances keep field order.
pub fn risk_factors(patient: &PatientRecord) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = patient
        .values()
        .filter_map(|(feature, value)| {
            let meta = knowledge::meta_for(feature);
            (value > meta.threshold).then(|| RiskFactor {
                name: feature,
                value,
                importance: knowledge::importance(feature.key()),
                threshold: meta.threshold,
                description: meta.description.to_string(),
            })
        })
        .collect();
    sort_by_importance(&mut factors);
    factors
}

/// Descending importance; equal importances keep their current order.
pub fn sort_by_importance(factors: &mut [RiskFactor]) {
    factors.sort_by(|a, b| b.importance.total_cmp(&a.importance));
}

pub fn score(patient: &PatientRecord) -> PredictionResult {
    let probability = sigmoid(logit(patient));
    PredictionResult {
        probability,
        prediction: probability >= DECISION_THRESHOLD,
        risk_factors: risk_factors(patient),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_patient_scores_high_with_bmi_only() {
        let patient = PatientRecord::sample();
        assert!((logit(&patient) - 4.844).abs() < 1e-9);

        let result = score(&patient);
        assert!((result.probability - 0.992_186).abs() < 1e-6);
        assert!(result.prediction);
        assert_eq!(result.risk_level(), RiskLevel::High);
        assert_eq!(result.percentage(), 99.0);

        let names: Vec<Feature> = result.risk_factors.iter().map(|f| f.name).collect();
        assert_eq!(names, vec![Feature::Bmi]);
        let bmi = &result.risk_factors[0];
        assert_eq!(bmi.value, 32.0);
        assert_eq!(bmi.threshold, 30.0);
        assert_eq!(bmi.importance, 0.18);
    }

    #[test]
    fn all_zero_patient() {
        let result = score(&PatientRecord::default());
        assert!((result.probability - 0.000_224_817).abs() < 1e-8);
        assert!(!result.prediction);
        assert!(result.risk_factors.is_empty());
        assert_eq!(result.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn threshold_equality_does_not_trigger() {
        let patient = PatientRecord::default()
            .with(Feature::Glucose, 140.0)
            .with(Feature::DiabetesPedigree, 0.8);
        assert!(risk_factors(&patient).is_empty());
        let patient = patient.with(Feature::Glucose, 140.000_001);
        assert_eq!(risk_factors(&patient).len(), 1);
    }

    #[test]
    fn every_feature_over_threshold_sorts_by_importance() {
        let patient = PatientRecord {
            pregnancies: 5.0,
            glucose: 200.0,
            blood_pressure: 100.0,
            skin_thickness: 40.0,
            insulin: 200.0,
            bmi: 40.0,
            diabetes_pedigree: 1.0,
            age: 60.0,
        };
        let names: Vec<&str> = risk_factors(&patient).iter().map(|f| f.name.key()).collect();
        assert_eq!(
            names,
            vec![
                "glucose",
                "bmi",
                "age",
                "diabetesPedigree",
                "insulin",
                "pregnancies",
                "bloodPressure",
                "skinThickness"
            ]
        );
    }

    #[test]
    fn equal_importances_keep_field_order() {
        let factor = |name: Feature, importance: f64| RiskFactor {
            name,
            value: 1.0,
            importance,
            threshold: 0.0,
            description: String::new(),
        };
        let mut factors = vec![
            factor(Feature::Pregnancies, 0.1),
            factor(Feature::Insulin, 0.3),
            factor(Feature::Glucose, 0.1),
            factor(Feature::Age, 0.3),
            factor(Feature::BloodPressure, 0.1),
        ];
        sort_by_importance(&mut factors);
        let names: Vec<Feature> = factors.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                Feature::Insulin,
                Feature::Age,
                Feature::Pregnancies,
                Feature::Glucose,
                Feature::BloodPressure
            ]
        );
    }

    #[test]
    fn nan_propagates_without_panicking() {
        let result = score(&PatientRecord::sample().with(Feature::Glucose, f64::NAN));
        assert!(result.probability.is_nan());
        assert!(!result.prediction);
    }

    #[test]
    fn risk_bands_use_rounded_percentage() {
        assert_eq!(RiskLevel::from_probability(0.29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.2951), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.6949), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.6951), RiskLevel::High);
        assert_eq!(RiskLevel::High.to_string(), "High Risk");
    }

    #[test]
    fn sigmoid_is_generic() {
        assert_eq!(sigmoid(0.0_f32), 0.5);
        assert_eq!(sigmoid(0.0_f64), 0.5);
    }
}
