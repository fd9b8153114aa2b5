use std::fmt;
use std::str::FromStr;

use polars::prelude::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};

use crate::error::{InsightsError, Result};

/// The eight Pima features, in record field order.
///
/// The order of [`Feature::ALL`] is the encounter order used when scanning a
/// record for risk factors, so ties in importance keep this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    Pregnancies,
    Glucose,
    BloodPressure,
    SkinThickness,
    Insulin,
    Bmi,
    DiabetesPedigree,
    Age,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Pregnancies,
        Feature::Glucose,
        Feature::BloodPressure,
        Feature::SkinThickness,
        Feature::Insulin,
        Feature::Bmi,
        Feature::DiabetesPedigree,
        Feature::Age,
    ];

    /// camelCase key used by the knowledge base lookups.
    pub fn key(&self) -> &'static str {
        match self {
            Feature::Pregnancies => "pregnancies",
            Feature::Glucose => "glucose",
            Feature::BloodPressure => "bloodPressure",
            Feature::SkinThickness => "skinThickness",
            Feature::Insulin => "insulin",
            Feature::Bmi => "bmi",
            Feature::DiabetesPedigree => "diabetesPedigree",
            Feature::Age => "age",
        }
    }

    /// Column header in the Pima Indians Diabetes CSV.
    pub fn column(&self) -> &'static str {
        match self {
            Feature::Pregnancies => "Pregnancies",
            Feature::Glucose => "Glucose",
            Feature::BloodPressure => "BloodPressure",
            Feature::SkinThickness => "SkinThickness",
            Feature::Insulin => "Insulin",
            Feature::Bmi => "BMI",
            Feature::DiabetesPedigree => "DiabetesPedigreeFunction",
            Feature::Age => "Age",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Feature {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.key() == s)
            .ok_or_else(|| InsightsError::UnknownFeature { key: s.to_string() })
    }
}

/// One patient profile as entered for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub pregnancies: f64,
    pub glucose: f64,
    pub blood_pressure: f64,
    pub skin_thickness: f64,
    pub insulin: f64,
    pub bmi: f64,
    pub diabetes_pedigree: f64,
    pub age: f64,
}

impl PatientRecord {
    /// Demo profile the dashboard loads on start and on reset.
    pub fn sample() -> Self {
        PatientRecord {
            pregnancies: 2.0,
            glucose: 140.0,
            blood_pressure: 80.0,
            skin_thickness: 30.0,
            insulin: 140.0,
            bmi: 32.0,
            diabetes_pedigree: 0.6,
            age: 45.0,
        }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Pregnancies => self.pregnancies,
            Feature::Glucose => self.glucose,
            Feature::BloodPressure => self.blood_pressure,
            Feature::SkinThickness => self.skin_thickness,
            Feature::Insulin => self.insulin,
            Feature::Bmi => self.bmi,
            Feature::DiabetesPedigree => self.diabetes_pedigree,
            Feature::Age => self.age,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::Pregnancies => &mut self.pregnancies,
            Feature::Glucose => &mut self.glucose,
            Feature::BloodPressure => &mut self.blood_pressure,
            Feature::SkinThickness => &mut self.skin_thickness,
            Feature::Insulin => &mut self.insulin,
            Feature::Bmi => &mut self.bmi,
            Feature::DiabetesPedigree => &mut self.diabetes_pedigree,
            Feature::Age => &mut self.age,
        };
        *slot = value;
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    /// (feature, value) pairs in field order.
    pub fn values(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |&feature| (feature, self.get(feature)))
    }

    /// Rejects NaN and infinite fields. The scorer itself accepts them.
    pub fn validate(&self) -> Result<()> {
        match self.values().find(|(_, value)| !value.is_finite()) {
            Some((feature, value)) => Err(InsightsError::NonFiniteFeature { feature, value }),
            None => Ok(()),
        }
    }
}

/// A row of the Pima Indians Diabetes CSV, with the optional label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PimaRow {
    #[serde(rename = "Pregnancies")]
    pub pregnancies: f64,
    #[serde(rename = "Glucose")]
    pub glucose: f64,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: f64,
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: f64,
    #[serde(rename = "Insulin")]
    pub insulin: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree: f64,
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Outcome", default)]
    pub outcome: Option<i32>,
}

impl PimaRow {
    pub fn patient(&self) -> PatientRecord {
        PatientRecord {
            pregnancies: self.pregnancies,
            glucose: self.glucose,
            blood_pressure: self.blood_pressure,
            skin_thickness: self.skin_thickness,
            insulin: self.insulin,
            bmi: self.bmi,
            diabetes_pedigree: self.diabetes_pedigree,
            age: self.age,
        }
    }

    /// polars schema for reading the raw CSV.
    pub fn raw_schema() -> Schema {
        Schema::from_iter(
            Feature::ALL
                .iter()
                .map(|feature| Field::new(feature.column(), DataType::Float64))
                .chain(std::iter::once(Field::new("Outcome", DataType::Int32))),
        )
    }
}
