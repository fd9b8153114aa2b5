use std::fs;

use pima_insights::pipeline::{self, WriteFormat};
use pima_insights::InsightsError;

const PIMA_SAMPLE: &str = "\
Pregnancies,Glucose,BloodPressure,SkinThickness,Insulin,BMI,DiabetesPedigreeFunction,Age,Outcome
6,148,72,35,0,33.6,0.627,50,1
1,85,66,29,0,26.6,0.351,31,0
8,183,64,0,0,23.3,0.672,32,1
1,89,66,23,94,28.1,0.167,21,0
0,137,40,35,168,43.1,2.288,33,1
";

#[tokio::test]
async fn batch_writes_csv_and_evaluates_labels() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("diabetes.csv");
    let output = dir.path().join("scores.csv");
    fs::write(&input, PIMA_SAMPLE).unwrap();

    let summary = pipeline::run_batch(&input, &output, None).await.unwrap();
    assert_eq!(summary.scored, 5);
    assert_eq!(summary.skipped, 0);
    let evaluation = summary.evaluation.expect("labelled input");
    assert_eq!(evaluation.samples, 5);
    assert_eq!(
        evaluation.true_positives + evaluation.false_positives
            + evaluation.true_negatives + evaluation.false_negatives,
        5
    );

    let written = fs::read_to_string(&output).unwrap();
    let header = written.lines().next().unwrap();
    assert!(header.contains("probability"));
    assert!(header.contains("risk_factors"));
    assert_eq!(written.lines().count(), 6);
}

#[tokio::test]
async fn batch_parquet_round_trips_into_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("diabetes.csv");
    let output = dir.path().join("scores.parquet");
    fs::write(&input, PIMA_SAMPLE).unwrap();

    pipeline::run_batch(&input, &output, Some(WriteFormat::Parquet))
        .await
        .unwrap();
    let df = pipeline::read_parquet(&output).await.unwrap();
    assert_eq!(df.height(), 5);

    let stats = pipeline::dataset_statistics_from_file(&output).await.unwrap();
    assert_eq!(stats.total_patients, 5);
    assert_eq!(stats.diabetes_prevalence, 60.0);
    assert_eq!(stats.average_age, 33.4);
}

#[tokio::test]
async fn statistics_from_raw_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("diabetes.csv");
    fs::write(&input, PIMA_SAMPLE).unwrap();

    let stats = pipeline::dataset_statistics_from_file(&input).await.unwrap();
    assert_eq!(stats.total_patients, 5);
    assert_eq!(stats.average_glucose, 128.4);
    assert_eq!(stats.average_bmi, 30.9);
}

#[tokio::test]
async fn statistics_of_unlabelled_output_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("unlabelled.csv");
    let output = dir.path().join("scores.parquet");
    fs::write(
        &input,
        "Pregnancies,Glucose,BloodPressure,SkinThickness,Insulin,BMI,DiabetesPedigreeFunction,Age\n\
         1,89,66,23,94,28.1,0.167,21\n",
    )
    .unwrap();
    pipeline::run_batch(&input, &output, None).await.unwrap();

    let err = pipeline::dataset_statistics_from_file(&output)
        .await
        .unwrap_err();
    match err {
        InsightsError::Unlabelled { path } => assert_eq!(path, output),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn non_finite_rows_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dirty.csv");
    let output = dir.path().join("scores.csv");
    fs::write(
        &input,
        "Pregnancies,Glucose,BloodPressure,SkinThickness,Insulin,BMI,DiabetesPedigreeFunction,Age\n\
         1,NaN,66,29,0,26.6,0.351,31\n\
         1,89,66,23,94,28.1,0.167,21\n",
    )
    .unwrap();

    let summary = pipeline::run_batch(&input, &output, None).await.unwrap();
    assert_eq!(summary.scored, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.evaluation.is_none());
}

#[tokio::test]
async fn unknown_output_extension_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("diabetes.csv");
    fs::write(&input, PIMA_SAMPLE).unwrap();

    let err = pipeline::run_batch(&input, &dir.path().join("scores.txt"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, InsightsError::OutputFormat { .. }));
}

#[tokio::test]
async fn header_only_input_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.csv");
    fs::write(&input, PIMA_SAMPLE.lines().next().unwrap()).unwrap();

    let err = pipeline::read_patients(&input).await.unwrap_err();
    assert!(matches!(err, InsightsError::EmptyInput { .. }));
}
