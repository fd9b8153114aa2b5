use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use log::{debug, info, LevelFilter};
use serde::Serialize;
use sysinfo::{get_current_pid, ProcessExt, System, SystemExt};

use pima_insights::knowledge::{self, DEFAULT_BINS, DIABETES_RISK, MAX_BINS};
use pima_insights::pipeline::{self, WriteFormat};
use pima_insights::{score, Feature, InsightsError, PatientRecord, PredictionResult};

static DEFAULT_BATCH_OUTPUT: &str = "data/output/predictions.csv";

#[derive(Parser, Debug)]
#[command(author, version, about = "Diabetes risk insights for Pima patient profiles", long_about = None)]
#[command(propagate_version = true)]
struct InsightsArgs {
    #[arg(short, long, action = ArgAction::Count, global = true, help = "Verbose level")]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one patient profile
    Score(ScoreArgs),
    /// Print the demo patient profile as JSON
    Sample,
    /// List feature names, units, importances and thresholds
    Features,
    /// Print the correlation table
    Correlations {
        #[arg(long, help = "Print flattened pairs as JSON")]
        json: bool,
    },
    /// Histogram of the diabetic and non-diabetic samples for a feature
    Distribution {
        feature: String,
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_BINS,
            value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_BINS as u64)
        )]
        bins: usize,
    },
    /// Dataset statistics, baked in or computed from a file
    Stats {
        #[arg(short, long, help = "Pima CSV or scored parquet/CSV file")]
        input: Option<PathBuf>,
    },
    /// Score every row of a Pima CSV
    Batch {
        #[arg(short, long, help = "Input path")]
        input: PathBuf,
        #[arg(short, long, default_value = DEFAULT_BATCH_OUTPUT, help = "Output path")]
        output: PathBuf,
        #[arg(short, long, value_enum, help = "Output format, inferred from the extension by default")]
        format: Option<WriteFormat>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    #[arg(long, help = "Start from a JSON patient record instead of the demo profile")]
    json: Option<PathBuf>,
    #[arg(long)]
    pregnancies: Option<f64>,
    #[arg(long)]
    glucose: Option<f64>,
    #[arg(long)]
    blood_pressure: Option<f64>,
    #[arg(long)]
    skin_thickness: Option<f64>,
    #[arg(long)]
    insulin: Option<f64>,
    #[arg(long)]
    bmi: Option<f64>,
    #[arg(long)]
    diabetes_pedigree: Option<f64>,
    #[arg(long)]
    age: Option<f64>,
    #[arg(long, value_enum, default_value_t = Output::Text)]
    output: Output,
}

impl ScoreArgs {
    fn overrides(&self) -> [(Feature, Option<f64>); 8] {
        [
            (Feature::Pregnancies, self.pregnancies),
            (Feature::Glucose, self.glucose),
            (Feature::BloodPressure, self.blood_pressure),
            (Feature::SkinThickness, self.skin_thickness),
            (Feature::Insulin, self.insulin),
            (Feature::Bmi, self.bmi),
            (Feature::DiabetesPedigree, self.diabetes_pedigree),
            (Feature::Age, self.age),
        ]
    }

    fn patient(&self) -> Result<PatientRecord, InsightsError> {
        let mut patient = match &self.json {
            Some(path) => serde_json::from_reader(File::open(path)?)?,
            None => PatientRecord::sample(),
        };
        for (feature, value) in self.overrides() {
            if let Some(value) = value {
                patient.set(feature, value);
            }
        }
        patient.validate()?;
        Ok(patient)
    }
}

#[derive(Serialize)]
struct ScoreReport<'a> {
    patient: &'a PatientRecord,
    #[serde(flatten)]
    result: &'a PredictionResult,
    risk_level: String,
}

fn monitor_memory() -> u64 {
    let mut system = System::new();
    match get_current_pid() {
        Ok(pid) => {
            system.refresh_process(pid);
            system.process(pid).map(|p| p.memory()).unwrap_or(0)
        }
        Err(_) => 0,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), InsightsError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_prediction(patient: &PatientRecord, result: &PredictionResult) {
    println!(
        "{} ({}%), predicted {}",
        result.risk_level(),
        result.percentage(),
        if result.prediction { "diabetic" } else { "non-diabetic" }
    );
    println!("probability: {:.4}", result.probability);
    for (feature, value) in patient.values() {
        debug!("{} = {}", feature, value);
    }
    if result.risk_factors.is_empty() {
        println!("No significant risk factors identified.");
        return;
    }
    println!("Risk factors:");
    for factor in &result.risk_factors {
        let key = factor.name.key();
        println!(
            "  {:<18} {} {} (threshold {}, importance {:.0}%)",
            knowledge::display_name(key),
            factor.value,
            knowledge::unit(key),
            factor.threshold,
            factor.importance * 100.0
        );
        println!("    {}", factor.description);
    }
}

fn print_features() {
    println!(
        "{:<18} {:<7} {:>10} {:>9}  description",
        "feature", "unit", "importance", "threshold"
    );
    for importance in knowledge::feature_importances() {
        let meta = knowledge::meta_for(importance.feature);
        println!(
            "{:<18} {:<7} {:>10.2} {:>9}  {}",
            meta.display_name, meta.unit, meta.importance, meta.threshold, meta.description
        );
    }
}

fn print_correlations() {
    let columns = [DIABETES_RISK, "glucose", "bmi"];
    print!("{:<18}", "");
    for column in columns {
        let header = if column == DIABETES_RISK {
            "Diabetes Risk".to_string()
        } else {
            knowledge::display_name(column)
        };
        print!(" {:>13}", header);
    }
    println!();
    for row in knowledge::correlation_data() {
        print!("{:<18}", knowledge::display_name(row.feature.key()));
        for column in columns {
            match row.get(column) {
                Some(value) => print!(" {:>13.2}", value),
                None => print!(" {:>13}", "N/A"),
            }
        }
        println!();
    }
}

fn print_distribution(feature: &str, bins: usize) {
    let distribution = knowledge::feature_distribution(feature);
    if distribution.is_empty() {
        println!("no samples for {}", knowledge::display_name(feature));
        return;
    }
    let unit = knowledge::unit(feature);
    println!(
        "{:>12} {:>8} {:>12}",
        format!("{} ({})", knowledge::display_name(feature), unit),
        "diabetic",
        "non-diabetic"
    );
    for bin in distribution.histogram(bins) {
        println!("{:>12.1} {:>8} {:>12}", bin.midpoint, bin.diabetic, bin.non_diabetic);
    }
}

async fn insights(cli: InsightsArgs) -> Result<(), InsightsError> {
    match cli.command {
        Command::Score(args) => {
            let patient = args.patient()?;
            pipeline::warn_out_of_range(&patient);
            let result = score(&patient);
            match args.output {
                Output::Text => print_prediction(&patient, &result),
                Output::Json => print_json(&ScoreReport {
                    patient: &patient,
                    result: &result,
                    risk_level: result.risk_level().to_string(),
                })?,
            }
        }
        Command::Sample => print_json(&PatientRecord::sample())?,
        Command::Features => print_features(),
        Command::Correlations { json } => {
            if json {
                print_json(&knowledge::correlation_pairs())?
            } else {
                print_correlations()
            }
        }
        Command::Distribution { feature, bins } => print_distribution(&feature, bins),
        Command::Stats { input } => {
            let stats = match input {
                Some(path) => pipeline::dataset_statistics_from_file(&path).await?,
                None => knowledge::dataset_statistics(),
            };
            print_json(&stats)?
        }
        Command::Batch {
            input,
            output,
            format,
        } => {
            let start_time = Instant::now();
            let start_memory = monitor_memory();

            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let summary = pipeline::run_batch(&input, &output, format).await?;

            let end_memory = monitor_memory();
            info!("Time elapsed in batch scoring: {:?}", start_time.elapsed());
            info!("Memory used: {} bytes", end_memory.saturating_sub(start_memory));
            print_json(&summary)?
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), InsightsError> {
    let cli = InsightsArgs::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let env = Env::new().filter("PIMA_LOG");
    Builder::new()
        .filter(Some("pima_insights"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", cli);

    insights(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        InsightsArgs::command().debug_assert();
    }

    #[test]
    fn score_flags_override_the_demo_profile() {
        let cli = InsightsArgs::parse_from(["pima-insights", "score", "--glucose", "180", "--age", "50"]);
        let Command::Score(args) = cli.command else {
            panic!("expected score");
        };
        let patient = args.patient().unwrap();
        assert_eq!(patient.glucose, 180.0);
        assert_eq!(patient.age, 50.0);
        assert_eq!(patient.bmi, PatientRecord::sample().bmi);
    }

    #[test]
    fn distribution_bins_are_bounded() {
        let cli = InsightsArgs::parse_from(["pima-insights", "distribution", "glucose"]);
        assert!(matches!(cli.command, Command::Distribution { bins: DEFAULT_BINS, .. }));

        let max = MAX_BINS.to_string();
        assert!(InsightsArgs::try_parse_from(["pima-insights", "distribution", "glucose", "--bins", max.as_str()]).is_ok());
        for bins in ["0", "1001", "18446744073709551615"] {
            assert!(
                InsightsArgs::try_parse_from(["pima-insights", "distribution", "glucose", "--bins", bins]).is_err(),
                "--bins {bins}"
            );
        }
    }

    #[test]
    fn non_finite_flags_are_rejected() {
        let cli = InsightsArgs::parse_from(["pima-insights", "score", "--bmi", "NaN"]);
        let Command::Score(args) = cli.command else {
            panic!("expected score");
        };
        assert!(matches!(
            args.patient(),
            Err(InsightsError::NonFiniteFeature { feature: Feature::Bmi, .. })
        ));
    }
}
