//! cardiorisk command line
//!
//! Reads a patient document (a JSON object) from stdin, prints rule
//! conclusions as they fire, then the fuzzy risk and model prediction when
//! available.

use std::io::Read;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use cardiorisk::{
    assess_with_sink, AssessmentConfig, CardioError, CardioResult, DecisionTreeModel,
    PatientRecord, RuleThresholds, StdoutSink,
};

/// Command line configuration
#[derive(Default)]
struct Config {
    /// Rule thresholds file
    thresholds: Option<PathBuf>,
    /// Decision tree model file
    model: Option<PathBuf>,
    /// Cycle limit for the rule engine
    max_cycles: Option<usize>,
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--thresholds" | "-t" => {
                if i + 1 < args.len() {
                    config.thresholds = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --thresholds requires a value");
                    std::process::exit(2);
                }
            }
            "--model" | "-m" => {
                if i + 1 < args.len() {
                    config.model = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --model requires a value");
                    std::process::exit(2);
                }
            }
            "--max-cycles" => {
                if i + 1 < args.len() {
                    let limit: usize = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("error: invalid cycle limit: {}", args[i + 1]);
                        std::process::exit(2);
                    });
                    config.max_cycles = Some(limit);
                    i += 2;
                } else {
                    eprintln!("error: --max-cycles requires a value");
                    std::process::exit(2);
                }
            }
            "--help" | "-h" => {
                println!("cardiorisk - Heart disease risk assessment");
                println!();
                println!("USAGE:");
                println!("    cardiorisk [OPTIONS] < patient.json");
                println!();
                println!("OPTIONS:");
                println!("    -t, --thresholds <FILE>   Rule thresholds (JSON)");
                println!("    -m, --model <FILE>        Decision tree model (JSON)");
                println!("        --max-cycles <N>      Abort inference after N firings");
                println!("    -h, --help                Print help information");
                println!();
                println!("Logging is controlled by RUST_LOG [default: warn].");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(2);
            }
        }
    }

    config
}

fn run(config: &Config) -> CardioResult<()> {
    let mut assessment_config = AssessmentConfig::default();
    if let Some(path) = &config.thresholds {
        let json = std::fs::read_to_string(path)?;
        assessment_config.thresholds = RuleThresholds::from_json_str(&json)?;
    }
    assessment_config.engine.max_cycles = config.max_cycles;

    let model = config
        .model
        .as_ref()
        .map(DecisionTreeModel::from_path)
        .transpose()?;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let document: serde_json::Value = serde_json::from_str(&input).map_err(|e| {
        CardioError::from(cardiorisk::ValidationError::invalid_fact(format!(
            "patient document is not valid JSON: {e}"
        )))
    })?;
    let record: PatientRecord = match document {
        serde_json::Value::Object(map) => map,
        _ => {
            return Err(cardiorisk::ValidationError::invalid_fact(
                "patient document must be a JSON object",
            )
            .into())
        }
    };

    let assessment = assess_with_sink(
        &record,
        &assessment_config,
        model.as_ref(),
        Some(Box::new(StdoutSink)),
    )?;

    if assessment.messages().is_empty() {
        println!("No risk factors detected by the rule engine.");
    }
    if let Some(fuzzy) = &assessment.fuzzy {
        println!("Heart Disease Risk Level: {} (score {:.2})", fuzzy.level, fuzzy.score);
    }
    if let Some(c) = &assessment.classification {
        if c.prediction.label == 1 {
            println!(
                "Prediction: likely to have heart disease (confidence {:.2}%)",
                c.combined_confidence
            );
        } else {
            println!(
                "Prediction: unlikely to have heart disease (confidence {:.2}%)",
                100.0 - c.combined_confidence
            );
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = parse_args();
    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        let code = if err.is_validation() { 2 } else { 1 };
        std::process::exit(code);
    }
}
