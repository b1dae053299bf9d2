//! HAAE command line
//!
//! Commands:
//! - fit: learn global weights from held-out base predictions
//! - blend: combine one sample's base predictions into an ensemble estimate

use anyhow::Context;
use clap::{Parser, Subcommand};
use hydration_ensemble::ml::serving::estimate;
use hydration_ensemble::ml::{
    Combiner, EnsembleConfig, EnsembleFitter, FitSample, PhysioRecord, WeightStore,
};
use hydration_ensemble::Settings;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "haae")]
#[command(about = "Hydration-aware adaptive ensemble: fit and apply ensemble weights")]
struct Cli {
    /// Settings file (TOML); falls back to $HAAE_CONFIG, then defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn global weights from held-out predictions
    Fit {
        /// JSON array of {predictions, record, truth}
        #[arg(short, long)]
        input: PathBuf,
        /// Weight store to write (overrides settings)
        #[arg(short, long)]
        weights: Option<PathBuf>,
        /// Metrics report to write (overrides settings)
        #[arg(short, long)]
        report: Option<PathBuf>,
        /// Gradient steps (overrides settings)
        #[arg(long)]
        steps: Option<usize>,
        /// Learning rate (overrides settings)
        #[arg(long)]
        learning_rate: Option<f64>,
    },
    /// Blend one sample's base predictions
    Blend {
        /// JSON object {predictions, record}
        #[arg(short, long)]
        input: PathBuf,
        /// Weight store to read (overrides settings)
        #[arg(short, long)]
        weights: Option<PathBuf>,
    },
}

/// Serving request: base predictions already computed for one sample
#[derive(Debug, Deserialize)]
struct BlendRequest {
    predictions: Vec<f64>,
    record: PhysioRecord,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

fn run_fit(
    mut settings: Settings,
    input: &Path,
    weights: Option<PathBuf>,
    report: Option<PathBuf>,
    steps: Option<usize>,
    learning_rate: Option<f64>,
) -> anyhow::Result<()> {
    if let Some(steps) = steps {
        settings.learner.steps = steps;
    }
    if let Some(lr) = learning_rate {
        settings.learner.learning_rate = lr;
    }
    settings.learner.validate()?;
    let weights_path = weights.unwrap_or(settings.weights_path);
    let report_path = report.or(settings.report_path);

    let samples: Vec<FitSample> = read_json(input)?;
    info!("Loaded {} fitting samples from {}", samples.len(), input.display());

    let fitter = EnsembleFitter::for_samples(&samples, settings.learner)?;
    let outcome = fitter.fit_and_save(&samples, &WeightStore::new(&weights_path))?;

    if let Some(path) = report_path {
        outcome.report.save(&path)?;
        info!("Wrote fit report to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&outcome.report.ensemble)?);
    Ok(())
}

fn run_blend(settings: Settings, input: &Path, weights: Option<PathBuf>) -> anyhow::Result<()> {
    let request: BlendRequest = read_json(input)?;
    let config = EnsembleConfig::from_model_count(request.predictions.len())?;

    let store = WeightStore::new(weights.unwrap_or(settings.weights_path));
    let loaded = store.load(config);
    if loaded.source.is_fallback() {
        warn!("Serving with uniform global weights");
    }

    let combiner = Combiner::new(config, loaded.weights)?;
    let drivers = request.record.drivers()?;
    let result = estimate(&combiner, &loaded.source, &request.predictions, drivers)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fit {
            input,
            weights,
            report,
            steps,
            learning_rate,
        } => run_fit(settings, &input, weights, report, steps, learning_rate),
        Commands::Blend { input, weights } => run_blend(settings, &input, weights),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_fit_parses() {
        let cli = Cli::parse_from([
            "haae", "fit",
            "--input", "held_out.json",
            "--weights", "w.json",
            "--steps", "80",
        ]);
        if let Commands::Fit { input, weights, report, steps, learning_rate } = cli.command {
            assert_eq!(input, PathBuf::from("held_out.json"));
            assert_eq!(weights, Some(PathBuf::from("w.json")));
            assert!(report.is_none());
            assert_eq!(steps, Some(80));
            assert!(learning_rate.is_none());
        } else {
            panic!("Expected Fit command");
        }
    }

    #[test]
    fn test_cli_blend_parses_with_global_config() {
        let cli = Cli::parse_from(["haae", "blend", "-i", "sample.json", "--config", "haae.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("haae.toml")));
        assert!(matches!(cli.command, Commands::Blend { .. }));
    }

    fn write_fit_input(dir: &Path) -> PathBuf {
        let samples: Vec<serde_json::Value> = (0..12)
            .map(|i| {
                let t = 1.0 + i as f64;
                serde_json::json!({
                    "predictions": [t + 0.5, t - 0.5, t],
                    "record": {"sweat_loss_L": 2.5, "water_intake_L": 1.0,
                               "calories_in": 2000, "bmr": 1500, "activity_calories": 700},
                    "truth": t
                })
            })
            .collect();
        let input = dir.join("held_out.json");
        std::fs::write(&input, serde_json::to_string(&samples).unwrap()).unwrap();
        input
    }

    #[test]
    fn test_fit_rejects_bad_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fit_input(dir.path());
        let weights = dir.path().join("w.json");

        let err = run_fit(Settings::default(), &input, Some(weights.clone()), None, Some(0), None)
            .unwrap_err();
        assert!(err.to_string().contains("learner.steps"));
        assert!(!weights.exists());

        for lr in [-1.0, 0.0, f64::NAN] {
            let err =
                run_fit(Settings::default(), &input, Some(weights.clone()), None, None, Some(lr))
                    .unwrap_err();
            assert!(err.to_string().contains("learner.learning_rate"));
            assert!(!weights.exists());
        }
    }

    #[test]
    fn test_fit_then_blend_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fit_input(dir.path());
        let weights = dir.path().join("w.json");
        let report = dir.path().join("report.json");

        run_fit(
            Settings::default(),
            &input,
            Some(weights.clone()),
            Some(report.clone()),
            None,
            None,
        )
        .unwrap();
        assert!(weights.exists());
        assert!(report.exists());

        let request = dir.path().join("sample.json");
        std::fs::write(
            &request,
            r#"{"predictions": [5.0, 8.0, 6.0],
                "record": {"sweat_loss_L": 3.0, "water_intake_L": 1.5,
                           "calories_in": 2450, "bmr": 1700, "activity_calories": 800}}"#,
        )
        .unwrap();
        run_blend(Settings::default(), &request, Some(weights)).unwrap();
    }
}
