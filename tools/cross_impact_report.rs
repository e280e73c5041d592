//! Cross-Impact Report Tool
//!
//! Runs the full pipeline on a snapshot CSV and writes coefficient tables,
//! the aligned panel and run metadata to an output directory.
//!
//! # Output Format
//!
//! - `coefficients.csv` - One row per (horizon, target, source)
//! - `scatter.csv` - Self-impact vs. summed cross-impact per (horizon, symbol)
//! - `integrated_ofi.npy` / `returns.npy` - Shape `[grid_len, n_symbols]`, NaN where missing
//! - `timestamps.npy` - Grid timestamps (ns)
//! - `metadata.json` - Config, PCA diagnostics, fit status
//!
//! # Usage
//!
//! ```bash
//! # Defaults (5 levels, horizons 0/1/5)
//! cargo run --release --bin cross_impact_report -- snapshots.csv out/
//!
//! # From TOML config
//! cargo run --release --bin cross_impact_report -- --config run.toml snapshots.csv out/
//!
//! # Generate sample config
//! cargo run --release --bin cross_impact_report -- --generate-config run.toml
//! ```
//!
//! Set `RUST_LOG=debug` for per-instrument detail.

use cross_impact::{
    CrossImpactModel, CrossImpactPipeline, ExperimentMetadata, FitOutcome, PipelineBuilder,
    PipelineConfig, ResultExporter,
};
use std::time::Instant;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--config" => {
            if args.len() < 5 {
                eprintln!("Error: --config requires <config.toml> <input.csv> <output_dir>");
                std::process::exit(1);
            }
            let config = match PipelineConfig::load_toml(&args[2]) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Failed to load config: {e}");
                    std::process::exit(1);
                }
            };
            run(config, &args[3], &args[4]);
        }
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--help" | "-h" => {
            print_usage(&args[0]);
        }
        input if !input.starts_with("--") => {
            if args.len() < 3 {
                eprintln!("Error: missing <output_dir>");
                print_usage(&args[0]);
                std::process::exit(1);
            }
            run(PipelineConfig::default(), input, &args[2]);
        }
        _ => {
            eprintln!("Unknown argument: {}", args[1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Cross-Impact Report Tool

Usage:
    {program} <input.csv> <output_dir>                      Run with default config
    {program} --config <path.toml> <input.csv> <output_dir> Run with config file
    {program} --generate-config <path.toml>                 Generate sample config file
    {program} --help                                        Show this help

Input CSV columns:
    symbol, ts_event, bid_px_00..bid_px_NN, ask_px_00.., bid_sz_00.., ask_sz_00..
"#
    );
}

fn generate_sample_config(path: &str) {
    let mut metadata = ExperimentMetadata::new("cross_impact_1s");
    metadata.description = Some("One-second clock, lags up to five seconds".to_string());
    metadata.tags = Some(vec!["ofi".to_string(), "lasso".to_string()]);

    let config = PipelineBuilder::new()
        .levels(5)
        .resample_ns(1_000_000_000)
        .horizons(&[0, 1, 5])
        .with_metadata(metadata)
        .build_config();

    match config.and_then(|c| c.save_toml(path)) {
        Ok(()) => {
            println!("Generated sample config: {path}");
            println!("\nFields worth editing:");
            println!("  - levels: book depth present in the input");
            println!("  - horizons: lags in grid steps");
            println!("  - resample_interval_ns: grid spacing (0 for raw timestamps)");
            println!("  - regression.alpha_grid: automatic or explicit penalties");
        }
        Err(e) => {
            eprintln!("Error generating config: {e}");
            std::process::exit(1);
        }
    }
}

fn run(config: PipelineConfig, input: &str, output_dir: &str) {
    let start = Instant::now();

    let pipeline = match CrossImpactPipeline::from_config(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Configuration validation failed: {e}");
            std::process::exit(1);
        }
    };
    log::info!(
        "Config: levels={}, horizons={:?}, resample={:?}",
        pipeline.config().levels,
        pipeline.config().horizons,
        pipeline.config().resample_interval_ns
    );

    let output = match pipeline.process_path(input) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Pipeline failed on {input}: {e}");
            std::process::exit(1);
        }
    };

    for (symbol, reason) in output.undefined_instruments() {
        log::warn!("{symbol}: {reason}");
    }

    let summary = match ResultExporter::new(output_dir).export(&output, pipeline.config()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Export failed: {e}");
            std::process::exit(1);
        }
    };

    print_model(&output.model);

    println!();
    println!("Output:       {}", summary.output_dir.display());
    println!("Grid length:  {}", summary.grid_len);
    println!("Coefficients: {}", summary.coefficient_rows);
    println!("Scatter rows: {}", summary.scatter_rows);
    println!("Elapsed:      {:.2}s", start.elapsed().as_secs_f64());
}

fn print_model(model: &CrossImpactModel) {
    for horizon in model.horizons() {
        let Some(matrix) = model.matrix(horizon) else {
            continue;
        };
        println!();
        println!("Horizon {horizon}");
        for outcome in matrix.outcomes.values() {
            match outcome {
                FitOutcome::Fitted(fit) => println!(
                    "  {:<10} alpha={:.3e} r2={} self={:+.4e} cross={:+.4e} n={}",
                    fit.target,
                    fit.alpha,
                    fit.r_squared
                        .map_or_else(|| "n/a".to_string(), |r| format!("{r:.4}")),
                    fit.self_impact(),
                    fit.cross_impact(),
                    fit.n_rows,
                ),
                FitOutcome::Skipped { target, reason, .. } => {
                    println!("  {target:<10} skipped: {reason}")
                }
            }
        }
    }
}
