//! Leak probe binary
//!
//! Churns runtime resources and reports resident-memory samples. With no
//! arguments it reproduces the original diagnostic: 300 000 core
//! create/query/release iterations on `CPU`, sampled every 10 000.
//!
//! Run: `cargo run --bin leak_probe` or
//! `cargo run --bin leak_probe -- --model path/to/model.fpmc` for the
//! model-churn variant.

use clap::Parser;
use std::path::PathBuf;

use forgeprobe::logging;
use forgeprobe::probe::leak::{
    LeakProbe, LeakProbeConfig, LeakReport, LeakVariant, DEFAULT_CHECKPOINT_INTERVAL,
    DEFAULT_ITERATIONS, DEFAULT_MODEL_LOADS,
};

#[derive(Parser, Debug)]
#[command(name = "leak_probe", version)]
#[command(about = "Churn runtime resources and watch resident memory", long_about = None)]
struct Args {
    /// Core create/query/release iterations
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Iterations between memory samples
    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_INTERVAL)]
    checkpoint_interval: usize,

    /// Device name for the capability query
    #[arg(long, default_value = "CPU")]
    device: String,

    /// Churn model loads of this container instead of core handles
    #[arg(long)]
    model: Option<PathBuf>,

    /// Number of model loads (model-churn variant only)
    #[arg(long, default_value_t = DEFAULT_MODEL_LOADS)]
    loads: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    logging::init_logging_default();
    let args = Args::parse();

    let variant = match args.model {
        Some(model_path) => LeakVariant::ModelChurn {
            model_path,
            loads: args.loads,
        },
        None => LeakVariant::CoreChurn,
    };
    let config = LeakProbeConfig {
        iterations: args.iterations,
        checkpoint_interval: args.checkpoint_interval,
        device: args.device,
        variant,
    };

    let probe = LeakProbe::new(config)?;
    let report = probe.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &LeakReport) {
    println!("\n=== Leak Probe Report ({}) ===", report.variant);
    println!("Iterations:        {}", report.iterations);
    println!("Elapsed:           {:.2}s", report.elapsed.as_secs_f64());

    if report.samples.is_empty() {
        println!("Resident memory:   not observable on this platform");
    } else {
        println!("\n  Memory samples:");
        for sample in &report.samples {
            println!(
                "    iteration {:>9}: {:>9.1} MB",
                sample.iteration,
                sample.rss_kb as f64 / 1024.0
            );
        }
        println!(
            "\n  Growth:          {:+.1} KB per checkpoint",
            report.growth_kb_per_checkpoint()
        );
    }

    println!("\n  Live resources after run:");
    println!("    cores:  {}", report.ledger.live_cores());
    println!("    models: {}", report.ledger.live_models());
}
