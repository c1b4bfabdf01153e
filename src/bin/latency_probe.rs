//! Latency probe binary
//!
//! Loads one pretrained causal-LM directory with latency-pinned runtime
//! options, compiles it, and times a single text-generation call. With no
//! arguments it reproduces the original diagnostic: prompt `"def fib(n):"`
//! on `CPU`, printing the generated text and the CPU duration as `N.NNs`.
//!
//! Run: `cargo run --bin latency_probe -- --model-dir path/to/model`

use clap::Parser;
use std::path::PathBuf;

use forgeprobe::logging;
use forgeprobe::probe::latency::{LatencyProbe, LatencyProbeConfig, DEFAULT_PROMPT};
use forgeprobe::pipeline::DEFAULT_MAX_NEW_TOKENS;

#[derive(Parser, Debug)]
#[command(name = "latency_probe", version)]
#[command(about = "Time a single text-generation call", long_about = None)]
struct Args {
    /// Pretrained model directory (config.json, model.fpmc, tokenizer.json)
    #[arg(long, default_value = "models/codegen-350M-mono")]
    model_dir: PathBuf,

    /// Target device
    #[arg(long, default_value = "CPU")]
    device: String,

    /// Prompt for the single generation request
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Tokens to generate
    #[arg(long, default_value_t = DEFAULT_MAX_NEW_TOKENS)]
    max_new_tokens: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    logging::init_logging_default();
    let args = Args::parse();

    let mut config = LatencyProbeConfig::new(args.model_dir);
    config.device = args.device;
    config.prompt = args.prompt;
    config.max_new_tokens = args.max_new_tokens;

    let probe = LatencyProbe::new(config)?;
    let report = probe.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        // Same two lines the original printed: output, then duration.
        println!("{}", report.output.generated_text);
        println!("{}", report.formatted_cpu_time());
    }
    Ok(())
}
