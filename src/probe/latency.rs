//! Latency probe: one timed text-generation call
//!
//! The probe loads a pretrained causal-LM directory with latency-pinned
//! runtime options (hint `Latency`, one stream), compiles it for the target
//! device as an explicit separate step, binds a text-generation pipeline,
//! and issues exactly one request against a fixed prompt. The generation
//! call is bracketed by process-CPU-time readings; load and compile get
//! their own wall-clock durations so their costs stay attributable.
//!
//! No retries, no batching, no recovery: any failure terminates the run.

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::error::{ForgeProbeError, ProbeResult};
use crate::pipeline::{pipeline, GenerationOutput, DEFAULT_MAX_NEW_TOKENS, TEXT_GENERATION_TASK};
use crate::pretrained::{PretrainedModel, RuntimeOptions};
use crate::profiling::{format_seconds, CpuTimer};
use crate::tokenizer::TokenizerAdapter;

/// The fixed prompt of the original probe
pub const DEFAULT_PROMPT: &str = "def fib(n):";

/// Latency probe configuration
#[derive(Debug, Clone)]
pub struct LatencyProbeConfig {
    /// Pretrained model directory
    pub model_dir: PathBuf,
    /// Target device
    pub device: String,
    /// Prompt for the single generation request
    pub prompt: String,
    /// Tokens to generate
    pub max_new_tokens: usize,
    /// Runtime options applied at load
    pub options: RuntimeOptions,
    /// Allow model types the runtime does not know natively
    pub trust_remote_code: bool,
}

impl LatencyProbeConfig {
    /// Defaults matching the original probe: `"def fib(n):"` on `CPU` with
    /// latency-pinned options
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        LatencyProbeConfig {
            model_dir: model_dir.into(),
            device: "CPU".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            options: RuntimeOptions::latency(),
            trust_remote_code: true,
        }
    }
}

/// Result of a latency probe run
#[derive(Debug, Clone, Serialize)]
pub struct LatencyReport {
    /// Output of the single generation request
    pub output: GenerationOutput,
    /// Process CPU time consumed by the generation call
    pub cpu_time: Duration,
    /// Wall time of the generation call
    pub wall_time: Duration,
    /// Wall time to load the pretrained directory (compile deferred)
    pub load_time: Duration,
    /// Wall time of the explicit compile step
    pub compile_time: Duration,
}

impl LatencyReport {
    /// CPU duration in the probe's report format, e.g. `"0.42s"`
    pub fn formatted_cpu_time(&self) -> String {
        format_seconds(self.cpu_time)
    }
}

/// The latency probe harness
#[derive(Debug)]
pub struct LatencyProbe {
    config: LatencyProbeConfig,
}

impl LatencyProbe {
    /// Validate the configuration and build the probe
    pub fn new(config: LatencyProbeConfig) -> ProbeResult<Self> {
        if config.prompt.is_empty() {
            return Err(ForgeProbeError::InvalidProbeConfig(
                "prompt must not be empty".to_string(),
            ));
        }
        if config.max_new_tokens == 0 {
            return Err(ForgeProbeError::InvalidProbeConfig(
                "max_new_tokens must be > 0".to_string(),
            ));
        }
        config.options.validate()?;
        Ok(LatencyProbe { config })
    }

    /// Load, compile, and run the single timed generation
    ///
    /// Any missing file or bad configuration errors out of the load phase,
    /// before a timer ever brackets the generation call.
    pub fn run(&self) -> ProbeResult<LatencyReport> {
        let config = &self.config;

        let load_started = Instant::now();
        let mut model = PretrainedModel::from_pretrained(
            &config.model_dir,
            config.options,
            false,
            config.trust_remote_code,
            &config.device,
        )?;
        let load_time = load_started.elapsed();

        let compile_started = Instant::now();
        model.compile()?;
        let compile_time = compile_started.elapsed();

        let tokenizer = TokenizerAdapter::from_pretrained(&config.model_dir)?;
        let pipe = pipeline(TEXT_GENERATION_TASK, model, tokenizer)?
            .with_max_new_tokens(config.max_new_tokens);

        let wall_started = Instant::now();
        let cpu_timer = CpuTimer::start();
        let output = pipe.generate(&config.prompt)?;
        let cpu_time = cpu_timer.elapsed();
        let wall_time = wall_started.elapsed();

        let report = LatencyReport {
            output,
            cpu_time,
            wall_time,
            load_time,
            compile_time,
        };
        info!(
            device = %config.device,
            load_secs = report.load_time.as_secs_f64(),
            compile_secs = report.compile_time.as_secs_f64(),
            cpu_time = %report.formatted_cpu_time(),
            "latency probe finished"
        );
        Ok(report)
    }
}
