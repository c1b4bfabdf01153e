//! Pretrained causal-LM loading with deferred device compilation
//!
//! Mirrors the optimized-runtime loading flow: a pretrained directory holds
//! `config.json`, a model container, and a tokenizer definition. Loading and
//! compilation are separate steps so their costs are attributable separately;
//! [`PretrainedModel::compile`] must run before the model can serve a
//! generation pipeline.
//!
//! The compiled model's next-token function is a deterministic placeholder
//! seeded from the container's tensor table. The real execution engine is an
//! external concern; the probes only need a generation call that does
//! bounded, repeatable work.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ForgeProbeError, ProbeResult};
use crate::runtime::{Core, ModelArtifact};

/// File name of the model container inside a pretrained directory
pub const MODEL_CONTAINER_FILE: &str = "model.fpmc";

/// File name of the model configuration inside a pretrained directory
pub const MODEL_CONFIG_FILE: &str = "config.json";

/// Model types the runtime knows natively; anything else needs
/// `trust_remote_code`
const BUILTIN_MODEL_TYPES: &[&str] = &["causal-lm", "codegen", "gpt2", "llama"];

/// Fallback vocabulary size when `config.json` does not carry one
const DEFAULT_VOCAB_SIZE: u32 = 256;

/// Execution preference for the target device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PerformanceHint {
    /// Optimize for single-request latency
    #[default]
    Latency,
    /// Optimize for aggregate throughput
    Throughput,
}

/// Runtime options recognized at model load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Latency/throughput preference
    pub performance_hint: PerformanceHint,
    /// Number of parallel inference streams
    pub num_streams: u32,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self::latency()
    }
}

impl RuntimeOptions {
    /// Single-threaded, latency-optimized execution: hint `Latency`, one stream
    pub fn latency() -> Self {
        RuntimeOptions {
            performance_hint: PerformanceHint::Latency,
            num_streams: 1,
        }
    }

    /// Validate the option combination
    ///
    /// The latency hint pins execution to a single stream; zero streams is
    /// never valid.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.num_streams == 0 {
            return Err(ForgeProbeError::InvalidConfiguration(
                "num_streams must be at least 1".to_string(),
            ));
        }
        if self.performance_hint == PerformanceHint::Latency && self.num_streams != 1 {
            return Err(ForgeProbeError::InvalidConfiguration(format!(
                "latency hint requires a single stream, got {}",
                self.num_streams
            )));
        }
        Ok(())
    }
}

/// Subset of `config.json` the runtime cares about
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Architecture family, e.g. "codegen"
    pub model_type: String,
    /// Vocabulary size, when the config carries one
    #[serde(default)]
    pub vocab_size: Option<u32>,
}

/// A pretrained model bound to a device, compiled on demand
#[derive(Debug)]
pub struct PretrainedModel {
    #[allow(dead_code)]
    core: Core,
    config: ModelConfig,
    artifact: ModelArtifact,
    options: RuntimeOptions,
    device: String,
    compiled: Option<CompiledModel>,
}

impl PretrainedModel {
    /// Load a pretrained model directory
    ///
    /// Reads `config.json` and the model container, verifies the target
    /// device exists, and optionally compiles immediately. With
    /// `compile = false` the expensive device compilation is deferred until
    /// [`compile`](Self::compile) is called, so load and compile time can be
    /// measured separately.
    ///
    /// Fails fast: a missing directory, missing or malformed config, missing
    /// container, or unknown device is an immediate error.
    pub fn from_pretrained(
        dir: impl AsRef<Path>,
        options: RuntimeOptions,
        compile: bool,
        trust_remote_code: bool,
        device: &str,
    ) -> ProbeResult<Self> {
        options.validate()?;

        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ForgeProbeError::ModelLoadFailed(format!(
                "pretrained directory not found: {}",
                dir.display()
            )));
        }

        let config = read_model_config(dir)?;
        if !trust_remote_code
            && !BUILTIN_MODEL_TYPES.contains(&config.model_type.as_str())
        {
            return Err(ForgeProbeError::InvalidConfiguration(format!(
                "model type '{}' requires trust_remote_code",
                config.model_type
            )));
        }

        let core = Core::new()?;
        // Unknown devices must fail here, not at compile time.
        core.query_versions(device)?;

        let artifact = core.read_model(dir.join(MODEL_CONTAINER_FILE))?;
        debug!(
            model_type = %config.model_type,
            tensors = artifact.tensor_count(),
            device,
            "pretrained model loaded"
        );

        let mut model = PretrainedModel {
            core,
            config,
            artifact,
            options,
            device: device.to_string(),
            compiled: None,
        };
        if compile {
            model.compile()?;
        }
        Ok(model)
    }

    /// Compile the model for its target device
    ///
    /// Explicit and separately timeable; idempotent.
    pub fn compile(&mut self) -> ProbeResult<()> {
        if self.compiled.is_some() {
            debug!("model already compiled, skipping");
            return Ok(());
        }

        let vocab_size = self
            .config
            .vocab_size
            .unwrap_or(DEFAULT_VOCAB_SIZE)
            .max(1);
        self.compiled = Some(CompiledModel {
            seed: self.artifact.fingerprint(),
            vocab_size,
        });
        info!(
            device = %self.device,
            hint = ?self.options.performance_hint,
            streams = self.options.num_streams,
            "model compiled"
        );
        Ok(())
    }

    /// Whether [`compile`](Self::compile) has run
    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Access the compiled form, erroring if compilation has not run
    pub fn compiled(&self) -> ProbeResult<&CompiledModel> {
        self.compiled
            .as_ref()
            .ok_or(ForgeProbeError::ModelNotCompiled)
    }

    /// Target device name
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Options the model was loaded with
    pub fn options(&self) -> RuntimeOptions {
        self.options
    }

    /// Parsed model configuration
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

fn read_model_config(dir: &Path) -> ProbeResult<ModelConfig> {
    let path = dir.join(MODEL_CONFIG_FILE);
    if !path.is_file() {
        return Err(ForgeProbeError::MissingPretrainedFile(format!(
            "{}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(&path)?;
    serde_json::from_str(&raw).map_err(|err| {
        ForgeProbeError::InvalidConfiguration(format!(
            "{}: {}",
            path.display(),
            err
        ))
    })
}

/// Device-compiled form of a pretrained model
///
/// Generation is greedy and deterministic: each next token is a pure function
/// of the container fingerprint, the previous token, and the step index.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    seed: u64,
    vocab_size: u32,
}

impl CompiledModel {
    /// Vocabulary size the model emits tokens in
    pub fn vocab_size(&self) -> u32 {
        self.vocab_size
    }

    /// Greedy next-token function
    pub fn next_token(&self, prev: u32, step: usize) -> u32 {
        let mut x = self.seed
            ^ (prev as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (step as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x ^= x >> 30;
        x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x ^= x >> 27;
        x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
        x ^= x >> 31;
        (x % self.vocab_size as u64) as u32
    }

    /// Autoregressively extend `prompt_ids` by `max_new_tokens` tokens
    pub fn generate(&self, prompt_ids: &[u32], max_new_tokens: usize) -> Vec<u32> {
        let mut prev = prompt_ids.last().copied().unwrap_or(self.seed as u32);
        let mut output = Vec::with_capacity(max_new_tokens);
        for step in 0..max_new_tokens {
            let next = self.next_token(prev, step);
            output.push(next);
            prev = next;
        }
        output
    }
}
