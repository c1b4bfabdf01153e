//! forgeprobe - leak and latency probes for an inference runtime
//!
//! Two independent diagnostic harnesses around a minimal in-process
//! inference runtime:
//!
//! - the **leak probe** churns runtime resources (core handles, model loads)
//!   and samples resident memory at checkpoints to surface unbounded growth;
//! - the **latency probe** loads one pretrained causal-LM directory, compiles
//!   it for a device as an explicit separate step, and times a single
//!   text-generation call in process CPU time.
//!
//! Both ship as binaries (`leak_probe`, `latency_probe`) whose argumentless
//! invocations reproduce the original diagnostic scripts.

pub mod error;
pub mod logging;
pub mod pipeline;
pub mod pretrained;
pub mod probe;
pub mod profiling;
pub mod runtime;
pub mod tokenizer;

pub use error::{ErrorCategory, ForgeProbeError, ProbeResult};
pub use pipeline::{pipeline, GenerationOutput, TextGenerationPipeline};
pub use pretrained::{PerformanceHint, PretrainedModel, RuntimeOptions};
pub use probe::{
    LatencyProbe, LatencyProbeConfig, LatencyReport, LeakProbe, LeakProbeConfig, LeakReport,
    LeakVariant,
};
pub use profiling::{CpuTimer, MemorySampler};
pub use runtime::{Core, LedgerSnapshot, ModelArtifact, ResourceLedger};
pub use tokenizer::TokenizerAdapter;
