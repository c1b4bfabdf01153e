//! Probe harnesses
//!
//! Two independent, non-interacting harnesses:
//!
//! - [`leak`] - churns runtime resources (core handles or model loads) and
//!   samples resident memory at checkpoints to surface unbounded growth.
//! - [`latency`] - loads one pretrained model, compiles it as an explicit
//!   separate step, and times a single text-generation call in process CPU
//!   time.
//!
//! Both run single-threaded and synchronously; every iteration's resources
//! are private to that iteration, and failures propagate out immediately.

pub mod latency;
pub mod leak;

pub use latency::{LatencyProbe, LatencyProbeConfig, LatencyReport, DEFAULT_PROMPT};
pub use leak::{
    LeakProbe, LeakProbeConfig, LeakReport, LeakVariant, MemorySample, DEFAULT_MODEL_LOADS,
};
