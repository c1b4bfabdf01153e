//! Profiling infrastructure for the probes
//!
//! - [`cpu_timer`] - process-CPU-time readings bracketing a timed call
//! - [`memory`] - resident-set sampling for the leak probe's checkpoints

pub mod cpu_timer;
pub mod memory;

pub use cpu_timer::{format_seconds, process_cpu_time, CpuTimer};
pub use memory::MemorySampler;
