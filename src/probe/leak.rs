//! Leak probe: repeatedly acquire and release runtime resources
//!
//! The default variant creates a fresh runtime core every iteration, performs
//! one read-only capability query against it, and lets the handle drop at
//! scope exit. The secondary variant holds one core and loads the same model
//! container over and over, dropping each artifact immediately.
//!
//! The probe is deliberately slow: every iteration does real initialization
//! or I/O work, because that is the path whose release behavior is under
//! test. It carries no internal pass/fail signal; it emits a [`LeakReport`]
//! of resident-memory samples and ledger counts, and interpreting growth is
//! the caller's job.

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{ForgeProbeError, ProbeResult};
use crate::profiling::MemorySampler;
use crate::runtime::{Core, LedgerSnapshot, ResourceLedger};

/// Iterations of the default core-churn variant, matching the original probe
pub const DEFAULT_ITERATIONS: usize = 300_000;

/// Checkpoint spacing for memory samples
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10_000;

/// Loads performed by the model-churn variant
pub const DEFAULT_MODEL_LOADS: usize = 10_000;

/// Which resource the probe churns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeakVariant {
    /// Fresh core per iteration, one capability query, drop at scope exit
    CoreChurn,
    /// One long-lived core, repeated model loads dropped per iteration
    ModelChurn {
        /// Container file to load repeatedly
        model_path: PathBuf,
        /// Number of loads
        loads: usize,
    },
}

impl Default for LeakVariant {
    fn default() -> Self {
        LeakVariant::CoreChurn
    }
}

impl LeakVariant {
    fn name(&self) -> &'static str {
        match self {
            LeakVariant::CoreChurn => "core-churn",
            LeakVariant::ModelChurn { .. } => "model-churn",
        }
    }
}

/// Leak probe configuration
#[derive(Debug, Clone)]
pub struct LeakProbeConfig {
    /// Iterations of the core-churn loop
    pub iterations: usize,
    /// Iterations between memory samples
    pub checkpoint_interval: usize,
    /// Device name for the capability query
    pub device: String,
    /// Resource to churn
    pub variant: LeakVariant,
}

impl Default for LeakProbeConfig {
    fn default() -> Self {
        LeakProbeConfig {
            iterations: DEFAULT_ITERATIONS,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            device: "CPU".to_string(),
            variant: LeakVariant::default(),
        }
    }
}

/// One resident-memory observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySample {
    /// Iteration the sample was taken at (0 = before the loop)
    pub iteration: usize,
    /// Resident set size in kilobytes
    pub rss_kb: u64,
}

/// Result of a leak probe run
#[derive(Debug, Clone, Serialize)]
pub struct LeakReport {
    /// Variant that ran
    pub variant: String,
    /// Iterations completed
    pub iterations: usize,
    /// Memory samples taken at checkpoints (empty where RSS is unobservable)
    pub samples: Vec<MemorySample>,
    /// First post-warm-up sample, the baseline growth is judged against
    pub baseline_rss_kb: Option<u64>,
    /// Last sample taken
    pub final_rss_kb: Option<u64>,
    /// Resource counters after the run
    pub ledger: LedgerSnapshot,
    /// Wall time the run took
    pub elapsed: Duration,
}

impl LeakReport {
    /// Least-squares slope of resident memory across checkpoints, in
    /// kilobytes per checkpoint interval
    ///
    /// The pre-loop sample is excluded so allocator warm-up does not count
    /// as growth. Returns 0.0 with fewer than two checkpoint samples.
    pub fn growth_kb_per_checkpoint(&self) -> f64 {
        let points: Vec<(f64, f64)> = self
            .samples
            .iter()
            .filter(|sample| sample.iteration > 0)
            .enumerate()
            .map(|(idx, sample)| (idx as f64, sample.rss_kb as f64))
            .collect();
        if points.len() < 2 {
            return 0.0;
        }

        let n = points.len() as f64;
        let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
        let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
        let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
        let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

        let denom = n * sum_xx - sum_x * sum_x;
        if denom == 0.0 {
            return 0.0;
        }
        (n * sum_xy - sum_x * sum_y) / denom
    }

    /// Whether steady-state growth stays within `tolerance_kb` per checkpoint
    pub fn is_bounded(&self, tolerance_kb: f64) -> bool {
        self.growth_kb_per_checkpoint() <= tolerance_kb
    }
}

/// The leak probe harness
#[derive(Debug)]
pub struct LeakProbe {
    config: LeakProbeConfig,
}

impl LeakProbe {
    /// Validate the configuration and build the probe
    ///
    /// The model-churn variant's container path is checked here so a bad
    /// path fails before any loop work starts.
    pub fn new(config: LeakProbeConfig) -> ProbeResult<Self> {
        if config.iterations == 0 {
            return Err(ForgeProbeError::InvalidProbeConfig(
                "iterations must be > 0".to_string(),
            ));
        }
        if config.checkpoint_interval == 0 {
            return Err(ForgeProbeError::InvalidProbeConfig(
                "checkpoint_interval must be > 0".to_string(),
            ));
        }
        if let LeakVariant::ModelChurn { model_path, loads } = &config.variant {
            if *loads == 0 {
                return Err(ForgeProbeError::InvalidProbeConfig(
                    "loads must be > 0".to_string(),
                ));
            }
            if !model_path.is_file() {
                return Err(ForgeProbeError::ModelLoadFailed(format!(
                    "model file not found: {}",
                    model_path.display()
                )));
            }
        }
        Ok(LeakProbe { config })
    }

    /// Run the configured churn loop to completion
    pub fn run(&self) -> ProbeResult<LeakReport> {
        let started = Instant::now();
        let mut sampler = CheckpointSampler::new(self.config.checkpoint_interval);
        sampler.sample(0);

        let iterations = match &self.config.variant {
            LeakVariant::CoreChurn => {
                self.run_core_churn(&mut sampler)?;
                self.config.iterations
            }
            LeakVariant::ModelChurn { model_path, loads } => {
                self.run_model_churn(model_path, *loads, &mut sampler)?;
                *loads
            }
        };

        let report = LeakReport {
            variant: self.config.variant.name().to_string(),
            iterations,
            baseline_rss_kb: sampler.baseline(),
            final_rss_kb: sampler.last(),
            samples: sampler.into_samples(),
            ledger: ResourceLedger::snapshot(),
            elapsed: started.elapsed(),
        };
        info!(
            variant = %report.variant,
            iterations = report.iterations,
            growth_kb_per_checkpoint = report.growth_kb_per_checkpoint(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            "leak probe finished"
        );
        Ok(report)
    }

    fn run_core_churn(&self, sampler: &mut CheckpointSampler) -> ProbeResult<()> {
        for iteration in 1..=self.config.iterations {
            let core = Core::new()?;
            let versions = core.query_versions(&self.config.device)?;
            debug_assert!(!versions.is_empty());
            sampler.checkpoint(iteration);
            // `core` drops here; release at iteration scope exit is the
            // property under observation.
        }
        Ok(())
    }

    fn run_model_churn(
        &self,
        model_path: &std::path::Path,
        loads: usize,
        sampler: &mut CheckpointSampler,
    ) -> ProbeResult<()> {
        let core = Core::new()?;
        for iteration in 1..=loads {
            let _artifact = core.read_model(model_path)?;
            sampler.checkpoint(iteration);
            // `_artifact` drops here, unlike the original loop which abandoned
            // every load to the collector.
        }
        Ok(())
    }
}

/// Collects RSS samples at checkpoint iterations
struct CheckpointSampler {
    interval: usize,
    samples: Vec<MemorySample>,
}

impl CheckpointSampler {
    fn new(interval: usize) -> Self {
        CheckpointSampler {
            interval,
            samples: Vec::new(),
        }
    }

    fn checkpoint(&mut self, iteration: usize) {
        if iteration % self.interval == 0 {
            self.sample(iteration);
        }
    }

    fn sample(&mut self, iteration: usize) {
        if let Some(rss_kb) = MemorySampler::rss_kb() {
            debug!(iteration, rss_kb, "leak probe checkpoint");
            self.samples.push(MemorySample { iteration, rss_kb });
        }
    }

    /// First sample taken at a real checkpoint (iteration > 0)
    fn baseline(&self) -> Option<u64> {
        self.samples
            .iter()
            .find(|sample| sample.iteration > 0)
            .map(|sample| sample.rss_kb)
    }

    fn last(&self) -> Option<u64> {
        self.samples.last().map(|sample| sample.rss_kb)
    }

    fn into_samples(self) -> Vec<MemorySample> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with_samples(samples: Vec<MemorySample>) -> LeakReport {
        LeakReport {
            variant: "core-churn".to_string(),
            iterations: 100,
            samples,
            baseline_rss_kb: None,
            final_rss_kb: None,
            ledger: ResourceLedger::snapshot(),
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn flat_memory_has_zero_growth() {
        let report = report_with_samples(vec![
            MemorySample { iteration: 0, rss_kb: 9_000 },
            MemorySample { iteration: 10, rss_kb: 10_000 },
            MemorySample { iteration: 20, rss_kb: 10_000 },
            MemorySample { iteration: 30, rss_kb: 10_000 },
        ]);
        assert_eq!(report.growth_kb_per_checkpoint(), 0.0);
        assert!(report.is_bounded(1.0));
    }

    #[test]
    fn warm_up_sample_does_not_count_as_growth() {
        // Big jump from pre-loop to first checkpoint, flat afterwards.
        let report = report_with_samples(vec![
            MemorySample { iteration: 0, rss_kb: 1_000 },
            MemorySample { iteration: 10, rss_kb: 50_000 },
            MemorySample { iteration: 20, rss_kb: 50_000 },
        ]);
        assert_eq!(report.growth_kb_per_checkpoint(), 0.0);
    }

    #[test]
    fn steady_growth_is_detected() {
        let report = report_with_samples(vec![
            MemorySample { iteration: 10, rss_kb: 10_000 },
            MemorySample { iteration: 20, rss_kb: 11_000 },
            MemorySample { iteration: 30, rss_kb: 12_000 },
            MemorySample { iteration: 40, rss_kb: 13_000 },
        ]);
        let growth = report.growth_kb_per_checkpoint();
        assert!((growth - 1_000.0).abs() < 1.0);
        assert!(!report.is_bounded(100.0));
    }

    #[test]
    fn too_few_samples_report_zero_growth() {
        let report = report_with_samples(vec![MemorySample { iteration: 10, rss_kb: 10_000 }]);
        assert_eq!(report.growth_kb_per_checkpoint(), 0.0);
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let config = LeakProbeConfig {
            iterations: 0,
            ..LeakProbeConfig::default()
        };
        let err = LeakProbe::new(config).unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn zero_checkpoint_interval_is_rejected() {
        let config = LeakProbeConfig {
            checkpoint_interval: 0,
            ..LeakProbeConfig::default()
        };
        assert!(LeakProbe::new(config).is_err());
    }

    #[test]
    fn defaults_mirror_the_original_script() {
        let config = LeakProbeConfig::default();
        assert_eq!(config.iterations, 300_000);
        assert_eq!(config.checkpoint_interval, 10_000);
        assert_eq!(config.device, "CPU");
        assert_eq!(config.variant, LeakVariant::CoreChurn);
    }
}
