//! Leak probe integration tests
//!
//! Everything here is `#[serial]`: the assertions compare process-global
//! ledger counts and resident-memory samples before and after a run, so no
//! other test may create or drop runtime resources concurrently.

mod common;

use forgeprobe::probe::leak::{LeakProbe, LeakProbeConfig, LeakVariant};
use forgeprobe::profiling::MemorySampler;
use forgeprobe::runtime::ResourceLedger;

use common::{serial, write_model_container};

fn small_core_churn(iterations: usize, checkpoint_interval: usize) -> LeakProbeConfig {
    LeakProbeConfig {
        iterations,
        checkpoint_interval,
        device: "CPU".to_string(),
        variant: LeakVariant::CoreChurn,
    }
}

/// Resource count returns to baseline after every iteration: the live count
/// after a run equals the live count before it.
#[test]
#[serial]
fn core_churn_returns_resources_to_baseline() -> anyhow::Result<()> {
    let before = ResourceLedger::snapshot();

    let probe = LeakProbe::new(small_core_churn(200, 50))?;
    let report = probe.run()?;

    let after = ResourceLedger::snapshot();
    assert_eq!(after.live_cores(), before.live_cores());
    assert_eq!(after.live_models(), before.live_models());

    // Every iteration created exactly one core and released it.
    assert_eq!(after.cores_created - before.cores_created, 200);
    assert_eq!(after.cores_released - before.cores_released, 200);
    assert_eq!(report.iterations, 200);
    Ok(())
}

#[test]
#[serial]
fn core_churn_samples_at_every_checkpoint() -> anyhow::Result<()> {
    let probe = LeakProbe::new(small_core_churn(200, 50))?;
    let report = probe.run()?;

    if MemorySampler::rss_kb().is_some() {
        // Pre-loop sample plus one per checkpoint (50, 100, 150, 200).
        assert_eq!(report.samples.len(), 5);
        assert_eq!(report.samples[0].iteration, 0);
        assert_eq!(report.samples[4].iteration, 200);
        assert!(report.baseline_rss_kb.is_some());
        assert!(report.final_rss_kb.is_some());
    } else {
        assert!(report.samples.is_empty());
        assert!(report.baseline_rss_kb.is_none());
    }
    Ok(())
}

/// Steady-state growth over a short churn should be near zero; the tolerance
/// is generous because RSS is noisy at this scale.
#[test]
#[serial]
fn core_churn_memory_stays_bounded() -> anyhow::Result<()> {
    let probe = LeakProbe::new(small_core_churn(2_000, 500))?;
    let report = probe.run()?;

    if report.samples.len() >= 2 {
        assert!(
            report.is_bounded(2_048.0),
            "memory grew {} KB per checkpoint",
            report.growth_kb_per_checkpoint()
        );
    }
    Ok(())
}

#[test]
#[serial]
fn model_churn_returns_resources_to_baseline() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let model_path = temp.path().join("classification.fpmc");
    write_model_container(&model_path)?;

    let before = ResourceLedger::snapshot();
    let probe = LeakProbe::new(LeakProbeConfig {
        iterations: 1,
        checkpoint_interval: 100,
        device: "CPU".to_string(),
        variant: LeakVariant::ModelChurn {
            model_path,
            loads: 300,
        },
    })?;
    let report = probe.run()?;

    let after = ResourceLedger::snapshot();
    assert_eq!(report.variant, "model-churn");
    assert_eq!(report.iterations, 300);
    assert_eq!(after.models_created - before.models_created, 300);
    assert_eq!(after.models_released - before.models_released, 300);
    assert_eq!(after.live_models(), before.live_models());
    // The variant holds exactly one core for the whole run.
    assert_eq!(after.cores_created - before.cores_created, 1);
    assert_eq!(after.live_cores(), before.live_cores());
    Ok(())
}

/// A bad container path must fail at probe construction, before any loop
/// work starts.
#[test]
#[serial]
fn model_churn_rejects_missing_container_up_front() {
    let result = LeakProbe::new(LeakProbeConfig {
        iterations: 1,
        checkpoint_interval: 100,
        device: "CPU".to_string(),
        variant: LeakVariant::ModelChurn {
            model_path: "/nonexistent/classification.fpmc".into(),
            loads: 300,
        },
    });
    assert!(result.is_err());
}

#[test]
#[serial]
fn unknown_device_fails_on_first_iteration() -> anyhow::Result<()> {
    let before = ResourceLedger::snapshot();
    let probe = LeakProbe::new(LeakProbeConfig {
        iterations: 10,
        checkpoint_interval: 5,
        device: "TPU".to_string(),
        variant: LeakVariant::CoreChurn,
    })?;
    assert!(probe.run().is_err());

    // The failing iteration's core must still have been released.
    let after = ResourceLedger::snapshot();
    assert_eq!(after.live_cores(), before.live_cores());
    Ok(())
}

#[test]
#[serial]
fn report_serializes_to_json() -> anyhow::Result<()> {
    let probe = LeakProbe::new(small_core_churn(50, 25))?;
    let report = probe.run()?;

    let json = serde_json::to_string(&report)?;
    assert!(json.contains("\"variant\":\"core-churn\""));
    assert!(json.contains("\"ledger\""));
    Ok(())
}
