//! Process CPU time measurement
//!
//! The latency probe brackets its single generation call with two
//! process-CPU-time readings (user + system), so the reported duration
//! excludes time the process spent off-CPU. On Unix the reading comes from
//! `getrusage(RUSAGE_SELF)`; elsewhere it degrades to wall-clock time
//! measured from a process-local epoch.

use std::time::Duration;

/// Timer over cumulative process CPU time
///
/// ```
/// use forgeprobe::profiling::CpuTimer;
///
/// let timer = CpuTimer::start();
/// // ... do work ...
/// let elapsed = timer.elapsed();
/// assert!(elapsed >= std::time::Duration::ZERO);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CpuTimer {
    start: Duration,
}

impl CpuTimer {
    /// Take a starting reading
    pub fn start() -> Self {
        CpuTimer {
            start: process_cpu_time(),
        }
    }

    /// CPU time consumed since [`start`](Self::start); never negative
    pub fn elapsed(&self) -> Duration {
        process_cpu_time().saturating_sub(self.start)
    }
}

/// Cumulative CPU time (user + system) consumed by this process
#[cfg(unix)]
pub fn process_cpu_time() -> Duration {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // getrusage only fails for an invalid `who` or pointer; both are fixed here.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return Duration::ZERO;
    }
    let usage = unsafe { usage.assume_init() };
    timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime)
}

/// Wall-clock fallback for platforms without `getrusage`
#[cfg(not(unix))]
pub fn process_cpu_time() -> Duration {
    use once_cell::sync::Lazy;
    use std::time::Instant;

    static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);
    EPOCH.elapsed()
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    let secs = tv.tv_sec.max(0) as u64;
    let micros = tv.tv_usec.clamp(0, 999_999) as u32;
    Duration::new(secs, micros * 1_000)
}

/// Render a duration the way the probes report it: seconds with exactly two
/// decimal digits, e.g. `"0.42s"`
pub fn format_seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
