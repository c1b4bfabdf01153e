//! Resident-set sampling for the leak probe
//!
//! Reads `VmRSS` from `/proc/self/status`. On platforms without procfs the
//! sampler returns `None` and the leak probe degrades to ledger-only
//! observation.

/// Samples this process's resident set size
pub struct MemorySampler;

impl MemorySampler {
    /// Current resident set in kilobytes, if the platform exposes it
    pub fn rss_kb() -> Option<u64> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        status.lines().find_map(|line| {
            line.strip_prefix("VmRSS:")?
                .split_whitespace()
                .next()?
                .parse()
                .ok()
        })
    }

    /// Current resident set in megabytes
    pub fn rss_mb() -> Option<f64> {
        Some(Self::rss_kb()? as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn rss_is_observable_on_linux() {
        let rss = MemorySampler::rss_kb().expect("procfs should expose VmRSS");
        assert!(rss > 0);
    }

    #[test]
    fn mb_conversion_tracks_kb() {
        if let (Some(kb), Some(mb)) = (MemorySampler::rss_kb(), MemorySampler::rss_mb()) {
            // Two separate samples; allow generous drift between them.
            assert!((mb - kb as f64 / 1024.0).abs() < 64.0);
        }
    }
}
