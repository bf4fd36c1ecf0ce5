use crate::api::error::{QuantError, QuantResult};
use crate::api::types::SimdBackend;
use crate::core::simd;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Element count at which the `_par` cast helpers switch to rayon.
pub(crate) static CAST_PAR_THRESHOLD: AtomicUsize = AtomicUsize::new(1 << 16);

/// Column count (N) at which B prepacking splits tiles across rayon.
pub(crate) static PACK_PAR_THRESHOLD: AtomicUsize = AtomicUsize::new(64);

/// Runtime configuration for parallelism in the qnbit kernels.
/// Apply it (via `apply()`) once at startup, before any packing or casting.
pub struct RuntimeConfig {
    /// Number of rayon threads. 0 means auto-detect (use all available cores).
    pub num_threads: usize,
    /// Minimum element count for the parallel cast path (default 65536).
    pub cast_par_threshold: usize,
    /// Minimum N for the parallel prepack path (default 64).
    pub pack_par_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            cast_par_threshold: 1 << 16,
            pack_par_threshold: 64,
        }
    }
}

impl RuntimeConfig {
    /// Apply this runtime configuration globally.
    ///
    /// Configures rayon's global thread pool when `num_threads` is set and
    /// writes the parallel thresholds to global atomics. The rayon pool can
    /// only be built once per process.
    pub fn apply(&self) -> QuantResult<()> {
        if self.num_threads != 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_threads)
                .build_global()
                .map_err(|e| QuantError::ThreadPool(format!("Failed to set rayon thread pool: {}", e)))?;
        }

        CAST_PAR_THRESHOLD.store(self.cast_par_threshold, Ordering::Relaxed);
        PACK_PAR_THRESHOLD.store(self.pack_par_threshold, Ordering::Relaxed);

        log::debug!("[runtime] SIMD: {}", Self::detect_simd());
        log::debug!("[runtime] Rayon threads: {}", rayon::current_num_threads());

        Ok(())
    }

    /// Instruction set the vector kernels dispatch to.
    pub fn detect_simd() -> SimdBackend {
        simd::detect_backend()
    }
}

/// Optimization profiles for A/B benchmarking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptProfile {
    /// Default thresholds.
    Optimized,
    /// Parallel paths disabled: thresholds set to MAX.
    Baseline,
    /// Lower thresholds for aggressive parallelism.
    Aggressive,
}

impl OptProfile {
    /// Build a `RuntimeConfig` matching this profile.
    pub fn runtime_config(&self) -> RuntimeConfig {
        match self {
            OptProfile::Optimized => RuntimeConfig::default(),
            OptProfile::Baseline => RuntimeConfig {
                cast_par_threshold: usize::MAX,
                pack_par_threshold: usize::MAX,
                ..RuntimeConfig::default()
            },
            OptProfile::Aggressive => RuntimeConfig {
                cast_par_threshold: 1 << 12,
                pack_par_threshold: 16,
                ..RuntimeConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.num_threads, 0);
        assert_eq!(config.cast_par_threshold, 65536);
        assert_eq!(config.pack_par_threshold, 64);
    }

    #[test]
    fn test_detect_simd() {
        let simd = RuntimeConfig::detect_simd();
        assert!(!simd.to_string().is_empty());
    }

    #[test]
    fn test_apply_default_keeps_thresholds() {
        RuntimeConfig::default().apply().unwrap();
        assert_eq!(CAST_PAR_THRESHOLD.load(Ordering::Relaxed), 1 << 16);
        assert_eq!(PACK_PAR_THRESHOLD.load(Ordering::Relaxed), 64);
    }

    #[test]
    fn test_opt_profile_baseline() {
        let cfg = OptProfile::Baseline.runtime_config();
        assert_eq!(cfg.cast_par_threshold, usize::MAX);
        assert_eq!(cfg.pack_par_threshold, usize::MAX);
    }

    #[test]
    fn test_opt_profile_aggressive() {
        let cfg = OptProfile::Aggressive.runtime_config();
        assert_eq!(cfg.cast_par_threshold, 4096);
        assert_eq!(cfg.pack_par_threshold, 16);
        assert_eq!(OptProfile::Optimized.runtime_config().pack_par_threshold, 64);
    }
}
