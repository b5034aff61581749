//! Common utilities used across the crate.
//!
//! Parallelism configuration and the weighted quantile used by the
//! boosting ensembles.

use rayon::prelude::*;

// =============================================================================
// Statistical Utilities
// =============================================================================

/// Compute the weighted quantile of a slice using a step function.
///
/// No interpolation: returns the value at the point where the cumulative
/// weight (in ascending value order) first reaches `alpha * total_weight`.
///
/// # Arguments
/// * `values` - The values to compute the quantile over
/// * `weights` - Optional weights for each value (None = uniform weights)
/// * `alpha` - The quantile level in (0, 1)
/// * `scratch` - Mutable scratch space for sorting indices (will be resized if needed)
///
/// # Returns
/// The weighted quantile value. Returns `f64::NAN` if values is empty.
#[inline]
pub fn weighted_quantile(
    values: &[f64],
    weights: Option<&[f64]>,
    alpha: f64,
    scratch: &mut Vec<usize>,
) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return values[0];
    }

    scratch.clear();
    scratch.extend(0..n);

    // Stable sort keeps equal values in input order.
    scratch.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let total_weight: f64 = if let Some(w) = weights {
        w.iter().sum()
    } else {
        n as f64
    };

    let threshold = total_weight * alpha;

    let mut cumulative = 0.0f64;
    for &idx in scratch.iter() {
        let w = weights.map_or(1.0, |ws| ws[idx]);
        cumulative += w;
        if cumulative >= threshold {
            return values[idx];
        }
    }

    // Edge case: return last value
    values[scratch[n - 1]]
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// This is a simple boolean flag passed through fitting components.
/// When `true`, components may use `rayon` parallel iterators.
/// When `false`, components must use sequential iteration.
///
/// The actual thread pool is set up by the caller via [`run_with_threads`].
/// Components don't manage thread pools - they just respect this flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over `iter`, in parallel when allowed. Output order follows input order.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// If a dedicated pool cannot be created the closure runs sequentially.
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    tracing::warn!("failed to build thread pool, running sequentially: {err}");
                    f(Parallelism::Sequential)
                }
            }
        }
    }
}
