//! Experiment configuration and sweep planning.

use serde::{Deserialize, Serialize};

use crate::error::{validation_error, Result};
use crate::kernels::{BlockDecomposition, Kernel, KernelKind};

/// Suffix appended to the algorithm name of entries in the large tier.
pub const LARGE_SUFFIX: &str = "_large";

/// Block size used when none is configured.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Which sizes, block sizes and kernels a sweep covers.
///
/// Sizes come in two tiers. The small tier (`sizes`) is where the naive
/// i-j-k kernel is still affordable; the large tier (`large_sizes`) is
/// where blocking starts to matter. The thread count is not configured
/// here: parallel kernels use whatever rayon pool they are run on.
///
/// Fields missing from a deserialized configuration keep their default
/// values, so a file that only sets `sizes` still sweeps the default
/// large tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub sizes: Vec<usize>,
    pub large_sizes: Vec<usize>,
    pub block_sizes: Vec<usize>,
    pub kernels: Vec<KernelKind>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            sizes: (600..=3000).step_by(400).collect(),
            large_sizes: (4096..=10240).step_by(2048).collect(),
            block_sizes: vec![128, 256, 512],
            kernels: KernelKind::ALL.to_vec(),
        }
    }
}

/// One planned kernel invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepEntry {
    pub kernel: Kernel,
    pub size: usize,
    /// Algorithm name written to the record, including any tier suffix.
    pub label: String,
}

impl SweepEntry {
    pub fn new(kernel: Kernel, size: usize) -> Self {
        Self {
            label: kernel.name(),
            kernel,
            size,
        }
    }

    fn large(kernel: Kernel, size: usize) -> Self {
        Self {
            label: format!("{}{LARGE_SUFFIX}", kernel.name()),
            kernel,
            size,
        }
    }
}

impl ExperimentConfig {
    /// A configuration running one kernel over `sizes`.
    ///
    /// The sizes are placed in the tier the kernel is swept on, so the
    /// entries keep their plain algorithm name.
    pub fn single(kind: KernelKind, sizes: Vec<usize>, block_size: usize) -> Self {
        let (sizes, large_sizes) = match kind {
            KernelKind::Block => (Vec::new(), sizes),
            _ => (sizes, Vec::new()),
        };
        Self {
            sizes,
            large_sizes,
            block_sizes: vec![block_size],
            kernels: vec![kind],
        }
    }

    /// Checks that the configuration describes a non-empty, runnable plan.
    pub fn validate(&self) -> Result<()> {
        if self.kernels.is_empty() {
            return Err(validation_error("no kernels selected"));
        }
        if self.sizes.is_empty() && self.large_sizes.is_empty() {
            return Err(validation_error("no matrix sizes configured"));
        }
        if let Some(&n) = self.sizes.iter().chain(&self.large_sizes).find(|&&n| n == 0) {
            return Err(validation_error(format!("matrix size must be positive, got {n}")));
        }
        if self.kernels.contains(&KernelKind::Standard) && self.sizes.is_empty() {
            return Err(validation_error(
                "Standard kernel selected without small-tier sizes",
            ));
        }
        if self.kernels.contains(&KernelKind::Block) {
            if self.large_sizes.is_empty() {
                return Err(validation_error(
                    "Block kernel selected without large-tier sizes",
                ));
            }
            if self.block_sizes.is_empty() {
                return Err(validation_error("block kernel selected without block sizes"));
            }
            for &bs in &self.block_sizes {
                for &n in &self.large_sizes {
                    BlockDecomposition::new(n, bs)?;
                }
            }
        }
        Ok(())
    }

    /// Expands the configuration into the ordered list of invocations.
    ///
    /// Kernels run in their canonical order regardless of how they are
    /// listed. Standard runs on the small tier only, Block on the large
    /// tier only (every size, then every block size), and every other
    /// kernel on the small tier followed by the large tier.
    pub fn plan(&self) -> Result<Vec<SweepEntry>> {
        self.validate()?;
        let mut entries = Vec::new();

        for kind in KernelKind::ALL {
            if !self.kernels.contains(&kind) {
                continue;
            }
            match kind {
                KernelKind::Standard => {
                    entries.extend(self.sizes.iter().map(|&n| SweepEntry::new(Kernel::Standard, n)));
                }
                KernelKind::Block => {
                    for &n in &self.large_sizes {
                        for &bs in &self.block_sizes {
                            entries.push(SweepEntry::new(Kernel::blocked(bs)?, n));
                        }
                    }
                }
                _ => {
                    let kernel = kind.with_block_size(0)?;
                    entries.extend(self.sizes.iter().map(|&n| SweepEntry::new(kernel, n)));
                    entries.extend(self.large_sizes.iter().map(|&n| SweepEntry::large(kernel, n)));
                }
            }
        }
        Ok(entries)
    }
}
