//! Matrix multiplication kernels.
//!
//! Every kernel computes `C += A * B` for square row-major `f64` matrices.
//! They are deliberately naive: the only thing that changes from one to the
//! next is the loop order, the blocking, or the way work is split across
//! threads, so that differences in time and cache misses can be attributed
//! to the memory-access pattern alone.
//!
//! | Kernel | Loop order | Threads |
//! |--------|------------|---------|
//! | [`Kernel::Standard`] | i-j-k | 1 |
//! | [`Kernel::Line`] | i-k-j | 1 |
//! | [`Kernel::Block`] | tiled i-k-j | 1 |
//! | [`Kernel::LineExtParallel`] | i-k-j, rows split once | pool |
//! | [`Kernel::LineIntParallel`] | i-k-j, columns split per (i, k) | pool |

mod blocked;
mod line;
mod parallel;
mod standard;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{validation_error, BenchError, Result};
use crate::matrix::{Operands, PREVIEW_LEN};
use crate::timing::Stopwatch;

pub use blocked::{matmul_blocked, BlockDecomposition};
pub use line::matmul_ikj;
pub use parallel::{par_matmul_cols, par_matmul_rows, worker_threads};
pub use standard::matmul_ijk;

#[inline]
fn check_dims(a: &[f64], b: &[f64], c: &[f64], n: usize) {
    let len = n * n;
    assert_eq!(a.len(), len, "A: expected {n}x{n}={len} elements");
    assert_eq!(b.len(), len, "B: expected {n}x{n}={len} elements");
    assert_eq!(c.len(), len, "C: expected {n}x{n}={len} elements");
}

/// A kernel variant, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Standard,
    Line,
    Block { block_size: usize },
    LineExtParallel,
    LineIntParallel,
}

/// Kernel variant without parameters, as selected in a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    Standard,
    Line,
    Block,
    LineExtParallel,
    LineIntParallel,
}

impl KernelKind {
    pub const ALL: [KernelKind; 5] = [
        KernelKind::Standard,
        KernelKind::Line,
        KernelKind::Block,
        KernelKind::LineExtParallel,
        KernelKind::LineIntParallel,
    ];

    /// Builds the kernel, using `block_size` for the blocked variant.
    pub fn with_block_size(self, block_size: usize) -> Result<Kernel> {
        Ok(match self {
            KernelKind::Standard => Kernel::Standard,
            KernelKind::Line => Kernel::Line,
            KernelKind::Block => Kernel::blocked(block_size)?,
            KernelKind::LineExtParallel => Kernel::LineExtParallel,
            KernelKind::LineIntParallel => Kernel::LineIntParallel,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            KernelKind::Standard => "Standard",
            KernelKind::Line => "Line",
            KernelKind::Block => "Block",
            KernelKind::LineExtParallel => "LineExtParallel",
            KernelKind::LineIntParallel => "LineIntParallel",
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelKind {
    type Err = BenchError;

    /// Accepts both the display names (`LineExtParallel`) and the
    /// configuration names (`line_ext_parallel`), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "standard" => Ok(KernelKind::Standard),
            "line" => Ok(KernelKind::Line),
            "block" => Ok(KernelKind::Block),
            "lineextparallel" => Ok(KernelKind::LineExtParallel),
            "lineintparallel" => Ok(KernelKind::LineIntParallel),
            _ => Err(validation_error(format!(
                "unknown kernel `{s}` (expected one of: standard, line, block, line_ext_parallel, line_int_parallel)"
            ))),
        }
    }
}

/// Outcome of one kernel invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelRun {
    /// Seconds spent in the multiplication loop only.
    pub elapsed_secs: f64,
    /// Leading values of the first row of C.
    pub first_row: Vec<f64>,
}

impl Kernel {
    /// The blocked kernel, rejecting a zero block size.
    pub fn blocked(block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(validation_error("block size must be positive"));
        }
        Ok(Kernel::Block { block_size })
    }

    pub fn kind(&self) -> KernelKind {
        match self {
            Kernel::Standard => KernelKind::Standard,
            Kernel::Line => KernelKind::Line,
            Kernel::Block { .. } => KernelKind::Block,
            Kernel::LineExtParallel => KernelKind::LineExtParallel,
            Kernel::LineIntParallel => KernelKind::LineIntParallel,
        }
    }

    /// Algorithm identifier used in result records, e.g. `Block_256`.
    pub fn name(&self) -> String {
        match self {
            Kernel::Block { block_size } => format!("Block_{block_size}"),
            other => other.kind().to_string(),
        }
    }

    /// Block size, or 0 when the kernel is not blocked.
    pub fn block_size(&self) -> usize {
        match self {
            Kernel::Block { block_size } => *block_size,
            _ => 0,
        }
    }

    /// Tiling of an `n x n` product, for the blocked kernel only.
    pub fn decomposition(&self, n: usize) -> Result<Option<BlockDecomposition>> {
        match self {
            Kernel::Block { block_size } => BlockDecomposition::new(n, *block_size).map(Some),
            _ => Ok(None),
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Kernel::LineExtParallel | Kernel::LineIntParallel)
    }

    /// Threads the kernel will use on the current pool.
    pub fn threads(&self) -> usize {
        if self.is_parallel() {
            worker_threads()
        } else {
            1
        }
    }

    /// Computes `C += A * B` on flat row-major buffers.
    pub fn multiply(&self, a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
        match *self {
            Kernel::Standard => matmul_ijk(a, b, c, n),
            Kernel::Line => matmul_ikj(a, b, c, n),
            Kernel::Block { block_size } => matmul_blocked(a, b, c, n, block_size),
            Kernel::LineExtParallel => par_matmul_rows(a, b, c, n),
            Kernel::LineIntParallel => par_matmul_cols(a, b, c, n),
        }
    }

    /// Multiplies an operand set in place and returns the elapsed seconds
    /// of the multiplication alone.
    pub fn execute(&self, operands: &mut Operands) -> f64 {
        let n = operands.dim();
        let (a, b, c) = operands.split();
        let stopwatch = Stopwatch::start();
        self.multiply(a, b, c, n);
        stopwatch.elapsed_secs()
    }

    /// Allocates and initializes fresh operands for dimension `n`,
    /// multiplies them and releases them.
    ///
    /// Allocation and initialization are excluded from the reported time.
    pub fn run(&self, n: usize) -> Result<KernelRun> {
        let mut operands = Operands::allocate(n)?;
        let elapsed_secs = self.execute(&mut operands);
        let first_row = operands.output().first_row_preview(PREVIEW_LEN);
        Ok(KernelRun {
            elapsed_secs,
            first_row,
        })
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Kernel::Standard.name(), "Standard");
        assert_eq!(Kernel::Line.name(), "Line");
        assert_eq!(Kernel::blocked(128).unwrap().name(), "Block_128");
        assert_eq!(Kernel::LineExtParallel.name(), "LineExtParallel");
        assert_eq!(Kernel::LineIntParallel.to_string(), "LineIntParallel");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("line_ext_parallel".parse::<KernelKind>().unwrap(), KernelKind::LineExtParallel);
        assert_eq!("LineIntParallel".parse::<KernelKind>().unwrap(), KernelKind::LineIntParallel);
        assert_eq!("BLOCK".parse::<KernelKind>().unwrap(), KernelKind::Block);
        assert!("strassen".parse::<KernelKind>().is_err());
    }

    #[test]
    fn test_block_size_and_decomposition() {
        let kernel = KernelKind::Block.with_block_size(3).unwrap();
        assert_eq!(kernel.block_size(), 3);
        let d = kernel.decomposition(10).unwrap().unwrap();
        assert_eq!(d.total_blocks, 64);

        assert_eq!(Kernel::Line.block_size(), 0);
        assert!(Kernel::Line.decomposition(10).unwrap().is_none());
        assert!(KernelKind::Block.with_block_size(0).is_err());
    }

    #[test]
    fn test_sequential_kernels_use_one_thread() {
        assert_eq!(Kernel::Standard.threads(), 1);
        assert_eq!(Kernel::blocked(4).unwrap().threads(), 1);
        assert!(Kernel::LineExtParallel.threads() >= 1);
        assert!(Kernel::LineIntParallel.is_parallel());
    }

    #[test]
    fn test_run_reports_first_row() {
        // A is ones and row k of B is k + 1, so every C[0][j] = n(n+1)/2.
        let run = Kernel::Line.run(12).unwrap();
        assert_eq!(run.first_row.len(), PREVIEW_LEN);
        assert!(run.first_row.iter().all(|&v| v == 78.0));
        assert!(run.elapsed_secs >= 0.0);
    }

    #[test]
    #[should_panic(expected = "A: expected 2x2=4 elements")]
    fn test_multiply_checks_dimensions() {
        let mut c = [0.0; 4];
        Kernel::Standard.multiply(&[1.0; 3], &[1.0; 4], &mut c, 2);
    }
}
