//! Cache-blocked i-k-j multiplication.

use std::cmp::min;

use serde::Serialize;

use super::line::accumulate_row;
use crate::error::{validation_error, Result};

/// How an `n x n` product is tiled by square blocks of `block_size`.
///
/// Every loop dimension (i, k and j) is cut into `blocks_per_dim =
/// ceil(n / block_size)` ranges, so the kernel visits `blocks_per_dim³`
/// blocks. A block size at or above `n` degenerates to a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockDecomposition {
    pub block_size: usize,
    pub blocks_per_dim: usize,
    pub total_blocks: usize,
}

impl BlockDecomposition {
    /// Computes the decomposition, rejecting tilings with no blocks at all.
    pub fn new(n: usize, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(validation_error("block size must be positive"));
        }
        let blocks_per_dim = n.div_ceil(block_size);
        let total_blocks = blocks_per_dim
            .checked_mul(blocks_per_dim)
            .and_then(|sq| sq.checked_mul(blocks_per_dim))
            .ok_or_else(|| {
                validation_error(format!(
                    "block count overflows for n={n}, block size {block_size}"
                ))
            })?;
        if total_blocks == 0 {
            return Err(validation_error(format!(
                "n={n} with block size {block_size} produces no blocks"
            )));
        }
        Ok(Self {
            block_size,
            blocks_per_dim,
            total_blocks,
        })
    }
}

/// Blocked matrix multiplication.
///
/// Iterates over `(i_block, k_block, j_block)` tiles and runs the i-k-j
/// row update restricted to each tile's bounds. Keeping the tile of B and
/// the strip of C small enough to stay cache resident is what makes this
/// faster than [`matmul_ikj`](super::matmul_ikj) once a full row of B no
/// longer fits.
///
/// # Panics
///
/// Panics if `block_size` is zero.
pub fn matmul_blocked(a: &[f64], b: &[f64], c: &mut [f64], n: usize, block_size: usize) {
    assert!(block_size > 0, "block size must be positive");
    super::check_dims(a, b, c, n);

    for i_block in (0..n).step_by(block_size) {
        let i_max = min(i_block + block_size, n);
        for k_block in (0..n).step_by(block_size) {
            let k_max = min(k_block + block_size, n);
            for j_block in (0..n).step_by(block_size) {
                let j_max = min(j_block + block_size, n);

                for i in i_block..i_max {
                    let c_strip = &mut c[i * n + j_block..i * n + j_max];
                    for k in k_block..k_max {
                        let a_ik = a[i * n + k];
                        accumulate_row(c_strip, a_ik, &b[k * n + j_block..k * n + j_max]);
                    }
                }
            }
        }
    }
}
