//! Multi-threaded i-k-j kernels.
//!
//! Both kernels run the exact i-k-j update of [`matmul_ikj`](super::matmul_ikj)
//! on the current rayon pool. They differ only in which loop is split
//! across the worker team:
//!
//! - [`par_matmul_rows`] splits the outermost row loop once. Every worker
//!   owns a disjoint, contiguous range of rows of C, so no synchronization
//!   on C is needed and the team forks and joins a single time.
//! - [`par_matmul_cols`] splits only the innermost column loop, and does so
//!   again on every `(i, k)` pair. Each split is a fork-join, so the team
//!   synchronizes `n²` times per product. The overhead is the point: this
//!   kernel shows what too fine a parallel granularity costs.

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::{ParallelSlice, ParallelSliceMut},
};

use super::line::accumulate_row;

/// Number of workers in the pool the caller is running on.
pub fn worker_threads() -> usize {
    rayon::current_num_threads().max(1)
}

/// i-k-j multiplication with the row loop partitioned across workers.
///
/// Rows are dealt out in `ceil(n / threads)`-row ranges, one range per
/// worker, mirroring a static schedule.
pub fn par_matmul_rows(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    super::check_dims(a, b, c, n);
    if n == 0 {
        return;
    }

    let rows_per_worker = n.div_ceil(worker_threads());

    c.par_chunks_mut(rows_per_worker * n)
        .enumerate()
        .for_each(|(worker, c_rows)| {
            let first_row = worker * rows_per_worker;
            for (offset, c_row) in c_rows.chunks_mut(n).enumerate() {
                let i = first_row + offset;
                for k in 0..n {
                    let a_ik = a[i * n + k];
                    accumulate_row(c_row, a_ik, &b[k * n..(k + 1) * n]);
                }
            }
        });
}

/// i-k-j multiplication with only the column loop partitioned, per `(i, k)`.
pub fn par_matmul_cols(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    super::check_dims(a, b, c, n);
    if n == 0 {
        return;
    }

    let cols_per_worker = n.div_ceil(worker_threads());

    for i in 0..n {
        let c_row = &mut c[i * n..(i + 1) * n];
        for k in 0..n {
            let a_ik = a[i * n + k];
            let b_row = &b[k * n..(k + 1) * n];
            // Fork over the column range, join before the next k.
            c_row
                .par_chunks_mut(cols_per_worker)
                .zip(b_row.par_chunks(cols_per_worker))
                .for_each(|(c_part, b_part)| accumulate_row(c_part, a_ik, b_part));
        }
    }
}
