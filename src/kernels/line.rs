/// Cache-friendly matrix multiplication using i-k-j loop order.
///
/// Swapping the `j` and `k` loops turns the innermost loop into a scaled
/// row update: `A[i][k]` is broadcast and row `k` of B is added into row
/// `i` of C. Both B and C are now walked with stride 1.
///
/// # Arguments
///
/// * `a` - Matrix A (n × n), row-major
/// * `b` - Matrix B (n × n), row-major
/// * `c` - Matrix C (n × n), row-major, accumulated into (C += A * B)
/// * `n` - Dimension of the square matrices
pub fn matmul_ikj(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    super::check_dims(a, b, c, n);

    for i in 0..n {
        let c_row = &mut c[i * n..(i + 1) * n];
        for k in 0..n {
            let a_ik = a[i * n + k];
            accumulate_row(c_row, a_ik, &b[k * n..(k + 1) * n]);
        }
    }
}

/// `c_row += a_ik * b_row`, element by element in increasing column order.
///
/// Shared by every i-k-j style kernel so they differ only in how the
/// surrounding loops are split, never in the update itself.
#[inline(always)]
pub(crate) fn accumulate_row(c_row: &mut [f64], a_ik: f64, b_row: &[f64]) {
    debug_assert_eq!(c_row.len(), b_row.len());
    for (c_ij, &b_kj) in c_row.iter_mut().zip(b_row) {
        *c_ij += a_ik * b_kj;
    }
}
