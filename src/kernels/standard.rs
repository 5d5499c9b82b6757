/// Textbook matrix multiplication using i-j-k loop order.
///
/// For each output element `C[i][j]` the inner loop walks row `i` of A
/// contiguously and column `j` of B with a stride of `n`, touching a new
/// cache line of B on almost every iteration. This is the cache-unfriendly
/// baseline every other kernel is measured against.
///
/// # Arguments
///
/// * `a` - Matrix A (n × n), row-major
/// * `b` - Matrix B (n × n), row-major
/// * `c` - Matrix C (n × n), row-major, accumulated into (C += A * B)
/// * `n` - Dimension of the square matrices
pub fn matmul_ijk(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    super::check_dims(a, b, c, n);

    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a[i * n + k] * b[k * n + j];
            }
            c[i * n + j] += sum;
        }
    }
}
