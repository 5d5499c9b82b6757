//! One measured kernel invocation.

use serde::Serialize;

use crate::counters::CounterSample;
use crate::kernels::BlockDecomposition;
use crate::metrics::PerfMetrics;

/// The result of one sweep entry.
///
/// Serialized field names follow the flat record layout
/// `algorithm,size,blockSize,numBlocks,time,L1,L2,mflops,speedup,efficiency,threads`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Kernel identifier, e.g. `Line`, `Block_256` or `LineExtParallel_large`.
    pub algorithm: String,
    pub size: usize,
    /// 0 when the kernel is not blocked.
    pub block_size: usize,
    /// 0 when the kernel is not blocked.
    pub num_blocks: usize,
    #[serde(rename = "time")]
    pub elapsed_secs: f64,
    #[serde(rename = "L1")]
    pub l1_misses: u64,
    #[serde(rename = "L2")]
    pub l2_misses: u64,
    pub mflops: f64,
    pub speedup: f64,
    pub efficiency: f64,
    #[serde(rename = "threads")]
    pub thread_count: usize,
    /// Leading values of the first row of C, for display only.
    #[serde(skip)]
    pub first_row: Vec<f64>,
}

impl ResultRecord {
    /// Assembles a record from the pieces measured by the driver.
    pub fn new(
        algorithm: impl Into<String>,
        size: usize,
        decomposition: Option<BlockDecomposition>,
        elapsed_secs: f64,
        counters: CounterSample,
        metrics: PerfMetrics,
        thread_count: usize,
    ) -> Self {
        let (block_size, num_blocks) = decomposition
            .map(|d| (d.block_size, d.total_blocks))
            .unwrap_or((0, 0));
        Self {
            algorithm: algorithm.into(),
            size,
            block_size,
            num_blocks,
            elapsed_secs,
            l1_misses: counters.l1_misses,
            l2_misses: counters.l2_misses,
            mflops: metrics.mflops,
            speedup: metrics.speedup,
            efficiency: metrics.efficiency,
            thread_count,
            first_row: Vec::new(),
        }
    }

    /// Attaches the first-row preview.
    pub fn with_first_row(mut self, first_row: Vec<f64>) -> Self {
        self.first_row = first_row;
        self
    }

    pub fn counters(&self) -> CounterSample {
        CounterSample {
            l1_misses: self.l1_misses,
            l2_misses: self.l2_misses,
        }
    }

    pub fn metrics(&self) -> PerfMetrics {
        PerfMetrics {
            mflops: self.mflops,
            speedup: self.speedup,
            efficiency: self.efficiency,
        }
    }

    /// Whether two records describe the same configuration, ignoring
    /// everything that was measured.
    pub fn same_configuration(&self, other: &ResultRecord) -> bool {
        self.algorithm == other.algorithm
            && self.size == other.size
            && self.block_size == other.block_size
            && self.num_blocks == other.num_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ResultRecord {
        ResultRecord::new(
            "Block_3",
            10,
            Some(BlockDecomposition::new(10, 3).unwrap()),
            0.25,
            CounterSample::from_array([11, 5]),
            PerfMetrics::sequential(10, 0.25),
            1,
        )
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(record()).unwrap();
        let object = value.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        for key in [
            "algorithm",
            "size",
            "blockSize",
            "numBlocks",
            "time",
            "L1",
            "L2",
            "mflops",
            "speedup",
            "efficiency",
            "threads",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(object.len(), 11);
        assert_eq!(object["numBlocks"], 64);
        assert_eq!(object["L1"], 11);
    }

    #[test]
    fn test_unblocked_record_has_zero_block_fields() {
        let r = ResultRecord::new(
            "Line",
            8,
            None,
            1.0,
            CounterSample::ZERO,
            PerfMetrics::sequential(8, 1.0),
            1,
        );
        assert_eq!(r.block_size, 0);
        assert_eq!(r.num_blocks, 0);
        assert_eq!(r.counters(), CounterSample::ZERO);
    }

    #[test]
    fn test_same_configuration_ignores_measurements() {
        let first = record();
        let mut second = record().with_first_row(vec![1.0]);
        second.elapsed_secs = 9.0;
        second.l1_misses = 0;
        assert!(first.same_configuration(&second));
        second.block_size = 4;
        assert!(!first.same_configuration(&second));
    }
}
