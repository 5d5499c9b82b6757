//! Destinations for result records.
//!
//! Sinks are append-only: each record is written once, in the order the
//! driver emits it, and is never read back.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use crate::error::Result;
use crate::record::ResultRecord;

/// Column order of the flat record layout.
pub const CSV_HEADER: &str =
    "algorithm,size,blockSize,numBlocks,time,L1,L2,mflops,speedup,efficiency,threads";

/// Consumer of result records.
pub trait RecordSink {
    /// Appends one record.
    fn emit(&mut self, record: &ResultRecord) -> Result<()>;

    /// Pushes buffered output to its destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<ResultRecord> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Human-readable output, one line per record.
///
/// ```text
/// Block_256 - Size: 4096 - Block Size: 256 (Total Blocks: 4096) - Time: 41.2 s - L1 DCM: 123 - L2 DCM: 45
/// ```
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for ConsoleSink<W> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        if !record.first_row.is_empty() {
            let values: Vec<String> = record.first_row.iter().map(f64::to_string).collect();
            writeln!(self.out, "Result matrix (first row): {}", values.join(" "))?;
        }

        write!(self.out, "{} - Size: {}", record.algorithm, record.size)?;
        if record.block_size > 0 {
            write!(
                self.out,
                " - Block Size: {} (Total Blocks: {})",
                record.block_size, record.num_blocks
            )?;
        } else {
            write!(self.out, " - Block Size: N/A")?;
        }
        write!(
            self.out,
            " - Time: {:.3} s - L1 DCM: {} - L2 DCM: {}",
            record.elapsed_secs, record.l1_misses, record.l2_misses
        )?;
        if record.thread_count > 1 {
            write!(
                self.out,
                " - MFLOPS: {:.2} - Speedup: {:.2} - Efficiency: {:.2} ({} threads)",
                record.mflops, record.speedup, record.efficiency, record.thread_count
            )?;
        } else {
            write!(self.out, " - MFLOPS: {:.2}", record.mflops)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Append-only CSV in the flat record layout.
pub struct CsvSink<W: Write> {
    out: W,
}

impl CsvSink<BufWriter<File>> {
    /// Opens `path` for appending, creating parent directories as needed.
    ///
    /// The header is written only when the file is new or empty, so
    /// repeated runs keep appending rows to one table.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let write_header = file.metadata()?.len() == 0;
        Self::new(BufWriter::new(file), write_header)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(mut out: W, write_header: bool) -> Result<Self> {
        if write_header {
            writeln!(out, "{CSV_HEADER}")?;
        }
        Ok(Self { out })
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            record.algorithm,
            record.size,
            record.block_size,
            record.num_blocks,
            record.elapsed_secs,
            record.l1_misses,
            record.l2_misses,
            record.mflops,
            record.speedup,
            record.efficiency,
            record.thread_count
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::CounterSample;
    use crate::kernels::BlockDecomposition;
    use crate::metrics::PerfMetrics;

    fn blocked_record() -> ResultRecord {
        ResultRecord::new(
            "Block_3",
            10,
            Some(BlockDecomposition::new(10, 3).unwrap()),
            0.5,
            CounterSample::from_array([100, 20]),
            PerfMetrics::sequential(10, 0.5),
            1,
        )
    }

    fn line_record() -> ResultRecord {
        ResultRecord::new(
            "Line",
            4,
            None,
            0.25,
            CounterSample::ZERO,
            PerfMetrics::sequential(4, 0.25),
            1,
        )
        .with_first_row(vec![10.0, 10.0])
    }

    #[test]
    fn test_console_line_format() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.emit(&blocked_record()).unwrap();
        sink.emit(&line_record()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with(
            "Block_3 - Size: 10 - Block Size: 3 (Total Blocks: 64) - Time: 0.500 s - L1 DCM: 100 - L2 DCM: 20"
        ));
        assert_eq!(lines[1], "Result matrix (first row): 10 10");
        assert!(lines[2].starts_with("Line - Size: 4 - Block Size: N/A - Time: 0.250 s"));
    }

    #[test]
    fn test_csv_header_and_row() {
        let mut sink = CsvSink::new(Vec::new(), true).unwrap();
        sink.emit(&blocked_record()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row.len(), 11);
        assert_eq!(&row[..4], &["Block_3", "10", "3", "64"]);
        assert_eq!(&row[5..7], &["100", "20"]);
        assert_eq!(row[10], "1");
    }

    #[test]
    fn test_csv_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("results.csv");

        for _ in 0..2 {
            let mut sink = CsvSink::append(&path).unwrap();
            sink.emit(&line_record()).unwrap();
            sink.flush().unwrap();
        }

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.matches("algorithm,").count(), 1);
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&blocked_record()).unwrap();
        sink.emit(&line_record()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let values: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["blockSize"], 3);
        assert_eq!(values[1]["algorithm"], "Line");
        assert!(values[1].get("firstRow").is_none());
    }

    #[test]
    fn test_vec_and_borrowed_sinks_collect() {
        fn emit_into<S: RecordSink>(mut sink: S) {
            sink.emit(&line_record()).unwrap();
            sink.flush().unwrap();
        }

        let mut records: Vec<ResultRecord> = Vec::new();
        emit_into(&mut records);
        emit_into(Box::new(Vec::<ResultRecord>::new()) as Box<dyn RecordSink>);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].first_row, vec![10.0, 10.0]);
    }
}
