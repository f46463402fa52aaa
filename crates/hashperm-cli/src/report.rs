//! Report sinks that turn trial statistics into text.

use std::io::{self, Write};

use hashperm_core::{ReportSink, RunStatistics};

const HEADERS: [&str; 3] = ["Permutations", "Zero bits", "Duration"];

/// Prints one right-aligned table per algorithm.
///
/// Each row is written and flushed as soon as its trial is recorded. Columns
/// are sized to their headers and grow only for wider values.
pub struct TableSink<W: Write> {
    out: W,
    algorithm: Option<String>,
}

impl<W: Write> TableSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, algorithm: None }
    }

    fn start_table(&mut self, algorithm: &str) -> io::Result<()> {
        if self.algorithm.is_some() {
            writeln!(self.out)?;
        }
        writeln!(self.out, "{algorithm}")?;
        write_row(&mut self.out, &HEADERS.map(String::from))?;
        self.algorithm = Some(algorithm.to_string());
        Ok(())
    }
}

fn write_row<W: Write>(out: &mut W, cells: &[String; 3]) -> io::Result<()> {
    let [w0, w1, w2] = HEADERS.map(str::len);
    writeln!(out, "{:>w0$} | {:>w1$} | {:>w2$}", cells[0], cells[1], cells[2])
}

impl<W: Write> ReportSink for TableSink<W> {
    fn record(&mut self, stats: &RunStatistics) -> io::Result<()> {
        if self.algorithm.as_deref() != Some(stats.algorithm.as_str()) {
            self.start_table(&stats.algorithm)?;
        }
        let zero_bits = stats.zero_bits.map_or_else(|| "n/a".to_string(), |bits| bits.to_string());
        let row = [stats.permutations.to_string(), zero_bits, format!("{:?}", stats.elapsed)];
        write_row(&mut self.out, &row)?;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.algorithm.take().is_some() {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

/// Writes each result as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for JsonLinesSink<W> {
    fn record(&mut self, stats: &RunStatistics) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, stats)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashperm_core::merge::MinGap;
    use std::time::Duration;

    fn stats(algorithm: &str, permutations: usize, zero_bits: Option<u32>) -> RunStatistics {
        RunStatistics {
            algorithm: algorithm.to_string(),
            message_len: permutations / 36,
            shards: 1,
            permutations,
            digest_len: 16,
            min_gap: MinGap::NotApplicable,
            zero_bits,
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn table_groups_rows_by_algorithm() {
        let mut buf = Vec::new();
        {
            let mut sink = TableSink::new(&mut buf);
            sink.record(&stats("siphash", 9216, Some(104))).unwrap();
            sink.record(&stats("siphash", 18432, Some(103))).unwrap();
            sink.record(&stats("poly1305", 9216, None)).unwrap();
            sink.finish().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let expected = "\
siphash
Permutations | Zero bits | Duration
        9216 |       104 |     12ms
       18432 |       103 |     12ms

poly1305
Permutations | Zero bits | Duration
        9216 |       n/a |     12ms

";
        assert_eq!(text, expected);
    }

    #[test]
    fn table_rows_are_written_before_finish() {
        let mut buf = Vec::new();
        {
            let mut sink = TableSink::new(&mut buf);
            sink.record(&stats("highwayhash", 9216, Some(250))).unwrap();
            sink.record(&stats("highwayhash", 18432, Some(249))).unwrap();
            sink.record(&stats("highwayhash", 36864, Some(247))).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.ends_with("       36864 |       247 |     12ms\n"));
    }

    #[test]
    fn empty_table_prints_nothing() {
        let mut buf = Vec::new();
        TableSink::new(&mut buf).finish().unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn json_lines_are_independently_parseable() {
        let mut buf = Vec::new();
        {
            let mut sink = JsonLinesSink::new(&mut buf);
            sink.record(&stats("highwayhash", 9216, Some(250))).unwrap();
            sink.record(&stats("highwayhash", 18432, Some(249))).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> =
            text.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["permutations"], 18432);
        assert_eq!(lines[0]["zero_bits"], 250);
    }
}
