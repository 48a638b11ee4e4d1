//! Operation results and their human-readable presentation.
//!
//! Sizes and timings are collected by the operation controller; derived
//! values (ratio, saved space) are computed on demand, never stored.

use std::fmt;
use std::time::{Duration, Instant};

use crate::archive::Algorithm;

/// Result of a compress or decompress operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionInfo {
    /// Total uncompressed bytes
    pub original_size: u64,

    /// Total bytes of the archive (including encryption envelope, if any)
    pub compressed_size: u64,

    /// Wall-clock time of the operation
    pub elapsed: Duration,
}

impl CompressionInfo {
    /// Saved space as a percentage of the original size.
    ///
    /// Negative when the archive is larger than its input; 0.0 for empty input.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.space_saved() as f64 / self.original_size as f64 * 100.0
        }
    }

    /// Bytes saved by compression (negative if the archive grew).
    pub fn space_saved(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }

    /// Throughput in bytes of original data per second.
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.original_size as f64 / secs
        }
    }

    /// Export as `key=value` lines (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "original_size={}\n\
             compressed_size={}\n\
             space_saved={}\n\
             compression_ratio={:.2}\n\
             elapsed_ms={}\n",
            self.original_size,
            self.compressed_size,
            self.space_saved(),
            self.compression_ratio(),
            self.elapsed.as_millis(),
        )
    }
}

impl fmt::Display for CompressionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Original size:   {}", format_size(self.original_size))?;
        writeln!(f, "Compressed size: {}", format_size(self.compressed_size))?;
        writeln!(f, "Ratio:           {:.2}%", self.compression_ratio())?;
        write!(f, "Time:            {}", format_duration(self.elapsed))
    }
}

/// Both algorithms applied to one file.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmComparison {
    pub file_name: String,
    pub results: Vec<(Algorithm, CompressionInfo)>,
}

impl AlgorithmComparison {
    /// Algorithm with the smallest output; the first listed wins ties.
    pub fn best(&self) -> Option<Algorithm> {
        self.results
            .iter()
            .min_by_key(|(_, info)| info.compressed_size)
            .map(|&(algorithm, _)| algorithm)
    }

    pub fn get(&self, algorithm: Algorithm) -> Option<&CompressionInfo> {
        self.results
            .iter()
            .find(|(a, _)| *a == algorithm)
            .map(|(_, info)| info)
    }
}

impl fmt::Display for AlgorithmComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name)?;
        for (algorithm, info) in &self.results {
            write!(
                f,
                "\n  {:<13} {:>10} -> {:>10}  {:>7.2}%  {}",
                algorithm.name(),
                format_size(info.original_size),
                format_size(info.compressed_size),
                info.compression_ratio(),
                format_duration(info.elapsed),
            )?;
        }
        Ok(())
    }
}

/// Measures elapsed time from construction.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Render a byte count with a 1024-based unit (B, KB, MB, GB).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        let text = format!("{:.2}", value);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        format!("{} {}", text, UNITS[unit])
    }
}

/// Render a duration as milliseconds, seconds or minutes depending on size.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{} ms", elapsed.as_millis())
    } else if secs < 60.0 {
        format!("{:.2} s", secs)
    } else {
        format!("{:.2} min", secs / 60.0)
    }
}
