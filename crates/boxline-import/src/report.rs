//! Progress and complaint sinks.
//!
//! A run narrates to two append-only streams: the report (what happened) and
//! the complaints (what was skipped or failed). Sinks never fail the run; a
//! write error is logged and dropped.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

pub trait Reporter {
    fn report(&mut self, msg: &str);
    fn complain(&mut self, msg: &str);

    /// Flush and close. Called once at the end of a run.
    fn finish(&mut self) {}
}

/// Writes the two streams to files, optionally mirroring to the console.
pub struct FileReporter {
    report_file: BufWriter<File>,
    error_file: BufWriter<File>,
    mirror: bool,
}

impl FileReporter {
    /// Truncate (or create) both files.
    pub fn open(report_path: &Path, error_path: &Path, mirror: bool) -> Result<Self> {
        for path in [report_path, error_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(Self {
            report_file: BufWriter::new(File::create(report_path)?),
            error_file: BufWriter::new(File::create(error_path)?),
            mirror,
        })
    }
}

impl Reporter for FileReporter {
    fn report(&mut self, msg: &str) {
        if let Err(err) = writeln!(self.report_file, "{msg}") {
            tracing::warn!(error = %err, "failed writing report line");
        }
        if self.mirror {
            println!("{msg}");
        }
    }

    fn complain(&mut self, msg: &str) {
        if let Err(err) = writeln!(self.error_file, "{msg}") {
            tracing::warn!(error = %err, "failed writing complaint line");
        }
        if self.mirror {
            eprintln!("{msg}");
        }
    }

    fn finish(&mut self) {
        for (stream, file) in [
            ("report", &mut self.report_file),
            ("error", &mut self.error_file),
        ] {
            if let Err(err) = file.flush() {
                tracing::warn!(stream, error = %err, "failed flushing stream");
            }
        }
    }
}

impl Drop for FileReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    pub reports: Vec<String>,
    pub complaints: Vec<String>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, msg: &str) {
        self.reports.push(msg.to_string());
    }

    fn complain(&mut self, msg: &str) {
        self.complaints.push(msg.to_string());
    }
}
