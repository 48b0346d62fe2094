// src/ingest.rs

use crate::error::TraceError;
use crate::index::CoverageIndex;
use crate::model::BranchKey;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Registers every branch of one sample's trace and returns the trace length.
pub fn ingest<I, S>(index: &mut CoverageIndex, sample: &str, trace: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut length = 0;
    for branch in trace {
        index.register(branch.as_ref(), sample);
        length += 1;
    }
    length
}

/// Reads a trace artifact: one branch key per line, surrounding whitespace
/// trimmed, blank lines dropped.
pub fn read_trace(path: &Path) -> Result<Vec<BranchKey>, TraceError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => TraceError::Missing(path.to_path_buf()),
        _ => TraceError::Read { path: path.to_path_buf(), source },
    })?;

    let mut branches = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| TraceError::Read { path: path.to_path_buf(), source })?;
        let key = line.trim();
        if !key.is_empty() {
            branches.push(key.to_owned());
        }
    }
    Ok(branches)
}
