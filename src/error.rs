// src/error.rs

use crate::model::SampleId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of the index persistence backend. Fatal to the run.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index storage at {path} failed")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt index record at {path}:{line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// A trace could not be produced or read. Distinct from an empty trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("no trace found at {0}")]
    Missing(PathBuf),
    #[error("failed to read trace {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to launch {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DistillError {
    #[error("menagerie {0} contains no files")]
    NoSamples(PathBuf),
    #[error("no valid capture files found in {0}")]
    NoValidSamples(PathBuf),
    #[error("tracing {sample} failed")]
    Trace {
        sample: SampleId,
        #[source]
        source: TraceError,
    },
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("run interrupted")]
    Interrupted,
}

pub type Result<T, E = DistillError> = std::result::Result<T, E>;
