// src/tracer.rs

//! Producers of branch traces and judges of sample validity.
//!
//! Both shell out to external tools; nothing here touches the coverage index.

use crate::error::TraceError;
use crate::ingest::read_trace;
use crate::model::BranchKey;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// File the pintool writes its branch trace to, relative to its working directory
pub const PINTOOL_OUTPUT: &str = "MyPinTool.out";

/// Yields the ordered branch trace of one sample
pub trait TraceSource {
    fn trace(&mut self, sample: &Path) -> Result<Vec<BranchKey>, TraceError>;
}

/// Runs TShark under Pin and reads back the branch trace the pintool wrote.
pub struct PinTracer {
    pub pin: PathBuf,
    pub pintool: PathBuf,
    pub tshark: PathBuf,
    /// Disable address space randomization through `setarch -R`
    pub setarch: bool,
    /// Working directory of the traced process; holds the pintool output
    pub workdir: PathBuf,
}

impl PinTracer {
    pub fn output_path(&self) -> PathBuf {
        self.workdir.join(PINTOOL_OUTPUT)
    }

    fn command(&self, sample: &Path) -> Command {
        let mut cmd = if self.setarch {
            let mut cmd = Command::new("setarch");
            cmd.arg(std::env::consts::ARCH).arg("-R").arg(&self.pin);
            cmd
        } else {
            Command::new(&self.pin)
        };
        cmd.arg("-injection")
            .arg("child")
            .arg("-t")
            .arg(&self.pintool)
            .arg("--")
            .arg(&self.tshark)
            .arg("-nVxr")
            .arg(sample)
            .current_dir(&self.workdir)
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl TraceSource for PinTracer {
    fn trace(&mut self, sample: &Path) -> Result<Vec<BranchKey>, TraceError> {
        let output = self.output_path();
        // a leftover trace from the previous sample must never be read back
        match fs::remove_file(&output) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(TraceError::Read { path: output, source }),
        }

        let program = if self.setarch { "setarch".to_string() } else { self.pin.display().to_string() };
        let status = self
            .command(sample)
            .status()
            .map_err(|source| TraceError::Spawn { program, source })?;
        // TShark exits non-zero on captures it dislikes; the trace is still valid.
        if !status.success() {
            log::debug!("{} exited with {status}", sample.display());
        }

        read_trace(&output)
    }
}

/// Reads traces recorded ahead of time as `<dir>/<sample file name>.trace`.
pub struct RecordedTraces {
    pub dir: PathBuf,
}

impl RecordedTraces {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn trace_path(&self, sample: &Path) -> PathBuf {
        let mut name = sample.file_name().unwrap_or(sample.as_os_str()).to_os_string();
        name.push(".trace");
        self.dir.join(name)
    }
}

impl TraceSource for RecordedTraces {
    fn trace(&mut self, sample: &Path) -> Result<Vec<BranchKey>, TraceError> {
        read_trace(&self.trace_path(sample))
    }
}

/// Decides whether a file is an input the target program accepts
pub trait SampleValidator: Sync {
    fn is_valid(&self, path: &Path) -> bool;
}

/// Accepts a file iff `capinfos` can read it.
pub struct Capinfos {
    pub binary: PathBuf,
}

impl Capinfos {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// `capinfos` from the same directory as `tshark`.
    pub fn beside(tshark: &Path) -> Self {
        let dir = tshark.parent().unwrap_or_else(|| Path::new(""));
        Self::new(dir.join("capinfos"))
    }
}

impl SampleValidator for Capinfos {
    fn is_valid(&self, path: &Path) -> bool {
        Command::new(&self.binary)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

pub struct AcceptAll;

impl SampleValidator for AcceptAll {
    fn is_valid(&self, path: &Path) -> bool {
        path.is_file()
    }
}
