// src/model.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Identifies a control-flow branch, e.g. `0x0805044b`
pub type BranchKey = String;

/// Identifies one input sample by its file name
pub type SampleId = String;

/// Per-sample counter stored under a branch
pub type Count = usize;

/// Samples registered at one branch, ordered by id
pub type Postings = BTreeMap<SampleId, Count>;

/// Samples selected to stay in the menagerie
pub type KeepSet = BTreeSet<SampleId>;

/// How branch keys are ordered when the index is traversed
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    /// Byte-wise comparison of the key text; only meaningful for fixed-width keys
    #[default]
    Lexical,
    /// Compare keys as unsigned integers (`0x` hex or decimal)
    Numeric,
}

impl KeyOrder {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            KeyOrder::Lexical => a.cmp(b),
            KeyOrder::Numeric => match (parse_address(a), parse_address(b)) {
                (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.cmp(b),
            },
        }
    }
}

fn parse_address(key: &str) -> Option<u64> {
    match key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => key.parse().ok(),
    }
}

/// What a finished run amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Minimized,
    NothingToMinimize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSample {
    pub sample: SampleId,
    pub reason: String,
}

/// Summary of one minimization run, written as JSON on request
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub menagerie: PathBuf,
    pub key_order: KeyOrder,
    pub total_files: usize,
    pub valid_samples: usize,
    pub traced_samples: usize,
    pub skipped: Vec<SkippedSample>,
    pub branches: usize,
    pub keep: Vec<SampleId>,
    pub discard: Vec<SampleId>,
    pub moved_to: Option<PathBuf>,
    pub outcome: Outcome,
}
