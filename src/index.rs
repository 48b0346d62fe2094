// src/index.rs

//! Per-branch, per-sample coverage counters.
//!
//! Branch order is never taken from `String`'s `Ord` directly: every sorted
//! traversal goes through the index's [`KeyOrder`].

use crate::error::IndexError;
use crate::model::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Default)]
pub struct CoverageIndex {
    entries: HashMap<BranchKey, Postings>,
    order: KeyOrder,
}

/// One line of a saved index
#[derive(Serialize, Deserialize)]
struct Record {
    branch: BranchKey,
    samples: Postings,
}

impl CoverageIndex {
    pub fn new(order: KeyOrder) -> Self {
        Self { entries: HashMap::new(), order }
    }

    /// Returns the postings for `branch`, creating an empty set on first use.
    pub fn get_or_create(&mut self, branch: &str) -> &mut Postings {
        self.entries.entry(branch.to_owned()).or_default()
    }

    /// Records that `sample` visited `branch`. An existing counter is left alone.
    pub fn register(&mut self, branch: &str, sample: &str) {
        let postings = self.get_or_create(branch);
        if !postings.contains_key(sample) {
            postings.insert(sample.to_owned(), 0);
        }
    }

    /// Overwrites the counter of a registered pair. Returns `false` if the pair is unknown.
    pub fn set_count(&mut self, branch: &str, sample: &str, value: Count) -> bool {
        match self.entries.get_mut(branch).and_then(|p| p.get_mut(sample)) {
            Some(count) => {
                *count = value;
                true
            }
            None => false,
        }
    }

    pub fn count(&self, branch: &str, sample: &str) -> Option<Count> {
        self.entries.get(branch)?.get(sample).copied()
    }

    pub fn samples_at(&self, branch: &str) -> Option<&Postings> {
        self.entries.get(branch)
    }

    /// All branch keys, ascending under the index's key order.
    pub fn branches(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable_by(|a, b| self.order.compare(a, b));
        keys
    }

    pub fn branches_desc(&self) -> Vec<&str> {
        let mut keys = self.branches();
        keys.reverse();
        keys
    }

    pub fn total_branch_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of registered (branch, sample) pairs.
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the index as JSON lines, one branch per line, in ascending key order.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let storage = |source| IndexError::Storage { path: path.to_path_buf(), source };
        let mut out = BufWriter::new(File::create(path).map_err(storage)?);

        for branch in self.branches() {
            let record = Record {
                branch: branch.to_owned(),
                samples: self.entries[branch].clone(),
            };
            serde_json::to_writer(&mut out, &record).map_err(|e| storage(e.into()))?;
            out.write_all(b"\n").map_err(storage)?;
        }
        out.flush().map_err(storage)
    }

    pub fn load(path: &Path, order: KeyOrder) -> Result<Self, IndexError> {
        let storage = |source| IndexError::Storage { path: path.to_path_buf(), source };
        let reader = BufReader::new(File::open(path).map_err(storage)?);

        let mut index = Self::new(order);
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(storage)?;
            if line.trim().is_empty() {
                continue;
            }
            let corrupt = |reason: String, source| IndexError::Corrupt {
                path: path.to_path_buf(),
                line: i + 1,
                reason,
                source,
            };
            let record: Record =
                serde_json::from_str(&line).map_err(|e| corrupt(e.to_string(), Some(e)))?;
            // a branch exists only if some sample registered it, and appears once
            if record.samples.is_empty() {
                return Err(corrupt(format!("branch {} has no samples", record.branch), None));
            }
            if index.entries.contains_key(&record.branch) {
                return Err(corrupt(format!("branch {} appears twice", record.branch), None));
            }
            index.entries.insert(record.branch, record.samples);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_creates_branch_with_zero_count() {
        let mut index = CoverageIndex::default();
        index.register("0x10", "a.pcap");

        assert_eq!(index.total_branch_count(), 1);
        assert_eq!(index.count("0x10", "a.pcap"), Some(0));
        assert_eq!(index.count("0x10", "b.pcap"), None);
        assert_eq!(index.count("0x20", "a.pcap"), None);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut index = CoverageIndex::default();
        index.register("0x10", "a.pcap");
        index.register("0x10", "a.pcap");
        assert_eq!(index.count("0x10", "a.pcap"), Some(0));
        assert_eq!(index.pair_count(), 1);

        assert!(index.set_count("0x10", "a.pcap", 7));
        index.register("0x10", "a.pcap");
        assert_eq!(index.count("0x10", "a.pcap"), Some(7));
    }

    #[test]
    fn set_count_does_not_create_pairs() {
        let mut index = CoverageIndex::default();
        index.register("0x10", "a.pcap");
        assert!(!index.set_count("0x10", "b.pcap", 3));
        assert!(!index.set_count("0x20", "a.pcap", 3));
        assert_eq!(index.total_branch_count(), 1);
        assert_eq!(index.pair_count(), 1);
    }

    #[test]
    fn branches_follow_key_order() {
        let keys = ["0x9", "0x10", "0xa"];

        let mut lexical = CoverageIndex::new(KeyOrder::Lexical);
        let mut numeric = CoverageIndex::new(KeyOrder::Numeric);
        for key in keys {
            lexical.register(key, "s");
            numeric.register(key, "s");
        }

        assert_eq!(lexical.branches(), vec!["0x10", "0x9", "0xa"]);
        assert_eq!(numeric.branches(), vec!["0x9", "0xa", "0x10"]);
        assert_eq!(numeric.branches_desc(), vec!["0x10", "0xa", "0x9"]);
    }

    #[test]
    fn samples_at_lists_postings() {
        let mut index = CoverageIndex::default();
        index.register("b", "s2");
        index.register("b", "s1");

        let ids: Vec<&str> = index.samples_at("b").unwrap().keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert!(index.samples_at("c").is_none());
    }

    #[test]
    fn save_and_load_preserve_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.jsonl");

        let mut index = CoverageIndex::new(KeyOrder::Numeric);
        index.register("0x2", "a");
        index.register("0x1", "a");
        index.register("0x1", "b");
        index.set_count("0x1", "a", 2);
        index.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().next().unwrap().contains("\"0x1\""));

        let loaded = CoverageIndex::load(&path, KeyOrder::Numeric).unwrap();
        assert_eq!(loaded.total_branch_count(), 2);
        assert_eq!(loaded.count("0x1", "a"), Some(2));
        assert_eq!(loaded.count("0x1", "b"), Some(0));
        assert_eq!(loaded.count("0x2", "a"), Some(0));
    }

    #[test]
    fn load_reports_storage_and_corruption_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = CoverageIndex::load(&dir.path().join("nope"), KeyOrder::Lexical);
        assert!(matches!(missing, Err(IndexError::Storage { .. })));

        let cases = [
            ("{\"branch\":\"a\",\"samples\":{\"s\":1}}\nnot json\n", 2, true),
            ("{\"branch\":\"a\",\"samples\":{}}\n", 1, false),
            ("{\"branch\":\"a\",\"samples\":{\"s\":1}}\n\n{\"branch\":\"a\",\"samples\":{\"t\":1}}\n", 3, false),
        ];
        let path = dir.path().join("bad.jsonl");
        for (text, expected_line, from_json) in cases {
            std::fs::write(&path, text).unwrap();
            match CoverageIndex::load(&path, KeyOrder::Lexical) {
                Err(IndexError::Corrupt { line, source, .. }) => {
                    assert_eq!(line, expected_line, "{text}");
                    assert_eq!(source.is_some(), from_json, "{text}");
                }
                other => panic!("expected corrupt record for {text:?}, got {other:?}"),
            }
        }
    }
}
