// src/select.rs

use crate::index::CoverageIndex;
use crate::model::{KeepSet, SampleId};
use std::collections::HashSet;

/// Result of the greedy cover pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No branch was ever registered, so there is nothing to minimize.
    Empty,
    Cover {
        keep: KeepSet,
        /// Iterations of the main loop; never exceeds the branch count.
        steps: usize,
    },
}

impl Selection {
    pub fn into_keep(self) -> KeepSet {
        match self {
            Selection::Empty => KeepSet::new(),
            Selection::Cover { keep, .. } => keep,
        }
    }
}

/// Greedy jump cover over the ascending branch sequence of an annotated index.
///
/// At each uncovered position the sample with the longest run from there is
/// kept (smallest id on ties) and the cursor jumps past that run.
pub fn select(index: &CoverageIndex) -> Selection {
    let keys = index.branches();
    let total = keys.len();
    if total == 0 {
        return Selection::Empty;
    }

    let mut keep = KeepSet::new();
    let mut position = 0;
    let mut steps = 0;
    while position < total {
        steps += 1;
        let best = index.samples_at(keys[position]).and_then(|postings| {
            postings
                .iter()
                .fold(None, |best: Option<(&SampleId, usize)>, (sample, &count)| match best {
                    Some((_, top)) if top >= count => best,
                    _ => Some((sample, count)),
                })
        });

        match best {
            Some((sample, run)) => {
                keep.insert(sample.clone());
                // an unannotated counter is 0; still step past this branch
                position += run.max(1);
            }
            None => position += 1,
        }
    }

    Selection::Cover { keep, steps }
}

/// Samples not in `keep`, in their original order and without repeats.
pub fn discard(samples: &[SampleId], keep: &KeepSet) -> Vec<SampleId> {
    let mut seen = HashSet::new();
    samples
        .iter()
        .filter(|s| !keep.contains(*s) && seen.insert(s.as_str()))
        .cloned()
        .collect()
}
