// src/annotate.rs

use crate::index::CoverageIndex;
use crate::model::SampleId;

/// Rewrites every counter as the length of the unbroken ascending run of
/// branches, starting at that branch, on which the sample stays registered.
///
/// Walks the keys once from the highest down, so each counter is derived
/// from the one directly above it.
pub fn annotate(index: &mut CoverageIndex) {
    let descending: Vec<String> = index.branches_desc().into_iter().map(str::to_owned).collect();
    let Some(mut previous) = descending.first().cloned() else {
        return;
    };

    for branch in descending {
        let samples: Vec<SampleId> = match index.samples_at(&branch) {
            Some(postings) => postings.keys().cloned().collect(),
            None => continue,
        };
        for sample in samples {
            // On the highest key `previous == branch` and the counter is still 0.
            let run = index.count(&previous, &sample).map_or(1, |above| above + 1);
            index.set_count(&branch, &sample, run);
        }
        previous = branch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ingest;
    use crate::model::{Count, KeyOrder};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force_run(index: &CoverageIndex, keys: &[&str], start: usize, sample: &str) -> Count {
        keys[start..]
            .iter()
            .take_while(|b| index.samples_at(b).is_some_and(|p| p.contains_key(sample)))
            .count()
    }

    #[test]
    fn three_key_scenario() {
        let mut index = CoverageIndex::default();
        ingest(&mut index, "S1", ["A", "B", "C"]);
        ingest(&mut index, "S2", ["B"]);
        annotate(&mut index);

        assert_eq!(index.count("C", "S1"), Some(1));
        assert_eq!(index.count("B", "S1"), Some(2));
        assert_eq!(index.count("A", "S1"), Some(3));
        assert_eq!(index.count("B", "S2"), Some(1));
    }

    #[test]
    fn gaps_restart_runs() {
        let mut index = CoverageIndex::default();
        ingest(&mut index, "s", ["a", "b", "d", "e", "f"]);
        ingest(&mut index, "t", ["c"]);
        annotate(&mut index);

        assert_eq!(index.count("a", "s"), Some(2));
        assert_eq!(index.count("b", "s"), Some(1));
        assert_eq!(index.count("c", "t"), Some(1));
        assert_eq!(index.count("d", "s"), Some(3));
        assert_eq!(index.count("f", "s"), Some(1));
    }

    #[test]
    fn runs_follow_the_injected_order() {
        let mut index = CoverageIndex::new(KeyOrder::Numeric);
        ingest(&mut index, "s", ["0x9", "0xa", "0x10"]);
        ingest(&mut index, "t", ["0xb"]);
        annotate(&mut index);

        // numeric order: 0x9 < 0xa < 0xb < 0x10
        assert_eq!(index.count("0x9", "s"), Some(2));
        assert_eq!(index.count("0x10", "s"), Some(1));
    }

    #[test]
    fn empty_index_is_a_no_op() {
        let mut index = CoverageIndex::default();
        annotate(&mut index);
        assert!(index.is_empty());
    }

    #[test]
    fn matches_brute_force_on_random_indices() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let mut index = CoverageIndex::default();
            let samples = rng.gen_range(1..6);
            for s in 0..samples {
                let trace: Vec<String> = (0..rng.gen_range(0..30))
                    .map(|_| format!("0x{:04x}", rng.gen_range(0..24)))
                    .collect();
                ingest(&mut index, &format!("s{s}"), trace);
            }
            annotate(&mut index);

            let keys = index.branches();
            for (i, branch) in keys.iter().enumerate() {
                for (sample, &count) in index.samples_at(branch).unwrap() {
                    assert_eq!(count, brute_force_run(&index, &keys, i, sample), "{branch} {sample}");
                }
            }
        }
    }
}
