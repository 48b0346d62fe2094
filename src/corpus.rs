// src/corpus.rs

use crate::error::{DistillError, Result};
use crate::model::SampleId;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory inside the menagerie that receives discarded samples
pub const DISCARD_DIR: &str = "to_remove";

/// Regular files directly inside `dir`, in natural order.
pub fn list_samples(dir: &Path) -> Result<Vec<SampleId>> {
    let io_err = |source| DistillError::Io { context: format!("cannot list {}", dir.display()), source };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => log::warn!("skipping non UTF-8 file name {name:?}"),
        }
    }
    natural_sort(&mut names);
    Ok(names)
}

/// Sorts names the way humans expect: `cap2` before `cap10`.
pub fn natural_sort(names: &mut [String]) {
    names.sort_by(|a, b| natural_cmp(a, b));
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum Chunk<'a> {
    Number(u128, &'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(first) = rest.chars().next() {
        let digits = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        out.push(match chunk.parse::<u128>() {
            Ok(n) if digits => Chunk::Number(n, chunk),
            _ => Chunk::Text(chunk),
        });
        rest = tail;
    }
    out
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    chunks(a).cmp(&chunks(b)).then_with(|| a.cmp(b))
}

/// Moves every discarded sample into `dir/to_remove` and returns that directory.
pub fn relocate(dir: &Path, discard: &[SampleId]) -> Result<PathBuf> {
    let target = dir.join(DISCARD_DIR);
    fs::create_dir_all(&target).map_err(|source| DistillError::Io {
        context: format!("cannot create {}", target.display()),
        source,
    })?;

    for sample in discard {
        let from = dir.join(sample);
        let to = target.join(sample);
        fs::rename(&from, &to).map_err(|source| DistillError::Io {
            context: format!("cannot move {} to {}", from.display(), to.display()),
            source,
        })?;
    }
    Ok(target)
}
