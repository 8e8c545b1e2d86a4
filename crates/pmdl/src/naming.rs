//! Sidecar file names and their ordering.

use std::cmp::Ordering;
use std::path::Path;

use pmdl_subparts::SUBPART_EXTENSION;

/// File extension used for exported parts.
pub const PART_EXTENSION: &str = "part";

/// `{stem}_part_{NN}.part`
pub fn part_file_name(stem: &str, part: usize) -> String {
    format!("{stem}_part_{part:02}.{PART_EXTENSION}")
}

/// `{stem}_part_{NN}_subpart_{NN}.subpart`
pub fn subpart_file_name(stem: &str, part: usize, subpart: usize) -> String {
    format!("{stem}_part_{part:02}_subpart_{subpart:02}.{SUBPART_EXTENSION}")
}

/// File stem of `path`, or `"model"` when it has none.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Text(String),
    // Leading zeros stripped; shorter runs are smaller numbers.
    Number { digits: usize, value: String },
}

fn natural_key(s: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut rest = s;

    while let Some(first) = rest.chars().next() {
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);

        chunks.push(if is_digit {
            let value = run.trim_start_matches('0');
            Chunk::Number {
                digits: value.len(),
                value: value.to_string(),
            }
        } else {
            Chunk::Text(run.to_lowercase())
        });
        rest = tail;
    }

    chunks
}

/// Compare two names with digit runs ordered numerically and text ordered
/// case-insensitively, so `x_2` sorts before `x_10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Sort paths by file name in natural order.
pub fn sort_natural<P: AsRef<Path>>(paths: &mut [P]) {
    paths.sort_by(|a, b| {
        let a = a.as_ref().file_name().unwrap_or_default().to_string_lossy();
        let b = b.as_ref().file_name().unwrap_or_default().to_string_lossy();
        natural_cmp(&a, &b)
    });
}
