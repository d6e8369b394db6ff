//! Streaming line producer → parser → collector chain.
//!
//! The original (`connector.hpp`, `pipeline.hpp`) wires this up as a chain
//! of polymorphic `Connector` objects passing `Buffer`s downstream. In Rust
//! that virtual-dispatch chain buys nothing: a parser is just a function
//! `(line_no, &str) -> Option<Record>`, and the whole pipeline collapses
//! into folding a line iterator through it. See `SPEC_FULL.md` §9.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// Read `path` line by line, feed each `(1-based line number, line)` pair
/// through `parse`, and collect every `Some` result. Lines failing to parse
/// are silently dropped — this is the CSV parsers' "drop malformed rows"
/// contract, not a build failure.
pub fn collect_lines<T>(path: &Path, mut parse: impl FnMut(usize, &str) -> Option<T>) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if let Some(record) = parse(i + 1, &line) {
            out.push(record);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn collects_only_successfully_parsed_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "1").unwrap();
        writeln!(tmp, "skip").unwrap();
        writeln!(tmp, "3").unwrap();

        let out = collect_lines(tmp.path(), |_, line| line.parse::<u32>().ok()).unwrap();
        assert_eq!(out, vec![1, 3]);
    }

    #[test]
    fn line_numbers_are_one_based() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "a").unwrap();
        writeln!(tmp, "b").unwrap();

        let out = collect_lines(tmp.path(), |n, _| Some(n)).unwrap();
        assert_eq!(out, vec![1, 2]);
    }
}
