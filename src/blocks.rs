//! IPv4 ranges tied to a row index into a sibling table (locations or ASNs).
//! Ported from `blocks.hpp`.

use anyhow::Result;

use crate::csv::{csv_split, to_u};
use crate::errors::rel_assert;
use crate::serialization::{BinaryWriter, MappedVector, MemoryFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start_ip: u32,
    pub end_ip: u32,
    pub loc: u32,
}

/// Zero-copy view over a sorted, non-overlapping run of `Block`s.
pub struct BlockTable<'a> {
    pub start_ip: MappedVector<'a, u32>,
    pub end_ip: MappedVector<'a, u32>,
    pub loc: MappedVector<'a, u32>,
}

impl<'a> BlockTable<'a> {
    pub fn load(file: &mut MemoryFile<'a>) -> Result<Self> {
        let start_ip = file.load_mapped_vector::<u32>()?;
        let end_ip = file.load_mapped_vector::<u32>()?;
        let loc = file.load_mapped_vector::<u32>()?;
        Ok(Self { start_ip, end_ip, loc })
    }

    pub fn len(&self) -> usize {
        self.start_ip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse one `blocks.csv` line into a `Block`, skipping the first two lines
/// (MaxMind header + blank) and any line that doesn't have exactly 3
/// fields. `line_no` is 1-based within the file.
pub fn parse_block_line(line_no: usize, line: &str) -> Option<Block> {
    if line_no < 3 {
        return None;
    }

    let toks = csv_split(line);
    if toks.len() != 3 {
        return None;
    }

    Some(Block {
        start_ip: to_u(toks[0]),
        end_ip: to_u(toks[1]),
        loc: to_u(toks[2]),
    })
}

/// Verify `blocks` is strictly sorted with no overlaps, then write it as
/// three parallel `u32` chunks (start_ip, end_ip, loc).
pub fn save_blocks(writer: &mut BinaryWriter, blocks: &[Block]) -> Result<()> {
    let mut start_ip = Vec::with_capacity(blocks.len());
    let mut end_ip = Vec::with_capacity(blocks.len());
    let mut loc = Vec::with_capacity(blocks.len());

    let mut last = 0u32;
    for block in blocks {
        rel_assert!(
            block.start_ip > last,
            "blocks not strictly sorted: start_ip {} does not exceed previous end_ip {}",
            block.start_ip,
            last
        );
        rel_assert!(
            block.end_ip >= block.start_ip,
            "block end_ip {} precedes start_ip {}",
            block.end_ip,
            block.start_ip
        );

        start_ip.push(block.start_ip);
        end_ip.push(block.end_ip);
        loc.push(block.loc);

        last = block.end_ip;
    }

    writer.save_pod_vector(&start_ip)?;
    writer.save_pod_vector(&end_ip)?;
    writer.save_pod_vector(&loc)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_blank_lines_are_skipped() {
        assert_eq!(parse_block_line(1, "startIpNum,endIpNum,locId"), None);
        assert_eq!(parse_block_line(2, ""), None);
    }

    #[test]
    fn valid_line_parses() {
        let b = parse_block_line(3, "16777216,16777471,1").unwrap();
        assert_eq!(b, Block { start_ip: 16777216, end_ip: 16777471, loc: 1 });
    }

    #[test]
    fn wrong_field_count_is_dropped() {
        assert_eq!(parse_block_line(3, "16777216,16777471"), None);
        assert_eq!(parse_block_line(3, "16777216,16777471,1,extra"), None);
    }
}
