//! Autonomous-system records, both parsed (`Asn`) and packed (`PackedAsn`)
//! representations. Ported from `asns.hpp`.

use ahash::RandomState;
use anyhow::Result;
use hashbrown::HashMap;

use crate::blocks::{save_blocks, Block};
use crate::csv::{csv_split, to_u};
use crate::serialization::{BinaryWriter, MappedStringVector, MappedVector, MemoryFile, Pod};
use crate::string_table::StringTable;

#[derive(Debug, Clone)]
pub struct Asn {
    pub start_ip: u32,
    pub end_ip: u32,
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PackedAsn {
    pub number: u32,
    pub text: u32,
}

impl Pod for PackedAsn {
    const SIZE: usize = 8;

    fn read_from(bytes: &[u8]) -> Self {
        Self {
            number: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            text: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.number.to_ne_bytes());
        out.extend_from_slice(&self.text.to_ne_bytes());
    }
}

pub struct AsnTable<'a> {
    pub text: MappedStringVector<'a>,
    pub asns: MappedVector<'a, PackedAsn>,
}

impl<'a> AsnTable<'a> {
    pub fn load(file: &mut MemoryFile<'a>) -> Result<Self> {
        let text = file.load_mapped_string_vector()?;
        let asns = file.load_mapped_vector::<PackedAsn>()?;
        Ok(Self { text, asns })
    }
}

/// Split `"AS<number> <text>"` into its parts. The `AS` prefix is required;
/// the first space separates `number` from `text`. A missing space yields
/// an empty `text`.
fn parse_asn_text(s: &str) -> Option<(u32, String)> {
    if s.len() <= 2 {
        return None;
    }

    let rest = &s[2..];
    match rest.find(' ') {
        Some(pos) => Some((to_u(&rest[..pos]), rest[pos + 1..].to_string())),
        None => Some((to_u(rest), String::new())),
    }
}

/// Parse one `asnum.csv` line into an `Asn`. No header skip. Expects 3
/// fields; the third is `"AS<number> <text>"`.
pub fn parse_asn_line(line: &str) -> Option<Asn> {
    let toks = csv_split(line);
    if toks.len() != 3 {
        return None;
    }

    let (number, text) = parse_asn_text(toks[2])?;

    Some(Asn {
        start_ip: to_u(toks[0]),
        end_ip: to_u(toks[1]),
        number,
        text,
    })
}

/// Deduplicate by AS number, intern each unique description, then rebuild
/// the IP-range blocks pointing at the deduplicated packed rows.
pub fn save_asns(writer: &mut BinaryWriter, asns: &[Asn]) -> Result<()> {
    let mut asn_to_idx: HashMap<u32, u32, RandomState> = HashMap::with_hasher(RandomState::new());
    let mut packed_asns = Vec::new();
    let mut text = StringTable::new();

    for asn in asns {
        if asn_to_idx.contains_key(&asn.number) {
            continue;
        }

        text.insert(&asn.text);

        let idx = packed_asns.len() as u32;
        packed_asns.push(PackedAsn {
            number: asn.number,
            text: text.index_of(&asn.text),
        });
        asn_to_idx.insert(asn.number, idx);
    }

    let asn_blocks: Vec<Block> = asns
        .iter()
        .map(|asn| Block {
            start_ip: asn.start_ip,
            end_ip: asn.end_ip,
            loc: asn_to_idx[&asn.number],
        })
        .collect();

    save_blocks(writer, &asn_blocks)?;
    text.save(writer)?;
    writer.save_pod_vector(&packed_asns)?;
    Ok(())
}
