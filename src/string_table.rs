//! Build-time string interning. Ported from `string_table.hpp`: a hash map
//! for dedup, plus the same two parallel vectors (`indices`, `strings`) the
//! on-disk format expects, so `save` is a direct write of owned state.

use ahash::RandomState;
use hashbrown::HashMap;

use crate::serialization::BinaryWriter;
use anyhow::Result;

pub const NOT_FOUND: u32 = u32::MAX;

pub struct StringTable {
    string_to_id: HashMap<String, u32, RandomState>,
    indices: Vec<u32>,
    strings: Vec<u8>,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            string_to_id: HashMap::with_hasher(RandomState::new()),
            indices: Vec::new(),
            strings: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.indices.len()
    }

    pub fn byte_size(&self) -> usize {
        self.strings.len()
    }

    /// Idempotent: inserting a string already present is a no-op.
    pub fn insert(&mut self, s: &str) {
        if self.string_to_id.contains_key(s) {
            return;
        }

        let index = self.indices.len() as u32;
        self.string_to_id.insert(s.to_string(), index);

        self.indices.push(self.strings.len() as u32);
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
    }

    pub fn index_of(&self, s: &str) -> u32 {
        self.string_to_id.get(s).copied().unwrap_or(NOT_FOUND)
    }

    pub fn save(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.save_pod_vector(&self.indices)?;
        writer.save_pod_vector(&self.strings)?;
        Ok(())
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{MappedGeoFile, MemoryFile};
    use tempfile::NamedTempFile;

    #[test]
    fn insert_is_idempotent() {
        let mut t = StringTable::new();
        t.insert("aaaa");
        t.insert("aaaa");
        t.insert("aaaa");

        assert_eq!(t.size(), 1);
        assert_eq!(t.byte_size(), 5);
        assert_eq!(t.index_of("aaaa"), 0);

        t.insert("bbb");
        assert_eq!(t.size(), 2);
        assert_eq!(t.byte_size(), 9);
        assert_eq!(t.index_of("bbb"), 1);
    }

    #[test]
    fn missing_string_returns_sentinel() {
        let t = StringTable::new();
        assert_eq!(t.index_of("nope"), NOT_FOUND);
    }

    #[test]
    fn round_trips_through_the_binary_format() {
        let mut t = StringTable::new();
        t.insert("aaaa");
        t.insert("bbb");
        for i in 0..1000 {
            t.insert(&format!("funky str {i} {} {}", i * 1234, i * 123456));
        }

        let tmp = NamedTempFile::new().unwrap();
        {
            let mut w = BinaryWriter::create(tmp.path()).unwrap();
            w.write_header().unwrap();
            t.save(&mut w).unwrap();
            w.flush().unwrap();
        }

        let mapped = MappedGeoFile::open(tmp.path()).unwrap();
        let mut reader = MemoryFile::new(mapped.bytes());
        reader.read_header().unwrap();
        let mv = reader.load_mapped_string_vector().unwrap();

        assert_eq!(mv.len(), 1002);
        assert_eq!(mv.get(0), "aaaa");
        assert_eq!(mv.get(1), "bbb");
        for i in 0..1000 {
            assert_eq!(mv.get(i + 2), format!("funky str {i} {} {}", i * 1234, i * 123456));
        }
    }
}
