//! Binary writer (build side) and memory-mapped reader (query side) for the
//! `PODV`-chunked geodata file format. See `SPEC_FULL.md` §4.1.
//!
//! All multibyte integers are written host-endian; the 32-byte header
//! records which endian that was, and the reader refuses to load a file
//! written on the other endian. No byte-swapping path exists, by design.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::rel_assert;

pub const CHUNK_TAG: &[u8; 4] = b"PODV";
const HEADER_LEN: usize = 32;

pub fn host_endian_name() -> &'static str {
    if cfg!(target_endian = "little") {
        "little"
    } else {
        "big"
    }
}

/// Build a 32-byte ASCII header: `geoloc loadzero v001 <endian> -...-\n`.
pub fn build_header() -> [u8; HEADER_LEN] {
    let mut buf = [b'-'; HEADER_LEN];
    let prefix = format!("geoloc loadzero v001 {} ", host_endian_name());
    let bytes = prefix.as_bytes();

    let n = bytes.len().min(HEADER_LEN - 1);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf[HEADER_LEN - 1] = b'\n';
    buf
}

/// Any type written verbatim into a `PODV` chunk. Implementors must be
/// plain-old-data: fixed size, no padding-sensitive invariants, safe to
/// reinterpret from raw little/native-endian bytes.
pub trait Pod: Sized + Copy {
    const SIZE: usize;
    fn read_from(bytes: &[u8]) -> Self;
    fn write_to(&self, out: &mut Vec<u8>);
}

impl Pod for u32 {
    const SIZE: usize = 4;
    fn read_from(bytes: &[u8]) -> Self {
        u32::from_ne_bytes(bytes[..4].try_into().unwrap())
    }
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

impl Pod for u8 {
    const SIZE: usize = 1;
    fn read_from(bytes: &[u8]) -> Self {
        bytes[0]
    }
    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

/// Sequential writer for the geodata binary. Wraps a `BufWriter<File>` the
/// way the original `BinaryFile` wraps a `FILE*`.
pub struct BinaryWriter {
    file: BufWriter<File>,
}

impl BinaryWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("could not open {} for writing", path.display()))?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }

    pub fn write_header(&mut self) -> Result<()> {
        let header = build_header();
        self.file.write_all(&header)?;
        Ok(())
    }

    fn offset(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn pad_to_4(&mut self) -> Result<()> {
        let off = self.offset()?;
        let padded = (off + 3) & !3;
        let pad_bytes = (padded - off) as usize;
        self.file.write_all(&[0u8; 4][..pad_bytes])?;
        Ok(())
    }

    /// Write one `PODV` chunk: tag, length, count, payload, then pad to a
    /// 4-byte boundary.
    pub fn save_pod_vector<T: Pod>(&mut self, items: &[T]) -> Result<()> {
        let mut payload = Vec::with_capacity(4 + items.len() * T::SIZE);
        payload.write_u32::<NativeEndian>(items.len() as u32)?;
        for item in items {
            item.write_to(&mut payload);
        }

        self.file.write_all(CHUNK_TAG)?;
        self.file.write_u32::<NativeEndian>(payload.len() as u32)?;
        self.file.write_all(&payload)?;
        self.pad_to_4()?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// A read-only, zero-copy view over a `u32`-prefixed run of `T` inside the
/// memory map. Mirrors the original `MappedVector<T>` / `RawMappedVector<T>`
/// pair without any unsafe reinterpretation: values are decoded on access.
pub struct MappedVector<'a, T: Pod> {
    bytes: &'a [u8],
    len: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: Pod> MappedVector<'a, T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> T {
        let start = i * T::SIZE;
        T::read_from(&self.bytes[start..start + T::SIZE])
    }

    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}

/// Reads chunks off the memory-mapped file in the fixed document order
/// defined by `SPEC_FULL.md` §4.1. Every `load_*` call advances `offset`
/// past one complete, 4-byte-padded chunk.
pub struct MemoryFile<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> MemoryFile<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn read_header(&mut self) -> Result<()> {
        if self.data.len() < HEADER_LEN {
            bail!("file too short to contain a header");
        }

        let header = std::str::from_utf8(&self.data[..HEADER_LEN])
            .context("header is not valid UTF-8")?;
        let toks = crate::csv::char_split(header, ' ');

        if toks.len() != 5 {
            bail!("header is corrupt - {header:?}");
        }

        check_header_token("header1", toks[0], "geoloc")?;
        check_header_token("header2", toks[1], "loadzero")?;
        check_header_token("version", toks[2], "v001")?;
        check_header_token("endian", toks[3], host_endian_name())?;

        self.offset = HEADER_LEN;
        Ok(())
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    pub fn aligned(&self) -> bool {
        self.offset % 4 == 0
    }

    pub fn load_mapped_vector<T: Pod>(&mut self) -> Result<MappedVector<'a, T>> {
        rel_assert!(self.aligned(), "offset {} not 4-byte aligned", self.offset);

        let chunk = self.remaining();
        if chunk.len() < 8 {
            bail!("truncated chunk: not enough bytes for tag+length");
        }

        if &chunk[0..4] != CHUNK_TAG {
            bail!("bad chunk tag at offset {}", self.offset);
        }

        let length = (&chunk[4..8]).read_u32::<NativeEndian>()? as usize;
        let payload_start = 8;
        if chunk.len() < payload_start + length {
            bail!("truncated chunk: declared length {length} exceeds remaining bytes");
        }

        let payload = &chunk[payload_start..payload_start + length];
        if payload.len() < 4 {
            bail!("truncated chunk: missing element count");
        }

        let count = (&payload[0..4]).read_u32::<NativeEndian>()? as usize;
        let elems = &payload[4..];
        let expected = count * T::SIZE;
        if elems.len() < expected {
            bail!("truncated chunk: expected {expected} payload bytes, got {}", elems.len());
        }

        let padded_len = (length + 3) & !3;
        self.offset += payload_start + padded_len;

        Ok(MappedVector {
            bytes: &elems[..expected],
            len: count,
            _marker: std::marker::PhantomData,
        })
    }

    pub fn load_mapped_string_vector(&mut self) -> Result<MappedStringVector<'a>> {
        let indices = self.load_mapped_vector::<u32>()?;
        let strings = self.load_mapped_vector::<u8>()?;
        Ok(MappedStringVector { indices, strings })
    }
}

fn check_header_token(name: &str, got: &str, expected: &str) -> Result<()> {
    if got != expected {
        bail!("header {name} expecting {expected} got {got}");
    }
    Ok(())
}

/// Paired (offsets, bytes) view reproducing the `StringTable` on-disk
/// layout: `indices[i]` is the byte offset of the i-th string within
/// `strings`, each string NUL-terminated.
pub struct MappedStringVector<'a> {
    indices: MappedVector<'a, u32>,
    strings: MappedVector<'a, u8>,
}

impl<'a> MappedStringVector<'a> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the `i`-th interned string, reading from its stored offset
    /// until the terminating NUL.
    pub fn get(&self, i: usize) -> &'a str {
        let start = self.indices.get(i) as usize;
        let bytes = self.strings.bytes;
        let mut end = start;
        while end < bytes.len() && bytes[end] != 0 {
            end += 1;
        }
        std::str::from_utf8(&bytes[start..end]).unwrap_or("")
    }
}

/// A memory-mapped geodata file. Owns the mapping; every table view
/// obtained from it borrows for `'a`, tied to this struct's lifetime.
pub struct MappedGeoFile {
    mmap: memmap2::Mmap,
}

impl MappedGeoFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("could not open {} for reading", path.display()))?;
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .with_context(|| format!("could not mmap {}", path.display()))?;
        Ok(Self { mmap })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap[..]
    }
}
