//! Query-mode engine: load the mapped geodata file, resolve IPv4 addresses
//! to location/ASN rows via predecessor binary search, and render result
//! lines. Ported from `query.hpp`.

use std::path::Path;

use anyhow::Result;

use crate::asns::AsnTable;
use crate::blocks::BlockTable;
use crate::csv::{char_split, to_u};
use crate::errors::log_context;
use crate::locations::LocationTable;
use crate::serialization::{MappedGeoFile, MemoryFile};

/// Parse a dotted-quad IPv4 address into its 32-bit integer form. Returns
/// `None` if the string doesn't split into exactly four fields; octets
/// beyond 0..=255 are accepted (matching the original's lack of a bounds
/// check — see `SPEC_FULL.md` Open Questions).
pub fn parse_ip(s: &str) -> Option<u32> {
    let toks = char_split(s, '.');
    if toks.len() != 4 {
        return None;
    }

    Some(to_u(toks[0]) << 24 | to_u(toks[1]) << 16 | to_u(toks[2]) << 8 | to_u(toks[3]))
}

/// Render a 32-bit quad back into dotted-quad form.
pub fn quad_to_string(quad: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (quad >> 24) & 0xff,
        (quad >> 16) & 0xff,
        (quad >> 8) & 0xff,
        quad & 0xff
    )
}

/// Predecessor search over a block table's `start_ip`/`end_ip` columns:
/// returns the unique row index `i` with `start_ip[i] <= q <= end_ip[i]`,
/// or `None` if no such row exists.
pub fn block_query(blocks: &BlockTable, quad: u32) -> Option<usize> {
    let n = blocks.len();
    if n == 0 {
        return None;
    }

    // Binary search for the first index whose start_ip exceeds `quad`
    // (upper_bound / partition_point).
    let mut lo = 0usize;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if blocks.start_ip.get(mid) > quad {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    if lo == 0 {
        return None;
    }

    let candidate = lo - 1;
    if quad >= blocks.start_ip.get(candidate) && quad <= blocks.end_ip.get(candidate) {
        Some(candidate)
    } else {
        None
    }
}

/// Borrowed query result: every text field points into the memory map and
/// must not outlive the `GeoData` it was produced from.
pub struct IpResult<'a> {
    pub quad: u32,
    pub country: Option<&'a str>,
    pub region: Option<&'a str>,
    pub city: Option<&'a str>,
    pub lat: f32,
    pub lon: f32,
    pub asn: Option<u32>,
    pub asn_text: Option<&'a str>,
}

/// Owns the memory map and the four logical tables sliced out of it.
pub struct GeoData<'a> {
    location_ip_blocks: BlockTable<'a>,
    location_data: LocationTable<'a>,
    asn_ip_blocks: BlockTable<'a>,
    asn_data: AsnTable<'a>,
}

impl<'a> GeoData<'a> {
    /// Memory-map `path`, validate the header, and load the four tables in
    /// document order.
    pub fn open(path: &Path) -> Result<OpenGeoData> {
        log_context(format!("GeoData open {}", path.display()));

        let mapped = MappedGeoFile::open(path)?;
        Ok(OpenGeoData { mapped })
    }

    pub fn location_block_query(&self, quad: u32) -> Option<usize> {
        block_query(&self.location_ip_blocks, quad)
    }

    /// Resolve one IPv4 address against both the location and ASN interval
    /// indices. Missing location and missing ASN are independent.
    pub fn query(&self, quad: u32) -> IpResult<'a> {
        let mut result = IpResult {
            quad,
            country: None,
            region: None,
            city: None,
            lat: 0.0,
            lon: 0.0,
            asn: None,
            asn_text: None,
        };

        if let Some(block_idx) = block_query(&self.location_ip_blocks, quad) {
            let loc_idx = self.location_ip_blocks.loc.get(block_idx) as usize;
            let loc = self.location_data.locations.get(loc_idx);

            result.country = Some(self.location_data.country.get(loc.country as usize));
            result.region = Some(self.location_data.region.get(loc.region as usize));
            result.city = Some(self.location_data.city.get(loc.city as usize));
            result.lat = loc.lat;
            result.lon = loc.lon;
        }

        if let Some(block_idx) = block_query(&self.asn_ip_blocks, quad) {
            let asn_idx = self.asn_ip_blocks.loc.get(block_idx) as usize;
            let asn = self.asn_data.asns.get(asn_idx);

            result.asn = Some(asn.number);
            result.asn_text = Some(self.asn_data.text.get(asn.text as usize));
        }

        result
    }
}

/// Owns the memory map; `borrow()` produces the actual `GeoData` whose
/// lifetime is tied to this owner. Split out because `memmap2::Mmap` must
/// outlive every table view sliced from it.
pub struct OpenGeoData {
    mapped: MappedGeoFile,
}

impl OpenGeoData {
    pub fn borrow(&self) -> Result<GeoData<'_>> {
        let bytes = self.mapped.bytes();
        let mut file = MemoryFile::new(bytes);

        log_context("GeoData read header");
        file.read_header()?;

        log_context("GeoData load location_ip_blocks");
        let location_ip_blocks = BlockTable::load(&mut file)?;

        log_context("GeoData load location_data");
        let location_data = LocationTable::load(&mut file)?;

        log_context("GeoData load asn_ip_blocks");
        let asn_ip_blocks = BlockTable::load(&mut file)?;

        log_context("GeoData load asn_data");
        let asn_data = AsnTable::load(&mut file)?;

        Ok(GeoData {
            location_ip_blocks,
            location_data,
            asn_ip_blocks,
            asn_data,
        })
    }
}

/// Turn `None` / empty into `%`, and every space into `+`. Does not do full
/// percent-encoding — see `SPEC_FULL.md` Non-goals.
fn escape(s: Option<&str>) -> String {
    match s {
        None => "%".to_string(),
        Some("") => "%".to_string(),
        Some(s) => s.chars().map(|c| if c == ' ' { '+' } else { c }).collect(),
    }
}

/// Render one `IpResult` as the fixed-order, space-separated output line:
/// `ip country region city latitude longitude as_num as_text`.
pub fn render_line(result: &IpResult) -> String {
    let as_num = match result.asn {
        Some(n) => format!("AS{n}"),
        None => "%".to_string(),
    };

    format!(
        "{} {} {} {} {:.4} {:.4} {} {}",
        quad_to_string(result.quad),
        escape(result.country),
        escape(result.region),
        escape(result.city),
        result.lat,
        result.lon,
        as_num,
        escape(result.asn_text),
    )
}

pub fn header_line() -> &'static str {
    "ip country region city latitude longitude as_num as_text"
}
