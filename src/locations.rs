//! City-level location records, both parsed (`Location`) and packed
//! (`PackedLocation`) representations. Ported from `locations.hpp`.

use anyhow::Result;

use crate::csv::{csv_split, to_u};
use crate::serialization::{BinaryWriter, MappedStringVector, MappedVector, MemoryFile, Pod};
use crate::string_table::StringTable;

#[derive(Debug, Clone)]
pub struct Location {
    pub id: u32,
    pub country: String,
    pub region: String,
    pub city: String,
    pub lat: String,
    pub lon: String,
}

/// Fixed-size on-disk location record: string fields replaced by indices
/// into the three per-column string tables, lat/lon parsed to `f32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedLocation {
    pub id: u32,
    pub country: u32,
    pub region: u32,
    pub city: u32,
    pub lat: f32,
    pub lon: f32,
}

impl Pod for PackedLocation {
    const SIZE: usize = 4 * 6;

    fn read_from(bytes: &[u8]) -> Self {
        Self {
            id: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            country: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
            region: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            city: u32::from_ne_bytes(bytes[12..16].try_into().unwrap()),
            lat: f32::from_ne_bytes(bytes[16..20].try_into().unwrap()),
            lon: f32::from_ne_bytes(bytes[20..24].try_into().unwrap()),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_ne_bytes());
        out.extend_from_slice(&self.country.to_ne_bytes());
        out.extend_from_slice(&self.region.to_ne_bytes());
        out.extend_from_slice(&self.city.to_ne_bytes());
        out.extend_from_slice(&self.lat.to_ne_bytes());
        out.extend_from_slice(&self.lon.to_ne_bytes());
    }
}

pub struct LocationTable<'a> {
    pub country: MappedStringVector<'a>,
    pub region: MappedStringVector<'a>,
    pub city: MappedStringVector<'a>,
    pub locations: MappedVector<'a, PackedLocation>,
}

impl<'a> LocationTable<'a> {
    pub fn load(file: &mut MemoryFile<'a>) -> Result<Self> {
        let country = file.load_mapped_string_vector()?;
        let region = file.load_mapped_string_vector()?;
        let city = file.load_mapped_string_vector()?;
        let locations = file.load_mapped_vector::<PackedLocation>()?;
        Ok(Self { country, region, city, locations })
    }
}

/// Parse one `location.csv` line into a `Location`, skipping the first two
/// lines and any line without exactly 9 fields. Fields 0..3 give
/// id/country/region/city; fields 5, 6 give lat/lon.
pub fn parse_location_line(line_no: usize, line: &str) -> Option<Location> {
    if line_no < 3 {
        return None;
    }

    let toks = csv_split(line);
    if toks.len() != 9 {
        return None;
    }

    Some(Location {
        id: to_u(toks[0]),
        country: toks[1].to_string(),
        region: toks[2].to_string(),
        city: toks[3].to_string(),
        lat: toks[5].to_string(),
        lon: toks[6].to_string(),
    })
}

/// Build the three per-column string tables, pack every location into a
/// vector indexed directly by `id` (sized `max_id + 1`, zero-filled gaps),
/// and write both to `writer`.
pub fn save_locations(writer: &mut BinaryWriter, locations: &[Location]) -> Result<()> {
    let mut country = StringTable::new();
    let mut region = StringTable::new();
    let mut city = StringTable::new();

    let mut max_id = 0u32;
    for loc in locations {
        max_id = max_id.max(loc.id);
        country.insert(&loc.country);
        region.insert(&loc.region);
        city.insert(&loc.city);
    }

    country.save(writer)?;
    region.save(writer)?;
    city.save(writer)?;

    let mut packed = vec![PackedLocation::default(); max_id as usize + 1];
    for loc in locations {
        packed[loc.id as usize] = PackedLocation {
            id: loc.id,
            country: country.index_of(&loc.country),
            region: region.index_of(&loc.region),
            city: city.index_of(&loc.city),
            lat: loc.lat.trim().parse().unwrap_or(0.0),
            lon: loc.lon.trim().parse().unwrap_or(0.0),
        };
    }

    writer.save_pod_vector(&packed)?;
    Ok(())
}
