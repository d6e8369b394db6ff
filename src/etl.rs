//! Build-mode glue: three MaxMind CSVs → one geodata binary. Ported from
//! `etl.hpp`.

use std::path::Path;

use anyhow::Result;

use crate::asns::{parse_asn_line, save_asns};
use crate::blocks::{parse_block_line, save_blocks};
use crate::errors::log_context;
use crate::locations::{parse_location_line, save_locations};
use crate::pipeline::collect_lines;
use crate::serialization::BinaryWriter;

pub fn build_blocks(writer: &mut BinaryWriter, source: &Path) -> Result<()> {
    log_context(format!("build_blocks from {}", source.display()));

    let blocks = collect_lines(source, parse_block_line)?;
    save_blocks(writer, &blocks)?;
    Ok(())
}

pub fn build_locations(writer: &mut BinaryWriter, source: &Path) -> Result<()> {
    log_context(format!("build_locations from {}", source.display()));

    let locations = collect_lines(source, |line_no, line| parse_location_line(line_no, line))?;
    save_locations(writer, &locations)?;
    Ok(())
}

pub fn build_asns(writer: &mut BinaryWriter, source: &Path) -> Result<()> {
    log_context(format!("build_asns from {}", source.display()));

    let asns = collect_lines(source, |_, line| parse_asn_line(line))?;
    save_asns(writer, &asns)?;
    Ok(())
}

/// Writes the four document-order sections: location blocks, location
/// data, ASN blocks, ASN data.
fn build_geo_data(writer: &mut BinaryWriter, city_blocks: &Path, city_locs: &Path, geo_asns: &Path) -> Result<()> {
    build_blocks(writer, city_blocks)?;
    build_locations(writer, city_locs)?;
    build_asns(writer, geo_asns)?;
    Ok(())
}

/// Build a geodata file from an import directory containing `blocks.csv`,
/// `location.csv`, and `asnum.csv`.
pub fn etl(import_dir: &Path, output: &Path) -> Result<()> {
    let city_blocks = import_dir.join("blocks.csv");
    let city_locs = import_dir.join("location.csv");
    let geo_asns = import_dir.join("asnum.csv");

    log_context(format!(
        "etl blocks {} locs {} asns {} into file {}",
        city_blocks.display(),
        city_locs.display(),
        geo_asns.display(),
        output.display()
    ));

    let mut writer = BinaryWriter::create(output)?;
    writer.write_header()?;
    build_geo_data(&mut writer, &city_blocks, &city_locs, &geo_asns)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::GeoData;
    use std::fs;
    use tempfile::tempdir;

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("blocks.csv"),
            "startIpNum,endIpNum,locId\n\n\
             16777216,16777471,1\n\
             16777472,16778239,2\n",
        )
        .unwrap();

        fs::write(
            dir.join("location.csv"),
            "locId,country,region,city,postalCode,latitude,longitude,metroCode,areaCode\n\n\
             1,\"US\",\"CA\",\"Mountain View\",,37.4000,-122.0800,,\n\
             2,\"US\",\"NY\",\"New York\",,40.7000,-74.0000,,\n",
        )
        .unwrap();

        fs::write(
            dir.join("asnum.csv"),
            "16777216,16777471,\"AS15169 Google LLC\"\n\
             16777472,16778239,\"AS3356 Level 3\"\n",
        )
        .unwrap();
    }

    #[test]
    fn builds_a_loadable_file_from_csv_fixtures() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());

        let out = dir.path().join("out.bin");
        etl(dir.path(), &out).unwrap();

        assert!(out.exists());
        let opened = GeoData::open(&out).unwrap();
        let data = opened.borrow().unwrap();

        let result = data.query(crate::query::parse_ip("1.0.0.5").unwrap());
        assert_eq!(result.country, Some("US"));
        assert_eq!(result.city, Some("Mountain View"));
        assert_eq!(result.asn, Some(15169));
        assert_eq!(result.asn_text, Some("Google LLC"));
    }
}
