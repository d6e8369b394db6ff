//! End-to-end coverage of the build-then-query round trip, against the
//! fixtures and expected output lines from `SPEC_FULL.md` §8.

use std::fs;

use geoloc::etl::etl;
use geoloc::query::{header_line, parse_ip, render_line, GeoData};
use geoloc::serialization::MappedGeoFile;
use tempfile::tempdir;

fn write_fixture(dir: &std::path::Path) {
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
fn import_produces_a_header_matching_host_endian() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());

    let out = dir.path().join("out.bin");
    etl(dir.path(), &out).unwrap();

    let bytes = fs::read(&out).unwrap();
    assert!(bytes.len() > 32);
    let header = std::str::from_utf8(&bytes[..32]).unwrap();
    assert!(header.starts_with("geoloc loadzero v001 "));

    let endian = if cfg!(target_endian = "little") { "little" } else { "big" };
    assert!(header.contains(endian));
}

#[test]
fn known_ip_renders_expected_line_with_headers() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());

    let out = dir.path().join("out.bin");
    etl(dir.path(), &out).unwrap();

    let opened = GeoData::open(&out).unwrap();
    let data = opened.borrow().unwrap();

    assert_eq!(header_line(), "ip country region city latitude longitude as_num as_text");

    let result = data.query(parse_ip("1.0.0.5").unwrap());
    assert_eq!(
        render_line(&result),
        "1.0.0.5 US CA Mountain+View 37.4000 -122.0800 AS15169 Google+LLC"
    );
}

#[test]
fn second_known_ip_resolves_to_the_other_block() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());

    let out = dir.path().join("out.bin");
    etl(dir.path(), &out).unwrap();

    let opened = GeoData::open(&out).unwrap();
    let data = opened.borrow().unwrap();

    let result = data.query(parse_ip("1.0.3.100").unwrap());
    assert_eq!(
        render_line(&result),
        "1.0.3.100 US NY New+York 40.7000 -74.0000 AS3356 Level+3"
    );
}

#[test]
fn unknown_ip_renders_all_missing_fields() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());

    let out = dir.path().join("out.bin");
    etl(dir.path(), &out).unwrap();

    let opened = GeoData::open(&out).unwrap();
    let data = opened.borrow().unwrap();

    let result = data.query(parse_ip("255.255.255.255").unwrap());
    assert_eq!(render_line(&result), "255.255.255.255 % % % 0.0000 0.0000 % %");
}

#[test]
fn malformed_ip_is_silently_dropped() {
    assert_eq!(parse_ip("bogus.ip"), None);
}

#[test]
fn corrupted_header_byte_fails_to_open() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());

    let out = dir.path().join("out.bin");
    etl(dir.path(), &out).unwrap();

    let mut bytes = fs::read(&out).unwrap();
    bytes[17] = b'X';
    fs::write(&out, &bytes).unwrap();

    let opened = GeoData::open(&out).unwrap();
    assert!(opened.borrow().is_err());

    // direct mmap sanity check: the file still maps, only the header check fails
    assert!(MappedGeoFile::open(&out).is_ok());
}
