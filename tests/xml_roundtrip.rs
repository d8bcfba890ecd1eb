use std::fs;

use vc5meta::generate::{intrinsic_test_case, streaming_test_case};
use vc5meta::xml::{read_xml_file, to_xml_string, write_xml_to};
use vc5meta::{compare_metadata, read_xml, Config, Tuple};

fn streaming_tuples() -> Vec<Tuple> {
    vec![
        Tuple::marker("DEVC"),
        Tuple::repeated("DVID", 'L', 4, 1, "1"),
        Tuple::string("DVNM", "Camera"),
        Tuple::marker("STRM"),
        Tuple::string("STNM", "Accelerometer"),
        Tuple::repeated("ACCL", 's', 2, 3, "1 2 3"),
        Tuple::marker("STRM"),
        Tuple::repeated("GYRO", 's', 2, 3, "4 5 6"),
    ]
}

#[test]
fn streaming_case_survives_xml() {
    let config = Config::default();
    let metadata = streaming_test_case(streaming_tuples(), 1, &config).unwrap();
    let text = to_xml_string(&metadata).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(text.contains("xmlns=\"https://www.vc5codec.org/xml/metadata\""));

    let back = read_xml(&text).unwrap();
    assert_eq!(compare_metadata(&metadata, &back), None);
    assert_eq!(back, metadata);
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intrinsic.xml");
    let tuples = vec![
        Tuple::string("LAYN", "Layer & <001>"),
        Tuple::repeated("VEND", 'B', 1, 5, "1 2 3 4 5"),
        Tuple::leaf("ACEh", 'x', 5, "a b c"),
    ];
    let metadata = intrinsic_test_case(tuples, 2, &Config::default());
    write_xml_to(Some(path.as_path()), &metadata).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("&amp;"));
    assert!(text.contains(">a b c</tuple>"));
    assert_eq!(read_xml_file(&path).unwrap(), metadata);
}

#[test]
fn empty_metadata_element() {
    let text = to_xml_string(&Default::default()).unwrap();
    assert!(text.trim_end().ends_with("/>"));
    assert!(read_xml(&text).unwrap().chunks.is_empty());
}

#[test]
fn malformed_documents_rejected() {
    assert!(read_xml("<metadata><chunk tag=\"0x61\">").is_err());
    assert!(read_xml("<root/>").is_err());
    assert!(read_xml("").is_err());
    assert!(read_xml(r#"<metadata><chunk tag="0x61"><tuple tag="ACCL" size="four"/></chunk></metadata>"#).is_err());
}
