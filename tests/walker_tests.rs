use isobox::{default_registry, encode_boxes, parse, walk, Config, Error, ParsedBox};
use std::io::Cursor;

fn boxed(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(typ);
    data.extend_from_slice(payload);
    data
}

fn full_box(typ: &[u8; 4], version: u8, flags: u32, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![version];
    payload.extend_from_slice(&flags.to_be_bytes()[1..]);
    payload.extend_from_slice(body);
    boxed(typ, &payload)
}

fn mvhd() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&[0u8; 8]); // creation, modification
    body.extend_from_slice(&1000u32.to_be_bytes()); // timescale
    body.extend_from_slice(&5000u32.to_be_bytes()); // duration
    body.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    body.extend_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    body.extend_from_slice(&[0u8; 2]); // reserved
    body.extend_from_slice(&[0u8; 8]); // reserved
    for v in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
        body.extend_from_slice(&v.to_be_bytes());
    }
    body.extend_from_slice(&[0u8; 24]); // pre_defined
    body.extend_from_slice(&2u32.to_be_bytes()); // next track id
    full_box(b"mvhd", 0, 0, &body)
}

fn parse_all(data: &[u8], cfg: &Config) -> Vec<ParsedBox> {
    let reg = default_registry();
    let mut cur = Cursor::new(data.to_vec());
    parse(&mut cur, data.len() as u64, &reg, cfg).unwrap()
}

#[test]
fn nested_containers_build_a_tree() {
    let trak = boxed(b"trak", &boxed(b"mdia", &[]));
    let mut moov_payload = mvhd();
    moov_payload.extend_from_slice(&trak);
    let data = boxed(b"moov", &moov_payload);

    let boxes = parse_all(&data, &Config::default());
    assert_eq!(boxes.len(), 1);
    let moov = &boxes[0];
    assert_eq!(moov.children.len(), 2);
    assert_eq!(moov.children[0].typ().to_string(), "mvhd");
    assert_eq!(moov.children[1].typ().to_string(), "trak");
    assert_eq!(moov.children[1].children[0].typ().to_string(), "mdia");
    assert_eq!(moov.fields.u64("Timescale"), None); // container holds no fields
    assert_eq!(moov.children[0].fields.u64("Timescale"), Some(1000));
}

#[test]
fn walk_yields_headers_in_file_order() {
    let trak = boxed(b"trak", &boxed(b"mdia", &[]));
    let mut moov_payload = mvhd();
    moov_payload.extend_from_slice(&trak);
    let mut data = boxed(b"moov", &moov_payload);
    data.extend_from_slice(&boxed(b"free", &[]));

    let reg = default_registry();
    let mut cur = Cursor::new(data.clone());
    let mut seen = Vec::new();
    walk(&mut cur, data.len() as u64, &reg, &Config::default(), |h, depth| {
        seen.push((h.typ.to_string(), depth));
    })
    .unwrap();

    assert_eq!(
        seen,
        vec![
            ("moov".to_string(), 0),
            ("mvhd".to_string(), 1),
            ("trak".to_string(), 1),
            ("mdia".to_string(), 2),
            ("free".to_string(), 0),
        ]
    );
}

#[test]
fn unknown_boxes_can_be_dropped() {
    let mut data = boxed(b"zzzz", &[1, 2, 3]);
    data.extend_from_slice(&boxed(b"free", &[]));

    let kept = parse_all(&data, &Config::default());
    assert_eq!(kept.len(), 2);
    assert!(kept[0].unparsed);

    let cfg = Config { emit_unknown: false, ..Config::default() };
    let dropped = parse_all(&data, &cfg);
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].typ().to_string(), "free");
}

#[test]
fn unsupported_version_falls_back_to_opaque() {
    let data = full_box(b"mfhd", 9, 0, &42u32.to_be_bytes());
    let boxes = parse_all(&data, &Config::default());
    let mfhd = &boxes[0];
    assert!(mfhd.unparsed);
    assert!(mfhd.warnings.iter().any(|w| w.contains("version 9")));

    // opaque fallback still round-trips
    let reg = default_registry();
    let mut out = Vec::new();
    encode_boxes(&boxes, &reg, &Config::default(), &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn truncation_inside_a_container_reports_the_path() {
    // moov claims 64 bytes but the stream ends after its header
    let mut data = 64u32.to_be_bytes().to_vec();
    data.extend_from_slice(b"moov");

    let reg = default_registry();
    let mut cur = Cursor::new(data);
    let err = parse(&mut cur, 64, &reg, &Config::default()).unwrap_err();
    match err {
        Error::At { path, source } => {
            assert_eq!(path, "moov");
            assert!(matches!(*source, Error::TruncatedHeader));
        }
        other => panic!("expected a path-tagged error, got {:?}", other),
    }
}

#[test]
fn dynamic_length_overrun_is_a_schema_violation() {
    // stco declares 1000 entries with an empty table
    let stco = full_box(b"stco", 0, 0, &1000u32.to_be_bytes());
    let data = boxed(b"moov", &stco);

    let reg = default_registry();
    let mut cur = Cursor::new(data.clone());
    let err = parse(&mut cur, data.len() as u64, &reg, &Config::default()).unwrap_err();
    match err {
        Error::At { path, source } => {
            assert_eq!(path, "moov/stco");
            assert!(matches!(*source, Error::SchemaViolation(_)));
        }
        other => panic!("expected a path-tagged error, got {:?}", other),
    }
}

#[test]
fn const_mismatch_warns_or_errors_by_strictness() {
    // elst entry with a non-zero MediaRateFraction
    let mut body = 1u32.to_be_bytes().to_vec();
    body.extend_from_slice(&100u32.to_be_bytes());
    body.extend_from_slice(&0i32.to_be_bytes());
    body.extend_from_slice(&1i16.to_be_bytes());
    body.extend_from_slice(&5i16.to_be_bytes()); // should be 0
    let data = full_box(b"elst", 0, 0, &body);

    let boxes = parse_all(&data, &Config::default());
    assert!(boxes[0].warnings.iter().any(|w| w.contains("MediaRateFraction")));

    let reg = default_registry();
    let mut cur = Cursor::new(data);
    let strict = Config { strict: true, ..Config::default() };
    let err = parse(&mut cur, 28, &reg, &strict).unwrap_err();
    assert!(matches!(err, Error::At { .. }));
}

#[test]
fn mdat_payload_stays_on_disk_by_default() {
    let data = boxed(b"mdat", &[0xAB; 32]);
    let boxes = parse_all(&data, &Config::default());
    let mdat = &boxes[0];
    assert!(mdat.skipped);
    assert!(mdat.raw.is_none());
    assert_eq!(mdat.header.payload_size(), 32);

    // re-encoding a skipped payload is refused
    let reg = default_registry();
    let mut out = Vec::new();
    assert!(encode_boxes(&boxes, &reg, &Config::default(), &mut out).is_err());
}

#[test]
fn mdat_roundtrips_when_materialized() {
    let data = boxed(b"mdat", &[0xAB; 32]);
    let cfg = Config { load_mdat: true, ..Config::default() };
    let boxes = parse_all(&data, &cfg);
    assert_eq!(boxes[0].fields.bytes("Data").map(|b| b.len()), Some(32));

    let reg = default_registry();
    let mut out = Vec::new();
    encode_boxes(&boxes, &reg, &cfg, &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn size_zero_runs_to_end_of_stream() {
    let mut data = boxed(b"free", &[]);
    let mut mdat = 0u32.to_be_bytes().to_vec();
    mdat.extend_from_slice(b"mdat");
    mdat.extend_from_slice(&[7; 16]);
    data.extend_from_slice(&mdat);

    let cfg = Config { load_mdat: true, ..Config::default() };
    let boxes = parse_all(&data, &cfg);
    assert_eq!(boxes.len(), 2);
    let mdat = &boxes[1];
    assert!(mdat.header.to_eof);
    assert_eq!(mdat.fields.bytes("Data").map(|b| b.len()), Some(16));

    // the size=0 form is preserved on encode
    let reg = default_registry();
    let mut out = Vec::new();
    encode_boxes(&boxes, &reg, &cfg, &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn quicktime_brand_enables_the_dialect_for_later_boxes() {
    let mut ftyp_payload = b"qt  ".to_vec();
    ftyp_payload.extend_from_slice(&0u32.to_be_bytes());
    let mut data = boxed(b"ftyp", &ftyp_payload);

    // an audio entry with EntryVersion 1 grows the 16-byte trailer only
    // once the qt brand has been seen
    let mut entry = Vec::new();
    entry.extend_from_slice(&[0u8; 6]);
    entry.extend_from_slice(&1u16.to_be_bytes());
    entry.extend_from_slice(&1u16.to_be_bytes()); // entry version 1
    entry.extend_from_slice(&[0u8; 6]);
    entry.extend_from_slice(&2u16.to_be_bytes());
    entry.extend_from_slice(&16u16.to_be_bytes());
    entry.extend_from_slice(&[0u8; 4]);
    entry.extend_from_slice(&0xAC44_0000u32.to_be_bytes());
    entry.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&boxed(b"mp4a", &entry));

    let boxes = parse_all(&data, &Config::default());
    let mp4a = &boxes[1];
    assert_eq!(mp4a.fields.bytes("QuickTimeData").map(|b| b.len()), Some(16));
}

#[test]
fn sibling_order_is_preserved() {
    let mut data = Vec::new();
    for payload in [&[1u8][..], &[2u8][..], &[3u8][..]] {
        data.extend_from_slice(&boxed(b"free", payload));
    }
    let boxes = parse_all(&data, &Config::default());
    let payloads: Vec<_> = boxes.iter().map(|b| b.fields.bytes("Data").unwrap().to_vec()).collect();
    assert_eq!(payloads, vec![vec![1], vec![2], vec![3]]);
}
