use isobox::dump::dump_to_string;
use isobox::{default_registry, parse, Config};
use std::io::Cursor;

fn boxed(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(typ);
    data.extend_from_slice(payload);
    data
}

fn dump(data: &[u8]) -> String {
    let reg = default_registry();
    let mut cur = Cursor::new(data.to_vec());
    let boxes = parse(&mut cur, data.len() as u64, &reg, &Config::default()).unwrap();
    dump_to_string(&boxes, &reg)
}

#[test]
fn ftyp_renders_brands_as_ascii() {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70,
        0x69, 0x73, 0x6F, 0x6D,
        0x00, 0x00, 0x00, 0x01,
        0x69, 0x73, 0x6F, 0x6D,
        0x61, 0x76, 0x63, 0x31,
    ];
    let text = dump(data);
    assert!(text.starts_with("[ftyp] size=24"), "got: {}", text);
    assert!(text.contains("MajorBrand=\"isom\""), "got: {}", text);
    assert!(text.contains("MinorVersion=1"), "got: {}", text);
    assert!(text.contains("\"avc1\""), "got: {}", text);
}

#[test]
fn full_box_line_shows_version_and_flags() {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x10, 0x6D, 0x66, 0x68, 0x64,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x2A,
    ];
    let text = dump(data);
    assert!(
        text.contains("[mfhd] size=16 version=0 flags=0x000000 SequenceNumber=42"),
        "got: {}",
        text
    );
}

#[test]
fn children_are_indented_by_depth() {
    let data = boxed(b"moov", &boxed(b"trak", &boxed(b"mdia", &[])));
    let text = dump(&data);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("[moov]"));
    assert!(lines[1].starts_with("  [trak]"));
    assert!(lines[2].starts_with("    [mdia]"));
}

#[test]
fn fixed_point_and_language_hints() {
    // tkhd width/height as Q16.16
    let mut payload = vec![0u8, 0, 0, 0];
    payload.extend_from_slice(&[0u8; 20]);
    payload.extend_from_slice(&[0u8; 8]);
    payload.extend_from_slice(&[0u8; 8]);
    for v in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
        payload.extend_from_slice(&v.to_be_bytes());
    }
    payload.extend_from_slice(&0x0140_0000u32.to_be_bytes());
    payload.extend_from_slice(&0x00F0_0000u32.to_be_bytes());
    let text = dump(&boxed(b"tkhd", &payload));
    assert!(text.contains("Width=320.0000"), "got: {}", text);
    assert!(text.contains("Height=240.0000"), "got: {}", text);
    assert!(text.contains("Matrix=[0x10000,"), "got: {}", text);

    // mdhd language triple
    let mut payload = vec![0u8, 0, 0, 0];
    payload.extend_from_slice(&[0u8; 8]);
    payload.extend_from_slice(&1000u32.to_be_bytes());
    payload.extend_from_slice(&500u32.to_be_bytes());
    payload.extend_from_slice(&0x15C7u16.to_be_bytes());
    payload.extend_from_slice(&[0u8; 2]);
    let text = dump(&boxed(b"mdhd", &payload));
    assert!(text.contains("Language=\"eng\""), "got: {}", text);
}

#[test]
fn stringify_hook_overrides_field_rendering() {
    // esds descriptor tags print by name
    let mut payload = vec![0u8, 0, 0, 0];
    payload.push(0x05);
    payload.push(0x01);
    payload.push(0x42);
    let text = dump(&boxed(b"esds", &payload));
    assert!(text.contains("Tag=DecSpecificInfo"), "got: {}", text);

    // pssh system id prints as quoted hex
    let mut payload = vec![0u8, 0, 0, 0];
    payload.extend_from_slice(&[0xAB; 16]);
    payload.extend_from_slice(&0u32.to_be_bytes());
    let text = dump(&boxed(b"pssh", &payload));
    assert!(
        text.contains("SystemID=\"abababababababababababababababab\""),
        "got: {}",
        text
    );
}

#[test]
fn unknown_and_skipped_boxes_are_annotated() {
    let mut data = boxed(b"zzzz", &[1, 2, 3]);
    data.extend_from_slice(&boxed(b"mdat", &[0; 64]));
    let text = dump(&data);
    assert!(text.contains("[zzzz] size=11 (unparsed 3 bytes)"), "got: {}", text);
    assert!(text.contains("[mdat] size=72 (64 bytes not loaded)"), "got: {}", text);
}

#[test]
fn opaque_payloads_get_a_hex_preview() {
    let text = dump(&boxed(b"zzzz", b"free?"));
    assert!(
        text.contains("66 72 65 65 3f") && text.contains("|free?|"),
        "got: {}",
        text
    );

    // long payloads are truncated
    let text = dump(&boxed(b"zzzz", &[0xAA; 200]));
    assert!(text.contains("... 136 more bytes"), "got: {}", text);
}
