use isobox::{default_registry, encode_boxes, parse, Config, ParsedBox};
use std::io::Cursor;

fn parse_all(data: &[u8], cfg: &Config) -> Vec<ParsedBox> {
    let reg = default_registry();
    let mut cur = Cursor::new(data.to_vec());
    parse(&mut cur, data.len() as u64, &reg, cfg).unwrap()
}

fn assert_roundtrip(data: &[u8], cfg: &Config) -> Vec<ParsedBox> {
    let reg = default_registry();
    let boxes = parse_all(data, cfg);
    let mut out = Vec::new();
    encode_boxes(&boxes, &reg, cfg, &mut out).unwrap();
    assert_eq!(out, data, "re-encoded bytes differ from the original");
    boxes
}

#[test]
fn ftyp_decodes_and_reencodes() {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70, // ftyp, 24 bytes
        0x69, 0x73, 0x6F, 0x6D, // major brand "isom"
        0x00, 0x00, 0x00, 0x01, // minor version 1
        0x69, 0x73, 0x6F, 0x6D, // "isom"
        0x61, 0x76, 0x63, 0x31, // "avc1"
    ];
    let boxes = assert_roundtrip(data, &Config::default());
    assert_eq!(boxes.len(), 1);
    let ftyp = &boxes[0];
    assert_eq!(ftyp.fields.bytes("MajorBrand"), Some(&b"isom"[..]));
    assert_eq!(ftyp.fields.u64("MinorVersion"), Some(1));
    let brands = ftyp.fields.records("CompatibleBrands").unwrap();
    assert_eq!(brands.len(), 2);
    assert_eq!(brands[0].bytes("CompatibleBrand"), Some(&b"isom"[..]));
    assert_eq!(brands[1].bytes("CompatibleBrand"), Some(&b"avc1"[..]));
}

#[test]
fn mfhd_sequence_number() {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x10, 0x6D, 0x66, 0x68, 0x64, // mfhd, 16 bytes
        0x00, 0x00, 0x00, 0x00, // version 0, flags 0
        0x00, 0x00, 0x00, 0x2A, // sequence number 42
    ];
    let boxes = assert_roundtrip(data, &Config::default());
    let mfhd = &boxes[0];
    assert_eq!(mfhd.version, Some(0));
    assert_eq!(mfhd.flags, Some(0));
    assert_eq!(mfhd.fields.u64("SequenceNumber"), Some(42));
}

fn tkhd_v0_with_width_height(width: u32, height: u32) -> Vec<u8> {
    let mut payload = vec![0u8, 0, 0, 0]; // version 0, flags 0
    payload.extend_from_slice(&[0u8; 4]); // creation time
    payload.extend_from_slice(&[0u8; 4]); // modification time
    payload.extend_from_slice(&7u32.to_be_bytes()); // track id
    payload.extend_from_slice(&[0u8; 4]); // reserved
    payload.extend_from_slice(&1000u32.to_be_bytes()); // duration
    payload.extend_from_slice(&[0u8; 8]); // reserved[2]
    payload.extend_from_slice(&[0u8; 2]); // layer
    payload.extend_from_slice(&[0u8; 2]); // alternate group
    payload.extend_from_slice(&[0u8; 2]); // volume
    payload.extend_from_slice(&[0u8; 2]); // reserved
    for v in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
        payload.extend_from_slice(&v.to_be_bytes()); // unity matrix
    }
    payload.extend_from_slice(&width.to_be_bytes());
    payload.extend_from_slice(&height.to_be_bytes());

    let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(b"tkhd");
    data.extend_from_slice(&payload);
    data
}

#[test]
fn tkhd_width_is_fixed_point() {
    // 320.0 in Q16.16
    let data = tkhd_v0_with_width_height(0x0140_0000, 0x00F0_0000);
    let boxes = assert_roundtrip(&data, &Config::default());
    let tkhd = &boxes[0];
    assert_eq!(tkhd.fields.u64("Width"), Some(0x0140_0000));
    assert_eq!(tkhd.fields.fixed_16_16("Width"), Some(320.0));
    assert_eq!(tkhd.fields.fixed_16_16("Height"), Some(240.0));
    assert_eq!(tkhd.fields.u64("TrackIDV0"), Some(7));
}

#[test]
fn stsz_with_per_sample_sizes() {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x20, 0x73, 0x74, 0x73, 0x7A, // stsz, 32 bytes
        0x00, 0x00, 0x00, 0x00, // version 0, flags 0
        0x00, 0x00, 0x00, 0x00, // sample size 0
        0x00, 0x00, 0x00, 0x03, // sample count 3
        0x00, 0x00, 0x00, 0x0A, // 10
        0x00, 0x00, 0x00, 0x14, // 20
        0x00, 0x00, 0x00, 0x1E, // 30
    ];
    let boxes = assert_roundtrip(data, &Config::default());
    let stsz = &boxes[0];
    assert_eq!(
        stsz.fields.get("EntrySize"),
        Some(&isobox::Value::UIntVec(vec![10, 20, 30]))
    );
}

#[test]
fn stsz_with_fixed_sample_size_has_no_table() {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x14, 0x73, 0x74, 0x73, 0x7A, // stsz, 20 bytes
        0x00, 0x00, 0x00, 0x00, // version 0, flags 0
        0x00, 0x00, 0x04, 0x00, // sample size 1024
        0x00, 0x00, 0x00, 0x05, // sample count 5
    ];
    let boxes = assert_roundtrip(data, &Config::default());
    let stsz = &boxes[0];
    assert_eq!(stsz.fields.u64("SampleSize"), Some(1024));
    assert_eq!(
        stsz.fields.get("EntrySize"),
        Some(&isobox::Value::UIntVec(vec![]))
    );
}

#[test]
fn trun_flag_masked_entries() {
    // data-offset + first-sample-flags + per-sample duration and size
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x28, 0x74, 0x72, 0x75, 0x6E, // trun, 40 bytes
        0x00, 0x00, 0x03, 0x05, // version 0, flags 0x000305
        0x00, 0x00, 0x00, 0x02, // sample count 2
        0x00, 0x00, 0x00, 0x30, // data offset 48
        0x01, 0x01, 0x00, 0x00, // first sample flags
        0x00, 0x00, 0x00, 0x64, // duration 100
        0x00, 0x00, 0x01, 0x00, // size 256
        0x00, 0x00, 0x00, 0x68, // duration 104
        0x00, 0x00, 0x02, 0x00, // size 512
    ];
    let boxes = assert_roundtrip(data, &Config::default());
    let trun = &boxes[0];
    assert_eq!(trun.fields.i64("DataOffset"), Some(48));
    assert_eq!(trun.fields.u64("FirstSampleFlags"), Some(0x0101_0000));
    let entries = trun.fields.records("Entries").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].u64("SampleDuration"), Some(100));
    assert_eq!(entries[0].u64("SampleSize"), Some(256));
    assert_eq!(entries[1].u64("SampleDuration"), Some(104));
    assert!(entries[0].get("SampleFlags").is_none());
    assert!(entries[0].get("SampleCompositionTimeOffsetV0").is_none());
}

#[test]
fn trun_clearing_a_flag_bit_removes_exactly_that_field() {
    // same run without the duration bit: entries shrink to 4 bytes
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x20, 0x74, 0x72, 0x75, 0x6E, // trun, 32 bytes
        0x00, 0x00, 0x02, 0x05, // version 0, flags 0x000205
        0x00, 0x00, 0x00, 0x02, // sample count 2
        0x00, 0x00, 0x00, 0x30, // data offset 48
        0x01, 0x01, 0x00, 0x00, // first sample flags
        0x00, 0x00, 0x01, 0x00, // size 256
        0x00, 0x00, 0x02, 0x00, // size 512
    ];
    let boxes = assert_roundtrip(data, &Config::default());
    let entries = boxes[0].fields.records("Entries").unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].get("SampleDuration").is_none());
    assert_eq!(entries[0].u64("SampleSize"), Some(256));
    assert_eq!(entries[1].u64("SampleSize"), Some(512));
}

#[test]
fn hdlr_quicktime_pascal_name() {
    let mut payload = vec![0u8, 0, 0, 0]; // version 0, flags 0
    payload.extend_from_slice(b"mhlr"); // QuickTime component type
    payload.extend_from_slice(b"vide");
    payload.extend_from_slice(&[0u8; 12]); // reserved
    payload.push(4); // Pascal length byte
    payload.extend_from_slice(b"abcd"); // no terminator, box ends here

    let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(b"hdlr");
    data.extend_from_slice(&payload);

    let boxes = assert_roundtrip(&data, &Config::default());
    let hdlr = &boxes[0];
    assert_eq!(hdlr.fields.str_lossy("Name").as_deref(), Some("abcd"));
    assert_eq!(
        hdlr.fields.get("Name"),
        Some(&isobox::Value::Str { bytes: b"abcd".to_vec(), style: isobox::StrStyle::Pascal })
    );
    assert!(hdlr.warnings.iter().any(|w| w.contains("Pascal")));
}

#[test]
fn hdlr_iso_nul_terminated_name() {
    let mut payload = vec![0u8, 0, 0, 0];
    payload.extend_from_slice(&[0u8; 4]); // pre_defined 0
    payload.extend_from_slice(b"soun");
    payload.extend_from_slice(&[0u8; 12]);
    payload.extend_from_slice(b"SoundHandler\0");

    let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(b"hdlr");
    data.extend_from_slice(&payload);

    let boxes = assert_roundtrip(&data, &Config::default());
    let hdlr = &boxes[0];
    assert_eq!(hdlr.fields.str_lossy("Name").as_deref(), Some("SoundHandler"));
    assert!(hdlr.warnings.is_empty());
}

#[test]
fn unknown_box_roundtrips_as_opaque_payload() {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x0C, 0x7A, 0x7A, 0x7A, 0x7A, // "zzzz"
        0xDE, 0xAD, 0xBE, 0xEF,
    ];
    let boxes = assert_roundtrip(data, &Config::default());
    assert!(boxes[0].unparsed);
    assert_eq!(boxes[0].raw.as_deref(), Some(&[0xDE, 0xAD, 0xBE, 0xEF][..]));
}

#[test]
fn uuid_box_roundtrips() {
    let mut data = vec![0x00, 0x00, 0x00, 0x1C, b'u', b'u', b'i', b'd'];
    data.extend_from_slice(&[0x11; 16]);
    data.extend_from_slice(&[1, 2, 3, 4]);
    let boxes = assert_roundtrip(&data, &Config::default());
    assert!(boxes[0].unparsed);
    assert_eq!(boxes[0].header.uuid, Some([0x11; 16]));
}

#[test]
fn gratuitous_large_header_is_preserved() {
    // A 64-bit size on a small mfhd survives decode/encode untouched.
    let mut data = vec![0x00, 0x00, 0x00, 0x01, b'm', b'f', b'h', b'd'];
    data.extend_from_slice(&24u64.to_be_bytes());
    data.extend_from_slice(&[0, 0, 0, 0]); // version/flags
    data.extend_from_slice(&9u32.to_be_bytes());
    let boxes = assert_roundtrip(&data, &Config::default());
    assert!(boxes[0].header.large);
    assert_eq!(boxes[0].fields.u64("SequenceNumber"), Some(9));
}
