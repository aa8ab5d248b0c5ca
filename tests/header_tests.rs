use isobox::{read_box_header, Error};
use std::io::Cursor;

#[test]
fn compact_header() {
    let mut cur = Cursor::new(vec![0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p']);
    let h = read_box_header(&mut cur).unwrap();
    assert_eq!(h.size, 24);
    assert_eq!(h.typ.to_string(), "ftyp");
    assert_eq!(h.header_size, 8);
    assert!(!h.large);
    assert!(!h.to_eof);
}

#[test]
fn extended_size_header() {
    let mut data = vec![0x00, 0x00, 0x00, 0x01, b'm', b'd', b'a', b't'];
    data.extend_from_slice(&0x1_0000_0010u64.to_be_bytes());
    let mut cur = Cursor::new(data);
    let h = read_box_header(&mut cur).unwrap();
    assert_eq!(h.size, 0x1_0000_0010);
    assert_eq!(h.header_size, 16);
    assert!(h.large);
}

#[test]
fn uuid_header_carries_user_type() {
    let mut data = vec![0x00, 0x00, 0x00, 0x20, b'u', b'u', b'i', b'd'];
    data.extend_from_slice(&[0xAB; 16]);
    let mut cur = Cursor::new(data);
    let h = read_box_header(&mut cur).unwrap();
    assert_eq!(h.header_size, 24);
    assert_eq!(h.uuid, Some([0xAB; 16]));
}

#[test]
fn size_zero_means_to_end() {
    let mut cur = Cursor::new(vec![0x00, 0x00, 0x00, 0x00, b'm', b'd', b'a', b't']);
    let h = read_box_header(&mut cur).unwrap();
    assert!(h.to_eof);
    assert_eq!(h.size, 0);
}

#[test]
fn short_preamble_is_truncated_header() {
    let mut cur = Cursor::new(vec![0x00, 0x00, 0x00]);
    match read_box_header(&mut cur) {
        Err(Error::TruncatedHeader) => {}
        other => panic!("expected TruncatedHeader, got {:?}", other),
    }
}

#[test]
fn undersized_box_is_malformed() {
    let mut cur = Cursor::new(vec![0x00, 0x00, 0x00, 0x04, b'f', b'r', b'e', b'e']);
    match read_box_header(&mut cur) {
        Err(Error::MalformedBox(_)) => {}
        other => panic!("expected MalformedBox, got {:?}", other),
    }
}
