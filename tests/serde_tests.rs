use isobox::{default_registry, parse, Config};
use std::io::Cursor;

#[test]
fn parsed_tree_serializes_to_json() -> anyhow::Result<()> {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x10, 0x6D, 0x66, 0x68, 0x64, // mfhd
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x2A,
    ];
    let reg = default_registry();
    let mut cur = Cursor::new(data.to_vec());
    let boxes = parse(&mut cur, data.len() as u64, &reg, &Config::default())?;

    let json = serde_json::to_value(&boxes)?;
    let mfhd = &json[0];
    assert_eq!(mfhd["header"]["typ"], "mfhd");
    assert_eq!(mfhd["header"]["size"], 16);
    assert_eq!(mfhd["version"], 0);
    assert_eq!(mfhd["fields"]["SequenceNumber"], 42);
    Ok(())
}

#[test]
fn records_serialize_as_arrays_of_maps() -> anyhow::Result<()> {
    let data: &[u8] = &[
        0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70, // ftyp
        0x69, 0x73, 0x6F, 0x6D,
        0x00, 0x00, 0x00, 0x01,
        0x69, 0x73, 0x6F, 0x6D,
        0x61, 0x76, 0x63, 0x31,
    ];
    let reg = default_registry();
    let mut cur = Cursor::new(data.to_vec());
    let boxes = parse(&mut cur, data.len() as u64, &reg, &Config::default())?;

    let json = serde_json::to_value(&boxes)?;
    let brands = &json[0]["fields"]["CompatibleBrands"];
    assert_eq!(brands.as_array().map(|a| a.len()), Some(2));
    Ok(())
}
