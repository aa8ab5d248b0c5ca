use crate::bitio::{BitReader, BitWriter, CountSink, ReadSeek};
use crate::boxes::{BoxHeader, Config, Context, Fields, FourCC, ParsedBox};
use crate::codec;
use crate::error::{Error, Result};
use crate::registry::Registry;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let size32 = r.read_u32::<BigEndian>().map_err(truncated_header)?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ).map_err(truncated_header)?;
    let mut size = size32 as u64;

    let large = size32 == 1;
    if large {
        size = r.read_u64::<BigEndian>().map_err(truncated_header)?;
    }

    let mut uuid = None;
    if &typ == b"uuid" {
        let mut u = [0u8; 16];
        r.read_exact(&mut u).map_err(truncated_header)?;
        uuid = Some(u);
    }

    let header_size = match (large, uuid.is_some()) {
        (true, true) => 8 + 8 + 16,
        (true, false) => 8 + 8,
        (false, true) => 8 + 16,
        (false, false) => 8,
    } as u64;

    let to_eof = size == 0;
    if !to_eof && size < header_size {
        return Err(Error::MalformedBox(format!(
            "declared size {} smaller than its {}-byte header", size, header_size
        )));
    }

    Ok(BoxHeader { size, typ: FourCC(typ), uuid, header_size, start, large, to_eof })
}

fn truncated_header(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::TruncatedHeader
    } else {
        Error::Io(e)
    }
}

/// Parse every box between the current position and `end`, using the
/// process-wide default context.
pub fn parse<R: Read + Seek>(r: &mut R, len: u64, reg: &Registry, cfg: &Config) -> Result<Vec<ParsedBox>> {
    let mut cb = |_: &BoxHeader, _: usize| {};
    let ctx = Context { quicktime: cfg.quicktime, ..Context::default() };
    parse_children_inner(r, len, reg, cfg, &ctx, 0, &mut cb)
}

/// Like [`parse`], surfacing each discovered box header in file order
/// through `on_box` before its payload is decoded.
pub fn walk<R, F>(r: &mut R, len: u64, reg: &Registry, cfg: &Config, mut on_box: F) -> Result<Vec<ParsedBox>>
where
    R: Read + Seek,
    F: FnMut(&BoxHeader, usize),
{
    let ctx = Context { quicktime: cfg.quicktime, ..Context::default() };
    parse_children_inner(r, len, reg, cfg, &ctx, 0, &mut on_box)
}

/// Parse the children of a container whose payload extends to `parent_end`.
pub fn parse_children<R: Read + Seek>(
    r: &mut R,
    parent_end: u64,
    reg: &Registry,
    cfg: &Config,
    ctx: &Context,
) -> Result<Vec<ParsedBox>> {
    let mut cb = |_: &BoxHeader, _: usize| {};
    parse_children_inner(r, parent_end, reg, cfg, ctx, ctx.parents.len(), &mut cb)
}

fn parse_children_inner<R: Read + Seek>(
    r: &mut R,
    parent_end: u64,
    reg: &Registry,
    cfg: &Config,
    ctx: &Context,
    depth: usize,
    on_box: &mut dyn FnMut(&BoxHeader, usize),
) -> Result<Vec<ParsedBox>> {
    let mut kids = Vec::new();
    let mut seen: Vec<(FourCC, usize)> = Vec::new();
    let mut ctx = ctx.clone();

    while r.stream_position()? < parent_end {
        let h = read_box_header(r)?;
        let index = {
            let slot = seen.iter_mut().find(|(t, _)| *t == h.typ);
            match slot {
                Some((_, n)) => { *n += 1; *n }
                None => { seen.push((h.typ, 0)); 0 }
            }
        };

        let parsed = decode_one(r, &h, parent_end, reg, cfg, &ctx, depth, on_box)
            .map_err(|e| e.at(segment(h.typ, index)))?;

        // A top-level QuickTime brand switches the dialect for everything
        // that follows.
        if let Some(pb) = &parsed {
            if (&h.typ.0 == b"ftyp" || &h.typ.0 == b"styp") && has_qt_brand(&pb.fields) {
                ctx.quicktime = true;
            }
            if !cfg.emit_unknown && pb.unparsed {
                continue;
            }
        }
        if let Some(pb) = parsed {
            kids.push(pb);
        }
    }
    Ok(kids)
}

fn segment(typ: FourCC, index: usize) -> String {
    if index == 0 {
        typ.to_string()
    } else {
        format!("{}[{}]", typ, index)
    }
}

fn has_qt_brand(fields: &Fields) -> bool {
    const QT: &[u8; 4] = b"qt  ";
    if fields.bytes("MajorBrand") == Some(&QT[..]) {
        return true;
    }
    fields.records("CompatibleBrands").is_some_and(|recs| {
        recs.iter().any(|r| r.bytes("CompatibleBrand") == Some(&QT[..]))
    })
}

#[allow(clippy::too_many_arguments)]
fn decode_one<R: Read + Seek>(
    r: &mut R,
    h: &BoxHeader,
    parent_end: u64,
    reg: &Registry,
    cfg: &Config,
    ctx: &Context,
    depth: usize,
    on_box: &mut dyn FnMut(&BoxHeader, usize),
) -> Result<Option<ParsedBox>> {
    let box_end = if h.to_eof { parent_end } else { h.start + h.size };
    if box_end > parent_end {
        return Err(Error::MalformedBox(format!(
            "box runs {} bytes past its parent", box_end - parent_end
        )));
    }
    on_box(h, depth);

    let payload_start = h.start + h.header_size;
    let payload_size = box_end - payload_start;

    // Normalize the header so payload_size() works on the parsed tree even
    // for a size=0 box.
    let mut header = *h;
    header.size = box_end - h.start;

    let def = if h.uuid.is_some() {
        None
    } else {
        reg.lookup(ctx.parent(), h.typ)
    };

    let parsed = match def {
        None => {
            let raw = read_exact_at(r, payload_start, payload_size)?;
            Some(opaque(header, raw, Vec::new()))
        }
        Some(def) => {
            if &h.typ.0 == b"mdat" && !cfg.load_mdat {
                r.seek(SeekFrom::Start(box_end))?;
                return Ok(Some(ParsedBox {
                    header,
                    version: None,
                    flags: None,
                    fields: Fields::new(),
                    children: Vec::new(),
                    raw: None,
                    unparsed: false,
                    skipped: true,
                    warnings: Vec::new(),
                }));
            }

            r.seek(SeekFrom::Start(payload_start))?;
            let decoded = {
                let dynr: &mut dyn ReadSeek = &mut *r;
                let mut br = BitReader::new(dynr);
                codec::decode_payload(def, h.typ, &mut br, payload_size * 8, ctx, cfg)
            };
            match decoded {
                Ok(dec) => {
                    let children = if def.container {
                        if dec.consumed_bits % 8 != 0 {
                            return Err(Error::MalformedBox(format!(
                                "{} fields end mid-byte before its children", h.typ
                            )));
                        }
                        let child_start = payload_start + dec.consumed_bits / 8;
                        r.seek(SeekFrom::Start(child_start))?;
                        let child_ctx = ctx.descend(h.typ);
                        parse_children_inner(r, box_end, reg, cfg, &child_ctx, depth + 1, on_box)?
                    } else {
                        Vec::new()
                    };
                    Some(ParsedBox {
                        header,
                        version: dec.version,
                        flags: dec.flags,
                        fields: dec.fields,
                        children,
                        raw: None,
                        unparsed: false,
                        skipped: false,
                        warnings: dec.warnings,
                    })
                }
                Err(Error::UnsupportedVersion { typ, version }) => {
                    let raw = read_exact_at(r, payload_start, payload_size)?;
                    Some(opaque(
                        header,
                        raw,
                        vec![format!("version {} of {} not supported, kept as opaque payload", version, typ)],
                    ))
                }
                Err(e) => return Err(e),
            }
        }
    };

    r.seek(SeekFrom::Start(box_end))?;
    Ok(parsed)
}

fn opaque(header: BoxHeader, raw: Vec<u8>, warnings: Vec<String>) -> ParsedBox {
    ParsedBox {
        header,
        version: None,
        flags: None,
        fields: Fields::new(),
        children: Vec::new(),
        raw: Some(raw),
        unparsed: true,
        skipped: false,
        warnings,
    }
}

fn read_exact_at<R: Read + Seek>(r: &mut R, start: u64, len: u64) -> Result<Vec<u8>> {
    r.seek(SeekFrom::Start(start))?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(buf)
}

// ---------------------------------------------------------------- encode --

/// Encode a sequence of sibling boxes. Returns the number of bytes written.
pub fn encode_boxes<W: Write>(
    boxes: &[ParsedBox],
    reg: &Registry,
    cfg: &Config,
    w: &mut W,
) -> Result<u64> {
    let ctx = Context { quicktime: cfg.quicktime, ..Context::default() };
    let mut total = 0;
    for pb in boxes {
        total += encode_box(pb, reg, &ctx, w)?;
    }
    Ok(total)
}

fn encode_box(pb: &ParsedBox, reg: &Registry, ctx: &Context, w: &mut dyn Write) -> Result<u64> {
    let typ = pb.header.typ;
    let payload_size = payload_size_of(pb, reg, ctx)?;

    let uuid_len = if pb.header.uuid.is_some() { 16u64 } else { 0 };
    let need_large = pb.header.large || payload_size + 8 + uuid_len > u32::MAX as u64;
    let header_size = 8 + if need_large { 8 } else { 0 } + uuid_len;
    let total = header_size + payload_size;

    if pb.header.to_eof {
        w.write_u32::<BigEndian>(0)?;
        w.write_all(&typ.0)?;
    } else if need_large {
        w.write_u32::<BigEndian>(1)?;
        w.write_all(&typ.0)?;
        w.write_u64::<BigEndian>(total)?;
    } else {
        w.write_u32::<BigEndian>(total as u32)?;
        w.write_all(&typ.0)?;
    }
    if let Some(u) = pb.header.uuid {
        w.write_all(&u)?;
    }

    write_payload(pb, reg, ctx, w)?;
    Ok(total)
}

fn write_payload(pb: &ParsedBox, reg: &Registry, ctx: &Context, w: &mut dyn Write) -> Result<u64> {
    if let Some(raw) = &pb.raw {
        w.write_all(raw)?;
        return Ok(raw.len() as u64);
    }
    if pb.skipped {
        if pb.header.payload_size() == 0 {
            return Ok(0);
        }
        return Err(Error::MalformedBox(format!(
            "{} payload was not materialized", pb.header.typ
        )));
    }

    let def = reg
        .lookup(ctx.parent(), pb.header.typ)
        .ok_or_else(|| Error::MalformedBox(format!("no definition for {}", pb.header.typ)))?;

    let mut written = {
        let mut bw = BitWriter::new(&mut *w);
        codec::encode_payload(def, pb, &mut bw, ctx)
            .map_err(|e| e.at(pb.header.typ.to_string()))?;
        if !bw.is_aligned() {
            return Err(Error::MalformedBox(format!(
                "{} payload ends mid-byte", pb.header.typ
            )));
        }
        bw.bits_written() / 8
    };

    if def.container {
        let child_ctx = ctx.descend(pb.header.typ);
        for child in &pb.children {
            written += encode_box(child, reg, &child_ctx, w)?;
        }
    }
    Ok(written)
}

fn payload_size_of(pb: &ParsedBox, reg: &Registry, ctx: &Context) -> Result<u64> {
    let mut sink = CountSink::default();
    write_payload(pb, reg, ctx, &mut sink)?;
    Ok(sink.0)
}
