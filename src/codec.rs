//! The schema interpreter: turns a box payload into a [`Fields`] record and
//! back, driven by the per-field directives in [`crate::schema`] and the
//! per-box hooks in [`crate::registry`].
//!
//! All accounting is done in bits against an explicit remaining budget; a
//! field never reads past it and the cursor advances by exactly the size
//! the schema resolves for each field.

use crate::bitio::{BitReader, BitWriter};
use crate::boxes::{Config, Context, Fields, FourCC, ParsedBox, StrStyle, Value};
use crate::error::{Error, Result};
use crate::registry::{BoxDef, BoxHandler, Scope};
use crate::schema::{BitSize, FieldKind, FieldSpec, LengthSpec, Presence, VersionSpec, UNLIMITED};

/// Result of decoding one box payload (children not included).
pub(crate) struct Decoded {
    pub version: Option<u8>,
    pub flags: Option<u32>,
    pub fields: Fields,
    pub consumed_bits: u64,
    pub warnings: Vec<String>,
}

pub(crate) fn decode_payload(
    def: &BoxDef,
    typ: FourCC,
    r: &mut BitReader<'_>,
    payload_bits: u64,
    ctx: &Context,
    cfg: &Config,
) -> Result<Decoded> {
    let mut left = payload_bits;
    let mut warnings = Vec::new();

    let (pre_bytes, skip_header) = def.handler.before_unmarshal(r, payload_bits / 8, ctx)?;
    if pre_bytes * 8 > left {
        return Err(Error::InvalidHookReturn(format!(
            "before_unmarshal consumed {} bytes of a {}-bit payload", pre_bytes, payload_bits
        )));
    }
    left -= pre_bytes * 8;

    let (version, flags) = if def.is_full_box() && !skip_header {
        if left < 32 {
            return Err(Error::MalformedBox(format!(
                "{} payload too short for version/flags", typ
            )));
        }
        let v = r.read_bits(8)? as u8;
        let f = r.read_bits(24)? as u32;
        left -= 32;
        if !def.allows_version(v) {
            return Err(Error::UnsupportedVersion { typ, version: v });
        }
        (Some(v), Some(f))
    } else {
        (None, None)
    };

    let mut fields = Fields::new();
    decode_fields(
        def.schema,
        &mut fields,
        None,
        version.unwrap_or(0),
        flags.unwrap_or(0),
        def.handler,
        r,
        &mut left,
        ctx,
        cfg,
        &mut warnings,
    )?;

    if !def.container && left != 0 {
        return Err(Error::MalformedBox(format!(
            "{} has {} unconsumed bits after the last field", typ, left
        )));
    }

    Ok(Decoded {
        version,
        flags,
        fields,
        consumed_bits: payload_bits - left,
        warnings,
    })
}

fn version_matches(spec: VersionSpec, version: u8) -> bool {
    match spec {
        VersionSpec::Any => true,
        VersionSpec::Eq(v) => version == v,
        VersionSpec::Ne(v) => version != v,
    }
}

/// Count of elements to process, after resolving the length spec.
#[derive(Clone, Copy)]
enum Count {
    One,
    N(u64),
    UntilEnd,
}

#[allow(clippy::too_many_arguments)]
fn decode_fields(
    schema: &'static [FieldSpec],
    cur: &mut Fields,
    box_fields: Option<&Fields>,
    version: u8,
    flags: u32,
    handler: &dyn BoxHandler,
    r: &mut BitReader<'_>,
    left: &mut u64,
    ctx: &Context,
    cfg: &Config,
    warnings: &mut Vec<String>,
) -> Result<()> {
    for spec in schema {
        if !version_matches(spec.version, version) {
            continue;
        }
        let present = match spec.presence {
            Presence::Always => true,
            Presence::FlagsSet(mask) => flags & mask != 0,
            Presence::FlagsClear(mask) => flags & mask == 0,
            Presence::Dynamic => {
                let scope = Scope {
                    box_fields: box_fields.unwrap_or(&*cur),
                    fields: &*cur,
                    version,
                    flags,
                    ctx,
                };
                handler.field_enabled(&scope, spec.name)
            }
        };
        if !present {
            continue;
        }

        let hooked = handler.on_read(cur, spec.name, r, *left, version, flags, ctx)?;
        if hooked.bits > *left {
            return Err(Error::InvalidHookReturn(format!(
                "hook for {} consumed {} bits with {} remaining", spec.name, hooked.bits, left
            )));
        }
        *left -= hooked.bits;
        if hooked.handled {
            continue;
        }

        if let FieldKind::Extend(sub) = spec.kind {
            let bound = resolve_size(spec, cur, box_fields, version, flags, handler, ctx)?;
            match bound {
                Some(b) if b > 0 => {
                    if b > *left {
                        return Err(Error::SchemaViolation(format!(
                            "{}: {} bits declared, {} remaining", spec.name, b, left
                        )));
                    }
                    let mut sub_left = b;
                    decode_fields(sub, cur, box_fields, version, flags, handler, r, &mut sub_left, ctx, cfg, warnings)?;
                    if sub_left != 0 {
                        return Err(Error::MalformedBox(format!(
                            "{} left {} bits inside its declared extent", spec.name, sub_left
                        )));
                    }
                    *left -= b;
                }
                _ => {
                    decode_fields(sub, cur, box_fields, version, flags, handler, r, left, ctx, cfg, warnings)?;
                }
            }
            continue;
        }

        let elem_bits = resolve_size(spec, cur, box_fields, version, flags, handler, ctx)?;
        let count = resolve_length(spec, cur, box_fields, version, flags, handler, ctx)?;

        match spec.kind {
            FieldKind::Records(sub) => {
                let mut recs = Vec::new();
                let mut decode_one = |r: &mut BitReader<'_>, left: &mut u64, cur: &Fields| -> Result<Fields> {
                    let mut rec = Fields::new();
                    let bf = box_fields.unwrap_or(cur);
                    match elem_bits {
                        Some(b) if b > 0 => {
                            if b > *left {
                                return Err(Error::SchemaViolation(format!(
                                    "{}: record of {} bits with {} remaining", spec.name, b, left
                                )));
                            }
                            let mut sub_left = b;
                            decode_fields(sub, &mut rec, Some(bf), version, flags, handler, r, &mut sub_left, ctx, cfg, warnings)?;
                            if sub_left != 0 {
                                return Err(Error::MalformedBox(format!(
                                    "{} record left {} bits unconsumed", spec.name, sub_left
                                )));
                            }
                            *left -= b;
                        }
                        _ => {
                            decode_fields(sub, &mut rec, Some(bf), version, flags, handler, r, left, ctx, cfg, warnings)?;
                        }
                    }
                    Ok(rec)
                };
                match count {
                    Count::One | Count::N(_) => {
                        let n = match count { Count::N(n) => n, _ => 1 };
                        for _ in 0..n {
                            let rec = decode_one(r, left, &*cur)?;
                            recs.push(rec);
                        }
                    }
                    Count::UntilEnd => {
                        while *left > 0 {
                            let before = *left;
                            let rec = decode_one(r, left, &*cur)?;
                            if *left == before {
                                return Err(Error::MalformedBox(format!(
                                    "{} consumes no bits per record", spec.name
                                )));
                            }
                            recs.push(rec);
                        }
                    }
                }
                cur.push(spec.name, Value::Records(recs));
            }

            FieldKind::CStr | FieldKind::CPStr => {
                let mut bytes = Vec::new();
                let mut style = StrStyle::Unterminated;
                loop {
                    if *left < 8 {
                        break;
                    }
                    let b = r.read_bits(8)? as u8;
                    *left -= 8;
                    if b == 0 {
                        style = StrStyle::Nul;
                        break;
                    }
                    bytes.push(b);
                }
                if style == StrStyle::Unterminated && matches!(spec.kind, FieldKind::CPStr) {
                    let pascal = {
                        let scope = Scope {
                            box_fields: box_fields.unwrap_or(&*cur),
                            fields: &*cur,
                            version,
                            flags,
                            ctx,
                        };
                        handler.is_pascal(&scope, spec.name, &bytes, *left)
                    };
                    if pascal && !bytes.is_empty() {
                        let declared = bytes[0] as usize;
                        if declared != bytes.len() - 1 {
                            warnings.push(format!(
                                "{}: Pascal length byte {} disagrees with {} trailing bytes",
                                spec.name, declared, bytes.len() - 1
                            ));
                        }
                        warnings.push(format!("{}: Pascal-string heuristic applied", spec.name));
                        bytes.remove(0);
                        style = StrStyle::Pascal;
                    }
                }
                cur.push(spec.name, Value::Str { bytes, style });
            }

            FieldKind::Bytes => {
                let ebits = elem_bits.unwrap_or(8);
                let n = match count {
                    Count::One => 1,
                    Count::N(n) => n,
                    Count::UntilEnd => {
                        if *left % ebits != 0 {
                            return Err(Error::MalformedBox(format!(
                                "{}: {} trailing bits do not fit whole bytes", spec.name, left
                            )));
                        }
                        *left / ebits
                    }
                };
                let total = n.checked_mul(ebits).ok_or_else(|| {
                    Error::SchemaViolation(format!("{}: length overflow", spec.name))
                })?;
                if total > *left {
                    return Err(length_error(spec, total, *left));
                }
                let mut bytes = Vec::with_capacity(n as usize);
                if ebits == 8 && r.is_aligned() && total % 8 == 0 {
                    bytes.resize(n as usize, 0);
                    r.read_bytes(&mut bytes)?;
                } else {
                    for _ in 0..n {
                        bytes.push(r.read_bits(ebits as u32)? as u8);
                    }
                }
                *left -= total;
                check_const_bytes(spec, &bytes, cfg, warnings)?;
                cur.push(spec.name, Value::Bytes(bytes));
            }

            FieldKind::Uint | FieldKind::Int | FieldKind::Bool => {
                let signed = matches!(spec.kind, FieldKind::Int);
                match count {
                    Count::One => {
                        let (val, bits) = read_scalar(spec, elem_bits, r, *left)?;
                        *left -= bits;
                        let value = if signed {
                            Value::Int(crate::bitio::sign_extend(val, bits as u32))
                        } else if matches!(spec.kind, FieldKind::Bool) {
                            Value::Bool(val != 0)
                        } else {
                            Value::UInt(val)
                        };
                        check_const_scalar(spec, &value, cfg, warnings)?;
                        cur.push(spec.name, value);
                    }
                    Count::N(n) => {
                        let ebits = elem_bits.ok_or_else(|| missing_size(spec))?;
                        let total = n.checked_mul(ebits).ok_or_else(|| {
                            Error::SchemaViolation(format!("{}: length overflow", spec.name))
                        })?;
                        if total > *left {
                            return Err(length_error(spec, total, *left));
                        }
                        let value = read_int_array(spec, signed, ebits, n, r)?;
                        *left -= total;
                        check_const_array(spec, &value, cfg, warnings)?;
                        cur.push(spec.name, value);
                    }
                    Count::UntilEnd => {
                        let ebits = elem_bits.ok_or_else(|| missing_size(spec))?;
                        let mut us = Vec::new();
                        let mut is = Vec::new();
                        while *left > 0 {
                            if *left < ebits {
                                return Err(Error::MalformedBox(format!(
                                    "{}: {} trailing bits smaller than one element", spec.name, left
                                )));
                            }
                            let raw = r.read_bits(ebits as u32)?;
                            *left -= ebits;
                            if signed {
                                is.push(crate::bitio::sign_extend(raw, ebits as u32));
                            } else {
                                us.push(raw);
                            }
                        }
                        let value = if signed { Value::IntVec(is) } else { Value::UIntVec(us) };
                        check_const_array(spec, &value, cfg, warnings)?;
                        cur.push(spec.name, value);
                    }
                }
            }

            FieldKind::Extend(_) => unreachable!("handled above"),
        }
    }
    Ok(())
}

fn read_scalar(
    spec: &FieldSpec,
    elem_bits: Option<u64>,
    r: &mut BitReader<'_>,
    left: u64,
) -> Result<(u64, u64)> {
    match spec.size {
        BitSize::Varint => {
            if left < 8 {
                return Err(length_error(spec, 8, left));
            }
            let (v, bits) = r.read_varint()?;
            if bits > left {
                return Err(Error::SchemaViolation(format!(
                    "{}: expandable size spans {} bits with {} remaining", spec.name, bits, left
                )));
            }
            Ok((v, bits))
        }
        _ => {
            let bits = elem_bits.ok_or_else(|| missing_size(spec))?;
            if bits > left {
                return Err(length_error(spec, bits, left));
            }
            Ok((r.read_bits(bits as u32)?, bits))
        }
    }
}

fn read_int_array(
    spec: &FieldSpec,
    signed: bool,
    ebits: u64,
    n: u64,
    r: &mut BitReader<'_>,
) -> Result<Value> {
    if signed {
        let mut v = Vec::with_capacity(n as usize);
        for _ in 0..n {
            v.push(crate::bitio::sign_extend(r.read_bits(ebits as u32)?, ebits as u32));
        }
        Ok(Value::IntVec(v))
    } else {
        let mut v = Vec::with_capacity(n as usize);
        for _ in 0..n {
            v.push(r.read_bits(ebits as u32)?);
        }
        Ok(Value::UIntVec(v))
    }
}

fn resolve_size(
    spec: &FieldSpec,
    cur: &Fields,
    box_fields: Option<&Fields>,
    version: u8,
    flags: u32,
    handler: &dyn BoxHandler,
    ctx: &Context,
) -> Result<Option<u64>> {
    match spec.size {
        BitSize::Fixed(0) => Ok(None),
        BitSize::Fixed(n) => Ok(Some(n as u64)),
        BitSize::Varint => Ok(None),
        BitSize::Dynamic => {
            let scope = Scope {
                box_fields: box_fields.unwrap_or(cur),
                fields: cur,
                version,
                flags,
                ctx,
            };
            let size = handler.field_size(&scope, spec.name);
            match (size, &spec.kind) {
                // Record sequences may run without a per-record bound.
                (None, FieldKind::Records(_)) | (None, FieldKind::Extend(_)) => Ok(None),
                (None, _) => Err(Error::InvalidHookReturn(format!(
                    "no dynamic size for field {}", spec.name
                ))),
                (Some(s), _) => Ok(Some(s)),
            }
        }
    }
}

fn resolve_length(
    spec: &FieldSpec,
    cur: &Fields,
    box_fields: Option<&Fields>,
    version: u8,
    flags: u32,
    handler: &dyn BoxHandler,
    ctx: &Context,
) -> Result<Count> {
    match spec.length {
        LengthSpec::Scalar => Ok(Count::One),
        LengthSpec::Fixed(n) => Ok(Count::N(n as u64)),
        LengthSpec::UntilEnd => Ok(Count::UntilEnd),
        LengthSpec::Dynamic => {
            let scope = Scope {
                box_fields: box_fields.unwrap_or(cur),
                fields: cur,
                version,
                flags,
                ctx,
            };
            match handler.field_length(&scope, spec.name) {
                Some(UNLIMITED) => Ok(Count::UntilEnd),
                Some(n) => Ok(Count::N(n)),
                None => Err(Error::InvalidHookReturn(format!(
                    "no dynamic length for field {}", spec.name
                ))),
            }
        }
    }
}

fn missing_size(spec: &FieldSpec) -> Error {
    Error::InvalidHookReturn(format!("no size resolved for field {}", spec.name))
}

fn length_error(spec: &FieldSpec, wanted: u64, left: u64) -> Error {
    let dynamic = matches!(spec.size, BitSize::Dynamic | BitSize::Varint)
        || matches!(spec.length, LengthSpec::Dynamic);
    if dynamic {
        Error::SchemaViolation(format!(
            "{} wants {} bits, {} remain", spec.name, wanted, left
        ))
    } else {
        Error::MalformedBox(format!(
            "{} wants {} bits, {} remain", spec.name, wanted, left
        ))
    }
}

fn const_mismatch(spec: &FieldSpec, got: &str, cfg: &Config, warnings: &mut Vec<String>) -> Result<()> {
    let msg = format!(
        "{}: expected constant {}, found {}",
        spec.name,
        spec.constant.unwrap_or(0),
        got
    );
    if cfg.strict {
        Err(Error::MalformedBox(msg))
    } else {
        warnings.push(msg);
        Ok(())
    }
}

fn check_const_scalar(spec: &FieldSpec, v: &Value, cfg: &Config, warnings: &mut Vec<String>) -> Result<()> {
    let Some(k) = spec.constant else { return Ok(()) };
    let ok = match v {
        Value::UInt(u) => *u == k,
        Value::Int(i) => *i == k as i64,
        Value::Bool(b) => (*b as u64) == k,
        _ => true,
    };
    if ok { Ok(()) } else { const_mismatch(spec, &format!("{:?}", v), cfg, warnings) }
}

fn check_const_array(spec: &FieldSpec, v: &Value, cfg: &Config, warnings: &mut Vec<String>) -> Result<()> {
    let Some(k) = spec.constant else { return Ok(()) };
    let ok = match v {
        Value::UIntVec(u) => u.iter().all(|e| *e == k),
        Value::IntVec(i) => i.iter().all(|e| *e == k as i64),
        _ => true,
    };
    if ok { Ok(()) } else { const_mismatch(spec, &format!("{:?}", v), cfg, warnings) }
}

fn check_const_bytes(spec: &FieldSpec, bytes: &[u8], cfg: &Config, warnings: &mut Vec<String>) -> Result<()> {
    let Some(k) = spec.constant else { return Ok(()) };
    if bytes.iter().all(|b| *b as u64 == k) {
        Ok(())
    } else {
        const_mismatch(spec, "differing bytes", cfg, warnings)
    }
}

// ---------------------------------------------------------------- encode --

/// Write the payload (FullBox prefix + fields) of one box. Children are the
/// walker's concern. Works identically against a real sink and the counting
/// sink used by the size pass.
pub(crate) fn encode_payload(
    def: &BoxDef,
    pb: &ParsedBox,
    w: &mut BitWriter<'_>,
    ctx: &Context,
) -> Result<()> {
    if let (Some(v), Some(f)) = (pb.version, pb.flags) {
        w.write_bits(v as u64, 8)?;
        w.write_bits(f as u64, 24)?;
    }
    encode_fields(
        def.schema,
        &pb.fields,
        None,
        pb.version.unwrap_or(0),
        pb.flags.unwrap_or(0),
        def.handler,
        w,
        ctx,
    )
}

#[allow(clippy::too_many_arguments)]
fn encode_fields(
    schema: &'static [FieldSpec],
    cur: &Fields,
    box_fields: Option<&Fields>,
    version: u8,
    flags: u32,
    handler: &dyn BoxHandler,
    w: &mut BitWriter<'_>,
    ctx: &Context,
) -> Result<()> {
    for spec in schema {
        if !version_matches(spec.version, version) {
            continue;
        }
        let present = match spec.presence {
            Presence::Always => true,
            Presence::FlagsSet(mask) => flags & mask != 0,
            Presence::FlagsClear(mask) => flags & mask == 0,
            Presence::Dynamic => {
                let scope = Scope {
                    box_fields: box_fields.unwrap_or(cur),
                    fields: cur,
                    version,
                    flags,
                    ctx,
                };
                handler.field_enabled(&scope, spec.name)
            }
        };
        if !present {
            continue;
        }

        let hooked = handler.on_write(cur, spec.name, w, version, flags, ctx)?;
        if hooked.handled {
            continue;
        }

        if let FieldKind::Extend(sub) = spec.kind {
            encode_fields(sub, cur, box_fields, version, flags, handler, w, ctx)?;
            continue;
        }

        let elem_bits = resolve_size(spec, cur, box_fields, version, flags, handler, ctx)?;
        let count = resolve_length(spec, cur, box_fields, version, flags, handler, ctx)?;

        match spec.kind {
            FieldKind::Records(sub) => {
                let empty: [Fields; 0] = [];
                let recs: &[Fields] = cur.records(spec.name).unwrap_or(&empty);
                let n = match count {
                    Count::One => 1,
                    Count::N(n) => n,
                    Count::UntilEnd => recs.len() as u64,
                };
                if (recs.len() as u64) < n {
                    return Err(Error::MalformedBox(format!(
                        "{} holds {} records, schema wants {}", spec.name, recs.len(), n
                    )));
                }
                for rec in recs.iter().take(n as usize) {
                    let bf = box_fields.unwrap_or(cur);
                    encode_fields(sub, rec, Some(bf), version, flags, handler, w, ctx)?;
                }
            }

            FieldKind::CStr | FieldKind::CPStr => {
                let (bytes, style) = match cur.get(spec.name) {
                    Some(Value::Str { bytes, style }) => (bytes.as_slice(), *style),
                    _ => (b"".as_slice(), StrStyle::Nul),
                };
                match style {
                    StrStyle::Pascal => {
                        w.write_bits(bytes.len() as u64, 8)?;
                        w.write_bytes(bytes)?;
                    }
                    StrStyle::Unterminated => {
                        w.write_bytes(bytes)?;
                    }
                    StrStyle::Nul => {
                        w.write_bytes(bytes)?;
                        w.write_bits(0, 8)?;
                    }
                }
            }

            FieldKind::Bytes => {
                let ebits = elem_bits.unwrap_or(8);
                let empty: [u8; 0] = [];
                let bytes = cur.bytes(spec.name).unwrap_or(&empty);
                let n = match count {
                    Count::One => 1,
                    Count::N(n) => n,
                    Count::UntilEnd => bytes.len() as u64,
                };
                if (bytes.len() as u64) < n {
                    // Fixed-width reserved blobs may be omitted when
                    // building a box by hand.
                    let fill = spec.constant.unwrap_or(0) as u8;
                    for i in 0..n {
                        let b = bytes.get(i as usize).copied().unwrap_or(fill);
                        w.write_bits(b as u64, ebits as u32)?;
                    }
                } else if ebits == 8 && w.is_aligned() {
                    w.write_bytes(&bytes[..n as usize])?;
                } else {
                    for b in &bytes[..n as usize] {
                        w.write_bits(*b as u64, ebits as u32)?;
                    }
                }
            }

            FieldKind::Uint | FieldKind::Int | FieldKind::Bool => {
                let signed = matches!(spec.kind, FieldKind::Int);
                match count {
                    Count::One => {
                        if let BitSize::Varint = spec.size {
                            let v = cur.u64(spec.name).unwrap_or(0);
                            w.write_varint(v)?;
                        } else {
                            let bits = elem_bits.ok_or_else(|| missing_size(spec))? as u32;
                            if signed {
                                let v = cur.i64(spec.name)
                                    .unwrap_or(spec.constant.unwrap_or(0) as i64);
                                w.write_signed(v, bits)?;
                            } else {
                                let v = cur.u64(spec.name).unwrap_or(spec.constant.unwrap_or(0));
                                w.write_bits(v, bits)?;
                            }
                        }
                    }
                    Count::N(_) | Count::UntilEnd => {
                        let bits = elem_bits.ok_or_else(|| missing_size(spec))? as u32;
                        let n = match count {
                            Count::N(n) => n,
                            _ => match cur.get(spec.name) {
                                Some(Value::UIntVec(v)) => v.len() as u64,
                                Some(Value::IntVec(v)) => v.len() as u64,
                                _ => 0,
                            },
                        };
                        match cur.get(spec.name) {
                            Some(Value::UIntVec(v)) => {
                                if (v.len() as u64) < n {
                                    return Err(Error::MalformedBox(format!(
                                        "{} holds {} elements, schema wants {}", spec.name, v.len(), n
                                    )));
                                }
                                for e in v.iter().take(n as usize) {
                                    w.write_bits(*e, bits)?;
                                }
                            }
                            Some(Value::IntVec(v)) => {
                                if (v.len() as u64) < n {
                                    return Err(Error::MalformedBox(format!(
                                        "{} holds {} elements, schema wants {}", spec.name, v.len(), n
                                    )));
                                }
                                for e in v.iter().take(n as usize) {
                                    w.write_signed(*e, bits)?;
                                }
                            }
                            _ => {
                                let fill = spec.constant.unwrap_or(0);
                                for _ in 0..n {
                                    if signed {
                                        w.write_signed(fill as i64, bits)?;
                                    } else {
                                        w.write_bits(fill, bits)?;
                                    }
                                }
                            }
                        }
                    }
                }
            }

            FieldKind::Extend(_) => unreachable!("handled above"),
        }
    }
    Ok(())
}

/// Introspection support: find the spec for a field name anywhere in a
/// schema, descending through spliced groups.
pub(crate) fn find_spec(schema: &'static [FieldSpec], name: &str) -> Option<&'static FieldSpec> {
    for spec in schema {
        if spec.name == name {
            return Some(spec);
        }
        if let FieldKind::Extend(sub) = spec.kind {
            if let Some(found) = find_spec(sub, name) {
                return Some(found);
            }
        }
    }
    None
}
