//! Depth-first text rendering of a parsed box tree, one line per box,
//! indented by depth. Display hints from the schema drive the formatting;
//! a box's `stringify` hook overrides individual fields.

use crate::boxes::{Context, Fields, ParsedBox, Value};
use crate::codec::find_spec;
use crate::registry::{BoxDef, Registry, Scope};
use crate::schema::{Display, FieldKind, FieldSpec};
use crate::util;
use std::io;

pub fn dump_boxes(boxes: &[ParsedBox], reg: &Registry, out: &mut impl io::Write) -> io::Result<()> {
    let ctx = Context::default();
    for pb in boxes {
        dump_box(pb, reg, &ctx, 0, out)?;
    }
    Ok(())
}

pub fn dump_to_string(boxes: &[ParsedBox], reg: &Registry) -> String {
    let mut buf = Vec::new();
    dump_boxes(boxes, reg, &mut buf).expect("writing to a Vec cannot fail");
    String::from_utf8_lossy(&buf).into_owned()
}

/// At most this many opaque payload bytes are hex-dumped per box.
const HEX_PREVIEW: usize = 64;

fn dump_box(
    pb: &ParsedBox,
    reg: &Registry,
    ctx: &Context,
    depth: usize,
    out: &mut impl io::Write,
) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    write!(out, "{}[{}] size={}", indent, pb.header.typ, pb.header.size)?;

    if let Some(v) = pb.version {
        write!(out, " version={}", v)?;
    }
    if let Some(f) = pb.flags {
        write!(out, " flags=0x{:06x}", f)?;
    }

    if pb.unparsed {
        let len = pb.raw.as_ref().map(|r| r.len()).unwrap_or(0);
        write!(out, " (unparsed {} bytes)", len)?;
    } else if pb.skipped {
        write!(out, " ({} bytes not loaded)", pb.header.payload_size())?;
    } else if !pb.fields.is_empty() {
        let def = reg.lookup(ctx.parent(), pb.header.typ);
        if let Some(def) = def {
            let rendered = render_fields(&pb.fields, &pb.fields, def, pb, ctx);
            if !rendered.is_empty() {
                write!(out, " {}", rendered)?;
            }
        }
    }
    writeln!(out)?;

    if pb.unparsed {
        if let Some(raw) = &pb.raw {
            if !raw.is_empty() {
                let shown = &raw[..raw.len().min(HEX_PREVIEW)];
                for line in util::hex_dump(shown, 0).lines() {
                    writeln!(out, "{}  {}", indent, line)?;
                }
                if raw.len() > HEX_PREVIEW {
                    writeln!(out, "{}  ... {} more bytes", indent, raw.len() - HEX_PREVIEW)?;
                }
            }
        }
    }

    let child_ctx = ctx.descend(pb.header.typ);
    for child in &pb.children {
        dump_box(child, reg, &child_ctx, depth + 1, out)?;
    }
    Ok(())
}

fn render_fields(
    fields: &Fields,
    box_fields: &Fields,
    def: &BoxDef,
    pb: &ParsedBox,
    ctx: &Context,
) -> String {
    let mut parts = Vec::new();
    for (name, value) in fields.iter() {
        let spec = find_spec_anywhere(def.schema, name);
        if spec.map(|s| s.hidden).unwrap_or(false) {
            continue;
        }
        let scope = Scope {
            box_fields,
            fields,
            version: pb.version.unwrap_or(0),
            flags: pb.flags.unwrap_or(0),
            ctx,
        };
        let text = def
            .handler
            .stringify(&scope, name)
            .unwrap_or_else(|| render_value(value, spec, def, pb, box_fields, ctx));
        parts.push(format!("{}={}", name, text));
    }
    parts.join(" ")
}

/// Search the box schema, descending into spliced groups and record
/// sub-schemas, for a field's spec.
fn find_spec_anywhere(schema: &'static [FieldSpec], name: &str) -> Option<&'static FieldSpec> {
    if let Some(spec) = find_spec(schema, name) {
        return Some(spec);
    }
    for spec in schema {
        if let FieldKind::Records(sub) | FieldKind::Extend(sub) = spec.kind {
            if let Some(found) = find_spec_anywhere(sub, name) {
                return Some(found);
            }
        }
    }
    None
}

fn render_value(
    value: &Value,
    spec: Option<&'static FieldSpec>,
    def: &BoxDef,
    pb: &ParsedBox,
    box_fields: &Fields,
    ctx: &Context,
) -> String {
    let display = spec.map(|s| s.display).unwrap_or(Display::None);
    match value {
        Value::UInt(v) => match display {
            Display::Hex => format!("{:#x}", v),
            Display::Fixed16x16 => util::format_fixed_16_16(*v as u32),
            _ => v.to_string(),
        },
        Value::Int(v) => match display {
            Display::Hex => format!("{:#x}", *v as u32),
            Display::Fixed16x16 => util::format_signed_fixed_16_16(*v as i32),
            Display::Fixed8x8 => util::format_signed_fixed_8_8(*v as i16),
            _ => v.to_string(),
        },
        Value::Bool(v) => v.to_string(),
        Value::Bytes(bytes) => match display {
            Display::Ascii => format!("\"{}\"", String::from_utf8_lossy(bytes)),
            _ => {
                if bytes.len() <= 16 {
                    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                    format!("0x{}", hex)
                } else {
                    format!("({} bytes)", bytes.len())
                }
            }
        },
        Value::Str { bytes, .. } => format!("\"{}\"", String::from_utf8_lossy(bytes)),
        Value::UIntVec(v) => match display {
            Display::Iso639 => format!("\"{}\"", util::language_code(v)),
            Display::Hex => {
                let parts: Vec<String> = v.iter().map(|e| format!("{:#x}", e)).collect();
                format!("[{}]", parts.join(", "))
            }
            _ => {
                let parts: Vec<String> = v.iter().map(|e| e.to_string()).collect();
                format!("[{}]", parts.join(", "))
            }
        },
        Value::IntVec(v) => match display {
            Display::Hex => {
                let parts: Vec<String> = v.iter().map(|e| format!("{:#x}", *e as u32)).collect();
                format!("[{}]", parts.join(", "))
            }
            _ => {
                let parts: Vec<String> = v.iter().map(|e| e.to_string()).collect();
                format!("[{}]", parts.join(", "))
            }
        },
        Value::Records(recs) => {
            let parts: Vec<String> = recs
                .iter()
                .map(|rec| format!("{{{}}}", render_fields(rec, box_fields, def, pb, ctx)))
                .collect();
            format!("[{}]", parts.join(", "))
        }
    }
}
