use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BoxHeader {
    pub size: u64,          // total size including header
    pub typ: FourCC,        // 4CC or b"uuid"
    pub uuid: Option<[u8; 16]>,
    pub header_size: u64,   // 8, 16, 24, or 32
    pub start: u64,         // stream offset of header start
    /// Encoded with the 64-bit size form. Preserved across decode/encode so
    /// an unmodified tree is byte-identical.
    pub large: bool,
    /// Encoded as size=0 ("to end of file").
    pub to_eof: bool,
}

impl BoxHeader {
    /// Header for a box built programmatically. Starts with the smallest
    /// legal form; the encoder widens to the 64-bit size if the payload
    /// needs it.
    pub fn synthesize(typ: FourCC) -> Self {
        BoxHeader {
            size: 0,
            typ,
            uuid: None,
            header_size: 8,
            start: 0,
            large: false,
            to_eof: false,
        }
    }

    pub fn payload_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

/// Immutable environment threaded through a codec invocation.
///
/// Extended on descent into each container, discarded on return. Carries
/// the ancestry and the QuickTime-compatibility state that a few sample
/// entry layouts depend on.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Ancestor box types, outermost first.
    pub parents: Vec<FourCC>,
    /// Inside a QuickTime `wave` container.
    pub under_wave: bool,
    /// QuickTime dialect enabled (configured, or detected from the `qt  `
    /// brand in ftyp/styp).
    pub quicktime: bool,
}

impl Context {
    pub fn descend(&self, parent: FourCC) -> Context {
        let mut ctx = self.clone();
        ctx.parents.push(parent);
        if &parent.0 == b"wave" {
            ctx.under_wave = true;
        }
        ctx
    }

    pub fn parent(&self) -> Option<FourCC> {
        self.parents.last().copied()
    }
}

/// Engine configuration. No environment variables, no persisted state.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Const-field mismatches become errors instead of warnings.
    pub strict: bool,
    /// Unknown boxes are kept in the tree (true) or dropped (false).
    pub emit_unknown: bool,
    /// Enable the QuickTime-specific branches up front.
    pub quicktime: bool,
    /// Materialize `mdat` payload bytes. Off by default; the tree then
    /// records only the payload geometry.
    pub load_mdat: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strict: false,
            emit_unknown: true,
            quicktime: false,
            load_mdat: false,
        }
    }
}

/// How a decoded string was terminated on the wire. Kept so re-encoding
/// reproduces the original bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrStyle {
    /// NUL-terminated; the terminator was consumed.
    Nul,
    /// Ran to the end of the box without a terminator.
    Unterminated,
    /// Leading length byte, no terminator (QuickTime).
    Pascal,
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    UInt(u64),
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Str { bytes: Vec<u8>, style: StrStyle },
    UIntVec(Vec<u64>),
    IntVec(Vec<i64>),
    Records(Vec<Fields>),
}

impl Value {
    pub fn cstr(s: &str) -> Value {
        Value::Str { bytes: s.as_bytes().to_vec(), style: StrStyle::Nul }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::UInt(v) => s.serialize_u64(*v),
            Value::Int(v) => s.serialize_i64(*v),
            Value::Bool(v) => s.serialize_bool(*v),
            Value::Bytes(v) => {
                let hex: String = v.iter().map(|b| format!("{:02x}", b)).collect();
                s.serialize_str(&hex)
            }
            Value::Str { bytes, .. } => s.serialize_str(&String::from_utf8_lossy(bytes)),
            Value::UIntVec(v) => {
                let mut seq = s.serialize_seq(Some(v.len()))?;
                for e in v { seq.serialize_element(e)?; }
                seq.end()
            }
            Value::IntVec(v) => {
                let mut seq = s.serialize_seq(Some(v.len()))?;
                for e in v { seq.serialize_element(e)?; }
                seq.end()
            }
            Value::Records(v) => {
                let mut seq = s.serialize_seq(Some(v.len()))?;
                for e in v { seq.serialize_element(e)?; }
                seq.end()
            }
        }
    }
}

/// An ordered name → value record. Field order is schema declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(&'static str, Value)>);

impl Fields {
    pub fn new() -> Self {
        Fields(Vec::new())
    }

    pub fn push(&mut self, name: &'static str, value: Value) {
        self.0.push((name, value));
    }

    pub fn set(&mut self, name: &'static str, value: Value) {
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = (&'static str, &'a Value)> + 'a {
        self.0.iter().map(|(n, v)| (*n, v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            Value::UInt(v) => Some(*v),
            Value::Bool(b) => Some(*b as u64),
            _ => None,
        }
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.get(name)? {
            Value::Bytes(b) => Some(b),
            Value::Str { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    pub fn str_lossy(&self, name: &str) -> Option<String> {
        self.bytes(name).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn records(&self, name: &str) -> Option<&[Fields]> {
        match self.get(name)? {
            Value::Records(r) => Some(r),
            _ => None,
        }
    }

    /// Unsigned Q16.16 fixed-point field as f64.
    pub fn fixed_16_16(&self, name: &str) -> Option<f64> {
        self.u64(name).map(|v| v as u32 as f64 / 65536.0)
    }

    /// Signed Q8.8 fixed-point field as f32.
    pub fn fixed_8_8(&self, name: &str) -> Option<f32> {
        self.i64(name).map(|v| v as i16 as f32 / 256.0)
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A decoded box: header, optional FullBox prefix, field record, children.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedBox {
    pub header: BoxHeader,
    pub version: Option<u8>,
    pub flags: Option<u32>,
    pub fields: Fields,
    pub children: Vec<ParsedBox>,
    /// Raw payload for opaque boxes, or for mdat when materialized.
    pub raw: Option<Vec<u8>>,
    /// No schema was applied (unknown type or unsupported version).
    pub unparsed: bool,
    /// Payload left on disk (mdat without `load_mdat`).
    pub skipped: bool,
    pub warnings: Vec<String>,
}

impl ParsedBox {
    pub fn typ(&self) -> FourCC {
        self.header.typ
    }

    pub fn key(&self) -> BoxKey {
        match self.header.uuid {
            Some(u) => BoxKey::Uuid(u),
            None => BoxKey::FourCC(self.header.typ),
        }
    }

    /// First child of the given type, if any.
    pub fn child(&self, typ: &str) -> Option<&ParsedBox> {
        let cc = FourCC::from_str(typ)?;
        self.children.iter().find(|c| c.header.typ == cc)
    }

    /// Depth-first search through descendants.
    pub fn find(&self, typ: &str) -> Option<&ParsedBox> {
        let cc = FourCC::from_str(typ)?;
        self.find_cc(cc)
    }

    fn find_cc(&self, cc: FourCC) -> Option<&ParsedBox> {
        if self.header.typ == cc {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_cc(cc))
    }
}
