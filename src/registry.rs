use crate::bitio::{BitReader, BitWriter};
use crate::boxes::{Context, Fields, FourCC};
use crate::error::Result;
use crate::schema::FieldSpec;
use std::collections::HashMap;

/// Read-only view handed to hooks: the box-level record, the innermost
/// record being decoded (the same object at box level), and the FullBox
/// prefix.
pub struct Scope<'a> {
    pub box_fields: &'a Fields,
    pub fields: &'a Fields,
    pub version: u8,
    pub flags: u32,
    pub ctx: &'a Context,
}

/// Outcome of a read/write field hook.
///
/// `bits` is what the hook consumed or emitted on its own; `handled` means
/// the engine must not also process the field itself. A hook may consume
/// bits *and* leave `handled` false, in which case the engine continues
/// with the field against the reduced budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hooked {
    pub bits: u64,
    pub handled: bool,
}

/// Per-box escape hooks. Every box kind opts into any subset; the defaults
/// are inert.
#[allow(unused_variables)]
pub trait BoxHandler: Sync {
    /// Element count for a `len_dynamic` field. [`crate::schema::UNLIMITED`]
    /// means "until the box budget runs out".
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        None
    }

    /// Size in bits for a `size_dynamic` field (or per-record size for
    /// dynamic record sequences).
    fn field_size(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        None
    }

    /// Presence of an `opt_dynamic` field.
    fn field_enabled(&self, s: &Scope<'_>, name: &str) -> bool {
        true
    }

    /// Decide Pascal form for a `cpstr` field. `body` is everything read up
    /// to (not including) a terminator, `remaining` the bits left in the
    /// box afterwards.
    fn is_pascal(&self, s: &Scope<'_>, name: &str, body: &[u8], remaining: u64) -> bool {
        false
    }

    fn on_read(
        &self,
        fields: &mut Fields,
        name: &str,
        r: &mut BitReader<'_>,
        left_bits: u64,
        version: u8,
        flags: u32,
        ctx: &Context,
    ) -> Result<Hooked> {
        Ok(Hooked::default())
    }

    fn on_write(
        &self,
        fields: &Fields,
        name: &str,
        w: &mut BitWriter<'_>,
        version: u8,
        flags: u32,
        ctx: &Context,
    ) -> Result<Hooked> {
        Ok(Hooked::default())
    }

    /// Called before anything is read, with the cursor at the start of the
    /// payload. Returning `(n, true)` reports `n` bytes consumed and makes
    /// the engine skip the FullBox header, defaulting version/flags to 0.
    fn before_unmarshal(
        &self,
        r: &mut BitReader<'_>,
        payload_size: u64,
        ctx: &Context,
    ) -> Result<(u64, bool)> {
        Ok((0, false))
    }

    /// Override the rendering of one field in the text dump.
    fn stringify(&self, s: &Scope<'_>, name: &str) -> Option<String> {
        None
    }
}

/// Inert handler for boxes without hooks.
pub struct NoHooks;
impl BoxHandler for NoHooks {}

/// One registered box kind.
#[derive(Clone, Copy)]
pub struct BoxDef {
    /// Human-readable name, e.g. "Movie Header Box".
    pub name: &'static str,
    pub schema: &'static [FieldSpec],
    /// Permitted FullBox versions; empty means no version/flags prefix.
    pub versions: &'static [u8],
    /// Children follow the declared fields.
    pub container: bool,
    pub handler: &'static dyn BoxHandler,
}

impl BoxDef {
    pub fn plain(name: &'static str, schema: &'static [FieldSpec]) -> Self {
        BoxDef { name, schema, versions: &[], container: false, handler: &NoHooks }
    }

    pub fn full(name: &'static str, schema: &'static [FieldSpec], versions: &'static [u8]) -> Self {
        BoxDef { name, schema, versions, container: false, handler: &NoHooks }
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn hooks(mut self, handler: &'static dyn BoxHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn is_full_box(&self) -> bool {
        !self.versions.is_empty()
    }

    pub fn allows_version(&self, version: u8) -> bool {
        self.versions.contains(&version)
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
struct DefKey {
    parent: Option<FourCC>,
    typ: FourCC,
}

/// Mapping from 4-CC (optionally parent-scoped) to box definitions.
///
/// Built once, immutable afterwards; lookups fall back from
/// `(parent, type)` to `(any, type)`, and a miss means the box is kept as
/// opaque payload.
pub struct Registry {
    map: HashMap<DefKey, BoxDef>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { map: HashMap::new() }
    }

    /// Register a definition under a 4-CC, any parent.
    pub fn with_def(mut self, typ: &str, def: BoxDef) -> Self {
        let cc = FourCC::from_str(typ).expect("box type must be 4 characters");
        self.map.insert(DefKey { parent: None, typ: cc }, def);
        self
    }

    /// Register one definition under several 4-CCs (sample entries share a
    /// schema under multiple codecs).
    pub fn with_any_type(mut self, typs: &[&str], def: BoxDef) -> Self {
        for typ in typs {
            let cc = FourCC::from_str(typ).expect("box type must be 4 characters");
            self.map.insert(DefKey { parent: None, typ: cc }, def);
        }
        self
    }

    /// Register a definition that applies only under the given parent.
    pub fn with_scoped_def(mut self, parent: &str, typ: &str, def: BoxDef) -> Self {
        let p = FourCC::from_str(parent).expect("parent type must be 4 characters");
        let cc = FourCC::from_str(typ).expect("box type must be 4 characters");
        self.map.insert(DefKey { parent: Some(p), typ: cc }, def);
        self
    }

    pub fn lookup(&self, parent: Option<FourCC>, typ: FourCC) -> Option<&BoxDef> {
        if let Some(p) = parent {
            if let Some(def) = self.map.get(&DefKey { parent: Some(p), typ }) {
                return Some(def);
            }
        }
        self.map.get(&DefKey { parent: None, typ })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide registry of every cataloged box, built on first use and
/// frozen thereafter.
pub fn global() -> &'static Registry {
    use std::sync::OnceLock;
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(crate::known_boxes::default_registry)
}
