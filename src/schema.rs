//! Per-field codec directives as first-class const data.
//!
//! A box kind declares its wire layout as a `&'static [FieldSpec]`; the
//! codec engine interprets the specs against a bit stream. The builder
//! methods are `const fn` so catalogs read declaratively:
//!
//! ```
//! use isobox::schema::FieldSpec;
//!
//! const SCHEMA: &[FieldSpec] = &[
//!     FieldSpec::uint("EntryCount", 32),
//!     FieldSpec::uints("ChunkOffset", 32).len_dynamic(),
//! ];
//! ```

/// Element size in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitSize {
    Fixed(u32),
    /// Resolved through the box handler's `field_size`.
    Dynamic,
    /// MPEG-4 expandable class size (7-bit groups, MSB continuation).
    Varint,
}

/// Element count for sequence fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthSpec {
    Scalar,
    Fixed(u32),
    /// Resolved through the box handler's `field_length`.
    Dynamic,
    /// Consume until the enclosing box's budget is exhausted.
    UntilEnd,
}

/// Whether the field is on the wire at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Always,
    /// Resolved through the box handler's `field_enabled`.
    Dynamic,
    /// Present iff `flags & mask != 0`.
    FlagsSet(u32),
    /// Present iff `flags & mask == 0`.
    FlagsClear(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSpec {
    Any,
    Eq(u8),
    Ne(u8),
}

/// Rendering hint for introspection; never affects the wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    None,
    /// Byte array shown as ASCII (4-CCs, brands).
    Ascii,
    Hex,
    Fixed16x16,
    Fixed8x8,
    /// Three 5-bit values, each offset by 0x60 (ISO 639-2/T).
    Iso639,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Uint,
    Int,
    Bool,
    Bytes,
    /// NUL-terminated string.
    CStr,
    /// NUL-terminated or Pascal; the handler's `is_pascal` decides.
    CPStr,
    /// Sequence of sub-records, each decoded by the nested schema.
    Records(&'static [FieldSpec]),
    /// Nested schema spliced inline into the current record.
    Extend(&'static [FieldSpec]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub size: BitSize,
    pub length: LengthSpec,
    pub presence: Presence,
    pub version: VersionSpec,
    pub display: Display,
    /// Expected constant; mismatch warns, or errors in strict mode.
    pub constant: Option<u64>,
    /// Managed entirely by hooks; omitted from introspection.
    pub hidden: bool,
}

impl FieldSpec {
    const fn base(name: &'static str, kind: FieldKind, size: BitSize, length: LengthSpec) -> Self {
        FieldSpec {
            name,
            kind,
            size,
            length,
            presence: Presence::Always,
            version: VersionSpec::Any,
            display: Display::None,
            constant: None,
            hidden: false,
        }
    }

    /// Unsigned scalar of `bits` bits.
    pub const fn uint(name: &'static str, bits: u32) -> Self {
        Self::base(name, FieldKind::Uint, BitSize::Fixed(bits), LengthSpec::Scalar)
    }

    /// Signed scalar of `bits` bits (sign-extended).
    pub const fn int(name: &'static str, bits: u32) -> Self {
        Self::base(name, FieldKind::Int, BitSize::Fixed(bits), LengthSpec::Scalar)
    }

    /// Single-bit boolean flag.
    pub const fn flag(name: &'static str) -> Self {
        Self::base(name, FieldKind::Bool, BitSize::Fixed(1), LengthSpec::Scalar)
    }

    /// Byte array; runs to the end of the box unless a length is set.
    pub const fn bytes(name: &'static str) -> Self {
        Self::base(name, FieldKind::Bytes, BitSize::Fixed(8), LengthSpec::UntilEnd)
    }

    /// Array of unsigned integers; runs to the end of the box unless a
    /// length is set.
    pub const fn uints(name: &'static str, bits: u32) -> Self {
        Self::base(name, FieldKind::Uint, BitSize::Fixed(bits), LengthSpec::UntilEnd)
    }

    /// Array of signed integers.
    pub const fn ints(name: &'static str, bits: u32) -> Self {
        Self::base(name, FieldKind::Int, BitSize::Fixed(bits), LengthSpec::UntilEnd)
    }

    /// NUL-terminated string.
    pub const fn cstr(name: &'static str) -> Self {
        Self::base(name, FieldKind::CStr, BitSize::Fixed(8), LengthSpec::Scalar)
    }

    /// String that may be NUL-terminated or Pascal-form.
    pub const fn cpstr(name: &'static str) -> Self {
        Self::base(name, FieldKind::CPStr, BitSize::Fixed(8), LengthSpec::Scalar)
    }

    /// Sequence of sub-records; runs to the end of the box unless a length
    /// is set.
    pub const fn records(name: &'static str, schema: &'static [FieldSpec]) -> Self {
        Self::base(name, FieldKind::Records(schema), BitSize::Dynamic, LengthSpec::UntilEnd)
    }

    /// Splice a nested schema's fields inline into this record.
    pub const fn extend(name: &'static str, schema: &'static [FieldSpec]) -> Self {
        Self::base(name, FieldKind::Extend(schema), BitSize::Fixed(0), LengthSpec::Scalar)
    }

    /// Unsigned scalar whose width comes from MPEG-4 expandable bytes.
    pub const fn varint(name: &'static str) -> Self {
        Self::base(name, FieldKind::Uint, BitSize::Varint, LengthSpec::Scalar)
    }

    // ---- modifiers ----

    pub const fn len(mut self, n: u32) -> Self {
        self.length = LengthSpec::Fixed(n);
        self
    }

    pub const fn len_dynamic(mut self) -> Self {
        self.length = LengthSpec::Dynamic;
        self
    }

    /// Per-element (or per-record) size resolved through `field_size`.
    pub const fn size_dynamic(mut self) -> Self {
        self.size = BitSize::Dynamic;
        self
    }

    /// Fixed per-record size in bits, used to validate sequence budgets.
    pub const fn record_size(mut self, bits: u32) -> Self {
        self.size = BitSize::Fixed(bits);
        self
    }

    pub const fn ver(mut self, v: u8) -> Self {
        self.version = VersionSpec::Eq(v);
        self
    }

    pub const fn nver(mut self, v: u8) -> Self {
        self.version = VersionSpec::Ne(v);
        self
    }

    /// Present iff any bit of `mask` is set in the FullBox flags.
    pub const fn opt(mut self, mask: u32) -> Self {
        self.presence = Presence::FlagsSet(mask);
        self
    }

    /// Absent iff any bit of `mask` is set in the FullBox flags.
    pub const fn nopt(mut self, mask: u32) -> Self {
        self.presence = Presence::FlagsClear(mask);
        self
    }

    pub const fn opt_dynamic(mut self) -> Self {
        self.presence = Presence::Dynamic;
        self
    }

    pub const fn konst(mut self, k: u64) -> Self {
        self.constant = Some(k);
        self
    }

    pub const fn ascii(mut self) -> Self {
        self.display = Display::Ascii;
        self
    }

    pub const fn hex(mut self) -> Self {
        self.display = Display::Hex;
        self
    }

    pub const fn fixed16(mut self) -> Self {
        self.display = Display::Fixed16x16;
        self
    }

    pub const fn fixed8(mut self) -> Self {
        self.display = Display::Fixed8x8;
        self
    }

    pub const fn iso639(mut self) -> Self {
        self.display = Display::Iso639;
        self
    }

    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_sequence(&self) -> bool {
        !matches!(self.length, LengthSpec::Scalar)
    }
}

/// Sentinel for `field_length`: consume elements until the enclosing box's
/// remaining budget is exhausted.
pub const UNLIMITED: u64 = u64::MAX;
