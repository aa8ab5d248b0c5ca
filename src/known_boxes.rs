//! The box catalog: one schema (and, where needed, a hook set) per known
//! box kind, wired into [`default_registry`].
//!
//! Field lists follow ISO/IEC 14496-12 plus the QuickTime extensions the
//! sample-entry layouts need.

use crate::bitio::{BitReader, BitWriter};
use crate::boxes::{Context, Fields, StrStyle, Value};
use crate::error::{Error, Result};
use crate::registry::{BoxDef, BoxHandler, Hooked, Registry, Scope};
use crate::schema::{FieldSpec, UNLIMITED};

/// Length hook for the common "array counted by an earlier field" shape.
struct CountedBy {
    array: &'static str,
    count: &'static str,
}

impl BoxHandler for CountedBy {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name == self.array {
            s.box_fields.u64(self.count)
        } else {
            None
        }
    }
}

/*************************** ftyp, styp ****************************/

const BRAND: &[FieldSpec] = &[FieldSpec::bytes("CompatibleBrand").len(4).ascii()];

const FTYP_SCHEMA: &[FieldSpec] = &[
    FieldSpec::bytes("MajorBrand").len(4).ascii(),
    FieldSpec::uint("MinorVersion", 32),
    FieldSpec::records("CompatibleBrands", BRAND).record_size(32),
];

/*************************** mvhd ****************************/

const MVHD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("CreationTimeV0", 32).ver(0),
    FieldSpec::uint("ModificationTimeV0", 32).ver(0),
    FieldSpec::uint("CreationTimeV1", 64).ver(1),
    FieldSpec::uint("ModificationTimeV1", 64).ver(1),
    FieldSpec::uint("Timescale", 32),
    FieldSpec::uint("DurationV0", 32).ver(0),
    FieldSpec::uint("DurationV1", 64).ver(1),
    FieldSpec::int("Rate", 32).fixed16(),
    FieldSpec::int("Volume", 16).fixed8(),
    FieldSpec::int("Reserved", 16).konst(0),
    FieldSpec::uints("Reserved2", 32).len(2).konst(0),
    FieldSpec::ints("Matrix", 32).len(9).hex(),
    FieldSpec::ints("PreDefined", 32).len(6),
    FieldSpec::uint("NextTrackID", 32),
];

/*************************** tkhd ****************************/

const TKHD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("CreationTimeV0", 32).ver(0),
    FieldSpec::uint("ModificationTimeV0", 32).ver(0),
    FieldSpec::uint("TrackIDV0", 32).ver(0),
    FieldSpec::uint("ReservedV0", 32).ver(0).konst(0),
    FieldSpec::uint("DurationV0", 32).ver(0),
    FieldSpec::uint("CreationTimeV1", 64).ver(1),
    FieldSpec::uint("ModificationTimeV1", 64).ver(1),
    FieldSpec::uint("TrackIDV1", 32).ver(1),
    FieldSpec::uint("ReservedV1", 32).ver(1).konst(0),
    FieldSpec::uint("DurationV1", 64).ver(1),
    FieldSpec::uints("Reserved", 32).len(2).konst(0),
    FieldSpec::int("Layer", 16),
    FieldSpec::int("AlternateGroup", 16),
    FieldSpec::int("Volume", 16).fixed8(),
    FieldSpec::uint("Reserved2", 16).konst(0),
    FieldSpec::ints("Matrix", 32).len(9).hex(),
    FieldSpec::uint("Width", 32).fixed16(),
    FieldSpec::uint("Height", 32).fixed16(),
];

/*************************** mdhd ****************************/

const MDHD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("CreationTimeV0", 32).ver(0),
    FieldSpec::uint("ModificationTimeV0", 32).ver(0),
    FieldSpec::uint("CreationTimeV1", 64).ver(1),
    FieldSpec::uint("ModificationTimeV1", 64).ver(1),
    FieldSpec::uint("Timescale", 32),
    FieldSpec::uint("DurationV0", 32).ver(0),
    FieldSpec::uint("DurationV1", 64).ver(1),
    FieldSpec::flag("Pad"),
    FieldSpec::uints("Language", 5).len(3).iso639(),
    FieldSpec::uint("PreDefined", 16),
];

/*************************** hdlr ****************************/

// PreDefined corresponds to component_type of QuickTime: always zero in
// ISO-14496 files, "mhlr" or "dhlr" in QuickTime ones.
const HDLR_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("PreDefined", 32),
    FieldSpec::bytes("HandlerType").len(4).ascii(),
    FieldSpec::uints("Reserved", 32).len(3).konst(0),
    FieldSpec::cpstr("Name"),
    FieldSpec::bytes("Padding").konst(0),
];

struct HdlrHooks;

impl BoxHandler for HdlrHooks {
    fn is_pascal(&self, s: &Scope<'_>, name: &str, _body: &[u8], remaining: u64) -> bool {
        name == "Name" && remaining == 0 && s.box_fields.u64("PreDefined").unwrap_or(0) != 0
    }
}

static HDLR_HOOKS: HdlrHooks = HdlrHooks;

/*************************** vmhd, smhd ****************************/

const VMHD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("Graphicsmode", 16),
    FieldSpec::uints("Opcolor", 16).len(3),
];

const SMHD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::int("Balance", 16).fixed8(),
    FieldSpec::uint("Reserved", 16).konst(0),
];

/*************************** dref, url, urn ****************************/

const DREF_SCHEMA: &[FieldSpec] = &[FieldSpec::uint("EntryCount", 32)];

const SELF_CONTAINED: u32 = 0x000001;

const URL_SCHEMA: &[FieldSpec] = &[FieldSpec::cstr("Location").nopt(SELF_CONTAINED)];

const URN_SCHEMA: &[FieldSpec] = &[
    FieldSpec::cstr("Name").nopt(SELF_CONTAINED),
    FieldSpec::cstr("Location").nopt(SELF_CONTAINED),
];

/*************************** elst ****************************/

const ELST_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("SegmentDurationV0", 32).ver(0),
    FieldSpec::int("MediaTimeV0", 32).ver(0),
    FieldSpec::uint("SegmentDurationV1", 64).ver(1),
    FieldSpec::int("MediaTimeV1", 64).ver(1),
    FieldSpec::int("MediaRateInteger", 16),
    FieldSpec::int("MediaRateFraction", 16).konst(0),
];

const ELST_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::records("Entries", ELST_ENTRY).size_dynamic().len_dynamic(),
];

struct ElstHooks;

impl BoxHandler for ElstHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name == "Entries" { s.box_fields.u64("EntryCount") } else { None }
    }

    fn field_size(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name != "Entries" {
            return None;
        }
        Some(match s.version {
            0 => 32 + 32 + 16 + 16,
            _ => 64 + 64 + 16 + 16,
        })
    }
}

static ELST_HOOKS: ElstHooks = ElstHooks;

/*************************** mehd, mfhd, mfro, tfdt ****************************/

const MEHD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("FragmentDurationV0", 32).ver(0),
    FieldSpec::uint("FragmentDurationV1", 64).ver(1),
];

const MFHD_SCHEMA: &[FieldSpec] = &[FieldSpec::uint("SequenceNumber", 32)];

const MFRO_SCHEMA: &[FieldSpec] = &[FieldSpec::uint("Size", 32)];

const TFDT_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("BaseMediaDecodeTimeV0", 32).ver(0),
    FieldSpec::uint("BaseMediaDecodeTimeV1", 64).ver(1),
];

/*************************** tfhd ****************************/

pub const TFHD_BASE_DATA_OFFSET_PRESENT: u32 = 0x000001;
pub const TFHD_SAMPLE_DESCRIPTION_INDEX_PRESENT: u32 = 0x000002;
pub const TFHD_DEFAULT_SAMPLE_DURATION_PRESENT: u32 = 0x000008;
pub const TFHD_DEFAULT_SAMPLE_SIZE_PRESENT: u32 = 0x000010;
pub const TFHD_DEFAULT_SAMPLE_FLAGS_PRESENT: u32 = 0x000020;
pub const TFHD_DURATION_IS_EMPTY: u32 = 0x010000;
pub const TFHD_DEFAULT_BASE_IS_MOOF: u32 = 0x020000;

const TFHD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("TrackID", 32),
    FieldSpec::uint("BaseDataOffset", 64).opt(TFHD_BASE_DATA_OFFSET_PRESENT),
    FieldSpec::uint("SampleDescriptionIndex", 32).opt(TFHD_SAMPLE_DESCRIPTION_INDEX_PRESENT),
    FieldSpec::uint("DefaultSampleDuration", 32).opt(TFHD_DEFAULT_SAMPLE_DURATION_PRESENT),
    FieldSpec::uint("DefaultSampleSize", 32).opt(TFHD_DEFAULT_SAMPLE_SIZE_PRESENT),
    FieldSpec::uint("DefaultSampleFlags", 32).opt(TFHD_DEFAULT_SAMPLE_FLAGS_PRESENT).hex(),
];

/*************************** trun ****************************/

pub const TRUN_DATA_OFFSET_PRESENT: u32 = 0x000001;
pub const TRUN_FIRST_SAMPLE_FLAGS_PRESENT: u32 = 0x000004;
pub const TRUN_SAMPLE_DURATION_PRESENT: u32 = 0x000100;
pub const TRUN_SAMPLE_SIZE_PRESENT: u32 = 0x000200;
pub const TRUN_SAMPLE_FLAGS_PRESENT: u32 = 0x000400;
pub const TRUN_SAMPLE_CTS_OFFSET_PRESENT: u32 = 0x000800;

const TRUN_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("SampleDuration", 32).opt(TRUN_SAMPLE_DURATION_PRESENT),
    FieldSpec::uint("SampleSize", 32).opt(TRUN_SAMPLE_SIZE_PRESENT),
    FieldSpec::uint("SampleFlags", 32).opt(TRUN_SAMPLE_FLAGS_PRESENT).hex(),
    FieldSpec::uint("SampleCompositionTimeOffsetV0", 32).opt(TRUN_SAMPLE_CTS_OFFSET_PRESENT).ver(0),
    FieldSpec::int("SampleCompositionTimeOffsetV1", 32).opt(TRUN_SAMPLE_CTS_OFFSET_PRESENT).nver(0),
];

const TRUN_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("SampleCount", 32),
    FieldSpec::int("DataOffset", 32).opt(TRUN_DATA_OFFSET_PRESENT),
    FieldSpec::uint("FirstSampleFlags", 32).opt(TRUN_FIRST_SAMPLE_FLAGS_PRESENT).hex(),
    FieldSpec::records("Entries", TRUN_ENTRY).size_dynamic().len_dynamic(),
];

struct TrunHooks;

impl BoxHandler for TrunHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name == "Entries" { s.box_fields.u64("SampleCount") } else { None }
    }

    fn field_size(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name != "Entries" {
            return None;
        }
        let mut size = 0;
        if s.flags & TRUN_SAMPLE_DURATION_PRESENT != 0 {
            size += 32;
        }
        if s.flags & TRUN_SAMPLE_SIZE_PRESENT != 0 {
            size += 32;
        }
        if s.flags & TRUN_SAMPLE_FLAGS_PRESENT != 0 {
            size += 32;
        }
        if s.flags & TRUN_SAMPLE_CTS_OFFSET_PRESENT != 0 {
            size += 32;
        }
        Some(size)
    }
}

static TRUN_HOOKS: TrunHooks = TrunHooks;

/*************************** trex ****************************/

const TREX_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("TrackID", 32),
    FieldSpec::uint("DefaultSampleDescriptionIndex", 32),
    FieldSpec::uint("DefaultSampleDuration", 32),
    FieldSpec::uint("DefaultSampleSize", 32),
    FieldSpec::uint("DefaultSampleFlags", 32).hex(),
];

/*************************** tfra ****************************/

const TFRA_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("TimeV0", 32).ver(0),
    FieldSpec::uint("MoofOffsetV0", 32).ver(0),
    FieldSpec::uint("TimeV1", 64).ver(1),
    FieldSpec::uint("MoofOffsetV1", 64).ver(1),
    FieldSpec::uint("TrafNumber", 32).size_dynamic(),
    FieldSpec::uint("TrunNumber", 32).size_dynamic(),
    FieldSpec::uint("SampleNumber", 32).size_dynamic(),
];

const TFRA_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("TrackID", 32),
    FieldSpec::uint("Reserved", 26).konst(0),
    FieldSpec::uint("LengthSizeOfTrafNum", 2),
    FieldSpec::uint("LengthSizeOfTrunNum", 2),
    FieldSpec::uint("LengthSizeOfSampleNum", 2),
    FieldSpec::uint("NumberOfEntry", 32),
    FieldSpec::records("Entries", TFRA_ENTRY).size_dynamic().len_dynamic(),
];

struct TfraHooks;

impl TfraHooks {
    fn code_bits(s: &Scope<'_>, field: &str) -> u64 {
        (s.box_fields.u64(field).unwrap_or(0) + 1) * 8
    }
}

impl BoxHandler for TfraHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name == "Entries" { s.box_fields.u64("NumberOfEntry") } else { None }
    }

    fn field_size(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        let sized = Self::code_bits(s, "LengthSizeOfTrafNum")
            + Self::code_bits(s, "LengthSizeOfTrunNum")
            + Self::code_bits(s, "LengthSizeOfSampleNum");
        match name {
            "TrafNumber" => Some(Self::code_bits(s, "LengthSizeOfTrafNum")),
            "TrunNumber" => Some(Self::code_bits(s, "LengthSizeOfTrunNum")),
            "SampleNumber" => Some(Self::code_bits(s, "LengthSizeOfSampleNum")),
            "Entries" => Some(match s.version {
                0 => 32 + 32 + sized,
                _ => 64 + 64 + sized,
            }),
            _ => None,
        }
    }
}

static TFRA_HOOKS: TfraHooks = TfraHooks;

/*************************** sample tables ****************************/

const STSD_SCHEMA: &[FieldSpec] = &[FieldSpec::uint("EntryCount", 32)];

const STTS_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("SampleCount", 32),
    FieldSpec::uint("SampleDelta", 32),
];

const STTS_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::records("Entries", STTS_ENTRY).record_size(64).len_dynamic(),
];

static STTS_HOOKS: CountedBy = CountedBy { array: "Entries", count: "EntryCount" };

const CTTS_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("SampleCount", 32),
    FieldSpec::uint("SampleOffsetV0", 32).ver(0),
    FieldSpec::int("SampleOffsetV1", 32).ver(1),
];

const CTTS_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::records("Entries", CTTS_ENTRY).record_size(64).len_dynamic(),
];

static CTTS_HOOKS: CountedBy = CountedBy { array: "Entries", count: "EntryCount" };

const STSS_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::uints("SampleNumber", 32).len_dynamic(),
];

static STSS_HOOKS: CountedBy = CountedBy { array: "SampleNumber", count: "EntryCount" };

const STSC_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("FirstChunk", 32),
    FieldSpec::uint("SamplesPerChunk", 32),
    FieldSpec::uint("SampleDescriptionIndex", 32),
];

const STSC_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::records("Entries", STSC_ENTRY).record_size(96).len_dynamic(),
];

static STSC_HOOKS: CountedBy = CountedBy { array: "Entries", count: "EntryCount" };

const STSZ_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("SampleSize", 32),
    FieldSpec::uint("SampleCount", 32),
    FieldSpec::uints("EntrySize", 32).len_dynamic(),
];

struct StszHooks;

impl BoxHandler for StszHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name != "EntrySize" {
            return None;
        }
        // A fixed SampleSize leaves the table empty; entries present
        // alongside one are contradictory and are dropped on encode.
        if s.box_fields.u64("SampleSize").unwrap_or(0) == 0 {
            s.box_fields.u64("SampleCount")
        } else {
            Some(0)
        }
    }
}

static STSZ_HOOKS: StszHooks = StszHooks;

const STCO_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::uints("ChunkOffset", 32).len_dynamic(),
];

static STCO_HOOKS: CountedBy = CountedBy { array: "ChunkOffset", count: "EntryCount" };

const CO64_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::uints("ChunkOffset", 64).len_dynamic(),
];

static CO64_HOOKS: CountedBy = CountedBy { array: "ChunkOffset", count: "EntryCount" };

/*************************** sbgp ****************************/

const SBGP_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("SampleCount", 32),
    FieldSpec::uint("GroupDescriptionIndex", 32),
];

const SBGP_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("GroupingType", 32),
    FieldSpec::uint("GroupingTypeParameter", 32).ver(1),
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::records("Entries", SBGP_ENTRY).record_size(64).len_dynamic(),
];

static SBGP_HOOKS: CountedBy = CountedBy { array: "Entries", count: "EntryCount" };

/*************************** sgpd ****************************/

const ROLL_DISTANCE_L: &[FieldSpec] = &[
    FieldSpec::uint("DescriptionLength", 32),
    FieldSpec::int("RollDistance", 16),
];

const ALT_STARTUP_OPT: &[FieldSpec] = &[
    FieldSpec::uint("NumOutputSamples", 16),
    FieldSpec::uint("NumTotalSamples", 16),
];

const ALT_STARTUP_ENTRY: &[FieldSpec] = &[
    FieldSpec::uint("RollCount", 16),
    FieldSpec::uint("FirstOutputSample", 16),
    FieldSpec::uints("SampleOffset", 32).len_dynamic(),
    FieldSpec::records("Opts", ALT_STARTUP_OPT).record_size(32),
];

const ALT_STARTUP_ENTRY_L: &[FieldSpec] = &[
    FieldSpec::uint("DescriptionLength", 32),
    FieldSpec::extend("AlternativeStartupEntry", ALT_STARTUP_ENTRY).size_dynamic(),
];

const VISUAL_RANDOM_ACCESS_ENTRY: &[FieldSpec] = &[
    FieldSpec::flag("NumLeadingSamplesKnown"),
    FieldSpec::uint("NumLeadingSamples", 7),
];

const VISUAL_RANDOM_ACCESS_ENTRY_L: &[FieldSpec] = &[
    FieldSpec::uint("DescriptionLength", 32),
    FieldSpec::extend("VisualRandomAccessEntry", VISUAL_RANDOM_ACCESS_ENTRY),
];

const TEMPORAL_LEVEL_ENTRY: &[FieldSpec] = &[
    FieldSpec::flag("LevelIndependentlyDecodable"),
    FieldSpec::uint("Reserved", 7).konst(0),
];

const TEMPORAL_LEVEL_ENTRY_L: &[FieldSpec] = &[
    FieldSpec::uint("DescriptionLength", 32),
    FieldSpec::extend("TemporalLevelEntry", TEMPORAL_LEVEL_ENTRY),
];

const SGPD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::bytes("GroupingType").len(4).ascii(),
    FieldSpec::uint("DefaultLength", 32).ver(1),
    FieldSpec::uint("DefaultSampleDescriptionIndex", 32).ver(2),
    FieldSpec::uint("EntryCount", 32),
    FieldSpec::ints("RollDistances", 16).len_dynamic().opt_dynamic(),
    FieldSpec::records("RollDistancesL", ROLL_DISTANCE_L).record_size(48).len_dynamic().opt_dynamic(),
    FieldSpec::records("AlternativeStartupEntries", ALT_STARTUP_ENTRY).size_dynamic().len_dynamic().opt_dynamic(),
    FieldSpec::records("AlternativeStartupEntriesL", ALT_STARTUP_ENTRY_L).len_dynamic().opt_dynamic(),
    FieldSpec::records("VisualRandomAccessEntries", VISUAL_RANDOM_ACCESS_ENTRY).record_size(8).len_dynamic().opt_dynamic(),
    FieldSpec::records("VisualRandomAccessEntriesL", VISUAL_RANDOM_ACCESS_ENTRY_L).record_size(40).len_dynamic().opt_dynamic(),
    FieldSpec::records("TemporalLevelEntries", TEMPORAL_LEVEL_ENTRY).record_size(8).len_dynamic().opt_dynamic(),
    FieldSpec::records("TemporalLevelEntriesL", TEMPORAL_LEVEL_ENTRY_L).record_size(40).len_dynamic().opt_dynamic(),
    FieldSpec::bytes("Unsupported").opt_dynamic(),
];

struct SgpdHooks;

impl SgpdHooks {
    fn grouping<'a>(s: &'a Scope<'_>) -> &'a [u8] {
        s.box_fields.bytes("GroupingType").unwrap_or(b"")
    }

    fn no_default_length(s: &Scope<'_>) -> bool {
        s.version == 1 && s.box_fields.u64("DefaultLength").unwrap_or(0) == 0
    }
}

impl BoxHandler for SgpdHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        match name {
            "RollDistances" | "RollDistancesL"
            | "AlternativeStartupEntries" | "AlternativeStartupEntriesL"
            | "VisualRandomAccessEntries" | "VisualRandomAccessEntriesL"
            | "TemporalLevelEntries" | "TemporalLevelEntriesL" => s.box_fields.u64("EntryCount"),
            "SampleOffset" => s.fields.u64("RollCount"),
            _ => None,
        }
    }

    fn field_size(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        match name {
            "AlternativeStartupEntries" => {
                Some(s.box_fields.u64("DefaultLength").unwrap_or(0) * 8)
            }
            "AlternativeStartupEntry" => Some(s.fields.u64("DescriptionLength").unwrap_or(0) * 8),
            _ => None,
        }
    }

    fn field_enabled(&self, s: &Scope<'_>, name: &str) -> bool {
        let grouping = Self::grouping(s);
        let no_default = Self::no_default_length(s);
        let roll = grouping == b"roll" || grouping == b"prol";
        let alst = grouping == b"alst";
        let rap = grouping == b"rap ";
        let tele = grouping == b"tele";
        match name {
            "RollDistances" => roll && !no_default,
            "RollDistancesL" => roll && no_default,
            "AlternativeStartupEntries" => alst && !no_default,
            "AlternativeStartupEntriesL" => alst && no_default,
            "VisualRandomAccessEntries" => rap && !no_default,
            "VisualRandomAccessEntriesL" => rap && no_default,
            "TemporalLevelEntries" => tele && !no_default,
            "TemporalLevelEntriesL" => tele && no_default,
            "Unsupported" => !roll && !alst && !rap && !tele,
            _ => true,
        }
    }
}

static SGPD_HOOKS: SgpdHooks = SgpdHooks;

/*************************** sdtp ****************************/

const SDTP_SAMPLE: &[FieldSpec] = &[
    FieldSpec::uint("IsLeading", 2),
    FieldSpec::uint("SampleDependsOn", 2),
    FieldSpec::uint("SampleIsDependedOn", 2),
    FieldSpec::uint("SampleHasRedundancy", 2),
];

const SDTP_SCHEMA: &[FieldSpec] = &[
    FieldSpec::records("Samples", SDTP_SAMPLE).record_size(8),
];

/*************************** sidx ****************************/

const SIDX_REFERENCE: &[FieldSpec] = &[
    FieldSpec::flag("ReferenceType"),
    FieldSpec::uint("ReferencedSize", 31),
    FieldSpec::uint("SubsegmentDuration", 32),
    FieldSpec::flag("StartsWithSAP"),
    FieldSpec::uint("SAPType", 3),
    FieldSpec::uint("SAPDeltaTime", 28),
];

const SIDX_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("ReferenceID", 32),
    FieldSpec::uint("Timescale", 32),
    FieldSpec::uint("EarliestPresentationTimeV0", 32).ver(0),
    FieldSpec::uint("FirstOffsetV0", 32).ver(0),
    FieldSpec::uint("EarliestPresentationTimeV1", 64).nver(0),
    FieldSpec::uint("FirstOffsetV1", 64).nver(0),
    FieldSpec::uint("Reserved", 16).konst(0),
    FieldSpec::uint("ReferenceCount", 16),
    FieldSpec::records("References", SIDX_REFERENCE).record_size(96).len_dynamic(),
];

static SIDX_HOOKS: CountedBy = CountedBy { array: "References", count: "ReferenceCount" };

/*************************** emsg ****************************/

const EMSG_SCHEMA: &[FieldSpec] = &[
    FieldSpec::cstr("SchemeIdUri"),
    FieldSpec::cstr("Value"),
    FieldSpec::uint("Timescale", 32),
    FieldSpec::uint("PresentationTimeDelta", 32).ver(0),
    FieldSpec::uint("PresentationTime", 64).ver(1),
    FieldSpec::uint("EventDuration", 32),
    FieldSpec::uint("Id", 32),
    FieldSpec::bytes("MessageData").ascii(),
];

struct EmsgHooks;

fn read_terminated(r: &mut BitReader<'_>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    loop {
        let b = r.read_bits(8)? as u8;
        if b == 0 {
            return Ok(bytes);
        }
        bytes.push(b);
    }
}

impl BoxHandler for EmsgHooks {
    // Version 1 moves the two URI strings behind the numeric fields, into
    // the slot the schema reserves for MessageData.
    fn on_read(
        &self,
        fields: &mut Fields,
        name: &str,
        r: &mut BitReader<'_>,
        left_bits: u64,
        version: u8,
        _flags: u32,
        _ctx: &Context,
    ) -> Result<Hooked> {
        if version == 0 {
            return Ok(Hooked::default());
        }
        match name {
            "SchemeIdUri" | "Value" => Ok(Hooked { bits: 0, handled: true }),
            "MessageData" => {
                let scheme = read_terminated(r)?;
                let value = read_terminated(r)?;
                let bits = (scheme.len() + value.len() + 2) as u64 * 8;
                if bits > left_bits {
                    return Err(Error::InvalidHookReturn(
                        "event strings overran the box".into(),
                    ));
                }
                fields.set("SchemeIdUri", Value::Str { bytes: scheme, style: StrStyle::Nul });
                fields.set("Value", Value::Str { bytes: value, style: StrStyle::Nul });
                Ok(Hooked { bits, handled: false })
            }
            _ => Ok(Hooked::default()),
        }
    }

    fn on_write(
        &self,
        fields: &Fields,
        name: &str,
        w: &mut BitWriter<'_>,
        version: u8,
        _flags: u32,
        _ctx: &Context,
    ) -> Result<Hooked> {
        if version == 0 {
            return Ok(Hooked::default());
        }
        match name {
            "SchemeIdUri" | "Value" => Ok(Hooked { bits: 0, handled: true }),
            "MessageData" => {
                let scheme = fields.bytes("SchemeIdUri").unwrap_or(b"");
                let value = fields.bytes("Value").unwrap_or(b"");
                let mut bits = 0;
                for s in [scheme, value] {
                    w.write_bytes(s)?;
                    w.write_bits(0, 8)?;
                    bits += (s.len() as u64 + 1) * 8;
                }
                Ok(Hooked { bits, handled: false })
            }
            _ => Ok(Hooked::default()),
        }
    }
}

static EMSG_HOOKS: EmsgHooks = EmsgHooks;

/*************************** pssh ****************************/

const PSSH_KID: &[FieldSpec] = &[FieldSpec::bytes("KID").len(16)];

const PSSH_SCHEMA: &[FieldSpec] = &[
    FieldSpec::bytes("SystemID").len(16),
    FieldSpec::uint("KIDCount", 32).nver(0),
    FieldSpec::records("KIDs", PSSH_KID).record_size(128).len_dynamic().nver(0),
    FieldSpec::int("DataSize", 32),
    FieldSpec::bytes("Data").len_dynamic(),
];

struct PsshHooks;

fn quoted_hex(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("\"{}\"", hex)
}

impl BoxHandler for PsshHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        match name {
            "KIDs" => s.box_fields.u64("KIDCount"),
            "Data" => Some(s.box_fields.i64("DataSize").unwrap_or(0).max(0) as u64),
            _ => None,
        }
    }

    fn stringify(&self, s: &Scope<'_>, name: &str) -> Option<String> {
        match name {
            "SystemID" => Some(quoted_hex(s.fields.bytes("SystemID")?)),
            "KIDs" => {
                let kids = s.fields.records("KIDs")?;
                let parts: Vec<String> = kids
                    .iter()
                    .map(|k| quoted_hex(k.bytes("KID").unwrap_or(b"")))
                    .collect();
                Some(format!("[{}]", parts.join(" ")))
            }
            _ => None,
        }
    }
}

static PSSH_HOOKS: PsshHooks = PsshHooks;

/*************************** esds ****************************/

pub const ES_DESCR_TAG: i64 = 0x03;
pub const DECODER_CONFIG_DESCR_TAG: i64 = 0x04;
pub const DEC_SPECIFIC_INFO_TAG: i64 = 0x05;
pub const SL_CONFIG_DESCR_TAG: i64 = 0x06;

const ES_DESCRIPTOR: &[FieldSpec] = &[
    FieldSpec::uint("ESID", 16),
    FieldSpec::flag("StreamDependenceFlag"),
    FieldSpec::flag("UrlFlag"),
    FieldSpec::flag("OcrStreamFlag"),
    FieldSpec::int("StreamPriority", 5),
    FieldSpec::uint("DependsOnESID", 16).opt_dynamic(),
    FieldSpec::uint("URLLength", 8).opt_dynamic(),
    FieldSpec::bytes("URLString").len_dynamic().opt_dynamic().ascii(),
    FieldSpec::uint("OCRESID", 16).opt_dynamic(),
];

const DECODER_CONFIG_DESCRIPTOR: &[FieldSpec] = &[
    FieldSpec::uint("ObjectTypeIndication", 8).hex(),
    FieldSpec::int("StreamType", 6),
    FieldSpec::flag("UpStream"),
    FieldSpec::flag("Reserved"),
    FieldSpec::uint("BufferSizeDB", 24),
    FieldSpec::uint("MaxBitrate", 32),
    FieldSpec::uint("AvgBitrate", 32),
];

const DESCRIPTOR: &[FieldSpec] = &[
    FieldSpec::int("Tag", 8),
    FieldSpec::varint("Size"),
    FieldSpec::extend("ESDescriptor", ES_DESCRIPTOR).opt_dynamic(),
    FieldSpec::extend("DecoderConfigDescriptor", DECODER_CONFIG_DESCRIPTOR).opt_dynamic(),
    FieldSpec::bytes("Data").len_dynamic().opt_dynamic(),
];

const ESDS_SCHEMA: &[FieldSpec] = &[
    FieldSpec::records("Descriptors", DESCRIPTOR),
];

struct EsdsHooks;

impl BoxHandler for EsdsHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        match name {
            "Data" => s.fields.u64("Size"),
            "URLString" => s.fields.u64("URLLength"),
            _ => None,
        }
    }

    fn field_enabled(&self, s: &Scope<'_>, name: &str) -> bool {
        let tag = s.fields.i64("Tag").unwrap_or(0);
        match name {
            "ESDescriptor" => tag == ES_DESCR_TAG,
            "DecoderConfigDescriptor" => tag == DECODER_CONFIG_DESCR_TAG,
            "Data" => tag != ES_DESCR_TAG && tag != DECODER_CONFIG_DESCR_TAG,
            "DependsOnESID" => s.fields.bool("StreamDependenceFlag").unwrap_or(false),
            "URLLength" | "URLString" => s.fields.bool("UrlFlag").unwrap_or(false),
            "OCRESID" => s.fields.bool("OcrStreamFlag").unwrap_or(false),
            _ => true,
        }
    }

    fn stringify(&self, s: &Scope<'_>, name: &str) -> Option<String> {
        if name != "Tag" {
            return None;
        }
        match s.fields.i64("Tag")? {
            ES_DESCR_TAG => Some("ESDescr".into()),
            DECODER_CONFIG_DESCR_TAG => Some("DecoderConfigDescr".into()),
            DEC_SPECIFIC_INFO_TAG => Some("DecSpecificInfo".into()),
            SL_CONFIG_DESCR_TAG => Some("SLConfigDescr".into()),
            _ => None,
        }
    }
}

static ESDS_HOOKS: EsdsHooks = EsdsHooks;

/*************************** colr ****************************/

const COLR_SCHEMA: &[FieldSpec] = &[
    FieldSpec::bytes("ColourType").len(4).ascii(),
    FieldSpec::uint("ColourPrimaries", 16).opt_dynamic(),
    FieldSpec::uint("TransferCharacteristics", 16).opt_dynamic(),
    FieldSpec::uint("MatrixCoefficients", 16).opt_dynamic(),
    FieldSpec::flag("FullRangeFlag").opt_dynamic(),
    FieldSpec::uint("Reserved", 7).opt_dynamic(),
    FieldSpec::bytes("Profile").opt_dynamic(),
    FieldSpec::bytes("Unknown").opt_dynamic(),
];

struct ColrHooks;

impl BoxHandler for ColrHooks {
    fn field_enabled(&self, s: &Scope<'_>, name: &str) -> bool {
        match s.fields.bytes("ColourType").unwrap_or(b"") {
            b"nclx" => matches!(
                name,
                "ColourType" | "ColourPrimaries" | "TransferCharacteristics"
                    | "MatrixCoefficients" | "FullRangeFlag" | "Reserved"
            ),
            b"rICC" | b"prof" => name == "Profile",
            _ => name == "Unknown",
        }
    }
}

static COLR_HOOKS: ColrHooks = ColrHooks;

/*************************** free, skip, mdat ****************************/

const DATA_SCHEMA: &[FieldSpec] = &[FieldSpec::bytes("Data")];

/*************************** meta ****************************/

struct MetaHooks;

impl BoxHandler for MetaHooks {
    // Apple QuickTime writes meta without the version/flags prefix; a
    // non-zero byte among the first four means a child box size is already
    // there. A genuine ISO meta with version=0/flags=0 is indistinguishable
    // from the QuickTime layout by this peek and is taken as ISO.
    fn before_unmarshal(
        &self,
        r: &mut BitReader<'_>,
        payload_size: u64,
        _ctx: &Context,
    ) -> Result<(u64, bool)> {
        if payload_size < 4 {
            return Ok((0, false));
        }
        let peek = r.peek_bytes(4)?;
        Ok((0, peek.iter().any(|&b| b != 0)))
    }
}

static META_HOOKS: MetaHooks = MetaHooks;

/*************************** sample entries ****************************/

const SAMPLE_ENTRY: &[FieldSpec] = &[
    FieldSpec::bytes("Reserved").len(6).konst(0),
    FieldSpec::uint("DataReferenceIndex", 16),
];

const VISUAL_SAMPLE_ENTRY: &[FieldSpec] = &[
    FieldSpec::extend("SampleEntry", SAMPLE_ENTRY),
    FieldSpec::uint("PreDefined", 16),
    FieldSpec::uint("Reserved", 16).konst(0),
    FieldSpec::uints("PreDefined2", 32).len(3),
    FieldSpec::uint("Width", 16),
    FieldSpec::uint("Height", 16),
    FieldSpec::uint("Horizresolution", 32).fixed16(),
    FieldSpec::uint("Vertresolution", 32).fixed16(),
    FieldSpec::uint("Reserved2", 32).konst(0),
    FieldSpec::uint("FrameCount", 16),
    FieldSpec::bytes("Compressorname").len(32),
    FieldSpec::uint("Depth", 16),
    FieldSpec::int("PreDefined3", 16),
];

struct VisualSampleEntryHooks;

impl BoxHandler for VisualSampleEntryHooks {
    fn stringify(&self, s: &Scope<'_>, name: &str) -> Option<String> {
        if name != "Compressorname" {
            return None;
        }
        let bytes = s.fields.bytes("Compressorname")?;
        let len = *bytes.first()? as usize;
        if len <= 31 && len < bytes.len() {
            Some(format!("\"{}\"", String::from_utf8_lossy(&bytes[1..=len])))
        } else {
            None
        }
    }
}

static VISUAL_SAMPLE_ENTRY_HOOKS: VisualSampleEntryHooks = VisualSampleEntryHooks;

const AUDIO_SAMPLE_ENTRY: &[FieldSpec] = &[
    FieldSpec::extend("SampleEntry", SAMPLE_ENTRY).opt_dynamic(),
    FieldSpec::uint("EntryVersion", 16).opt_dynamic(),
    FieldSpec::uints("Reserved", 16).len(3).opt_dynamic().konst(0),
    FieldSpec::uint("ChannelCount", 16).opt_dynamic(),
    FieldSpec::uint("SampleSize", 16).opt_dynamic(),
    FieldSpec::uint("PreDefined", 16).opt_dynamic(),
    FieldSpec::uint("Reserved2", 16).opt_dynamic().konst(0),
    FieldSpec::uint("SampleRate", 32).opt_dynamic().fixed16(),
    FieldSpec::bytes("QuickTimeData").len_dynamic().opt_dynamic(),
];

struct AudioSampleEntryHooks;

impl BoxHandler for AudioSampleEntryHooks {
    fn field_enabled(&self, s: &Scope<'_>, name: &str) -> bool {
        if name == "QuickTimeData" {
            let version = s.fields.u64("EntryVersion").unwrap_or(0);
            return s.ctx.quicktime && (s.ctx.under_wave || version == 1 || version == 2);
        }
        // Inside a QuickTime wave container only the raw blob remains.
        !(s.ctx.quicktime && s.ctx.under_wave)
    }

    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        if name != "QuickTimeData" {
            return None;
        }
        if s.ctx.quicktime {
            if s.ctx.under_wave {
                return Some(UNLIMITED);
            }
            match s.fields.u64("EntryVersion").unwrap_or(0) {
                1 => return Some(16),
                2 => return Some(36),
                _ => {}
            }
        }
        Some(0)
    }
}

static AUDIO_SAMPLE_ENTRY_HOOKS: AudioSampleEntryHooks = AudioSampleEntryHooks;

/*************************** avcC ****************************/

pub const AVC_BASELINE_PROFILE: u64 = 66;
pub const AVC_MAIN_PROFILE: u64 = 77;
pub const AVC_EXTENDED_PROFILE: u64 = 88;
pub const AVC_HIGH_PROFILE: u64 = 100;
pub const AVC_HIGH_10_PROFILE: u64 = 110;
pub const AVC_HIGH_422_PROFILE: u64 = 122;

const AVC_PARAMETER_SET: &[FieldSpec] = &[
    FieldSpec::uint("Length", 16),
    FieldSpec::bytes("NALUnit").len_dynamic(),
];

const AVCC_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("ConfigurationVersion", 8),
    FieldSpec::uint("Profile", 8),
    FieldSpec::uint("ProfileCompatibility", 8).hex(),
    FieldSpec::uint("Level", 8),
    FieldSpec::uint("Reserved", 6).konst(63),
    FieldSpec::uint("LengthSizeMinusOne", 2),
    FieldSpec::uint("Reserved2", 3).konst(7),
    FieldSpec::uint("NumOfSequenceParameterSets", 5),
    FieldSpec::records("SequenceParameterSets", AVC_PARAMETER_SET).len_dynamic(),
    FieldSpec::uint("NumOfPictureParameterSets", 8),
    FieldSpec::records("PictureParameterSets", AVC_PARAMETER_SET).len_dynamic(),
    FieldSpec::flag("HighProfileFieldsEnabled").hidden(),
    FieldSpec::uint("Reserved3", 6).opt_dynamic().konst(63),
    FieldSpec::uint("ChromaFormat", 2).opt_dynamic(),
    FieldSpec::uint("Reserved4", 5).opt_dynamic().konst(31),
    FieldSpec::uint("BitDepthLumaMinus8", 3).opt_dynamic(),
    FieldSpec::uint("Reserved5", 5).opt_dynamic().konst(31),
    FieldSpec::uint("BitDepthChromaMinus8", 3).opt_dynamic(),
    FieldSpec::uint("NumOfSequenceParameterSetExt", 8).opt_dynamic(),
    FieldSpec::records("SequenceParameterSetsExt", AVC_PARAMETER_SET).len_dynamic().opt_dynamic(),
];

struct AvccHooks;

fn high_profile(profile: u64) -> bool {
    profile == AVC_HIGH_PROFILE
        || profile == AVC_HIGH_10_PROFILE
        || profile == AVC_HIGH_422_PROFILE
        || profile == 144
}

impl BoxHandler for AvccHooks {
    fn field_length(&self, s: &Scope<'_>, name: &str) -> Option<u64> {
        match name {
            "SequenceParameterSets" => s.box_fields.u64("NumOfSequenceParameterSets"),
            "PictureParameterSets" => s.box_fields.u64("NumOfPictureParameterSets"),
            "SequenceParameterSetsExt" => {
                Some(s.box_fields.u64("NumOfSequenceParameterSetExt").unwrap_or(0))
            }
            "NALUnit" => s.fields.u64("Length"),
            _ => None,
        }
    }

    fn field_enabled(&self, s: &Scope<'_>, name: &str) -> bool {
        match name {
            "Reserved3" | "ChromaFormat" | "Reserved4" | "BitDepthLumaMinus8"
            | "Reserved5" | "BitDepthChromaMinus8" | "NumOfSequenceParameterSetExt"
            | "SequenceParameterSetsExt" => {
                s.box_fields.bool("HighProfileFieldsEnabled").unwrap_or(false)
            }
            _ => true,
        }
    }

    fn on_read(
        &self,
        fields: &mut Fields,
        name: &str,
        _r: &mut BitReader<'_>,
        left_bits: u64,
        _version: u8,
        _flags: u32,
        _ctx: &Context,
    ) -> Result<Hooked> {
        if name != "HighProfileFieldsEnabled" {
            return Ok(Hooked::default());
        }
        let enabled = left_bits >= 32 && high_profile(fields.u64("Profile").unwrap_or(0));
        fields.set("HighProfileFieldsEnabled", Value::Bool(enabled));
        Ok(Hooked { bits: 0, handled: true })
    }

    fn on_write(
        &self,
        fields: &Fields,
        name: &str,
        _w: &mut BitWriter<'_>,
        _version: u8,
        _flags: u32,
        _ctx: &Context,
    ) -> Result<Hooked> {
        if name != "HighProfileFieldsEnabled" {
            return Ok(Hooked::default());
        }
        if fields.bool("HighProfileFieldsEnabled").unwrap_or(false)
            && !high_profile(fields.u64("Profile").unwrap_or(0))
        {
            return Err(Error::MalformedBox(
                "Profile and HighProfileFieldsEnabled are inconsistent".into(),
            ));
        }
        Ok(Hooked { bits: 0, handled: true })
    }
}

static AVCC_HOOKS: AvccHooks = AvccHooks;

/*************************** pasp ****************************/

const PASP_SCHEMA: &[FieldSpec] = &[
    FieldSpec::uint("HSpacing", 32),
    FieldSpec::uint("VSpacing", 32),
];

/*************************** registry ****************************/

/// Build the full catalog. Call once; decoding against a registry that is
/// still being built is not supported.
pub fn default_registry() -> Registry {
    let mut reg = Registry::new()
        // plain containers
        .with_def("moov", BoxDef::plain("Movie Box", &[]).container())
        .with_def("trak", BoxDef::plain("Track Box", &[]).container())
        .with_def("mdia", BoxDef::plain("Media Box", &[]).container())
        .with_def("minf", BoxDef::plain("Media Information Box", &[]).container())
        .with_def("stbl", BoxDef::plain("Sample Table Box", &[]).container())
        .with_def("dinf", BoxDef::plain("Data Information Box", &[]).container())
        .with_def("edts", BoxDef::plain("Edit Box", &[]).container())
        .with_def("udta", BoxDef::plain("User Data Box", &[]).container())
        .with_def("mvex", BoxDef::plain("Movie Extends Box", &[]).container())
        .with_def("moof", BoxDef::plain("Movie Fragment Box", &[]).container())
        .with_def("traf", BoxDef::plain("Track Fragment Box", &[]).container())
        .with_def("mfra", BoxDef::plain("Movie Fragment Random Access Box", &[]).container())
        .with_def("sinf", BoxDef::plain("Protection Scheme Information Box", &[]).container())
        .with_def("schi", BoxDef::plain("Scheme Information Box", &[]).container())
        .with_def("wave", BoxDef::plain("QuickTime Wave Box", &[]).container())
        .with_def("ilst", BoxDef::plain("Metadata Item List Box", &[]).container())
        .with_def(
            "meta",
            BoxDef::full("Metadata Box", &[], &[0]).container().hooks(&META_HOOKS),
        )
        // file type
        .with_def("ftyp", BoxDef::plain("File Type Box", FTYP_SCHEMA))
        .with_def("styp", BoxDef::plain("Segment Type Box", FTYP_SCHEMA))
        // movie structure
        .with_def("mvhd", BoxDef::full("Movie Header Box", MVHD_SCHEMA, &[0, 1]))
        .with_def("tkhd", BoxDef::full("Track Header Box", TKHD_SCHEMA, &[0, 1]))
        .with_def("mdhd", BoxDef::full("Media Header Box", MDHD_SCHEMA, &[0, 1]))
        .with_def("hdlr", BoxDef::full("Handler Reference Box", HDLR_SCHEMA, &[0]).hooks(&HDLR_HOOKS))
        .with_def("vmhd", BoxDef::full("Video Media Header Box", VMHD_SCHEMA, &[0]))
        .with_def("smhd", BoxDef::full("Sound Media Header Box", SMHD_SCHEMA, &[0]))
        .with_def("dref", BoxDef::full("Data Reference Box", DREF_SCHEMA, &[0]).container())
        .with_def("url ", BoxDef::full("Data Entry URL Box", URL_SCHEMA, &[0]))
        .with_def("urn ", BoxDef::full("Data Entry URN Box", URN_SCHEMA, &[0]))
        .with_def("elst", BoxDef::full("Edit List Box", ELST_SCHEMA, &[0, 1]).hooks(&ELST_HOOKS))
        // fragments
        .with_def("mehd", BoxDef::full("Movie Extends Header Box", MEHD_SCHEMA, &[0, 1]))
        .with_def("mfhd", BoxDef::full("Movie Fragment Header Box", MFHD_SCHEMA, &[0]))
        .with_def("mfro", BoxDef::full("Movie Fragment Random Access Offset Box", MFRO_SCHEMA, &[0]))
        .with_def("tfhd", BoxDef::full("Track Fragment Header Box", TFHD_SCHEMA, &[0]))
        .with_def("tfdt", BoxDef::full("Track Fragment Decode Time Box", TFDT_SCHEMA, &[0, 1]))
        .with_def("trun", BoxDef::full("Track Fragment Run Box", TRUN_SCHEMA, &[0, 1]).hooks(&TRUN_HOOKS))
        .with_def("trex", BoxDef::full("Track Extends Box", TREX_SCHEMA, &[0]))
        .with_def("tfra", BoxDef::full("Track Fragment Random Access Box", TFRA_SCHEMA, &[0, 1]).hooks(&TFRA_HOOKS))
        // sample tables
        .with_def("stsd", BoxDef::full("Sample Description Box", STSD_SCHEMA, &[0]).container())
        .with_def("stts", BoxDef::full("Decoding Time-to-Sample Box", STTS_SCHEMA, &[0]).hooks(&STTS_HOOKS))
        .with_def("ctts", BoxDef::full("Composition Time-to-Sample Box", CTTS_SCHEMA, &[0, 1]).hooks(&CTTS_HOOKS))
        .with_def("stss", BoxDef::full("Sync Sample Box", STSS_SCHEMA, &[0]).hooks(&STSS_HOOKS))
        .with_def("stsc", BoxDef::full("Sample-to-Chunk Box", STSC_SCHEMA, &[0]).hooks(&STSC_HOOKS))
        .with_def("stsz", BoxDef::full("Sample Size Box", STSZ_SCHEMA, &[0]).hooks(&STSZ_HOOKS))
        .with_def("stco", BoxDef::full("Chunk Offset Box", STCO_SCHEMA, &[0]).hooks(&STCO_HOOKS))
        .with_def("co64", BoxDef::full("Chunk Offset (64-bit) Box", CO64_SCHEMA, &[0]).hooks(&CO64_HOOKS))
        .with_def("sbgp", BoxDef::full("Sample-to-Group Box", SBGP_SCHEMA, &[0, 1]).hooks(&SBGP_HOOKS))
        .with_def("sgpd", BoxDef::full("Sample Group Description Box", SGPD_SCHEMA, &[1, 2]).hooks(&SGPD_HOOKS))
        .with_def("sdtp", BoxDef::full("Sample Dependency Flags Box", SDTP_SCHEMA, &[0]))
        // streaming / misc
        .with_def("sidx", BoxDef::full("Segment Index Box", SIDX_SCHEMA, &[0, 1]).hooks(&SIDX_HOOKS))
        .with_def("emsg", BoxDef::full("Event Message Box", EMSG_SCHEMA, &[0, 1]).hooks(&EMSG_HOOKS))
        .with_def("pssh", BoxDef::full("Protection System Specific Header", PSSH_SCHEMA, &[0, 1]).hooks(&PSSH_HOOKS))
        .with_def("esds", BoxDef::full("ES Descriptor Box", ESDS_SCHEMA, &[0]).hooks(&ESDS_HOOKS))
        .with_def("colr", BoxDef::plain("Colour Information Box", COLR_SCHEMA).hooks(&COLR_HOOKS))
        .with_def("free", BoxDef::plain("Free Space Box", DATA_SCHEMA))
        .with_def("skip", BoxDef::plain("Skip Box", DATA_SCHEMA))
        .with_def("mdat", BoxDef::plain("Media Data Box", DATA_SCHEMA));

    // sample entries: one schema bound to several codec 4-CCs
    reg = reg
        .with_any_type(
            &["avc1", "encv"],
            BoxDef::plain("Visual Sample Entry", VISUAL_SAMPLE_ENTRY)
                .container()
                .hooks(&VISUAL_SAMPLE_ENTRY_HOOKS),
        )
        .with_any_type(
            &["mp4a", "enca"],
            BoxDef::plain("Audio Sample Entry", AUDIO_SAMPLE_ENTRY)
                .container()
                .hooks(&AUDIO_SAMPLE_ENTRY_HOOKS),
        )
        .with_def("avcC", BoxDef::plain("AVC Decoder Configuration Box", AVCC_SCHEMA).hooks(&AVCC_HOOKS))
        .with_def("pasp", BoxDef::plain("Pixel Aspect Ratio Box", PASP_SCHEMA));

    reg
}
