use crate::boxes::FourCC;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer than 8 bytes remained where a box header was expected.
    #[error("truncated box header")]
    TruncatedHeader,

    /// The stream ended inside a box whose header promised more bytes.
    #[error("truncated box")]
    TruncatedBox,

    /// Declared size inconsistent with the box schema, or a const-field
    /// mismatch in strict mode.
    #[error("malformed box: {0}")]
    MalformedBox(String),

    /// FullBox version outside the registered set. The walker recovers by
    /// keeping the box as opaque payload.
    #[error("unsupported version {version} of {typ}")]
    UnsupportedVersion { typ: FourCC, version: u8 },

    /// A hook reported more bits than remained, or otherwise inconsistent
    /// state.
    #[error("invalid hook result: {0}")]
    InvalidHookReturn(String),

    /// A dynamic length or size exceeds the remaining payload budget.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// An error from a nested box, tagged with the path down to it
    /// (e.g. `moov/trak[0]/mdia`).
    #[error("{path}: {source}")]
    At {
        path: String,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Prepend a path segment as the error bubbles out of a child box.
    pub fn at(self, segment: String) -> Error {
        match self {
            Error::At { path, source } => Error::At {
                path: format!("{}/{}", segment, path),
                source,
            },
            other => Error::At {
                path: segment,
                source: Box::new(other),
            },
        }
    }

    /// EOF inside a structure means the box is truncated, not an I/O fault.
    pub(crate) fn from_read(e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedBox
        } else {
            Error::Io(e)
        }
    }
}
