pub mod bitio;
pub mod boxes;
mod codec;
pub mod dump;
pub mod error;
pub mod known_boxes;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod util;

pub use boxes::{BoxHeader, BoxKey, Config, Context, Fields, FourCC, ParsedBox, StrStyle, Value};
pub use error::{Error, Result};
pub use known_boxes::default_registry;
pub use parser::{encode_boxes, parse, parse_children, read_box_header, walk};
pub use registry::{global, BoxDef, BoxHandler, Hooked, Registry, Scope};
