//! Incremental Server-Sent Events parsing for eventline.

mod parser;
mod reconnect;
mod source;

pub use eventline_types::{Event, SourceError};
pub use parser::EventParser;
pub use reconnect::{ReconnectConfig, reconnect_delay};
pub use source::{BufferedSource, ByteSource, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
