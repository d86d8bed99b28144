//! Shared types and error hierarchy for eventline.

pub mod error;
pub mod event;

pub use error::{ConfigError, SourceError};
pub use event::Event;
