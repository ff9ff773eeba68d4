//! Annotation Store - where descriptors and engine settings live
//!
//! Provides an in-memory [`MemoryGateway`] for tests and embedding, a
//! JSON-file [`JsonFileGateway`] with one file per container, and the
//! [`SettingsManager`] for the engine configuration.

mod error;
mod format;
mod memory_gateway;
mod file_gateway;
mod settings;

pub use error::*;
pub use format::*;
pub use memory_gateway::*;
pub use file_gateway::*;
pub use settings::*;
