//! Annotation Engine - Durable highlights over rendered rich text
//!
//! This crate maps between flat text offsets and positions inside a content
//! tree, wraps selected spans in annotation markers, captures those markers
//! as position-independent descriptors, and replays descriptors onto freshly
//! rebuilt trees. A small selection state machine drives it from pointer
//! input, and a gateway trait hands descriptors to whatever storage the host
//! provides.

mod error;
mod config;
pub mod offset_map;
mod apply;
mod anchor;
mod geometry;
mod glossary;
mod gateway;
mod controller;
mod session;

pub use error::*;
pub use config::*;
pub use offset_map::{RunSpan, TextPoint, LogicalPath};
pub use apply::*;
pub use anchor::*;
pub use geometry::*;
pub use glossary::*;
pub use gateway::*;
pub use controller::*;
pub use session::*;
