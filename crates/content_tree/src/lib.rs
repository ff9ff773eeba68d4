//! Content Tree - Scoped rich-text trees and annotation markers
//!
//! This crate provides the content-node tree the annotation engine operates
//! on: stable node IDs, a closed set of node kinds, the abstract
//! [`ContentTree`] interface hosts adapt their render trees to, and an
//! arena-backed [`DocumentTree`] implementation that can be built from
//! source markup.

mod error;
mod node_id;
mod marker;
mod node;
mod tree;
mod markup;

pub use error::*;
pub use node_id::*;
pub use marker::*;
pub use node::*;
pub use tree::*;
pub use markup::*;
