//! Node kinds and the abstract content tree interface

use crate::{MarkerData, NodeId, Result, AnnotationStyle};
use serde::{Deserialize, Serialize};

/// Enumeration of all node kinds in a content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Root of a scoped region (passage, transcript part, option list)
    Container,
    Paragraph,
    Heading(u8),
    List,
    ListItem,
    Table,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Span,
    LineBreak,
    /// A text run: a leaf holding a contiguous character sequence
    Text(String),
    /// An annotation marker wrapping covered content
    Marker(MarkerData),
}

impl NodeKind {
    /// Whether nodes of this kind may have children
    pub fn can_have_children(&self) -> bool {
        !matches!(self, NodeKind::Text(_) | NodeKind::LineBreak)
    }

    /// Whether this kind starts a block (paragraph-level layout unit)
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Container
                | NodeKind::Paragraph
                | NodeKind::Heading(_)
                | NodeKind::List
                | NodeKind::ListItem
                | NodeKind::Table
                | NodeKind::TableRow
                | NodeKind::TableCell
        )
    }

    /// Whether an inline annotation marker may legally be a direct child.
    ///
    /// Tables, rows and lists only admit their own structural children, so a
    /// stray text run directly under them can never be wrapped.
    pub fn can_host_marker(&self) -> bool {
        match self {
            NodeKind::Container
            | NodeKind::Paragraph
            | NodeKind::Heading(_)
            | NodeKind::ListItem
            | NodeKind::TableCell
            | NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::Span
            | NodeKind::Marker(_) => true,
            NodeKind::List
            | NodeKind::Table
            | NodeKind::TableRow
            | NodeKind::LineBreak
            | NodeKind::Text(_) => false,
        }
    }
}

/// A single node stored in a [`crate::DocumentTree`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// What this node is
    pub kind: NodeKind,
}

impl ContentNode {
    /// Create a new detached node
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }

    /// Text of this node if it is a text run
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Marker payload if this node is an annotation marker
    pub fn marker(&self) -> Option<&MarkerData> {
        match &self.kind {
            NodeKind::Marker(data) => Some(data),
            _ => None,
        }
    }
}

/// Minimal node interface the annotation engine is written against.
///
/// Hosts adapt their real render tree to this trait; [`crate::DocumentTree`]
/// is the arena-backed implementation shipped with this crate. Read methods
/// return neutral values (`None`, empty slice, `false`) for unknown IDs.
///
/// Write methods are only called on nodes the read methods have just
/// reported, and must succeed for them. If one fails anyway, markers already
/// completed for that edit are unwrapped again, but the run being split at
/// the time may be left shortened.
pub trait ContentTree {
    /// Whether the node exists in this tree
    fn contains(&self, id: NodeId) -> bool;

    /// Child IDs in document order
    fn children(&self, id: NodeId) -> &[NodeId];

    /// Parent ID (None for the root or a detached node)
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Whether the node is a text run
    fn is_text_run(&self, id: NodeId) -> bool {
        self.text_content(id).is_some()
    }

    /// Text of a text run; None for every other node
    fn text_content(&self, id: NodeId) -> Option<&str>;

    /// Marker payload of an annotation marker; None for every other node
    fn marker(&self, id: NodeId) -> Option<&MarkerData>;

    /// Whether the node is a block-level element
    fn is_block(&self, id: NodeId) -> bool;

    /// Whether an annotation marker may be inserted as a direct child
    fn can_host_marker(&self, id: NodeId) -> bool;

    /// Create a detached text run
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Create a detached, empty annotation marker
    fn create_marker(&mut self, data: MarkerData) -> NodeId;

    /// Replace the text of a text run
    fn set_text(&mut self, id: NodeId, text: String) -> Result<()>;

    /// Change the style of an annotation marker
    fn set_marker_style(&mut self, id: NodeId, style: AnnotationStyle) -> Result<()>;

    /// Replace `old` (a child of `parent`) with the detached node `new`.
    /// `old` becomes detached but is not discarded.
    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<()>;

    /// Insert the detached node `new` before `reference`, or append it when
    /// `reference` is None.
    fn insert_before(&mut self, parent: NodeId, new: NodeId, reference: Option<NodeId>) -> Result<()>;

    /// Detach `child` from `parent`
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Drop a detached node from storage
    fn discard(&mut self, id: NodeId);
}
