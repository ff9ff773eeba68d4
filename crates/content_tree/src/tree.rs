//! Arena-backed content tree

use crate::{
    AnnotationStyle, ContentNode, ContentTree, MarkerData, NodeId, NodeKind, Result, TreeError,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A content tree stored as an ID-keyed arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTree {
    root: NodeId,
    nodes: HashMap<NodeId, ContentNode>,
}

impl DocumentTree {
    /// Create a tree holding a single empty container
    pub fn new() -> Self {
        let root = ContentNode::new(NodeKind::Container);
        let root_id = root.id();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self { root: root_id, nodes }
    }

    /// Get the root container ID
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes stored, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a new element under `parent` and return its ID
    pub fn append_element(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        let node = ContentNode::new(kind);
        let id = node.id();
        self.nodes.insert(id, node);
        self.attach(parent, id, None)?;
        Ok(id)
    }

    /// Append a new text run under `parent` and return its ID
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId> {
        self.append_element(parent, NodeKind::Text(text.into()))
    }

    /// Create a tree with one paragraph per entry of `paragraphs`
    pub fn from_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        for text in paragraphs {
            let para = tree.insert_detached(NodeKind::Paragraph);
            tree.link(root, para, None);
            let run = tree.insert_detached(NodeKind::Text(text.as_ref().to_string()));
            tree.link(para, run, None);
        }
        tree
    }

    /// Iterate over the subtree of `id` in document order (pre-order),
    /// including `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children().iter().rev().copied());
        }
        out
    }

    /// Flattened text of the whole tree
    pub fn flattened_text(&self) -> String {
        self.descendants(self.root)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).and_then(|n| n.text()))
            .collect()
    }

    /// Render the tree as HTML, markers as `<mark>` elements
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root, &mut out, 0);
        out
    }

    fn render_node(&self, id: NodeId, out: &mut String, depth: usize) {
        // A tree that reaches this depth has a cycle
        if depth > 512 {
            return;
        }
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let (open, close) = match &node.kind {
            NodeKind::Text(text) => {
                escape_into(text, out);
                return;
            }
            NodeKind::LineBreak => {
                out.push_str("<br/>");
                return;
            }
            NodeKind::Container => ("<div>".to_string(), "</div>"),
            NodeKind::Paragraph => ("<p>".to_string(), "</p>"),
            NodeKind::Heading(level) => {
                let level = (*level).clamp(1, 6);
                out.push_str(&format!("<h{}>", level));
                for &child in node.children() {
                    self.render_node(child, out, depth + 1);
                }
                out.push_str(&format!("</h{}>", level));
                return;
            }
            NodeKind::List => ("<ul>".to_string(), "</ul>"),
            NodeKind::ListItem => ("<li>".to_string(), "</li>"),
            NodeKind::Table => ("<table>".to_string(), "</table>"),
            NodeKind::TableRow => ("<tr>".to_string(), "</tr>"),
            NodeKind::TableCell => ("<td>".to_string(), "</td>"),
            NodeKind::Emphasis => ("<em>".to_string(), "</em>"),
            NodeKind::Strong => ("<strong>".to_string(), "</strong>"),
            NodeKind::Span => ("<span>".to_string(), "</span>"),
            NodeKind::Marker(data) => (
                format!(
                    "<mark data-annotation-id=\"{}\" class=\"{}\">",
                    data.annotation_id,
                    data.style.class_name()
                ),
                "</mark>",
            ),
        };
        out.push_str(&open);
        for &child in node.children() {
            self.render_node(child, out, depth + 1);
        }
        out.push_str(close);
    }

    pub(crate) fn insert_detached(&mut self, kind: NodeKind) -> NodeId {
        let node = ContentNode::new(kind);
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Link a known-detached child without validation; used by builders that
    /// only ever link nodes they just created.
    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.set_parent(Some(parent));
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            let children = node.children_mut();
            match index {
                Some(idx) if idx <= children.len() => children.insert(idx, child),
                _ => children.push(child),
            }
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> Result<()> {
        let parent_node = self.nodes.get(&parent).ok_or(TreeError::NodeNotFound(parent))?;
        if !parent_node.kind.can_have_children() {
            return Err(TreeError::NotAnElement(parent));
        }
        if !self.nodes.contains_key(&child) {
            return Err(TreeError::NodeNotFound(child));
        }
        self.link(parent, child, index);
        Ok(())
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Result<usize> {
        let parent_node = self.nodes.get(&parent).ok_or(TreeError::NodeNotFound(parent))?;
        parent_node
            .children()
            .iter()
            .position(|&id| id == child)
            .ok_or(TreeError::NotAChild { parent, child })
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTree for DocumentTree {
    fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children()).unwrap_or(&[])
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent())
    }

    fn text_content(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.text())
    }

    fn marker(&self, id: NodeId) -> Option<&MarkerData> {
        self.nodes.get(&id).and_then(|n| n.marker())
    }

    fn is_block(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.kind.is_block())
    }

    fn can_host_marker(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.kind.can_host_marker())
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.insert_detached(NodeKind::Text(text.to_string()))
    }

    fn create_marker(&mut self, data: MarkerData) -> NodeId {
        self.insert_detached(NodeKind::Marker(data))
    }

    fn set_text(&mut self, id: NodeId, text: String) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))?;
        match &mut node.kind {
            NodeKind::Text(current) => {
                *current = text;
                Ok(())
            }
            _ => Err(TreeError::NotATextRun(id)),
        }
    }

    fn set_marker_style(&mut self, id: NodeId, style: AnnotationStyle) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))?;
        match &mut node.kind {
            NodeKind::Marker(data) => {
                data.style = style;
                Ok(())
            }
            _ => Err(TreeError::NotAMarker(id)),
        }
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<()> {
        let index = self.child_index(parent, old)?;
        if !self.nodes.contains_key(&new) {
            return Err(TreeError::NodeNotFound(new));
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children_mut()[index] = new;
        }
        if let Some(node) = self.nodes.get_mut(&old) {
            node.set_parent(None);
        }
        if let Some(node) = self.nodes.get_mut(&new) {
            node.set_parent(Some(parent));
        }
        Ok(())
    }

    fn insert_before(&mut self, parent: NodeId, new: NodeId, reference: Option<NodeId>) -> Result<()> {
        let index = match reference {
            Some(reference) => Some(self.child_index(parent, reference)?),
            None => None,
        };
        self.attach(parent, new, index)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.child_index(parent, child)?;
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children_mut().remove(index);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.set_parent(None);
        }
        Ok(())
    }

    fn discard(&mut self, id: NodeId) {
        if self.nodes.get(&id).is_some_and(|n| n.parent().is_none()) && id != self.root {
            self.nodes.remove(&id);
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
