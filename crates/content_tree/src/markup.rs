//! Markup import - build a content tree from XHTML-like source markup
//!
//! Whitespace is preserved exactly as written, so rebuilding from the same
//! markup always yields the same tree shape and the same flattened text.

use crate::{DocumentTree, NodeId, NodeKind, Result, TreeError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse source markup into a fresh [`DocumentTree`].
///
/// Top-level content is placed directly under the tree's root container.
pub fn parse_markup(markup: &str) -> Result<DocumentTree> {
    let mut parser = MarkupParser::new(markup);
    parser.parse()
}

/// Streaming parser from markup events to tree nodes
pub struct MarkupParser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> MarkupParser<'a> {
    pub fn new(markup: &'a str) -> Self {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(false);
        Self { reader }
    }

    pub fn parse(&mut self) -> Result<DocumentTree> {
        let mut tree = DocumentTree::new();
        let mut stack: Vec<(NodeId, String)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let parent = stack.last().map(|(id, _)| *id).unwrap_or(tree.root_id());
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let name = local_name(e);
                    let id = tree.insert_detached(kind_for(&name));
                    tree.link(parent, id, None);
                    stack.push((id, name));
                }
                Ok(Event::Empty(ref e)) => {
                    let name = local_name(e);
                    let id = tree.insert_detached(kind_for(&name));
                    tree.link(parent, id, None);
                }
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape()
                        .map_err(|err| TreeError::Markup(err.to_string()))?;
                    append_text(&mut tree, parent, &text)?;
                }
                Ok(Event::CData(ref e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    append_text(&mut tree, parent, &text)?;
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    match stack.pop() {
                        Some((_, open)) if open == name => {}
                        Some((_, open)) => {
                            return Err(TreeError::Markup(format!(
                                "expected </{}>, found </{}>",
                                open, name
                            )));
                        }
                        None => {
                            return Err(TreeError::Markup(format!("unexpected </{}>", name)));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(TreeError::from(e)),
                _ => {}
            }
        }

        if let Some((_, open)) = stack.last() {
            return Err(TreeError::Markup(format!("unclosed <{}>", open)));
        }

        tracing::trace!(nodes = tree.node_count(), "parsed markup");
        Ok(tree)
    }
}

fn append_text(tree: &mut DocumentTree, parent: NodeId, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    // Text under a void element cannot exist in well-formed markup
    let parent_accepts = tree
        .get(parent)
        .is_some_and(|node| node.kind.can_have_children());
    if !parent_accepts {
        return Err(TreeError::NotAnElement(parent));
    }
    let id = tree.insert_detached(NodeKind::Text(text.to_string()));
    tree.link(parent, id, None);
    Ok(())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

fn kind_for(name: &str) -> NodeKind {
    match name {
        "div" | "section" | "article" | "body" => NodeKind::Container,
        "p" | "blockquote" => NodeKind::Paragraph,
        "h1" => NodeKind::Heading(1),
        "h2" => NodeKind::Heading(2),
        "h3" => NodeKind::Heading(3),
        "h4" => NodeKind::Heading(4),
        "h5" => NodeKind::Heading(5),
        "h6" => NodeKind::Heading(6),
        "ul" | "ol" => NodeKind::List,
        "li" => NodeKind::ListItem,
        "table" | "thead" | "tbody" | "tfoot" => NodeKind::Table,
        "tr" => NodeKind::TableRow,
        "td" | "th" => NodeKind::TableCell,
        "em" | "i" => NodeKind::Emphasis,
        "strong" | "b" => NodeKind::Strong,
        "br" => NodeKind::LineBreak,
        _ => NodeKind::Span,
    }
}
