//! Range Applier - wrap a span of text in annotation markers
//!
//! Application is all-or-nothing: the whole edit is planned and validated
//! against the unmodified tree, and only a plan that passes every check is
//! carried out.

use crate::offset_map::{
    char_slice, global_offset_in, locate_in, nearest_block, spans_len, text_between_in,
    text_runs, Bias, RunSpan, TextPoint,
};
use crate::{BoundaryPolicy, Result};
use content_tree::{AnnotationId, AnnotationStyle, ContentTree, MarkerData, NodeId};
use std::collections::HashSet;
use thiserror::Error;

/// Identity and presentation for a new annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationMeta {
    pub id: AnnotationId,
    pub style: AnnotationStyle,
}

impl AnnotationMeta {
    /// Metadata with a freshly generated id
    pub fn new(style: AnnotationStyle) -> Self {
        Self {
            id: AnnotationId::new(),
            style,
        }
    }

    pub fn with_id(id: AnnotationId, style: AnnotationStyle) -> Self {
        Self { id, style }
    }
}

/// Checks applied before a span is wrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Minimum span length in characters
    pub min_chars: usize,
    pub boundary_policy: BoundaryPolicy,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            min_chars: 1,
            boundary_policy: BoundaryPolicy::SameBlock,
        }
    }
}

/// Why a span was not annotated. The tree is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("empty range {start}..{end}")]
    EmptyRange { start: usize, end: usize },

    #[error("range end {end} is past the end of the text ({len})")]
    OutOfBounds { end: usize, len: usize },

    #[error("position is not inside the container")]
    UnknownPosition,

    #[error("container has no text")]
    NoText,

    #[error("span is whitespace only")]
    WhitespaceOnly,

    #[error("span has {len} characters, minimum is {min}")]
    TooShort { len: usize, min: usize },

    #[error("span crosses a structural boundary")]
    CrossesBoundary,

    #[error("annotation {0} is already applied")]
    DuplicateId(AnnotationId),

    #[error("tree rejected the edit: {0}")]
    Tree(String),
}

/// An annotation that is currently applied to a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationHandle {
    pub id: AnnotationId,
    pub style: AnnotationStyle,
    /// Global offsets of the covered span
    pub start: usize,
    pub end: usize,
    /// Marker nodes inserted, in document order
    pub markers: Vec<NodeId>,
    /// The covered text
    pub text: String,
}

impl AnnotationHandle {
    pub fn meta(&self) -> AnnotationMeta {
        AnnotationMeta::with_id(self.id, self.style)
    }
}

/// Part of one text run covered by the span
#[derive(Debug, Clone, Copy)]
struct Piece {
    run: NodeId,
    parent: NodeId,
    index: usize,
    from: usize,
    to: usize,
    len: usize,
}

/// Adjacent sibling pieces that end up under a single marker
#[derive(Debug)]
struct Group {
    parent: NodeId,
    pieces: Vec<Piece>,
}

/// Wrap the text between global offsets `start` and `end` in markers.
pub fn apply<T: ContentTree + ?Sized>(
    tree: &mut T,
    root: NodeId,
    start: usize,
    end: usize,
    meta: AnnotationMeta,
    options: &ApplyOptions,
) -> std::result::Result<AnnotationHandle, Rejection> {
    let spans = text_runs(tree, root);
    let result = apply_in(tree, root, &spans, start, end, meta, options);
    if let Err(rejection) = &result {
        tracing::debug!(%start, %end, %rejection, "selection not annotated");
    }
    result
}

/// Wrap the text between two resolved points. Used when positions come
/// from a descriptor rather than from global offsets.
pub fn apply_points<T: ContentTree + ?Sized>(
    tree: &mut T,
    root: NodeId,
    start: TextPoint,
    end: TextPoint,
    meta: AnnotationMeta,
    options: &ApplyOptions,
) -> std::result::Result<AnnotationHandle, Rejection> {
    let spans = text_runs(tree, root);
    let (Some(start), Some(end)) = (
        global_offset_in(&spans, start),
        global_offset_in(&spans, end),
    ) else {
        return Err(Rejection::UnknownPosition);
    };
    apply_in(tree, root, &spans, start, end, meta, options)
}

fn apply_in<T: ContentTree + ?Sized>(
    tree: &mut T,
    root: NodeId,
    spans: &[RunSpan],
    start: usize,
    end: usize,
    meta: AnnotationMeta,
    options: &ApplyOptions,
) -> std::result::Result<AnnotationHandle, Rejection> {
    if end <= start {
        return Err(Rejection::EmptyRange { start, end });
    }
    if spans.is_empty() {
        return Err(Rejection::NoText);
    }
    let len = spans_len(spans);
    if locate_in(spans, start, Bias::Forward).is_none()
        || locate_in(spans, end, Bias::Backward).is_none()
    {
        return Err(Rejection::OutOfBounds { end, len });
    }

    let text = text_between_in(&*tree, spans, start, end)
        .ok_or(Rejection::OutOfBounds { end, len })?;
    if text.chars().all(char::is_whitespace) {
        return Err(Rejection::WhitespaceOnly);
    }
    let covered = end - start;
    if covered < options.min_chars {
        return Err(Rejection::TooShort {
            len: covered,
            min: options.min_chars,
        });
    }
    if !markers_of(&*tree, root, meta.id).is_empty() {
        return Err(Rejection::DuplicateId(meta.id));
    }

    let groups = plan(&*tree, root, spans, start, end, options.boundary_policy)?;

    let mut markers = Vec::with_capacity(groups.len());
    for group in &groups {
        match wrap_group(tree, group, meta) {
            Ok(marker) => markers.push(marker),
            Err(e) => {
                tracing::error!(error = %e, "marker insertion failed after validation");
                // Unwrap the groups already done so the span is left unannotated
                if let Err(undo) = unwrap_markers(tree, &markers) {
                    tracing::error!(error = %undo, "failed to unwrap partial annotation");
                }
                return Err(Rejection::Tree(e.to_string()));
            }
        }
    }

    tracing::trace!(id = %meta.id, markers = markers.len(), "annotation applied");
    Ok(AnnotationHandle {
        id: meta.id,
        style: meta.style,
        start,
        end,
        markers,
        text,
    })
}

/// Work out which runs get wrapped, and check that every wrap is legal,
/// without touching the tree
fn plan<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    spans: &[RunSpan],
    start: usize,
    end: usize,
    policy: BoundaryPolicy,
) -> std::result::Result<Vec<Group>, Rejection> {
    let mut pieces = Vec::new();
    for span in spans {
        let from = start.max(span.start);
        let to = end.min(span.end());
        if from >= to {
            continue;
        }
        let parent = tree.parent(span.run).ok_or(Rejection::CrossesBoundary)?;
        if !tree.can_host_marker(parent) {
            return Err(Rejection::CrossesBoundary);
        }
        let index = tree
            .children(parent)
            .iter()
            .position(|&id| id == span.run)
            .ok_or(Rejection::CrossesBoundary)?;
        pieces.push(Piece {
            run: span.run,
            parent,
            index,
            from: from - span.start,
            to: to - span.start,
            len: span.len,
        });
    }

    if policy == BoundaryPolicy::SameBlock {
        let mut blocks = pieces.iter().map(|p| nearest_block(tree, root, p.run));
        if let Some(first) = blocks.next() {
            if blocks.any(|block| block != first) {
                return Err(Rejection::CrossesBoundary);
            }
        }
    }

    let mut groups: Vec<Group> = Vec::new();
    for piece in pieces {
        match groups.last_mut() {
            Some(group)
                if group.parent == piece.parent
                    && group.pieces.last().is_some_and(|p| p.index + 1 == piece.index) =>
            {
                group.pieces.push(piece);
            }
            _ => groups.push(Group {
                parent: piece.parent,
                pieces: vec![piece],
            }),
        }
    }
    Ok(groups)
}

/// Split the boundary runs of a group and move its covered runs into a new
/// marker that takes their place
fn wrap_group<T: ContentTree + ?Sized>(
    tree: &mut T,
    group: &Group,
    meta: AnnotationMeta,
) -> content_tree::Result<NodeId> {
    let (Some(first), Some(last)) = (group.pieces.first(), group.pieces.last()) else {
        return Err(content_tree::TreeError::NodeNotFound(group.parent));
    };
    let first_text = tree.text_content(first.run).unwrap_or_default().to_string();
    let last_text = tree.text_content(last.run).unwrap_or_default().to_string();

    let before = char_slice(&first_text, 0, first.from).to_string();
    let after = char_slice(&last_text, last.to, last.len).to_string();

    if first.run == last.run {
        tree.set_text(first.run, char_slice(&first_text, first.from, first.to).to_string())?;
    } else {
        tree.set_text(first.run, char_slice(&first_text, first.from, first.len).to_string())?;
        tree.set_text(last.run, char_slice(&last_text, 0, last.to).to_string())?;
    }

    let marker = tree.create_marker(MarkerData::new(meta.id, meta.style));
    tree.replace_child(group.parent, first.run, marker)?;
    for piece in &group.pieces[1..] {
        tree.remove_child(group.parent, piece.run)?;
    }
    for piece in &group.pieces {
        tree.insert_before(marker, piece.run, None)?;
    }

    if !before.is_empty() {
        let node = tree.create_text(&before);
        tree.insert_before(group.parent, node, Some(marker))?;
    }
    if !after.is_empty() {
        let node = tree.create_text(&after);
        let next = next_sibling(&*tree, group.parent, marker);
        tree.insert_before(group.parent, node, next)?;
    }
    Ok(marker)
}

/// Unwrap every marker of an annotation and merge the text runs left behind.
/// Returns the number of markers removed.
pub fn remove<T: ContentTree + ?Sized>(tree: &mut T, root: NodeId, id: AnnotationId) -> Result<usize> {
    let markers = markers_of(&*tree, root, id);
    unwrap_markers(tree, &markers)?;
    if !markers.is_empty() {
        tracing::trace!(%id, markers = markers.len(), "annotation removed");
    }
    Ok(markers.len())
}

/// Move the children of each marker up into its parent, drop the marker and
/// merge the text runs left side by side
fn unwrap_markers<T: ContentTree + ?Sized>(tree: &mut T, markers: &[NodeId]) -> content_tree::Result<()> {
    let mut touched = Vec::new();

    for &marker in markers {
        let Some(parent) = tree.parent(marker) else {
            continue;
        };
        let children = tree.children(marker).to_vec();
        for child in children {
            tree.remove_child(marker, child)?;
            tree.insert_before(parent, child, Some(marker))?;
        }
        tree.remove_child(parent, marker)?;
        tree.discard(marker);
        if !touched.contains(&parent) {
            touched.push(parent);
        }
    }

    for parent in touched {
        normalize(tree, parent)?;
    }
    Ok(())
}

/// Change the style of every marker of an annotation.
/// Returns the number of markers updated.
pub fn restyle<T: ContentTree + ?Sized>(
    tree: &mut T,
    root: NodeId,
    id: AnnotationId,
    style: AnnotationStyle,
) -> Result<usize> {
    let markers = markers_of(&*tree, root, id);
    for &marker in &markers {
        tree.set_marker_style(marker, style)?;
    }
    Ok(markers.len())
}

/// Merge adjacent text runs directly under `parent`
fn normalize<T: ContentTree + ?Sized>(tree: &mut T, parent: NodeId) -> content_tree::Result<()> {
    let mut index = 0;
    loop {
        let children = tree.children(parent);
        let (Some(&left), Some(&right)) = (children.get(index), children.get(index + 1)) else {
            return Ok(());
        };
        match (tree.text_content(left), tree.text_content(right)) {
            (Some(a), Some(b)) => {
                let merged = format!("{}{}", a, b);
                tree.set_text(left, merged)?;
                tree.remove_child(parent, right)?;
                tree.discard(right);
            }
            _ => index += 1,
        }
    }
}

/// Every marker under `root` belonging to an annotation, in document order
pub fn markers_of<T: ContentTree + ?Sized>(tree: &T, root: NodeId, id: AnnotationId) -> Vec<NodeId> {
    walk(tree, root)
        .into_iter()
        .filter(|&node| tree.marker(node).is_some_and(|m| m.annotation_id == id))
        .collect()
}

/// Distinct annotations applied under `root`, in document order
pub fn annotations_in<T: ContentTree + ?Sized>(tree: &T, root: NodeId) -> Vec<MarkerData> {
    let mut seen = HashSet::new();
    walk(tree, root)
        .into_iter()
        .filter_map(|node| tree.marker(node).copied())
        .filter(|data| seen.insert(data.annotation_id))
        .collect()
}

/// The innermost annotation enclosing `node` (or `node` itself if it is a
/// marker), stopping at `root`
pub fn annotation_at<T: ContentTree + ?Sized>(tree: &T, root: NodeId, node: NodeId) -> Option<MarkerData> {
    let mut current = Some(node);
    let mut steps = 0;
    while let Some(id) = current {
        if let Some(data) = tree.marker(id) {
            return Some(*data);
        }
        if id == root || steps > 1024 {
            return None;
        }
        steps += 1;
        current = tree.parent(id);
    }
    None
}

fn next_sibling<T: ContentTree + ?Sized>(tree: &T, parent: NodeId, node: NodeId) -> Option<NodeId> {
    let children = tree.children(parent);
    let index = children.iter().position(|&id| id == node)?;
    children.get(index + 1).copied()
}

fn walk<T: ContentTree + ?Sized>(tree: &T, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        out.push(id);
        stack.extend(tree.children(id).iter().rev().copied());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset_map::flatten;
    use content_tree::{parse_markup, DocumentTree};

    fn options() -> ApplyOptions {
        ApplyOptions::default()
    }

    fn highlight() -> AnnotationMeta {
        AnnotationMeta::new(AnnotationStyle::Highlight)
    }

    #[test]
    fn test_apply_within_single_run() {
        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();

        let handle = apply(&mut tree, root, 4, 9, highlight(), &options()).unwrap();

        assert_eq!(handle.text, "quick");
        assert_eq!(handle.markers.len(), 1);
        assert_eq!(flatten(&tree, root), "The quick brown fox");
        assert_eq!(
            tree.render_html(),
            format!(
                "<div><p>The <mark data-annotation-id=\"{}\" class=\"hl\">quick</mark> brown fox</p></div>",
                handle.id
            )
        );
    }

    #[test]
    fn test_apply_whole_run_creates_no_empty_runs() {
        let mut tree = DocumentTree::from_paragraphs(&["word"]);
        let root = tree.root_id();
        let para = tree.children(root)[0];

        let handle = apply(&mut tree, root, 0, 4, highlight(), &options()).unwrap();

        assert_eq!(tree.children(para), &handle.markers[..]);
    }

    #[test]
    fn test_apply_across_inline_elements_shares_one_id() {
        let mut tree = parse_markup("<p>The <em>quick</em> brown fox</p>").unwrap();
        let root = tree.root_id();

        // "e quick br"
        let handle = apply(&mut tree, root, 2, 12, highlight(), &options()).unwrap();

        assert_eq!(handle.text, "e quick br");
        assert_eq!(handle.markers.len(), 3);
        assert_eq!(markers_of(&tree, root, handle.id), handle.markers);
        assert_eq!(flatten(&tree, root), "The quick brown fox");
    }

    #[test]
    fn test_adjacent_sibling_runs_share_a_marker() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let para = tree.append_element(root, content_tree::NodeKind::Paragraph).unwrap();
        tree.append_text(para, "one ").unwrap();
        tree.append_text(para, "two ").unwrap();
        tree.append_text(para, "three").unwrap();

        let handle = apply(&mut tree, root, 2, 10, highlight(), &options()).unwrap();

        assert_eq!(handle.markers.len(), 1);
        let marker = handle.markers[0];
        assert_eq!(tree.children(marker).len(), 3);
        assert_eq!(handle.text, "e two th");
    }

    #[test]
    fn test_rejections_leave_tree_untouched() {
        let mut tree = parse_markup("<p>alpha   beta</p><p>gamma</p>").unwrap();
        let root = tree.root_id();
        let before = tree.render_html();

        let cases = [
            (3, 3, Rejection::EmptyRange { start: 3, end: 3 }),
            (5, 2, Rejection::EmptyRange { start: 5, end: 2 }),
            (0, 99, Rejection::OutOfBounds { end: 99, len: 17 }),
            (5, 8, Rejection::WhitespaceOnly),
            // "beta" ends at 12, "gamma" starts in the next paragraph
            (8, 14, Rejection::CrossesBoundary),
        ];
        for (start, end, expected) in cases {
            assert_eq!(apply(&mut tree, root, start, end, highlight(), &options()), Err(expected));
            assert_eq!(tree.render_html(), before);
        }
    }

    #[test]
    fn test_min_chars() {
        let mut tree = DocumentTree::from_paragraphs(&["abcdef"]);
        let root = tree.root_id();
        let opts = ApplyOptions { min_chars: 3, ..options() };
        assert_eq!(
            apply(&mut tree, root, 0, 2, highlight(), &opts),
            Err(Rejection::TooShort { len: 2, min: 3 })
        );
        assert!(apply(&mut tree, root, 0, 3, highlight(), &opts).is_ok());
    }

    #[test]
    fn test_empty_container_is_rejected() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        assert_eq!(
            apply(&mut tree, root, 0, 1, highlight(), &options()),
            Err(Rejection::NoText)
        );
    }

    #[test]
    fn test_split_across_blocks_policy() {
        let mut tree = parse_markup("<p>alpha</p><p>beta</p>").unwrap();
        let root = tree.root_id();
        let opts = ApplyOptions {
            boundary_policy: BoundaryPolicy::SplitAcrossBlocks,
            ..options()
        };

        let handle = apply(&mut tree, root, 3, 7, highlight(), &opts).unwrap();

        assert_eq!(handle.text, "habe");
        assert_eq!(handle.markers.len(), 2);
        assert_ne!(tree.parent(handle.markers[0]), tree.parent(handle.markers[1]));
    }

    #[test]
    fn test_text_directly_under_table_cannot_be_wrapped() {
        let mut tree = parse_markup("<table> <tr><td>cell</td></tr></table>").unwrap();
        let root = tree.root_id();
        let opts = ApplyOptions {
            boundary_policy: BoundaryPolicy::SplitAcrossBlocks,
            ..options()
        };
        let before = tree.render_html();

        assert_eq!(
            apply(&mut tree, root, 0, 5, highlight(), &opts),
            Err(Rejection::CrossesBoundary)
        );
        assert_eq!(tree.render_html(), before);
        assert!(apply(&mut tree, root, 1, 5, highlight(), &opts).is_ok());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut tree = DocumentTree::from_paragraphs(&["one two"]);
        let root = tree.root_id();
        let meta = highlight();
        apply(&mut tree, root, 0, 3, meta, &options()).unwrap();
        assert_eq!(
            apply(&mut tree, root, 4, 7, meta, &options()),
            Err(Rejection::DuplicateId(meta.id))
        );
    }

    #[test]
    fn test_remove_restores_original_shape() {
        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();
        let original = tree.render_html();

        let handle = apply(&mut tree, root, 4, 9, highlight(), &options()).unwrap();
        assert_eq!(remove(&mut tree, root, handle.id).unwrap(), 1);

        assert_eq!(tree.render_html(), original);
        let para = tree.children(root)[0];
        assert_eq!(tree.children(para).len(), 1);
        assert_eq!(remove(&mut tree, root, handle.id).unwrap(), 0);
    }

    #[test]
    fn test_remove_keeps_other_annotations() {
        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();

        let first = apply(&mut tree, root, 0, 3, highlight(), &options()).unwrap();
        let second = apply(&mut tree, root, 10, 15, highlight(), &options()).unwrap();
        remove(&mut tree, root, first.id).unwrap();

        assert_eq!(markers_of(&tree, root, second.id).len(), 1);
        assert_eq!(annotations_in(&tree, root).len(), 1);
        assert_eq!(flatten(&tree, root), "The quick brown fox");
    }

    #[test]
    fn test_nested_annotation_inside_marker() {
        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();

        let outer = apply(&mut tree, root, 4, 15, highlight(), &options()).unwrap();
        let inner = apply(&mut tree, root, 6, 8, AnnotationMeta::new(AnnotationStyle::HighlightB), &options()).unwrap();

        assert_eq!(tree.parent(inner.markers[0]), Some(outer.markers[0]));
        remove(&mut tree, root, outer.id).unwrap();
        assert_eq!(markers_of(&tree, root, inner.id).len(), 1);
        assert_eq!(flatten(&tree, root), "The quick brown fox");
    }

    #[test]
    fn test_restyle_and_annotation_at() {
        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();
        let handle = apply(&mut tree, root, 4, 9, highlight(), &options()).unwrap();

        assert_eq!(restyle(&mut tree, root, handle.id, AnnotationStyle::HighlightA).unwrap(), 1);

        let run = tree.children(handle.markers[0])[0];
        let found = annotation_at(&tree, root, run).unwrap();
        assert_eq!(found.annotation_id, handle.id);
        assert_eq!(found.style, AnnotationStyle::HighlightA);

        let para = tree.children(root)[0];
        assert_eq!(annotation_at(&tree, root, para), None);
    }

    #[test]
    fn test_apply_points() {
        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();
        let run = tree.children(tree.children(root)[0])[0];

        let handle = apply_points(
            &mut tree,
            root,
            TextPoint::new(run, 10),
            TextPoint::new(run, 15),
            highlight(),
            &options(),
        )
        .unwrap();
        assert_eq!(handle.text, "brown");

        let stranger = DocumentTree::new().root_id();
        assert_eq!(
            apply_points(
                &mut tree,
                root,
                TextPoint::new(stranger, 0),
                TextPoint::new(run, 1),
                highlight(),
                &options()
            ),
            Err(Rejection::UnknownPosition)
        );
    }

    /// Delegates to a DocumentTree but refuses text edits once its budget is spent
    struct FlakyTree {
        inner: DocumentTree,
        edits_left: usize,
    }

    impl ContentTree for FlakyTree {
        fn contains(&self, id: NodeId) -> bool {
            self.inner.contains(id)
        }

        fn children(&self, id: NodeId) -> &[NodeId] {
            self.inner.children(id)
        }

        fn parent(&self, id: NodeId) -> Option<NodeId> {
            self.inner.parent(id)
        }

        fn text_content(&self, id: NodeId) -> Option<&str> {
            self.inner.text_content(id)
        }

        fn marker(&self, id: NodeId) -> Option<&MarkerData> {
            self.inner.marker(id)
        }

        fn is_block(&self, id: NodeId) -> bool {
            self.inner.is_block(id)
        }

        fn can_host_marker(&self, id: NodeId) -> bool {
            self.inner.can_host_marker(id)
        }

        fn create_text(&mut self, text: &str) -> NodeId {
            self.inner.create_text(text)
        }

        fn create_marker(&mut self, data: MarkerData) -> NodeId {
            self.inner.create_marker(data)
        }

        fn set_text(&mut self, id: NodeId, text: String) -> content_tree::Result<()> {
            if self.edits_left == 0 {
                return Err(content_tree::TreeError::NotATextRun(id));
            }
            self.edits_left -= 1;
            self.inner.set_text(id, text)
        }

        fn set_marker_style(&mut self, id: NodeId, style: AnnotationStyle) -> content_tree::Result<()> {
            self.inner.set_marker_style(id, style)
        }

        fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> content_tree::Result<()> {
            self.inner.replace_child(parent, old, new)
        }

        fn insert_before(
            &mut self,
            parent: NodeId,
            new: NodeId,
            reference: Option<NodeId>,
        ) -> content_tree::Result<()> {
            self.inner.insert_before(parent, new, reference)
        }

        fn remove_child(&mut self, parent: NodeId, child: NodeId) -> content_tree::Result<()> {
            self.inner.remove_child(parent, child)
        }

        fn discard(&mut self, id: NodeId) {
            self.inner.discard(id)
        }
    }

    #[test]
    fn test_failed_wrap_unwraps_earlier_groups() {
        let inner = parse_markup("<p>The <em>quick</em> brown fox</p>").unwrap();
        let original = inner.render_html();
        let root = inner.root_id();
        // "The " wraps, then the edit for "quick" is refused
        let mut tree = FlakyTree { inner, edits_left: 1 };

        let result = apply(&mut tree, root, 0, 9, highlight(), &options());

        assert!(matches!(result, Err(Rejection::Tree(_))));
        assert!(annotations_in(&tree, root).is_empty());
        assert_eq!(tree.inner.render_html(), original);
    }

    /// A paragraph that also lists the root among its children
    fn cyclic_tree() -> DocumentTree {
        let tree = DocumentTree::from_paragraphs(&["hello"]);
        let root = tree.root_id();
        let para = tree.children(root)[0];
        let mut value = serde_json::to_value(&tree).unwrap();
        value["nodes"][para.to_string()]["children"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!(root.to_string()));
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_cyclic_tree_applies_and_removes() {
        let mut tree = cyclic_tree();
        let root = tree.root_id();

        let handle = apply(&mut tree, root, 0, 5, highlight(), &options()).unwrap();
        assert_eq!(handle.text, "hello");
        assert_eq!(markers_of(&tree, root, handle.id), handle.markers);

        assert_eq!(remove(&mut tree, root, handle.id).unwrap(), 1);
        assert!(annotations_in(&tree, root).is_empty());
        assert_eq!(flatten(&tree, root), "hello");
    }
}
