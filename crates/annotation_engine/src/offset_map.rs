//! Offset Mapper - flat text offsets to tree positions and back
//!
//! Every function here is read-only. Offsets count Unicode scalar values
//! across the text runs of a container, in document order, with nothing
//! inserted between runs.
//!
//! Two path flavours exist:
//! - *structural* paths ([`path_of`], [`resolve`]) are raw child indices;
//! - *logical* paths ([`logical_path_of`], [`resolve_logical_path`]) treat
//!   annotation markers as transparent and merge adjacent text runs, so the
//!   same logical position has the same path whether or not annotations are
//!   currently applied. Descriptors use logical paths.

use content_tree::{ContentTree, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound on tree depth; deeper walks are treated as cycles
const MAX_DEPTH: usize = 1024;

/// A text run together with its place in the flattened text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSpan {
    pub run: NodeId,
    /// Global offset of the run's first character
    pub start: usize,
    /// Length in characters
    pub len: usize,
}

impl RunSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// A position inside one text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPoint {
    pub run: NodeId,
    /// Character offset within the run
    pub offset: usize,
}

impl TextPoint {
    pub fn new(run: NodeId, offset: usize) -> Self {
        Self { run, offset }
    }
}

/// Which run wins when an offset falls exactly on a run boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bias {
    /// The run that starts at the boundary
    #[default]
    Forward,
    /// The run that ends at the boundary
    Backward,
}

/// A marker-transparent position: logical child indices plus a character
/// offset within the logical text run at the end of the path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalPath {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// All text runs under `root`, in document order.
///
/// A node reached twice (a cycle or a shared child) is skipped.
pub fn text_runs<T: ContentTree + ?Sized>(tree: &T, root: NodeId) -> Vec<RunSpan> {
    let mut spans = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    let mut cursor = 0;

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            tracing::warn!(node = %id, "node reached twice while walking content tree");
            continue;
        }
        if let Some(text) = tree.text_content(id) {
            let len = char_len(text);
            spans.push(RunSpan { run: id, start: cursor, len });
            cursor += len;
            continue;
        }
        stack.extend(tree.children(id).iter().rev().copied());
    }

    spans
}

/// Total length of the flattened text under `root`
pub fn total_len<T: ContentTree + ?Sized>(tree: &T, root: NodeId) -> usize {
    spans_len(&text_runs(tree, root))
}

/// Find the run containing `offset`.
///
/// `offset == total` is the end-of-content anchor: the last run at its own
/// length. Returns None when there are no runs or the offset is past the end.
pub fn locate<T: ContentTree + ?Sized>(tree: &T, root: NodeId, offset: usize) -> Option<TextPoint> {
    locate_in(&text_runs(tree, root), offset, Bias::Forward)
}

/// [`locate`] with an explicit boundary bias
pub fn locate_with<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    offset: usize,
    bias: Bias,
) -> Option<TextPoint> {
    locate_in(&text_runs(tree, root), offset, bias)
}

pub(crate) fn locate_in(spans: &[RunSpan], offset: usize, bias: Bias) -> Option<TextPoint> {
    let last = spans.last()?;
    let total = last.end();
    if offset > total {
        return None;
    }

    let found = match bias {
        Bias::Forward => spans.iter().find(|s| s.start <= offset && offset < s.end()),
        Bias::Backward => spans
            .iter()
            .find(|s| s.start < offset && offset <= s.end())
            .or_else(|| spans.iter().find(|s| s.start == offset)),
    };

    match found {
        Some(span) => Some(TextPoint::new(span.run, offset - span.start)),
        None if offset == total => Some(TextPoint::new(last.run, last.len)),
        None => None,
    }
}

/// Inverse of [`locate`]: the global offset of a point, or None if the run is
/// not under `root` or the local offset is past the run's end
pub fn global_offset<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    point: TextPoint,
) -> Option<usize> {
    global_offset_in(&text_runs(tree, root), point)
}

pub(crate) fn global_offset_in(spans: &[RunSpan], point: TextPoint) -> Option<usize> {
    spans
        .iter()
        .find(|s| s.run == point.run)
        .filter(|s| point.offset <= s.len)
        .map(|s| s.start + point.offset)
}

/// Structural child-index path from `root` down to `node`.
///
/// None if `node` is not a descendant of `root`. The path to `root` itself is
/// empty.
pub fn path_of<T: ContentTree + ?Sized>(tree: &T, root: NodeId, node: NodeId) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = node;

    while current != root {
        if path.len() > MAX_DEPTH {
            return None;
        }
        let parent = tree.parent(current)?;
        let index = tree.children(parent).iter().position(|&id| id == current)?;
        path.push(index);
        current = parent;
    }

    path.reverse();
    Some(path)
}

/// Re-walk a structural path. Any out-of-range index, or a path that does not
/// end on a text run, resolves to None.
pub fn resolve<T: ContentTree + ?Sized>(tree: &T, root: NodeId, path: &[usize]) -> Option<NodeId> {
    let mut current = root;
    for &index in path {
        current = *tree.children(current).get(index)?;
    }
    tree.is_text_run(current).then_some(current)
}

/// Flattened text under `root`
pub fn flatten<T: ContentTree + ?Sized>(tree: &T, root: NodeId) -> String {
    text_runs(tree, root)
        .iter()
        .filter_map(|span| tree.text_content(span.run))
        .collect()
}

/// Text between two global offsets, or None if the range is inverted or runs
/// past the end
pub fn text_between<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    start: usize,
    end: usize,
) -> Option<String> {
    text_between_in(tree, &text_runs(tree, root), start, end)
}

pub(crate) fn text_between_in<T: ContentTree + ?Sized>(
    tree: &T,
    spans: &[RunSpan],
    start: usize,
    end: usize,
) -> Option<String> {
    if start > end || end > spans_len(spans) {
        return None;
    }
    let mut out = String::new();
    for span in spans {
        if span.end() <= start || span.start >= end {
            continue;
        }
        let text = tree.text_content(span.run)?;
        let from = start.saturating_sub(span.start);
        let to = (end - span.start).min(span.len);
        out.push_str(char_slice(text, from, to));
    }
    Some(out)
}

/// Global range of the block holding the character at `offset`.
///
/// The block is the nearest block-level ancestor of that character's run,
/// and its range spans the neighbouring runs that share it. None when
/// `offset` is past the end of the text.
pub fn block_range<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    offset: usize,
) -> Option<(usize, usize)> {
    let spans = text_runs(tree, root);
    let point = locate_in(&spans, offset, Bias::Forward)?;
    let index = spans.iter().position(|s| s.run == point.run)?;
    let block = nearest_block(tree, root, point.run);
    let outside = |s: &RunSpan| nearest_block(tree, root, s.run) != block;

    let first = spans[..index].iter().rposition(outside).map_or(0, |i| i + 1);
    let last = spans[index..]
        .iter()
        .position(outside)
        .map_or(spans.len(), |i| index + i);
    Some((spans[first].start, spans[last - 1].end()))
}

/// Closest block-level ancestor of `node`, or `root` if none lies below it
pub(crate) fn nearest_block<T: ContentTree + ?Sized>(tree: &T, root: NodeId, node: NodeId) -> NodeId {
    let mut current = tree.parent(node);
    let mut steps = 0;
    while let Some(id) = current {
        if id == root || tree.is_block(id) || steps > MAX_DEPTH {
            return id;
        }
        steps += 1;
        current = tree.parent(id);
    }
    root
}

// =============================================================================
// Logical (marker-transparent) paths
// =============================================================================

/// A child as seen through annotation markers
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogicalChild {
    Element(NodeId),
    /// Adjacent text runs merged into one logical run
    Text(Vec<NodeId>),
}

fn logical_children<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> Vec<LogicalChild> {
    let mut out = Vec::new();
    push_logical_children(tree, node, &mut out, 0);
    out
}

fn push_logical_children<T: ContentTree + ?Sized>(
    tree: &T,
    node: NodeId,
    out: &mut Vec<LogicalChild>,
    depth: usize,
) {
    if depth > MAX_DEPTH {
        return;
    }
    for &child in tree.children(node) {
        if tree.marker(child).is_some() {
            push_logical_children(tree, child, out, depth + 1);
        } else if tree.is_text_run(child) {
            match out.last_mut() {
                Some(LogicalChild::Text(runs)) => runs.push(child),
                _ => out.push(LogicalChild::Text(vec![child])),
            }
        } else {
            out.push(LogicalChild::Element(child));
        }
    }
}

/// Marker-transparent path of a point under `root`
pub fn logical_path_of<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    point: TextPoint,
) -> Option<LogicalPath> {
    // Ancestors of the run, up to (excluding) root
    let mut ancestors = HashSet::new();
    let mut current = tree.parent(point.run)?;
    while current != root {
        if ancestors.len() > MAX_DEPTH || !ancestors.insert(current) {
            return None;
        }
        current = tree.parent(current)?;
    }

    let mut path = Vec::new();
    let mut node = root;
    loop {
        let mut next = None;
        for (index, child) in logical_children(tree, node).into_iter().enumerate() {
            match child {
                LogicalChild::Text(runs) if runs.contains(&point.run) => {
                    let before: usize = runs
                        .iter()
                        .take_while(|&&run| run != point.run)
                        .filter_map(|&run| tree.text_content(run))
                        .map(char_len)
                        .sum();
                    path.push(index);
                    return Some(LogicalPath { path, offset: before + point.offset });
                }
                LogicalChild::Element(id) if ancestors.contains(&id) => {
                    path.push(index);
                    next = Some(id);
                    break;
                }
                _ => {}
            }
        }
        node = next?;
        if path.len() > MAX_DEPTH {
            return None;
        }
    }
}

/// Resolve a marker-transparent path against the current tree.
///
/// Returns None if any index is out of range, the path does not end on a
/// logical text run, or the offset is past that run's end.
pub fn resolve_logical_path<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    logical: &LogicalPath,
) -> Option<TextPoint> {
    let (&last, prefix) = logical.path.split_last()?;

    let mut node = root;
    for &index in prefix {
        match logical_children(tree, node).into_iter().nth(index)? {
            LogicalChild::Element(id) => node = id,
            LogicalChild::Text(_) => return None,
        }
    }

    let LogicalChild::Text(runs) = logical_children(tree, node).into_iter().nth(last)? else {
        return None;
    };

    let mut before = 0;
    let mut last_run = None;
    for run in runs {
        let len = tree.text_content(run).map(char_len).unwrap_or(0);
        if logical.offset < before + len {
            return Some(TextPoint::new(run, logical.offset - before));
        }
        before += len;
        last_run = Some((run, len));
    }

    match last_run {
        Some((run, len)) if logical.offset == before => Some(TextPoint::new(run, len)),
        _ => None,
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub(crate) fn spans_len(spans: &[RunSpan]) -> usize {
    spans.last().map(RunSpan::end).unwrap_or(0)
}

/// Slice `text` by character offsets, clamping to the text's length
pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> &str {
    let byte_at = |n: usize| {
        text.char_indices()
            .nth(n)
            .map(|(byte, _)| byte)
            .unwrap_or(text.len())
    };
    let start = byte_at(from);
    let end = byte_at(to.max(from));
    &text[start..end]
}
