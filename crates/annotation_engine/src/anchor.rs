//! Serializer / Restorer - durable descriptors for applied annotations
//!
//! A [`Descriptor`] pins an annotation to marker-transparent paths plus the
//! exact text it covered. Restoring resolves those paths against a freshly
//! built tree and refuses to apply anything whose covered text no longer
//! matches.

use crate::offset_map::{
    global_offset_in, locate_in, logical_path_of, resolve_logical_path, text_between_in,
    text_runs, Bias, LogicalPath,
};
use crate::{apply_points, markers_of, AnnotationHandle, AnnotationMeta, ApplyOptions, ContainerKey, Rejection};
use chrono::{DateTime, Utc};
use content_tree::{AnnotationId, AnnotationStyle, ContentTree, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The position-independent, serializable record of one annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub id: AnnotationId,
    pub container_key: ContainerKey,
    pub style: AnnotationStyle,
    pub start_path: Vec<usize>,
    pub start_offset: usize,
    pub end_path: Vec<usize>,
    pub end_offset: usize,
    /// Exact text covered at capture time
    pub verification_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Descriptor {
    pub fn meta(&self) -> AnnotationMeta {
        AnnotationMeta::with_id(self.id, self.style)
    }

    pub fn start(&self) -> LogicalPath {
        LogicalPath {
            path: self.start_path.clone(),
            offset: self.start_offset,
        }
    }

    pub fn end(&self) -> LogicalPath {
        LogicalPath {
            path: self.end_path.clone(),
            offset: self.end_offset,
        }
    }
}

/// Why a descriptor was not restored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("path no longer resolves")]
    PathNotFound,

    #[error("resolved end precedes resolved start")]
    InvalidRange,

    #[error("content drifted: expected {expected:?}, found {found:?}")]
    Drifted { expected: String, found: String },

    #[error("annotation is already applied")]
    AlreadyApplied,

    #[error("applier rejected the span: {0}")]
    Rejected(Rejection),
}

/// Result of restoring one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Applied(AnnotationHandle),
    Skipped(SkipReason),
}

impl RestoreOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RestoreOutcome::Applied(_))
    }
}

/// Summary of a batch restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub applied: Vec<AnnotationHandle>,
    pub skipped: Vec<(AnnotationId, SkipReason)>,
}

impl RestoreReport {
    /// Whether every descriptor came back
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Describe an annotation that has just been applied
pub fn serialize<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    handle: &AnnotationHandle,
    container_key: &ContainerKey,
) -> Option<Descriptor> {
    capture(tree, root, handle.start, handle.end, handle.meta(), container_key)
}

/// Describe the span `start..end` before anything is applied to it.
///
/// Returns None if either offset is outside the container or the span is
/// empty.
pub fn capture<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    start: usize,
    end: usize,
    meta: AnnotationMeta,
    container_key: &ContainerKey,
) -> Option<Descriptor> {
    if end <= start {
        return None;
    }
    let spans = text_runs(tree, root);
    let start_point = locate_in(&spans, start, Bias::Forward)?;
    let end_point = locate_in(&spans, end, Bias::Backward)?;
    let start_path = logical_path_of(tree, root, start_point)?;
    let end_path = logical_path_of(tree, root, end_point)?;
    let verification_text = text_between_in(tree, &spans, start, end)?;

    Some(Descriptor {
        id: meta.id,
        container_key: container_key.clone(),
        style: meta.style,
        start_path: start_path.path,
        start_offset: start_path.offset,
        end_path: end_path.path,
        end_offset: end_path.offset,
        verification_text,
        created_at: Some(Utc::now()),
    })
}

/// Replay a descriptor onto the current tree.
///
/// Nothing is applied unless both paths resolve and the text between them
/// is exactly the captured text.
pub fn restore<T: ContentTree + ?Sized>(
    tree: &mut T,
    root: NodeId,
    descriptor: &Descriptor,
    options: &ApplyOptions,
) -> RestoreOutcome {
    match try_restore(tree, root, descriptor, options) {
        Ok(handle) => RestoreOutcome::Applied(handle),
        Err(reason) => {
            tracing::debug!(id = %descriptor.id, %reason, "descriptor skipped");
            RestoreOutcome::Skipped(reason)
        }
    }
}

fn try_restore<T: ContentTree + ?Sized>(
    tree: &mut T,
    root: NodeId,
    descriptor: &Descriptor,
    options: &ApplyOptions,
) -> Result<AnnotationHandle, SkipReason> {
    if !markers_of(&*tree, root, descriptor.id).is_empty() {
        return Err(SkipReason::AlreadyApplied);
    }

    let start = resolve_logical_path(&*tree, root, &descriptor.start()).ok_or(SkipReason::PathNotFound)?;
    let end = resolve_logical_path(&*tree, root, &descriptor.end()).ok_or(SkipReason::PathNotFound)?;

    let spans = text_runs(&*tree, root);
    let (Some(from), Some(to)) = (global_offset_in(&spans, start), global_offset_in(&spans, end)) else {
        return Err(SkipReason::PathNotFound);
    };
    if to < from {
        return Err(SkipReason::InvalidRange);
    }

    let found = text_between_in(&*tree, &spans, from, to).ok_or(SkipReason::PathNotFound)?;
    if found != descriptor.verification_text {
        return Err(SkipReason::Drifted {
            expected: descriptor.verification_text.clone(),
            found,
        });
    }

    apply_points(tree, root, start, end, descriptor.meta(), options).map_err(SkipReason::Rejected)
}

/// Restore every descriptor in order. A stale descriptor is skipped and the
/// rest are still attempted.
pub fn restore_all<T: ContentTree + ?Sized>(
    tree: &mut T,
    root: NodeId,
    descriptors: &[Descriptor],
    options: &ApplyOptions,
) -> RestoreReport {
    let mut report = RestoreReport::default();
    for descriptor in descriptors {
        match restore(tree, root, descriptor, options) {
            RestoreOutcome::Applied(handle) => report.applied.push(handle),
            RestoreOutcome::Skipped(reason) => report.skipped.push((descriptor.id, reason)),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply;
    use crate::offset_map::flatten;
    use content_tree::{parse_markup, DocumentTree};

    fn key() -> ContainerKey {
        ContainerKey::new("reading-1", Some("passage-2")).unwrap()
    }

    fn opts() -> ApplyOptions {
        ApplyOptions::default()
    }

    #[test]
    fn test_quick_brown_fox_round_trip() {
        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();
        let meta = AnnotationMeta::new(AnnotationStyle::Highlight);

        let handle = apply(&mut tree, root, 4, 9, meta, &opts()).unwrap();
        assert_eq!(handle.markers.len(), 1);
        assert_eq!(flatten(&tree, root), "The quick brown fox");

        let descriptor = serialize(&tree, root, &handle, &key()).unwrap();
        assert_eq!(descriptor.verification_text, "quick");
        assert_eq!(descriptor.start_path, vec![0, 0]);
        assert_eq!(descriptor.start_offset, 4);
        assert_eq!(descriptor.end_path, vec![0, 0]);
        assert_eq!(descriptor.end_offset, 9);

        let mut rebuilt = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let rebuilt_root = rebuilt.root_id();
        let outcome = restore(&mut rebuilt, rebuilt_root, &descriptor, &opts());

        let RestoreOutcome::Applied(restored) = outcome else {
            panic!("expected restore to apply, got {:?}", outcome);
        };
        assert_eq!(restored.text, "quick");
        assert_eq!((restored.start, restored.end), (4, 9));
        assert_eq!(rebuilt.render_html(), tree.render_html());
    }

    #[test]
    fn test_drifted_text_is_skipped() {
        let original = DocumentTree::from_paragraphs(&["Every year the whale migration begins"]);
        let descriptor = capture(
            &original,
            original.root_id(),
            15,
            30,
            AnnotationMeta::new(AnnotationStyle::HighlightA),
            &key(),
        )
        .unwrap();
        assert_eq!(descriptor.verification_text, "whale migration");

        let mut changed = DocumentTree::from_paragraphs(&["Every year the whale season begins"]);
        let root = changed.root_id();
        let before = changed.render_html();

        let outcome = restore(&mut changed, root, &descriptor, &opts());

        assert_eq!(
            outcome,
            RestoreOutcome::Skipped(SkipReason::Drifted {
                expected: "whale migration".into(),
                found: "whale season be".into(),
            })
        );
        assert_eq!(changed.render_html(), before);
    }

    #[test]
    fn test_shortened_text_is_path_not_found() {
        let original = DocumentTree::from_paragraphs(&["whale migration"]);
        let descriptor = capture(
            &original,
            original.root_id(),
            0,
            15,
            AnnotationMeta::new(AnnotationStyle::Highlight),
            &key(),
        )
        .unwrap();

        let mut changed = DocumentTree::from_paragraphs(&["whale season"]);
        let root = changed.root_id();
        assert_eq!(
            restore(&mut changed, root, &descriptor, &opts()),
            RestoreOutcome::Skipped(SkipReason::PathNotFound)
        );
    }

    #[test]
    fn test_restore_twice_is_already_applied() {
        let source = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let descriptor = capture(
            &source,
            source.root_id(),
            10,
            15,
            AnnotationMeta::new(AnnotationStyle::Highlight),
            &key(),
        )
        .unwrap();

        let mut tree = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let root = tree.root_id();
        assert!(restore(&mut tree, root, &descriptor, &opts()).is_applied());
        assert_eq!(
            restore(&mut tree, root, &descriptor, &opts()),
            RestoreOutcome::Skipped(SkipReason::AlreadyApplied)
        );
    }

    #[test]
    fn test_paths_ignore_other_annotations() {
        let markup = "<p>The <em>quick</em> brown fox</p><p>jumps over</p>";

        // Captured while another annotation is applied
        let mut annotated = parse_markup(markup).unwrap();
        let root = annotated.root_id();
        apply(&mut annotated, root, 10, 15, AnnotationMeta::new(AnnotationStyle::HighlightB), &opts()).unwrap();
        let handle = apply(&mut annotated, root, 12, 22, AnnotationMeta::new(AnnotationStyle::Highlight), &ApplyOptions {
            boundary_policy: crate::BoundaryPolicy::SplitAcrossBlocks,
            ..opts()
        })
        .unwrap();
        let descriptor = serialize(&annotated, root, &handle, &key()).unwrap();
        assert_eq!(descriptor.verification_text, "own foxjum");

        // Restored onto a clean rebuild
        let mut clean = parse_markup(markup).unwrap();
        let clean_root = clean.root_id();
        let outcome = restore(&mut clean, clean_root, &descriptor, &ApplyOptions {
            boundary_policy: crate::BoundaryPolicy::SplitAcrossBlocks,
            ..opts()
        });
        let RestoreOutcome::Applied(restored) = outcome else {
            panic!("expected restore to apply, got {:?}", outcome);
        };
        assert_eq!((restored.start, restored.end), (12, 22));
        assert_eq!(restored.markers.len(), 2);
    }

    #[test]
    fn test_restore_all_skips_stale_and_keeps_going() {
        let source = DocumentTree::from_paragraphs(&["alpha beta gamma"]);
        let root = source.root_id();
        let meta = |style| AnnotationMeta::new(style);
        let good = capture(&source, root, 0, 5, meta(AnnotationStyle::Highlight), &key()).unwrap();
        let mut stale = capture(&source, root, 6, 10, meta(AnnotationStyle::HighlightA), &key()).unwrap();
        stale.verification_text = "BETA".into();
        let also_good = capture(&source, root, 11, 16, meta(AnnotationStyle::HighlightB), &key()).unwrap();

        let mut tree = DocumentTree::from_paragraphs(&["alpha beta gamma"]);
        let tree_root = tree.root_id();
        let report = restore_all(&mut tree, tree_root, &[good, stale.clone(), also_good], &opts());

        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, stale.id);
        assert!(!report.is_complete());
        assert_eq!(flatten(&tree, tree_root), "alpha beta gamma");
    }

    #[test]
    fn test_rejected_span_is_skipped() {
        let source = DocumentTree::from_paragraphs(&["a    b"]);
        let mut descriptor = capture(
            &source,
            source.root_id(),
            0,
            6,
            AnnotationMeta::new(AnnotationStyle::Highlight),
            &key(),
        )
        .unwrap();
        descriptor.start_offset = 1;
        descriptor.end_offset = 5;
        descriptor.verification_text = "    ".into();

        let mut tree = DocumentTree::from_paragraphs(&["a    b"]);
        let root = tree.root_id();
        assert_eq!(
            restore(&mut tree, root, &descriptor, &opts()),
            RestoreOutcome::Skipped(SkipReason::Rejected(Rejection::WhitespaceOnly))
        );
    }

    #[test]
    fn test_inverted_paths_are_invalid() {
        let source = DocumentTree::from_paragraphs(&["abcdef"]);
        let mut descriptor = capture(
            &source,
            source.root_id(),
            1,
            4,
            AnnotationMeta::new(AnnotationStyle::Highlight),
            &key(),
        )
        .unwrap();
        std::mem::swap(&mut descriptor.start_offset, &mut descriptor.end_offset);

        let mut tree = DocumentTree::from_paragraphs(&["abcdef"]);
        let root = tree.root_id();
        assert_eq!(
            restore(&mut tree, root, &descriptor, &opts()),
            RestoreOutcome::Skipped(SkipReason::InvalidRange)
        );
    }

    #[test]
    fn test_descriptor_wire_format() {
        let source = DocumentTree::from_paragraphs(&["The quick brown fox"]);
        let mut descriptor = capture(
            &source,
            source.root_id(),
            4,
            9,
            AnnotationMeta::new(AnnotationStyle::HighlightA),
            &key(),
        )
        .unwrap();
        descriptor.created_at = None;

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["containerKey"], "reading-1/passage-2");
        assert_eq!(json["style"], "highlight_a");
        assert_eq!(json["startPath"], serde_json::json!([0, 0]));
        assert_eq!(json["startOffset"], 4);
        assert_eq!(json["endOffset"], 9);
        assert_eq!(json["verificationText"], "quick");
        assert!(json.get("createdAt").is_none());

        let back: Descriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn test_capture_rejects_bad_offsets() {
        let tree = DocumentTree::from_paragraphs(&["short"]);
        let root = tree.root_id();
        let meta = AnnotationMeta::new(AnnotationStyle::Highlight);
        assert!(capture(&tree, root, 3, 3, meta, &key()).is_none());
        assert!(capture(&tree, root, 0, 6, meta, &key()).is_none());
        assert!(capture(&tree, root, 0, 5, meta, &key()).is_some());
    }
}
