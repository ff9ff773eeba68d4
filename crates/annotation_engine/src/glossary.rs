//! Glossary capture - expanding a selection to whole words

use crate::ContainerKey;
use content_tree::AnnotationId;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// A word the user saved to their glossary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryCapture {
    pub annotation_id: AnnotationId,
    pub container_key: ContainerKey,
    pub word: String,
    pub start: usize,
    pub end: usize,
}

/// Expand the character range `start..end` of `text` so it starts and ends
/// on word boundaries.
///
/// Every word the range touches is included in full; punctuation and
/// whitespace at the edges are dropped. Returns None when the range touches
/// no word.
pub fn snap_to_word(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let mut snapped: Option<(usize, usize)> = None;
    let mut pos = 0;

    for segment in text.split_word_bounds() {
        let seg_start = pos;
        pos += segment.chars().count();
        if seg_start >= end {
            break;
        }
        if pos <= start || !segment.chars().any(char::is_alphanumeric) {
            continue;
        }
        snapped = Some(match snapped {
            Some((from, _)) => (from, pos),
            None => (seg_start, pos),
        });
    }
    snapped
}
