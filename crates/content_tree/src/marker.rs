//! Annotation marker payload and presentation styles

use crate::AnnotationId;
use serde::{Deserialize, Serialize};

/// Presentation of an annotation.
///
/// A closed set so renderers and the applier can match exhaustively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStyle {
    /// Plain highlight
    #[default]
    Highlight,
    /// Colored highlight, variant A
    HighlightA,
    /// Colored highlight, variant B
    HighlightB,
    /// Word captured into the glossary (removable)
    Glossary,
}

impl AnnotationStyle {
    /// All styles, in menu order
    pub const ALL: [AnnotationStyle; 4] = [
        AnnotationStyle::Highlight,
        AnnotationStyle::HighlightA,
        AnnotationStyle::HighlightB,
        AnnotationStyle::Glossary,
    ];

    /// CSS class name used when the marker is rendered
    pub fn class_name(&self) -> &'static str {
        match self {
            AnnotationStyle::Highlight => "hl",
            AnnotationStyle::HighlightA => "hl-a",
            AnnotationStyle::HighlightB => "hl-b",
            AnnotationStyle::Glossary => "hl-glossary",
        }
    }

    /// Display color as a CSS hex string
    pub fn color(&self) -> &'static str {
        match self {
            AnnotationStyle::Highlight => "#fff176",
            AnnotationStyle::HighlightA => "#a5d6a7",
            AnnotationStyle::HighlightB => "#f48fb1",
            AnnotationStyle::Glossary => "#90caf9",
        }
    }

    /// Stable name, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStyle::Highlight => "highlight",
            AnnotationStyle::HighlightA => "highlight_a",
            AnnotationStyle::HighlightB => "highlight_b",
            AnnotationStyle::Glossary => "glossary",
        }
    }
}

impl std::fmt::Display for AnnotationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnnotationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| format!("unknown annotation style: {}", s))
    }
}

/// Data carried by an annotation marker node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerData {
    /// The annotation this marker belongs to
    pub annotation_id: AnnotationId,
    /// How the marker is presented
    pub style: AnnotationStyle,
}

impl MarkerData {
    pub fn new(annotation_id: AnnotationId, style: AnnotationStyle) -> Self {
        Self { annotation_id, style }
    }
}
