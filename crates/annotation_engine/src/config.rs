//! Engine configuration

use crate::Rect;
use serde::{Deserialize, Serialize};

/// How a selection that spans several blocks is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Every covered run must share one block ancestor; otherwise the
    /// selection is rejected and the tree is left untouched
    #[default]
    SameBlock,
    /// Wrap each block's share of the selection in its own marker, all
    /// markers sharing one annotation id
    SplitAcrossBlocks,
}

/// Where the floating action menu goes relative to a selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuPlacement {
    /// Vertical distance between the selection and the menu
    pub gap: f64,
    /// Menu size, used to keep it inside the viewport
    pub menu_width: f64,
    pub menu_height: f64,
    /// Minimum distance kept from the viewport edges
    pub min_margin: f64,
    /// Visible area; no clamping when None
    pub viewport: Option<Rect>,
}

impl Default for MenuPlacement {
    fn default() -> Self {
        Self {
            gap: 8.0,
            menu_width: 160.0,
            menu_height: 40.0,
            min_margin: 4.0,
            viewport: None,
        }
    }
}

/// Configuration for the annotation engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Selections shorter than this many characters are ignored
    pub min_selection_chars: usize,
    pub boundary_policy: BoundaryPolicy,
    pub menu: MenuPlacement,
    /// Expand glossary captures to whole words
    pub snap_glossary_to_words: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_selection_chars: 1,
            boundary_policy: BoundaryPolicy::SameBlock,
            menu: MenuPlacement::default(),
            snap_glossary_to_words: true,
        }
    }
}

impl EngineConfig {
    /// Options handed to the range applier
    pub fn apply_options(&self) -> crate::ApplyOptions {
        crate::ApplyOptions {
            min_chars: self.min_selection_chars,
            boundary_policy: self.boundary_policy,
        }
    }
}
