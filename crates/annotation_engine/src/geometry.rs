//! Selection geometry and floating menu placement

use crate::MenuPlacement;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in viewport coordinates (y grows downward)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Bounding box of a set of rectangles, None when empty
    pub fn bounding(rects: &[Rect]) -> Option<Rect> {
        let (first, rest) = rects.split_first()?;
        Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
    }
}

/// Which side of the selection the menu sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuSide {
    Above,
    Below,
}

/// Top-left corner of the floating action menu
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub x: f64,
    pub y: f64,
    pub side: MenuSide,
}

/// Place the menu for a selection covering `rects`.
///
/// The menu is centered over the selection and sits `gap` above it. If that
/// would push it above the viewport it flips below; horizontally it is
/// clamped to stay `min_margin` inside the viewport.
pub fn compute_anchor(rects: &[Rect], placement: &MenuPlacement) -> Option<AnchorPoint> {
    let bounds = Rect::bounding(rects)?;

    let mut x = bounds.center_x() - placement.menu_width / 2.0;
    let mut y = bounds.y - placement.gap - placement.menu_height;
    let mut side = MenuSide::Above;

    if let Some(viewport) = placement.viewport {
        if y < viewport.y + placement.min_margin {
            y = bounds.bottom() + placement.gap;
            side = MenuSide::Below;
        }
        let min_x = viewport.x + placement.min_margin;
        let max_x = viewport.right() - placement.min_margin - placement.menu_width;
        x = if max_x < min_x { min_x } else { x.clamp(min_x, max_x) };
    }

    Some(AnchorPoint { x, y, side })
}
