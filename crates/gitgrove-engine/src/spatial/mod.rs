mod quadtree;

pub use quadtree::QuadTree;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle; edges are inclusive so zero-area boxes still match points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    pub fn centered(cx: f32, cy: f32, half_extent: f32) -> Self {
        Self::new(
            cx - half_extent,
            cy - half_extent,
            cx + half_extent,
            cy + half_extent,
        )
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Quadrant order: 0 = low x/low y, 1 = high x/low y, 2 = low x/high y, 3 = high x/high y.
    pub(crate) fn quadrant(&self, quadrant: usize) -> Bounds {
        let (cx, cy) = self.center();
        match quadrant {
            0 => Bounds::new(self.min_x, self.min_y, cx, cy),
            1 => Bounds::new(cx, self.min_y, self.max_x, cy),
            2 => Bounds::new(self.min_x, cy, cx, self.max_y),
            _ => Bounds::new(cx, cy, self.max_x, self.max_y),
        }
    }

    pub fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(self.min_x, self.max_x),
            y.clamp(self.min_y, self.max_y),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialItem {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl SpatialItem {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_normalize_swapped_corners() {
        let b = Bounds::new(10.0, 5.0, -10.0, -5.0);
        assert_eq!(b.min_x, -10.0);
        assert_eq!(b.max_y, 5.0);
        assert!(b.contains_point(0.0, 0.0));
    }

    #[test]
    fn zero_area_bounds_contain_their_point() {
        let b = Bounds::new(3.0, 4.0, 3.0, 4.0);
        assert!(b.contains_point(3.0, 4.0));
        assert!(!b.contains_point(3.0, 4.001));
        assert!(b.intersects(&Bounds::centered(0.0, 0.0, 10.0)));
    }

    #[test]
    fn quadrants_tile_parent() {
        let b = Bounds::centered(0.0, 0.0, 8.0);
        assert_eq!(b.quadrant(0), Bounds::new(-8.0, -8.0, 0.0, 0.0));
        assert_eq!(b.quadrant(3), Bounds::new(0.0, 0.0, 8.0, 8.0));
    }
}
