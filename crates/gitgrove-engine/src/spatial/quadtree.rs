use smallvec::SmallVec;
use std::collections::HashMap;

use super::{Bounds, SpatialItem};

const MAX_SUPPORTED_DEPTH: u8 = 8;

#[derive(Debug, Clone)]
struct Cell {
    bounds: Bounds,
    depth: u8,
    divided: bool,
    items: Vec<SpatialItem>,
}

/// Point quadtree stored as a flat cell array; cell `k` has children `4k+1..=4k+4`.
///
/// Every cell down to `max_depth` is laid out once at construction, so subdividing
/// never allocates cells. Items that fit no child (points outside the root bounds)
/// stay in the cell they reached, and the root's items are always scanned by queries.
#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<Cell>,
    max_depth: u8,
    max_items: usize,
    locations: HashMap<u32, usize>,
}

impl QuadTree {
    pub fn new(bounds: Bounds, max_depth: u8, max_items: usize) -> Self {
        let max_depth = max_depth.min(MAX_SUPPORTED_DEPTH);
        let cell_count = (4usize.pow(u32::from(max_depth) + 1) - 1) / 3;

        let mut cells = Vec::with_capacity(cell_count);
        cells.push(Cell {
            bounds,
            depth: 0,
            divided: false,
            items: Vec::new(),
        });
        for k in 1..cell_count {
            let parent = (k - 1) / 4;
            let quadrant = (k - 1) % 4;
            let (parent_bounds, parent_depth) = (cells[parent].bounds, cells[parent].depth);
            cells.push(Cell {
                bounds: parent_bounds.quadrant(quadrant),
                depth: parent_depth + 1,
                divided: false,
                items: Vec::new(),
            });
        }

        Self {
            cells,
            max_depth,
            max_items: max_items.max(1),
            locations: HashMap::new(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.cells[0].bounds
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Inserting an id that is already present moves it.
    pub fn insert(&mut self, item: SpatialItem) {
        if self.locations.contains_key(&item.id) {
            self.remove(item.id);
        }
        self.insert_from(0, item);
    }

    pub fn remove(&mut self, id: u32) -> bool {
        let Some(cell) = self.locations.remove(&id) else {
            return false;
        };
        let items = &mut self.cells[cell].items;
        match items.iter().position(|item| item.id == id) {
            Some(pos) => {
                items.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Keeps cell storage (and item capacity) for the next rebuild.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.items.clear();
            cell.divided = false;
        }
        self.locations.clear();
    }

    pub fn rebuild<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = SpatialItem>,
    {
        self.clear();
        for item in items {
            self.insert_from(0, item);
        }
    }

    pub fn query_range(&self, range: &Bounds) -> Vec<SpatialItem> {
        let mut out = Vec::new();
        self.query_range_into(range, &mut out);
        out
    }

    pub fn query_range_into(&self, range: &Bounds, out: &mut Vec<SpatialItem>) {
        let mut stack: SmallVec<[usize; 32]> = SmallVec::new();
        stack.push(0);

        while let Some(k) = stack.pop() {
            let cell = &self.cells[k];
            out.extend(
                cell.items
                    .iter()
                    .filter(|item| range.contains_point(item.x, item.y))
                    .copied(),
            );
            if !cell.divided {
                continue;
            }
            for child in (4 * k + 1)..=(4 * k + 4) {
                if self.cells[child].bounds.intersects(range) {
                    stack.push(child);
                }
            }
        }
    }

    pub fn query_radius(&self, cx: f32, cy: f32, radius: f32) -> Vec<SpatialItem> {
        let mut out = Vec::new();
        self.query_radius_into(cx, cy, radius, &mut out);
        out
    }

    pub fn query_radius_into(&self, cx: f32, cy: f32, radius: f32, out: &mut Vec<SpatialItem>) {
        let radius = radius.max(0.0);
        let start = out.len();
        self.query_range_into(&Bounds::centered(cx, cy, radius), out);

        let radius_sq = radius * radius;
        let mut write = start;
        for read in start..out.len() {
            let item = out[read];
            let dx = item.x - cx;
            let dy = item.y - cy;
            if dx * dx + dy * dy <= radius_sq {
                out[write] = item;
                write += 1;
            }
        }
        out.truncate(write);
    }

    fn insert_from(&mut self, mut k: usize, item: SpatialItem) {
        while self.cells[k].divided {
            match self.child_for(k, item.x, item.y) {
                Some(child) => k = child,
                None => break,
            }
        }

        self.cells[k].items.push(item);
        self.locations.insert(item.id, k);

        let cell = &self.cells[k];
        if !cell.divided && cell.items.len() > self.max_items && cell.depth < self.max_depth {
            self.subdivide(k);
        }
    }

    fn subdivide(&mut self, k: usize) {
        self.cells[k].divided = true;
        let items = std::mem::take(&mut self.cells[k].items);
        for item in items {
            match self.child_for(k, item.x, item.y) {
                Some(child) => self.insert_from(child, item),
                None => {
                    self.cells[k].items.push(item);
                    self.locations.insert(item.id, k);
                }
            }
        }
    }

    fn child_for(&self, k: usize, x: f32, y: f32) -> Option<usize> {
        let bounds = &self.cells[k].bounds;
        if !bounds.contains_point(x, y) {
            return None;
        }
        let (cx, cy) = bounds.center();
        let quadrant = usize::from(x >= cx) + 2 * usize::from(y >= cy);
        Some(4 * k + 1 + quadrant)
    }
}
