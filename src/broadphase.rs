//! Broad phase: uniform spatial hash producing deduplicated candidate pairs.
//!
//! Cells, the dedup set and the pair list are all owned by the
//! [`SpatialHash`] and cleared (never reallocated) every tick, matching the
//! "no allocation inside the tick hot path" pooling rule.

use std::collections::{HashMap, HashSet};

use crate::body::BodyId;
use crate::math::Aabb;

pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<(i32, i32), Vec<BodyId>>,
    seen: HashSet<(BodyId, BodyId)>,
    pairs: Vec<(BodyId, BodyId)>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 10.0 };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            seen: HashSet::new(),
            pairs: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn set_cell_size(&mut self, cell_size: f32) {
        if cell_size > 0.0 {
            self.cell_size = cell_size;
            self.inv_cell_size = 1.0 / cell_size;
        }
    }

    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.seen.clear();
        self.pairs.clear();
    }

    /// Inserts a body's world AABB into every overlapping cell.
    pub fn insert(&mut self, id: BodyId, aabb: &Aabb) {
        let x0 = (aabb.min.x * self.inv_cell_size).floor() as i32;
        let y0 = (aabb.min.y * self.inv_cell_size).floor() as i32;
        let x1 = (aabb.max.x * self.inv_cell_size).floor() as i32;
        let y1 = (aabb.max.y * self.inv_cell_size).floor() as i32;

        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(id);
            }
        }
    }

    /// Emits every unique unordered pair of bodies sharing at least one cell.
    /// Pair ordering for dedup uses the key's stable `KeyData` ordering, not
    /// pointer identity, so the result is deterministic across runs.
    pub fn pairs(&mut self) -> &[(BodyId, BodyId)] {
        for bucket in self.cells.values() {
            let n = bucket.len();
            for i in 0..n {
                for j in (i + 1)..n {
                    let (a, b) = (bucket[i], bucket[j]);
                    let pair = order_pair(a, b);
                    if self.seen.insert(pair) {
                        self.pairs.push(pair);
                    }
                }
            }
        }
        &self.pairs
    }
}

fn order_pair(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    use slotmap::Key;
    if a.data().as_ffi() <= b.data().as_ffi() {
        (a, b)
    } else {
        (b, a)
    }
}
