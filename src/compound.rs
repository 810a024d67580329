//! Convex decomposition for concave polygons: ear-clipping triangulation,
//! greedy convex merge of adjacent triangles, and a union-find based weld
//! plan connecting the resulting pieces with at most `n - 1` welds.
//!
//! These are pure functions over geometry — no [`crate::world::World`]
//! dependency — so they can be tested in isolation from body/constraint
//! bookkeeping. `World::add_concave_polygon` is the integration point that
//! turns a weld plan into real bodies and constraints.

use crate::error::{PhysicsError, Result};
use crate::math::{Vec2, EPSILON};
use crate::shapes::signed_area_x2;

/// Splits a simple polygon (arbitrary winding, >= 3 vertices) into triangles
/// by repeatedly clipping convex "ears". Returns vertices in the engine's
/// canonical CCW winding.
pub fn ear_clip_triangulate(vertices: &[Vec2]) -> Result<Vec<[Vec2; 3]>> {
    if vertices.len() < 3 {
        return Err(PhysicsError::TooFewVertices(vertices.len()));
    }

    let mut poly: Vec<Vec2> = vertices.to_vec();
    if signed_area_x2(&poly) < 0.0 {
        poly.reverse();
    }

    let mut triangles = Vec::with_capacity(poly.len().saturating_sub(2));
    let mut indices: Vec<usize> = (0..poly.len()).collect();

    // Bounded by the number of vertices removed; if no ear is ever found
    // this loop bails with an error rather than spinning.
    let mut guard = indices.len() * indices.len() + 8;

    while indices.len() > 3 {
        guard -= 1;
        if guard == 0 {
            return Err(PhysicsError::InvalidGeometry);
        }

        let n = indices.len();
        let mut clipped = false;
        for k in 0..n {
            let prev = indices[(k + n - 1) % n];
            let cur = indices[k];
            let next = indices[(k + 1) % n];

            let a = poly[prev];
            let b = poly[cur];
            let c = poly[next];

            if (b - a).cross(c - b) <= EPSILON {
                continue; // reflex or degenerate vertex, not an ear tip
            }

            let is_ear = indices
                .iter()
                .filter(|&&idx| idx != prev && idx != cur && idx != next)
                .all(|&idx| !point_in_triangle(poly[idx], a, b, c));

            if is_ear {
                triangles.push([a, b, c]);
                indices.remove(k);
                clipped = true;
                break;
            }
        }

        if !clipped {
            return Err(PhysicsError::InvalidGeometry);
        }
    }

    if indices.len() == 3 {
        triangles.push([poly[indices[0]], poly[indices[1]], poly[indices[2]]]);
    }

    Ok(triangles)
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (p - a).cross(b - a);
    let d2 = (p - b).cross(c - b);
    let d3 = (p - c).cross(a - c);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Finds a shared edge (endpoints matching within `eps`, in either winding
/// direction) between two polygons, if one exists.
fn shared_edge(a: &[Vec2], b: &[Vec2], eps: f32) -> Option<(usize, usize)> {
    let na = a.len();
    let nb = b.len();
    for i in 0..na {
        let a0 = a[i];
        let a1 = a[(i + 1) % na];
        for j in 0..nb {
            let b0 = b[j];
            let b1 = b[(j + 1) % nb];
            let matches_reversed = (a0 - b1).length() < eps && (a1 - b0).length() < eps;
            if matches_reversed {
                return Some((i, j));
            }
        }
    }
    None
}

fn remove_collinear(poly: &[Vec2]) -> Vec<Vec2> {
    let n = poly.len();
    if n < 3 {
        return poly.to_vec();
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = poly[(i + n - 1) % n];
        let cur = poly[i];
        let next = poly[(i + 1) % n];
        if (cur - prev).cross(next - cur).abs() > EPSILON {
            out.push(cur);
        }
    }
    if out.len() < 3 {
        poly.to_vec()
    } else {
        out
    }
}

fn is_convex_polygon(poly: &[Vec2]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = poly[(i + 2) % n];
        let cross = (b - a).cross(c - b);
        if cross.abs() < EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Merges a set of convex polygons wherever two adjacent pieces share an
/// edge and the merge result is itself convex, repeating until no more
/// merges apply. Output polygons are re-wound CCW.
pub fn greedy_merge(mut pieces: Vec<Vec<Vec2>>) -> Vec<Vec<Vec2>> {
    loop {
        let mut merged_any = false;
        'outer: for i in 0..pieces.len() {
            for j in (i + 1)..pieces.len() {
                if let Some((ei, ej)) = shared_edge(&pieces[i], &pieces[j], 1e-3) {
                    if let Some(candidate) = try_merge_at(&pieces[i], &pieces[j], ei, ej) {
                        let merged = remove_collinear(&candidate);
                        if is_convex_polygon(&merged) {
                            let mut merged = merged;
                            if signed_area_x2(&merged) < 0.0 {
                                merged.reverse();
                            }
                            let (lo, hi) = (i, j);
                            pieces.remove(hi);
                            pieces.remove(lo);
                            pieces.push(merged);
                            merged_any = true;
                            break 'outer;
                        }
                    }
                }
            }
        }
        if !merged_any {
            break;
        }
    }
    pieces
}

/// Splices polygon `b` into the gap left by the shared edge `(ei, ei+1)` of
/// `a`, producing the boundary of their union.
fn try_merge_at(a: &[Vec2], b: &[Vec2], ei: usize, ej: usize) -> Option<Vec<Vec2>> {
    let na = a.len();
    let nb = b.len();
    let mut out = Vec::with_capacity(na + nb - 2);
    // Walk a's vertices starting just after the shared edge, then splice in
    // b's vertices starting just after its matching (reversed) edge.
    for k in 0..na {
        let idx = (ei + 1 + k) % na;
        if idx == ei {
            break;
        }
        out.push(a[idx]);
    }
    for k in 0..nb {
        let idx = (ej + 1 + k) % nb;
        if idx == ej {
            break;
        }
        out.push(b[idx]);
    }
    if out.len() < 3 {
        None
    } else {
        Some(out)
    }
}

/// Simple union-find over piece indices, used to build a minimum spanning
/// weld plan (at most `n - 1` welds connecting `n` convex pieces).
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }
}

/// A planned weld between two convex pieces, anchored at the midpoint of
/// their shared feature (edge preferred, else a shared vertex).
#[derive(Debug, Clone, Copy)]
pub struct WeldPlanEntry {
    pub piece_a: usize,
    pub piece_b: usize,
    pub anchor: Vec2,
}

/// Builds a minimum spanning connectivity over `pieces`, preferring welds at
/// shared edges over shared vertices.
pub fn plan_welds(pieces: &[Vec<Vec2>]) -> Vec<WeldPlanEntry> {
    let n = pieces.len();
    let mut candidates: Vec<(usize, usize, Vec2, bool)> = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            if let Some((ei, ej)) = shared_edge(&pieces[i], &pieces[j], 1e-3) {
                let na = pieces[i].len();
                let nb = pieces[j].len();
                let mid = (pieces[i][ei] + pieces[i][(ei + 1) % na] + pieces[j][ej] + pieces[j][(ej + 1) % nb]) * 0.25;
                candidates.push((i, j, mid, true));
            } else if let Some((vi, vj, point)) = shared_vertex(&pieces[i], &pieces[j], 1e-3) {
                let _ = (vi, vj);
                candidates.push((i, j, point, false));
            }
        }
    }

    // Edges before vertices, so the MST prefers the sturdier connection.
    candidates.sort_by(|a, b| b.3.cmp(&a.3));

    let mut uf = UnionFind::new(n);
    let mut plan = Vec::new();
    for (i, j, anchor, _) in candidates {
        if uf.union(i, j) {
            plan.push(WeldPlanEntry {
                piece_a: i,
                piece_b: j,
                anchor,
            });
        }
    }
    plan
}

fn shared_vertex(a: &[Vec2], b: &[Vec2], eps: f32) -> Option<(usize, usize, Vec2)> {
    for (i, &va) in a.iter().enumerate() {
        for (j, &vb) in b.iter().enumerate() {
            if (va - vb).length() < eps {
                return Some((i, j, va));
            }
        }
    }
    None
}
