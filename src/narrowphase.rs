//! Narrow phase: exact collision tests producing a single-point manifold.
//!
//! Per design, manifolds here are always single-point — no Sutherland-Hodgman
//! clipping, no multi-point contact patches, no warm-started accumulated
//! impulse across ticks. `Box` is treated as a rotatable 4-vertex polygon:
//! any shape other than `Circle` goes through the same SAT code path.

use crate::body::{Body, BodyId};
use crate::math::{closest_point_on_segment, Vec2, EPSILON};
use crate::shapes::{point_in_polygon, Shape};

/// The record of a single contact: two bodies, contact point, outward
/// normal (pointing from `a` toward `b`), penetration depth. The canonical
/// assignment of `a`/`b` puts a box/polygon in `a` and a circle (if any) in
/// `b`, independent of broad-phase pair order.
#[derive(Debug, Clone, Copy)]
pub struct Manifold {
    pub a: BodyId,
    pub b: BodyId,
    pub normal: Vec2,
    pub penetration: f32,
    pub point: Vec2,
}

fn is_circle(shape: &Shape) -> bool {
    matches!(shape, Shape::Circle { .. })
}

/// Dispatches on shape tag and returns a manifold if the pair overlaps.
pub fn test_collision(id_a: BodyId, a: &Body, id_b: BodyId, b: &Body) -> Option<Manifold> {
    match (is_circle(&a.shape), is_circle(&b.shape)) {
        (true, true) => circle_vs_circle(id_a, a, id_b, b),
        (true, false) => polygon_vs_circle(id_b, b, id_a, a),
        (false, true) => polygon_vs_circle(id_a, a, id_b, b),
        (false, false) => polygon_vs_polygon(id_a, a, id_b, b),
    }
}

fn circle_radius(shape: &Shape) -> f32 {
    match shape {
        Shape::Circle { radius } => *radius,
        _ => 0.0,
    }
}

fn circle_vs_circle(id_a: BodyId, a: &Body, id_b: BodyId, b: &Body) -> Option<Manifold> {
    let ra = circle_radius(&a.shape);
    let rb = circle_radius(&b.shape);
    let n = b.center - a.center;
    let sum_r = ra + rb;
    if n.length_sq() > sum_r * sum_r {
        return None;
    }
    let dist = n.length();
    let normal = n.normalized_or(Vec2::new(1.0, 0.0));
    let penetration = sum_r - dist;
    let point = a.center + normal * ra + (b.center - normal * rb);
    let point = point * 0.5;
    Some(Manifold {
        a: id_a,
        b: id_b,
        normal,
        penetration,
        point,
    })
}

/// `poly` is always treated as the canonical `a`, `circle` as `b`.
fn polygon_vs_circle(poly_id: BodyId, poly: &Body, circle_id: BodyId, circle: &Body) -> Option<Manifold> {
    let radius = circle_radius(&circle.shape);
    let verts = poly.shape.world_vertices(poly.center, poly.angle);
    if verts.len() < 3 {
        return None;
    }

    let n = verts.len();
    let mut closest_dist_sq = f32::MAX;
    let mut closest_point = verts[0];
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        let c = closest_point_on_segment(circle.center, a, b);
        let d2 = (circle.center - c).length_sq();
        if d2 < closest_dist_sq {
            closest_dist_sq = d2;
            closest_point = c;
        }
    }

    let inside = point_in_polygon(circle.center, &verts);
    let dist = closest_dist_sq.sqrt();

    if !inside && dist >= radius {
        return None;
    }

    let (normal, penetration) = if inside {
        let normal = (circle.center - closest_point).normalized_or(Vec2::new(1.0, 0.0));
        (normal, radius + dist)
    } else {
        let normal = (circle.center - closest_point).normalized_or(Vec2::new(1.0, 0.0));
        (normal, radius - dist)
    };

    Some(Manifold {
        a: poly_id,
        b: circle_id,
        normal,
        penetration,
        point: closest_point,
    })
}

fn edge_normals(verts: &[Vec2]) -> Vec<Vec2> {
    let n = verts.len();
    let mut normals = Vec::with_capacity(n);
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        let edge = b - a;
        if edge.length_sq() > EPSILON {
            // outward perpendicular for a CCW-wound polygon
            normals.push(Vec2::new(edge.y, -edge.x).normalized());
        }
    }
    normals
}

fn project(verts: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in verts {
        let p = v.dot(axis);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

fn furthest_along(verts: &[Vec2], axis: Vec2) -> Vec2 {
    let mut best = verts[0];
    let mut best_dot = best.dot(axis);
    for &v in &verts[1..] {
        let d = v.dot(axis);
        if d > best_dot {
            best_dot = d;
            best = v;
        }
    }
    best
}

fn polygon_vs_polygon(id_a: BodyId, a: &Body, id_b: BodyId, b: &Body) -> Option<Manifold> {
    let verts_a = a.shape.world_vertices(a.center, a.angle);
    let verts_b = b.shape.world_vertices(b.center, b.angle);
    if verts_a.len() < 3 || verts_b.len() < 3 {
        return None;
    }

    let mut min_overlap = f32::MAX;
    let mut min_axis = Vec2::new(1.0, 0.0);

    for axis in edge_normals(&verts_a).into_iter().chain(edge_normals(&verts_b)) {
        let (min_a, max_a) = project(&verts_a, axis);
        let (min_b, max_b) = project(&verts_b, axis);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            min_axis = axis;
        }
    }

    // Ensure normal points from a to b.
    let center_delta = b.center - a.center;
    if center_delta.dot(min_axis) < 0.0 {
        min_axis = -min_axis;
    }

    // Support-point midpoint: A's furthest vertex along the normal, B's
    // furthest along the negated normal, averaged.
    let support_a = furthest_along(&verts_a, min_axis);
    let support_b = furthest_along(&verts_b, -min_axis);
    let point = (support_a + support_b) * 0.5;

    Some(Manifold {
        a: id_a,
        b: id_b,
        normal: min_axis,
        penetration: min_overlap,
        point,
    })
}
