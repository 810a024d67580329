//! Local-space shape geometry: transformed vertices, AABB, inertia and
//! point-in-shape tests. A shape is immutable once a body is constructed
//! (per-body geometry never mutates in place; replacing it means replacing
//! the body).

use crate::error::{PhysicsError, Result};
use crate::math::{Aabb, Vec2, EPSILON};

/// A convex collision shape, tagged by variant. Dispatch everywhere is on
/// this tag — there is no trait-object polymorphism here, matching how the
/// rest of the engine treats shapes as plain sum-type data.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        radius: f32,
    },
    Box {
        width: f32,
        height: f32,
    },
    Polygon {
        /// Local-space vertices, centered at the polygon's own centroid,
        /// wound consistently (CCW in the engine's coordinate convention).
        local_vertices: Vec<Vec2>,
    },
}

impl Shape {
    pub fn circle(radius: f32) -> Result<Shape> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::InvalidGeometry);
        }
        Ok(Shape::Circle { radius })
    }

    pub fn rect(width: f32, height: f32) -> Result<Shape> {
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(PhysicsError::InvalidGeometry);
        }
        Ok(Shape::Box { width, height })
    }

    /// Builds a convex polygon, re-centering the supplied vertices on their
    /// own centroid and normalizing winding so the engine's inside/outside
    /// tests agree on orientation.
    pub fn polygon(vertices: Vec<Vec2>) -> Result<Shape> {
        if vertices.len() < 3 {
            return Err(PhysicsError::TooFewVertices(vertices.len()));
        }
        let area2 = signed_area_x2(&vertices);
        if area2.abs() < EPSILON {
            return Err(PhysicsError::InvalidGeometry);
        }
        let centroid = polygon_centroid(&vertices, area2);
        if !centroid.is_finite() {
            return Err(PhysicsError::InvalidGeometry);
        }
        let mut local: Vec<Vec2> = vertices.iter().map(|&v| v - centroid).collect();
        // Normalize to CCW winding (positive signed area) so every downstream
        // consumer can assume one orientation.
        if area2 < 0.0 {
            local.reverse();
        }
        if !is_convex(&local) {
            return Err(PhysicsError::InvalidGeometry);
        }
        Ok(Shape::Polygon {
            local_vertices: local,
        })
    }

    /// Width of the shape's local AABB at angle 0.
    pub fn width(&self) -> f32 {
        match self {
            Shape::Circle { radius } => radius * 2.0,
            Shape::Box { width, .. } => *width,
            Shape::Polygon { local_vertices } => {
                let (min, max) = local_extent_x(local_vertices);
                max - min
            }
        }
    }

    pub fn height(&self) -> f32 {
        match self {
            Shape::Circle { radius } => radius * 2.0,
            Shape::Box { height, .. } => *height,
            Shape::Polygon { local_vertices } => {
                let (min, max) = local_extent_y(local_vertices);
                max - min
            }
        }
    }

    pub fn area(&self) -> f32 {
        match self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Box { width, height } => width * height,
            Shape::Polygon { local_vertices } => signed_area_x2(local_vertices).abs() * 0.5,
        }
    }

    /// Moment of inertia about the centroid for the given mass. Invariant
    /// under rigid transform — local-space geometry only.
    pub fn inertia(&self, mass: f32) -> f32 {
        match self {
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
            Shape::Box { width, height } => mass * (width * width + height * height) / 12.0,
            Shape::Polygon { local_vertices } => polygon_inertia(local_vertices, mass),
        }
    }

    /// Local-space vertices used for SAT and for visualization. Circles are
    /// approximated by `8 * max(1, radius / 20)` evenly spaced perimeter
    /// points so every shape can be treated uniformly where that's useful;
    /// circle-circle and circle-polygon narrow phase still use the exact
    /// analytic tests, not this approximation.
    pub fn local_vertices(&self) -> Vec<Vec2> {
        match self {
            Shape::Circle { radius } => {
                let n = (8.0 * (radius / 20.0).max(1.0)).round() as usize;
                (0..n)
                    .map(|i| {
                        let t = (i as f32 / n as f32) * std::f32::consts::TAU;
                        Vec2::new(radius * t.cos(), radius * t.sin())
                    })
                    .collect()
            }
            Shape::Box { width, height } => {
                let hw = width * 0.5;
                let hh = height * 0.5;
                vec![
                    Vec2::new(-hw, -hh),
                    Vec2::new(hw, -hh),
                    Vec2::new(hw, hh),
                    Vec2::new(-hw, hh),
                ]
            }
            Shape::Polygon { local_vertices } => local_vertices.clone(),
        }
    }

    /// Transforms local vertices into world space for a given pose. Circles
    /// return their approximated perimeter ring.
    pub fn world_vertices(&self, center: Vec2, angle: f32) -> Vec<Vec2> {
        self.local_vertices()
            .into_iter()
            .map(|v| center + v.rotated(angle))
            .collect()
    }

    pub fn aabb(&self, center: Vec2, angle: f32) -> Aabb {
        match self {
            Shape::Circle { radius } => {
                Aabb::from_center_half_extents(center, Vec2::new(*radius, *radius))
            }
            Shape::Box { width, height } => {
                let hw = width * 0.5;
                let hh = height * 0.5;
                if angle.abs() < EPSILON {
                    Aabb::from_center_half_extents(center, Vec2::new(hw, hh))
                } else {
                    let (s, c) = angle.sin_cos();
                    let ex = hw * c.abs() + hh * s.abs();
                    let ey = hw * s.abs() + hh * c.abs();
                    Aabb::from_center_half_extents(center, Vec2::new(ex, ey))
                }
            }
            Shape::Polygon { local_vertices } => {
                let mut min = Vec2::new(f32::MAX, f32::MAX);
                let mut max = Vec2::new(f32::MIN, f32::MIN);
                for &v in local_vertices {
                    let w = center + v.rotated(angle);
                    min = min.min(w);
                    max = max.max(w);
                }
                Aabb::new(min, max)
            }
        }
    }

    pub fn contains_point(&self, center: Vec2, angle: f32, point: Vec2) -> bool {
        match self {
            Shape::Circle { radius } => (point - center).length_sq() <= radius * radius,
            Shape::Box { .. } | Shape::Polygon { .. } => {
                let verts = self.world_vertices(center, angle);
                point_in_polygon(point, &verts)
            }
        }
    }
}

fn local_extent_x(vertices: &[Vec2]) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for v in vertices {
        min = min.min(v.x);
        max = max.max(v.x);
    }
    (min, max)
}

fn local_extent_y(vertices: &[Vec2]) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for v in vertices {
        min = min.min(v.y);
        max = max.max(v.y);
    }
    (min, max)
}

/// Twice the signed area (shoelace formula); positive for CCW winding.
pub fn signed_area_x2(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        sum += a.cross(b);
    }
    sum
}

pub fn polygon_centroid(vertices: &[Vec2], area2: f32) -> Vec2 {
    if area2.abs() < EPSILON {
        let n = vertices.len() as f32;
        let sum = vertices.iter().fold(Vec2::ZERO, |acc, &v| acc + v);
        return sum * (1.0 / n);
    }
    let n = vertices.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let cross = a.cross(b);
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    let factor = 1.0 / (3.0 * area2);
    Vec2::new(cx * factor, cy * factor)
}

/// Standard polygon second-moment-of-area formula, scaled by mass / area so
/// the result is a mass-moment of inertia about the centroid.
pub fn polygon_inertia(vertices: &[Vec2], mass: f32) -> f32 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut numerator = 0.0f32;
    let mut denominator = 0.0f32;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let cross = a.cross(b).abs();
        numerator += cross * (a.dot(a) + a.dot(b) + b.dot(b));
        denominator += cross;
    }
    if denominator < EPSILON {
        return 0.0;
    }
    mass * numerator / (6.0 * denominator)
}

/// Checks that a CCW-wound simple polygon is convex (every turn is a left turn).
fn is_convex(vertices: &[Vec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let c = vertices[(i + 2) % n];
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

pub fn point_in_polygon(p: Vec2, verts: &[Vec2]) -> bool {
    let n = verts.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = verts[i];
        let vj = verts[j];
        if ((vi.y > p.y) != (vj.y > p.y))
            && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
