//! Weld and axis (revolute) constraints: positional + velocity-level anchor
//! correction, with configurable break detection.
//!
//! Grounded in the same anchor-rotation / lever-arm / effective-mass-matrix
//! shape used elsewhere for pairwise response, generalized here to a
//! point constraint (and, for welds, an additional relative-angle lock).

use crate::body::{Body, BodyId};
use crate::math::{normalize_angle, Vec2, EPSILON};

#[derive(Debug, Clone)]
pub struct WeldJoint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub initial_relative_angle: f32,
    pub can_break: bool,
    pub is_broken: bool,
    pub break_threshold: f32,
    /// Accumulated |positional + angular error| for the current full step;
    /// reset by the world at the start of each full step.
    pub accumulated_error: f32,
}

#[derive(Debug, Clone)]
pub struct AxisJoint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub can_break: bool,
    pub is_broken: bool,
    pub break_threshold: f32,
    pub accumulated_error: f32,
}

#[derive(Debug, Clone)]
pub enum Constraint {
    Weld(WeldJoint),
    Axis(AxisJoint),
}

impl Constraint {
    pub fn body_a(&self) -> BodyId {
        match self {
            Constraint::Weld(w) => w.body_a,
            Constraint::Axis(a) => a.body_a,
        }
    }

    pub fn body_b(&self) -> BodyId {
        match self {
            Constraint::Weld(w) => w.body_b,
            Constraint::Axis(a) => a.body_b,
        }
    }

    pub fn is_broken(&self) -> bool {
        match self {
            Constraint::Weld(w) => w.is_broken,
            Constraint::Axis(a) => a.is_broken,
        }
    }

    pub fn reset_break_accumulator(&mut self) {
        match self {
            Constraint::Weld(w) => w.accumulated_error = 0.0,
            Constraint::Axis(a) => a.accumulated_error = 0.0,
        }
    }
}

fn world_anchor(body: &Body, local_anchor: Vec2) -> Vec2 {
    body.center + local_anchor.rotated(body.angle)
}

/// Solves a 2x2 point-to-point velocity constraint (zero relative velocity
/// at the anchors), applying the resulting impulse to both bodies.
fn solve_anchor_velocity(a: &mut Body, b: &mut Body, anchor: Vec2) {
    let ra = anchor - a.center;
    let rb = anchor - b.center;

    let v_rel = (b.velocity + Vec2::cross_scalar(b.angular_velocity, rb))
        - (a.velocity + Vec2::cross_scalar(a.angular_velocity, ra));

    let inv_ma = a.inv_mass();
    let inv_mb = b.inv_mass();
    let inv_ia = a.inv_inertia();
    let inv_ib = b.inv_inertia();

    // K = [[k11, k12], [k12, k22]]
    let k11 = inv_ma + inv_mb + inv_ia * ra.y * ra.y + inv_ib * rb.y * rb.y;
    let k12 = -inv_ia * ra.x * ra.y - inv_ib * rb.x * rb.y;
    let k22 = inv_ma + inv_mb + inv_ia * ra.x * ra.x + inv_ib * rb.x * rb.x;

    let det = k11 * k22 - k12 * k12;
    if det.abs() < EPSILON {
        return;
    }
    let inv_det = 1.0 / det;

    // impulse = -K^-1 * v_rel
    let impulse = Vec2::new(
        -(k22 * v_rel.x - k12 * v_rel.y) * inv_det,
        -(k11 * v_rel.y - k12 * v_rel.x) * inv_det,
    );

    a.velocity -= impulse * inv_ma;
    a.angular_velocity -= ra.cross(impulse) * inv_ia;
    b.velocity += impulse * inv_mb;
    b.angular_velocity += rb.cross(impulse) * inv_ib;
}

fn solve_relative_angular_velocity(a: &mut Body, b: &mut Body) {
    let inv_ia = a.inv_inertia();
    let inv_ib = b.inv_inertia();
    let k = inv_ia + inv_ib;
    if k < EPSILON {
        return;
    }
    let rel_w = b.angular_velocity - a.angular_velocity;
    let impulse = -rel_w / k;
    a.angular_velocity -= impulse * inv_ia;
    b.angular_velocity += impulse * inv_ib;
}

/// Positional anchor-coincidence correction shared by weld and axis joints.
/// Returns the positional error magnitude before correction.
fn solve_anchor_position(a: &mut Body, b: &mut Body, local_anchor_a: Vec2, local_anchor_b: Vec2) -> f32 {
    let wa = world_anchor(a, local_anchor_a);
    let wb = world_anchor(b, local_anchor_b);
    let error = wb - wa;

    let inv_ma = a.inv_mass();
    let inv_mb = b.inv_mass();
    let inv_sum = inv_ma + inv_mb;
    if inv_sum > EPSILON {
        a.center -= error * (inv_ma / inv_sum);
        b.center += error * (inv_mb / inv_sum);
        a.refresh_aabb();
        b.refresh_aabb();
    }
    error.length()
}

/// Relative-angle correction for weld joints. Returns the angular error
/// magnitude before correction.
fn solve_relative_angle(a: &mut Body, b: &mut Body, initial_relative_angle: f32) -> f32 {
    let angular_error = normalize_angle((b.angle - a.angle) - initial_relative_angle);
    let inv_ia = a.inv_inertia();
    let inv_ib = b.inv_inertia();
    let inv_sum = inv_ia + inv_ib;
    if inv_sum > EPSILON {
        a.angle -= angular_error * (inv_ia / inv_sum);
        b.angle += angular_error * (inv_ib / inv_sum);
        a.refresh_aabb();
        b.refresh_aabb();
    }
    angular_error.abs()
}

/// Solves one constraint for the current substep: velocity-level anchor
/// (and, for welds, relative-angular-velocity) correction followed by
/// positional correction. Returns the total error magnitude accumulated
/// this call, for break-threshold bookkeeping.
pub fn solve(a: &mut Body, b: &mut Body, constraint: &mut Constraint) -> f32 {
    match constraint {
        Constraint::Weld(w) => {
            let anchor_mid = {
                let wa = world_anchor(a, w.local_anchor_a);
                let wb = world_anchor(b, w.local_anchor_b);
                (wa + wb) * 0.5
            };
            solve_anchor_velocity(a, b, anchor_mid);
            solve_relative_angular_velocity(a, b);
            let pos_error = solve_anchor_position(a, b, w.local_anchor_a, w.local_anchor_b);
            let ang_error = solve_relative_angle(a, b, w.initial_relative_angle);
            let total = pos_error + ang_error;
            w.accumulated_error += total;
            if w.can_break && w.accumulated_error > w.break_threshold {
                w.is_broken = true;
            }
            total
        }
        Constraint::Axis(j) => {
            let anchor_mid = {
                let wa = world_anchor(a, j.local_anchor_a);
                let wb = world_anchor(b, j.local_anchor_b);
                (wa + wb) * 0.5
            };
            solve_anchor_velocity(a, b, anchor_mid);
            let pos_error = solve_anchor_position(a, b, j.local_anchor_a, j.local_anchor_b);
            j.accumulated_error += pos_error;
            if j.can_break && j.accumulated_error > j.break_threshold {
                j.is_broken = true;
            }
            pos_error
        }
    }
}
