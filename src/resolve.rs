//! Collision response: normal impulse, Coulomb friction, and Baumgarte-style
//! linear + angular positional correction. One pass per contact per substep
//! — there is no warm-started accumulated-impulse solver here, matching the
//! single-point-manifold, no-cross-tick-caching design.

use crate::body::Body;
use crate::math::{Vec2, EPSILON};
use crate::narrowphase::Manifold;

#[derive(Debug, Clone, Copy)]
pub struct ResolveConfig {
    pub slop: f32,
    pub percent: f32,
    pub angular_percent: f32,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            slop: 0.05,
            percent: 0.6,
            angular_percent: 0.01,
        }
    }
}

/// Resolves one contact in place. Returns the estimated impulse
/// (`penetration * |relative normal velocity|`) used by the caller to decide
/// whether to wake sleeping participants.
pub fn resolve_contact(a: &mut Body, b: &mut Body, manifold: &Manifold, config: &ResolveConfig) -> f32 {
    let normal = manifold.normal;
    let ra = manifold.point - a.center;
    let rb = manifold.point - b.center;

    let rel_vel = |a: &Body, b: &Body| -> Vec2 {
        (b.velocity + Vec2::cross_scalar(b.angular_velocity, rb))
            - (a.velocity + Vec2::cross_scalar(a.angular_velocity, ra))
    };

    let v_rel = rel_vel(a, b);
    let vn = v_rel.dot(normal);
    let estimated_impulse = manifold.penetration * vn.abs();

    if vn <= 0.0 {
        let ra_cross_n = ra.cross(normal);
        let rb_cross_n = rb.cross(normal);
        let k = a.inv_mass()
            + b.inv_mass()
            + ra_cross_n * ra_cross_n * a.inv_inertia()
            + rb_cross_n * rb_cross_n * b.inv_inertia();

        if k > EPSILON {
            let e = a.material.restitution.min(b.material.restitution);
            let j = -(1.0 + e) * vn / k;
            let impulse = normal * j;

            a.velocity -= impulse * a.inv_mass();
            a.angular_velocity -= ra.cross(impulse) * a.inv_inertia();
            b.velocity += impulse * b.inv_mass();
            b.angular_velocity += rb.cross(impulse) * b.inv_inertia();

            // Friction tangent and magnitude both come from the same vRel
            // used for the normal impulse above, per the spec's formula.
            let t_raw = v_rel - normal * vn;
            let tangent = t_raw.normalized_or(normal.perp());

            let ra_cross_t = ra.cross(tangent);
            let rb_cross_t = rb.cross(tangent);
            let kt = a.inv_mass()
                + b.inv_mass()
                + ra_cross_t * ra_cross_t * a.inv_inertia()
                + rb_cross_t * rb_cross_t * b.inv_inertia();

            if kt > EPSILON {
                let vt = v_rel.dot(tangent);
                let mut jt = -vt / kt;
                let mu = a.material.friction.max(b.material.friction);
                let max_friction = mu * j.abs();
                jt = jt.clamp(-max_friction, max_friction);

                let friction_impulse = tangent * jt;
                a.velocity -= friction_impulse * a.inv_mass();
                a.angular_velocity -= ra.cross(friction_impulse) * a.inv_inertia();
                b.velocity += friction_impulse * b.inv_mass();
                b.angular_velocity += rb.cross(friction_impulse) * b.inv_inertia();
            }
        }
    }

    positional_correction(a, b, manifold, config);
    angular_correction(a, ra, normal, manifold.penetration, config);
    angular_correction(b, rb, normal, manifold.penetration, config);

    estimated_impulse
}

fn positional_correction(a: &mut Body, b: &mut Body, manifold: &Manifold, config: &ResolveConfig) {
    let inv_mass_sum = a.inv_mass() + b.inv_mass();
    if inv_mass_sum < EPSILON {
        return;
    }
    let magnitude = (manifold.penetration - config.slop).max(0.0) / inv_mass_sum * config.percent;
    let correction = manifold.normal * magnitude;
    a.center -= correction * a.inv_mass();
    b.center += correction * b.inv_mass();
    a.refresh_aabb();
    b.refresh_aabb();
}

fn angular_correction(body: &mut Body, r: Vec2, normal: Vec2, penetration: f32, config: &ResolveConfig) {
    if body.locked || !body.can_rotate || body.inv_inertia() <= 0.0 {
        return;
    }
    let r_len = r.length();
    if r_len < EPSILON {
        return;
    }
    let sign = r.cross(normal).signum();
    body.angle += sign * config.angular_percent * penetration / r_len;
    body.refresh_aabb();
}
