//! Rigid body state: pose, motion, inertial properties, sleep and contact
//! caches. Bodies live in an arena owned by [`crate::world::World`] and are
//! referenced everywhere else by [`BodyId`], a generational slotmap key —
//! this sidesteps the ABA problem a hand-rolled `Vec<Option<T>>` free-list
//! has when an id is reused after removal.

use std::collections::{HashMap, HashSet};

use slotmap::new_key_type;

use crate::error::{PhysicsError, Result};
use crate::math::{Aabb, Vec2};
use crate::shapes::Shape;

new_key_type! {
    pub struct BodyId;
    pub struct ConstraintId;
}

/// Mass at or above this value is treated as infinite (`inv_mass = 0`) for
/// solver purposes.
pub const INFINITE_MASS: f32 = 1e6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.3,
            friction: 0.5,
        }
    }
}

impl Material {
    pub fn clamped(self) -> Material {
        Material {
            restitution: self.restitution.clamp(0.0, 1.0),
            friction: self.friction.clamp(0.0, 1.0),
        }
    }
}

/// A recorded contact against one other body, cached on each body so the
/// world can diff `contacts_current` against `contacts_previous` at the end
/// of a full step to emit `contact_added` / `contact_removed` events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedContact {
    pub point: Vec2,
    /// Normal pointing from this body toward the other body.
    pub normal: Vec2,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub shape: Shape,

    pub center: Vec2,
    pub angle: f32,
    pub center_prev: Vec2,

    pub velocity: Vec2,
    pub angular_velocity: f32,

    mass: f32,
    inv_mass: f32,
    inertia: f32,
    inv_inertia: f32,

    pub material: Material,

    pub locked: bool,
    pub can_rotate: bool,
    pub can_sleep: bool,
    pub sleeping: bool,
    pub sleep_timer: f32,

    pub aabb: Aabb,

    pub contacts_current: HashMap<BodyId, CachedContact>,
    pub contacts_previous: HashMap<BodyId, CachedContact>,

    pub connected_objects: HashSet<BodyId>,
    pub constraints: Vec<ConstraintId>,
}

impl Body {
    /// Builds a new body. `mass == 0.0` defaults to the shape's area (a
    /// density-1 body); `locked` forces infinite effective mass regardless
    /// of the mass passed in (the mass is kept only for display/query
    /// purposes, per spec creation policy).
    pub fn new(
        shape: Shape,
        center: Vec2,
        angle: f32,
        mut mass: f32,
        locked: bool,
        material: Material,
    ) -> Result<Body> {
        if mass == 0.0 {
            mass = shape.area();
        }
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }

        let (inv_mass, inertia, inv_inertia) = if locked || mass >= INFINITE_MASS {
            (0.0, shape.inertia(mass), 0.0)
        } else {
            let inertia = shape.inertia(mass);
            if !inertia.is_finite() {
                return Err(PhysicsError::InvalidInertia(inertia));
            }
            let inv_inertia = if inertia > 0.0 { 1.0 / inertia } else { 0.0 };
            (1.0 / mass, inertia, inv_inertia)
        };
        if !inertia.is_finite() {
            return Err(PhysicsError::InvalidInertia(inertia));
        }

        let aabb = shape.aabb(center, angle);

        Ok(Body {
            shape,
            center,
            angle,
            center_prev: center,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            material: material.clamped(),
            locked,
            can_rotate: true,
            can_sleep: true,
            sleeping: false,
            sleep_timer: 0.0,
            aabb,
            contacts_current: HashMap::new(),
            contacts_previous: HashMap::new(),
            connected_objects: HashSet::new(),
            constraints: Vec::new(),
        })
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Locked bodies present `inv_mass == 0 && inv_inertia == 0` uniformly so
    /// response/solver math needs no special-casing beyond what the formulas
    /// already do for zero inverse mass.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        if locked {
            self.inv_mass = 0.0;
            self.inv_inertia = 0.0;
            self.velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.sleeping = false;
        } else {
            self.inv_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
            self.inv_inertia = if self.inertia > 0.0 {
                1.0 / self.inertia
            } else {
                0.0
            };
        }
    }

    pub fn refresh_aabb(&mut self) {
        self.aabb = self.shape.aabb(self.center, self.angle);
    }

    pub fn wake(&mut self) {
        if self.locked {
            return;
        }
        self.sleeping = false;
        self.sleep_timer = 0.0;
    }

    pub fn put_to_sleep(&mut self) {
        self.sleeping = true;
        self.velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
    }

    /// World-space lever arm from this body's center to a point.
    pub fn lever_arm(&self, point: Vec2) -> Vec2 {
        point - self.center
    }

    /// Linear velocity of a world point fixed to this rigid body.
    pub fn velocity_at(&self, point: Vec2) -> Vec2 {
        self.velocity + Vec2::cross_scalar(self.angular_velocity, self.lever_arm(point))
    }
}
