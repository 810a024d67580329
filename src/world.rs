//! The simulation itself: fixed-timestep accumulator, substepping, and phase
//! ordering. `World` owns every body and constraint; external holders keep
//! [`BodyId`]/[`ConstraintId`] references but never get direct mutable
//! access outside the methods below.

use slotmap::SlotMap;

use crate::body::{Body, BodyId, CachedContact, ConstraintId, Material};
use crate::broadphase::SpatialHash;
use crate::compound::{ear_clip_triangulate, greedy_merge, plan_welds};
use crate::constraints::{self, AxisJoint, Constraint, WeldJoint};
use crate::error::{PhysicsError, Result};
use crate::events::{ContactEvent, ContactEventKind};
use crate::math::{normalize_angle, Vec2};
use crate::narrowphase::{test_collision, Manifold};
use crate::resolve::{resolve_contact, ResolveConfig};
use crate::shapes::{polygon_centroid, signed_area_x2, Shape};

/// Fixed substep timestep used by the tick algorithm, independent of the
/// caller's frame rate.
pub const FIXED_DT: f32 = 1.0 / 144.0;
/// Inner solver substeps per fixed step.
pub const SUBSTEPS: usize = 8;
/// Upper bound on the accumulator; beyond this, real time is dropped rather
/// than spiraling into an ever-growing catch-up loop.
pub const MAX_ACCUMULATOR: f32 = 0.1;
/// A body whose center leaves this range on either axis is enqueued for removal.
pub const OUT_OF_BOUNDS: f32 = 2000.0;
/// Multiplicative per-substep angular damping, mirroring the linear path's
/// per-second damping but applied as a flat decay factor (rotation has no
/// configurable friction term in the spec).
pub const ANGULAR_DAMPING: f32 = 0.999;
/// `angular_velocity` below this magnitude is snapped to zero after damping.
pub const ANGULAR_VELOCITY_CUTOFF: f32 = 1e-3;

#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    pub gravity: Vec2,
    pub gravity_scale: f32,
    /// Linear-damping-per-second applied to every awake dynamic body.
    pub friction: f32,
    pub time_scale: f32,
    pub is_paused: bool,
    pub spatial_hash_cell_size: f32,
    pub linear_sleep: f32,
    pub angular_sleep: f32,
    pub sleep_time: f32,
    pub wake_impulse: f32,
    pub resolve: ResolveConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 9.8),
            gravity_scale: 30.0,
            friction: 1.0,
            time_scale: 1.0,
            is_paused: false,
            spatial_hash_cell_size: 10.0,
            linear_sleep: 0.06,
            angular_sleep: 0.11,
            sleep_time: 0.9,
            wake_impulse: 4.0,
            resolve: ResolveConfig::default(),
        }
    }
}

/// A body whose gravitational pull the world sums into every other dynamic
/// body's integration step, alongside the uniform global gravity.
#[derive(Debug, Clone, Copy)]
struct GravitySource {
    body: BodyId,
    strength: f32,
}

pub struct World {
    bodies: SlotMap<BodyId, Body>,
    constraints: SlotMap<ConstraintId, Constraint>,
    broadphase: SpatialHash,
    config: WorldConfig,
    accumulator: f32,
    candidate_pairs: Vec<(BodyId, BodyId)>,
    events: Vec<ContactEvent>,
    removal_bodies: Vec<BodyId>,
    removal_constraints: Vec<ConstraintId>,
    gravity_sources: Vec<GravitySource>,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            constraints: SlotMap::with_key(),
            broadphase: SpatialHash::new(config.spatial_hash_cell_size),
            config,
            accumulator: 0.0,
            candidate_pairs: Vec::new(),
            events: Vec::new(),
            removal_bodies: Vec::new(),
            removal_constraints: Vec::new(),
            gravity_sources: Vec::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut WorldConfig {
        &mut self.config
    }

    // ---- creation -----------------------------------------------------

    pub fn add_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        mass: f32,
        locked: bool,
        material: Material,
    ) -> Result<BodyId> {
        let shape = Shape::circle(radius)?;
        self.insert_body(Body::new(shape, center, 0.0, mass, locked, material)?)
    }

    pub fn add_box(
        &mut self,
        center: Vec2,
        angle: f32,
        width: f32,
        height: f32,
        mass: f32,
        locked: bool,
        material: Material,
    ) -> Result<BodyId> {
        let shape = Shape::rect(width, height)?;
        self.insert_body(Body::new(shape, center, angle, mass, locked, material)?)
    }

    pub fn add_polygon(
        &mut self,
        center: Vec2,
        angle: f32,
        local_vertices: Vec<Vec2>,
        mass: f32,
        locked: bool,
        material: Material,
    ) -> Result<BodyId> {
        let shape = Shape::polygon(local_vertices)?;
        self.insert_body(Body::new(shape, center, angle, mass, locked, material)?)
    }

    fn insert_body(&mut self, body: Body) -> Result<BodyId> {
        Ok(self.bodies.insert(body))
    }

    /// Decomposes a concave polygon into convex children (ear-clip then
    /// greedy merge) and welds adjacent pieces along a minimum spanning
    /// connectivity. `local_vertices` are in the same local frame a regular
    /// polygon shape would use; `mass` of `0.0` splits area-proportionally
    /// across the pieces, matching the "defaults to shape area" policy for
    /// a single body.
    pub fn add_concave_polygon(
        &mut self,
        center: Vec2,
        angle: f32,
        local_vertices: Vec<Vec2>,
        mass: f32,
        locked: bool,
        material: Material,
    ) -> Result<(Vec<BodyId>, Vec<ConstraintId>)> {
        let world_vertices: Vec<Vec2> = local_vertices.iter().map(|&v| center + v.rotated(angle)).collect();
        let triangles = ear_clip_triangulate(&world_vertices)?;
        let pieces = greedy_merge(triangles.iter().map(|t| t.to_vec()).collect());

        let total_area: f32 = pieces.iter().map(|p| signed_area_x2(p).abs() * 0.5).sum();

        let mut body_ids = Vec::with_capacity(pieces.len());
        let mut centroids = Vec::with_capacity(pieces.len());

        for piece in &pieces {
            let area2 = signed_area_x2(piece);
            let centroid = polygon_centroid(piece, area2);
            let piece_area = area2.abs() * 0.5;
            let piece_mass = if mass == 0.0 {
                0.0
            } else if total_area > f32::EPSILON {
                mass * (piece_area / total_area)
            } else {
                0.0
            };

            let shape = Shape::polygon(piece.clone())?;
            let body = Body::new(shape, centroid, 0.0, piece_mass, locked, material)?;
            let id = self.bodies.insert(body);
            body_ids.push(id);
            centroids.push(centroid);
        }

        let plan = plan_welds(&pieces);
        let mut constraint_ids = Vec::with_capacity(plan.len());
        for entry in plan {
            let id_a = body_ids[entry.piece_a];
            let id_b = body_ids[entry.piece_b];
            let local_anchor_a = entry.anchor - centroids[entry.piece_a];
            let local_anchor_b = entry.anchor - centroids[entry.piece_b];
            let cid = self.add_weld(id_a, id_b, local_anchor_a, local_anchor_b, false, f32::INFINITY)?;
            constraint_ids.push(cid);
        }

        Ok((body_ids, constraint_ids))
    }

    // ---- constraints ----------------------------------------------------

    pub fn add_weld(
        &mut self,
        body_a: BodyId,
        body_b: BodyId,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        can_break: bool,
        break_threshold: f32,
    ) -> Result<ConstraintId> {
        let initial_relative_angle = {
            let a = self.bodies.get(body_a).ok_or(PhysicsError::DanglingConstraintBody)?;
            let b = self.bodies.get(body_b).ok_or(PhysicsError::DanglingConstraintBody)?;
            normalize_angle(b.angle - a.angle)
        };
        let joint = Constraint::Weld(WeldJoint {
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            initial_relative_angle,
            can_break,
            is_broken: false,
            break_threshold,
            accumulated_error: 0.0,
        });
        self.insert_constraint(body_a, body_b, joint)
    }

    pub fn add_axis(
        &mut self,
        body_a: BodyId,
        body_b: BodyId,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        can_break: bool,
        break_threshold: f32,
    ) -> Result<ConstraintId> {
        let joint = Constraint::Axis(AxisJoint {
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            can_break,
            is_broken: false,
            break_threshold,
            accumulated_error: 0.0,
        });
        self.insert_constraint(body_a, body_b, joint)
    }

    fn insert_constraint(&mut self, body_a: BodyId, body_b: BodyId, joint: Constraint) -> Result<ConstraintId> {
        if body_a == body_b {
            return Err(PhysicsError::DuplicateConstraintBody);
        }
        if !self.bodies.contains_key(body_a) || !self.bodies.contains_key(body_b) {
            return Err(PhysicsError::DanglingConstraintBody);
        }
        let id = self.constraints.insert(joint);

        if let Some(a) = self.bodies.get_mut(body_a) {
            a.connected_objects.insert(body_b);
            a.constraints.push(id);
            a.can_sleep = false;
        }
        if let Some(b) = self.bodies.get_mut(body_b) {
            b.connected_objects.insert(body_a);
            b.constraints.push(id);
            b.can_sleep = false;
        }
        Ok(id)
    }

    /// Registers `body` as a source of point gravity, pulling every other
    /// dynamic body toward it with the given strength.
    pub fn add_gravity_source(&mut self, body: BodyId, strength: f32) {
        self.gravity_sources.push(GravitySource { body, strength });
    }

    // ---- queries / mutation --------------------------------------------

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter()
    }

    /// First body (by storage iteration order) whose shape contains `point`.
    pub fn pick(&self, point: Vec2) -> Option<BodyId> {
        self.bodies
            .iter()
            .find(|(_, b)| b.shape.contains_point(b.center, b.angle, point))
            .map(|(id, _)| id)
    }

    /// Velocity-based soft grab: sets the body's velocity toward `point`
    /// and wakes it. No joint is created.
    pub fn grab(&mut self, id: BodyId, point: Vec2) {
        if let Some(body) = self.bodies.get_mut(id) {
            if body.locked {
                return;
            }
            body.velocity = (body.center - point) * -10.0;
            body.wake();
        }
    }

    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(id) {
            if !body.locked {
                body.velocity = velocity;
                body.wake();
            }
        }
    }

    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vec2, point: Vec2) {
        if let Some(body) = self.bodies.get_mut(id) {
            if body.locked {
                return;
            }
            let r = body.lever_arm(point);
            body.velocity += impulse * body.inv_mass();
            body.angular_velocity += r.cross(impulse) * body.inv_inertia();
            body.wake();
        }
    }

    pub fn set_locked(&mut self, id: BodyId, locked: bool) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.set_locked(locked);
        }
    }

    pub fn wake(&mut self, id: BodyId) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.wake();
        }
    }

    pub fn enqueue_removal(&mut self, id: BodyId) {
        self.removal_bodies.push(id);
    }

    pub fn drain_events(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- tick -------------------------------------------------------------

    /// Advances the simulation by `elapsed` seconds of real time. A no-op if
    /// paused; otherwise accumulates `elapsed * time_scale` (clamped) and
    /// runs as many fixed substeps as have accrued, each bracketed by a
    /// broad phase pass and a removal drain.
    pub fn tick(&mut self, elapsed: f32) {
        if self.config.is_paused {
            return;
        }

        let time_scale = self.config.time_scale.clamp(0.1, 2.0);
        self.accumulator += elapsed * time_scale;
        if self.accumulator > MAX_ACCUMULATOR {
            self.accumulator = MAX_ACCUMULATOR;
        }

        while self.accumulator >= FIXED_DT {
            self.broad_phase_generate_pairs();
            self.update_physics(FIXED_DT);
            self.process_removal_queue();
            self.accumulator -= FIXED_DT;
        }
    }

    fn broad_phase_generate_pairs(&mut self) {
        self.broadphase.set_cell_size(self.config.spatial_hash_cell_size);
        self.broadphase.clear();
        for (id, body) in self.bodies.iter() {
            self.broadphase.insert(id, &body.aabb);
        }

        self.candidate_pairs.clear();
        for &(a, b) in self.broadphase.pairs() {
            let (Some(ba), Some(bb)) = (self.bodies.get(a), self.bodies.get(b)) else {
                continue;
            };
            let both_sleeping = ba.sleeping && bb.sleeping;
            let connected = ba.connected_objects.contains(&b);
            if !both_sleeping && !connected {
                self.candidate_pairs.push((a, b));
            }
        }
    }

    fn update_physics(&mut self, dt: f32) {
        let sub_dt = dt / SUBSTEPS as f32;

        for constraint in self.constraints.values_mut() {
            constraint.reset_break_accumulator();
        }

        for substep in 0..SUBSTEPS {
            let is_final = substep == SUBSTEPS - 1;

            let mut manifolds: Vec<Manifold> = Vec::with_capacity(self.candidate_pairs.len());
            for &(a, b) in &self.candidate_pairs {
                if let (Some(ba), Some(bb)) = (self.bodies.get(a), self.bodies.get(b)) {
                    if let Some(m) = test_collision(a, ba, b, bb) {
                        manifolds.push(m);
                    }
                }
            }

            for manifold in &manifolds {
                let impulse = {
                    let Some([a, b]) = self.bodies.get_disjoint_mut([manifold.a, manifold.b]) else {
                        continue;
                    };
                    resolve_contact(a, b, manifold, &self.config.resolve)
                };

                if impulse > self.config.wake_impulse {
                    if let Some(a) = self.bodies.get_mut(manifold.a) {
                        if !a.locked {
                            a.wake();
                        }
                    }
                    if let Some(b) = self.bodies.get_mut(manifold.b) {
                        if !b.locked {
                            b.wake();
                        }
                    }
                }

                if is_final {
                    record_contact(&mut self.bodies, manifold.a, manifold.b, manifold.point, manifold.normal);
                }
            }

            let broken = self.solve_constraints();
            self.integrate(sub_dt);

            for id in broken {
                self.removal_constraints.push(id);
            }
        }

        self.update_sleep(dt);
        self.emit_contact_events();
    }

    fn solve_constraints(&mut self) -> Vec<ConstraintId> {
        let mut broken = Vec::new();
        let ids: Vec<ConstraintId> = self.constraints.keys().collect();
        for id in ids {
            let (body_a, body_b) = {
                let Some(c) = self.constraints.get(id) else { continue };
                (c.body_a(), c.body_b())
            };
            let Some([a, b]) = self.bodies.get_disjoint_mut([body_a, body_b]) else {
                continue;
            };
            let Some(constraint) = self.constraints.get_mut(id) else {
                continue;
            };
            constraints::solve(a, b, constraint);
            if constraint.is_broken() {
                broken.push(id);
            }
        }
        broken
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.config.gravity * self.config.gravity_scale;
        let sources = self.gravity_sources.clone();
        let friction = self.config.friction;

        let source_positions: Vec<(BodyId, Vec2, f32)> = sources
            .iter()
            .filter_map(|s| self.bodies.get(s.body).map(|b| (s.body, b.center, s.strength)))
            .collect();

        for (id, body) in self.bodies.iter_mut() {
            if body.locked || body.sleeping {
                continue;
            }

            let mut accel = gravity;
            for &(source_id, pos, strength) in &source_positions {
                if source_id == id {
                    continue;
                }
                let delta = pos - body.center;
                let dist_sq = delta.length_sq().max(1.0);
                accel += delta.normalized() * (strength / dist_sq);
            }
            body.velocity += accel * dt;

            let damp = |v: f32| -> f32 {
                let d = v.signum() * friction * dt;
                if v.abs() <= d.abs() {
                    0.0
                } else {
                    v - d
                }
            };
            body.velocity.x = damp(body.velocity.x);
            body.velocity.y = damp(body.velocity.y);

            body.center += body.velocity * dt;

            if body.can_rotate {
                body.angle += body.angular_velocity * dt;
                body.angular_velocity *= ANGULAR_DAMPING;
                if body.angular_velocity.abs() < ANGULAR_VELOCITY_CUTOFF {
                    body.angular_velocity = 0.0;
                }
            }
            body.refresh_aabb();
        }

        for (id, body) in self.bodies.iter_mut() {
            if body.center.x.abs() > OUT_OF_BOUNDS || body.center.y.abs() > OUT_OF_BOUNDS {
                log::debug!("body {:?} left the simulation bounds, enqueuing removal", id);
                self.removal_bodies.push(id);
            }
        }
    }

    fn update_sleep(&mut self, dt: f32) {
        let linear_threshold_sq = self.config.linear_sleep * self.config.linear_sleep;
        let angular_threshold = self.config.angular_sleep;
        let sleep_time = self.config.sleep_time;

        for (_, body) in self.bodies.iter_mut() {
            if body.locked {
                continue;
            }
            let displacement = body.center - body.center_prev;
            if displacement.length_sq() < linear_threshold_sq
                && body.angular_velocity.abs() < angular_threshold
                && body.can_sleep
            {
                body.sleep_timer += dt;
                if body.sleep_timer >= sleep_time {
                    body.put_to_sleep();
                }
            } else {
                body.sleep_timer = 0.0;
            }
            body.center_prev = body.center;
        }
    }

    fn emit_contact_events(&mut self) {
        let ids: Vec<BodyId> = self.bodies.keys().collect();
        for id in ids {
            let (added, removed) = {
                let Some(body) = self.bodies.get(id) else { continue };
                let mut added = Vec::new();
                let mut removed = Vec::new();
                for (&other, contact) in &body.contacts_current {
                    if !body.contacts_previous.contains_key(&other) {
                        added.push((other, *contact));
                    }
                }
                for (&other, contact) in &body.contacts_previous {
                    if !body.contacts_current.contains_key(&other) {
                        removed.push((other, *contact));
                    }
                }
                (added, removed)
            };

            for (other, c) in added {
                self.events.push(ContactEvent {
                    kind: ContactEventKind::Added,
                    body: id,
                    other,
                    point: c.point,
                    normal: c.normal,
                });
            }
            for (other, c) in removed {
                self.events.push(ContactEvent {
                    kind: ContactEventKind::Removed,
                    body: id,
                    other,
                    point: c.point,
                    normal: c.normal,
                });
            }

            if let Some(body) = self.bodies.get_mut(id) {
                body.contacts_previous = std::mem::take(&mut body.contacts_current);
            }
        }
    }

    fn process_removal_queue(&mut self) {
        // Body removal cascades into every constraint on its list.
        let mut removed_bodies = self.removal_bodies.drain(..).collect::<Vec<_>>();
        removed_bodies.sort_unstable_by_key(|id| slotmap_ffi(*id));
        removed_bodies.dedup();

        for id in removed_bodies {
            let Some(body) = self.bodies.remove(id) else { continue };
            for cid in body.constraints {
                self.removal_constraints.push(cid);
            }
            self.gravity_sources.retain(|s| s.body != id);
        }

        let mut removed_constraints = self.removal_constraints.drain(..).collect::<Vec<_>>();
        removed_constraints.sort_unstable_by_key(|id| slotmap_ffi(*id));
        removed_constraints.dedup();

        for cid in removed_constraints {
            let Some(constraint) = self.constraints.remove(cid) else { continue };
            let (a, b) = (constraint.body_a(), constraint.body_b());
            if let Some(body) = self.bodies.get_mut(a) {
                body.connected_objects.remove(&b);
                body.constraints.retain(|&c| c != cid);
                if body.connected_objects.is_empty() {
                    body.can_sleep = true;
                }
            }
            if let Some(body) = self.bodies.get_mut(b) {
                body.connected_objects.remove(&a);
                body.constraints.retain(|&c| c != cid);
                if body.connected_objects.is_empty() {
                    body.can_sleep = true;
                }
            }
        }
    }
}

fn slotmap_ffi<K: slotmap::Key>(id: K) -> u64 {
    id.data().as_ffi()
}

fn record_contact(bodies: &mut SlotMap<BodyId, Body>, a: BodyId, b: BodyId, point: Vec2, normal: Vec2) {
    if let Some(body_a) = bodies.get_mut(a) {
        body_a.contacts_current.insert(b, CachedContact { point, normal });
    }
    if let Some(body_b) = bodies.get_mut(b) {
        body_b
            .contacts_current
            .insert(a, CachedContact { point, normal: -normal });
    }
}
