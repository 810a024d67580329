//! Deterministic 2D rigid-body physics core.
//!
//! A fixed-timestep [`World`] owns bodies (`Circle`/`Box`/`Polygon`
//! [`Shape`]s) and weld/axis constraints in generational arenas, keyed by
//! [`BodyId`]/[`ConstraintId`]. Each call to [`World::tick`] accumulates
//! real time, then runs a broad phase (spatial hash) and `N` narrow-phase +
//! response + constraint-solve + integration substeps per fixed step.
//!
//! Concave polygons are not simulated directly: [`World::add_concave_polygon`]
//! decomposes one into convex, welded pieces.

pub mod body;
pub mod broadphase;
pub mod compound;
pub mod constraints;
pub mod error;
pub mod events;
pub mod math;
pub mod narrowphase;
pub mod resolve;
pub mod shapes;
pub mod world;

pub use body::{Body, BodyId, CachedContact, ConstraintId, Material, INFINITE_MASS};
pub use compound::{ear_clip_triangulate, greedy_merge, plan_welds, WeldPlanEntry};
pub use constraints::{AxisJoint, Constraint, WeldJoint};
pub use error::{PhysicsError, Result};
pub use events::{ContactEvent, ContactEventKind};
pub use math::{Aabb, Vec2};
pub use narrowphase::Manifold;
pub use resolve::ResolveConfig;
pub use shapes::Shape;
pub use world::{World, WorldConfig, FIXED_DT, MAX_ACCUMULATOR, OUT_OF_BOUNDS, SUBSTEPS};
