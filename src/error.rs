//! Creation-time error taxonomy.
//!
//! Runtime degeneracies (near-zero denominators in SAT, coincident circle
//! centers, bodies drifting out of bounds) are not represented here: they are
//! resolved locally by the solver and logged, never surfaced as an `Err`.

use thiserror::Error;

/// Errors returned when constructing shapes, bodies, or constraints.
///
/// `#[non_exhaustive]` so new rejection reasons can be added without a
/// breaking change for downstream `match` arms.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PhysicsError {
    #[error("polygon must have at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("polygon is not simple (edges self-intersect) or has zero area")]
    InvalidGeometry,

    #[error("constraint references the same body for both endpoints")]
    DuplicateConstraintBody,

    #[error("constraint references a body that no longer exists")]
    DanglingConstraintBody,

    #[error("mass must be finite and non-negative, got {0}")]
    InvalidMass(f32),

    #[error("inertia must be finite, got {0}")]
    InvalidInertia(f32),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
