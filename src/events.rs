//! Push-queue contact events.
//!
//! Rather than invoking subscriber code synchronously during narrow-phase
//! resolution, the world appends records here and callers drain the queue
//! between ticks. This keeps the single-threaded contract intact and rules
//! out observer re-entrancy into a world mid-tick.

use crate::body::BodyId;
use crate::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEventKind {
    Added,
    Removed,
}

/// A single contact transition, reported from one participant's perspective.
/// Because the underlying cache is symmetric, a pair transition produces one
/// event per participant (`body` / `other` swapped), matching the "per body"
/// event contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub kind: ContactEventKind,
    pub body: BodyId,
    pub other: BodyId,
    pub point: Vec2,
    pub normal: Vec2,
}
