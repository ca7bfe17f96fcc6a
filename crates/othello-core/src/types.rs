//! Common type aliases used throughout the engine.

/// Search depth in plies. Signed so that reductions may drive it below zero,
/// which hands the node over to quiescence search.
pub type Depth = i32;

/// Evaluation score from the side to move's point of view.
pub type Score = i32;
