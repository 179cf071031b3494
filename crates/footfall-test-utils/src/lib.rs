//! Shared test fixtures and utilities for footfall crates.
//!
//! Provides a planar-foot quadruped, flat and split ground environments,
//! ready-made stances, mock collision validators and deterministic RNG
//! setup.

pub mod fixtures;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{
    LIMBS, flat_ground, quadruped, quadruped_builder, split_ground, stance_configuration, stance_state,
    standing_state, support_filter,
};
pub use mocks::RejectAll;
pub use rng::{deterministic_vec, seeded_rng};
