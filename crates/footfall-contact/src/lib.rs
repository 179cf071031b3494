//! Contact transitions of a legged robot.
//!
//! Given the previous [`State`](footfall_core::State) and a target whole-body
//! configuration, [`compute_contacts`] runs the three-stage cascade:
//!
//! 1. **maintain**: keep as many previous contacts as the projection allows,
//!    breaking the oldest first;
//! 2. **generate**: create contacts for free limbs from their precomputed
//!    samples until the state is stable;
//! 3. **reposition**: if still unstable, move one existing contact.
//!
//! The robot itself is a [`FullBody`], assembled once with
//! [`FullBodyBuilder`] and shared by reference.

pub mod collision;
pub mod compute;
pub mod fullbody;
pub mod generate;
pub mod helper;
pub mod limb;
pub mod maintain;
pub mod projection;
pub mod reposition;
pub mod sampling;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use collision::{CONTACT_TOLERANCE, Obstacle, ObstacleValidation};
pub use compute::{ContactReport, compute_contacts};
pub use fullbody::{FullBody, FullBodyBuilder};
pub use generate::{creation_plans, gen_contacts, generate_contact};
pub use helper::{ContactGenHelper, GenerationParams};
pub use limb::{Limb, LimbDescription};
pub use maintain::{maintain_combinatorial, maintain_contacts};
pub use projection::{
    project_sample_to_obstacle, project_to_root_configuration, project_to_root_position, set_collision_free,
};
pub use reposition::reposition_contacts;
pub use sampling::{ContactSampleDb, Heuristic, Sample, SampleReport, heuristic_score};
