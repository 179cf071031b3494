//! Static-balance test for whole-body contact states.
//!
//! The contact-wrench cone is spanned by friction-cone generators placed at
//! every contact point (four rectangle corners for planar feet, a single
//! point otherwise). A state is balanced when the gravito-inertial wrench,
//! taken about the centre of mass, lies inside that cone. The oracle solves
//! a small LP (Clarabel) for the largest uniform lower bound on generator
//! weights, which doubles as a signed robustness margin.
//!
//! 1. **Generators**: linearised friction cones at contact points
//! 2. **Oracle**: LP feasibility and margin of the balance wrench

pub mod generators;
pub mod oracle;

pub use generators::{ContactKind, ContactPatch, contact_generators, wrench_matrix};
pub use oracle::StabilityOracle;
