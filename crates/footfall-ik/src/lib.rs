//! Inverse kinematics and constraint projection for footfall robots.
//!
//! Provides forward kinematics, geometric Jacobians and Damped Least Squares
//! (Levenberg-Marquardt) IK for limb chains, plus the configuration layout of
//! a floating-base robot ([`Device`]) and the [`Projector`] that locks the
//! root and pins effectors onto contact targets.
//!
//! # Architecture
//!
//! ```text
//! Device ──► root lock ──┐
//!                        ├──► Projector ──► (success, configuration)
//! KinematicChain ──► DlsSolver (one per pinned limb)
//! ```
//!
//! Chains are expressed in the robot root frame. The projector moves each
//! world-frame target into that frame before solving, so with the root
//! locked every limb is solved independently.

pub mod chain;
pub mod device;
pub mod projector;
pub mod solver;

pub use chain::{ChainJoint, KinematicChain};
pub use device::{ConfigurationScope, Device, ROOT_CONFIG_DIM};
pub use projector::{Constraints, EffectorPin, Projector, RootLock};
pub use solver::{DlsConfig, DlsSolver, IkResult, IkTarget};
