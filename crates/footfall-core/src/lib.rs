// footfall-core: States, affordances, configuration and errors for whole-body contact planning.

pub mod affordance;
pub mod config;
pub mod error;
pub mod seed;
pub mod traits;
pub mod types;

pub use affordance::{Aabb, AffordanceFilter, AffordanceMap, Surface, objects_for_limb};
pub use config::{
    ContactGenConfig, InterpolationConfig, PlannerConfig, ProjectionConfig, StabilityConfig,
};
pub use error::{ConfigError, ContactError, FootfallError, KinematicsError};
pub use traits::{AlwaysValid, CollisionValidation, ValidationReport};
pub use types::{ProjectionReport, ProjectionStatus, State, StateFrame};
