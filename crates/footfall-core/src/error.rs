use thiserror::Error;

/// Top-level error type for footfall.
#[derive(Debug, Error)]
pub enum FootfallError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Contact error: {0}")]
    Contact(#[from] ContactError),

    #[error("Kinematics error: {0}")]
    Kinematics(#[from] KinematicsError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid time_step: {0} (must be > 0)")]
    InvalidTimeStep(f64),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors raised while generating or maintaining contacts.
///
/// These are configuration problems surfaced at call time. Infeasible
/// projections and unstable candidates are not errors; they are reported
/// in-band through `ProjectionReport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("No aff objects found for limb {0}")]
    NoAffordanceObjects(String),

    #[error("Unknown limb: {0}")]
    UnknownLimb(String),

    #[error("Unknown limb group: {0}")]
    UnknownGroup(String),

    #[error("Configuration size mismatch: expected {expected}, got {got}")]
    ConfigurationSize { expected: usize, got: usize },

    #[error("Degenerate affordance surface: {0}")]
    DegenerateSurface(String),
}

/// Kinematic model construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    #[error("Joint {joint} has inverted limits: [{lower}, {upper}]")]
    InvalidJointLimits { joint: String, lower: f64, upper: f64 },

    #[error("Joint block [{start}, {end}) does not fit a configuration of size {size}")]
    JointBlockOutOfRange { start: usize, end: usize, size: usize },

    #[error("Extra configuration dimension {0} is too small (need at least 6)")]
    ExtraConfigTooSmall(usize),

    #[error("Duplicate limb name: {0}")]
    DuplicateLimb(String),
}
