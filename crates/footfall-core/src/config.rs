use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_one() -> usize {
    1
}
const fn default_true() -> bool {
    true
}
const fn default_tolerance() -> f64 {
    1e-3
}
const fn default_max_iterations() -> u32 {
    40
}
const fn default_damping() -> f64 {
    0.01
}
const fn default_friction() -> f64 {
    0.5
}
const fn default_gravity() -> [f64; 3] {
    [0.0, 0.0, -9.81]
}
const fn default_time_step() -> f64 {
    0.1
}
const fn default_root_height_offset() -> f64 {
    0.1
}
const fn default_max_repositionings() -> usize {
    20
}
const fn default_max_recontacts() -> usize {
    2
}
const fn default_recontact_limit() -> usize {
    10
}

// ---------------------------------------------------------------------------
// ContactGenConfig
// ---------------------------------------------------------------------------

/// Behaviour of one contact-generation cascade.
///
/// Passed by value through maintain / generate / reposition. The generator
/// overrides `check_stability_generate` locally for all but the last limb of a
/// creation plan; the record itself is never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactGenConfig {
    /// Maximum number of previous contacts dropped in a single step.
    #[serde(default = "default_one")]
    pub max_contact_breaks: usize,

    /// Maximum number of contacts created in a single step.
    #[serde(default = "default_one")]
    pub max_contact_creations: usize,

    /// Search for a stable subset of maintained contacts.
    #[serde(default)]
    pub check_stability_maintain: bool,

    /// Require created contacts to yield a stable state.
    #[serde(default = "default_true")]
    pub check_stability_generate: bool,

    /// Keep the most robust unstable contact when no stable one exists.
    #[serde(default)]
    pub contact_if_fails: bool,

    /// Require stability even when the state holds a single contact.
    #[serde(default)]
    pub stable_for_one_contact: bool,
}

impl Default for ContactGenConfig {
    fn default() -> Self {
        Self {
            max_contact_breaks: 1,
            max_contact_creations: 1,
            check_stability_maintain: false,
            check_stability_generate: true,
            contact_if_fails: false,
            stable_for_one_contact: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectionConfig
// ---------------------------------------------------------------------------

/// Numerical settings of the constrained IK projector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Convergence tolerance on position (m) and orientation (rad) errors.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Iteration cap per projection.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// DLS damping factor.
    #[serde(default = "default_damping")]
    pub damping: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            damping: default_damping(),
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tolerance <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "projection.tolerance".into(),
                message: format!("{} (must be > 0)", self.tolerance),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "projection.max_iterations".into(),
                message: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StabilityConfig
// ---------------------------------------------------------------------------

/// Parameters of the contact-wrench balance test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Coulomb friction coefficient shared by all contacts.
    #[serde(default = "default_friction")]
    pub friction: f64,

    /// Gravity vector [x, y, z] in m/s^2.
    #[serde(default = "default_gravity")]
    pub gravity: [f64; 3],
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            friction: default_friction(),
            gravity: default_gravity(),
        }
    }
}

impl StabilityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.friction <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "stability.friction".into(),
                message: format!("{} (must be > 0)", self.friction),
            });
        }
        let g = self.gravity;
        if (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt() < f64::EPSILON {
            return Err(ConfigError::InvalidValue {
                field: "stability.gravity".into(),
                message: "must be non-zero".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InterpolationConfig
// ---------------------------------------------------------------------------

/// Settings of the guide-path interpolation loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Sampling step along the guide path (s).
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Minimum robustness for a state to be flagged stable.
    #[serde(default)]
    pub robustness_threshold: f64,

    /// Height added to the guide root to avoid initial penetration (m).
    /// 0.1 suits static walking on flat ground, about 0.02 suits stairs.
    #[serde(default = "default_root_height_offset")]
    pub root_height_offset: f64,

    /// Run the deep state filter on the produced sequence.
    #[serde(default = "default_true")]
    pub filter_states: bool,

    /// Failed samples tolerated before aborting (abort on the next one).
    #[serde(default = "default_one")]
    pub max_failures: usize,

    /// Repositionings tolerated before aborting.
    #[serde(default = "default_max_repositionings")]
    pub max_repositionings: usize,

    /// Sample failures are allowed while the recontact counter is below this.
    #[serde(default = "default_max_recontacts")]
    pub max_recontacts: usize,

    /// Hard cap on consecutive retries of the same sample.
    #[serde(default = "default_recontact_limit")]
    pub recontact_limit: usize,

    /// Replace the previous frame when a step changes no contact.
    #[serde(default = "default_true")]
    pub merge_unchanged_frames: bool,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            time_step: default_time_step(),
            robustness_threshold: 0.0,
            root_height_offset: default_root_height_offset(),
            filter_states: true,
            max_failures: 1,
            max_repositionings: default_max_repositionings(),
            max_recontacts: default_max_recontacts(),
            recontact_limit: default_recontact_limit(),
            merge_unchanged_frames: true,
        }
    }
}

impl InterpolationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_step > 0.0) {
            return Err(ConfigError::InvalidTimeStep(self.time_step));
        }
        if self.robustness_threshold.is_nan() {
            return Err(ConfigError::InvalidValue {
                field: "interpolation.robustness_threshold".into(),
                message: "must not be NaN".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PlannerConfig
// ---------------------------------------------------------------------------

/// Full planner configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Root seed for sample generation and randomized heuristics.
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub contact: ContactGenConfig,

    #[serde(default)]
    pub projection: ProjectionConfig,

    #[serde(default)]
    pub stability: StabilityConfig,

    #[serde(default)]
    pub interpolation: InterpolationConfig,
}

impl PlannerConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.projection.validate()?;
        self.stability.validate()?;
        self.interpolation.validate()?;
        Ok(())
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- ContactGenConfig ----

    #[test]
    fn contact_gen_config_defaults() {
        let cfg = ContactGenConfig::default();
        assert_eq!(cfg.max_contact_breaks, 1);
        assert_eq!(cfg.max_contact_creations, 1);
        assert!(!cfg.check_stability_maintain);
        assert!(cfg.check_stability_generate);
        assert!(!cfg.contact_if_fails);
        assert!(!cfg.stable_for_one_contact);
    }

    #[test]
    fn contact_gen_config_is_copy() {
        let cfg = ContactGenConfig::default();
        let mut overridden = cfg;
        overridden.check_stability_generate = false;
        assert!(cfg.check_stability_generate);
        assert!(!overridden.check_stability_generate);
    }

    // ---- ProjectionConfig ----

    #[test]
    fn projection_config_defaults() {
        let cfg = ProjectionConfig::default();
        assert!((cfg.tolerance - 1e-3).abs() < f64::EPSILON);
        assert_eq!(cfg.max_iterations, 40);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn projection_config_rejects_zero_tolerance() {
        let cfg = ProjectionConfig {
            tolerance: 0.0,
            ..ProjectionConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    // ---- StabilityConfig ----

    #[test]
    fn stability_config_rejects_negative_friction() {
        let cfg = StabilityConfig {
            friction: -0.1,
            ..StabilityConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn stability_config_rejects_zero_gravity() {
        let cfg = StabilityConfig {
            gravity: [0.0; 3],
            ..StabilityConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    // ---- InterpolationConfig ----

    #[test]
    fn interpolation_config_defaults() {
        let cfg = InterpolationConfig::default();
        assert!((cfg.root_height_offset - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.max_repositionings, 20);
        assert_eq!(cfg.max_recontacts, 2);
        assert!(cfg.filter_states);
        assert!(cfg.merge_unchanged_frames);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn interpolation_config_rejects_zero_time_step() {
        let cfg = InterpolationConfig {
            time_step: 0.0,
            ..InterpolationConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTimeStep(_))
        ));
    }

    #[test]
    fn interpolation_config_accepts_infinite_threshold() {
        let cfg = InterpolationConfig {
            robustness_threshold: f64::INFINITY,
            ..InterpolationConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    // ---- PlannerConfig ----

    #[test]
    fn planner_config_toml_defaults() {
        let cfg: PlannerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, PlannerConfig::default());
    }

    #[test]
    fn planner_config_toml_deserialization() {
        let toml_str = r"
            seed = 11

            [contact]
            max_contact_breaks = 2
            contact_if_fails = true

            [interpolation]
            time_step = 0.05
            root_height_offset = 0.02
            filter_states = false

            [stability]
            friction = 0.8
        ";
        let cfg: PlannerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.seed, 11);
        assert_eq!(cfg.contact.max_contact_breaks, 2);
        assert_eq!(cfg.contact.max_contact_creations, 1);
        assert!(cfg.contact.contact_if_fails);
        assert!(cfg.contact.check_stability_generate);
        assert!((cfg.interpolation.time_step - 0.05).abs() < f64::EPSILON);
        assert!((cfg.interpolation.root_height_offset - 0.02).abs() < f64::EPSILON);
        assert!(!cfg.interpolation.filter_states);
        assert!((cfg.stability.friction - 0.8).abs() < f64::EPSILON);
        assert!((cfg.stability.gravity[2] + 9.81).abs() < f64::EPSILON);
    }

    #[test]
    fn planner_config_from_file() {
        let dir = std::env::temp_dir().join("footfall_test_planner_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("planner.toml");
        std::fs::write(
            &path,
            r"
            seed = 3

            [projection]
            max_iterations = 80
        ",
        )
        .unwrap();

        let cfg = PlannerConfig::from_file(&path).unwrap();
        assert_eq!(cfg.seed, 3);
        assert_eq!(cfg.projection.max_iterations, 80);

        // Cleanup
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn planner_config_from_file_invalid() {
        let dir = std::env::temp_dir().join("footfall_test_planner_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("invalid.toml");
        std::fs::write(
            &path,
            r"
            [interpolation]
            time_step = -0.1
        ",
        )
        .unwrap();

        let result = PlannerConfig::from_file(&path);
        assert!(matches!(result, Err(ConfigError::InvalidTimeStep(_))));

        // Cleanup
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn planner_config_from_file_not_found() {
        let result = PlannerConfig::from_file("/nonexistent/path/planner.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
