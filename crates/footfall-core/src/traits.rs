use nalgebra::DVector;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CollisionValidation
// ---------------------------------------------------------------------------

/// Why a configuration was rejected by a collision validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Name of the robot part found in collision.
    pub body: String,
    /// Name of the obstacle it collides with.
    pub obstacle: String,
    /// Penetration depth, positive inside the obstacle.
    pub depth: f64,
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} collides with {} (depth {:.4})",
            self.body, self.obstacle, self.depth
        )
    }
}

/// Collision check of a full configuration vector.
///
/// Implemented both for the whole body and for a single limb. The planner
/// only needs a verdict plus a report for logging.
pub trait CollisionValidation {
    fn validate(&self, configuration: &DVector<f64>) -> Result<(), ValidationReport>;

    fn is_valid(&self, configuration: &DVector<f64>) -> bool {
        self.validate(configuration).is_ok()
    }
}

/// Validator accepting every configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysValid;

impl CollisionValidation for AlwaysValid {
    fn validate(&self, _configuration: &DVector<f64>) -> Result<(), ValidationReport> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct BelowZero;

    impl CollisionValidation for BelowZero {
        fn validate(&self, configuration: &DVector<f64>) -> Result<(), ValidationReport> {
            if configuration[2] < 0.0 {
                return Err(ValidationReport {
                    body: "trunk".into(),
                    obstacle: "ground".into(),
                    depth: -configuration[2],
                });
            }
            Ok(())
        }
    }

    #[test]
    fn always_valid_accepts_anything() {
        assert!(AlwaysValid.is_valid(&DVector::from_element(7, f64::NAN)));
    }

    #[test]
    fn is_valid_follows_validate() {
        assert!(BelowZero.is_valid(&DVector::from_vec(vec![0.0, 0.0, 0.5])));
        let report = BelowZero
            .validate(&DVector::from_vec(vec![0.0, 0.0, -0.25]))
            .unwrap_err();
        assert_eq!(report.to_string(), "trunk collides with ground (depth 0.2500)");
    }
}
