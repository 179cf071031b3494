//! Mock collision validators for testing.

use nalgebra::DVector;

use footfall_core::{CollisionValidation, ValidationReport};

// ---------------------------------------------------------------------------
// RejectAll
// ---------------------------------------------------------------------------

/// A validator that reports every configuration in collision.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl CollisionValidation for RejectAll {
    fn validate(&self, _configuration: &DVector<f64>) -> Result<(), ValidationReport> {
        Err(ValidationReport {
            body: "trunk".into(),
            obstacle: "everything".into(),
            depth: f64::INFINITY,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_all_rejects() {
        let q = DVector::zeros(3);
        assert!(!RejectAll.is_valid(&q));
        assert_eq!(RejectAll.validate(&q).unwrap_err().body, "trunk");
    }
}
