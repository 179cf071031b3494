//! Guide paths: the root trajectory the interpolator realises with contacts.

use nalgebra::{DVector, Quaternion};

use footfall_core::ConfigError;
use footfall_ik::ROOT_CONFIG_DIM;

/// A continuous map `[0, length] -> configuration`.
pub trait GuidePath {
    /// Duration of the path (s).
    fn length(&self) -> f64;

    /// Configuration at `time`, clamped to `[0, length]`.
    fn configuration_at(&self, time: f64) -> DVector<f64>;
}

// ---------------------------------------------------------------------------
// LinearPath
// ---------------------------------------------------------------------------

/// Piecewise-linear path through time-stamped waypoints.
///
/// The first waypoint is at time 0. Root quaternions are blended linearly and
/// renormalised.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPath {
    waypoints: Vec<(f64, DVector<f64>)>,
}

impl LinearPath {
    pub fn new(waypoints: Vec<(f64, DVector<f64>)>) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidValue {
            field: "path.waypoints".into(),
            message: message.into(),
        };
        let Some((first_time, first)) = waypoints.first() else {
            return Err(invalid("at least one waypoint is required"));
        };
        if first_time.abs() > f64::EPSILON {
            return Err(invalid("the first waypoint must be at time 0"));
        }
        if first.len() < ROOT_CONFIG_DIM {
            return Err(invalid("configurations must hold a root"));
        }
        for pair in waypoints.windows(2) {
            if !(pair[1].0 > pair[0].0) {
                return Err(invalid("times must be strictly increasing"));
            }
            if pair[1].1.len() != first.len() {
                return Err(invalid("configurations must have the same size"));
            }
        }
        Ok(Self { waypoints })
    }

    /// Straight path from `start` to `end` over `duration`.
    pub fn between(start: DVector<f64>, end: DVector<f64>, duration: f64) -> Result<Self, ConfigError> {
        if duration <= 0.0 {
            return Self::new(vec![(0.0, start)]);
        }
        Self::new(vec![(0.0, start), (duration, end)])
    }

    /// Path standing still at `configuration` for `duration`.
    pub fn constant(configuration: DVector<f64>, duration: f64) -> Result<Self, ConfigError> {
        Self::between(configuration.clone(), configuration, duration)
    }

    pub fn waypoints(&self) -> &[(f64, DVector<f64>)] {
        &self.waypoints
    }
}

impl GuidePath for LinearPath {
    fn length(&self) -> f64 {
        self.waypoints.last().map_or(0.0, |(t, _)| *t)
    }

    fn configuration_at(&self, time: f64) -> DVector<f64> {
        let time = time.clamp(0.0, self.length());
        let next = self
            .waypoints
            .iter()
            .position(|(t, _)| *t >= time)
            .unwrap_or(self.waypoints.len() - 1);
        if next == 0 {
            return self.waypoints[0].1.clone();
        }
        let (t0, q0) = &self.waypoints[next - 1];
        let (t1, q1) = &self.waypoints[next];
        let s = (time - t0) / (t1 - t0);
        let mut q = q0.lerp(q1, s);
        normalize_root_quaternion(&mut q);
        q
    }
}

/// Renormalise the root quaternion of `q`; a zero quaternion becomes identity.
fn normalize_root_quaternion(q: &mut DVector<f64>) {
    let quaternion = Quaternion::new(q[3], q[4], q[5], q[6]);
    let norm = quaternion.norm();
    if norm > f64::EPSILON {
        q.rows_mut(3, 4).unscale_mut(norm);
    } else {
        q[3] = 1.0;
        q[4] = 0.0;
        q[5] = 0.0;
        q[6] = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn root(x: f64, qw: f64, qz: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, 0.0, 0.5, qw, 0.0, 0.0, qz, 1.0])
    }

    #[test]
    fn interpolates_between_waypoints() {
        let path = LinearPath::between(root(0.0, 1.0, 0.0), root(1.0, 1.0, 0.0), 2.0).unwrap();
        assert_relative_eq!(path.length(), 2.0);
        let q = path.configuration_at(0.5);
        assert_relative_eq!(q[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(q[7], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn clamps_outside_the_path() {
        let path = LinearPath::between(root(0.0, 1.0, 0.0), root(1.0, 1.0, 0.0), 1.0).unwrap();
        assert_relative_eq!(path.configuration_at(-1.0)[0], 0.0);
        assert_relative_eq!(path.configuration_at(3.0)[0], 1.0);
    }

    #[test]
    fn root_quaternion_is_renormalised() {
        let path = LinearPath::between(root(0.0, 1.0, 0.0), root(0.0, 0.0, 1.0), 1.0).unwrap();
        let q = path.configuration_at(0.5);
        let norm = (q[3] * q[3] + q[6] * q[6]).sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q[3], q[6], epsilon = 1e-12);
    }

    #[test]
    fn zero_duration_is_a_single_point() {
        let path = LinearPath::constant(root(0.3, 1.0, 0.0), 0.0).unwrap();
        assert_relative_eq!(path.length(), 0.0);
        assert_relative_eq!(path.configuration_at(0.7)[0], 0.3);
    }

    #[test]
    fn rejects_bad_waypoints() {
        assert!(LinearPath::new(Vec::new()).is_err());
        assert!(LinearPath::new(vec![(0.5, root(0.0, 1.0, 0.0))]).is_err());
        assert!(LinearPath::new(vec![(0.0, root(0.0, 1.0, 0.0)), (0.0, root(1.0, 1.0, 0.0))]).is_err());
        assert!(LinearPath::new(vec![(0.0, root(0.0, 1.0, 0.0)), (1.0, DVector::zeros(9))]).is_err());
        assert!(LinearPath::new(vec![(0.0, DVector::zeros(3))]).is_err());
    }
}
