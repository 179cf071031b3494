//! Box-obstacle collision validation.
//!
//! Obstacles are axis-aligned boxes. The trunk is a sphere at the root and
//! each limb is checked through its link points. Points touching a box face
//! within `CONTACT_TOLERANCE` are not collisions, so effectors resting on a
//! support are valid.

use nalgebra::DVector;

use footfall_core::{Aabb, CollisionValidation, ValidationReport};

use crate::limb::Limb;

/// Penetration depth below which a point counts as resting on an obstacle.
pub const CONTACT_TOLERANCE: f64 = 0.01;

/// Named axis-aligned obstacle.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub name: String,
    pub aabb: Aabb,
}

impl Obstacle {
    pub fn new(name: impl Into<String>, aabb: Aabb) -> Self {
        Self {
            name: name.into(),
            aabb,
        }
    }

    /// Penetration depth of `p`, positive inside the box shrunk by the
    /// contact tolerance.
    fn penetration(&self, p: &nalgebra::Vector3<f64>) -> Option<f64> {
        let inner = self.aabb.inflated(-CONTACT_TOLERANCE);
        if !inner.contains(p) {
            return None;
        }
        let depth = (0..3)
            .map(|i| (p[i] - inner.min[i]).min(inner.max[i] - p[i]))
            .fold(f64::INFINITY, f64::min);
        Some(depth + CONTACT_TOLERANCE)
    }
}

/// Validator against a set of box obstacles.
#[derive(Debug, Clone)]
pub struct ObstacleValidation {
    obstacles: Vec<Obstacle>,
    limbs: Vec<Limb>,
    trunk_radius: Option<f64>,
}

impl ObstacleValidation {
    /// Check the trunk sphere and every limb.
    pub fn whole_body(obstacles: Vec<Obstacle>, limbs: Vec<Limb>, trunk_radius: f64) -> Self {
        Self {
            obstacles,
            limbs,
            trunk_radius: Some(trunk_radius),
        }
    }

    /// Check one limb only.
    pub fn limb(obstacles: Vec<Obstacle>, limb: Limb) -> Self {
        Self {
            obstacles,
            limbs: vec![limb],
            trunk_radius: None,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }
}

impl CollisionValidation for ObstacleValidation {
    fn validate(&self, configuration: &DVector<f64>) -> Result<(), ValidationReport> {
        if let Some(radius) = self.trunk_radius {
            let root = footfall_ik::device::root_transform(configuration).translation.vector;
            for obstacle in &self.obstacles {
                let distance = obstacle.aabb.distance(&root);
                if distance < radius - CONTACT_TOLERANCE {
                    return Err(ValidationReport {
                        body: "trunk".into(),
                        obstacle: obstacle.name.clone(),
                        depth: radius - distance,
                    });
                }
            }
        }
        for limb in &self.limbs {
            for point in limb.world_link_points(configuration) {
                for obstacle in &self.obstacles {
                    if let Some(depth) = obstacle.penetration(&point) {
                        return Err(ValidationReport {
                            body: limb.name.clone(),
                            obstacle: obstacle.name.clone(),
                            depth,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limb::LimbDescription;
    use footfall_ik::{ChainJoint, KinematicChain};
    use footfall_stability::ContactKind;
    use nalgebra::{Isometry3, Vector3};

    fn limb() -> Limb {
        let chain = KinematicChain::new(
            vec![
                ChainJoint::prismatic("x", Isometry3::translation(0.2, 0.15, 0.0), Vector3::x(), -0.2, 0.2),
                ChainJoint::prismatic("y", Isometry3::identity(), Vector3::y(), -0.15, 0.15),
                ChainJoint::prismatic("z", Isometry3::identity(), Vector3::z(), -0.8, -0.3),
            ],
            Isometry3::identity(),
        )
        .unwrap();
        Limb::from_description(
            LimbDescription::new("lf", "front", chain, ContactKind::Point).with_sample_count(0),
            7,
            0,
        )
    }

    fn ground() -> Obstacle {
        Obstacle::new(
            "ground",
            Aabb::from_min_max(Vector3::new(-5.0, -5.0, -1.0), Vector3::new(5.0, 5.0, 0.0)),
        )
    }

    fn config(root_z: f64, foot_z: f64) -> DVector<f64> {
        let mut q = DVector::zeros(16);
        q[2] = root_z;
        q[3] = 1.0;
        q[9] = foot_z;
        q
    }

    #[test]
    fn foot_resting_on_ground_is_valid() {
        let v = ObstacleValidation::limb(vec![ground()], limb());
        assert!(v.is_valid(&config(0.6, -0.6)));
        assert!(v.is_valid(&config(0.6, -0.5)));
    }

    #[test]
    fn foot_below_ground_collides() {
        let v = ObstacleValidation::limb(vec![ground()], limb());
        let report = v.validate(&config(0.6, -0.7)).unwrap_err();
        assert_eq!(report.body, "lf");
        assert_eq!(report.obstacle, "ground");
        assert!(report.depth > 0.09);
    }

    #[test]
    fn trunk_sphere_collides_when_root_low() {
        let v = ObstacleValidation::whole_body(vec![ground()], vec![limb()], 0.15);
        assert!(v.is_valid(&config(0.6, -0.6)));
        let report = v.validate(&config(0.05, -0.05)).unwrap_err();
        assert_eq!(report.body, "trunk");
    }

    #[test]
    fn no_obstacles_is_always_valid() {
        let v = ObstacleValidation::whole_body(Vec::new(), vec![limb()], 0.15);
        assert!(v.is_valid(&config(-3.0, -0.8)));
    }
}
