//! Kinematic chain of a single limb.
//!
//! A [`KinematicChain`] is an ordered list of joints from the robot root
//! frame to the limb effector. It stores the static transforms (origins) and
//! joint axes needed for forward kinematics and Jacobian computation.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, UnitVector3, Vector3};

use footfall_core::KinematicsError;

/// A single joint in the kinematic chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    pub name: String,
    /// Static transform from the previous joint frame to this joint frame.
    pub origin: Isometry3<f64>,
    /// Joint axis in the joint's local frame.
    pub axis: UnitVector3<f64>,
    /// Whether this is a prismatic joint (false = revolute).
    pub is_prismatic: bool,
    /// Lower position limit (rad or m).
    pub lower_limit: f64,
    /// Upper position limit (rad or m).
    pub upper_limit: f64,
}

impl ChainJoint {
    pub fn revolute(
        name: impl Into<String>,
        origin: Isometry3<f64>,
        axis: Vector3<f64>,
        lower: f64,
        upper: f64,
    ) -> Self {
        Self {
            name: name.into(),
            origin,
            axis: UnitVector3::new_normalize(axis),
            is_prismatic: false,
            lower_limit: lower,
            upper_limit: upper,
        }
    }

    pub fn prismatic(
        name: impl Into<String>,
        origin: Isometry3<f64>,
        axis: Vector3<f64>,
        lower: f64,
        upper: f64,
    ) -> Self {
        Self {
            is_prismatic: true,
            ..Self::revolute(name, origin, axis, lower, upper)
        }
    }

    /// Joint range width.
    pub fn range(&self) -> f64 {
        self.upper_limit - self.lower_limit
    }
}

/// An ordered kinematic chain from the robot root to an effector.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    joints: Vec<ChainJoint>,
    /// Transform from the last joint frame to the effector frame.
    ee_offset: Isometry3<f64>,
}

impl KinematicChain {
    /// Build a chain, rejecting inverted joint limits.
    pub fn new(joints: Vec<ChainJoint>, ee_offset: Isometry3<f64>) -> Result<Self, KinematicsError> {
        if let Some(bad) = joints.iter().find(|j| j.lower_limit > j.upper_limit) {
            return Err(KinematicsError::InvalidJointLimits {
                joint: bad.name.clone(),
                lower: bad.lower_limit,
                upper: bad.upper_limit,
            });
        }
        Ok(Self { joints, ee_offset })
    }

    /// Number of actuated degrees of freedom.
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// Joint names in chain order.
    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// End-effector offset after the last joint.
    pub fn ee_offset(&self) -> &Isometry3<f64> {
        &self.ee_offset
    }

    /// Compute forward kinematics: joint positions -> effector pose in the
    /// robot root frame.
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.dof()`.
    pub fn forward_kinematics(&self, q: &[f64]) -> Isometry3<f64> {
        assert_eq!(q.len(), self.dof(), "q.len() must equal chain DOF");

        let mut transform = Isometry3::identity();
        for (joint, &position) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;
            transform *= joint_transform(&joint.axis, joint.is_prismatic, position);
        }
        transform * self.ee_offset
    }

    /// Compute per-joint frames for Jacobian computation.
    ///
    /// Returns (joint_origins_in_root, joint_axes_in_root, ee_position).
    pub fn joint_frames(&self, q: &[f64]) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>, Vector3<f64>) {
        assert_eq!(q.len(), self.dof());

        let mut transform = Isometry3::identity();
        let mut origins = Vec::with_capacity(self.dof());
        let mut axes = Vec::with_capacity(self.dof());

        for (joint, &position) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;

            // Origin and axis before the joint motion
            origins.push(transform.translation.vector);
            axes.push(transform.rotation * joint.axis.into_inner());

            transform *= joint_transform(&joint.axis, joint.is_prismatic, position);
        }

        let ee_pos = (transform * self.ee_offset).translation.vector;
        (origins, axes, ee_pos)
    }

    /// Points along the limb after each joint motion, effector last.
    /// Used for coarse collision checks.
    pub fn link_points(&self, q: &[f64]) -> Vec<Vector3<f64>> {
        assert_eq!(q.len(), self.dof());

        let mut transform = Isometry3::identity();
        let mut points = Vec::with_capacity(self.dof() + 1);
        for (joint, &position) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;
            transform *= joint_transform(&joint.axis, joint.is_prismatic, position);
            points.push(transform.translation.vector);
        }
        points.push((transform * self.ee_offset).translation.vector);
        points
    }

    /// Clamp joint positions to their limits.
    pub fn clamp_joints(&self, q: &mut [f64]) {
        for (i, joint) in self.joints.iter().enumerate() {
            q[i] = q[i].clamp(joint.lower_limit, joint.upper_limit);
        }
    }

    /// Whether every joint lies within its limits (with `tolerance`).
    pub fn within_limits(&self, q: &[f64], tolerance: f64) -> bool {
        self.joints.iter().zip(q.iter()).all(|(j, &v)| {
            v >= j.lower_limit - tolerance && v <= j.upper_limit + tolerance
        })
    }

    /// Normalised distance from the joint limits, in [0, 1].
    ///
    /// 1 when every joint sits at the middle of its range, 0 when any joint
    /// is at a limit. Fixed joints (zero range) are ignored.
    pub fn limit_margin(&self, q: &[f64]) -> f64 {
        self.joints
            .iter()
            .zip(q.iter())
            .filter(|(j, _)| j.range() > f64::EPSILON)
            .map(|(j, &v)| {
                let to_limit = (v - j.lower_limit).min(j.upper_limit - v);
                (2.0 * to_limit / j.range()).clamp(0.0, 1.0)
            })
            .fold(1.0, f64::min)
    }
}

/// Compute the transform for a single joint at a given position.
fn joint_transform(axis: &UnitVector3<f64>, is_prismatic: bool, position: f64) -> Isometry3<f64> {
    if is_prismatic {
        Isometry3::from_parts(
            Translation3::from(axis.into_inner() * position),
            UnitQuaternion::identity(),
        )
    } else {
        Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(axis, position),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
