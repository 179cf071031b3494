//! Damped Least Squares (Levenberg-Marquardt) IK solver.
//!
//! Iteratively solves for joint positions that place the effector at a
//! target pose, using the geometric Jacobian and DLS pseudoinverse. Targets
//! are expressed in the chain's root frame.

use nalgebra::{DMatrix, DVector, Isometry3, Point3, UnitQuaternion, Vector3};

use footfall_core::ProjectionConfig;

use crate::chain::KinematicChain;

/// What the solver should target.
#[derive(Debug, Clone, PartialEq)]
pub enum IkTarget {
    /// Target position only (3-DOF constraint).
    Position(Vector3<f64>),
    /// Target full pose: position + orientation (6-DOF constraint).
    Pose(Isometry3<f64>),
}

impl IkTarget {
    /// The same target expressed in the frame `frame` (given in the target's
    /// current frame).
    #[must_use]
    pub fn in_frame(&self, frame: &Isometry3<f64>) -> Self {
        match self {
            Self::Position(p) => Self::Position(frame.inverse_transform_point(&Point3::from(*p)).coords),
            Self::Pose(pose) => Self::Pose(frame.inverse() * pose),
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        match self {
            Self::Position(p) => *p,
            Self::Pose(pose) => pose.translation.vector,
        }
    }
}

/// Configuration for the DLS solver.
#[derive(Debug, Clone)]
pub struct DlsConfig {
    /// Maximum solver iterations.
    pub max_iterations: u32,
    /// Position error tolerance (meters).
    pub position_tolerance: f64,
    /// Orientation error tolerance (radians).
    pub angle_tolerance: f64,
    /// Damping factor (lambda). Higher = more robust near singularities,
    /// but slower convergence.
    pub damping: f64,
}

impl Default for DlsConfig {
    fn default() -> Self {
        Self::from(&ProjectionConfig::default())
    }
}

impl From<&ProjectionConfig> for DlsConfig {
    fn from(config: &ProjectionConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            position_tolerance: config.tolerance,
            angle_tolerance: config.tolerance,
            damping: config.damping,
        }
    }
}

/// Result of an IK solve.
#[derive(Debug, Clone)]
pub struct IkResult {
    /// Solved joint positions (last iterate when not converged).
    pub joint_positions: Vec<f64>,
    pub converged: bool,
    pub iterations: u32,
    /// Final position error (meters).
    pub position_error: f64,
    /// Final orientation error (radians). Zero if target is position-only.
    pub orientation_error: f64,
}

/// Damped Least Squares IK solver.
#[derive(Debug, Clone)]
pub struct DlsSolver {
    config: DlsConfig,
}

impl DlsSolver {
    pub const fn new(config: DlsConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DlsConfig::default())
    }

    pub const fn config(&self) -> &DlsConfig {
        &self.config
    }

    /// Solve IK for the given chain and target.
    ///
    /// `q_init` is the starting joint configuration (warm start).
    pub fn solve(&self, chain: &KinematicChain, target: &IkTarget, q_init: &[f64]) -> IkResult {
        assert_eq!(q_init.len(), chain.dof());

        let mut q: Vec<f64> = q_init.to_vec();
        let n = chain.dof();

        for iteration in 0..self.config.max_iterations {
            let ee_pose = chain.forward_kinematics(&q);
            let (pos_err, ori_err, error_vec) = compute_error(&ee_pose, target);

            if self.is_converged(target, pos_err, ori_err) {
                return IkResult {
                    joint_positions: q,
                    converged: true,
                    iterations: iteration,
                    position_error: pos_err,
                    orientation_error: ori_err,
                };
            }

            let jacobian = compute_jacobian(chain, &q, target);
            let m = jacobian.nrows();

            // DLS: dq = J^T (J J^T + lambda^2 I)^{-1} * error
            let jjt = &jacobian * jacobian.transpose();
            let damped = jjt + DMatrix::identity(m, m) * (self.config.damping * self.config.damping);
            let Some(damped_inv) = damped.try_inverse() else {
                return IkResult {
                    joint_positions: q,
                    converged: false,
                    iterations: iteration,
                    position_error: pos_err,
                    orientation_error: ori_err,
                };
            };

            let dq = jacobian.transpose() * damped_inv * error_vec;
            for i in 0..n {
                q[i] += dq[i];
            }
            chain.clamp_joints(&mut q);
        }

        let ee_pose = chain.forward_kinematics(&q);
        let (pos_err, ori_err, _) = compute_error(&ee_pose, target);

        IkResult {
            converged: self.is_converged(target, pos_err, ori_err),
            joint_positions: q,
            iterations: self.config.max_iterations,
            position_error: pos_err,
            orientation_error: ori_err,
        }
    }

    fn is_converged(&self, target: &IkTarget, pos_err: f64, ori_err: f64) -> bool {
        match target {
            IkTarget::Position(_) => pos_err < self.config.position_tolerance,
            IkTarget::Pose(_) => {
                pos_err < self.config.position_tolerance && ori_err < self.config.angle_tolerance
            }
        }
    }
}

/// Compute the error vector between current effector pose and target.
///
/// Returns (position_error_norm, orientation_error_norm, error_vector).
fn compute_error(ee_pose: &Isometry3<f64>, target: &IkTarget) -> (f64, f64, DVector<f64>) {
    match target {
        IkTarget::Position(target_pos) => {
            let pos_err = target_pos - ee_pose.translation.vector;
            let error = DVector::from_column_slice(&[pos_err.x, pos_err.y, pos_err.z]);
            (pos_err.norm(), 0.0, error)
        }
        IkTarget::Pose(target_pose) => {
            let pos_err = target_pose.translation.vector - ee_pose.translation.vector;

            // Orientation error as axis-angle
            let rot_err = target_pose.rotation * ee_pose.rotation.inverse();
            let ori_err_vec = orientation_error(&rot_err);

            let error = DVector::from_column_slice(&[
                pos_err.x,
                pos_err.y,
                pos_err.z,
                ori_err_vec.x,
                ori_err_vec.y,
                ori_err_vec.z,
            ]);
            (pos_err.norm(), ori_err_vec.norm(), error)
        }
    }
}

/// Extract orientation error as a 3-vector (axis * angle) from a unit quaternion.
fn orientation_error(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    q.axis().map_or_else(Vector3::zeros, |axis| axis.into_inner() * q.angle())
}

/// Compute the geometric Jacobian for the current configuration.
///
/// 3xN for position-only targets, 6xN (linear + angular rows) for poses.
fn compute_jacobian(chain: &KinematicChain, q: &[f64], target: &IkTarget) -> DMatrix<f64> {
    let n = chain.dof();
    let (origins, axes, ee_pos) = chain.joint_frames(q);

    let rows = match target {
        IkTarget::Position(_) => 3,
        IkTarget::Pose(_) => 6,
    };

    let mut jacobian = DMatrix::zeros(rows, n);

    for i in 0..n {
        let z_i = &axes[i];
        if chain.joints()[i].is_prismatic {
            // Linear only; angular rows stay zero
            jacobian[(0, i)] = z_i.x;
            jacobian[(1, i)] = z_i.y;
            jacobian[(2, i)] = z_i.z;
        } else {
            let cross = z_i.cross(&(ee_pos - origins[i]));
            jacobian[(0, i)] = cross.x;
            jacobian[(1, i)] = cross.y;
            jacobian[(2, i)] = cross.z;
            if rows == 6 {
                jacobian[(3, i)] = z_i.x;
                jacobian[(4, i)] = z_i.y;
                jacobian[(5, i)] = z_i.z;
            }
        }
    }

    jacobian
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
