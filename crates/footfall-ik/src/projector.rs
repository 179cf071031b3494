//! Constraint projection: lock the root (pose or position only), pin
//! effectors.
//!
//! With the root pose fixed the limbs are kinematically decoupled, so the
//! projection solves one DLS problem per pinned limb in the root frame and
//! writes each solution back into its joint block.

use nalgebra::{DVector, Isometry3, Vector3};
use tracing::trace;

use footfall_core::ProjectionConfig;

use crate::chain::KinematicChain;
use crate::device::Device;
use crate::solver::{DlsConfig, DlsSolver, IkTarget};

/// Effector pin: drive the chain whose joints start at `joint_offset` in the
/// configuration to a world-frame target.
#[derive(Debug, Clone)]
pub struct EffectorPin<'a> {
    pub limb: &'a str,
    pub chain: &'a KinematicChain,
    pub joint_offset: usize,
    pub target: IkTarget,
}

/// What a root lock fixes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootLock {
    /// Position and orientation.
    Pose(Isometry3<f64>),
    /// Position only; the configuration keeps its own orientation.
    Position(Vector3<f64>),
}

/// A set of projection constraints.
#[derive(Debug, Clone, Default)]
pub struct Constraints<'a> {
    /// Root lock, `None` keeps the configuration's own root.
    pub root: Option<RootLock>,
    pub pins: Vec<EffectorPin<'a>>,
}

impl<'a> Constraints<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lock_root(mut self, root: Isometry3<f64>) -> Self {
        self.root = Some(RootLock::Pose(root));
        self
    }

    #[must_use]
    pub fn lock_root_position(mut self, position: Vector3<f64>) -> Self {
        self.root = Some(RootLock::Position(position));
        self
    }

    pub fn pin(&mut self, pin: EffectorPin<'a>) {
        self.pins.push(pin);
    }
}

/// Damped constraint solver with fixed tolerance and iteration cap.
#[derive(Debug, Clone)]
pub struct Projector {
    solver: DlsSolver,
}

impl Projector {
    pub fn new(config: &ProjectionConfig) -> Self {
        Self {
            solver: DlsSolver::new(DlsConfig::from(config)),
        }
    }

    /// Apply `constraints` to `configuration`.
    ///
    /// Returns whether every constraint is satisfied, and the final iterate.
    /// The device's current configuration is set to the result.
    pub fn apply(
        &self,
        device: &Device,
        configuration: &DVector<f64>,
        constraints: &Constraints<'_>,
    ) -> (bool, DVector<f64>) {
        let mut q = configuration.clone();
        if device.check_size(&q).is_err() {
            return (false, q);
        }
        match &constraints.root {
            Some(RootLock::Pose(root)) => device.set_root_transform(&mut q, root),
            Some(RootLock::Position(position)) => q.fixed_rows_mut::<3>(0).copy_from(position),
            None => {}
        }
        let root = device.root_transform(&q);

        let mut success = true;
        for pin in &constraints.pins {
            let dof = pin.chain.dof();
            if pin.joint_offset + dof > q.len() {
                success = false;
                continue;
            }
            let local_target = pin.target.in_frame(&root);
            let q_init: Vec<f64> = q.rows(pin.joint_offset, dof).iter().copied().collect();
            let result = self.solver.solve(pin.chain, &local_target, &q_init);
            for (i, v) in result.joint_positions.iter().enumerate() {
                q[pin.joint_offset + i] = *v;
            }
            if !result.converged {
                trace!(
                    limb = pin.limb,
                    position_error = result.position_error,
                    orientation_error = result.orientation_error,
                    "pin not satisfied"
                );
                success = false;
            }
        }

        device.set_current_configuration(&q);
        (success, q)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
