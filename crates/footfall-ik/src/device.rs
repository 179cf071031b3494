//! Configuration layout of a floating-base robot.
//!
//! ```text
//! [ x y z qw qx qy qz | limb joint blocks ... | extra config (dir 3, acc 3, ...) ]
//! ```
//!
//! The device also records the robot's "current configuration": the last
//! configuration the projector produced or a planning step set. Kinematics
//! never read it; it lets callers observe the working configuration of a
//! step in progress. It is interior-mutable so planners can share the device
//! by reference. [`ConfigurationScope`] saves it and puts it back when
//! dropped, so a whole step leaves it as it found it.

use std::cell::RefCell;

use nalgebra::{DVector, Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

use footfall_core::{ContactError, KinematicsError};

/// Number of root free-flyer coordinates (position + unit quaternion).
pub const ROOT_CONFIG_DIM: usize = 7;

/// Minimum extra-config size: direction (3) then acceleration (3).
const MIN_EXTRA_CONFIG_DIM: usize = 6;

#[derive(Debug)]
pub struct Device {
    name: String,
    joint_dim: usize,
    extra_config_dim: usize,
    current: RefCell<DVector<f64>>,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        joint_dim: usize,
        extra_config_dim: usize,
    ) -> Result<Self, KinematicsError> {
        if extra_config_dim < MIN_EXTRA_CONFIG_DIM {
            return Err(KinematicsError::ExtraConfigTooSmall(extra_config_dim));
        }
        let size = ROOT_CONFIG_DIM + joint_dim + extra_config_dim;
        Ok(Self {
            name: name.into(),
            joint_dim,
            extra_config_dim,
            current: RefCell::new(neutral(size)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total configuration length.
    pub const fn config_size(&self) -> usize {
        ROOT_CONFIG_DIM + self.joint_dim + self.extra_config_dim
    }

    pub const fn joint_dim(&self) -> usize {
        self.joint_dim
    }

    pub const fn extra_config_dim(&self) -> usize {
        self.extra_config_dim
    }

    /// Index of the first extra-config entry.
    pub const fn extra_offset(&self) -> usize {
        ROOT_CONFIG_DIM + self.joint_dim
    }

    /// Identity root, zero joints, zero extra config.
    pub fn neutral_configuration(&self) -> DVector<f64> {
        neutral(self.config_size())
    }

    pub fn check_size(&self, configuration: &DVector<f64>) -> Result<(), ContactError> {
        if configuration.len() == self.config_size() {
            Ok(())
        } else {
            Err(ContactError::ConfigurationSize {
                expected: self.config_size(),
                got: configuration.len(),
            })
        }
    }

    // ---- root ----

    /// Root pose of `configuration`. The quaternion is renormalised; a zero
    /// quaternion reads as identity.
    pub fn root_transform(&self, configuration: &DVector<f64>) -> Isometry3<f64> {
        root_transform(configuration)
    }

    pub fn set_root_transform(&self, configuration: &mut DVector<f64>, root: &Isometry3<f64>) {
        let t = root.translation.vector;
        let q = root.rotation.quaternion();
        configuration[0] = t.x;
        configuration[1] = t.y;
        configuration[2] = t.z;
        configuration[3] = q.w;
        configuration[4] = q.i;
        configuration[5] = q.j;
        configuration[6] = q.k;
    }

    /// Copy the root coordinates of `from` into `to`.
    pub fn copy_root(&self, from: &DVector<f64>, to: &mut DVector<f64>) {
        to.rows_mut(0, ROOT_CONFIG_DIM)
            .copy_from(&from.rows(0, ROOT_CONFIG_DIM));
    }

    // ---- extra config ----

    /// Direction hint stored in the extra config.
    pub fn direction(&self, configuration: &DVector<f64>) -> Vector3<f64> {
        configuration.fixed_rows::<3>(self.extra_offset()).into_owned()
    }

    pub fn set_direction(&self, configuration: &mut DVector<f64>, direction: &Vector3<f64>) {
        configuration
            .fixed_rows_mut::<3>(self.extra_offset())
            .copy_from(direction);
    }

    /// Acceleration hint stored in the extra config.
    pub fn acceleration(&self, configuration: &DVector<f64>) -> Vector3<f64> {
        configuration
            .fixed_rows::<3>(self.extra_offset() + 3)
            .into_owned()
    }

    pub fn set_acceleration(&self, configuration: &mut DVector<f64>, acceleration: &Vector3<f64>) {
        configuration
            .fixed_rows_mut::<3>(self.extra_offset() + 3)
            .copy_from(acceleration);
    }

    // ---- current configuration ----

    /// Last configuration recorded by the projector or a planning step.
    pub fn current_configuration(&self) -> DVector<f64> {
        self.current.borrow().clone()
    }

    pub fn set_current_configuration(&self, configuration: &DVector<f64>) {
        self.current.borrow_mut().clone_from(configuration);
    }

    /// Save the current configuration until the returned guard is dropped.
    pub fn scope(&self) -> ConfigurationScope<'_> {
        ConfigurationScope {
            device: self,
            saved: self.current_configuration(),
        }
    }
}

/// Restores the device's current configuration on drop.
#[derive(Debug)]
pub struct ConfigurationScope<'a> {
    device: &'a Device,
    saved: DVector<f64>,
}

impl ConfigurationScope<'_> {
    /// The configuration that will be restored.
    pub const fn saved(&self) -> &DVector<f64> {
        &self.saved
    }
}

impl Drop for ConfigurationScope<'_> {
    fn drop(&mut self) {
        self.device.set_current_configuration(&self.saved);
    }
}

fn neutral(size: usize) -> DVector<f64> {
    let mut q = DVector::zeros(size);
    q[3] = 1.0;
    q
}

/// Root pose of a configuration laid out as [`Device`] describes.
pub fn root_transform(configuration: &DVector<f64>) -> Isometry3<f64> {
    let c = configuration;
    let quaternion = Quaternion::new(c[3], c[4], c[5], c[6]);
    let rotation = if quaternion.norm() > f64::EPSILON {
        UnitQuaternion::from_quaternion(quaternion)
    } else {
        UnitQuaternion::identity()
    };
    Isometry3::from_parts(Translation3::new(c[0], c[1], c[2]), rotation)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn device() -> Device {
        Device::new("quadruped", 12, 6).unwrap()
    }

    #[test]
    fn layout_sizes() {
        let d = device();
        assert_eq!(d.config_size(), 25);
        assert_eq!(d.extra_offset(), 19);
        assert_eq!(d.name(), "quadruped");
    }

    #[test]
    fn extra_config_too_small() {
        assert!(matches!(
            Device::new("r", 3, 3),
            Err(KinematicsError::ExtraConfigTooSmall(3))
        ));
    }

    #[test]
    fn check_size() {
        let d = device();
        assert!(d.check_size(&d.neutral_configuration()).is_ok());
        assert_eq!(
            d.check_size(&DVector::zeros(19)),
            Err(ContactError::ConfigurationSize { expected: 25, got: 19 })
        );
    }

    #[test]
    fn root_transform_roundtrip() {
        let d = device();
        let mut q = d.neutral_configuration();
        let root = Isometry3::from_parts(
            Translation3::new(0.5, -0.2, 0.6),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.4),
        );
        d.set_root_transform(&mut q, &root);
        let read = d.root_transform(&q);
        assert_relative_eq!(read.translation.vector, root.translation.vector, epsilon = 1e-12);
        assert_relative_eq!(read.rotation.angle(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn root_transform_normalises_quaternion() {
        let d = device();
        let mut q = d.neutral_configuration();
        q[3] = 2.0;
        assert_relative_eq!(d.root_transform(&q).rotation.angle(), 0.0, epsilon = 1e-12);
        q[3] = 0.0;
        assert_relative_eq!(d.root_transform(&q).rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn direction_and_acceleration_slots() {
        let d = device();
        let mut q = d.neutral_configuration();
        d.set_direction(&mut q, &Vector3::new(1.0, 0.0, 0.0));
        d.set_acceleration(&mut q, &Vector3::new(0.0, 0.5, 0.0));
        assert_relative_eq!(q[19], 1.0);
        assert_relative_eq!(q[23], 0.5);
        assert_relative_eq!(d.direction(&q), Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(d.acceleration(&q), Vector3::new(0.0, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn copy_root_only_touches_root() {
        let d = device();
        let from = DVector::from_element(25, 1.0);
        let mut to = d.neutral_configuration();
        d.copy_root(&from, &mut to);
        assert_relative_eq!(to[6], 1.0);
        assert_relative_eq!(to[7], 0.0);
    }

    #[test]
    fn scope_restores_current_configuration() {
        let d = device();
        let original = d.current_configuration();
        {
            let scope = d.scope();
            d.set_current_configuration(&DVector::from_element(25, 3.0));
            assert_eq!(scope.saved(), &original);
            assert_relative_eq!(d.current_configuration()[0], 3.0);
        }
        assert_eq!(d.current_configuration(), original);
    }

    #[test]
    fn nested_scopes_restore_in_order() {
        let d = device();
        let outer = d.scope();
        d.set_current_configuration(&DVector::from_element(25, 1.0));
        {
            let _inner = d.scope();
            d.set_current_configuration(&DVector::from_element(25, 2.0));
        }
        assert_relative_eq!(d.current_configuration()[0], 1.0);
        drop(outer);
        assert_relative_eq!(d.current_configuration()[0], 0.0);
    }
}
