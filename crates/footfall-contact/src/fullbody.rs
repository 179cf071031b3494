//! The robot as seen by the contact planner.
//!
//! A [`FullBody`] bundles the device layout, the contact limbs and their
//! sample databases, limb groups, the collision validators, the projector
//! and the stability oracle. It is built once and shared by reference; the
//! only mutable state is the device's current configuration and the seeded
//! generator behind [`Heuristic::Random`](crate::Heuristic::Random).

use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;

use nalgebra::{DVector, Vector3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use footfall_core::seed::{heuristic_seed, limb_samples_seed};
use footfall_core::{
    AlwaysValid, CollisionValidation, ContactError, FootfallError, KinematicsError, ProjectionConfig, State,
    StabilityConfig,
};
use footfall_ik::{Device, Projector};
use footfall_stability::{ContactPatch, StabilityOracle};

use crate::collision::{Obstacle, ObstacleValidation};
use crate::limb::{Limb, LimbDescription};

const DEFAULT_TRUNK_RADIUS: f64 = 0.15;

pub struct FullBody {
    device: Device,
    limbs: Vec<Limb>,
    groups: BTreeMap<String, Vec<String>>,
    required_limbs: Vec<String>,
    com_offset: Vector3<f64>,
    collision: Box<dyn CollisionValidation>,
    limb_collisions: BTreeMap<String, Box<dyn CollisionValidation>>,
    projector: Projector,
    oracle: StabilityOracle,
    rng: RefCell<ChaCha8Rng>,
}

impl std::fmt::Debug for FullBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullBody")
            .field("device", &self.device)
            .field("limbs", &self.limb_names().collect::<Vec<_>>())
            .field("groups", &self.groups)
            .field("required_limbs", &self.required_limbs)
            .finish_non_exhaustive()
    }
}

impl FullBody {
    pub fn builder(name: impl Into<String>) -> FullBodyBuilder {
        FullBodyBuilder::new(name)
    }

    pub const fn device(&self) -> &Device {
        &self.device
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    /// Limb names in declaration order.
    pub fn limb_names(&self) -> impl Iterator<Item = &str> {
        self.limbs.iter().map(|l| l.name.as_str())
    }

    pub fn limb(&self, name: &str) -> Result<&Limb, ContactError> {
        self.limbs
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| ContactError::UnknownLimb(name.to_owned()))
    }

    pub const fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    /// Members of the group `limb` belongs to, in declaration order.
    pub fn group_of(&self, limb: &str) -> Result<&[String], ContactError> {
        let group = &self.limb(limb)?.group;
        self.groups
            .get(group)
            .map(Vec::as_slice)
            .ok_or_else(|| ContactError::UnknownGroup(group.clone()))
    }

    /// Limbs every generated state must hold in contact.
    pub fn required_limbs(&self) -> &[String] {
        &self.required_limbs
    }

    pub fn collision(&self) -> &dyn CollisionValidation {
        self.collision.as_ref()
    }

    pub fn limb_collision(&self, limb: &str) -> Result<&dyn CollisionValidation, ContactError> {
        self.limb_collisions
            .get(limb)
            .map(AsRef::as_ref)
            .ok_or_else(|| ContactError::UnknownLimb(limb.to_owned()))
    }

    pub const fn projector(&self) -> &Projector {
        &self.projector
    }

    pub const fn oracle(&self) -> &StabilityOracle {
        &self.oracle
    }

    pub(crate) fn rng(&self) -> RefMut<'_, ChaCha8Rng> {
        self.rng.borrow_mut()
    }

    /// World position of the centre of mass.
    pub fn com(&self, configuration: &DVector<f64>) -> Vector3<f64> {
        self.device
            .root_transform(configuration)
            .transform_point(&self.com_offset.into())
            .coords
    }

    /// Contact patches of the contacts held by `state`.
    pub fn contact_patches(&self, state: &State) -> Vec<ContactPatch> {
        state
            .contact_limbs()
            .filter_map(|name| {
                let limb = self.limb(name).ok()?;
                Some(ContactPatch {
                    position: *state.contact_position(name)?,
                    normal: *state.contact_normal(name)?,
                    rotation: *state.contact_rotation(name)?,
                    kind: limb.kind,
                })
            })
            .collect()
    }

    /// Robustness of `state` under `acceleration`.
    pub fn robustness(&self, state: &State, acceleration: &Vector3<f64>) -> f64 {
        self.oracle
            .robustness(&self.com(&state.configuration), &self.contact_patches(state), acceleration)
    }

    /// A state at `configuration` holding contacts for `limbs` where their
    /// effectors currently are, against a surface of normal `normal`.
    pub fn state_with_contacts(
        &self,
        configuration: DVector<f64>,
        limbs: &[&str],
        normal: &Vector3<f64>,
    ) -> Result<State, ContactError> {
        self.device.check_size(&configuration)?;
        let mut state = State::new(configuration);
        for name in limbs {
            let pose = self.limb(name)?.effector_transform(&state.configuration);
            state.add_contact(
                name,
                pose.translation.vector,
                *normal,
                *pose.rotation.to_rotation_matrix().matrix(),
            );
        }
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`FullBody`]: assigns joint offsets in declaration order,
/// generates limb samples and builds the validators.
pub struct FullBodyBuilder {
    name: String,
    extra_config_dim: usize,
    limbs: Vec<LimbDescription>,
    required_limbs: Vec<String>,
    com_offset: Vector3<f64>,
    obstacles: Vec<Obstacle>,
    trunk_radius: f64,
    collision: Option<Box<dyn CollisionValidation>>,
    projection: ProjectionConfig,
    stability: StabilityConfig,
    seed: u64,
}

impl FullBodyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra_config_dim: 6,
            limbs: Vec::new(),
            required_limbs: Vec::new(),
            com_offset: Vector3::zeros(),
            obstacles: Vec::new(),
            trunk_radius: DEFAULT_TRUNK_RADIUS,
            collision: None,
            projection: ProjectionConfig::default(),
            stability: StabilityConfig::default(),
            seed: 0,
        }
    }

    #[must_use]
    pub fn limb(mut self, limb: LimbDescription) -> Self {
        self.limbs.push(limb);
        self
    }

    #[must_use]
    pub fn extra_config_dim(mut self, dim: usize) -> Self {
        self.extra_config_dim = dim;
        self
    }

    #[must_use]
    pub fn required_limbs(mut self, limbs: &[&str]) -> Self {
        self.required_limbs = limbs.iter().map(|l| (*l).to_owned()).collect();
        self
    }

    /// Centre of mass in the root frame.
    #[must_use]
    pub fn com_offset(mut self, offset: Vector3<f64>) -> Self {
        self.com_offset = offset;
        self
    }

    #[must_use]
    pub fn obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    #[must_use]
    pub fn trunk_radius(mut self, radius: f64) -> Self {
        self.trunk_radius = radius;
        self
    }

    /// Replace the whole-body obstacle validator.
    #[must_use]
    pub fn collision(mut self, validator: Box<dyn CollisionValidation>) -> Self {
        self.collision = Some(validator);
        self
    }

    #[must_use]
    pub fn projection(mut self, config: ProjectionConfig) -> Self {
        self.projection = config;
        self
    }

    #[must_use]
    pub fn stability(mut self, config: StabilityConfig) -> Self {
        self.stability = config;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<FullBody, FootfallError> {
        let joint_dim: usize = self.limbs.iter().map(|l| l.chain.dof()).sum();
        let device = Device::new(self.name, joint_dim, self.extra_config_dim)?;

        let mut limbs: Vec<Limb> = Vec::with_capacity(self.limbs.len());
        let mut offset = footfall_ik::ROOT_CONFIG_DIM;
        for description in self.limbs {
            if limbs.iter().any(|l| l.name == description.name) {
                return Err(KinematicsError::DuplicateLimb(description.name).into());
            }
            let seed = limb_samples_seed(self.seed, &description.name);
            let dof = description.chain.dof();
            let limb = Limb::from_description(description, offset, seed);
            debug!(limb = %limb.name, samples = limb.samples.len(), joint_offset = offset, "limb ready");
            offset += dof;
            limbs.push(limb);
        }

        for required in &self.required_limbs {
            if !limbs.iter().any(|l| &l.name == required) {
                return Err(ContactError::UnknownLimb(required.clone()).into());
            }
        }

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for limb in &limbs {
            groups.entry(limb.group.clone()).or_default().push(limb.name.clone());
        }

        let mut limb_collisions: BTreeMap<String, Box<dyn CollisionValidation>> = BTreeMap::new();
        for limb in &limbs {
            let validator: Box<dyn CollisionValidation> = if self.obstacles.is_empty() {
                Box::new(AlwaysValid)
            } else {
                Box::new(ObstacleValidation::limb(self.obstacles.clone(), limb.clone()))
            };
            limb_collisions.insert(limb.name.clone(), validator);
        }

        let collision = match self.collision {
            Some(validator) => validator,
            None if self.obstacles.is_empty() => Box::new(AlwaysValid),
            None => Box::new(ObstacleValidation::whole_body(
                self.obstacles,
                limbs.clone(),
                self.trunk_radius,
            )),
        };

        Ok(FullBody {
            device,
            limbs,
            groups,
            required_limbs: self.required_limbs,
            com_offset: self.com_offset,
            collision,
            limb_collisions,
            projector: Projector::new(&self.projection),
            oracle: StabilityOracle::new(self.stability),
            rng: RefCell::new(ChaCha8Rng::seed_from_u64(heuristic_seed(self.seed))),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use footfall_ik::{ChainJoint, KinematicChain};
    use footfall_stability::ContactKind;
    use nalgebra::Isometry3;

    fn leg(x: f64, y: f64) -> KinematicChain {
        KinematicChain::new(
            vec![
                ChainJoint::prismatic("x", Isometry3::translation(x, y, 0.0), Vector3::x(), -0.2, 0.2),
                ChainJoint::prismatic("y", Isometry3::identity(), Vector3::y(), -0.15, 0.15),
                ChainJoint::prismatic("z", Isometry3::identity(), Vector3::z(), -0.8, -0.3),
            ],
            Isometry3::identity(),
        )
        .unwrap()
    }

    fn biped() -> FullBody {
        FullBody::builder("biped")
            .limb(LimbDescription::new("l", "legs", leg(0.0, 0.1), ContactKind::Point).with_sample_count(20))
            .limb(LimbDescription::new("r", "legs", leg(0.0, -0.1), ContactKind::Point).with_sample_count(20))
            .com_offset(Vector3::new(0.0, 0.0, 0.1))
            .build()
            .unwrap()
    }

    #[test]
    fn joint_offsets_follow_declaration_order() {
        let body = biped();
        assert_eq!(body.device().config_size(), 7 + 6 + 6);
        assert_eq!(body.limb("l").unwrap().joint_offset, 7);
        assert_eq!(body.limb("r").unwrap().joint_offset, 10);
        assert_eq!(body.limb_names().collect::<Vec<_>>(), vec!["l", "r"]);
    }

    #[test]
    fn groups_and_unknown_limbs() {
        let body = biped();
        assert_eq!(body.group_of("r").unwrap(), &["l".to_owned(), "r".to_owned()]);
        assert_eq!(body.limb("x").unwrap_err(), ContactError::UnknownLimb("x".into()));
        assert!(body.limb_collision("l").is_ok());
    }

    #[test]
    fn duplicate_limb_is_rejected() {
        let result = FullBody::builder("bad")
            .limb(LimbDescription::new("l", "g", leg(0.0, 0.0), ContactKind::Point).with_sample_count(0))
            .limb(LimbDescription::new("l", "g", leg(0.0, 0.0), ContactKind::Point).with_sample_count(0))
            .build();
        assert!(matches!(
            result,
            Err(FootfallError::Kinematics(KinematicsError::DuplicateLimb(_)))
        ));
    }

    #[test]
    fn unknown_required_limb_is_rejected() {
        let result = FullBody::builder("bad")
            .limb(LimbDescription::new("l", "g", leg(0.0, 0.0), ContactKind::Point).with_sample_count(0))
            .required_limbs(&["r"])
            .build();
        assert!(matches!(result, Err(FootfallError::Contact(ContactError::UnknownLimb(_)))));
    }

    #[test]
    fn same_seed_same_samples() {
        let a = biped();
        let b = biped();
        assert_eq!(a.limb("l").unwrap().samples.samples(), b.limb("l").unwrap().samples.samples());
        assert_ne!(a.limb("l").unwrap().samples.samples()[1], a.limb("r").unwrap().samples.samples()[1]);
    }

    #[test]
    fn com_follows_root() {
        let body = biped();
        let mut q = body.device().neutral_configuration();
        q[0] = 1.0;
        q[2] = 0.5;
        assert_relative_eq!(body.com(&q), Vector3::new(1.0, 0.0, 0.6), epsilon = 1e-12);
    }

    #[test]
    fn state_with_contacts_records_effector_positions() {
        let body = biped();
        let mut q = body.device().neutral_configuration();
        q[2] = 0.6;
        q[9] = -0.6;
        q[12] = -0.6;
        let state = body.state_with_contacts(q, &["l", "r"], &Vector3::z()).unwrap();
        assert!(state.is_consistent());
        assert_relative_eq!(*state.contact_position("l").unwrap(), Vector3::new(0.0, 0.1, 0.0), epsilon = 1e-12);
        let patches = body.contact_patches(&state);
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].kind, ContactKind::Point);
    }
}
