//! Contact limbs of a full body.

use nalgebra::{DVector, Isometry3, Vector3};

use footfall_ik::KinematicChain;
use footfall_stability::ContactKind;

use crate::sampling::{ContactSampleDb, Heuristic};

const DEFAULT_SAMPLE_COUNT: usize = 400;
const DEFAULT_QUERY_MARGIN: f64 = 0.1;

/// Description of a limb before its samples are generated.
#[derive(Debug, Clone)]
pub struct LimbDescription {
    pub name: String,
    /// Limbs of a group may take over each other's contacts when the robot
    /// repositions.
    pub group: String,
    pub chain: KinematicChain,
    pub kind: ContactKind,
    /// Sole normal in the effector frame.
    pub effector_normal: Vector3<f64>,
    pub sample_count: usize,
    pub heuristic: Heuristic,
    /// Distance within which a sample may be projected onto a surface.
    pub query_margin: f64,
}

impl LimbDescription {
    pub fn new(name: impl Into<String>, group: impl Into<String>, chain: KinematicChain, kind: ContactKind) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            chain,
            kind,
            effector_normal: Vector3::z(),
            sample_count: DEFAULT_SAMPLE_COUNT,
            heuristic: Heuristic::default(),
            query_margin: DEFAULT_QUERY_MARGIN,
        }
    }

    #[must_use]
    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count;
        self
    }

    #[must_use]
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    #[must_use]
    pub fn with_query_margin(mut self, margin: f64) -> Self {
        self.query_margin = margin;
        self
    }
}

/// A limb placed in the device configuration, with its samples.
#[derive(Debug, Clone)]
pub struct Limb {
    pub name: String,
    pub group: String,
    pub chain: KinematicChain,
    /// Index of the limb's first joint in the configuration vector.
    pub joint_offset: usize,
    pub kind: ContactKind,
    pub effector_normal: Vector3<f64>,
    pub heuristic: Heuristic,
    pub query_margin: f64,
    pub samples: ContactSampleDb,
}

impl Limb {
    pub(crate) fn from_description(description: LimbDescription, joint_offset: usize, seed: u64) -> Self {
        let samples = ContactSampleDb::generate(&description.chain, description.sample_count, seed);
        Self {
            name: description.name,
            group: description.group,
            chain: description.chain,
            joint_offset,
            kind: description.kind,
            effector_normal: description.effector_normal,
            heuristic: description.heuristic,
            query_margin: description.query_margin,
            samples,
        }
    }

    pub fn dof(&self) -> usize {
        self.chain.dof()
    }

    /// The limb's joint block of `configuration`.
    pub fn joint_values(&self, configuration: &DVector<f64>) -> Vec<f64> {
        configuration
            .rows(self.joint_offset, self.dof())
            .iter()
            .copied()
            .collect()
    }

    /// Overwrite the limb's joint block of `configuration`.
    pub fn set_joint_values(&self, configuration: &mut DVector<f64>, values: &[f64]) {
        for (i, v) in values.iter().enumerate().take(self.dof()) {
            configuration[self.joint_offset + i] = *v;
        }
    }

    /// Effector pose in the world frame.
    pub fn effector_transform(&self, configuration: &DVector<f64>) -> Isometry3<f64> {
        let root = footfall_ik::device::root_transform(configuration);
        root * self.chain.forward_kinematics(&self.joint_values(configuration))
    }

    /// Link points in the world frame, effector last.
    pub fn world_link_points(&self, configuration: &DVector<f64>) -> Vec<Vector3<f64>> {
        let root = footfall_ik::device::root_transform(configuration);
        self.chain
            .link_points(&self.joint_values(configuration))
            .iter()
            .map(|p| root.transform_point(&(*p).into()).coords)
            .collect()
    }
}
