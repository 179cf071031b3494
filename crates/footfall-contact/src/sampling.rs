//! Limb sample database.
//!
//! Each limb carries a fixed set of joint configurations drawn inside its
//! joint limits. Samples are indexed by effector position (root frame) in an
//! octree so that only the samples near an affordance surface are scored.

use nalgebra::{Isometry3, Vector3};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use footfall_core::{Aabb, Surface};
use footfall_ik::KinematicChain;

/// Maximum samples in a leaf before it is split.
const MAX_LEAF_SIZE: usize = 16;

/// Maximum octree depth.
const MAX_DEPTH: usize = 8;

/// Weight of the joint-limit margin in the forward heuristic. Smaller than
/// the reach of any limb, so a sample behind the reach centre only wins on
/// margin when it lags by less than this.
const FORWARD_STATIC_WEIGHT: f64 = 0.1;

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// One stored limb configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: usize,
    pub joint_values: Vec<f64>,
    /// Effector position in the robot root frame.
    pub effector_position: Vector3<f64>,
    /// Effector pose in the robot root frame.
    pub effector_pose: Isometry3<f64>,
    /// Normalised joint-limit margin in [0, 1].
    pub static_value: f64,
}

// ---------------------------------------------------------------------------
// Heuristic
// ---------------------------------------------------------------------------

/// Ranking of candidate samples, higher scores first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// Joint-limit margin only.
    Static,
    /// Progress along the motion direction up to the limb's reach centre,
    /// joint-limit margin as tie-break. Samples past the centre score the
    /// same, so a step lands near the hip instead of at full reach.
    #[default]
    Forward,
    /// Uniform random score from the planner's seeded generator.
    Random,
}

/// A sample matched against an affordance surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    pub sample_id: usize,
    /// Index into the objects list the report was computed against.
    pub object_index: usize,
    /// Projection of the effector onto the surface, world frame.
    pub contact_point: Vector3<f64>,
    /// Outward surface normal.
    pub normal: Vector3<f64>,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Octree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum OctreeNode {
    Leaf {
        bounds: Aabb,
        samples: Vec<usize>,
    },
    Internal {
        bounds: Aabb,
        children: Vec<OctreeNode>,
    },
}

impl OctreeNode {
    fn bounds(&self) -> &Aabb {
        match self {
            Self::Leaf { bounds, .. } | Self::Internal { bounds, .. } => bounds,
        }
    }
}

/// Point octree over sample effector positions.
#[derive(Debug, Clone)]
struct Octree {
    root: Option<OctreeNode>,
}

impl Octree {
    fn build(samples: &[Sample]) -> Self {
        let Some(bounds) = Aabb::from_points(samples.iter().map(|s| &s.effector_position)) else {
            return Self { root: None };
        };
        let ids: Vec<usize> = (0..samples.len()).collect();
        Self {
            root: Some(build_recursive(samples, ids, bounds, 0)),
        }
    }

    /// Ids of the samples whose effector lies inside `query`, ascending.
    fn query(&self, samples: &[Sample], query: &Aabb) -> Vec<usize> {
        let mut found = Vec::new();
        if let Some(root) = &self.root {
            query_recursive(root, samples, query, &mut found);
        }
        found.sort_unstable();
        found
    }
}

fn build_recursive(samples: &[Sample], ids: Vec<usize>, bounds: Aabb, depth: usize) -> OctreeNode {
    if ids.len() <= MAX_LEAF_SIZE || depth >= MAX_DEPTH {
        return OctreeNode::Leaf { bounds, samples: ids };
    }

    let center = bounds.center();
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); 8];
    for id in ids {
        let p = &samples[id].effector_position;
        let octant = usize::from(p.x > center.x)
            | (usize::from(p.y > center.y) << 1)
            | (usize::from(p.z > center.z) << 2);
        buckets[octant].push(id);
    }

    let children = buckets
        .into_iter()
        .enumerate()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(octant, bucket)| {
            let child_bounds = octant_bounds(&bounds, &center, octant);
            build_recursive(samples, bucket, child_bounds, depth + 1)
        })
        .collect();

    OctreeNode::Internal { bounds, children }
}

fn octant_bounds(bounds: &Aabb, center: &Vector3<f64>, octant: usize) -> Aabb {
    let mut min = bounds.min;
    let mut max = bounds.max;
    for axis in 0..3 {
        if (octant >> axis) & 1 == 1 {
            min[axis] = center[axis];
        } else {
            max[axis] = center[axis];
        }
    }
    Aabb::from_min_max(min, max)
}

fn query_recursive(node: &OctreeNode, samples: &[Sample], query: &Aabb, found: &mut Vec<usize>) {
    if !node.bounds().intersects(query) {
        return;
    }
    match node {
        OctreeNode::Leaf { samples: ids, .. } => {
            found.extend(ids.iter().copied().filter(|&id| query.contains(&samples[id].effector_position)));
        }
        OctreeNode::Internal { children, .. } => {
            for child in children {
                query_recursive(child, samples, query, found);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ContactSampleDb
// ---------------------------------------------------------------------------

/// Samples of one limb and their spatial index.
#[derive(Debug, Clone)]
pub struct ContactSampleDb {
    samples: Vec<Sample>,
    octree: Octree,
    reach_center: Vector3<f64>,
}

impl ContactSampleDb {
    /// Draw `count` configurations uniformly inside the joint limits of
    /// `chain`. The first sample is the middle of every joint range.
    pub fn generate(chain: &KinematicChain, count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut joint_sets = Vec::with_capacity(count);
        if count > 0 {
            joint_sets.push(
                chain
                    .joints()
                    .iter()
                    .map(|j| 0.5 * (j.lower_limit + j.upper_limit))
                    .collect::<Vec<f64>>(),
            );
        }
        while joint_sets.len() < count {
            joint_sets.push(
                chain
                    .joints()
                    .iter()
                    .map(|j| {
                        if j.range() > f64::EPSILON {
                            rng.gen_range(j.lower_limit..=j.upper_limit)
                        } else {
                            j.lower_limit
                        }
                    })
                    .collect(),
            );
        }
        Self::from_joint_values(chain, joint_sets)
    }

    /// Build from explicit joint configurations.
    pub fn from_joint_values(chain: &KinematicChain, joint_sets: Vec<Vec<f64>>) -> Self {
        let samples: Vec<Sample> = joint_sets
            .into_iter()
            .enumerate()
            .map(|(id, joint_values)| {
                let effector_pose = chain.forward_kinematics(&joint_values);
                Sample {
                    id,
                    static_value: chain.limit_margin(&joint_values),
                    effector_position: effector_pose.translation.vector,
                    effector_pose,
                    joint_values,
                }
            })
            .collect();
        let octree = Octree::build(&samples);
        let reach_center = if samples.is_empty() {
            Vector3::zeros()
        } else {
            samples.iter().map(|s| s.effector_position).sum::<Vector3<f64>>() / samples.len() as f64
        };
        Self {
            samples,
            octree,
            reach_center,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Mean effector position of the samples, root frame.
    pub const fn reach_center(&self) -> &Vector3<f64> {
        &self.reach_center
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Sample> {
        self.samples.get(id)
    }

    /// Samples whose effector (root frame) lies inside `query`.
    pub fn query(&self, query: &Aabb) -> Vec<&Sample> {
        self.octree
            .query(&self.samples, query)
            .into_iter()
            .map(|id| &self.samples[id])
            .collect()
    }

    /// Candidate contacts of this limb on `objects` with the robot root at
    /// `root`, best first.
    ///
    /// A sample qualifies for a surface when its effector lies within
    /// `margin` of the surface plane and projects inside the polygon. Ties
    /// are broken by object index then sample id.
    pub fn candidates(
        &self,
        root: &Isometry3<f64>,
        objects: &[&Surface],
        margin: f64,
        mut score: impl FnMut(&Sample, &Vector3<f64>) -> f64,
    ) -> Vec<SampleReport> {
        let to_root = root.inverse();
        let mut reports = Vec::new();
        for (object_index, surface) in objects.iter().enumerate() {
            let local_vertices: Vec<Vector3<f64>> = surface
                .vertices()
                .iter()
                .map(|v| to_root.transform_point(&(*v).into()).coords)
                .collect();
            let Some(local) = Aabb::from_points(&local_vertices) else {
                continue;
            };
            for sample in self.query(&local.inflated(margin)) {
                let world = root.transform_point(&sample.effector_position.into()).coords;
                if surface.signed_distance(&world).abs() > margin || !surface.contains(&world, 0.0) {
                    continue;
                }
                reports.push(SampleReport {
                    sample_id: sample.id,
                    object_index,
                    contact_point: surface.project(&world),
                    normal: *surface.normal(),
                    score: score(sample, &world),
                });
            }
        }
        reports.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.object_index.cmp(&b.object_index))
                .then(a.sample_id.cmp(&b.sample_id))
        });
        reports
    }
}

/// Score of `sample` with effector at `world` under `heuristic`.
///
/// `origin` is the limb's reach centre in the world frame.
pub fn heuristic_score(
    heuristic: Heuristic,
    sample: &Sample,
    world: &Vector3<f64>,
    origin: &Vector3<f64>,
    direction: &Vector3<f64>,
    rng: &mut impl Rng,
) -> f64 {
    match heuristic {
        Heuristic::Static => sample.static_value,
        Heuristic::Forward => {
            direction.dot(&(world - origin)).min(0.0) + FORWARD_STATIC_WEIGHT * sample.static_value
        }
        Heuristic::Random => rng.r#gen::<f64>(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
