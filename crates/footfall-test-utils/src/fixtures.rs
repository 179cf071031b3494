//! Fixture robots and environments.
//!
//! The quadruped has four prismatic XYZ legs hanging from hips at
//! (±0.2, ±0.15, 0) in the root frame, each ending in a square planar foot.
//! Joint `z` is the (negative) leg length, so a foot rests on the ground at
//! z = 0 when it equals minus the root height.

use nalgebra::{DVector, Isometry3, Vector3};

use footfall_contact::{FullBody, FullBodyBuilder, LimbDescription, Obstacle};
use footfall_core::{Aabb, AffordanceFilter, AffordanceMap, State, Surface};
use footfall_ik::{ChainJoint, KinematicChain};
use footfall_stability::ContactKind;

/// Limb names in declaration order.
pub const LIMBS: [&str; 4] = ["lf", "rf", "lh", "rh"];

pub const HIP_X: f64 = 0.2;
pub const HIP_Y: f64 = 0.15;
pub const ROOT_HEIGHT: f64 = 0.6;
pub const FOOT_HALF_SIZE: f64 = 0.05;
pub const SAMPLE_COUNT: usize = 600;

pub const SUPPORT: &str = "Support";
pub const LEAN: &str = "Lean";

const GROUND_HALF_SIZE: f64 = 5.0;
const GROUND_DEPTH: f64 = 1.0;

/// Hip position of `limb` in the root frame.
pub fn hip(limb: &str) -> Vector3<f64> {
    let x = if limb.ends_with('f') { HIP_X } else { -HIP_X };
    let y = if limb.starts_with('l') { HIP_Y } else { -HIP_Y };
    Vector3::new(x, y, 0.0)
}

/// Prismatic XYZ leg from `hip`.
pub fn leg(hip: Vector3<f64>) -> KinematicChain {
    KinematicChain::new(
        vec![
            ChainJoint::prismatic("x", Isometry3::translation(hip.x, hip.y, hip.z), Vector3::x(), -0.2, 0.2),
            ChainJoint::prismatic("y", Isometry3::identity(), Vector3::y(), -0.15, 0.15),
            ChainJoint::prismatic("z", Isometry3::identity(), Vector3::z(), -0.8, -0.3),
        ],
        Isometry3::identity(),
    )
    .expect("valid leg chain")
}

/// Quadruped builder: front and hind leg groups, planar feet.
pub fn quadruped_builder(seed: u64) -> FullBodyBuilder {
    LIMBS
        .iter()
        .fold(FullBody::builder("quadruped").seed(seed), |builder, name| {
            let group = if name.ends_with('f') { "front" } else { "hind" };
            let kind = ContactKind::Planar {
                half_x: FOOT_HALF_SIZE,
                half_y: FOOT_HALF_SIZE,
            };
            builder.limb(LimbDescription::new(*name, group, leg(hip(name)), kind).with_sample_count(SAMPLE_COUNT))
        })
}

/// Quadruped checked against `obstacles`.
pub fn quadruped(obstacles: Vec<Obstacle>, seed: u64) -> FullBody {
    quadruped_builder(seed)
        .obstacles(obstacles)
        .build()
        .expect("valid quadruped")
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// Ground slab whose top face is z = 0 over `[x0, x1] x [y0, y1]`.
pub fn ground_block(name: &str, x: (f64, f64), y: (f64, f64)) -> Obstacle {
    Obstacle::new(
        name,
        Aabb::from_min_max(Vector3::new(x.0, y.0, -GROUND_DEPTH), Vector3::new(x.1, y.1, 0.0)),
    )
}

/// Support rectangle on z = 0 over `[x0, x1] x [y0, y1]`.
pub fn support_rectangle(name: &str, x: (f64, f64), y: (f64, f64)) -> Surface {
    let center = Vector3::new(0.5 * (x.0 + x.1), 0.5 * (y.0 + y.1), 0.0);
    Surface::rectangle(name, center, 0.5 * (x.1 - x.0), 0.5 * (y.1 - y.0)).expect("non-degenerate rectangle")
}

/// Flat ground: one support rectangle and the slab under it.
pub fn flat_ground() -> (AffordanceMap, Vec<Obstacle>) {
    let extent = (-GROUND_HALF_SIZE, GROUND_HALF_SIZE);
    let affordances = AffordanceMap::new().with(SUPPORT, vec![support_rectangle("ground", extent, extent)]);
    (affordances, vec![ground_block("ground", extent, extent)])
}

/// Ground with a gap of `width` across the Y axis, centred on `y = center`.
pub fn split_ground(center: f64, width: f64) -> (AffordanceMap, Vec<Obstacle>) {
    let x = (-GROUND_HALF_SIZE, GROUND_HALF_SIZE);
    let near = (-GROUND_HALF_SIZE, center - 0.5 * width);
    let far = (center + 0.5 * width, GROUND_HALF_SIZE);
    let affordances = AffordanceMap::new().with(
        SUPPORT,
        vec![support_rectangle("near", x, near), support_rectangle("far", x, far)],
    );
    (affordances, vec![ground_block("near", x, near), ground_block("far", x, far)])
}

/// Vertical wall facing -X at `x`, out of reach of every leg.
pub fn far_wall(x: f64) -> Surface {
    Surface::new(
        "wall",
        vec![
            Vector3::new(x, 1.0, 0.0),
            Vector3::new(x, -1.0, 0.0),
            Vector3::new(x, -1.0, 1.0),
            Vector3::new(x, 1.0, 1.0),
        ],
    )
    .expect("non-degenerate wall")
}

/// Every limb restricted to `Support` surfaces.
pub fn support_filter() -> AffordanceFilter {
    LIMBS
        .iter()
        .fold(AffordanceFilter::new(), |filter, limb| filter.with(limb, &[SUPPORT]))
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Configuration with the root at `root` and each leg's `x` joint set from
/// `foot_x` (in [`LIMBS`] order), feet at ground level.
pub fn stance_configuration(body: &FullBody, root: Vector3<f64>, foot_x: [f64; 4]) -> DVector<f64> {
    let mut q = body.device().neutral_configuration();
    q[0] = root.x;
    q[1] = root.y;
    q[2] = root.z;
    for (name, x) in LIMBS.iter().zip(foot_x) {
        let limb = body.limb(name).expect("quadruped limb");
        limb.set_joint_values(&mut q, &[x, 0.0, -root.z]);
    }
    q
}

/// State at `configuration` with `limbs` in contact with the ground, in
/// that creation order. Flagged stable when the oracle says so.
pub fn stance_state(body: &FullBody, configuration: DVector<f64>, limbs: &[&str]) -> State {
    let mut state = body
        .state_with_contacts(configuration, limbs, &Vector3::z())
        .expect("valid stance");
    state.stable = body.robustness(&state, &Vector3::zeros()) >= 0.0;
    state
}

/// All four feet down under a root at `(x, 0, ROOT_HEIGHT)`.
pub fn standing_state(body: &FullBody, x: f64, foot_x: [f64; 4]) -> State {
    let q = stance_configuration(body, Vector3::new(x, 0.0, ROOT_HEIGHT), foot_x);
    stance_state(body, q, &LIMBS)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
