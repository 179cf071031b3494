//! Linearised friction cones at contact points.

use nalgebra::{DMatrix, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Contact model of a limb effector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ContactKind {
    /// Point contact, position only (3 DOF).
    Point,
    /// Rectangular sole, position and orientation (6 DOF). Half sizes are
    /// along the effector's local X and Y axes.
    Planar { half_x: f64, half_y: f64 },
}

impl ContactKind {
    pub const fn is_planar(&self) -> bool {
        matches!(self, Self::Planar { .. })
    }
}

/// One held contact as seen by the balance test.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactPatch {
    pub position: Vector3<f64>,
    /// Unit surface normal, pointing out of the surface.
    pub normal: Vector3<f64>,
    /// Effector orientation at contact.
    pub rotation: Matrix3<f64>,
    pub kind: ContactKind,
}

impl ContactPatch {
    /// Points where friction cones are attached.
    pub fn support_points(&self) -> Vec<Vector3<f64>> {
        match self.kind {
            ContactKind::Point => vec![self.position],
            ContactKind::Planar { half_x, half_y } => [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)]
                .iter()
                .map(|(sx, sy)| self.position + self.rotation * Vector3::new(sx * half_x, sy * half_y, 0.0))
                .collect(),
        }
    }
}

/// Orthonormal tangents of `normal`.
fn tangent_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let t1 = (helper - normal * normal.dot(&helper)).normalize();
    let t2 = normal.cross(&t1);
    (t1, t2)
}

/// Friction-cone generators `(application point, direction)` for every
/// contact, four edges per support point.
///
/// Directions are `n ± mu t`, so each has unit normal component.
pub fn contact_generators(patches: &[ContactPatch], friction: f64) -> Vec<(Vector3<f64>, Vector3<f64>)> {
    let mut generators = Vec::new();
    for patch in patches {
        let n = patch.normal.normalize();
        let (t1, t2) = tangent_basis(&n);
        let edges = [n + t1 * friction, n - t1 * friction, n + t2 * friction, n - t2 * friction];
        for point in patch.support_points() {
            generators.extend(edges.iter().map(|g| (point, *g)));
        }
    }
    generators
}

/// 6xM matrix of generator wrenches `[g; (p - c) x g]` about `com`.
pub fn wrench_matrix(generators: &[(Vector3<f64>, Vector3<f64>)], com: &Vector3<f64>) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(6, generators.len());
    for (j, (point, g)) in generators.iter().enumerate() {
        let torque = (point - com).cross(g);
        for r in 0..3 {
            matrix[(r, j)] = g[r];
            matrix[(r + 3, j)] = torque[r];
        }
    }
    matrix
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
