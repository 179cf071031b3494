//! Balance LP over the contact-wrench cone.
//!
//! # LP Formulation
//!
//! Decision variables: z = [lambda_1, ..., lambda_M, t]
//! where lambda_j weights generator j and t bounds every weight from below.
//!
//! Cost: minimise -t
//!
//! Subject to:
//! - Balance: sum_j lambda_j G_j = w (equality)
//! - Margin: t - lambda_j <= 0 for every j (inequality)
//! - Cap: t <= 1/M (inequality)
//!
//! with G_j = [g_j; (p_j - c) x g_j] and w = [(a - gravity) / |gravity|; 0].
//! Generators have unit normal component, so on level ground with no
//! acceleration t = 1/M means an even load over all generators. The
//! reported robustness is M t: positive iff the balance wrench is strictly
//! inside the cone, negative outside it, and `-inf` when no combination of
//! generators (of either sign) produces it.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, Vector3};
use tracing::trace;

use footfall_core::StabilityConfig;

use crate::generators::{ContactPatch, contact_generators, wrench_matrix};

const MAX_SOLVER_ITERS: u32 = 100;

/// Evaluates the robustness margin of a set of contacts.
#[derive(Debug, Clone)]
pub struct StabilityOracle {
    config: StabilityConfig,
}

impl StabilityOracle {
    pub const fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &StabilityConfig {
        &self.config
    }

    fn gravity(&self) -> Vector3<f64> {
        Vector3::from(self.config.gravity)
    }

    /// Signed robustness of holding `com` with `patches` under `acceleration`.
    ///
    /// Returns `f64::NEG_INFINITY` without contacts or when the balance
    /// wrench is out of reach.
    pub fn robustness(
        &self,
        com: &Vector3<f64>,
        patches: &[ContactPatch],
        acceleration: &Vector3<f64>,
    ) -> f64 {
        if patches.is_empty() {
            return f64::NEG_INFINITY;
        }
        let generators = contact_generators(patches, self.config.friction);
        let g_mat = wrench_matrix(&generators, com);
        let gravity = self.gravity();
        let force = (acceleration - gravity) / gravity.norm();

        let m = generators.len();
        let n_z = m + 1;

        // 1. Cost: P = 0, q = -e_t
        let p_csc = dmatrix_to_csc_upper_tri(&DMatrix::zeros(n_z, n_z));
        let mut q = vec![0.0; n_z];
        q[m] = -1.0;

        // 2. Constraints
        let n_eq = 6;
        let n_ineq = m + 1;
        let mut a_all = DMatrix::zeros(n_eq + n_ineq, n_z);
        let mut b_all = vec![0.0; n_eq + n_ineq];

        a_all.view_mut((0, 0), (6, m)).copy_from(&g_mat);
        for r in 0..3 {
            b_all[r] = force[r];
        }

        // t - lambda_j <= 0
        for j in 0..m {
            let row = n_eq + j;
            a_all[(row, j)] = -1.0;
            a_all[(row, m)] = 1.0;
        }
        // t <= 1/M
        a_all[(n_eq + m, m)] = 1.0;
        b_all[n_eq + m] = 1.0 / m as f64;

        let a_csc = dmatrix_to_csc(&a_all);
        let cones = vec![ZeroConeT(n_eq), NonnegativeConeT(n_ineq)];

        // 3. Solve
        let Ok(settings) = DefaultSettingsBuilder::default()
            .max_iter(MAX_SOLVER_ITERS)
            .verbose(false)
            .tol_gap_abs(1e-8)
            .tol_gap_rel(1e-8)
            .tol_feas(1e-8)
            .build()
        else {
            return f64::NEG_INFINITY;
        };

        let Ok(mut solver) = DefaultSolver::new(&p_csc, &q, &a_csc, &b_all, &cones, settings) else {
            return f64::NEG_INFINITY;
        };
        solver.solve();
        let sol = &solver.solution;

        if matches!(sol.status, SolverStatus::Solved | SolverStatus::AlmostSolved) {
            let robustness = sol.x[m] * m as f64;
            trace!(contacts = patches.len(), robustness, "balance LP solved");
            robustness
        } else {
            trace!(contacts = patches.len(), status = ?sol.status, "balance LP infeasible");
            f64::NEG_INFINITY
        }
    }

    /// Whether the robustness reaches `threshold`.
    pub fn is_stable(
        &self,
        com: &Vector3<f64>,
        patches: &[ContactPatch],
        acceleration: &Vector3<f64>,
        threshold: f64,
    ) -> bool {
        self.robustness(com, patches, acceleration) >= threshold
    }
}

/// Convert a nalgebra `DMatrix<f64>` to a Clarabel `CscMatrix<f64>` (full matrix).
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Convert a symmetric nalgebra `DMatrix<f64>` to upper-triangular `CscMatrix<f64>`.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows - 1) {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::ContactKind;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    const FOOT: ContactKind = ContactKind::Planar {
        half_x: 0.05,
        half_y: 0.05,
    };

    fn foot(x: f64, y: f64, kind: ContactKind) -> ContactPatch {
        ContactPatch {
            position: Vector3::new(x, y, 0.0),
            normal: Vector3::z(),
            rotation: Matrix3::identity(),
            kind,
        }
    }

    fn four_feet() -> Vec<ContactPatch> {
        vec![
            foot(0.2, 0.15, FOOT),
            foot(0.2, -0.15, FOOT),
            foot(-0.2, 0.15, FOOT),
            foot(-0.2, -0.15, FOOT),
        ]
    }

    fn oracle() -> StabilityOracle {
        StabilityOracle::new(StabilityConfig::default())
    }

    #[test]
    fn no_contacts_is_unstable() {
        let r = oracle().robustness(&Vector3::new(0.0, 0.0, 0.6), &[], &Vector3::zeros());
        assert_eq!(r, f64::NEG_INFINITY);
    }

    #[test]
    fn centred_stance_has_full_margin() {
        let r = oracle().robustness(&Vector3::new(0.0, 0.0, 0.6), &four_feet(), &Vector3::zeros());
        assert_relative_eq!(r, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn shifted_com_reduces_margin() {
        let o = oracle();
        let centred = o.robustness(&Vector3::new(0.0, 0.0, 0.6), &four_feet(), &Vector3::zeros());
        let shifted = o.robustness(&Vector3::new(0.1, 0.0, 0.6), &four_feet(), &Vector3::zeros());
        assert!(shifted > 0.0, "shifted robustness {shifted}");
        assert!(shifted < centred - 1e-3, "{shifted} vs {centred}");
    }

    #[test]
    fn com_outside_support_is_unstable() {
        let r = oracle().robustness(&Vector3::new(2.0, 0.0, 0.6), &four_feet(), &Vector3::zeros());
        assert!(r < 0.0, "robustness {r}");
    }

    #[test]
    fn three_planar_feet_hold_centred_com() {
        let feet = vec![
            foot(0.2, -0.15, FOOT),
            foot(-0.2, 0.15, FOOT),
            foot(-0.2, -0.15, FOOT),
        ];
        assert!(oracle().is_stable(&Vector3::new(0.0, 0.0, 0.6), &feet, &Vector3::zeros(), 0.0));
    }

    #[test]
    fn two_point_contacts_cannot_balance_off_axis_com() {
        let feet = vec![
            foot(0.2, 0.15, ContactKind::Point),
            foot(-0.2, 0.15, ContactKind::Point),
        ];
        let r = oracle().robustness(&Vector3::new(0.0, 0.0, 0.6), &feet, &Vector3::zeros());
        assert!(r < 0.0, "robustness {r}");
    }

    #[test]
    fn acceleration_beyond_friction_is_unstable() {
        let r = oracle().robustness(
            &Vector3::new(0.0, 0.0, 0.6),
            &four_feet(),
            &Vector3::new(20.0, 0.0, 0.0),
        );
        assert!(r < 0.0, "robustness {r}");
    }

    #[test]
    fn infinite_threshold_is_never_met() {
        assert!(!oracle().is_stable(
            &Vector3::new(0.0, 0.0, 0.6),
            &four_feet(),
            &Vector3::zeros(),
            f64::INFINITY
        ));
    }
}
