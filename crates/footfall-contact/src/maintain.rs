//! Keep as many previous contacts as possible at the target configuration.
//!
//! Candidates are the previous contact set with up to `max_contact_breaks`
//! contacts dropped, visited by increasing number of breaks and, at equal
//! depth, dropping the oldest contacts first. The first candidate that
//! projects, leaves its free limbs collision-free and passes the whole-body
//! check wins.

use std::collections::VecDeque;

use tracing::{debug, trace};

use footfall_core::{ContactError, ProjectionReport, ProjectionStatus, State};

use crate::helper::ContactGenHelper;
use crate::projection::{project_to_root_configuration, set_collision_free};

/// Candidate contact sets derived from `state`, by breadth.
///
/// Candidates at the same depth are de-duplicated on their contact order.
pub fn maintain_combinatorial(state: &State, max_breaks: usize) -> VecDeque<State> {
    let mut by_depth: Vec<Vec<State>> = vec![Vec::new(); max_breaks + 1];
    combinatorial_rec(state, 0, max_breaks, &mut by_depth);
    by_depth.into_iter().flatten().collect()
}

fn combinatorial_rec(state: &State, depth: usize, max_breaks: usize, by_depth: &mut [Vec<State>]) {
    let bucket = &mut by_depth[depth];
    if bucket.iter().any(|s| s.contact_order() == state.contact_order()) {
        return;
    }
    bucket.push(state.clone());
    if depth >= max_breaks {
        return;
    }
    for limb in state.contact_order() {
        let mut child = state.clone();
        child.remove_contact(limb);
        combinatorial_rec(&child, depth + 1, max_breaks, by_depth);
    }
}

/// Move every free limb of `state` to a collision-free configuration.
fn free_limbs_collision_free(helper: &ContactGenHelper<'_>, state: State) -> Result<ProjectionReport, ContactError> {
    let fullbody = helper.fullbody;
    let mut report = ProjectionReport::new(true, ProjectionStatus::NoContact, state);
    for name in report.result.free_limbs(fullbody.limb_names()) {
        let limb = fullbody.limb(&name)?;
        report = set_collision_free(fullbody, limb, &report.result)?;
        if !report.success {
            break;
        }
    }
    Ok(report)
}

/// Project `candidate` onto the target, free its other limbs and check the
/// whole body.
fn check_candidate(helper: &ContactGenHelper<'_>, candidate: &State) -> Result<ProjectionReport, ContactError> {
    let fullbody = helper.fullbody;
    let projected = project_to_root_configuration(fullbody, &helper.working_state.configuration, candidate)?;
    if !projected.success {
        return Ok(projected);
    }
    let status = projected.status;
    let mut report = free_limbs_collision_free(helper, projected.result)?;
    if !report.success {
        return Ok(report);
    }
    if let Err(collision) = fullbody.collision().validate(&report.result.configuration) {
        trace!(%collision, "maintained candidate in collision");
        report.success = false;
    }
    report.status = status;
    Ok(report)
}

/// Replace `report` by the first stable candidate holding as many contacts.
///
/// Candidates are tried in queue order. The search stops as soon as a
/// candidate holds fewer contacts than `contact_count`.
fn find_stable_candidate(
    helper: &ContactGenHelper<'_>,
    candidates: &mut VecDeque<State>,
    contact_count: usize,
    report: &mut ProjectionReport,
) -> Result<bool, ContactError> {
    if helper.is_stable(&report.result) {
        report.result.stable = true;
        return Ok(true);
    }
    report.result.stable = false;
    while let Some(candidate) = candidates.pop_front() {
        if candidate.contact_order().len() < contact_count {
            return Ok(false);
        }
        let mut next = check_candidate(helper, &candidate)?;
        if next.success && helper.is_stable(&next.result) {
            next.result.stable = true;
            *report = next;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Keep as many previous contacts as possible at the working configuration.
///
/// The first call enumerates the candidates; a later call on the same helper
/// resumes with the next untried candidate. On success `result` holds the
/// maintained contacts, marked stable only when
/// `check_stability_maintain` found a stable candidate.
pub fn maintain_contacts(helper: &mut ContactGenHelper<'_>) -> Result<ProjectionReport, ContactError> {
    if helper.candidates.is_empty() {
        helper.candidates = maintain_combinatorial(&helper.working_state, helper.params.config.max_contact_breaks);
    }

    let mut report = ProjectionReport::failure(helper.working_state.clone());
    while !report.success {
        let Some(candidate) = helper.candidates.pop_front() else {
            break;
        };
        report = check_candidate(helper, &candidate)?;
    }
    if !report.success {
        debug!(
            contacts = helper.working_state.nb_contacts(),
            "no maintainable contact set"
        );
        return Ok(report);
    }

    if helper.params.config.check_stability_maintain {
        let contact_count = report.result.contact_order().len();
        let mut remaining = helper.candidates.clone();
        if find_stable_candidate(helper, &mut remaining, contact_count, &mut report)? {
            helper.candidates = remaining;
        }
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
