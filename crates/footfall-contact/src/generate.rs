//! Create new contacts for free limbs.

use tracing::{debug, trace};

use footfall_core::{
    ContactError, ContactGenConfig, ProjectionReport, ProjectionStatus, State, Surface, objects_for_limb,
};

use crate::helper::ContactGenHelper;
use crate::limb::Limb;
use crate::projection::{project_sample_to_obstacle, set_collision_free};
use crate::sampling::{Heuristic, SampleReport, heuristic_score};

/// Creation plans over `free` limbs: every subset of at most `max` limbs,
/// the empty plan first, then by increasing size. Within a size, plans follow
/// the order of `free`.
pub fn creation_plans(free: &[String], max: usize) -> Vec<Vec<String>> {
    let mut plans: Vec<Vec<String>> = vec![Vec::new()];
    let mut frontier: Vec<(usize, Vec<String>)> = vec![(0, Vec::new())];
    for _ in 0..max.min(free.len()) {
        let mut next = Vec::new();
        for (start, plan) in &frontier {
            for (i, limb) in free.iter().enumerate().skip(*start) {
                let mut extended = plan.clone();
                extended.push(limb.clone());
                next.push((i + 1, extended));
            }
        }
        plans.extend(next.iter().map(|(_, p)| p.clone()));
        frontier = next;
    }
    plans
}

/// Ranked contact candidates of `limb` on `objects`.
fn limb_candidates(
    helper: &ContactGenHelper<'_>,
    limb: &Limb,
    objects: &[&Surface],
    heuristic: Heuristic,
) -> Vec<SampleReport> {
    let root = helper.fullbody.device().root_transform(&helper.working_state.configuration);
    let reach_center = root.transform_point(&(*limb.samples.reach_center()).into()).coords;
    let direction = helper.params.direction;
    let mut rng = helper.fullbody.rng();
    limb.samples.candidates(&root, objects, limb.query_margin, |sample, world| {
        heuristic_score(heuristic, sample, world, &reach_center, &direction, &mut *rng)
    })
}

/// Failed report with `limb` moved to a collision-free configuration.
fn no_contact(helper: &ContactGenHelper<'_>, limb: &Limb, state: &State) -> Result<ProjectionReport, ContactError> {
    let mut report = set_collision_free(helper.fullbody, limb, state)?;
    report.success = false;
    report.status = ProjectionStatus::NoContact;
    Ok(report)
}

/// Create a contact for the free `limb` of the working state.
///
/// Candidates are tried best first. A projected candidate is accepted when
/// stability is not required (`check_stability_generate` off, or a single
/// contact without `stable_for_one_contact`) or when it is stable. With
/// `contact_if_fails`, the most robust projected candidate is kept when none
/// is stable; the report then fails unless stability was optional. Without
/// any candidate the limb is made collision-free and the status is
/// `NoContact`.
///
/// A limb without affordance objects gets `NoContact` too, unless the body
/// requires it in contact: then `ContactError::NoAffordanceObjects` is
/// returned.
pub fn generate_contact(
    helper: &ContactGenHelper<'_>,
    limb_name: &str,
    config: ContactGenConfig,
    heuristic: Option<Heuristic>,
) -> Result<ProjectionReport, ContactError> {
    let fullbody = helper.fullbody;
    let limb = fullbody.limb(limb_name)?;
    fullbody.device().set_current_configuration(&helper.working_state.configuration);

    let mut current = helper.working_state.clone();
    current.stable = false;
    let objects = match objects_for_limb(limb_name, helper.affordances, helper.filter) {
        Ok(objects) => objects,
        Err(ContactError::NoAffordanceObjects(_)) if !fullbody.required_limbs().iter().any(|r| r == limb_name) => {
            debug!(limb = limb_name, "no affordance objects");
            return no_contact(helper, limb, &current);
        }
        Err(err) => return Err(err),
    };
    let candidates = limb_candidates(helper, limb, &objects, heuristic.unwrap_or(limb.heuristic));

    let mut best_unstable: Option<(f64, State)> = None;
    for candidate in &candidates {
        let projected = project_sample_to_obstacle(fullbody, limb, candidate, &current)?;
        if !projected.success {
            continue;
        }
        let mut state = projected.result;
        let robustness = helper.robustness(&state);
        let stable = robustness >= helper.params.robustness_threshold;
        let optional = !config.check_stability_generate
            || (state.nb_contacts() == 1 && !config.stable_for_one_contact);
        if stable || optional {
            state.stable = stable;
            let status = if stable {
                ProjectionStatus::StableContact
            } else {
                ProjectionStatus::UnstableContact
            };
            trace!(limb = limb_name, sample = candidate.sample_id, robustness, "contact created");
            return Ok(ProjectionReport::new(true, status, state));
        }
        if config.contact_if_fails && best_unstable.as_ref().is_none_or(|(best, _)| robustness > *best) {
            best_unstable = Some((robustness, state));
        }
    }

    if let Some((robustness, state)) = best_unstable {
        debug!(limb = limb_name, robustness, "keeping unstable contact");
        return Ok(ProjectionReport::new(
            !config.check_stability_generate,
            ProjectionStatus::UnstableContact,
            state,
        ));
    }

    trace!(limb = limb_name, candidates = candidates.len(), "no contact created");
    no_contact(helper, limb, &current)
}

/// Create contacts for the free limbs of the working state until it is
/// stable.
///
/// Plans are tried in [`creation_plans`] order, skipping those that leave a
/// required limb without contact. The empty plan succeeds when the working
/// state is already stable. Within a plan, stability is only required of the
/// last created contact. The working state is left untouched.
pub fn gen_contacts(helper: &mut ContactGenHelper<'_>) -> Result<ProjectionReport, ContactError> {
    let fullbody = helper.fullbody;
    let base = helper.working_state.clone();
    let free = base.free_limbs(fullbody.limb_names());
    let required = fullbody.required_limbs();

    let plans: Vec<Vec<String>> = creation_plans(&free, helper.params.config.max_contact_creations)
        .into_iter()
        .filter(|plan| required.iter().all(|r| base.in_contact(r) || plan.contains(r)))
        .collect();

    let mut outcome = None;
    for plan in &plans {
        if plan.is_empty() {
            if base.stable || helper.is_stable(&base) {
                let mut result = base.clone();
                result.stable = true;
                outcome = Some(ProjectionReport::new(true, ProjectionStatus::NoContact, result));
                break;
            }
            continue;
        }

        helper.working_state = base.clone();
        let mut report = ProjectionReport::failure(base.clone());
        for (i, limb) in plan.iter().enumerate() {
            let mut config = helper.params.config;
            if i + 1 < plan.len() {
                config.check_stability_generate = false;
            }
            report = generate_contact(helper, limb, config, None)?;
            if !report.success {
                break;
            }
            helper.working_state = report.result.clone();
        }
        if report.success {
            debug!(?plan, status = ?report.status, "creation plan succeeded");
            outcome = Some(report);
            break;
        }
    }

    helper.working_state = base;
    Ok(outcome.unwrap_or_else(|| ProjectionReport::failure(helper.working_state.clone())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn plans_start_with_empty_plan() {
        let plans = creation_plans(&names(&["a", "b"]), 1);
        assert_eq!(plans, vec![names(&[]), names(&["a"]), names(&["b"])]);
    }

    #[test]
    fn plans_grow_by_size() {
        let plans = creation_plans(&names(&["a", "b", "c"]), 2);
        assert_eq!(
            plans,
            vec![
                names(&[]),
                names(&["a"]),
                names(&["b"]),
                names(&["c"]),
                names(&["a", "b"]),
                names(&["a", "c"]),
                names(&["b", "c"]),
            ]
        );
    }

    #[test]
    fn plans_are_capped_by_free_limbs() {
        let plans = creation_plans(&names(&["a"]), 5);
        assert_eq!(plans, vec![names(&[]), names(&["a"])]);
    }

    #[test]
    fn zero_creations_only_allows_empty_plan() {
        assert_eq!(creation_plans(&names(&["a", "b"]), 0), vec![names(&[])]);
        assert_eq!(creation_plans(&[], 3), vec![names(&[])]);
    }
}
