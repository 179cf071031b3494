//! One contact transition: maintain, then generate, then reposition.

use nalgebra::DVector;
use tracing::{debug, trace};

use footfall_core::{AffordanceFilter, AffordanceMap, ContactError, ProjectionReport, ProjectionStatus, State};

use crate::fullbody::FullBody;
use crate::generate::gen_contacts;
use crate::helper::{ContactGenHelper, GenerationParams};
use crate::maintain::maintain_contacts;
use crate::reposition::reposition_contacts;

/// Outcome of [`compute_contacts`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContactReport {
    pub projection: ProjectionReport,
    /// The result holds contacts on exactly the previous limbs.
    pub contact_maintained: bool,
    /// More contacts had to break than allowed, or none could be kept.
    pub multiple_breaks: bool,
    /// An existing contact was moved to recover stability.
    pub repositioned_in_place: bool,
    pub contacts_broken: Vec<String>,
    pub contacts_created: Vec<String>,
}

impl ContactReport {
    pub const fn success(&self) -> bool {
        self.projection.success
    }

    pub const fn result(&self) -> &State {
        &self.projection.result
    }
}

/// Compute the contacts at `target` following `previous`.
///
/// 1. Keep as many previous contacts as the projection allows.
/// 2. Create contacts for free limbs until the state is stable.
/// 3. If the state is still unstable and holds contacts, move one.
pub fn compute_contacts(
    previous: &State,
    fullbody: &FullBody,
    target: &DVector<f64>,
    affordances: &AffordanceMap,
    filter: &AffordanceFilter,
    params: GenerationParams,
) -> Result<ContactReport, ContactError> {
    let mut helper = ContactGenHelper::new(fullbody, previous, target, affordances, filter, params)?;

    let maintained = maintain_contacts(&mut helper)?;
    if !maintained.success {
        debug!(contacts = previous.nb_contacts(), "contacts could not be maintained");
        return Ok(ContactReport {
            contacts_broken: maintained.result.contact_breaks(previous),
            contacts_created: Vec::new(),
            projection: maintained,
            contact_maintained: false,
            multiple_breaks: true,
            repositioned_in_place: false,
        });
    }
    let multiple_breaks = maintained.result.contact_breaks(previous).len() > params.config.max_contact_breaks;

    helper.working_state = maintained.result;
    let generated = gen_contacts(&mut helper)?;
    let mut projection = if generated.success {
        generated
    } else {
        let mut result = helper.working_state.clone();
        result.stable = helper.is_stable(&result);
        ProjectionReport::new(false, ProjectionStatus::NoContact, result)
    };

    let mut repositioned_in_place = false;
    if !projection.result.stable && projection.result.nb_contacts() > 0 {
        helper.working_state = projection.result.clone();
        let repositioned = reposition_contacts(&mut helper)?;
        if repositioned.success {
            projection = repositioned;
            repositioned_in_place = true;
        }
    }

    let result = &projection.result;
    let report = ContactReport {
        contact_maintained: result.has_same_contacts(previous),
        multiple_breaks,
        repositioned_in_place,
        contacts_broken: result.contact_breaks(previous),
        contacts_created: result.contact_creations(previous),
        projection,
    };
    trace!(
        success = report.success(),
        stable = report.result().stable,
        broken = ?report.contacts_broken,
        created = ?report.contacts_created,
        "contacts computed"
    );
    Ok(report)
}
