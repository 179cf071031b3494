//! Replace one existing contact to recover stability.

use tracing::debug;

use footfall_core::{ContactError, ProjectionReport, ProjectionStatus};

use crate::generate::generate_contact;
use crate::helper::ContactGenHelper;

/// Try to make the working state stable by moving one contact.
///
/// Contacts are visited oldest first. For each, every member of its limb
/// group that is not already holding another contact is tried as its
/// replacement: the original contact is removed and a new one generated for
/// the member. Only a stable result is accepted. Contacts that cannot be
/// replaced stay in place.
///
/// On success the contact order is the visited-but-kept contacts (most
/// recent first), then the contacts not visited, then the new one. The
/// device's current configuration is restored on return.
pub fn reposition_contacts(helper: &mut ContactGenHelper<'_>) -> Result<ProjectionReport, ContactError> {
    let fullbody = helper.fullbody;
    let _scope = fullbody.device().scope();

    let initial = helper.working_state.clone();
    let mut remaining = initial.contact_order().clone();
    let mut kept: Vec<String> = Vec::new();
    let mut replacement: Option<(String, ProjectionReport)> = None;

    while replacement.is_none() {
        let Some(original) = remaining.pop_front() else {
            break;
        };
        for member in fullbody.group_of(&original)? {
            if *member != original && initial.in_contact(member) {
                continue;
            }
            let mut candidate = initial.clone();
            candidate.remove_contact(&original);
            candidate.stable = false;
            helper.working_state = candidate;
            let report = generate_contact(helper, member, helper.params.config, None)?;
            if report.status == ProjectionStatus::StableContact {
                debug!(original = %original, replacement = %member, "contact repositioned");
                replacement = Some((member.clone(), report));
                break;
            }
        }
        if replacement.is_none() {
            kept.push(original);
        }
    }
    helper.working_state = initial.clone();

    let mut order: Vec<String> = kept.iter().rev().cloned().collect();
    order.extend(remaining.iter().cloned());
    match replacement {
        Some((member, mut report)) => {
            order.push(member);
            report.result.set_contact_order(order);
            report.result.stable = true;
            report.success = true;
            Ok(report)
        }
        None => {
            let mut result = initial;
            result.stable = false;
            result.set_contact_order(order);
            Ok(ProjectionReport::failure(result))
        }
    }
}
