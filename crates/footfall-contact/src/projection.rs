//! Projection of states and samples under contact constraints.

use nalgebra::{DVector, Isometry3, Matrix3, Translation3, UnitQuaternion, Vector3};
use tracing::trace;

use footfall_core::{ContactError, ProjectionReport, ProjectionStatus, State};
use footfall_ik::{Constraints, EffectorPin, IkTarget};
use footfall_stability::ContactKind;

use crate::fullbody::FullBody;
use crate::limb::Limb;
use crate::sampling::SampleReport;

/// Pin holding `limb` at a contact. Planar contacts also pin orientation.
fn contact_pin<'a>(limb: &'a Limb, position: &Vector3<f64>, rotation: &Matrix3<f64>) -> EffectorPin<'a> {
    let target = match limb.kind {
        ContactKind::Point => IkTarget::Position(*position),
        ContactKind::Planar { .. } => IkTarget::Pose(Isometry3::from_parts(
            Translation3::from(*position),
            UnitQuaternion::from_matrix(rotation),
        )),
    };
    EffectorPin {
        limb: &limb.name,
        chain: &limb.chain,
        joint_offset: limb.joint_offset,
        target,
    }
}

/// Pins for every contact of `state` except `skip`.
fn state_pins<'a>(
    fullbody: &'a FullBody,
    state: &State,
    skip: Option<&str>,
) -> Result<Vec<EffectorPin<'a>>, ContactError> {
    let mut pins = Vec::with_capacity(state.nb_contacts());
    for name in state.contact_limbs() {
        if Some(name) == skip {
            continue;
        }
        let limb = fullbody.limb(name)?;
        if let (Some(position), Some(rotation)) = (state.contact_position(name), state.contact_rotation(name)) {
            pins.push(contact_pin(limb, position, rotation));
        }
    }
    Ok(pins)
}

/// Move `state`'s contacts onto `target`: lock the root to the target's and
/// keep every contact of `state` in place.
///
/// Starts from `target`, so limbs without a contact keep the target's joint
/// values. The result is never marked stable.
pub fn project_to_root_configuration(
    fullbody: &FullBody,
    target: &DVector<f64>,
    state: &State,
) -> Result<ProjectionReport, ContactError> {
    let device = fullbody.device();
    let mut constraints = Constraints::new().lock_root(device.root_transform(target));
    for pin in state_pins(fullbody, state, None)? {
        constraints.pin(pin);
    }
    let (success, configuration) = fullbody.projector().apply(device, target, &constraints);
    Ok(projected(state, configuration, success))
}

/// `state` moved to `configuration`, flagged unstable.
fn projected(state: &State, configuration: DVector<f64>, success: bool) -> ProjectionReport {
    let mut result = state.clone();
    result.configuration = configuration;
    result.stable = false;
    let status = if success {
        ProjectionStatus::UnstableContact
    } else {
        ProjectionStatus::NoContact
    };
    ProjectionReport::new(success, status, result)
}

/// Move the root of `state` to `target` keeping its orientation and every
/// contact in place.
///
/// Starts from `state`'s configuration. The result is never marked stable.
pub fn project_to_root_position(
    fullbody: &FullBody,
    target: &Vector3<f64>,
    state: &State,
) -> Result<ProjectionReport, ContactError> {
    let device = fullbody.device();
    device.check_size(&state.configuration)?;
    let mut constraints = Constraints::new().lock_root_position(*target);
    for pin in state_pins(fullbody, state, None)? {
        constraints.pin(pin);
    }
    let (success, configuration) = fullbody.projector().apply(device, &state.configuration, &constraints);
    Ok(projected(state, configuration, success))
}

/// Load `report`'s sample into `limb` and pin its effector on the surface,
/// keeping the other contacts of `state`.
///
/// Planar effectors are also turned so their sole normal matches the
/// surface normal. On success the limb's contact is added to the result,
/// which must also pass the limb's and the whole body's collision checks.
pub fn project_sample_to_obstacle(
    fullbody: &FullBody,
    limb: &Limb,
    report: &SampleReport,
    state: &State,
) -> Result<ProjectionReport, ContactError> {
    let failure = || ProjectionReport::failure(state.clone());
    let Some(sample) = limb.samples.get(report.sample_id) else {
        return Ok(failure());
    };

    let device = fullbody.device();
    let mut configuration = state.configuration.clone();
    limb.set_joint_values(&mut configuration, &sample.joint_values);
    let root = device.root_transform(&configuration);

    let effector_rotation = root.rotation * sample.effector_pose.rotation;
    let sole_normal = effector_rotation * limb.effector_normal;
    let Some(align) = UnitQuaternion::rotation_between(&sole_normal, &report.normal) else {
        return Ok(failure());
    };
    let rotation = (align * effector_rotation).to_rotation_matrix().into_inner();

    let mut constraints = Constraints::new().lock_root(root);
    for pin in state_pins(fullbody, state, Some(&limb.name))? {
        constraints.pin(pin);
    }
    constraints.pin(contact_pin(limb, &report.contact_point, &rotation));

    let (success, configuration) = fullbody.projector().apply(device, &configuration, &constraints);
    if !success {
        return Ok(failure());
    }
    if let Err(collision) = fullbody.limb_collision(&limb.name)?.validate(&configuration) {
        trace!(limb = %limb.name, %collision, "projected sample in collision");
        return Ok(failure());
    }
    if let Err(collision) = fullbody.collision().validate(&configuration) {
        trace!(limb = %limb.name, %collision, "projected body in collision");
        return Ok(failure());
    }

    let pose = limb.effector_transform(&configuration);
    let mut result = state.clone();
    result.configuration = configuration;
    result.stable = false;
    result.add_contact(
        &limb.name,
        pose.translation.vector,
        report.normal,
        pose.rotation.to_rotation_matrix().into_inner(),
    );
    Ok(ProjectionReport::new(true, ProjectionStatus::UnstableContact, result))
}

/// Put the free `limb` of `state` in a collision-free configuration.
///
/// Keeps the current joint values when they are valid, otherwise takes the
/// first valid sample. Fails with `state` unchanged when none is.
pub fn set_collision_free(fullbody: &FullBody, limb: &Limb, state: &State) -> Result<ProjectionReport, ContactError> {
    let validator = fullbody.limb_collision(&limb.name)?;
    if validator.is_valid(&state.configuration) {
        return Ok(ProjectionReport::new(true, ProjectionStatus::NoContact, state.clone()));
    }

    let mut configuration = state.configuration.clone();
    for sample in limb.samples.samples() {
        limb.set_joint_values(&mut configuration, &sample.joint_values);
        if validator.is_valid(&configuration) {
            fullbody.device().set_current_configuration(&configuration);
            let mut result = state.clone();
            result.configuration = configuration;
            return Ok(ProjectionReport::new(true, ProjectionStatus::NoContact, result));
        }
    }
    trace!(limb = %limb.name, "no collision-free sample");
    Ok(ProjectionReport::failure(state.clone()))
}
