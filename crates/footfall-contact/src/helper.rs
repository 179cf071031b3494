//! Shared context of one contact-generation cascade.

use std::collections::VecDeque;

use nalgebra::{DVector, Vector3};

use footfall_core::{AffordanceFilter, AffordanceMap, ContactError, ContactGenConfig, State};

use crate::fullbody::FullBody;

/// Parameters of a contact computation that do not depend on the robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub config: ContactGenConfig,
    /// Minimum robustness for a state to count as stable.
    pub robustness_threshold: f64,
    /// Unit motion direction, used to rank candidate contacts.
    pub direction: Vector3<f64>,
    /// Acceleration of the centre of mass.
    pub acceleration: Vector3<f64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            config: ContactGenConfig::default(),
            robustness_threshold: 0.0,
            direction: Vector3::z(),
            acceleration: Vector3::zeros(),
        }
    }
}

/// Context threaded through maintain, generate and reposition.
///
/// `working_state` starts as the previous contacts at the target
/// configuration and is refined by each stage. `candidates` holds the
/// maintenance candidates that have not been tried yet.
#[derive(Debug)]
pub struct ContactGenHelper<'a> {
    pub fullbody: &'a FullBody,
    pub previous: &'a State,
    pub affordances: &'a AffordanceMap,
    pub filter: &'a AffordanceFilter,
    pub params: GenerationParams,
    pub working_state: State,
    pub(crate) candidates: VecDeque<State>,
}

impl<'a> ContactGenHelper<'a> {
    pub fn new(
        fullbody: &'a FullBody,
        previous: &'a State,
        target: &DVector<f64>,
        affordances: &'a AffordanceMap,
        filter: &'a AffordanceFilter,
        params: GenerationParams,
    ) -> Result<Self, ContactError> {
        let device = fullbody.device();
        device.check_size(&previous.configuration)?;
        device.check_size(target)?;
        device.set_current_configuration(target);

        let mut working_state = previous.clone();
        working_state.configuration = target.clone();
        working_state.stable = false;

        Ok(Self {
            fullbody,
            previous,
            affordances,
            filter,
            params,
            working_state,
            candidates: VecDeque::new(),
        })
    }

    /// Robustness of `state` under the cascade's acceleration.
    pub fn robustness(&self, state: &State) -> f64 {
        self.fullbody.robustness(state, &self.params.acceleration)
    }

    pub fn is_stable(&self, state: &State) -> bool {
        self.robustness(state) >= self.params.robustness_threshold
    }
}
