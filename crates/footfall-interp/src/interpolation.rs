//! Guide-path interpolation into a timed contact sequence.
//!
//! The interpolator walks a guide path at a fixed time step. Each sample
//! becomes a target configuration (guide root and extra config over the
//! previous target's joints, root raised by `root_height_offset`) and goes
//! through [`compute_contacts`] from the last accepted state.
//!
//! Around each cascade:
//! - a failed cascade skips the next sample, and the run aborts once
//!   `max_failures` is exceeded;
//! - a cascade that broke too many contacts while failures are not allowed
//!   is discarded and the same sample is retried with failures allowed;
//! - a cascade that repositioned a contact is accepted and the same sample
//!   is retried from it;
//! - a cascade that changes no contact replaces the previous frame;
//! - failures are allowed while fewer than `max_recontacts` retries
//!   happened in a row.

use nalgebra::{DVector, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use footfall_contact::{FullBody, GenerationParams, compute_contacts};
use footfall_core::{
    AffordanceFilter, AffordanceMap, ContactError, ContactGenConfig, FootfallError,
    InterpolationConfig, PlannerConfig, State, StateFrame,
};

use crate::filter::{filter_states, log_multiple_transitions};
use crate::path::GuidePath;

/// Path samples closer than this to the end of the path are dropped.
const END_TIME_EPSILON: f64 = 1e-9;

/// Why an interpolation run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Every sample was processed and the end state appended.
    Completed,
    /// More consecutive samples failed than `max_failures`.
    TooManyFailures,
    /// More repositionings than `max_repositionings`.
    TooManyRepositionings,
    /// A required limb had no affordance object to contact.
    MissingAffordances(String),
}

/// Outcome of an interpolation run.
///
/// Aborted runs keep the frames accumulated so far. The end state is only
/// appended when the run completes.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub frames: Vec<StateFrame>,
    pub termination: Termination,
    /// Samples skipped after a failed cascade.
    pub failures: usize,
    pub repositionings: usize,
}

impl Interpolation {
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed
    }
}

#[derive(Debug, Default)]
struct Counters {
    failures: usize,
    consecutive_failures: usize,
    recontacts: usize,
    repositionings: usize,
}

// ---------------------------------------------------------------------------
// Interpolator
// ---------------------------------------------------------------------------

/// Realises a guide path with contacts between a start and an end state.
#[derive(Debug)]
pub struct Interpolator<'a> {
    fullbody: &'a FullBody,
    start: State,
    end: State,
    contact: ContactGenConfig,
    config: InterpolationConfig,
}

impl<'a> Interpolator<'a> {
    pub fn new(fullbody: &'a FullBody, start: State, end: State) -> Result<Self, ContactError> {
        let device = fullbody.device();
        device.check_size(&start.configuration)?;
        device.check_size(&end.configuration)?;
        Ok(Self {
            fullbody,
            start,
            end,
            contact: ContactGenConfig::default(),
            config: InterpolationConfig::default(),
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: InterpolationConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_contact_config(mut self, contact: ContactGenConfig) -> Self {
        self.contact = contact;
        self
    }

    /// Take the contact and interpolation sections of `planner`.
    #[must_use]
    pub fn with_planner_config(mut self, planner: &PlannerConfig) -> Self {
        self.contact = planner.contact;
        self.config = planner.interpolation;
        self
    }

    pub const fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    pub const fn contact_config(&self) -> &ContactGenConfig {
        &self.contact
    }

    /// Sample `path` every `time_step` and compute contacts along it.
    ///
    /// Samples lie strictly inside `(0, length)`; the start state sits at
    /// time 0 and the end state at `length`.
    pub fn interpolate(
        &self,
        path: &dyn GuidePath,
        affordances: &AffordanceMap,
        filter: &AffordanceFilter,
    ) -> Result<Interpolation, FootfallError> {
        self.config.validate()?;
        let length = path.length();
        self.fullbody.device().check_size(&path.configuration_at(0.0))?;

        let mut previous = self.start.configuration.clone();
        let mut samples = Vec::new();
        for time in sample_times(length, self.config.time_step) {
            let target = self.guide_target(&previous, &path.configuration_at(time));
            previous.clone_from(&target);
            samples.push((time, target));
        }
        self.run(&samples, length, affordances, filter)
    }

    /// Compute contacts through explicit target configurations.
    ///
    /// Target `k` is used as-is at time `(k + 1) * time_step`; the end state
    /// follows one step after the last target.
    pub fn interpolate_configurations(
        &self,
        configurations: &[DVector<f64>],
        affordances: &AffordanceMap,
        filter: &AffordanceFilter,
    ) -> Result<Interpolation, FootfallError> {
        self.config.validate()?;
        let device = self.fullbody.device();
        for configuration in configurations {
            device.check_size(configuration)?;
        }
        let step = self.config.time_step;
        let samples: Vec<(f64, DVector<f64>)> = configurations
            .iter()
            .enumerate()
            .map(|(k, q)| ((k + 1) as f64 * step, q.clone()))
            .collect();
        let end_time = (configurations.len() + 1) as f64 * step;
        self.run(&samples, end_time, affordances, filter)
    }

    fn run(
        &self,
        samples: &[(f64, DVector<f64>)],
        end_time: f64,
        affordances: &AffordanceMap,
        filter: &AffordanceFilter,
    ) -> Result<Interpolation, FootfallError> {
        let _scope = self.fullbody.device().scope();
        info!(samples = samples.len(), end_time, "interpolating guide path");

        let mut frames = vec![StateFrame::new(0.0, self.start.clone())];
        let mut counters = Counters::default();
        let mut allow_failure = true;
        let mut index = 0;

        while let Some((time, target)) = samples.get(index) {
            let time = *time;
            let Some(last) = frames.last() else {
                break;
            };
            let previous = &last.state;
            let params = self.params(previous, target);
            let report = match compute_contacts(previous, self.fullbody, target, affordances, filter, params) {
                Ok(report) => report,
                Err(ContactError::NoAffordanceObjects(limb)) => {
                    warn!(time, %limb, "required limb has no affordance object");
                    return Ok(self.finish(frames, Termination::MissingAffordances(limb), &counters));
                }
                Err(err) => return Err(err.into()),
            };

            if report.multiple_breaks && !allow_failure {
                // step back: the same sample again, this time allowed to fail
                counters.recontacts += 1;
                if counters.recontacts > self.config.recontact_limit {
                    warn!(time, retries = counters.recontacts, "sample retried too often");
                    return Ok(self.finish(frames, Termination::TooManyFailures, &counters));
                }
                debug!(time, "too many contacts broken, retrying the sample");
                allow_failure = true;
                continue;
            }
            if !report.success() || report.multiple_breaks {
                counters.failures += 1;
                counters.consecutive_failures += 1;
                if counters.consecutive_failures > self.config.max_failures {
                    warn!(time, failures = counters.consecutive_failures, "too many failures");
                    return Ok(self.finish(frames, Termination::TooManyFailures, &counters));
                }
                debug!(time, "contact computation failed, skipping a sample");
                index += 2;
                continue;
            }

            let retry = report.repositioned_in_place;
            if retry {
                counters.recontacts += 1;
                if counters.recontacts > self.config.recontact_limit {
                    warn!(time, retries = counters.recontacts, "sample retried too often");
                    return Ok(self.finish(frames, Termination::TooManyFailures, &counters));
                }
                counters.repositionings += 1;
                if counters.repositionings > self.config.max_repositionings {
                    warn!(time, repositionings = counters.repositionings, "too many repositionings");
                    return Ok(self.finish(frames, Termination::TooManyRepositionings, &counters));
                }
            } else {
                counters.recontacts = 0;
            }

            let unchanged = report.contact_maintained
                && report.contacts_broken.is_empty()
                && report.contacts_created.is_empty();
            if self.config.merge_unchanged_frames && !retry && unchanged && frames.len() > 1 {
                frames.pop();
            }

            // a retried sample lands between the last frame and its own time
            let frame_time = match frames.last() {
                Some(last) if retry => 0.5 * (last.time + time),
                _ => time,
            };
            debug!(
                time = frame_time,
                broken = ?report.contacts_broken,
                created = ?report.contacts_created,
                repositioned = report.repositioned_in_place,
                "sample accepted"
            );
            frames.push(StateFrame::new(frame_time, report.projection.result));
            counters.consecutive_failures = 0;
            allow_failure = counters.recontacts < self.config.max_recontacts;
            if !retry {
                index += 1;
            }
        }

        frames.push(StateFrame::new(end_time, self.end.clone()));
        info!(
            frames = frames.len(),
            failures = counters.failures,
            repositionings = counters.repositionings,
            "interpolation completed"
        );
        Ok(self.finish(frames, Termination::Completed, &counters))
    }

    fn finish(&self, frames: Vec<StateFrame>, termination: Termination, counters: &Counters) -> Interpolation {
        log_multiple_transitions(&frames);
        let frames = if self.config.filter_states {
            let filtered = filter_states(&frames, true);
            debug!(before = frames.len(), after = filtered.len(), "states filtered");
            log_multiple_transitions(&filtered);
            filtered
        } else {
            frames
        };
        Interpolation {
            frames,
            termination,
            failures: counters.failures,
            repositionings: counters.repositionings,
        }
    }

    /// Guide root and extra config over `previous`, root raised.
    fn guide_target(&self, previous: &DVector<f64>, guide: &DVector<f64>) -> DVector<f64> {
        let device = self.fullbody.device();
        let mut target = previous.clone();
        device.copy_root(guide, &mut target);
        let (offset, dim) = (device.extra_offset(), device.extra_config_dim());
        target.rows_mut(offset, dim).copy_from(&guide.rows(offset, dim));
        target[2] += self.config.root_height_offset;
        target
    }

    fn params(&self, previous: &State, target: &DVector<f64>) -> GenerationParams {
        let motion: Vector3<f64> = target.fixed_rows::<3>(0) - previous.configuration.fixed_rows::<3>(0);
        GenerationParams {
            config: self.contact,
            robustness_threshold: self.config.robustness_threshold,
            direction: motion.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::z),
            acceleration: self.fullbody.device().acceleration(target),
        }
    }
}

/// Sample times `k * step` for `k >= 1`, strictly before `length`.
fn sample_times(length: f64, step: f64) -> Vec<f64> {
    (1_usize..)
        .map(|k| k as f64 * step)
        .take_while(|time| *time < length - END_TIME_EPSILON)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use footfall_test_utils::{flat_ground, quadruped, standing_state, support_filter};

    use crate::path::LinearPath;

    #[test]
    fn sample_times_stop_before_the_end() {
        let times = sample_times(1.0, 0.1);
        assert_eq!(times.len(), 9);
        assert_relative_eq!(times[0], 0.1);
        assert_relative_eq!(times[8], 0.9, epsilon = 1e-12);
        assert_eq!(sample_times(0.25, 0.1).len(), 2);
        assert!(sample_times(0.0, 0.1).is_empty());
        assert!(sample_times(0.1, 0.1).is_empty());
    }

    #[test]
    fn zero_length_path_returns_start_and_end() {
        let (affordances, obstacles) = flat_ground();
        let body = quadruped(obstacles, 1);
        let start = standing_state(&body, 0.0, [0.0; 4]);
        let end = standing_state(&body, 0.0, [0.1; 4]);
        let path = LinearPath::constant(start.configuration.clone(), 0.0).unwrap();

        let run = Interpolator::new(&body, start.clone(), end.clone())
            .unwrap()
            .interpolate(&path, &affordances, &support_filter())
            .unwrap();

        assert!(run.is_complete());
        assert_eq!(run.frames, vec![StateFrame::new(0.0, start), StateFrame::new(0.0, end)]);
        assert_eq!(run.failures, 0);
        assert_eq!(run.repositionings, 0);
    }

    #[test]
    fn targets_take_the_guide_root_and_keep_joints() {
        let (_, obstacles) = flat_ground();
        let body = quadruped(obstacles, 2);
        let start = standing_state(&body, 0.0, [0.1; 4]);
        let device = body.device();

        let mut guide = device.neutral_configuration();
        guide[0] = 1.0;
        guide[2] = 0.5;
        device.set_direction(&mut guide, &Vector3::x());
        device.set_acceleration(&mut guide, &Vector3::new(0.0, 0.2, 0.0));

        let interpolator = Interpolator::new(&body, start.clone(), start.clone()).unwrap();
        let target = interpolator.guide_target(&start.configuration, &guide);

        assert_relative_eq!(target[0], 1.0);
        assert_relative_eq!(target[2], 0.6, epsilon = 1e-12);
        let joints = device.extra_offset() - 7;
        assert_eq!(
            target.rows(7, joints).clone_owned(),
            start.configuration.rows(7, joints).clone_owned()
        );
        assert_relative_eq!(device.direction(&target), Vector3::x());
        assert_relative_eq!(device.acceleration(&target), Vector3::new(0.0, 0.2, 0.0));
    }

    #[test]
    fn direction_follows_the_root_or_points_up() {
        let (_, obstacles) = flat_ground();
        let body = quadruped(obstacles, 3);
        let start = standing_state(&body, 0.0, [0.0; 4]);
        let interpolator = Interpolator::new(&body, start.clone(), start.clone()).unwrap();

        let still = interpolator.params(&start, &start.configuration);
        assert_relative_eq!(still.direction, Vector3::z());

        let mut ahead = start.configuration.clone();
        ahead[0] += 0.3;
        let moving = interpolator.params(&start, &ahead);
        assert_relative_eq!(moving.direction, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn mismatched_states_are_rejected() {
        let (_, obstacles) = flat_ground();
        let body = quadruped(obstacles, 4);
        let start = standing_state(&body, 0.0, [0.0; 4]);
        let bad = State::new(DVector::zeros(3));
        assert!(matches!(
            Interpolator::new(&body, start, bad),
            Err(ContactError::ConfigurationSize { got: 3, .. })
        ));
    }

    #[test]
    fn invalid_time_step_is_rejected() {
        let (affordances, obstacles) = flat_ground();
        let body = quadruped(obstacles, 5);
        let start = standing_state(&body, 0.0, [0.0; 4]);
        let path = LinearPath::constant(start.configuration.clone(), 1.0).unwrap();
        let config = InterpolationConfig {
            time_step: 0.0,
            ..InterpolationConfig::default()
        };

        let result = Interpolator::new(&body, start.clone(), start)
            .unwrap()
            .with_config(config)
            .interpolate(&path, &affordances, &support_filter());
        assert!(matches!(result, Err(FootfallError::Config(_))));
    }

    #[test]
    fn planner_config_sections_are_taken() {
        let (_, obstacles) = flat_ground();
        let body = quadruped(obstacles, 6);
        let start = standing_state(&body, 0.0, [0.0; 4]);
        let mut planner = PlannerConfig::default();
        planner.contact.max_contact_breaks = 0;
        planner.interpolation.root_height_offset = 0.02;

        let interpolator = Interpolator::new(&body, start.clone(), start)
            .unwrap()
            .with_planner_config(&planner);
        assert_eq!(interpolator.contact_config().max_contact_breaks, 0);
        assert_relative_eq!(interpolator.config().root_height_offset, 0.02);
    }
}
