//! Post-processing of a contact sequence.
//!
//! Each pass looks at consecutive frames and drops the ones that do not
//! contribute a contact transition. The first and last frames are always
//! kept.

use tracing::debug;

use footfall_core::{State, StateFrame};

/// Configurations closer than this (max norm) are the same.
pub const SAME_CONFIGURATION_TOLERANCE: f64 = 1e-6;

/// Drop redundant frames.
///
/// With `deep`, repositioning, break-create and obsolete passes run until
/// the sequence stops shrinking. Otherwise only the obsolete pass runs, once.
pub fn filter_states(frames: &[StateFrame], deep: bool) -> Vec<StateFrame> {
    if !deep {
        return filter_obsolete(frames);
    }
    let mut filtered = frames.to_vec();
    loop {
        let size = filtered.len();
        filtered = filter_repositioning(&filtered);
        filtered = filter_break_create(&filtered);
        filtered = filter_obsolete(&filtered);
        if filtered.len() == size {
            return filtered;
        }
    }
}

/// Drop `B` in `(A, B, C)` when `C` makes the same breaks from `A` as `B`
/// does and creates, from `B`, what `B` created from `A`: `B` was a
/// repositioning that `C` repeats.
pub fn filter_repositioning(frames: &[StateFrame]) -> Vec<StateFrame> {
    filter_triples(frames, |a, b, c| {
        b.contact_breaks(a) == c.contact_breaks(a) && b.contact_creations(a) == c.contact_creations(b)
    })
}

/// Drop `B` in `(A, B, C)` when `B` only breaks contacts that `C`
/// immediately recreates.
pub fn filter_break_create(frames: &[StateFrame]) -> Vec<StateFrame> {
    filter_triples(frames, |a, b, c| {
        b.contact_creations(a).is_empty()
            && c.contact_breaks(b).is_empty()
            && c.contact_creations(b) == b.contact_breaks(a)
    })
}

/// Drop frames that neither move nor change contacts relative to the last
/// kept frame.
pub fn filter_obsolete(frames: &[StateFrame]) -> Vec<StateFrame> {
    let Some((first, rest)) = frames.split_first() else {
        return Vec::new();
    };
    let mut filtered = vec![first.clone()];
    for (i, frame) in rest.iter().enumerate() {
        let is_last = i + 1 == rest.len();
        let Some(kept) = filtered.last() else {
            break;
        };
        if !is_last && is_obsolete(&kept.state, &frame.state) {
            continue;
        }
        filtered.push(frame.clone());
    }
    filtered
}

fn is_obsolete(previous: &State, state: &State) -> bool {
    state.same_configuration(previous, SAME_CONFIGURATION_TOLERANCE)
        && state.contact_breaks(previous).is_empty()
        && state.contact_creations(previous).is_empty()
}

/// Walk triples `(A, B, C)`: a dropped `B` makes `C` the next `A`.
fn filter_triples(frames: &[StateFrame], drop_middle: impl Fn(&State, &State, &State) -> bool) -> Vec<StateFrame> {
    if frames.len() < 3 {
        return frames.to_vec();
    }
    let mut filtered = vec![frames[0].clone()];
    let mut a = 0;
    while a + 2 < frames.len() {
        let (fa, fb, fc) = (&frames[a], &frames[a + 1], &frames[a + 2]);
        if drop_middle(&fa.state, &fb.state, &fc.state) {
            filtered.push(fc.clone());
            a += 2;
        } else {
            filtered.push(fb.clone());
            a += 1;
        }
    }
    filtered.extend_from_slice(&frames[a + 1..]);
    filtered
}

/// Log transitions that break or create more than one contact.
pub fn log_multiple_transitions(frames: &[StateFrame]) {
    for pair in frames.windows(2) {
        let (previous, frame) = (&pair[0], &pair[1]);
        let breaks = frame.state.contact_breaks(&previous.state);
        let creations = frame.state.contact_creations(&previous.state);
        if breaks.len() > 1 || creations.len() > 1 {
            debug!(time = frame.time, ?breaks, ?creations, "multiple contact changes");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
