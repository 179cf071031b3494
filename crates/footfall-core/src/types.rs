use std::collections::{BTreeMap, VecDeque};

use nalgebra::{DVector, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Distance under which two contact positions are considered the same.
pub const CONTACT_POSITION_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Whole-body snapshot: configuration, held contacts and stability flag.
///
/// The contact maps are private so that a limb is either present in all of
/// them (and in the creation order) or in none. `contacts` keeps an explicit
/// `false` entry for limbs whose contact has been removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub configuration: DVector<f64>,
    pub stable: bool,
    contacts: BTreeMap<String, bool>,
    contact_positions: BTreeMap<String, Vector3<f64>>,
    contact_normals: BTreeMap<String, Vector3<f64>>,
    contact_rotations: BTreeMap<String, Matrix3<f64>>,
    contact_order: VecDeque<String>,
}

impl State {
    /// A contact-free, unstable state at `configuration`.
    pub fn new(configuration: DVector<f64>) -> Self {
        Self {
            configuration,
            stable: false,
            contacts: BTreeMap::new(),
            contact_positions: BTreeMap::new(),
            contact_normals: BTreeMap::new(),
            contact_rotations: BTreeMap::new(),
            contact_order: VecDeque::new(),
        }
    }

    /// Record a contact for `limb`.
    ///
    /// A limb already in contact is updated in place and moved to the back of
    /// the creation order, since the contact is new.
    pub fn add_contact(
        &mut self,
        limb: &str,
        position: Vector3<f64>,
        normal: Vector3<f64>,
        rotation: Matrix3<f64>,
    ) {
        self.contact_order.retain(|l| l != limb);
        self.contact_order.push_back(limb.to_owned());
        self.contacts.insert(limb.to_owned(), true);
        self.contact_positions.insert(limb.to_owned(), position);
        self.contact_normals.insert(limb.to_owned(), normal);
        self.contact_rotations.insert(limb.to_owned(), rotation);
    }

    /// Remove the contact of `limb`. Returns `false` if it held none.
    pub fn remove_contact(&mut self, limb: &str) -> bool {
        if !self.in_contact(limb) {
            return false;
        }
        self.contacts.insert(limb.to_owned(), false);
        self.contact_positions.remove(limb);
        self.contact_normals.remove(limb);
        self.contact_rotations.remove(limb);
        self.contact_order.retain(|l| l != limb);
        true
    }

    pub fn in_contact(&self, limb: &str) -> bool {
        self.contacts.get(limb).copied().unwrap_or(false)
    }

    pub fn contacts(&self) -> &BTreeMap<String, bool> {
        &self.contacts
    }

    pub fn contact_position(&self, limb: &str) -> Option<&Vector3<f64>> {
        self.contact_positions.get(limb)
    }

    pub fn contact_normal(&self, limb: &str) -> Option<&Vector3<f64>> {
        self.contact_normals.get(limb)
    }

    pub fn contact_rotation(&self, limb: &str) -> Option<&Matrix3<f64>> {
        self.contact_rotations.get(limb)
    }

    pub fn contact_positions(&self) -> &BTreeMap<String, Vector3<f64>> {
        &self.contact_positions
    }

    /// Limbs in contact, sorted by name.
    pub fn contact_limbs(&self) -> impl Iterator<Item = &str> {
        self.contact_positions.keys().map(String::as_str)
    }

    /// Limbs in contact, oldest first.
    pub fn contact_order(&self) -> &VecDeque<String> {
        &self.contact_order
    }

    /// Replace the creation order.
    ///
    /// Entries that are not in contact or repeated are dropped; contact limbs
    /// missing from `order` are appended in name order.
    pub fn set_contact_order(&mut self, order: impl IntoIterator<Item = String>) {
        let mut rebuilt: VecDeque<String> = VecDeque::new();
        for limb in order {
            if self.in_contact(&limb) && !rebuilt.contains(&limb) {
                rebuilt.push_back(limb);
            }
        }
        for limb in self.contact_positions.keys() {
            if !rebuilt.contains(limb) {
                rebuilt.push_back(limb.clone());
            }
        }
        self.contact_order = rebuilt;
    }

    pub fn nb_contacts(&self) -> usize {
        self.contact_normals.len()
    }

    /// Limbs of `limbs` that hold no contact, in the given order.
    pub fn free_limbs<'a>(&self, limbs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        limbs
            .into_iter()
            .filter(|l| !self.in_contact(l))
            .map(str::to_owned)
            .collect()
    }

    /// Contacts of `previous` that `self` no longer holds at the same place.
    pub fn contact_breaks(&self, previous: &Self) -> Vec<String> {
        previous
            .contact_positions
            .iter()
            .filter(|(limb, pos)| !self.holds_contact_at(limb, pos))
            .map(|(limb, _)| limb.clone())
            .collect()
    }

    /// Contacts of `self` that `previous` did not hold at the same place.
    pub fn contact_creations(&self, previous: &Self) -> Vec<String> {
        previous.contact_breaks(self)
    }

    /// Whether both states have contacts on the same limbs.
    pub fn has_same_contacts(&self, other: &Self) -> bool {
        self.contact_positions.len() == other.contact_positions.len()
            && self
                .contact_positions
                .keys()
                .all(|l| other.contact_positions.contains_key(l))
    }

    /// Configuration equality within `tolerance` (max norm).
    pub fn same_configuration(&self, other: &Self, tolerance: f64) -> bool {
        self.configuration.len() == other.configuration.len()
            && self
                .configuration
                .iter()
                .zip(other.configuration.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Check that every contact limb appears in all maps and in the order.
    pub fn is_consistent(&self) -> bool {
        let in_contact: Vec<&String> = self
            .contacts
            .iter()
            .filter(|(_, c)| **c)
            .map(|(l, _)| l)
            .collect();
        let n = in_contact.len();
        self.contact_positions.len() == n
            && self.contact_normals.len() == n
            && self.contact_rotations.len() == n
            && self.contact_order.len() == n
            && in_contact.iter().all(|l| {
                self.contact_positions.contains_key(*l)
                    && self.contact_normals.contains_key(*l)
                    && self.contact_rotations.contains_key(*l)
                    && self.contact_order.contains(*l)
            })
    }

    fn holds_contact_at(&self, limb: &str, position: &Vector3<f64>) -> bool {
        self.contact_positions
            .get(limb)
            .is_some_and(|p| (p - position).norm() <= CONTACT_POSITION_EPSILON)
    }
}

// ---------------------------------------------------------------------------
// StateFrame
// ---------------------------------------------------------------------------

/// A state stamped with its guide-path time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFrame {
    pub time: f64,
    pub state: State,
}

impl StateFrame {
    pub const fn new(time: f64, state: State) -> Self {
        Self { time, state }
    }
}

// ---------------------------------------------------------------------------
// ProjectionReport
// ---------------------------------------------------------------------------

/// Outcome of a contact projection or generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionStatus {
    StableContact,
    UnstableContact,
    NoContact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub success: bool,
    pub status: ProjectionStatus,
    pub result: State,
}

impl ProjectionReport {
    pub const fn new(success: bool, status: ProjectionStatus, result: State) -> Self {
        Self {
            success,
            status,
            result,
        }
    }

    /// A failed report carrying `result` unchanged.
    pub const fn failure(result: State) -> Self {
        Self::new(false, ProjectionStatus::NoContact, result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn planted(limbs: &[(&str, [f64; 3])]) -> State {
        let mut state = State::new(DVector::zeros(13));
        for (limb, p) in limbs {
            state.add_contact(
                limb,
                Vector3::new(p[0], p[1], p[2]),
                Vector3::z(),
                Matrix3::identity(),
            );
        }
        state
    }

    #[test]
    fn new_state_has_no_contacts() {
        let state = State::new(DVector::zeros(4));
        assert_eq!(state.nb_contacts(), 0);
        assert!(!state.stable);
        assert!(state.contact_order().is_empty());
        assert!(state.is_consistent());
    }

    #[test]
    fn add_contact_keeps_maps_in_sync() {
        let state = planted(&[("lf", [0.4, 0.3, 0.0]), ("rh", [-0.4, -0.3, 0.0])]);
        assert_eq!(state.nb_contacts(), 2);
        assert!(state.in_contact("lf"));
        assert!(state.in_contact("rh"));
        assert!(!state.in_contact("rf"));
        assert_eq!(state.contact_order(), &VecDeque::from(["lf".to_owned(), "rh".to_owned()]));
        assert!(state.is_consistent());
    }

    #[test]
    fn readding_contact_moves_it_to_back() {
        let mut state = planted(&[("lf", [0.0; 3]), ("rf", [1.0, 0.0, 0.0])]);
        state.add_contact("lf", Vector3::new(0.5, 0.0, 0.0), Vector3::z(), Matrix3::identity());
        assert_eq!(state.contact_order(), &VecDeque::from(["rf".to_owned(), "lf".to_owned()]));
        assert_eq!(state.nb_contacts(), 2);
    }

    #[test]
    fn remove_contact_clears_every_map() {
        let mut state = planted(&[("lf", [0.0; 3]), ("rf", [1.0, 0.0, 0.0])]);
        assert!(state.remove_contact("lf"));
        assert!(!state.in_contact("lf"));
        assert_eq!(state.contacts().get("lf"), Some(&false));
        assert!(state.contact_position("lf").is_none());
        assert!(state.contact_normal("lf").is_none());
        assert!(state.contact_rotation("lf").is_none());
        assert_eq!(state.nb_contacts(), 1);
        assert!(state.is_consistent());
        assert!(!state.remove_contact("lf"));
    }

    #[test]
    fn set_contact_order_filters_and_completes() {
        let mut state = planted(&[("a", [0.0; 3]), ("b", [1.0, 0.0, 0.0]), ("c", [2.0, 0.0, 0.0])]);
        state.set_contact_order(vec!["c".to_owned(), "x".to_owned(), "c".to_owned(), "a".to_owned()]);
        assert_eq!(
            state.contact_order(),
            &VecDeque::from(["c".to_owned(), "a".to_owned(), "b".to_owned()])
        );
        assert!(state.is_consistent());
    }

    #[test]
    fn free_limbs_preserves_order() {
        let state = planted(&[("rf", [0.0; 3])]);
        let free = state.free_limbs(["rh", "rf", "lf"]);
        assert_eq!(free, vec!["rh".to_owned(), "lf".to_owned()]);
    }

    #[test]
    fn breaks_and_creations_by_id() {
        let previous = planted(&[("lf", [0.0; 3]), ("rf", [1.0, 0.0, 0.0])]);
        let next = planted(&[("rf", [1.0, 0.0, 0.0]), ("lh", [2.0, 0.0, 0.0])]);
        assert_eq!(next.contact_breaks(&previous), vec!["lf".to_owned()]);
        assert_eq!(next.contact_creations(&previous), vec!["lh".to_owned()]);
        assert!(!next.has_same_contacts(&previous));
    }

    #[test]
    fn moved_contact_is_break_and_creation() {
        let previous = planted(&[("lf", [0.0; 3])]);
        let next = planted(&[("lf", [0.3, 0.0, 0.0])]);
        assert_eq!(next.contact_breaks(&previous), vec!["lf".to_owned()]);
        assert_eq!(next.contact_creations(&previous), vec!["lf".to_owned()]);
        assert!(next.has_same_contacts(&previous));
    }

    #[test]
    fn unchanged_contacts_produce_no_transitions() {
        let previous = planted(&[("lf", [0.0; 3]), ("rf", [1.0, 0.0, 0.0])]);
        let next = previous.clone();
        assert!(next.contact_breaks(&previous).is_empty());
        assert!(next.contact_creations(&previous).is_empty());
    }

    #[test]
    fn same_configuration_uses_tolerance() {
        let a = State::new(DVector::from_vec(vec![0.0, 1.0]));
        let b = State::new(DVector::from_vec(vec![1e-9, 1.0]));
        let c = State::new(DVector::from_vec(vec![0.1, 1.0]));
        assert!(a.same_configuration(&b, 1e-6));
        assert!(!a.same_configuration(&c, 1e-6));
    }

    #[test]
    fn failure_report_has_no_contact_status() {
        let report = ProjectionReport::failure(State::new(DVector::zeros(2)));
        assert!(!report.success);
        assert_eq!(report.status, ProjectionStatus::NoContact);
    }
}
