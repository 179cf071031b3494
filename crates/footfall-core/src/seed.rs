//! Deterministic seed derivation.
//!
//! Every random stream of the planner (per-limb sample generation, the
//! shared heuristic stream) is derived from the single planner seed, so a
//! whole interpolation is reproducible from that one value.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Derive a child seed from a parent seed and a string key.
///
/// # Example
///
/// ```
/// use footfall_core::seed::derive_seed;
///
/// let child = derive_seed(42, "samples:lf");
/// assert_ne!(child, 42);
/// assert_eq!(child, derive_seed(42, "samples:lf"));
/// ```
#[must_use]
pub fn derive_seed(parent: u64, key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    parent.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

/// Seed of the contact-sample set of `limb`.
#[must_use]
pub fn limb_samples_seed(root: u64, limb: &str) -> u64 {
    derive_seed(root, &format!("samples:{limb}"))
}

/// Seed of the heuristic stream shared by a robot.
#[must_use]
pub fn heuristic_seed(root: u64) -> u64 {
    derive_seed(root, "heuristic")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_seed_deterministic() {
        assert_eq!(derive_seed(42, "hello"), derive_seed(42, "hello"));
    }

    #[test]
    fn derive_seed_different_keys() {
        assert_ne!(derive_seed(42, "a"), derive_seed(42, "b"));
    }

    #[test]
    fn derive_seed_different_parents() {
        assert_ne!(derive_seed(1, "key"), derive_seed(2, "key"));
    }

    #[test]
    fn limb_seeds_differ() {
        assert_ne!(limb_samples_seed(7, "lf"), limb_samples_seed(7, "rf"));
        assert_ne!(limb_samples_seed(7, "lf"), heuristic_seed(7));
    }
}
