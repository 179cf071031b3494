//! Timed contact sequences along a guide path.
//!
//! An [`Interpolator`] samples a [`GuidePath`] at a fixed time step and runs
//! the contact cascade of `footfall-contact` on every sample, producing a
//! sequence of [`StateFrame`](footfall_core::StateFrame)s bracketed by the
//! start and end states. [`filter_states`] then removes frames that do not
//! contribute a contact transition, and [`export`] writes the result as JSON.
//!
//! ```text
//! GuidePath ──► Interpolator ──► compute_contacts (per sample)
//!                    │
//!                    └──► filter_states ──► Interpolation { frames, termination }
//! ```

pub mod export;
pub mod filter;
pub mod interpolation;
pub mod path;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use export::{ExportError, frames_from_json, frames_to_json, read_frames, write_frames};
pub use filter::{
    SAME_CONFIGURATION_TOLERANCE, filter_break_create, filter_obsolete, filter_repositioning,
    filter_states, log_multiple_transitions,
};
pub use interpolation::{Interpolation, Interpolator, Termination};
pub use path::{GuidePath, LinearPath};
