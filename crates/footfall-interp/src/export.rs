//! JSON export of contact sequences.
//!
//! A sequence is written as a JSON array of [`StateFrame`]s. Reading checks
//! that times never decrease and that every state is consistent.

use std::io::{Read, Write};

use thiserror::Error;

use footfall_core::StateFrame;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid frame {index}: {reason}")]
    InvalidFrame { index: usize, reason: String },
}

pub fn frames_to_json(frames: &[StateFrame]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(frames)?)
}

pub fn frames_from_json(json: &str) -> Result<Vec<StateFrame>, ExportError> {
    let frames: Vec<StateFrame> = serde_json::from_str(json)?;
    check_frames(&frames)?;
    Ok(frames)
}

/// Write `frames` to `writer` and flush it.
pub fn write_frames(writer: &mut impl Write, frames: &[StateFrame]) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut *writer, frames)?;
    writer.flush()?;
    Ok(())
}

pub fn read_frames(reader: &mut impl Read) -> Result<Vec<StateFrame>, ExportError> {
    let frames: Vec<StateFrame> = serde_json::from_reader(reader)?;
    check_frames(&frames)?;
    Ok(frames)
}

fn check_frames(frames: &[StateFrame]) -> Result<(), ExportError> {
    for (index, frame) in frames.iter().enumerate() {
        if !frame.state.is_consistent() {
            return Err(ExportError::InvalidFrame {
                index,
                reason: "contact maps disagree".into(),
            });
        }
        if index > 0 && frame.time < frames[index - 1].time {
            return Err(ExportError::InvalidFrame {
                index,
                reason: format!("time {} goes back from {}", frame.time, frames[index - 1].time),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use footfall_core::State;
    use nalgebra::{DVector, Matrix3, Vector3};

    fn frame(time: f64) -> StateFrame {
        let mut state = State::new(DVector::from_vec(vec![time, 0.0, 0.6]));
        state.add_contact("lf", Vector3::new(0.2, 0.15, 0.0), Vector3::z(), Matrix3::identity());
        state.add_contact("rf", Vector3::new(0.2, -0.15, 0.0), Vector3::z(), Matrix3::identity());
        state.stable = true;
        StateFrame::new(time, state)
    }

    #[test]
    fn frames_survive_json() {
        let frames = vec![frame(0.0), frame(0.5)];
        let json = frames_to_json(&frames).unwrap();
        let back = frames_from_json(&json).unwrap();
        assert_eq!(back, frames);
        assert_eq!(
            back[1].state.contact_order().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["lf", "rf"]
        );
    }

    #[test]
    fn writer_and_reader_agree() {
        let frames = vec![frame(0.0), frame(0.1), frame(0.2)];
        let mut buffer = Vec::new();
        write_frames(&mut buffer, &frames).unwrap();
        let back = read_frames(&mut buffer.as_slice()).unwrap();
        assert_eq!(back, frames);
    }

    #[test]
    fn decreasing_times_are_rejected() {
        let json = frames_to_json(&[frame(0.5), frame(0.1)]).unwrap();
        assert!(matches!(
            frames_from_json(&json),
            Err(ExportError::InvalidFrame { index: 1, .. })
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(frames_from_json("[{\"time\": 0"), Err(ExportError::Json(_))));
    }
}
