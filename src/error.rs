use thiserror::Error;

use crate::animation::skeleton::Channel;

/// Failures while reading skeleton/motion text or posing a skeleton.
///
/// Parse errors carry the 1-based line number of the offending input.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MocapError {
    #[error("Missing required section `{0}`")]
    MissingSection(&'static str),

    #[error("Malformed bone block at line {line}: {reason}")]
    MalformedSkeletonBlock { line: usize, reason: String },

    #[error("Joint `{name}` is defined twice (line {line})")]
    DuplicateJoint { name: String, line: usize },

    #[error("Hierarchy references undefined joint `{name}` (line {line})")]
    UnresolvedHierarchyReference { name: String, line: usize },

    #[error("Invalid hierarchy at line {line}: {reason}")]
    InvalidHierarchy { line: usize, reason: String },

    #[error("Malformed motion frame at line {line}: {reason}")]
    MalformedMotionFrame { line: usize, reason: String },

    #[error("Joint `{joint}` has no value for channel `{channel}`")]
    FatalMissingChannel { joint: String, channel: Channel },

    #[error("Motion frame names joint `{0}` which the skeleton does not define")]
    UnknownJoint(String),

    #[error("Frame {index} is out of range (sequence has {len} frames)")]
    FrameRangeOutOfBounds { index: usize, len: usize },
}

impl MocapError {
    pub(crate) fn malformed_block(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSkeletonBlock {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_frame(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedMotionFrame {
            line,
            reason: reason.into(),
        }
    }
}
