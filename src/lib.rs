//! Load Acclaim `.asf` skeletons and `.amc` motions and pose them with forward kinematics.

pub mod acclaim;
pub mod animation;
pub mod engine;
pub mod error;

pub use acclaim::{parse_motion, parse_skeleton};
pub use animation::{
    apply_frame,
    motion::{MotionFrame, MotionSequence},
    player::{Player, PlayerOptions},
    pose::Pose,
    skeleton::Skeleton,
};
pub use error::MocapError;
