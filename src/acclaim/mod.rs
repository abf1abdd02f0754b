//! Readers for the Acclaim motion capture formats: `.asf` skeletons and `.amc` motions.

pub mod amc;
pub mod asf;
pub mod text;

pub use amc::parse_motion;
pub use asf::parse_skeleton;
