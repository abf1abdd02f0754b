use ahash::HashMap;
use glam::{DMat3, DVec3};

use crate::engine::transform::Transform;

use super::skeleton::{JointHandle, Skeleton};

/// World space transforms of a skeleton for one motion frame.
///
/// Indexed by [JointHandle]. Joints that are not reachable from `root` have no transform.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    transforms: Vec<Option<Transform>>,
}

impl Pose {
    pub(crate) fn new(transforms: Vec<Option<Transform>>) -> Self {
        Self { transforms }
    }

    #[inline]
    pub fn get(&self, joint: JointHandle) -> Option<&Transform> {
        self.transforms.get(joint.index())?.as_ref()
    }

    #[inline]
    pub fn position(&self, joint: JointHandle) -> Option<DVec3> {
        self.get(joint).map(|t| t.translation)
    }

    #[inline]
    pub fn rotation(&self, joint: JointHandle) -> Option<DMat3> {
        self.get(joint).map(|t| t.rotation)
    }

    /// Joint name to world coordinate, for every posed joint.
    pub fn positions<'s>(&self, skeleton: &'s Skeleton) -> HashMap<&'s str, DVec3> {
        skeleton
            .iter()
            .filter_map(|(handle, joint)| Some((joint.name(), self.position(handle)?)))
            .collect()
    }

    /// `(child, parent)` world coordinates of every bone, ready to be drawn as line segments.
    pub fn segments(&self, skeleton: &Skeleton) -> Vec<(DVec3, DVec3)> {
        skeleton
            .bones()
            .filter_map(|(parent, child)| Some((self.position(child)?, self.position(parent)?)))
            .collect()
    }
}
