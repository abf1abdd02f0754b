pub mod motion;
pub mod player;
pub mod pose;
pub mod skeleton;

use crate::{
    engine::transform::{Transform, euler_to_matrix, to_radians},
    error::MocapError,
};

use self::{
    motion::MotionFrame,
    pose::Pose,
    skeleton::{Joint, Skeleton},
};

/// Forward kinematics: compute the world transform of every joint reachable from `root`.
///
/// The skeleton is not modified, so the same skeleton can be posed for any number of frames,
/// in any order, from any number of callers.
pub fn apply_frame(skeleton: &Skeleton, frame: &MotionFrame) -> Result<Pose, MocapError> {
    // Lowest unknown name, whatever the map order.
    if let Some(unknown) = frame
        .joints()
        .filter(|name| skeleton.handle(name).is_none())
        .min()
    {
        return Err(MocapError::UnknownJoint(unknown.to_string()));
    }

    let unit = frame.angle_unit();

    let mut transforms: Vec<Option<Transform>> = vec![None; skeleton.len()];

    let root = skeleton.root();
    let root_transform = {
        let joint = &skeleton[root];
        let values = frame.get(Skeleton::ROOT).unwrap_or_default();
        let (translation, rotation) = skeleton.header().root.split(values)?;
        Transform::new(rotate(joint, unit.vec3_to_degrees(rotation)), translation)
    };
    transforms[root.index()] = Some(root_transform);

    let mut stack = skeleton[root].children().iter().rev().copied().collect::<Vec<_>>();
    while let Some(handle) = stack.pop() {
        let joint = &skeleton[handle];

        // Parents are always finalized before their children are pushed.
        let Some(parent) = joint.parent().and_then(|p| transforms[p.index()]) else {
            continue;
        };

        let values = match joint.descriptor.dof.first() {
            None => &[][..],
            Some(&channel) => frame.get(joint.name()).ok_or_else(|| joint.missing(channel))?,
        };
        let local = unit.vec3_to_degrees(joint.local_rotation(values)?);
        let rotation = parent.rotation * rotate(joint, local);
        let translation = Transform::new(rotation, parent.translation)
            .along(joint.descriptor.direction, joint.descriptor.length);

        transforms[handle.index()] = Some(Transform::new(rotation, translation));
        stack.extend(joint.children().iter().rev());
    }

    Ok(Pose::new(transforms))
}

/// `C * R(degrees) * C^-1` for the joint's local axis frame.
#[inline]
fn rotate(joint: &Joint, degrees: glam::DVec3) -> glam::DMat3 {
    joint.axis_matrix()
        * euler_to_matrix(to_radians(degrees), joint.descriptor.axis_order)
        * joint.axis_matrix_inverse()
}
