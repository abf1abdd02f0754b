use ahash::HashMap;
use glam::{DMat3, DVec3};
use strum::{Display, EnumString};

use crate::{
    engine::{
        arena::{Arena, Handle},
        transform::{AngleUnit, Axis, RotationOrder, euler_to_matrix, to_radians},
    },
    error::MocapError,
};

pub type JointHandle = Handle<Joint>;

/// A named value slot in a motion frame.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Channel {
    Tx,
    Ty,
    Tz,
    Rx,
    Ry,
    Rz,
}

impl Channel {
    pub fn rotation_axis(self) -> Option<Axis> {
        match self {
            Channel::Rx => Some(Axis::X),
            Channel::Ry => Some(Axis::Y),
            Channel::Rz => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn translation_axis(self) -> Option<Axis> {
        match self {
            Channel::Tx => Some(Axis::X),
            Channel::Ty => Some(Axis::Y),
            Channel::Tz => Some(Axis::Z),
            _ => None,
        }
    }
}

/// Allowed range of one degree of freedom, in degrees. Not enforced when posing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limit {
    pub min: f64,
    pub max: f64,
}

/// Static description of a joint as written in the skeleton file.
#[derive(Clone, Debug, PartialEq)]
pub struct JointDescriptor {
    pub id: Option<u32>,
    pub name: String,
    /// Unit vector of the bone in the joint's rest frame.
    pub direction: DVec3,
    pub length: f64,
    /// Euler angles in degrees of the local axis frame.
    pub axis: DVec3,
    pub axis_order: RotationOrder,
    pub dof: Vec<Channel>,
    /// One entry per `dof` channel, or empty when the file declares none.
    pub limits: Vec<Limit>,
}

impl JointDescriptor {
    pub fn root(axis_order: RotationOrder) -> Self {
        Self {
            id: None,
            name: Skeleton::ROOT.to_string(),
            direction: DVec3::ZERO,
            length: 0.0,
            axis: DVec3::ZERO,
            axis_order,
            dof: Vec::new(),
            limits: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub descriptor: JointDescriptor,
    /// Local axis frame, built once from `descriptor.axis`.
    c: DMat3,
    c_inv: DMat3,
    parent: Option<JointHandle>,
    children: Vec<JointHandle>,
}

impl Joint {
    pub fn new(descriptor: JointDescriptor) -> Self {
        let c = euler_to_matrix(to_radians(descriptor.axis), descriptor.axis_order);
        Self {
            descriptor,
            c,
            c_inv: c.inverse(),
            parent: None,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    #[inline]
    pub fn parent(&self) -> Option<JointHandle> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[JointHandle] {
        &self.children
    }

    #[inline]
    pub fn axis_matrix(&self) -> DMat3 {
        self.c
    }

    #[inline]
    pub fn axis_matrix_inverse(&self) -> DMat3 {
        self.c_inv
    }

    /// Expand the joint's compact channel values into a per-axis rotation, in the unit the
    /// values were written in.
    ///
    /// Values are consumed in `dof` order and each lands in the slot named by its tag, so
    /// `dof rz rx` with values `[a, b]` gives `(b, 0, a)`. Axes without a channel stay zero.
    pub fn local_rotation(&self, values: &[f64]) -> Result<DVec3, MocapError> {
        let mut rotation = DVec3::ZERO;
        for (index, &channel) in self.descriptor.dof.iter().enumerate() {
            let Some(&value) = values.get(index) else {
                return Err(self.missing(channel));
            };
            if let Some(axis) = channel.rotation_axis() {
                rotation[axis.index()] = value;
            }
        }
        Ok(rotation)
    }

    pub(crate) fn missing(&self, channel: Channel) -> MocapError {
        MocapError::FatalMissingChannel {
            joint: self.descriptor.name.clone(),
            channel,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Units {
    pub mass: f64,
    pub length: f64,
    pub angle: AngleUnit,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            mass: 1.0,
            length: 1.0,
            angle: AngleUnit::Degrees,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RootInfo {
    /// Meaning of each value on the root line of a motion frame.
    pub order: Vec<Channel>,
    pub axis: RotationOrder,
    pub position: DVec3,
    pub orientation: DVec3,
}

impl Default for RootInfo {
    fn default() -> Self {
        Self {
            order: vec![
                Channel::Tx,
                Channel::Ty,
                Channel::Tz,
                Channel::Rx,
                Channel::Ry,
                Channel::Rz,
            ],
            axis: RotationOrder::Xyz,
            position: DVec3::ZERO,
            orientation: DVec3::ZERO,
        }
    }
}

impl RootInfo {
    /// Split the root's frame values into a translation and a rotation. The rotation keeps the
    /// unit of the values.
    pub(crate) fn split(&self, values: &[f64]) -> Result<(DVec3, DVec3), MocapError> {
        let mut translation = DVec3::ZERO;
        let mut rotation = DVec3::ZERO;
        for (index, &channel) in self.order.iter().enumerate() {
            let Some(&value) = values.get(index) else {
                return Err(MocapError::FatalMissingChannel {
                    joint: Skeleton::ROOT.to_string(),
                    channel,
                });
            };
            if let Some(axis) = channel.translation_axis() {
                translation[axis.index()] = value;
            } else if let Some(axis) = channel.rotation_axis() {
                rotation[axis.index()] = value;
            }
        }
        Ok((translation, rotation))
    }
}

/// Everything in a skeleton file besides the joints themselves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkeletonHeader {
    pub version: Option<String>,
    pub name: Option<String>,
    pub units: Units,
    pub documentation: Vec<String>,
    pub root: RootInfo,
}

/// Tree of joints stored in an arena. Parents own their ordered children list and each child
/// refers back to its parent by handle.
///
/// A skeleton is never modified by posing, so one instance can be shared by any number of
/// viewers. `Clone` gives an independent copy for callers that want one anyway.
#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
    header: SkeletonHeader,
    joints: Arena<Joint>,
    names: HashMap<String, JointHandle>,
    root: JointHandle,
}

impl Skeleton {
    pub const ROOT: &'static str = "root";

    /// Create a skeleton holding only the implicit `root` joint.
    pub fn new(header: SkeletonHeader) -> Self {
        let mut joints = Arena::default();
        let root = joints.insert(Joint::new(JointDescriptor::root(header.root.axis)));

        let mut names = HashMap::default();
        names.insert(Self::ROOT.to_string(), root);

        Self {
            header,
            joints,
            names,
            root,
        }
    }

    /// Add a disconnected joint. Returns `None` if the name is already taken.
    pub fn add_joint(&mut self, descriptor: JointDescriptor) -> Option<JointHandle> {
        if self.names.contains_key(&descriptor.name) {
            return None;
        }
        let name = descriptor.name.clone();
        let handle = self.joints.insert(Joint::new(descriptor));
        self.names.insert(name, handle);
        Some(handle)
    }

    /// Make `child` the last child of `parent`.
    pub fn attach(&mut self, parent: JointHandle, child: JointHandle) -> Result<(), String> {
        if child == self.root {
            return Err(format!("`{}` can not be a child", Self::ROOT));
        }
        if self.joints.get(parent).is_none() {
            return Err(format!("invalid joint handle {parent:?}"));
        }
        let Some(joint) = self.joints.get(child) else {
            return Err(format!("invalid joint handle {child:?}"));
        };
        if parent == child {
            return Err(format!("`{}` can not be its own parent", joint.name()));
        }
        if joint.parent.is_some() {
            return Err(format!("`{}` already has a parent", joint.name()));
        }

        // `child` may not be an ancestor of `parent`.
        let mut ancestor = Some(parent);
        while let Some(handle) = ancestor {
            if handle == child {
                return Err(format!(
                    "`{}` -> `{}` would form a cycle",
                    self.joints[parent].name(),
                    joint.name()
                ));
            }
            ancestor = self.joints[handle].parent;
        }

        if let Some(joint) = self.joints.get_mut(child) {
            joint.parent = Some(parent);
        }

        if let Some(parent_joint) = self.joints.get_mut(parent) {
            parent_joint.children.push(child);
        }
        Ok(())
    }

    #[inline]
    pub fn header(&self) -> &SkeletonHeader {
        &self.header
    }

    #[inline]
    pub fn root(&self) -> JointHandle {
        self.root
    }

    #[inline]
    pub fn handle(&self, name: &str) -> Option<JointHandle> {
        self.names.get(name).copied()
    }

    #[inline]
    pub fn get(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle)
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.get(self.handle(name)?)
    }

    /// Number of joints, including `root` and orphans.
    #[inline]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joints.iter()
    }

    /// Joints reachable from `root`, parents always before their children.
    pub fn depth_first(&self) -> Vec<JointHandle> {
        let mut order = Vec::with_capacity(self.joints.len());
        let mut stack = vec![self.root];
        while let Some(handle) = stack.pop() {
            order.push(handle);
            stack.extend(self.joints[handle].children.iter().rev());
        }
        order
    }

    /// Names of joints that are not reachable from `root`. They are never posed.
    pub fn orphans(&self) -> Vec<&str> {
        let mut reachable = vec![false; self.joints.len()];
        for handle in self.depth_first() {
            reachable[handle.index()] = true;
        }
        self.joints
            .iter()
            .filter(|(handle, _)| !reachable[handle.index()])
            .map(|(_, joint)| joint.name())
            .collect()
    }

    /// `(parent, child)` pairs of every bone reachable from `root`.
    pub fn bones(&self) -> impl Iterator<Item = (JointHandle, JointHandle)> + '_ {
        self.depth_first()
            .into_iter()
            .filter_map(|child| Some((self.joints[child].parent?, child)))
    }
}

impl std::ops::Index<JointHandle> for Skeleton {
    type Output = Joint;

    fn index(&self, handle: JointHandle) -> &Self::Output {
        &self.joints[handle]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, dof: &[Channel]) -> JointDescriptor {
        JointDescriptor {
            id: None,
            name: name.to_string(),
            direction: DVec3::Y,
            length: 1.0,
            axis: DVec3::ZERO,
            axis_order: RotationOrder::Xyz,
            dof: dof.to_vec(),
            limits: Vec::new(),
        }
    }

    #[test]
    fn channel_tags() {
        assert_eq!("rx".parse::<Channel>(), Ok(Channel::Rx));
        assert_eq!("TZ".parse::<Channel>(), Ok(Channel::Tz));
        assert!("l".parse::<Channel>().is_err());
        assert_eq!(Channel::Ry.to_string(), "ry");
    }

    #[test]
    fn build_tree() {
        let mut skeleton = Skeleton::new(SkeletonHeader::default());
        let root = skeleton.root();
        let a = skeleton.add_joint(descriptor("a", &[])).unwrap();
        let b = skeleton.add_joint(descriptor("b", &[])).unwrap();
        let c = skeleton.add_joint(descriptor("c", &[])).unwrap();
        let orphan = skeleton.add_joint(descriptor("orphan", &[])).unwrap();

        assert!(skeleton.add_joint(descriptor("a", &[])).is_none());

        skeleton.attach(root, a).unwrap();
        skeleton.attach(a, c).unwrap();
        skeleton.attach(root, b).unwrap();

        assert!(skeleton.attach(b, c).is_err());
        assert!(skeleton.attach(a, root).is_err());
        assert!(skeleton.attach(orphan, orphan).is_err());

        let d = skeleton.add_joint(descriptor("d", &[])).unwrap();
        let e = skeleton.add_joint(descriptor("e", &[])).unwrap();
        skeleton.attach(d, e).unwrap();
        assert_eq!(
            skeleton.attach(e, d),
            Err("`e` -> `d` would form a cycle".to_string())
        );
        assert!(skeleton[d].parent().is_none());
        assert!(skeleton[e].children().is_empty());

        assert_eq!(skeleton.len(), 7);
        assert_eq!(skeleton[c].parent(), Some(a));
        assert_eq!(skeleton[root].children(), &[a, b]);
        assert_eq!(skeleton.depth_first(), vec![root, a, c, b]);
        assert_eq!(skeleton.orphans(), vec!["orphan", "d", "e"]);
        assert_eq!(
            skeleton.bones().collect::<Vec<_>>(),
            vec![(root, a), (a, c), (root, b)]
        );
        assert!(skeleton.joint("orphan").is_some_and(|j| j.parent().is_none()));
    }

    #[test]
    fn local_rotation_uses_tags() {
        let joint = Joint::new(descriptor("j", &[Channel::Rz, Channel::Rx]));
        assert_eq!(
            joint.local_rotation(&[30.0, 10.0]).unwrap(),
            DVec3::new(10.0, 0.0, 30.0)
        );
        assert_eq!(
            joint.local_rotation(&[30.0]),
            Err(MocapError::FatalMissingChannel {
                joint: "j".to_string(),
                channel: Channel::Rx,
            })
        );

        let fixed = Joint::new(descriptor("fixed", &[]));
        assert_eq!(fixed.local_rotation(&[1.0, 2.0]).unwrap(), DVec3::ZERO);
    }

    #[test]
    fn root_order_maps_values() {
        let root = RootInfo {
            order: vec![
                Channel::Rx,
                Channel::Ry,
                Channel::Rz,
                Channel::Tx,
                Channel::Ty,
                Channel::Tz,
            ],
            ..RootInfo::default()
        };
        let (translation, rotation) = root.split(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(translation, DVec3::new(4.0, 5.0, 6.0));
        assert_eq!(rotation, DVec3::new(1.0, 2.0, 3.0));

        assert!(matches!(
            RootInfo::default().split(&[0.0; 3]),
            Err(MocapError::FatalMissingChannel { channel: Channel::Rx, .. })
        ));
    }

    #[test]
    fn axis_frame_is_inverted() {
        let joint = Joint::new(JointDescriptor {
            axis: DVec3::new(10.0, -20.0, 35.0),
            ..descriptor("j", &[])
        });
        assert!(
            (joint.axis_matrix() * joint.axis_matrix_inverse()).abs_diff_eq(DMat3::IDENTITY, 1e-12)
        );
    }
}
