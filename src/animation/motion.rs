use ahash::HashMap;

use crate::engine::transform::AngleUnit;

/// Channel values of every animated joint at one captured instant, as written in the source.
///
/// Rotation values are in [MotionFrame::angle_unit]; translations are never converted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionFrame {
    /// Frame number as written in the source. Only used for diagnostics.
    number: u32,
    angle_unit: AngleUnit,
    channels: HashMap<String, Vec<f64>>,
}

impl MotionFrame {
    /// An empty frame with rotations in degrees.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            angle_unit: AngleUnit::Degrees,
            channels: HashMap::default(),
        }
    }

    pub fn with_angle_unit(mut self, angle_unit: AngleUnit) -> Self {
        self.angle_unit = angle_unit;
        self
    }

    #[inline]
    pub fn angle_unit(&self) -> AngleUnit {
        self.angle_unit
    }

    /// Set the values of a joint, returning the values it replaced.
    pub fn insert(&mut self, joint: impl Into<String>, values: Vec<f64>) -> Option<Vec<f64>> {
        self.channels.insert(joint.into(), values)
    }

    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[inline]
    pub fn get(&self, joint: &str) -> Option<&[f64]> {
        self.channels.get(joint).map(Vec::as_slice)
    }

    /// Names of all joints that have an entry in this frame.
    pub fn joints(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Ordered frames of one capture. Index 0 holds the first frame of the file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionSequence {
    frames: Vec<MotionFrame>,
    fully_specified: bool,
}

impl MotionSequence {
    pub fn new(frames: Vec<MotionFrame>, fully_specified: bool) -> Self {
        Self {
            frames,
            fully_specified,
        }
    }

    /// Whether the file declared `:FULLY-SPECIFIED`.
    #[inline]
    pub fn fully_specified(&self) -> bool {
        self.fully_specified
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&MotionFrame> {
        self.frames.get(index)
    }

    #[inline]
    pub fn frames(&self) -> &[MotionFrame] {
        &self.frames
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MotionFrame> {
        self.frames.iter()
    }
}

impl<'a> IntoIterator for &'a MotionSequence {
    type Item = &'a MotionFrame;
    type IntoIter = std::slice::Iter<'a, MotionFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
