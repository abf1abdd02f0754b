use std::ops::Range;

use crate::error::MocapError;

use super::{apply_frame, motion::MotionSequence, pose::Pose, skeleton::Skeleton};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerOptions {
    /// Nominal capture rate in frames per second.
    pub frame_rate: f64,
    /// Wrap around to the first frame instead of stopping at the last one.
    pub looping: bool,
}

impl PlayerOptions {
    pub const DEFAULT_FRAME_RATE: f64 = 120.0;
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            frame_rate: Self::DEFAULT_FRAME_RATE,
            looping: false,
        }
    }
}

/// A posed frame produced while iterating a range.
#[derive(Clone, Debug, PartialEq)]
pub struct PosedFrame {
    pub index: usize,
    pub pose: Pose,
}

/// Steps a skeleton through a motion sequence.
///
/// Random access ([Player::pose_at]), range iteration ([Player::frames]) and timed playback
/// ([Player::update]) all pose through [apply_frame], so a frame index yields the same pose no
/// matter how it was reached.
pub struct Player {
    skeleton: Skeleton,
    motion: MotionSequence,
    options: PlayerOptions,
    /// Playhead in frames, fractional between two frames.
    position: f64,
    playing: bool,
}

impl Player {
    /// A frame rate that is not a positive finite number falls back to
    /// [PlayerOptions::DEFAULT_FRAME_RATE].
    pub fn new(skeleton: Skeleton, motion: MotionSequence, mut options: PlayerOptions) -> Self {
        if !(options.frame_rate.is_finite() && options.frame_rate > 0.0) {
            tracing::warn!(
                "Invalid frame rate {}, using {}",
                options.frame_rate,
                PlayerOptions::DEFAULT_FRAME_RATE
            );
            options.frame_rate = PlayerOptions::DEFAULT_FRAME_RATE;
        }

        Self {
            skeleton,
            motion,
            options,
            position: 0.0,
            playing: false,
        }
    }

    #[inline]
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    #[inline]
    pub fn motion(&self) -> &MotionSequence {
        &self.motion
    }

    #[inline]
    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    /// Number of frames in the motion.
    #[inline]
    pub fn len(&self) -> usize {
        self.motion.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.motion.is_empty()
    }

    /// Length of the motion in seconds at the nominal frame rate.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.options.frame_rate
    }

    /// Pose a single frame.
    pub fn pose_at(&self, index: usize) -> Result<Pose, MocapError> {
        let frame = self
            .motion
            .get(index)
            .ok_or(MocapError::FrameRangeOutOfBounds {
                index,
                len: self.len(),
            })?;
        apply_frame(&self.skeleton, frame)
    }

    /// Clamp `range` to the frames that exist, warning when `end` had to be pulled in.
    pub fn clamp_range(&self, range: Range<usize>) -> Range<usize> {
        let len = self.len();
        let end = if range.end > len {
            tracing::warn!(
                "Frame range end {} is beyond the motion ({} frames), clamping",
                range.end,
                len
            );
            len
        } else {
            range.end
        };
        range.start.min(end)..end
    }

    /// Pose every frame in `range` in ascending order. See [Frames] for the skipping policy.
    pub fn frames(&self, range: Range<usize>) -> Frames<'_> {
        Frames {
            player: self,
            indices: self.clamp_range(range),
            skipped: 0,
        }
    }

    pub fn play(&mut self) {
        self.playing = !self.is_empty();
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Move the playhead to the start of `index`.
    pub fn seek(&mut self, index: usize) -> Result<(), MocapError> {
        if index >= self.len() {
            return Err(MocapError::FrameRangeOutOfBounds {
                index,
                len: self.len(),
            });
        }
        self.position = index as f64;
        Ok(())
    }

    /// Advance playback by `delta_time` seconds.
    pub fn update(&mut self, delta_time: f64) {
        if !self.playing {
            return;
        }

        self.position += delta_time * self.options.frame_rate;

        let len = self.len() as f64;
        if self.position >= len {
            if self.options.looping {
                self.position = self.position.rem_euclid(len);
            } else {
                self.position = len;
                self.playing = false;
            }
        }
    }

    /// Index of the frame under the playhead, `None` for an empty motion.
    pub fn current_frame(&self) -> Option<usize> {
        let last = self.len().checked_sub(1)?;
        let index = self.position.floor() as usize;
        Some(index.min(last))
    }

    /// Pose the frame under the playhead.
    pub fn pose(&self) -> Result<Pose, MocapError> {
        let index = self.current_frame().ok_or(MocapError::FrameRangeOutOfBounds {
            index: 0,
            len: 0,
        })?;
        self.pose_at(index)
    }
}

/// Iterator over the posed frames of a range.
///
/// A frame that can not be posed is skipped with a warning instead of ending the iteration;
/// [Frames::skipped] counts them.
pub struct Frames<'a> {
    player: &'a Player,
    indices: Range<usize>,
    skipped: usize,
}

impl Frames<'_> {
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Frames<'_> {
    type Item = PosedFrame;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.indices.next()?;
            match self.player.pose_at(index) {
                Ok(pose) => return Some(PosedFrame { index, pose }),
                Err(err) => {
                    tracing::warn!("Skipping frame {index}: {err}");
                    self.skipped += 1;
                }
            }
        }
    }
}
