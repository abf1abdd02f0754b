use crate::{
    animation::motion::{MotionFrame, MotionSequence},
    engine::{
        assets::{AssetError, AssetLoadContext, AssetType},
        transform::AngleUnit,
    },
    error::MocapError,
};

use super::text::{Line, LineReader};

/// A frame that has been opened by its index line but not yet closed.
struct OpenFrame {
    line: usize,
    frame: MotionFrame,
}

impl OpenFrame {
    fn close(self) -> Result<MotionFrame, MocapError> {
        if self.frame.is_empty() {
            return Err(MocapError::malformed_frame(
                self.line,
                format!("frame {} has no channel lines", self.frame.number()),
            ));
        }
        Ok(self.frame)
    }
}

/// A bare integer on its own line starts a new frame.
fn frame_index(line: &Line) -> Option<u32> {
    match line.tokens.as_slice() {
        [token] => token.parse().ok(),
        _ => None,
    }
}

/// Parse the text of an Acclaim motion (`.amc`) file.
///
/// Values are kept as written. Every frame records whether its rotations are in degrees or
/// radians, so translations never pass through an angle conversion.
///
/// Joint names are not checked here; a name the skeleton does not define fails when the frame
/// is posed.
pub fn parse_motion(text: &str) -> Result<MotionSequence, MocapError> {
    let mut reader = LineReader::new(text);
    let mut fully_specified = false;

    let unit = loop {
        let Some(line) = reader.next() else {
            return Err(MocapError::MissingSection(":DEGREES"));
        };
        match line.key() {
            ":FULLY-SPECIFIED" => fully_specified = true,
            ":DEGREES" => break AngleUnit::Degrees,
            ":RADIANS" => break AngleUnit::Radians,
            key => tracing::debug!("Skipping motion header `{key}` (line {})", line.number),
        }
    };

    let mut frames = Vec::new();
    let mut open: Option<OpenFrame> = None;

    for line in reader {
        if let Some(number) = frame_index(&line) {
            if let Some(previous) = open.take() {
                frames.push(previous.close()?);
            }
            open = Some(OpenFrame {
                line: line.number,
                frame: MotionFrame::new(number).with_angle_unit(unit),
            });
            continue;
        }

        let Some(OpenFrame { frame, .. }) = open.as_mut() else {
            return Err(MocapError::malformed_frame(
                line.number,
                format!("`{}` appears before the first frame index", line.key()),
            ));
        };

        let values = line
            .params()
            .iter()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    MocapError::malformed_frame(line.number, format!("`{token}` is not a number"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if frame.insert(line.key(), values).is_some() {
            return Err(MocapError::malformed_frame(
                line.number,
                format!("`{}` appears twice in frame {}", line.key(), frame.number()),
            ));
        }
    }

    if let Some(last) = open.take() {
        frames.push(last.close()?);
    }

    tracing::info!("Parsed motion with {} frames", frames.len());

    Ok(MotionSequence::new(frames, fully_specified))
}

impl AssetType for MotionSequence {
    fn from_raw(raw: &[u8], context: &AssetLoadContext) -> Result<Self, AssetError> {
        parse_motion(context.text(raw)?).map_err(|err| context.mocap_error(err))
    }
}
