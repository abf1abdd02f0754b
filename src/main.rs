use std::{path::PathBuf, process::ExitCode};

use acclaim_mocap::{
    MotionSequence, Player, PlayerOptions, Pose, Skeleton, engine::assets::Assets,
};
use clap::Parser;
use tracing::{error, info, warn};

#[derive(clap::Parser)]
struct Opts {
    /// Path to the skeleton (.asf) file.
    skeleton: PathBuf,

    /// Path to the motion (.amc) file.
    motion: PathBuf,

    /// Pose a single frame (0-based) instead of a range.
    #[arg(long, conflicts_with_all = ["start", "end"])]
    frame: Option<usize>,

    /// First frame of the range.
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// One past the last frame of the range. Defaults to the end of the motion.
    #[arg(long)]
    end: Option<usize>,

    /// Nominal capture rate, used to print timestamps.
    #[arg(long, default_value_t = PlayerOptions::DEFAULT_FRAME_RATE, value_parser = parse_frame_rate)]
    fps: f64,

    /// Also print the `(child, parent)` segment of every bone.
    #[arg(long)]
    segments: bool,
}

fn parse_frame_rate(value: &str) -> Result<f64, String> {
    let rate = value
        .parse::<f64>()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("frame rate must be positive, got `{value}`"))
    }
}

fn print_pose(player: &Player, index: usize, pose: &Pose, segments: bool) {
    let skeleton = player.skeleton();
    let time = index as f64 / player.options().frame_rate;

    println!("frame {index} ({time:.4}s)");
    for handle in skeleton.depth_first() {
        let Some(position) = pose.position(handle) else {
            continue;
        };
        println!(
            "  {} {:.6} {:.6} {:.6}",
            skeleton[handle].name(),
            position.x,
            position.y,
            position.z
        );
    }

    if segments {
        for (child, parent) in pose.segments(skeleton) {
            println!(
                "  segment {:.6} {:.6} {:.6} -> {:.6} {:.6} {:.6}",
                child.x, child.y, child.z, parent.x, parent.y, parent.z
            );
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().init();

    let opts = Opts::parse();

    let assets = Assets::default();

    let skeleton = match assets.load_direct::<Skeleton>(&opts.skeleton) {
        Ok(skeleton) => skeleton,
        Err(err) => {
            error!("Could not load skeleton: {err}");
            return ExitCode::FAILURE;
        }
    };

    let motion = match assets.load_direct::<MotionSequence>(&opts.motion) {
        Ok(motion) => motion,
        Err(err) => {
            error!("Could not load motion: {err}");
            return ExitCode::FAILURE;
        }
    };

    let player = Player::new(
        skeleton,
        motion,
        PlayerOptions {
            frame_rate: opts.fps,
            ..Default::default()
        },
    );

    info!(
        "Playing {} frames over {} joints",
        player.len(),
        player.skeleton().len()
    );

    if let Some(index) = opts.frame {
        return match player.pose_at(index) {
            Ok(pose) => {
                print_pose(&player, index, &pose, opts.segments);
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("Could not pose frame {index}: {err}");
                ExitCode::FAILURE
            }
        };
    }

    let end = opts.end.unwrap_or(player.len());
    let mut frames = player.frames(opts.start..end);
    for posed in frames.by_ref() {
        print_pose(&player, posed.index, &posed.pose, opts.segments);
    }

    if frames.skipped() > 0 {
        warn!("{} frames could not be posed", frames.skipped());
    }

    ExitCode::SUCCESS
}
