use crate::core::io::traits::DocumentFormat;
use crate::core::io::trajectory::TrajectoryTable;
use crate::core::structure::toolkit::StructureToolkit;
use crate::engine::config::PlaybackConfig;
use crate::engine::error::PlaybackError;
use crate::engine::playback::PlaybackEngine;
use crate::engine::progress::ProgressReporter;
use crate::engine::render::Renderer;
use crate::engine::trajectory::Trajectory;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Reads a trajectory table and groups it into series.
///
/// # Errors
///
/// Returns [`PlaybackError::Read`] for unreadable or malformed files, or any error of
/// [`Trajectory::load`].
#[instrument(skip_all, name = "load_trajectory_workflow")]
pub fn load_trajectory(
    path: &Path,
    config: &PlaybackConfig,
    toolkit: &dyn StructureToolkit,
    reporter: &ProgressReporter,
) -> Result<Trajectory, PlaybackError> {
    let raw = TrajectoryTable::read_from_path(path)?;
    info!(path = %path.display(), records = raw.len(), "Read trajectory table.");
    Trajectory::load(raw, config, toolkit, reporter)
}

/// Runs an animation until it reaches the end of the time axis or its handle is cancelled.
///
/// `sleep` is called with each tick's delay; the animation flag is checked after every
/// sleep, so a cancellation during the wait prevents the next frame.
///
/// # Return
///
/// Returns the number of frames rendered.
#[instrument(skip_all, name = "animation_workflow")]
pub fn run_animation(
    engine: &mut PlaybackEngine<'_>,
    renderer: &mut dyn Renderer,
    delay: Duration,
    from_start: bool,
    mut sleep: impl FnMut(Duration),
) -> usize {
    let mut tick = engine.start_animation(delay, from_start, renderer);
    let mut frames = 1;
    while let Some(next) = tick {
        sleep(next.delay);
        if !engine.is_animating() {
            info!(time = engine.current_time(), "Animation cancelled.");
            break;
        }
        tick = engine.advance(next.time, next.delay, renderer);
        frames += 1;
    }
    info!(frames, time = engine.current_time(), "Animation finished.");
    frames
}
