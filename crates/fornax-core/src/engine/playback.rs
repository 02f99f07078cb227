//! Time-driven playback over a loaded [`Trajectory`].
//!
//! The engine holds the current time and two flags: whether an animation is running and
//! whether the scrub position is frozen. It never sleeps. [`PlaybackEngine::advance`] renders
//! one frame and returns the [`Tick`] that should follow it; whoever drives the animation
//! waits for the tick's delay and checks the [`AnimationHandle`] before advancing again.

use super::config::PlaybackConfig;
use super::error::PlaybackError;
use super::render::{Renderer, Timepoint, ViewEntry};
use super::trajectory::{Sample, Series, Trajectory};
use crate::core::color::Rgb;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// Size given to a structure after its last sample, so it stays visible.
pub const TRAILING_SIZE: f64 = 0.01;

/// Shared liveness flag of an animation. Cancelling stops the next tick, never the current one.
#[derive(Debug, Clone, Default)]
pub struct AnimationHandle(Arc<AtomicBool>);

impl AnimationHandle {
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn start(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// The next frame of a running animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub time: f64,
    pub delay: Duration,
}

/// A series evaluated at one time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesValue<'t> {
    pub id: &'t str,
    /// The sample whose structure, energy and colors are shown.
    pub sample: &'t Sample,
    pub size: f64,
}

pub struct PlaybackEngine<'t> {
    trajectory: &'t Trajectory,
    frames: u32,
    current_time: f64,
    frozen: bool,
    animation: AnimationHandle,
}

impl<'t> PlaybackEngine<'t> {
    /// Creates an engine positioned at the start of the trajectory's time axis.
    pub fn new(trajectory: &'t Trajectory, config: &PlaybackConfig) -> Self {
        Self {
            trajectory,
            frames: config.frames.max(1),
            current_time: trajectory.time_axis().0,
            frozen: false,
            animation: AnimationHandle::default(),
        }
    }

    pub fn trajectory(&self) -> &'t Trajectory {
        self.trajectory
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_running()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// A handle that can stop the animation from elsewhere.
    pub fn handle(&self) -> AnimationHandle {
        self.animation.clone()
    }

    /// Time between two animation frames.
    pub fn step(&self) -> f64 {
        let (start, end) = self.trajectory.time_axis();
        (end - start) / self.frames as f64
    }

    /// Evaluates series `id` at time `t`.
    ///
    /// Before the first sample the size is 0; after the last sample the last structure is
    /// shown with size [`TRAILING_SIZE`]. A time equal to a sample time shows that sample.
    /// Between two samples the size is interpolated linearly while the structure is the one
    /// of the later sample.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::UnknownSeries`] if no series has this id.
    pub fn value_at_time(&self, id: &str, t: f64) -> Result<SeriesValue<'t>, PlaybackError> {
        let series = self
            .trajectory
            .series_by_id(id)
            .ok_or_else(|| PlaybackError::UnknownSeries(id.to_string()))?;
        series_value(series, t).ok_or(PlaybackError::EmptyTrajectory)
    }

    /// Evaluates every series at time `t`, in series order.
    pub fn values_at_time(&self, t: f64) -> Vec<SeriesValue<'t>> {
        self.trajectory
            .series()
            .iter()
            .filter_map(|s| series_value(s, t))
            .collect()
    }

    /// The view model at time `t`: present structures only, largest first.
    pub fn timepoint(&self, t: f64) -> Timepoint {
        let mut entries: Vec<ViewEntry> = self
            .values_at_time(t)
            .into_iter()
            .filter(|v| v.size > 0.0)
            .map(|v| ViewEntry {
                id: v.id.to_string(),
                structure: v.sample.structure.clone(),
                colors: v.sample.colors.iter().map(|c| color_name(*c)).collect(),
                size: v.size,
                energy: v.sample.energy,
            })
            .collect();
        entries.sort_by(|a, b| b.size.total_cmp(&a.size));
        Timepoint { time: t, entries }
    }

    /// Moves to time `to` and renders it.
    ///
    /// Reaching the end of the axis clamps the time to the end and stops the animation. While
    /// an animation runs, the returned tick names the next frame. A zero `delay` renders one
    /// further frame right away and then stops.
    pub fn advance(
        &mut self,
        to: f64,
        delay: Duration,
        renderer: &mut dyn Renderer,
    ) -> Option<Tick> {
        let next = self.render_at(to, renderer);
        if !self.animation.is_running() {
            return None;
        }
        if delay.is_zero() {
            self.animation.cancel();
            self.render_at(next, renderer);
            return None;
        }
        Some(Tick { time: next, delay })
    }

    /// Starts animating from the current time, or from the start of the axis.
    pub fn start_animation(
        &mut self,
        delay: Duration,
        from_start: bool,
        renderer: &mut dyn Renderer,
    ) -> Option<Tick> {
        self.animation.start();
        self.frozen = false;
        let from = if from_start {
            self.trajectory.time_axis().0
        } else {
            self.current_time
        };
        debug!(from, ?delay, "Starting animation.");
        self.advance(from, delay, renderer)
    }

    /// Stops a running animation, or starts one.
    pub fn toggle_animation(
        &mut self,
        delay: Duration,
        from_start: bool,
        renderer: &mut dyn Renderer,
    ) -> Option<Tick> {
        if self.animation.is_running() {
            self.animation.cancel();
            debug!(time = self.current_time, "Stopped animation.");
            None
        } else {
            self.start_animation(delay, from_start, renderer)
        }
    }

    /// Moves to `t` unless an animation runs or the position is frozen.
    ///
    /// Returns `true` if the time changed.
    pub fn scrub(&mut self, t: f64, renderer: &mut dyn Renderer) -> bool {
        if self.animation.is_running() || self.frozen {
            return false;
        }
        self.render_at(t, renderer);
        true
    }

    /// Freezes or releases the scrub position. Has no effect while animating.
    pub fn toggle_freeze(&mut self) -> bool {
        if !self.animation.is_running() {
            self.frozen = !self.frozen;
        }
        self.frozen
    }

    fn render_at(&mut self, to: f64, renderer: &mut dyn Renderer) -> f64 {
        let (start, end) = self.trajectory.time_axis();
        let mut time = to.max(start);
        if time >= end {
            self.animation.cancel();
            self.frozen = false;
            time = end;
        }
        self.current_time = time;

        for value in self.values_at_time(time) {
            renderer.on_structure_transition(value.id, &value.sample.structure);
        }
        let timepoint = self.timepoint(time);
        trace!(time, entries = timepoint.entries.len(), "Rendered time point.");
        renderer.on_view_model_update(&timepoint);
        time + self.step()
    }
}

fn series_value(series: &Series, t: f64) -> Option<SeriesValue<'_>> {
    let samples = &series.samples;
    let first = samples.first()?;
    let i = samples.partition_point(|s| s.time < t);
    let value = |sample, size| SeriesValue {
        id: &series.id,
        sample,
        size,
    };

    if let Some(hit) = samples.get(i).filter(|s| s.time == t) {
        return Some(value(hit, hit.concentration));
    }
    if i == 0 {
        return Some(value(first, 0.0));
    }
    if i >= samples.len() {
        return samples.last().map(|last| value(last, TRAILING_SIZE));
    }
    let (a, b) = (&samples[i - 1], &samples[i]);
    let fraction = (t - a.time) / (b.time - a.time);
    let size = a.concentration + (b.concentration - a.concentration) * fraction;
    Some(value(b, size))
}

fn color_name(color: Option<Rgb>) -> String {
    match color {
        Some(rgb) => rgb.to_string(),
        None => "white".to_string(),
    }
}
