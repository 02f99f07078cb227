use crate::core::graph::builder::BuildOptions;
use crate::core::models::link::LinkKind;
use crate::core::structure::layout::BACKBONE_STEP;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Parameters of molecule graph construction.
pub type GraphConfig = BuildOptions;

/// Parameters handed to the external force layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub charge: f64,
    /// Distance beyond which node repulsion is ignored.
    pub charge_distance: f64,
    pub friction: f64,
    pub gravity: f64,
    /// Rest length of a link of weight 1.
    pub link_distance: f64,
    /// Strength of every link kind not listed in `link_strengths`.
    pub default_link_strength: f64,
    pub link_strengths: HashMap<LinkKind, f64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            charge: -30.0,
            charge_distance: 110.0,
            friction: 0.35,
            gravity: 0.0,
            link_distance: BACKBONE_STEP,
            default_link_strength: 10.0,
            link_strengths: HashMap::from([
                (LinkKind::Pseudoknot, 0.0),
                (LinkKind::ProteinChain, 0.0),
                (LinkKind::ChainChain, 0.0),
                (LinkKind::Intermolecule, 10.0),
            ]),
        }
    }
}

impl LayoutConfig {
    pub fn link_strength(&self, kind: LinkKind) -> f64 {
        self.link_strengths
            .get(&kind)
            .copied()
            .unwrap_or(self.default_link_strength)
    }

    pub fn link_distance(&self, weight: f64) -> f64 {
        self.link_distance * weight
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Pause between animation frames. Zero shows a single further frame.
    pub delay: Duration,
    /// Number of frames across the whole time axis.
    pub frames: u32,
    /// Explicit end of the time axis; the axis then starts at 0.1.
    pub simulation_time: Option<f64>,
    /// Explicit length of the color domain; otherwise the longest structure is used.
    pub sequence_length: Option<usize>,
    /// Samples at or below this concentration are dropped on load.
    pub occupancy_threshold: Option<f64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            frames: 100,
            simulation_time: None,
            sequence_length: None,
            occupancy_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub graph: GraphConfig,
    pub layout: LayoutConfig,
    pub playback: PlaybackConfig,
}

/// Builds a validated [`EngineConfig`].
///
/// Animation timing (`delay` and `frames`) must always be given; every other
/// parameter falls back to its default.
#[derive(Default)]
pub struct EngineConfigBuilder {
    label_interval: Option<usize>,
    nucleotide_radius: Option<f64>,
    label_radius: Option<f64>,
    label_offset: Option<f64>,
    charge: Option<f64>,
    charge_distance: Option<f64>,
    friction: Option<f64>,
    gravity: Option<f64>,
    link_distance: Option<f64>,
    link_strengths: HashMap<LinkKind, f64>,
    delay: Option<Duration>,
    frames: Option<u32>,
    simulation_time: Option<f64>,
    sequence_length: Option<usize>,
    occupancy_threshold: Option<f64>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label_interval(mut self, interval: usize) -> Self {
        self.label_interval = Some(interval);
        self
    }
    pub fn nucleotide_radius(mut self, radius: f64) -> Self {
        self.nucleotide_radius = Some(radius);
        self
    }
    pub fn label_radius(mut self, radius: f64) -> Self {
        self.label_radius = Some(radius);
        self
    }
    pub fn label_offset(mut self, offset: f64) -> Self {
        self.label_offset = Some(offset);
        self
    }
    pub fn charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }
    pub fn charge_distance(mut self, distance: f64) -> Self {
        self.charge_distance = Some(distance);
        self
    }
    pub fn friction(mut self, friction: f64) -> Self {
        self.friction = Some(friction);
        self
    }
    pub fn gravity(mut self, gravity: f64) -> Self {
        self.gravity = Some(gravity);
        self
    }
    pub fn link_distance(mut self, distance: f64) -> Self {
        self.link_distance = Some(distance);
        self
    }
    pub fn link_strength(mut self, kind: LinkKind, strength: f64) -> Self {
        self.link_strengths.insert(kind, strength);
        self
    }
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
    pub fn frames(mut self, frames: u32) -> Self {
        self.frames = Some(frames);
        self
    }
    pub fn simulation_time(mut self, time: Option<f64>) -> Self {
        self.simulation_time = time;
        self
    }
    pub fn sequence_length(mut self, length: Option<usize>) -> Self {
        self.sequence_length = length;
        self
    }
    pub fn occupancy_threshold(mut self, threshold: Option<f64>) -> Self {
        self.occupancy_threshold = threshold;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let graph_defaults = GraphConfig::default();
        let graph = GraphConfig {
            label_interval: self.label_interval.unwrap_or(graph_defaults.label_interval),
            nucleotide_radius: positive(
                "nucleotide_radius",
                self.nucleotide_radius
                    .unwrap_or(graph_defaults.nucleotide_radius),
            )?,
            label_radius: positive(
                "label_radius",
                self.label_radius.unwrap_or(graph_defaults.label_radius),
            )?,
            label_offset: positive(
                "label_offset",
                self.label_offset.unwrap_or(graph_defaults.label_offset),
            )?,
        };

        let layout_defaults = LayoutConfig::default();
        let friction = self.friction.unwrap_or(layout_defaults.friction);
        if !(0.0..=1.0).contains(&friction) {
            return Err(ConfigError::InvalidValue {
                parameter: "friction",
                reason: format!("{} is outside [0, 1]", friction),
            });
        }
        let mut link_strengths = layout_defaults.link_strengths;
        for (kind, strength) in self.link_strengths {
            if strength < 0.0 {
                return Err(ConfigError::InvalidValue {
                    parameter: "link_strength",
                    reason: format!("strength of {} links is negative", kind),
                });
            }
            link_strengths.insert(kind, strength);
        }
        let layout = LayoutConfig {
            charge: self.charge.unwrap_or(layout_defaults.charge),
            charge_distance: positive(
                "charge_distance",
                self.charge_distance
                    .unwrap_or(layout_defaults.charge_distance),
            )?,
            friction,
            gravity: self.gravity.unwrap_or(layout_defaults.gravity),
            link_distance: positive(
                "link_distance",
                self.link_distance.unwrap_or(layout_defaults.link_distance),
            )?,
            default_link_strength: layout_defaults.default_link_strength,
            link_strengths,
        };

        let frames = self.frames.ok_or(ConfigError::MissingParameter("frames"))?;
        if frames == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "frames",
                reason: "at least one frame is needed".to_string(),
            });
        }
        if let Some(time) = self.simulation_time {
            if time <= 0.1 {
                return Err(ConfigError::InvalidValue {
                    parameter: "simulation_time",
                    reason: format!("{} does not extend past the axis start 0.1", time),
                });
            }
        }
        if let Some(threshold) = self.occupancy_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue {
                    parameter: "occupancy_threshold",
                    reason: format!("{} is outside [0, 1]", threshold),
                });
            }
        }
        let playback = PlaybackConfig {
            delay: self.delay.ok_or(ConfigError::MissingParameter("delay"))?,
            frames,
            simulation_time: self.simulation_time,
            sequence_length: self.sequence_length,
            occupancy_threshold: self.occupancy_threshold,
        };

        Ok(EngineConfig {
            graph,
            layout,
            playback,
        })
    }
}

fn positive(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: format!("{} is not a positive number", value),
        })
    }
}
