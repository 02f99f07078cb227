use crate::cli::{PlayArgs, TrajectoryOptions};
use crate::error::{CliError, Result};
use fornax::engine::config::{EngineConfig, EngineConfigBuilder};
use fornax::core::models::link::LinkKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const DEFAULT_DELAY_MS: u64 = 100;
const DEFAULT_FRAMES: u32 = 100;
const DEFAULT_OCCUPANCY_THRESHOLD: f64 = 0.01;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialGraphConfig {
    label_interval: Option<usize>,
    nucleotide_radius: Option<f64>,
    label_radius: Option<f64>,
    label_offset: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialLayoutConfig {
    charge: Option<f64>,
    charge_distance: Option<f64>,
    friction: Option<f64>,
    gravity: Option<f64>,
    link_distance: Option<f64>,
    /// Spring strength per link kind, keyed by kind name (e.g. `pseudoknot = 0.5`).
    #[serde(default)]
    link_strengths: HashMap<String, f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPlaybackConfig {
    delay_ms: Option<u64>,
    frames: Option<u32>,
    simulation_time: Option<f64>,
    sequence_length: Option<usize>,
    occupancy_threshold: Option<f64>,
}

/// Configuration as read from a TOML file; every field is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    graph: Option<PartialGraphConfig>,
    layout: Option<PartialLayoutConfig>,
    playback: Option<PartialPlaybackConfig>,
}

/// Playback values given on the command line; they win over the file.
#[derive(Debug, Default, Clone)]
pub struct PlaybackOverrides {
    pub delay_ms: Option<u64>,
    pub frames: Option<u32>,
    pub simulation_time: Option<f64>,
    pub sequence_length: Option<usize>,
    pub occupancy_threshold: Option<f64>,
}

impl From<&TrajectoryOptions> for PlaybackOverrides {
    fn from(options: &TrajectoryOptions) -> Self {
        Self {
            simulation_time: options.simulation_time,
            sequence_length: options.sequence_length,
            occupancy_threshold: options.occupancy_threshold,
            ..Self::default()
        }
    }
}

impl From<&PlayArgs> for PlaybackOverrides {
    fn from(args: &PlayArgs) -> Self {
        Self {
            delay_ms: args.delay_ms,
            frames: args.frames,
            ..Self::from(&args.trajectory)
        }
    }
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file if one is given, or starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolves the final configuration: `--set` values first, then command-line flags,
    /// then the file, then the CLI defaults.
    pub fn merge_with_cli(
        mut self,
        set_values: &[String],
        overrides: &PlaybackOverrides,
    ) -> Result<EngineConfig> {
        self.apply_set_values(set_values)?;

        let graph = self.graph.take().unwrap_or_default();
        let layout = self.layout.take().unwrap_or_default();
        let playback = self.playback.take().unwrap_or_default();

        let mut builder = EngineConfigBuilder::new();
        if let Some(v) = graph.label_interval {
            builder = builder.label_interval(v);
        }
        if let Some(v) = graph.nucleotide_radius {
            builder = builder.nucleotide_radius(v);
        }
        if let Some(v) = graph.label_radius {
            builder = builder.label_radius(v);
        }
        if let Some(v) = graph.label_offset {
            builder = builder.label_offset(v);
        }

        if let Some(v) = layout.charge {
            builder = builder.charge(v);
        }
        if let Some(v) = layout.charge_distance {
            builder = builder.charge_distance(v);
        }
        if let Some(v) = layout.friction {
            builder = builder.friction(v);
        }
        if let Some(v) = layout.gravity {
            builder = builder.gravity(v);
        }
        if let Some(v) = layout.link_distance {
            builder = builder.link_distance(v);
        }
        for (name, strength) in layout.link_strengths {
            let kind = LinkKind::from_str(&name).map_err(|e| CliError::Config(e.to_string()))?;
            builder = builder.link_strength(kind, strength);
        }

        let delay_ms = overrides
            .delay_ms
            .or(playback.delay_ms)
            .unwrap_or(DEFAULT_DELAY_MS);
        let frames = overrides
            .frames
            .or(playback.frames)
            .unwrap_or(DEFAULT_FRAMES);
        let threshold = overrides
            .occupancy_threshold
            .or(playback.occupancy_threshold)
            .unwrap_or(DEFAULT_OCCUPANCY_THRESHOLD);

        builder
            .delay(Duration::from_millis(delay_ms))
            .frames(frames)
            .simulation_time(overrides.simulation_time.or(playback.simulation_time))
            .sequence_length(overrides.sequence_length.or(playback.sequence_length))
            .occupancy_threshold(Some(threshold))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "graph.label-interval" => {
                    self.graph.get_or_insert_with(Default::default).label_interval = Some(parse(key, value)?)
                }
                "graph.nucleotide-radius" => {
                    self.graph.get_or_insert_with(Default::default).nucleotide_radius =
                        Some(parse(key, value)?)
                }
                "graph.label-radius" => {
                    self.graph.get_or_insert_with(Default::default).label_radius = Some(parse(key, value)?)
                }
                "graph.label-offset" => {
                    self.graph.get_or_insert_with(Default::default).label_offset = Some(parse(key, value)?)
                }
                "layout.charge" => {
                    self.layout.get_or_insert_with(Default::default).charge = Some(parse(key, value)?)
                }
                "layout.charge-distance" => {
                    self.layout.get_or_insert_with(Default::default).charge_distance =
                        Some(parse(key, value)?)
                }
                "layout.friction" => {
                    self.layout.get_or_insert_with(Default::default).friction = Some(parse(key, value)?)
                }
                "layout.gravity" => {
                    self.layout.get_or_insert_with(Default::default).gravity = Some(parse(key, value)?)
                }
                "layout.link-distance" => {
                    self.layout.get_or_insert_with(Default::default).link_distance = Some(parse(key, value)?)
                }
                "playback.delay-ms" => {
                    self.playback.get_or_insert_with(Default::default).delay_ms = Some(parse(key, value)?)
                }
                "playback.frames" => {
                    self.playback.get_or_insert_with(Default::default).frames = Some(parse(key, value)?)
                }
                "playback.simulation-time" => {
                    self.playback.get_or_insert_with(Default::default).simulation_time =
                        Some(parse(key, value)?)
                }
                "playback.sequence-length" => {
                    self.playback.get_or_insert_with(Default::default).sequence_length =
                        Some(parse(key, value)?)
                }
                "playback.occupancy-threshold" => {
                    self.playback.get_or_insert_with(Default::default).occupancy_threshold =
                        Some(parse(key, value)?)
                }
                _ => {
                    if let Some(kind) = key.strip_prefix("layout.link-strengths.") {
                        let strength = parse(key, value)?;
                        self.layout
                            .get_or_insert_with(Default::default)
                            .link_strengths
                            .insert(kind.to_string(), strength);
                    } else {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{}'",
                            key
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: '{}'", key, value))
    })
}
