use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Fornax Developers",
    version,
    about = "Fornax CLI - Compose RNA secondary-structure scenes and replay co-transcriptional folding trajectories.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S playback.frames=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", global = true)]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a folding trajectory as a table of structures per time point.
    Play(PlayArgs),
    /// Print the color strip of the dominant structure over time.
    Strip(StripArgs),
    /// Create, edit and inspect saved scenes.
    Scene(SceneArgs),
}

/// Trajectory options shared by `play` and `strip`.
#[derive(Args, Debug, Clone, Default)]
pub struct TrajectoryOptions {
    /// Path to the whitespace-separated trajectory table.
    #[arg(required = true, value_name = "TRAJECTORY")]
    pub trajectory: PathBuf,

    /// End of the time axis; the axis then starts at 0.1.
    #[arg(long, value_name = "FLOAT")]
    pub simulation_time: Option<f64>,

    /// Length of the position domain used for stem colors.
    #[arg(long, value_name = "INT")]
    pub sequence_length: Option<usize>,

    /// Drop samples whose occupancy is at or below this value.
    #[arg(short = 't', long = "threshold", value_name = "FLOAT")]
    pub occupancy_threshold: Option<f64>,
}

/// Arguments for the `play` subcommand.
#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryOptions,

    /// Print a single time point instead of animating.
    #[arg(long, value_name = "TIME", conflicts_with_all = ["delay_ms", "from_start"])]
    pub at: Option<f64>,

    /// Pause between frames in milliseconds. Zero shows a single further frame.
    #[arg(short, long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Number of frames across the whole time axis.
    #[arg(short, long, value_name = "INT")]
    pub frames: Option<u32>,

    /// Start at the beginning of the time axis.
    #[arg(long)]
    pub from_start: bool,
}

/// Arguments for the `strip` subcommand.
#[derive(Args, Debug)]
pub struct StripArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryOptions,

    /// Print hex colors instead of colored blocks.
    #[arg(long)]
    pub plain: bool,
}

/// Arguments for the `scene` subcommand.
#[derive(Args, Debug)]
pub struct SceneArgs {
    #[command(subcommand)]
    pub command: SceneCommands,
}

#[derive(Subcommand, Debug)]
pub enum SceneCommands {
    /// Build a scene from one or more dot-bracket structures.
    New {
        /// A dot-bracket structure. Repeat for several molecules.
        #[arg(short, long = "structure", required = true, value_name = "STRUCT")]
        structures: Vec<String>,

        /// Sequence of the molecule at the same position. Defaults to N at every position.
        #[arg(long = "sequence", value_name = "SEQ")]
        sequences: Vec<String>,

        /// Name of the molecule at the same position.
        #[arg(short, long = "name", value_name = "NAME")]
        names: Vec<String>,

        /// Path of the scene file to write.
        #[arg(short, long, required = true, value_name = "PATH")]
        output: PathBuf,
    },
    /// Link two nodes, pairing them within a molecule or joining two molecules.
    Link {
        /// Path of the scene file to edit.
        #[arg(required = true, value_name = "SCENE")]
        scene: PathBuf,

        /// Uid of the first node.
        #[arg(long, required = true, value_name = "UID")]
        source: String,

        /// Uid of the second node.
        #[arg(long, required = true, value_name = "UID")]
        target: String,

        /// Path of the edited scene. Defaults to overwriting the input.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Remove a link by uid.
    Unlink {
        /// Path of the scene file to edit.
        #[arg(required = true, value_name = "SCENE")]
        scene: PathBuf,

        /// Uid of the link to remove.
        #[arg(long, required = true, value_name = "UID")]
        link: String,

        /// Path of the edited scene. Defaults to overwriting the input.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Summarize the molecules, nodes and links of a scene.
    Show {
        /// Path of the scene file.
        #[arg(required = true, value_name = "SCENE")]
        scene: PathBuf,
    },
}
