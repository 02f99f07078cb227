use crate::cli::PlayArgs;
use crate::commands::CommandContext;
use crate::config::PlaybackOverrides;
use crate::error::Result;
use crate::utils::table::format_timepoint;
use fornax::core::structure::toolkit::DefaultToolkit;
use fornax::engine::playback::PlaybackEngine;
use fornax::engine::progress::ProgressReporter;
use fornax::engine::render::{Renderer, Timepoint};
use fornax::workflows;
use tracing::{debug, info, warn};

/// Prints every frame it receives as a table on stdout.
#[derive(Default)]
struct TablePrinter {
    frames: usize,
}

impl Renderer for TablePrinter {
    fn on_structure_transition(&mut self, id: &str, structure: &str) {
        debug!(id, structure, "Structure transition.");
    }

    fn on_view_model_update(&mut self, timepoint: &Timepoint) {
        self.frames += 1;
        println!("{}", format_timepoint(timepoint));
    }
}

pub async fn run(args: PlayArgs, ctx: &CommandContext<'_>) -> Result<()> {
    let overrides = PlaybackOverrides::from(&args);
    let config = ctx.engine_config(&overrides)?;

    let progress_handler = ctx.progress_handler();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Loading trajectory from {:?}", &args.trajectory.trajectory);
    let trajectory = tokio::task::block_in_place(|| {
        workflows::playback::load_trajectory(
            &args.trajectory.trajectory,
            &config.playback,
            &DefaultToolkit,
            &reporter,
        )
    })?;
    let (start, end) = trajectory.time_axis();
    println!(
        "Loaded {} trajectory series over t = {:.2} .. {:.2}.",
        trajectory.series().len(),
        start,
        end
    );

    let mut engine = PlaybackEngine::new(&trajectory, &config.playback);
    let mut printer = TablePrinter::default();

    if let Some(at) = args.at {
        engine.scrub(at, &mut printer);
        return Ok(());
    }

    let handle = engine.handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping the animation.");
            handle.cancel();
        }
    });

    let delay = config.playback.delay;
    let frames = tokio::task::block_in_place(|| {
        workflows::playback::run_animation(
            &mut engine,
            &mut printer,
            delay,
            args.from_start,
            std::thread::sleep,
        )
    });
    watcher.abort();

    info!("Animation rendered {} frame(s).", frames);
    println!(
        "Animation stopped at t = {:.2} after {} frame(s).",
        engine.current_time(),
        printer.frames
    );
    Ok(())
}
