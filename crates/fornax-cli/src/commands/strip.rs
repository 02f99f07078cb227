use crate::cli::StripArgs;
use crate::commands::CommandContext;
use crate::config::PlaybackOverrides;
use crate::error::Result;
use crate::utils::table::render_strip;
use fornax::core::structure::toolkit::DefaultToolkit;
use fornax::engine::progress::ProgressReporter;
use fornax::workflows;
use tracing::info;

pub async fn run(args: StripArgs, ctx: &CommandContext<'_>) -> Result<()> {
    let overrides = PlaybackOverrides::from(&args.trajectory);
    let config = ctx.engine_config(&overrides)?;

    let progress_handler = ctx.progress_handler();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let trajectory = tokio::task::block_in_place(|| {
        workflows::playback::load_trajectory(
            &args.trajectory.trajectory,
            &config.playback,
            &DefaultToolkit,
            &reporter,
        )
    })?;

    let columns = trajectory.dominant_strip();
    info!("Rendering {} strip column(s).", columns.len());
    print!("{}", render_strip(&columns, !args.plain));
    Ok(())
}
