use crate::cli::{SceneArgs, SceneCommands};
use crate::commands::CommandContext;
use crate::config::PlaybackOverrides;
use crate::error::{CliError, Result};
use crate::utils::table::format_scene_summary;
use fornax::core::graph::builder::MoleculeSpec;
use fornax::core::structure::toolkit::DefaultToolkit;
use fornax::engine::config::EngineConfig;
use fornax::engine::progress::ProgressReporter;
use fornax::engine::scene::{EditOutcome, Scene};
use fornax::workflows;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub async fn run(args: SceneArgs, ctx: &CommandContext<'_>) -> Result<()> {
    let config = ctx.engine_config(&PlaybackOverrides::default())?;
    let progress_handler = ctx.progress_handler();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    match args.command {
        SceneCommands::New {
            structures,
            sequences,
            names,
            output,
        } => {
            let specs = molecule_specs(structures, sequences, names)?;
            info!("Composing a scene of {} molecule(s).", specs.len());
            let scene = tokio::task::block_in_place(|| {
                workflows::compose::compose_scene(
                    specs,
                    &config,
                    Arc::new(DefaultToolkit),
                    &reporter,
                )
            })?;
            workflows::compose::save_scene(&scene, &output)?;
            println!(
                "Scene with {} molecule(s) written to: {}",
                scene.molecule_count(),
                output.display()
            );
        }
        SceneCommands::Link {
            scene: path,
            source,
            target,
            output,
        } => {
            let mut scene = load(&path, &config, &reporter)?;
            let source = parse_uid(&source, "source")?;
            let target = parse_uid(&target, "target")?;
            let outcome = scene.connect_nodes(source, target)?;
            save_edit(&scene, outcome, output.unwrap_or(path))?;
        }
        SceneCommands::Unlink {
            scene: path,
            link,
            output,
        } => {
            let mut scene = load(&path, &config, &reporter)?;
            let link = parse_uid(&link, "link")?;
            let outcome = scene.remove_link(link)?;
            save_edit(&scene, outcome, output.unwrap_or(path))?;
        }
        SceneCommands::Show { scene: path } => {
            let scene = load(&path, &config, &reporter)?;
            print!("{}", format_scene_summary(&scene));
        }
    }
    Ok(())
}

/// Pairs every structure with the sequence and name given at the same position.
fn molecule_specs(
    structures: Vec<String>,
    sequences: Vec<String>,
    names: Vec<String>,
) -> Result<Vec<MoleculeSpec>> {
    if sequences.len() > structures.len() || names.len() > structures.len() {
        return Err(CliError::Argument(format!(
            "{} structure(s) given but {} sequence(s) and {} name(s)",
            structures.len(),
            sequences.len(),
            names.len()
        )));
    }
    let mut sequences = sequences.into_iter();
    let mut names = names.into_iter();
    Ok(structures
        .into_iter()
        .map(|structure| {
            let mut spec = MoleculeSpec::new(structure);
            if let Some(sequence) = sequences.next() {
                spec = spec.sequence(sequence);
            }
            if let Some(name) = names.next() {
                spec = spec.name(name);
            }
            spec
        })
        .collect())
}

fn load(path: &Path, config: &EngineConfig, reporter: &ProgressReporter) -> Result<Scene> {
    info!("Loading scene from {:?}", path);
    let scene = tokio::task::block_in_place(|| {
        workflows::compose::load_scene(path, config, Arc::new(DefaultToolkit), reporter)
    })?;
    Ok(scene)
}

fn parse_uid<T: FromStr>(value: &str, what: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| CliError::Argument(format!("Invalid {} uid '{}': {}", what, value, e)))
}

fn save_edit(scene: &Scene, outcome: EditOutcome, output: PathBuf) -> Result<()> {
    match outcome {
        EditOutcome::Applied => {
            workflows::compose::save_scene(scene, &output)?;
            println!("Edited scene written to: {}", output.display());
            Ok(())
        }
        EditOutcome::Rejected(rejection) => Err(CliError::Rejected(rejection)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specs_pair_by_position() {
        let specs = molecule_specs(
            vec!["((..))".to_string(), "....".to_string()],
            vec!["GGAACC".to_string()],
            vec![],
        )
        .unwrap();
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn surplus_sequences_are_rejected() {
        let result = molecule_specs(
            vec!["....".to_string()],
            vec!["AAAA".to_string(), "CCCC".to_string()],
            vec![],
        );
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn malformed_uids_are_argument_errors() {
        let result: Result<fornax::core::models::ids::NodeUid> = parse_uid("not-a-uid", "source");
        assert!(matches!(result, Err(CliError::Argument(msg)) if msg.contains("source")));
    }
}
