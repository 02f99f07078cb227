use crate::core::graph::builder::MoleculeSpec;
use crate::core::io::scene_json::{SceneFileError, SceneJson};
use crate::core::io::traits::DocumentFormat;
use crate::core::structure::toolkit::StructureToolkit;
use crate::engine::config::EngineConfig;
use crate::engine::error::SceneError;
use crate::engine::progress::ProgressReporter;
use crate::engine::scene::Scene;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Builds a scene with one molecule per spec, placed left to right.
///
/// # Errors
///
/// Returns [`SceneError::InvalidStructure`] if a structure does not parse or does not match
/// its sequence.
#[instrument(skip_all, name = "compose_scene_workflow")]
pub fn compose_scene(
    specs: Vec<MoleculeSpec>,
    config: &EngineConfig,
    toolkit: Arc<dyn StructureToolkit>,
    reporter: &ProgressReporter,
) -> Result<Scene, SceneError> {
    let _phase = reporter.phase("Composing scene");
    let mut scene = Scene::new(toolkit, config.graph.clone());
    let task = reporter.task(specs.len() as u64);
    for spec in specs {
        scene.add_structure(spec, true)?;
        task.step();
    }
    info!(
        molecules = scene.molecule_count(),
        nodes = scene.node_count(),
        links = scene.links().len(),
        "Composed scene."
    );
    Ok(scene)
}

/// Reads a scene document and imports it into a new scene.
///
/// # Errors
///
/// Returns [`SceneError::Import`] if the file cannot be read or is malformed.
#[instrument(skip_all, name = "load_scene_workflow")]
pub fn load_scene(
    path: &Path,
    config: &EngineConfig,
    toolkit: Arc<dyn StructureToolkit>,
    reporter: &ProgressReporter,
) -> Result<Scene, SceneError> {
    let document = SceneJson::read_from_path(path)?;
    let mut scene = Scene::new(toolkit, config.graph.clone());
    scene.import(document, reporter)?;
    info!(
        path = %path.display(),
        molecules = scene.molecule_count(),
        "Loaded scene."
    );
    Ok(scene)
}

/// Writes the scene's document to `path`.
#[instrument(skip_all, name = "save_scene_workflow")]
pub fn save_scene(scene: &Scene, path: &Path) -> Result<(), SceneFileError> {
    SceneJson::write_to_path(&scene.export(), path)?;
    info!(path = %path.display(), "Saved scene.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::link::{Link, LinkKind};
    use crate::core::models::node::NodeKind;
    use crate::core::structure::toolkit::DefaultToolkit;
    use crate::engine::progress::Progress;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn toolkit() -> Arc<dyn StructureToolkit> {
        Arc::new(DefaultToolkit)
    }

    #[test]
    fn compose_places_every_structure() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|e| {
            events.lock().unwrap().push(e);
        }));
        let scene = compose_scene(
            vec![
                MoleculeSpec::new("((...))").name("first"),
                MoleculeSpec::new("....").sequence("ACGU"),
            ],
            &EngineConfig::default(),
            toolkit(),
            &reporter,
        )
        .unwrap();
        drop(reporter);

        let names: Vec<_> = scene.molecules().map(|m| m.name().to_string()).collect();
        assert_eq!(names, ["first", "empty"]);
        let events = events.into_inner().unwrap();
        assert_eq!(
            events.first(),
            Some(&Progress::PhaseStart {
                name: "Composing scene"
            })
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| **e == Progress::TaskIncrement)
                .count(),
            2
        );
    }

    #[test]
    fn compose_fails_on_a_bad_structure() {
        let result = compose_scene(
            vec![MoleculeSpec::new("((..")],
            &EngineConfig::default(),
            toolkit(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(SceneError::InvalidStructure(_))));
    }

    #[test]
    fn save_then_load_keeps_the_scene() {
        let mut scene = compose_scene(
            vec![MoleculeSpec::new("((...))"), MoleculeSpec::new("(...)")],
            &EngineConfig::default(),
            toolkit(),
            &ProgressReporter::new(),
        )
        .unwrap();
        let nucleotides: Vec<_> = scene
            .nodes()
            .filter(|n| n.kind == NodeKind::Nucleotide)
            .map(|n| n.uid)
            .collect();
        let last = nucleotides.len() - 1;
        scene
            .add_link(Link::new(
                LinkKind::Basepair,
                nucleotides[2],
                nucleotides[last],
                1.0,
            ))
            .unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.json");
        save_scene(&scene, &path).unwrap();
        let loaded = load_scene(
            &path,
            &EngineConfig::default(),
            toolkit(),
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(loaded.export(), scene.export());
        assert_eq!(loaded.links().len(), scene.links().len());
    }

    #[test]
    fn loading_a_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = load_scene(
            &dir.path().join("absent.json"),
            &EngineConfig::default(),
            toolkit(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(SceneError::Import(SceneFileError::Io(_)))));
    }
}
