use thiserror::Error;

use crate::core::io::scene_json::SceneFileError;
use crate::core::io::trajectory::TrajectoryReadError;
use crate::core::models::ids::{LinkUid, MoleculeUid, NodeUid};
use crate::core::structure::StructureError;
use super::resolver::ResolveError;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("No node with uid {0} in the scene")]
    UnknownNode(NodeUid),

    #[error("No link with uid {0} in the scene")]
    UnknownLink(LinkUid),

    #[error("No molecule with uid {0} in the scene")]
    UnknownMolecule(MoleculeUid),

    #[error("A molecule with uid {0} is already in the scene")]
    DuplicateMolecule(MoleculeUid),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Invalid structure: {0}")]
    InvalidStructure(#[from] StructureError),

    #[error("Cannot rebuild molecule {molecule}: {source}")]
    Structure {
        molecule: MoleculeUid,
        #[source]
        source: StructureError,
    },

    #[error("Scene import failed: {0}")]
    Import(#[from] SceneFileError),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Failed to read trajectory: {0}")]
    Read(#[from] TrajectoryReadError),

    #[error("Structure '{id}' has two samples at time {time}")]
    DuplicateTimestamp { id: String, time: f64 },

    #[error("Structure '{id}' at time {time} is invalid: {source}")]
    Structure {
        id: String,
        time: f64,
        #[source]
        source: StructureError,
    },

    #[error("Trajectory contains no samples")]
    EmptyTrajectory,

    #[error("No structure with id '{0}' in the trajectory")]
    UnknownSeries(String),
}
