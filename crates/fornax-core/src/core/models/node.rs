use super::ids::{MoleculeUid, NodeUid};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of node kinds that can appear in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Nucleotide,
    Label,
    Middle,
    Protein,
    Fake,
}

impl NodeKind {
    /// Returns `true` if a user may draw a link to or from a node of this kind.
    ///
    /// Labels, loop centers and fake nodes only exist to steer the layout.
    pub fn is_connectable(self) -> bool {
        matches!(self, NodeKind::Nucleotide | NodeKind::Protein)
    }

    /// Returns `true` if the collision pass of a force layout should consider this kind.
    pub fn is_collidable(self) -> bool {
        matches!(self, NodeKind::Nucleotide | NodeKind::Label)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid node kind string: '{0}'")]
pub struct ParseNodeKindError(String);

impl FromStr for NodeKind {
    type Err = ParseNodeKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nucleotide" => Ok(NodeKind::Nucleotide),
            "label" => Ok(NodeKind::Label),
            "middle" => Ok(NodeKind::Middle),
            "protein" => Ok(NodeKind::Protein),
            "fake" => Ok(NodeKind::Fake),
            _ => Err(ParseNodeKindError(s.to_string())),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NodeKind::Nucleotide => "nucleotide",
                NodeKind::Label => "label",
                NodeKind::Middle => "middle",
                NodeKind::Protein => "protein",
                NodeKind::Fake => "fake",
            }
        )
    }
}

/// Two independent reasons for a node to be held in place by the layout.
///
/// Ending a drag gesture clears only `drag_fixed`; a node the user pinned stays pinned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinState {
    pub user_fixed: bool,
    pub drag_fixed: bool,
}

impl PinState {
    pub fn is_fixed(&self) -> bool {
        self.user_fixed || self.drag_fixed
    }
}

/// A single vertex of the structure graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub uid: NodeUid,
    pub kind: NodeKind,
    /// The molecule this node belongs to. Identifies the owner; confers no ownership.
    pub molecule: MoleculeUid,
    /// 1-based sequence position for nucleotides, the labelled position for labels, 0 otherwise.
    pub num: usize,
    pub name: String,
    pub position: Point2<f64>,
    /// Position at the previous layout step. The layout's velocity is `position - previous`.
    pub previous: Point2<f64>,
    pub radius: f64,
    pub pin: PinState,
}

impl Node {
    /// Creates a new node at rest at `position`.
    ///
    /// # Arguments
    ///
    /// * `kind` - The kind of the node.
    /// * `molecule` - The uid of the owning molecule.
    /// * `num` - The sequence position the node stands for, or 0.
    /// * `name` - Display name (a nucleotide letter or a label number).
    /// * `position` - Initial position; the previous position is set to the same point.
    /// * `radius` - Collision radius.
    ///
    /// # Return
    ///
    /// Returns a node with a fresh uid and no pins.
    pub fn new(
        kind: NodeKind,
        molecule: MoleculeUid,
        num: usize,
        name: impl Into<String>,
        position: Point2<f64>,
        radius: f64,
    ) -> Self {
        Self {
            uid: NodeUid::new(),
            kind,
            molecule,
            num,
            name: name.into(),
            position,
            previous: position,
            radius,
            pin: PinState::default(),
        }
    }

    pub fn with_uid(mut self, uid: NodeUid) -> Self {
        self.uid = uid;
        self
    }

    /// Moves the node together with its previous position so its velocity is unchanged.
    pub fn translate(&mut self, delta: Vector2<f64>) {
        self.position += delta;
        self.previous += delta;
    }

    pub fn velocity(&self) -> Vector2<f64> {
        self.position - self.previous
    }
}
