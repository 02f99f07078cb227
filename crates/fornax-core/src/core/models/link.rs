use super::ids::{LinkUid, NodeUid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of link kinds that can appear in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Backbone,
    Basepair,
    Pseudoknot,
    Fake,
    FakeFake,
    LabelLink,
    ProteinChain,
    ChainChain,
    Intermolecule,
}

impl LinkKind {
    /// Returns `true` if a user may delete links of this kind.
    ///
    /// Backbone, fake and label links are structural scaffolding and are never removable.
    pub fn is_removable(self) -> bool {
        !matches!(
            self,
            LinkKind::Backbone | LinkKind::Fake | LinkKind::FakeFake | LinkKind::LabelLink
        )
    }

    /// Returns `true` for links that encode a base pair within one molecule.
    pub fn is_pairing(self) -> bool {
        matches!(self, LinkKind::Basepair | LinkKind::Pseudoknot)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid link kind string: '{0}'")]
pub struct ParseLinkKindError(String);

impl FromStr for LinkKind {
    type Err = ParseLinkKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backbone" => Ok(LinkKind::Backbone),
            "basepair" => Ok(LinkKind::Basepair),
            "pseudoknot" => Ok(LinkKind::Pseudoknot),
            "fake" => Ok(LinkKind::Fake),
            "fake_fake" => Ok(LinkKind::FakeFake),
            "label_link" => Ok(LinkKind::LabelLink),
            "protein_chain" => Ok(LinkKind::ProteinChain),
            "chain_chain" => Ok(LinkKind::ChainChain),
            "intermolecule" => Ok(LinkKind::Intermolecule),
            _ => Err(ParseLinkKindError(s.to_string())),
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LinkKind::Backbone => "backbone",
                LinkKind::Basepair => "basepair",
                LinkKind::Pseudoknot => "pseudoknot",
                LinkKind::Fake => "fake",
                LinkKind::FakeFake => "fake_fake",
                LinkKind::LabelLink => "label_link",
                LinkKind::ProteinChain => "protein_chain",
                LinkKind::ChainChain => "chain_chain",
                LinkKind::Intermolecule => "intermolecule",
            }
        )
    }
}

/// An edge of the structure graph, naming its endpoints by node uid.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub uid: LinkUid,
    pub kind: LinkKind,
    pub source: NodeUid,
    pub target: NodeUid,
    /// Relative rest length used by the layout.
    pub weight: f64,
}

impl Link {
    pub fn new(kind: LinkKind, source: NodeUid, target: NodeUid, weight: f64) -> Self {
        Self {
            uid: LinkUid::new(),
            kind,
            source,
            target,
            weight,
        }
    }

    /// Creates a link whose uid is derived from its kind and endpoints.
    ///
    /// Rebuilding a molecule yields the same uids for the same scaffolding, so an
    /// external layout diffing by uid sees unchanged links as unchanged.
    pub fn derived(kind: LinkKind, source: NodeUid, target: NodeUid, weight: f64) -> Self {
        let name = format!("{}:{}", kind, target);
        Self {
            uid: LinkUid::derived(source.as_uuid(), &name),
            kind,
            source,
            target,
            weight,
        }
    }

    /// Returns `true` if this link connects `a` and `b` in either orientation.
    pub fn joins(&self, a: NodeUid, b: NodeUid) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    pub fn touches(&self, node: NodeUid) -> bool {
        self.source == node || self.target == node
    }
}
