use super::ids::{MoleculeUid, NodeUid};
use super::link::Link;
use super::node::{Node, NodeKind};
use crate::core::structure::elements::Element;
use crate::core::structure::pairtable::PairTable;
use nalgebra::Vector2;
use std::fmt;

/// What kind of entity a molecule graph stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoleculeKind {
    Rna,
    /// A protein drawn as a single node whose radius is `size`.
    Protein { size: f64 },
}

impl fmt::Display for MoleculeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoleculeKind::Rna => write!(f, "rna"),
            MoleculeKind::Protein { .. } => write!(f, "protein"),
        }
    }
}

/// A molecule together with the graph that represents it.
///
/// The molecule exclusively owns its nodes and links. Its pairtable, elements and
/// graph are always derived together; a pairing edit replaces the whole molecule
/// with a rebuilt one (see [`crate::core::graph::builder::GraphBuilder::rederive`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    pub(crate) uid: MoleculeUid,
    pub(crate) name: String,
    pub(crate) kind: MoleculeKind,
    pub(crate) sequence: String,
    pub(crate) structure: String,
    pub(crate) pairtable: PairTable,
    pub(crate) elements: Vec<Element>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
}

impl Molecule {
    pub fn uid(&self) -> MoleculeUid {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MoleculeKind {
        self.kind
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// The structure string the graph was built from.
    pub fn structure(&self) -> &str {
        &self.structure
    }

    pub fn pairtable(&self) -> &PairTable {
        &self.pairtable
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of sequence positions; 0 for proteins.
    pub fn len(&self) -> usize {
        self.pairtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the index of a node in [`Molecule::nodes`] by uid.
    pub fn node_index(&self, uid: NodeUid) -> Option<usize> {
        self.nodes.iter().position(|n| n.uid == uid)
    }

    pub fn node(&self, uid: NodeUid) -> Option<&Node> {
        self.nodes.iter().find(|n| n.uid == uid)
    }

    /// Iterates over the nucleotide nodes in sequence order.
    pub fn nucleotides(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Nucleotide)
    }

    /// Smallest x coordinate of any node, or `None` for a molecule without nodes.
    pub fn min_x(&self) -> Option<f64> {
        self.nodes.iter().map(|n| n.position.x).reduce(f64::min)
    }

    /// Translates every node, keeping each node's velocity unchanged.
    pub fn translate(&mut self, delta: Vector2<f64>) {
        for node in &mut self.nodes {
            node.translate(delta);
        }
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }
}
