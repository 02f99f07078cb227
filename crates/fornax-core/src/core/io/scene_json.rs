use super::traits::DocumentFormat;
use crate::core::graph::builder::GraphBuilder;
use crate::core::models::ids::{LinkUid, MoleculeUid, NodeUid};
use crate::core::models::link::{Link, LinkKind};
use crate::core::models::molecule::{Molecule, MoleculeKind};
use crate::core::models::node::{Node, NodeKind, PinState};
use crate::core::structure::StructureError;
use crate::core::structure::elements::{Element, ElementKind};
use crate::core::structure::pairtable::PairTable;
use crate::core::structure::toolkit::StructureToolkit;
use nalgebra::Point2;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use uuid::Uuid;

const EXTRA_LINKS: &str = "extraLinks";

#[derive(Debug, Error)]
pub enum SceneFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed scene document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Inconsistent record in '{molecule}': {message}")]
    Inconsistency { molecule: String, message: String },

    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
}

impl SceneFileError {
    fn inconsistency(molecule: impl ToString, message: impl Into<String>) -> Self {
        Self::Inconsistency {
            molecule: molecule.to_string(),
            message: message.into(),
        }
    }
}

/// A saved scene: every molecule in registration order plus the cross-molecule links.
///
/// Nodes never carry a reference to their molecule here; ownership is implied by
/// nesting and restored on import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(with = "molecule_map", alias = "rnas")]
    pub molecules: Vec<MoleculeView>,
    #[serde(rename = "extraLinks", default)]
    pub extra_links: Vec<LinkView>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoleculeViewKind {
    #[default]
    Rna,
    Protein,
}

/// The persisted state of one molecule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoleculeView {
    #[serde(rename = "type", default)]
    pub kind: MoleculeViewKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<MoleculeUid>,
    #[serde(default)]
    pub struct_name: String,
    #[serde(default, alias = "seq")]
    pub sequence: String,
    #[serde(default, alias = "dotbracket")]
    pub structure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairtable: Option<PairTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default)]
    pub nodes: Vec<NodeView>,
    #[serde(default)]
    pub links: Vec<LinkView>,
    #[serde(default, alias = "rnaLength", skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, deserialize_with = "lenient_elements")]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<NodeUid>,
    #[serde(rename = "node_type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub num: usize,
    #[serde(default)]
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub px: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub py: Option<f64>,
    #[serde(default)]
    pub radius: f64,
    /// Whether the user pinned the node. Drag pins are transient and never saved.
    #[serde(default, deserialize_with = "fixed_flag")]
    pub fixed: bool,
}

/// A link endpoint as written in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Uid(NodeUid),
    /// Position in the owning molecule's node list, as written by older documents.
    Index(usize),
    Node { uid: NodeUid },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<LinkUid>,
    #[serde(rename = "link_type")]
    pub kind: LinkKind,
    pub source: Endpoint,
    pub target: Endpoint,
    #[serde(alias = "value", default = "unit_weight")]
    pub weight: f64,
}

fn unit_weight() -> f64 {
    1.0
}

impl MoleculeView {
    /// Captures a molecule for saving.
    pub fn from_molecule(molecule: &Molecule) -> Self {
        let (kind, size) = match molecule.kind() {
            MoleculeKind::Rna => (MoleculeViewKind::Rna, None),
            MoleculeKind::Protein { size } => (MoleculeViewKind::Protein, Some(size)),
        };
        let is_rna = kind == MoleculeViewKind::Rna;
        Self {
            kind,
            uid: Some(molecule.uid()),
            struct_name: molecule.name().to_string(),
            sequence: molecule.sequence().to_string(),
            structure: molecule.structure().to_string(),
            pairtable: is_rna.then(|| molecule.pairtable().clone()),
            size,
            nodes: molecule.nodes().iter().map(NodeView::from_node).collect(),
            links: molecule.links().iter().map(LinkView::from_link).collect(),
            length: is_rna.then(|| molecule.len()),
            elements: molecule.elements().to_vec(),
        }
    }

    /// Reconstructs the molecule exactly as saved, without re-running the layout.
    ///
    /// A missing pairtable is parsed from the structure and missing elements are
    /// re-derived; node and link uids absent from older documents are synthesized
    /// deterministically from their positions in the record.
    ///
    /// # Errors
    ///
    /// Returns [`SceneFileError::Inconsistency`] when lengths disagree, node uids repeat
    /// or an index endpoint points past the node list, and [`SceneFileError::Structure`]
    /// when the structure string cannot be parsed.
    pub fn into_molecule(self, toolkit: &dyn StructureToolkit) -> Result<Molecule, SceneFileError> {
        let uid = self.uid.unwrap_or_default();
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, view)| view.to_node(uid, index))
            .collect::<Vec<_>>();

        let mut seen = HashSet::with_capacity(nodes.len());
        if let Some(duplicate) = nodes.iter().find(|n| !seen.insert(n.uid)) {
            return Err(SceneFileError::inconsistency(
                uid,
                format!("node uid {} appears more than once", duplicate.uid),
            ));
        }

        let links = self
            .links
            .into_iter()
            .enumerate()
            .map(|(index, view)| {
                let fallback = LinkUid::derived(uid.as_uuid(), &format!("link-{}", index));
                view.into_link(fallback, Some(&nodes), &uid)
            })
            .collect::<Result<Vec<_>, _>>()?;

        match self.kind {
            MoleculeViewKind::Protein => {
                let size = self
                    .size
                    .or_else(|| nodes.first().map(|n| n.radius))
                    .ok_or_else(|| SceneFileError::inconsistency(uid, "protein without a size"))?;
                if nodes.is_empty() {
                    return Ok(GraphBuilder::protein(
                        Some(uid),
                        self.struct_name,
                        size,
                        Point2::origin(),
                    ));
                }
                Ok(Molecule {
                    uid,
                    name: self.struct_name,
                    kind: MoleculeKind::Protein { size },
                    sequence: String::new(),
                    structure: String::new(),
                    pairtable: PairTable::unpaired(0),
                    elements: Vec::new(),
                    nodes,
                    links,
                })
            }
            MoleculeViewKind::Rna => {
                let pairtable = match self.pairtable {
                    Some(pairtable) => pairtable,
                    None => toolkit.pairtable(&self.structure)?,
                };
                let len = pairtable.len();
                if let Some(length) = self.length.filter(|&l| l != len) {
                    return Err(SceneFileError::inconsistency(
                        uid,
                        format!("length {} but pairtable covers {} positions", length, len),
                    ));
                }
                let sequence = if self.sequence.is_empty() {
                    "N".repeat(len)
                } else {
                    self.sequence
                };
                if sequence.chars().count() != len {
                    return Err(SceneFileError::inconsistency(
                        uid,
                        format!(
                            "sequence has {} positions but pairtable covers {}",
                            sequence.chars().count(),
                            len
                        ),
                    ));
                }
                let structure = if self.structure.is_empty() {
                    pairtable.to_dot_bracket()?
                } else {
                    self.structure
                };
                let elements = if self.elements.is_empty() && len > 0 {
                    toolkit.elements(&pairtable)
                } else {
                    self.elements
                };
                Ok(Molecule {
                    uid,
                    name: self.struct_name,
                    kind: MoleculeKind::Rna,
                    sequence,
                    structure,
                    pairtable,
                    elements,
                    nodes,
                    links,
                })
            }
        }
    }
}

impl NodeView {
    pub fn from_node(node: &Node) -> Self {
        Self {
            uid: Some(node.uid),
            kind: node.kind,
            num: node.num,
            name: node.name.clone(),
            x: node.position.x,
            y: node.position.y,
            px: Some(node.previous.x),
            py: Some(node.previous.y),
            radius: node.radius,
            fixed: node.pin.user_fixed,
        }
    }

    fn to_node(&self, molecule: MoleculeUid, index: usize) -> Node {
        let position = Point2::new(self.x, self.y);
        Node {
            uid: self
                .uid
                .unwrap_or_else(|| NodeUid::derived(molecule.as_uuid(), &format!("node-{}", index))),
            kind: self.kind,
            molecule,
            num: self.num,
            name: self.name.clone(),
            position,
            previous: Point2::new(self.px.unwrap_or(self.x), self.py.unwrap_or(self.y)),
            radius: self.radius,
            pin: PinState {
                user_fixed: self.fixed,
                drag_fixed: false,
            },
        }
    }
}

impl LinkView {
    pub fn from_link(link: &Link) -> Self {
        Self {
            uid: Some(link.uid),
            kind: link.kind,
            source: Endpoint::Uid(link.source),
            target: Endpoint::Uid(link.target),
            weight: link.weight,
        }
    }

    /// Converts the record into a link, resolving index endpoints against `nodes`.
    ///
    /// Links outside any molecule have no node list; index endpoints are an error there.
    pub fn into_link(
        self,
        fallback_uid: LinkUid,
        nodes: Option<&[Node]>,
        owner: &dyn std::fmt::Display,
    ) -> Result<Link, SceneFileError> {
        let resolve = |endpoint: Endpoint| -> Result<NodeUid, SceneFileError> {
            match endpoint {
                Endpoint::Uid(uid) | Endpoint::Node { uid } => Ok(uid),
                Endpoint::Index(index) => match nodes {
                    Some(nodes) => nodes.get(index).map(|n| n.uid).ok_or_else(|| {
                        SceneFileError::inconsistency(
                            owner,
                            format!("link endpoint {} is past the {} nodes", index, nodes.len()),
                        )
                    }),
                    None => Err(SceneFileError::inconsistency(
                        owner,
                        format!("index endpoint {} has no node list to refer to", index),
                    )),
                },
            }
        };
        Ok(Link {
            uid: self.uid.unwrap_or(fallback_uid),
            kind: self.kind,
            source: resolve(self.source)?,
            target: resolve(self.target)?,
            weight: self.weight,
        })
    }
}

impl SceneDocument {
    /// Converts the cross-molecule link records into links.
    pub fn extra_links(&self) -> Result<Vec<Link>, SceneFileError> {
        self.extra_links
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, view)| {
                let fallback =
                    LinkUid::derived(Uuid::NAMESPACE_OID, &format!("extra-link-{}", index));
                view.into_link(fallback, None, &EXTRA_LINKS)
            })
            .collect()
    }
}

/// The JSON scene document format.
pub struct SceneJson;

impl DocumentFormat for SceneJson {
    type Document = SceneDocument;
    type Error = SceneFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<SceneDocument, SceneFileError> {
        Ok(serde_json::from_reader(reader)?)
    }

    fn write_to(document: &SceneDocument, writer: &mut impl Write) -> Result<(), SceneFileError> {
        serde_json::to_writer_pretty(&mut *writer, document)?;
        writeln!(writer)?;
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FixedFlag {
    Flag(bool),
    Bits(u64),
}

/// Accepts both a boolean and the older bit-packed pin field, where bit 0 is the user pin.
fn fixed_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match FixedFlag::deserialize(deserializer)? {
        FixedFlag::Flag(flag) => flag,
        FixedFlag::Bits(bits) => bits & 1 != 0,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ElementRecord {
    Full(Element),
    Tuple(String, usize, Vec<usize>),
}

/// Accepts elements both as objects and as `[code, level, positions]` triples.
fn lenient_elements<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Element>, D::Error> {
    let records = Vec::<ElementRecord>::deserialize(deserializer)?;
    records
        .into_iter()
        .map(|record| match record {
            ElementRecord::Full(element) => Ok(element),
            ElementRecord::Tuple(code, level, positions) => {
                let kind = code
                    .parse::<ElementKind>()
                    .map_err(serde::de::Error::custom)?;
                Ok(Element {
                    kind,
                    level,
                    positions,
                })
            }
        })
        .collect()
}

mod molecule_map {
    use super::MoleculeView;
    use crate::core::models::ids::MoleculeUid;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(
        molecules: &[MoleculeView],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(molecules.len()))?;
        for (index, molecule) in molecules.iter().enumerate() {
            let key = match molecule.uid {
                Some(uid) => uid.to_string(),
                None => index.to_string(),
            };
            map.serialize_entry(&key, molecule)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<MoleculeView>, D::Error> {
        deserializer.deserialize_map(OrderedMolecules)
    }

    struct OrderedMolecules;

    impl<'de> Visitor<'de> for OrderedMolecules {
        type Value = Vec<MoleculeView>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map from molecule uid to molecule")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut molecules = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, mut molecule)) = access.next_entry::<String, MoleculeView>()? {
                if molecule.uid.is_none() {
                    molecule.uid = Some(key.parse().unwrap_or_else(|_| {
                        MoleculeUid::derived(Uuid::NAMESPACE_OID, &key)
                    }));
                }
                molecules.push(molecule);
            }
            Ok(molecules)
        }
    }
}
