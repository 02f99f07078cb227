use crate::core::models::ids::{MoleculeUid, NodeUid};
use crate::core::models::link::{Link, LinkKind};
use crate::core::models::molecule::{Molecule, MoleculeKind};
use crate::core::models::node::{Node, NodeKind, PinState};
use crate::core::structure::StructureError;
use crate::core::structure::elements::{Element, ElementKind};
use crate::core::structure::layout::BACKBONE_STEP;
use crate::core::structure::pairtable::PairTable;
use crate::core::structure::toolkit::StructureToolkit;
use nalgebra::{Point2, Vector2};
use std::collections::HashMap;
use std::f64::consts::{PI, SQRT_2};
use tracing::trace;

const UNKNOWN_BASE: char = 'N';
const MIN_REINFORCED_LOOP: usize = 3;

/// Tunable parameters of graph construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// A label node is attached to every `label_interval`-th nucleotide; 0 disables labels.
    pub label_interval: usize,
    pub nucleotide_radius: f64,
    pub label_radius: f64,
    /// Distance between a label and its nucleotide.
    pub label_offset: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            label_interval: 10,
            nucleotide_radius: 5.0,
            label_radius: 6.0,
            label_offset: BACKBONE_STEP,
        }
    }
}

/// Everything needed to create a new RNA molecule.
#[derive(Debug, Clone, Default)]
pub struct MoleculeSpec {
    uid: Option<MoleculeUid>,
    name: String,
    sequence: Option<String>,
    structure: String,
    positions: Vec<Point2<f64>>,
    uids: Vec<NodeUid>,
}

impl MoleculeSpec {
    pub fn new(structure: impl Into<String>) -> Self {
        Self {
            structure: structure.into(),
            name: "empty".to_string(),
            ..Default::default()
        }
    }

    pub fn uid(mut self, uid: MoleculeUid) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Nucleotide positions in sequence order; missing ones are laid out automatically.
    pub fn positions(mut self, positions: Vec<Point2<f64>>) -> Self {
        self.positions = positions;
        self
    }

    /// Nucleotide uids in sequence order; missing ones are generated.
    pub fn uids(mut self, uids: Vec<NodeUid>) -> Self {
        self.uids = uids;
        self
    }
}

/// State carried over from an existing node into a rebuilt graph.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeedNode {
    pub uid: Option<NodeUid>,
    pub position: Option<Point2<f64>>,
    pub previous: Option<Point2<f64>>,
    pub pin: PinState,
}

/// Prior uids, positions and pins for nucleotides (by sequence index), labels
/// (by label order) and loop centers (by uid).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutSeed {
    pub nucleotides: Vec<SeedNode>,
    pub labels: Vec<SeedNode>,
    pub middles: HashMap<NodeUid, SeedNode>,
}

impl LayoutSeed {
    /// Records the current state of every nucleotide, label and loop center of `molecule`.
    pub fn capture(molecule: &Molecule) -> Self {
        let record = |node: &Node| SeedNode {
            uid: Some(node.uid),
            position: Some(node.position),
            previous: Some(node.previous),
            pin: node.pin,
        };
        Self {
            nucleotides: molecule
                .nodes()
                .iter()
                .filter(|n| n.kind == NodeKind::Nucleotide)
                .map(record)
                .collect(),
            labels: molecule
                .nodes()
                .iter()
                .filter(|n| n.kind == NodeKind::Label)
                .map(record)
                .collect(),
            middles: molecule
                .nodes()
                .iter()
                .filter(|n| n.kind == NodeKind::Middle)
                .map(|n| (n.uid, record(n)))
                .collect(),
        }
    }

    fn from_spec(positions: &[Point2<f64>], uids: &[NodeUid]) -> Self {
        let count = positions.len().max(uids.len());
        Self {
            nucleotides: (0..count)
                .map(|i| SeedNode {
                    uid: uids.get(i).copied(),
                    position: positions.get(i).copied(),
                    previous: None,
                    pin: PinState::default(),
                })
                .collect(),
            labels: Vec::new(),
            middles: HashMap::new(),
        }
    }
}

/// Builds molecule graphs: nucleotides, labels and the scaffolding that shapes the layout.
pub struct GraphBuilder<'a> {
    toolkit: &'a dyn StructureToolkit,
    options: &'a BuildOptions,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(toolkit: &'a dyn StructureToolkit, options: &'a BuildOptions) -> Self {
        Self { toolkit, options }
    }

    /// Creates a molecule from a structure string.
    ///
    /// # Arguments
    ///
    /// * `spec` - Structure, optional sequence and optional node positions and uids.
    ///
    /// # Return
    ///
    /// Returns the molecule with its full graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the structure does not parse or the sequence length differs
    /// from the structure length.
    pub fn build(&self, spec: MoleculeSpec) -> Result<Molecule, StructureError> {
        let structure = spec.structure.trim().to_string();
        let pairtable = self.toolkit.pairtable(&structure)?;
        let sequence = match spec.sequence {
            Some(sequence) => {
                let sequence = sequence.trim().to_string();
                let length = sequence.chars().count();
                if length != pairtable.len() {
                    return Err(StructureError::LengthMismatch {
                        sequence: length,
                        structure: pairtable.len(),
                    });
                }
                sequence
            }
            None => std::iter::repeat_n(UNKNOWN_BASE, pairtable.len()).collect(),
        };
        let seed = LayoutSeed::from_spec(&spec.positions, &spec.uids);
        self.assemble(
            spec.uid.unwrap_or_default(),
            spec.name,
            sequence,
            structure,
            pairtable,
            seed,
        )
    }

    /// Rebuilds `molecule` around a new pairtable.
    ///
    /// Nucleotide and label uids, positions and pins are carried over, so the rebuilt
    /// graph continues the layout where the old one left off.
    pub fn rederive(
        &self,
        molecule: &Molecule,
        pairtable: PairTable,
    ) -> Result<Molecule, StructureError> {
        if pairtable.len() != molecule.len() {
            return Err(StructureError::LengthMismatch {
                sequence: molecule.len(),
                structure: pairtable.len(),
            });
        }
        let structure = pairtable.to_dot_bracket()?;
        self.assemble(
            molecule.uid(),
            molecule.name().to_string(),
            molecule.sequence().to_string(),
            structure,
            pairtable,
            LayoutSeed::capture(molecule),
        )
    }

    /// Creates a protein drawn as a single node of radius `size`.
    pub fn protein(
        uid: Option<MoleculeUid>,
        name: impl Into<String>,
        size: f64,
        position: Point2<f64>,
    ) -> Molecule {
        let uid = uid.unwrap_or_default();
        let name = name.into();
        let node = Node::new(NodeKind::Protein, uid, 0, name.clone(), position, size);
        Molecule {
            uid,
            name,
            kind: MoleculeKind::Protein { size },
            sequence: String::new(),
            structure: String::new(),
            pairtable: PairTable::unpaired(0),
            elements: Vec::new(),
            nodes: vec![node],
            links: Vec::new(),
        }
    }

    fn assemble(
        &self,
        uid: MoleculeUid,
        name: String,
        sequence: String,
        structure: String,
        pairtable: PairTable,
        seed: LayoutSeed,
    ) -> Result<Molecule, StructureError> {
        let (nested, crossing) = pairtable.split_crossing();
        let elements = self.toolkit.elements(&pairtable);

        let mut graph = Graph::default();
        self.add_nucleotides(&mut graph, uid, &sequence, &pairtable, &seed.nucleotides);
        add_backbone_and_pairs(&mut graph, &nested, &crossing);
        self.add_labels(&mut graph, uid, &seed.labels);
        reinforce_stems(&mut graph, &nested, &elements);
        reinforce_loops(&mut graph, uid, &nested, &elements, &seed.middles);

        trace!(
            molecule = %uid,
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            "Assembled molecule graph."
        );

        Ok(Molecule {
            uid,
            name,
            kind: MoleculeKind::Rna,
            sequence,
            structure,
            pairtable,
            elements,
            nodes: graph.nodes,
            links: graph.links,
        })
    }

    fn add_nucleotides(
        &self,
        graph: &mut Graph,
        uid: MoleculeUid,
        sequence: &str,
        pairtable: &PairTable,
        seed: &[SeedNode],
    ) {
        let len = pairtable.len();
        let needs_layout = (0..len).any(|i| seed.get(i).and_then(|s| s.position).is_none());
        let layout = if needs_layout {
            self.toolkit.initial_layout(pairtable)
        } else {
            Vec::new()
        };

        for (index, base) in sequence.chars().enumerate().take(len) {
            let carried = seed.get(index).copied().unwrap_or_default();
            let position = carried
                .position
                .or_else(|| layout.get(index).copied())
                .unwrap_or_else(Point2::origin);
            let mut node = Node::new(
                NodeKind::Nucleotide,
                uid,
                index + 1,
                base.to_string(),
                position,
                self.options.nucleotide_radius,
            );
            if let Some(node_uid) = carried.uid {
                node.uid = node_uid;
            }
            node.previous = carried.previous.unwrap_or(position);
            node.pin = carried.pin;
            graph.nucleotides.push(graph.nodes.len());
            graph.nodes.push(node);
        }
    }

    fn add_labels(&self, graph: &mut Graph, uid: MoleculeUid, seed: &[SeedNode]) {
        let interval = self.options.label_interval;
        let len = graph.nucleotides.len();
        if interval == 0 {
            return;
        }

        for (order, num) in (interval..=len).step_by(interval).enumerate() {
            let carried = seed.get(order).copied().unwrap_or_default();
            let anchor = graph.nucleotide(num).position;
            let position = carried
                .position
                .unwrap_or_else(|| self.label_position(graph, num, anchor));
            let mut label = Node::new(
                NodeKind::Label,
                uid,
                num,
                num.to_string(),
                position,
                self.options.label_radius,
            );
            if let Some(label_uid) = carried.uid {
                label.uid = label_uid;
            }
            label.previous = carried.previous.unwrap_or(position);
            label.pin = carried.pin;

            let link = Link::derived(LinkKind::LabelLink, graph.nucleotide(num).uid, label.uid, 1.0);
            graph.nodes.push(label);
            graph.links.push(link);
        }
    }

    /// Places a label outside the backbone bend at nucleotide `num`.
    fn label_position(&self, graph: &Graph, num: usize, anchor: Point2<f64>) -> Point2<f64> {
        let offset = self.options.label_offset;
        let len = graph.nucleotides.len();
        let prev = if num == 1 {
            anchor - Vector2::new(offset, 0.0)
        } else {
            graph.nucleotide(num - 1).position
        };
        let next = if num == len {
            anchor + Vector2::new(offset, 0.0)
        } else {
            graph.nucleotide(num + 1).position
        };

        let a = (prev - anchor).try_normalize(1e-12).unwrap_or_else(Vector2::zeros);
        let b = (next - anchor).try_normalize(1e-12).unwrap_or_else(Vector2::zeros);
        let direction = match (a + b).try_normalize(1e-6) {
            Some(bisector) => -bisector,
            None => Vector2::new(-b.y, b.x),
        };
        anchor + direction * offset
    }
}

#[derive(Default)]
struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
    /// Index into `nodes` of each nucleotide, in sequence order.
    nucleotides: Vec<usize>,
}

impl Graph {
    fn nucleotide(&self, num: usize) -> &Node {
        &self.nodes[self.nucleotides[num - 1]]
    }
}

fn add_backbone_and_pairs(graph: &mut Graph, nested: &PairTable, crossing: &[(usize, usize)]) {
    let len = graph.nucleotides.len();
    for num in 2..=len {
        let link = Link::derived(
            LinkKind::Backbone,
            graph.nucleotide(num - 1).uid,
            graph.nucleotide(num).uid,
            1.0,
        );
        graph.links.push(link);
    }
    for (i, j) in nested.pairs() {
        let link = Link::derived(
            LinkKind::Basepair,
            graph.nucleotide(i).uid,
            graph.nucleotide(j).uid,
            1.0,
        );
        graph.links.push(link);
    }
    for &(i, j) in crossing {
        let link = Link::derived(
            LinkKind::Pseudoknot,
            graph.nucleotide(i).uid,
            graph.nucleotide(j).uid,
            1.0,
        );
        graph.links.push(link);
    }
}

/// Adds a diagonal across every pair of consecutive base pairs so stems stay straight.
fn reinforce_stems(graph: &mut Graph, nested: &PairTable, elements: &[Element]) {
    for stem in elements.iter().filter(|e| e.kind == ElementKind::Stem) {
        let five_prime: Vec<usize> = stem
            .positions
            .iter()
            .copied()
            .filter(|&p| nested.partner(p).is_some_and(|q| q > p))
            .collect();
        for window in five_prime.windows(2) {
            let Some(across) = nested.partner(window[1]) else {
                continue;
            };
            let link = Link::derived(
                LinkKind::Fake,
                graph.nucleotide(window[0]).uid,
                graph.nucleotide(across).uid,
                SQRT_2,
            );
            graph.links.push(link);
        }
    }
}

struct LoopCenter {
    uid: NodeUid,
    /// Circumradius of the loop polygon in units of the backbone step.
    radius: f64,
}

/// Adds a center node to every closed loop, tied to each loop nucleotide at the
/// circumradius of the loop polygon, and ties the centers of loops at either end
/// of a stem together. A center whose uid survives a rebuild keeps its seeded state.
fn reinforce_loops(
    graph: &mut Graph,
    uid: MoleculeUid,
    nested: &PairTable,
    elements: &[Element],
    seed: &HashMap<NodeUid, SeedNode>,
) {
    let mut centers: Vec<LoopCenter> = Vec::new();
    let mut loops_at: HashMap<usize, Vec<usize>> = HashMap::new();

    for element in elements.iter().filter(|e| e.kind.is_closed_loop()) {
        let size = element.positions.len();
        if size < MIN_REINFORCED_LOOP {
            continue;
        }
        let radius = 1.0 / (2.0 * (PI / size as f64).sin());
        let sum = element
            .positions
            .iter()
            .fold(Vector2::zeros(), |acc, &p| acc + graph.nucleotide(p).position.coords);
        let centroid = Point2::from(sum / size as f64);
        let first = element.positions[0];
        let last = element.positions[size - 1];
        let center_uid = NodeUid::derived(
            uid.as_uuid(),
            &format!("middle:{}:{}-{}:{}", element.kind, first, last, size),
        );

        let carried = seed.get(&center_uid).copied().unwrap_or_default();
        let position = carried.position.unwrap_or(centroid);
        let mut center = Node::new(
            NodeKind::Middle,
            uid,
            0,
            "",
            position,
            radius * BACKBONE_STEP,
        )
        .with_uid(center_uid);
        center.previous = carried.previous.unwrap_or(position);
        center.pin = carried.pin;

        for &p in &element.positions {
            let link = Link::derived(LinkKind::Fake, graph.nucleotide(p).uid, center_uid, radius);
            graph.links.push(link);
            loops_at.entry(p).or_default().push(centers.len());
        }
        centers.push(LoopCenter {
            uid: center_uid,
            radius,
        });
        graph.nodes.push(center);
    }

    let loop_closing = |i: usize, j: usize| -> Option<usize> {
        let at_i = loops_at.get(&i)?;
        let at_j = loops_at.get(&j)?;
        at_i.iter().find(|c| at_j.contains(c)).copied()
    };

    for stem in elements.iter().filter(|e| e.kind == ElementKind::Stem) {
        let five_prime: Vec<usize> = stem
            .positions
            .iter()
            .copied()
            .filter(|&p| nested.partner(p).is_some_and(|q| q > p))
            .collect();
        let (Some(&outer), Some(&inner)) = (five_prime.first(), five_prime.last()) else {
            continue;
        };
        let (Some(outer_partner), Some(inner_partner)) =
            (nested.partner(outer), nested.partner(inner))
        else {
            continue;
        };

        let outside = loops_at.get(&outer).and_then(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|&c| loops_at.get(&outer_partner).is_some_and(|o| o.contains(&c)) && {
                    // The enclosing loop is the one that does not also hold the inner pair
                    // of a single-pair stem.
                    five_prime.len() > 1 || Some(c) != loop_closing(inner + 1, inner_partner - 1)
                })
        });
        let inside = loops_at.get(&inner).and_then(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|&c| {
                    loops_at.get(&inner_partner).is_some_and(|o| o.contains(&c))
                        && Some(c) != outside
                })
        });

        if let (Some(a), Some(b)) = (outside, inside) {
            let weight = centers[a].radius + centers[b].radius + (five_prime.len() - 1) as f64;
            let link = Link::derived(LinkKind::FakeFake, centers[a].uid, centers[b].uid, weight);
            graph.links.push(link);
        }
    }
}
