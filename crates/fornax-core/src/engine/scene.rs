use super::error::SceneError;
use super::progress::ProgressReporter;
use super::resolver::{self, NodeIndex, ResolvedLink};
use crate::core::graph::builder::{BuildOptions, GraphBuilder, MoleculeSpec};
use crate::core::io::scene_json::{LinkView, MoleculeView, SceneDocument};
use crate::core::models::ids::{LinkUid, MoleculeKey, MoleculeUid, NodeUid};
use crate::core::models::link::{Link, LinkKind};
use crate::core::models::molecule::Molecule;
use crate::core::models::node::Node;
use crate::core::structure::pairtable::PairTable;
use crate::core::structure::toolkit::StructureToolkit;
use nalgebra::{Point2, Vector2};
use slotmap::SlotMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const FIT_MARGIN: f64 = 0.8;

/// Why an edit was refused. Refusals are ordinary interactive outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SameNode,
    /// One of the endpoints already takes part in a basepair or pseudoknot.
    AlreadyPaired,
    BackboneNeighbours,
    /// An endpoint is a label, loop center or other layout helper.
    HelperNode,
    /// The link holds the graph together and cannot be removed.
    Scaffolding(LinkKind),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SameNode => write!(f, "a node cannot be linked to itself"),
            Rejection::AlreadyPaired => write!(f, "an endpoint is already paired"),
            Rejection::BackboneNeighbours => write!(f, "the nodes are backbone neighbours"),
            Rejection::HelperNode => write!(f, "layout helper nodes cannot be linked"),
            Rejection::Scaffolding(kind) => write!(f, "{} links cannot be removed", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Rejected(Rejection),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Maps scene coordinates into a viewport: `screen = scene * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub translate: Vector2<f64>,
    pub scale: f64,
}

impl ViewTransform {
    pub fn identity() -> Self {
        Self {
            translate: Vector2::zeros(),
            scale: 1.0,
        }
    }
}

/// Where a merged node lives: which molecule, and its index in that molecule's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeSlot {
    molecule: MoleculeKey,
    index: usize,
}

/// The merged working set of every molecule plus the links between molecules.
///
/// Molecules own their nodes and links. The scene keeps a merged view over them: a slot per
/// node in registration order and every link resolved to indices into those slots. The view
/// is recomputed by [`Scene::merge`] after every structural change, and every public
/// mutation either completes its merge or leaves the scene as it was.
///
/// Cross-molecule links are kept in a separate list so rebuilding a molecule never loses
/// them.
#[derive(Debug, Clone)]
pub struct Scene {
    toolkit: Arc<dyn StructureToolkit>,
    options: BuildOptions,
    molecules: SlotMap<MoleculeKey, Molecule>,
    order: Vec<MoleculeKey>,
    molecule_index: HashMap<MoleculeUid, MoleculeKey>,
    extra_links: Vec<Link>,
    slots: Vec<NodeSlot>,
    links: Vec<ResolvedLink>,
    node_index: NodeIndex,
    generation: u64,
}

impl Scene {
    pub fn new(toolkit: Arc<dyn StructureToolkit>, options: BuildOptions) -> Self {
        Self {
            toolkit,
            options,
            molecules: SlotMap::with_key(),
            order: Vec::new(),
            molecule_index: HashMap::new(),
            extra_links: Vec::new(),
            slots: Vec::new(),
            links: Vec::new(),
            node_index: NodeIndex::default(),
            generation: 0,
        }
    }

    pub fn toolkit(&self) -> &dyn StructureToolkit {
        self.toolkit.as_ref()
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// A graph builder using the scene's toolkit and options.
    pub fn builder(&self) -> GraphBuilder<'_> {
        GraphBuilder::new(self.toolkit.as_ref(), &self.options)
    }

    /// Builds a molecule with the scene's toolkit and options and adds it.
    pub fn add_structure(
        &mut self,
        spec: MoleculeSpec,
        avoid_overlap: bool,
    ) -> Result<MoleculeUid, SceneError> {
        let molecule = self.builder().build(spec)?;
        let uid = molecule.uid();
        self.add_molecule(molecule, avoid_overlap)?;
        Ok(uid)
    }

    /// Registers a molecule and merges.
    ///
    /// With `avoid_overlap`, the molecule is first shifted along x by the distance from its
    /// leftmost node to the rightmost node already in the scene, so it is placed to the
    /// right of existing content.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::DuplicateMolecule`] if the uid is taken, or
    /// [`SceneError::Resolve`] if one of its node uids already exists in the scene.
    pub fn add_molecule(
        &mut self,
        mut molecule: Molecule,
        avoid_overlap: bool,
    ) -> Result<MoleculeKey, SceneError> {
        if self.molecule_index.contains_key(&molecule.uid()) {
            return Err(SceneError::DuplicateMolecule(molecule.uid()));
        }
        if avoid_overlap {
            // An empty scene ends at x = 0.
            let max_x = self.max_x().unwrap_or(0.0);
            if let Some(min_x) = molecule.min_x() {
                molecule.translate(Vector2::new(max_x - min_x, 0.0));
            }
        }

        let key = self.insert(molecule);
        if let Err(err) = self.merge() {
            self.detach(key);
            return Err(err);
        }
        Ok(key)
    }

    /// Clears molecules, extra links and the merged view.
    pub fn remove_all(&mut self) {
        self.molecules.clear();
        self.order.clear();
        self.molecule_index.clear();
        self.extra_links.clear();
        self.slots.clear();
        self.links.clear();
        self.node_index = NodeIndex::default();
        self.generation += 1;
        debug!("Cleared scene.");
    }

    /// Rebuilds the merged node and link containers from the molecules and extra links.
    ///
    /// Every intermolecule extra link replaces any `fake` placeholder link joining the same
    /// two nodes. Links whose endpoints are missing are dropped from the merged view with a
    /// warning but stay stored. On error, the previous merged view is kept.
    pub fn merge(&mut self) -> Result<(), SceneError> {
        let molecules = &self.molecules;
        let slots: Vec<NodeSlot> = self
            .order
            .iter()
            .flat_map(|&key| {
                let count = molecules[key].nodes().len();
                (0..count).map(move |index| NodeSlot {
                    molecule: key,
                    index,
                })
            })
            .collect();
        let node_index = NodeIndex::build(
            slots
                .iter()
                .map(|slot| molecules[slot.molecule].nodes()[slot.index].uid),
        )?;

        let mut working: Vec<&Link> = self
            .order
            .iter()
            .flat_map(|&key| molecules[key].links())
            .collect();
        for extra in &self.extra_links {
            if extra.kind == LinkKind::Intermolecule {
                working.retain(|l| !(l.kind == LinkKind::Fake && l.joins(extra.source, extra.target)));
            }
            working.push(extra);
        }
        let (links, dropped) = resolver::resolve_links_lenient(&node_index, working);

        self.slots = slots;
        self.links = links;
        self.node_index = node_index;
        self.generation += 1;
        debug!(
            molecules = self.order.len(),
            nodes = self.slots.len(),
            links = self.links.len(),
            dropped = dropped.len(),
            generation = self.generation,
            "Merged scene."
        );
        Ok(())
    }

    /// Adds a link between two nodes.
    ///
    /// Within one molecule the two positions are paired in the pairtable and the molecule
    /// is rebuilt around it, keeping node uids, positions and pins. Between molecules the
    /// link becomes an intermolecule extra link. Links touching a layout helper node are
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownNode`] for an endpoint that is not in the scene.
    pub fn add_link(&mut self, mut link: Link) -> Result<EditOutcome, SceneError> {
        let source = self.require_node(link.source)?;
        let target = self.require_node(link.target)?;
        if source.uid == target.uid {
            return Ok(self.reject(Rejection::SameNode));
        }
        if !source.kind.is_connectable() || !target.kind.is_connectable() {
            return Ok(self.reject(Rejection::HelperNode));
        }

        if source.molecule == target.molecule {
            let key = self.molecule_key(source.molecule)?;
            let mut pairtable = self.molecules[key].pairtable().clone();
            pairtable
                .set_pair(source.num, target.num)
                .map_err(|err| SceneError::Structure {
                    molecule: source.molecule,
                    source: err,
                })?;
            self.rebuild(key, pairtable)?;
            debug!(source = %source.uid, target = %target.uid, "Paired nodes within a molecule.");
        } else {
            link.kind = LinkKind::Intermolecule;
            if self.extra_links.iter().any(|l| l.uid == link.uid) {
                return Ok(EditOutcome::Applied);
            }
            self.extra_links.push(link);
            if let Err(err) = self.merge() {
                self.extra_links.pop();
                return Err(err);
            }
            debug!(source = %source.uid, target = %target.uid, "Linked nodes across molecules.");
        }
        Ok(EditOutcome::Applied)
    }

    /// Removes a link by uid.
    ///
    /// Removing a pairing link unpairs both positions and rebuilds the molecule; removing an
    /// extra link drops it from the extra-link list. Scaffolding links are refused.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownLink`] if no molecule or extra link has this uid.
    pub fn remove_link(&mut self, uid: LinkUid) -> Result<EditOutcome, SceneError> {
        if let Some(position) = self.extra_links.iter().position(|l| l.uid == uid) {
            let kind = self.extra_links[position].kind;
            if !kind.is_removable() {
                return Ok(self.reject(Rejection::Scaffolding(kind)));
            }
            let removed = self.extra_links.remove(position);
            if let Err(err) = self.merge() {
                self.extra_links.insert(position, removed);
                return Err(err);
            }
            debug!(link = %uid, "Removed extra link.");
            return Ok(EditOutcome::Applied);
        }

        let (key, link) = self
            .order
            .iter()
            .find_map(|&key| {
                self.molecules[key]
                    .links()
                    .iter()
                    .find(|l| l.uid == uid)
                    .map(|l| (key, l.clone()))
            })
            .ok_or(SceneError::UnknownLink(uid))?;
        if !link.kind.is_removable() {
            return Ok(self.reject(Rejection::Scaffolding(link.kind)));
        }

        let molecule = &self.molecules[key];
        if link.kind.is_pairing() {
            let source = molecule
                .node(link.source)
                .ok_or(SceneError::UnknownNode(link.source))?;
            let target = molecule
                .node(link.target)
                .ok_or(SceneError::UnknownNode(link.target))?;
            let mut pairtable = molecule.pairtable().clone();
            pairtable
                .unpair(source.num)
                .and_then(|_| pairtable.unpair(target.num))
                .map_err(|err| SceneError::Structure {
                    molecule: molecule.uid(),
                    source: err,
                })?;
            self.rebuild(key, pairtable)?;
        } else {
            let previous = molecule.clone();
            self.molecules[key].links.retain(|l| l.uid != uid);
            if let Err(err) = self.merge() {
                self.molecules[key] = previous;
                return Err(err);
            }
        }
        debug!(link = %uid, "Removed link.");
        Ok(EditOutcome::Applied)
    }

    /// Links two nodes with a new basepair after the checks an interactive front-end makes.
    ///
    /// The connection is refused if both are the same node, if either endpoint already takes
    /// part in a pairing link, if a backbone link joins them, or if either is a helper node.
    pub fn connect_nodes(
        &mut self,
        source: NodeUid,
        target: NodeUid,
    ) -> Result<EditOutcome, SceneError> {
        let s = self
            .node_index
            .get(source)
            .ok_or(SceneError::UnknownNode(source))?;
        let t = self
            .node_index
            .get(target)
            .ok_or(SceneError::UnknownNode(target))?;

        if s == t {
            return Ok(self.reject(Rejection::SameNode));
        }
        let touches = |l: &ResolvedLink, i: usize| l.source == i || l.target == i;
        if self
            .links
            .iter()
            .any(|l| l.kind.is_pairing() && (touches(l, s) || touches(l, t)))
        {
            return Ok(self.reject(Rejection::AlreadyPaired));
        }
        if self.links.iter().any(|l| {
            l.kind == LinkKind::Backbone
                && ((l.source == s && l.target == t) || (l.source == t && l.target == s))
        }) {
            return Ok(self.reject(Rejection::BackboneNeighbours));
        }
        self.add_link(Link::new(LinkKind::Basepair, source, target, 1.0))
    }

    /// Sets or clears the user pin of a node.
    pub fn set_user_fixed(&mut self, uid: NodeUid, fixed: bool) -> Result<(), SceneError> {
        let index = self
            .node_index
            .get(uid)
            .ok_or(SceneError::UnknownNode(uid))?;
        let node = self
            .node_at_mut(index)
            .ok_or(SceneError::UnknownNode(uid))?;
        node.pin.user_fixed = fixed;
        Ok(())
    }

    /// Captures the scene as a cycle-free document.
    pub fn export(&self) -> SceneDocument {
        SceneDocument {
            molecules: self.molecules().map(MoleculeView::from_molecule).collect(),
            extra_links: self.extra_links.iter().map(LinkView::from_link).collect(),
        }
    }

    /// Adds every molecule and extra link of a document, then merges once.
    ///
    /// Saved positions are kept as they are. The import is staged on a copy of the scene,
    /// so a failure leaves this scene unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Import`] for malformed records and
    /// [`SceneError::DuplicateMolecule`] when a molecule is already present.
    pub fn import(
        &mut self,
        document: SceneDocument,
        reporter: &ProgressReporter,
    ) -> Result<(), SceneError> {
        let _phase = reporter.phase("Importing scene");
        let mut staged = self.clone();
        let extra_links = document.extra_links()?;
        {
            let task = reporter.task(document.molecules.len() as u64);
            for view in document.molecules {
                let molecule = view.into_molecule(staged.toolkit.as_ref())?;
                if staged.molecule_index.contains_key(&molecule.uid()) {
                    return Err(SceneError::DuplicateMolecule(molecule.uid()));
                }
                staged.insert(molecule);
                task.step();
            }
        }
        for link in extra_links {
            if !staged.extra_links.iter().any(|l| l.uid == link.uid) {
                staged.extra_links.push(link);
            }
        }
        staged.merge()?;
        *self = staged;
        debug!(molecules = self.order.len(), "Imported scene document.");
        Ok(())
    }

    /// Molecules in registration order.
    pub fn molecules(&self) -> impl Iterator<Item = &Molecule> + '_ {
        self.order.iter().map(move |&key| &self.molecules[key])
    }

    pub fn molecule(&self, uid: MoleculeUid) -> Option<&Molecule> {
        self.molecule_index
            .get(&uid)
            .and_then(|&key| self.molecules.get(key))
    }

    pub fn molecule_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Merged nodes in molecule registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.slots
            .iter()
            .map(move |slot| &self.molecules[slot.molecule].nodes()[slot.index])
    }

    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    pub fn node_at(&self, index: usize) -> Option<&Node> {
        let slot = self.slots.get(index)?;
        self.molecules.get(slot.molecule)?.nodes().get(slot.index)
    }

    pub fn node(&self, uid: NodeUid) -> Option<&Node> {
        self.node_index.get(uid).and_then(|i| self.node_at(i))
    }

    pub fn node_position(&self, uid: NodeUid) -> Option<usize> {
        self.node_index.get(uid)
    }

    pub(crate) fn node_at_mut(&mut self, index: usize) -> Option<&mut Node> {
        let slot = *self.slots.get(index)?;
        self.molecules
            .get_mut(slot.molecule)?
            .nodes_mut()
            .get_mut(slot.index)
    }

    /// Merged links with endpoints resolved to indices into [`Scene::nodes`].
    pub fn links(&self) -> &[ResolvedLink] {
        &self.links
    }

    pub fn extra_links(&self) -> &[Link] {
        &self.extra_links
    }

    /// Incremented on every merge and clear.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut nodes = self.nodes();
        let first = nodes.next()?.position;
        let (min, max) = nodes.fold((first, first), |(min, max), node| {
            (
                Point2::new(min.x.min(node.position.x), min.y.min(node.position.y)),
                Point2::new(max.x.max(node.position.x), max.y.max(node.position.y)),
            )
        });
        Some(BoundingBox { min, max })
    }

    /// The transform that centers the scene in a `width` by `height` viewport, scaled to
    /// leave a margin around it. An empty scene gets the identity.
    pub fn fit_transform(&self, width: f64, height: f64) -> ViewTransform {
        let Some(bounds) = self.bounding_box() else {
            return ViewTransform::identity();
        };
        let (w, h) = (bounds.width(), bounds.height());
        let scale = (width / (w + 1.0)).min(height / (h + 1.0)) * FIT_MARGIN;
        ViewTransform {
            translate: Vector2::new(
                -bounds.min.x * scale + (width - w * scale) / 2.0,
                -bounds.min.y * scale + (height - h * scale) / 2.0,
            ),
            scale,
        }
    }

    fn max_x(&self) -> Option<f64> {
        self.nodes().map(|n| n.position.x).reduce(f64::max)
    }

    fn insert(&mut self, mut molecule: Molecule) -> MoleculeKey {
        let uid = molecule.uid();
        for node in molecule.nodes_mut() {
            node.molecule = uid;
        }
        let key = self.molecules.insert(molecule);
        self.order.push(key);
        self.molecule_index.insert(uid, key);
        key
    }

    fn detach(&mut self, key: MoleculeKey) {
        if let Some(molecule) = self.molecules.remove(key) {
            self.molecule_index.remove(&molecule.uid());
        }
        self.order.retain(|&k| k != key);
    }

    fn molecule_key(&self, uid: MoleculeUid) -> Result<MoleculeKey, SceneError> {
        self.molecule_index
            .get(&uid)
            .copied()
            .ok_or(SceneError::UnknownMolecule(uid))
    }

    fn require_node(&self, uid: NodeUid) -> Result<Node, SceneError> {
        self.node(uid).cloned().ok_or(SceneError::UnknownNode(uid))
    }

    /// Replaces a molecule with one rebuilt around `pairtable` and merges, restoring the
    /// old molecule if the merge fails.
    fn rebuild(&mut self, key: MoleculeKey, pairtable: PairTable) -> Result<(), SceneError> {
        let current = &self.molecules[key];
        let rebuilt = self
            .builder()
            .rederive(current, pairtable)
            .map_err(|err| SceneError::Structure {
                molecule: current.uid(),
                source: err,
            })?;
        let previous = std::mem::replace(&mut self.molecules[key], rebuilt);
        if let Err(err) = self.merge() {
            self.molecules[key] = previous;
            return Err(err);
        }
        Ok(())
    }

    fn reject(&self, rejection: Rejection) -> EditOutcome {
        warn!("Edit rejected: {}", rejection);
        EditOutcome::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::scene_json::Endpoint;
    use crate::core::models::node::NodeKind;
    use crate::core::structure::elements::ElementKind;
    use crate::core::structure::toolkit::DefaultToolkit;

    fn scene() -> Scene {
        Scene::new(Arc::new(DefaultToolkit), BuildOptions::default())
    }

    fn scene_with(structures: &[&str]) -> (Scene, Vec<MoleculeUid>) {
        let mut scene = scene();
        let uids = structures
            .iter()
            .map(|s| scene.add_structure(MoleculeSpec::new(*s), true).unwrap())
            .collect();
        (scene, uids)
    }

    fn nucleotide(scene: &Scene, molecule: MoleculeUid, num: usize) -> NodeUid {
        scene
            .molecule(molecule)
            .unwrap()
            .nucleotides()
            .find(|n| n.num == num)
            .unwrap()
            .uid
    }

    fn link_uids(scene: &Scene) -> Vec<LinkUid> {
        let mut uids: Vec<_> = scene.links().iter().map(|l| l.uid).collect();
        uids.sort();
        uids
    }

    mod composition {
        use super::*;

        #[test]
        fn merge_concatenates_molecules_in_order() {
            let (scene, uids) = scene_with(&["((...))", "...."]);
            let first = scene.molecule(uids[0]).unwrap().nodes().len();
            let second = scene.molecule(uids[1]).unwrap().nodes().len();

            assert_eq!(scene.node_count(), first + second);
            assert_eq!(scene.nodes().next().unwrap().molecule, uids[0]);
            assert_eq!(scene.nodes().last().unwrap().molecule, uids[1]);
            for link in scene.links() {
                assert!(link.source < scene.node_count());
                assert!(link.target < scene.node_count());
            }
        }

        #[test]
        fn duplicate_molecules_are_refused() {
            let (mut scene, uids) = scene_with(&["(...)"]);
            let copy = scene.molecule(uids[0]).unwrap().clone();
            assert!(matches!(
                scene.add_molecule(copy, false),
                Err(SceneError::DuplicateMolecule(_))
            ));
            assert_eq!(scene.molecule_count(), 1);
        }

        #[test]
        fn clashing_node_uids_leave_the_scene_unchanged() {
            let (mut scene, uids) = scene_with(&["(...)"]);
            let shared = scene.molecule(uids[0]).unwrap().nodes()[0].uid;
            let clash = scene
                .builder()
                .build(MoleculeSpec::new("...").uids(vec![shared]))
                .unwrap();
            let generation = scene.generation();

            assert!(matches!(
                scene.add_molecule(clash, false),
                Err(SceneError::Resolve(_))
            ));
            assert_eq!(scene.molecule_count(), 1);
            assert_eq!(scene.generation(), generation);
        }

        #[test]
        fn new_molecules_are_placed_to_the_right() {
            let (scene, uids) = scene_with(&["((((....))))", "((...))"]);
            let max_a = scene
                .molecule(uids[0])
                .unwrap()
                .nodes()
                .iter()
                .map(|n| n.position.x)
                .fold(f64::MIN, f64::max);
            let min_b = scene.molecule(uids[1]).unwrap().min_x().unwrap();
            assert!(min_b >= max_a - 1e-9);
        }

        #[test]
        fn first_molecule_starts_at_the_origin() {
            let mut scene = scene();
            let positions = [50.0, 65.0, 80.0]
                .into_iter()
                .map(|x| Point2::new(x, 10.0))
                .collect();
            let uid = scene
                .add_structure(MoleculeSpec::new("...").positions(positions), true)
                .unwrap();
            let molecule = scene.molecule(uid).unwrap();
            assert_eq!(molecule.min_x(), Some(0.0));
            assert_eq!(molecule.nodes()[2].position, Point2::new(30.0, 10.0));
        }

        #[test]
        fn overlap_avoidance_keeps_velocity() {
            let mut scene = scene();
            scene.add_structure(MoleculeSpec::new("(...)"), false).unwrap();
            let uid = scene.add_structure(MoleculeSpec::new("(...)"), true).unwrap();
            for node in scene.molecule(uid).unwrap().nodes() {
                assert_eq!(node.position, node.previous);
            }
        }

        #[test]
        fn merge_is_idempotent() {
            let (mut scene, _) = scene_with(&["((..))", "(...)"]);
            scene.merge().unwrap();
            let nodes: Vec<_> = scene.nodes().map(|n| n.uid).collect();
            let links = scene.links().to_vec();
            scene.merge().unwrap();
            assert_eq!(scene.nodes().map(|n| n.uid).collect::<Vec<_>>(), nodes);
            assert_eq!(scene.links(), links.as_slice());
        }

        #[test]
        fn remove_all_clears_everything() {
            let (mut scene, uids) = scene_with(&["(...)", "(...)"]);
            let a = nucleotide(&scene, uids[0], 1);
            let b = nucleotide(&scene, uids[1], 1);
            scene.add_link(Link::new(LinkKind::Basepair, a, b, 1.0)).unwrap();

            scene.remove_all();
            assert!(scene.is_empty());
            assert_eq!(scene.node_count(), 0);
            assert!(scene.links().is_empty());
            assert!(scene.extra_links().is_empty());
        }
    }

    mod editing {
        use super::*;

        #[test]
        fn pairing_within_a_molecule_rebuilds_it() {
            let (mut scene, uids) = scene_with(&["........"]);
            let before: Vec<_> = scene
                .molecule(uids[0])
                .unwrap()
                .nucleotides()
                .map(|n| (n.uid, n.position))
                .collect();
            let a = nucleotide(&scene, uids[0], 1);
            let b = nucleotide(&scene, uids[0], 8);

            let outcome = scene.add_link(Link::new(LinkKind::Basepair, a, b, 1.0)).unwrap();
            assert_eq!(outcome, EditOutcome::Applied);

            let molecule = scene.molecule(uids[0]).unwrap();
            assert_eq!(molecule.structure(), "(......)");
            assert_eq!(molecule.pairtable().partner(1), Some(8));
            let after: Vec<_> = molecule.nucleotides().map(|n| (n.uid, n.position)).collect();
            assert_eq!(after, before);
            assert!(
                scene
                    .links()
                    .iter()
                    .any(|l| l.kind == LinkKind::Basepair)
            );
            assert!(scene.extra_links().is_empty());
        }

        #[test]
        fn linking_across_molecules_creates_an_extra_link() {
            let (mut scene, uids) = scene_with(&["(...)", "(...)"]);
            let a = nucleotide(&scene, uids[0], 2);
            let b = nucleotide(&scene, uids[1], 3);
            let link = Link::new(LinkKind::Basepair, a, b, 1.0);

            scene.add_link(link.clone()).unwrap();
            assert_eq!(scene.extra_links().len(), 1);
            assert_eq!(scene.extra_links()[0].kind, LinkKind::Intermolecule);
            assert!(
                scene
                    .links()
                    .iter()
                    .any(|l| l.uid == link.uid && l.kind == LinkKind::Intermolecule)
            );
        }

        #[test]
        fn extra_links_survive_repeated_merges() {
            let (mut scene, uids) = scene_with(&["(...)", "(...)"]);
            let a = nucleotide(&scene, uids[0], 2);
            let b = nucleotide(&scene, uids[1], 3);
            scene.add_link(Link::new(LinkKind::Basepair, a, b, 1.0)).unwrap();
            let extra: Vec<_> = scene.extra_links().iter().map(|l| l.uid).collect();

            for _ in 0..3 {
                scene.merge().unwrap();
            }
            assert_eq!(
                scene.extra_links().iter().map(|l| l.uid).collect::<Vec<_>>(),
                extra
            );
            let in_view = scene.links().iter().filter(|l| extra.contains(&l.uid)).count();
            assert_eq!(in_view, 1);
        }

        #[test]
        fn extra_links_survive_rebuilding_their_molecule() {
            let (mut scene, uids) = scene_with(&["......", "(...)"]);
            let a = nucleotide(&scene, uids[0], 1);
            let b = nucleotide(&scene, uids[1], 3);
            scene.add_link(Link::new(LinkKind::Basepair, a, b, 1.0)).unwrap();

            let x = nucleotide(&scene, uids[0], 2);
            let y = nucleotide(&scene, uids[0], 6);
            scene.add_link(Link::new(LinkKind::Basepair, x, y, 1.0)).unwrap();

            assert_eq!(scene.extra_links().len(), 1);
            assert!(
                scene
                    .links()
                    .iter()
                    .any(|l| l.kind == LinkKind::Intermolecule)
            );
        }

        #[test]
        fn helper_nodes_cannot_be_linked() {
            let (mut scene, uids) = scene_with(&["((....))"]);
            let middle = scene
                .nodes()
                .find(|n| n.kind == NodeKind::Middle)
                .unwrap()
                .uid;
            let a = nucleotide(&scene, uids[0], 4);
            let links = link_uids(&scene);

            let outcome = scene
                .add_link(Link::new(LinkKind::Basepair, middle, a, 1.0))
                .unwrap();
            assert_eq!(outcome, EditOutcome::Rejected(Rejection::HelperNode));
            assert_eq!(link_uids(&scene), links);
        }

        #[test]
        fn unknown_endpoints_are_errors() {
            let (mut scene, uids) = scene_with(&["(...)"]);
            let a = nucleotide(&scene, uids[0], 1);
            assert!(matches!(
                scene.add_link(Link::new(LinkKind::Basepair, a, NodeUid::new(), 1.0)),
                Err(SceneError::UnknownNode(_))
            ));
        }

        #[test]
        fn removing_a_basepair_unpairs_both_positions() {
            let (mut scene, uids) = scene_with(&["(((...)))"]);
            let molecule = scene.molecule(uids[0]).unwrap();
            let outer = molecule
                .links()
                .iter()
                .find(|l| {
                    l.kind == LinkKind::Basepair
                        && molecule.node(l.source).map(|n| n.num) == Some(1)
                })
                .unwrap()
                .uid;

            let outcome = scene.remove_link(outer).unwrap();
            assert_eq!(outcome, EditOutcome::Applied);

            let molecule = scene.molecule(uids[0]).unwrap();
            assert_eq!(molecule.pairtable().partner(1), None);
            assert_eq!(molecule.pairtable().partner(9), None);
            let stem = molecule
                .elements()
                .iter()
                .find(|e| e.kind == ElementKind::Stem)
                .unwrap();
            assert_eq!(stem.positions, vec![2, 3, 7, 8]);
        }

        #[test]
        fn scaffolding_links_cannot_be_removed() {
            let (mut scene, uids) = scene_with(&["(...)"]);
            let backbone = scene
                .molecule(uids[0])
                .unwrap()
                .links()
                .iter()
                .find(|l| l.kind == LinkKind::Backbone)
                .unwrap()
                .uid;
            let links = link_uids(&scene);

            assert_eq!(
                scene.remove_link(backbone).unwrap(),
                EditOutcome::Rejected(Rejection::Scaffolding(LinkKind::Backbone))
            );
            assert_eq!(link_uids(&scene), links);
        }

        #[test]
        fn removing_an_extra_link() {
            let (mut scene, uids) = scene_with(&["(...)", "(...)"]);
            let a = nucleotide(&scene, uids[0], 2);
            let b = nucleotide(&scene, uids[1], 3);
            let link = Link::new(LinkKind::Intermolecule, a, b, 1.0);
            scene.add_link(link.clone()).unwrap();

            assert_eq!(scene.remove_link(link.uid).unwrap(), EditOutcome::Applied);
            assert!(scene.extra_links().is_empty());
            assert!(scene.links().iter().all(|l| l.uid != link.uid));
            assert!(matches!(
                scene.remove_link(link.uid),
                Err(SceneError::UnknownLink(_))
            ));
        }

        #[test]
        fn user_pins_are_kept_across_rebuilds() {
            let (mut scene, uids) = scene_with(&["........"]);
            let pinned = nucleotide(&scene, uids[0], 4);
            scene.set_user_fixed(pinned, true).unwrap();

            let a = nucleotide(&scene, uids[0], 1);
            let b = nucleotide(&scene, uids[0], 8);
            scene.add_link(Link::new(LinkKind::Basepair, a, b, 1.0)).unwrap();
            assert!(scene.node(pinned).unwrap().pin.user_fixed);
        }

        #[test]
        fn loop_centers_keep_their_state_across_rebuilds() {
            let (mut scene, uids) = scene_with(&["((.....)).........."]);
            let center = scene
                .molecule(uids[0])
                .unwrap()
                .nodes()
                .iter()
                .find(|n| n.kind == NodeKind::Middle)
                .unwrap()
                .uid;
            let index = scene.node_position(center).unwrap();
            {
                let node = scene.node_at_mut(index).unwrap();
                node.previous = Point2::new(498.0, 499.0);
                node.position = Point2::new(500.0, 500.0);
            }
            scene.set_user_fixed(center, true).unwrap();

            let a = nucleotide(&scene, uids[0], 11);
            let b = nucleotide(&scene, uids[0], 17);
            let outcome = scene.add_link(Link::new(LinkKind::Basepair, a, b, 1.0)).unwrap();
            assert_eq!(outcome, EditOutcome::Applied);

            let node = scene.node(center).unwrap();
            assert_eq!(node.kind, NodeKind::Middle);
            assert_eq!(node.position, Point2::new(500.0, 500.0));
            assert_eq!(node.previous, Point2::new(498.0, 499.0));
            assert!(node.pin.user_fixed);
            let centers = scene
                .molecule(uids[0])
                .unwrap()
                .nodes()
                .iter()
                .filter(|n| n.kind == NodeKind::Middle)
                .count();
            assert_eq!(centers, 2);
        }
    }

    mod connection_checks {
        use super::*;

        #[test]
        fn refuses_the_same_node() {
            let (mut scene, uids) = scene_with(&["......"]);
            let a = nucleotide(&scene, uids[0], 1);
            assert_eq!(
                scene.connect_nodes(a, a).unwrap(),
                EditOutcome::Rejected(Rejection::SameNode)
            );
        }

        #[test]
        fn refuses_already_paired_nodes() {
            let (mut scene, uids) = scene_with(&["(....)"]);
            let a = nucleotide(&scene, uids[0], 1);
            let b = nucleotide(&scene, uids[0], 4);
            assert_eq!(
                scene.connect_nodes(a, b).unwrap(),
                EditOutcome::Rejected(Rejection::AlreadyPaired)
            );
        }

        #[test]
        fn refuses_backbone_neighbours() {
            let (mut scene, uids) = scene_with(&["......"]);
            let a = nucleotide(&scene, uids[0], 2);
            let b = nucleotide(&scene, uids[0], 3);
            assert_eq!(
                scene.connect_nodes(a, b).unwrap(),
                EditOutcome::Rejected(Rejection::BackboneNeighbours)
            );
        }

        #[test]
        fn refuses_labels() {
            let (mut scene, uids) = scene_with(&["............"]);
            let label = scene
                .nodes()
                .find(|n| n.kind == NodeKind::Label)
                .unwrap()
                .uid;
            let a = nucleotide(&scene, uids[0], 2);
            assert_eq!(
                scene.connect_nodes(label, a).unwrap(),
                EditOutcome::Rejected(Rejection::HelperNode)
            );
        }

        #[test]
        fn pairs_free_nodes() {
            let (mut scene, uids) = scene_with(&["......"]);
            let a = nucleotide(&scene, uids[0], 1);
            let b = nucleotide(&scene, uids[0], 6);
            assert_eq!(scene.connect_nodes(a, b).unwrap(), EditOutcome::Applied);
            assert_eq!(scene.molecule(uids[0]).unwrap().structure(), "(....)");
        }
    }

    mod documents {
        use super::*;

        #[test]
        fn export_then_import_restores_identity() {
            let (mut original, uids) = scene_with(&["((...))", "(....)"]);
            let a = nucleotide(&original, uids[0], 3);
            let b = nucleotide(&original, uids[1], 3);
            original
                .add_link(Link::new(LinkKind::Basepair, a, b, 1.0))
                .unwrap();

            let mut restored = scene();
            restored
                .import(original.export(), &ProgressReporter::new())
                .unwrap();

            let ids = |s: &Scene| {
                s.molecules()
                    .map(|m| {
                        let nodes: Vec<_> = m.nodes().iter().map(|n| (n.uid, n.kind)).collect();
                        let links: Vec<_> = m
                            .links()
                            .iter()
                            .map(|l| (l.uid, l.kind, l.source, l.target))
                            .collect();
                        (m.uid(), nodes, links)
                    })
                    .collect::<Vec<_>>()
            };
            assert_eq!(ids(&restored), ids(&original));
            assert_eq!(restored.extra_links(), original.extra_links());
            assert_eq!(link_uids(&restored), link_uids(&original));
        }

        #[test]
        fn intermolecule_links_replace_fake_placeholders() {
            let (source, uids) = scene_with(&["(...)", "(...)"]);
            let a = nucleotide(&source, uids[0], 1);
            let b = nucleotide(&source, uids[1], 1);
            let mut document = source.export();
            let placeholder = Link::new(LinkKind::Fake, b, a, 1.0);
            let real = Link::new(LinkKind::Intermolecule, a, b, 1.0);
            document.extra_links = vec![LinkView::from_link(&placeholder), LinkView::from_link(&real)];

            let mut scene = scene();
            scene.import(document, &ProgressReporter::new()).unwrap();
            assert!(scene.links().iter().any(|l| l.uid == real.uid));
            assert!(scene.links().iter().all(|l| l.uid != placeholder.uid));
            assert_eq!(scene.extra_links().len(), 2);
        }

        #[test]
        fn dangling_extra_links_are_dropped_from_the_view() {
            let (source, uids) = scene_with(&["(...)"]);
            let a = nucleotide(&source, uids[0], 1);
            let mut document = source.export();
            let dangling = Link::new(LinkKind::Intermolecule, a, NodeUid::new(), 1.0);
            document.extra_links.push(LinkView::from_link(&dangling));

            let mut scene = scene();
            scene.import(document, &ProgressReporter::new()).unwrap();
            assert!(scene.links().iter().all(|l| l.uid != dangling.uid));
            assert_eq!(scene.molecule_count(), 1);
        }

        #[test]
        fn failed_import_leaves_the_scene_unchanged() {
            let (mut scene, _) = scene_with(&["(...)"]);
            let mut document = scene.export();
            document.extra_links.push(LinkView {
                uid: None,
                kind: LinkKind::Intermolecule,
                source: Endpoint::Index(0),
                target: Endpoint::Index(1),
                weight: 1.0,
            });
            let generation = scene.generation();

            let result = scene.import(document, &ProgressReporter::new());
            assert!(matches!(result, Err(SceneError::Import(_))));
            assert_eq!(scene.molecule_count(), 1);
            assert_eq!(scene.generation(), generation);
        }

        #[test]
        fn importing_the_same_molecule_twice_fails() {
            let (mut scene, _) = scene_with(&["(...)"]);
            let document = scene.export();
            assert!(matches!(
                scene.import(document, &ProgressReporter::new()),
                Err(SceneError::DuplicateMolecule(_))
            ));
            assert_eq!(scene.molecule_count(), 1);
        }
    }

    mod geometry {
        use super::*;

        #[test]
        fn empty_scene_has_identity_transform() {
            let scene = scene();
            assert_eq!(scene.bounding_box(), None);
            assert_eq!(scene.fit_transform(800.0, 600.0), ViewTransform::identity());
        }

        #[test]
        fn transform_centers_the_scene() {
            let mut scene = scene();
            let positions = vec![Point2::new(10.0, 20.0), Point2::new(109.0, 69.0)];
            scene
                .add_structure(MoleculeSpec::new("..").positions(positions), false)
                .unwrap();

            let bounds = scene.bounding_box().unwrap();
            assert_eq!(bounds.min, Point2::new(10.0, 20.0));
            assert_eq!(bounds.max, Point2::new(109.0, 69.0));

            let transform = scene.fit_transform(200.0, 200.0);
            assert!((transform.scale - 1.6).abs() < 1e-12);
            let center = Point2::new(59.5, 44.5).coords * transform.scale + transform.translate;
            assert!((center.x - 100.0).abs() < 1e-9);
            assert!((center.y - 100.0).abs() < 1e-9);
        }
    }
}
