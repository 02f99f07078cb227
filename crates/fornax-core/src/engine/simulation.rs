use super::config::LayoutConfig;
use super::error::SceneError;
use super::render::Renderer;
use super::scene::Scene;
use crate::core::models::ids::NodeUid;
use crate::core::models::node::{Node, NodeKind};
use nalgebra::{Point2, Vector2};
use tracing::{debug, trace};

/// Per-node data a force layout needs when it (re)binds to the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyNode {
    pub uid: NodeUid,
    pub kind: NodeKind,
    pub radius: f64,
    /// Whether the collision pass may move this node.
    pub collidable: bool,
}

/// A spring between two nodes, addressed by position in [`LayoutTopology::nodes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologySpring {
    pub source: usize,
    pub target: usize,
    pub distance: f64,
    pub strength: f64,
}

/// Snapshot of the scene structure at one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTopology {
    pub generation: u64,
    pub nodes: Vec<TopologyNode>,
    pub springs: Vec<TopologySpring>,
}

impl LayoutTopology {
    /// Derives the springs and node attributes of `scene` under `config`.
    pub fn from_scene(scene: &Scene, config: &LayoutConfig) -> Self {
        let nodes = scene
            .nodes()
            .map(|n| TopologyNode {
                uid: n.uid,
                kind: n.kind,
                radius: n.radius,
                collidable: n.kind.is_collidable(),
            })
            .collect();
        let springs = scene
            .links()
            .iter()
            .map(|l| TopologySpring {
                source: l.source,
                target: l.target,
                distance: config.link_distance(l.weight),
                strength: config.link_strength(l.kind),
            })
            .collect();
        Self {
            generation: scene.generation(),
            nodes,
            springs,
        }
    }
}

/// An iterative force-directed layout driven by [`SimulationAdapter`].
pub trait ForceLayout {
    /// Called before the first tick and after every merge with the new topology.
    fn bind(&mut self, topology: &LayoutTopology);

    /// Performs one iteration, reading and writing positions through `view`.
    fn tick(&mut self, view: &mut SimulationView<'_>);
}

/// Live access to node positions during a layout tick.
///
/// Indices are the ones of the topology handed to [`ForceLayout::bind`]. Only positions can
/// be written, and writes to pinned nodes are ignored.
pub struct SimulationView<'s> {
    scene: &'s mut Scene,
}

impl<'s> SimulationView<'s> {
    fn new(scene: &'s mut Scene) -> Self {
        Self { scene }
    }

    pub fn len(&self) -> usize {
        self.scene.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, index: usize) -> Option<Point2<f64>> {
        self.scene.node_at(index).map(|n| n.position)
    }

    pub fn previous(&self, index: usize) -> Option<Point2<f64>> {
        self.scene.node_at(index).map(|n| n.previous)
    }

    pub fn kind(&self, index: usize) -> Option<NodeKind> {
        self.scene.node_at(index).map(|n| n.kind)
    }

    pub fn is_fixed(&self, index: usize) -> bool {
        self.scene.node_at(index).is_some_and(|n| n.pin.is_fixed())
    }

    pub fn is_collidable(&self, index: usize) -> bool {
        self.scene
            .node_at(index)
            .is_some_and(|n| n.kind.is_collidable())
    }

    /// Moves a node, keeping its old position as the previous one.
    ///
    /// Returns `false` without moving anything if the node is pinned or out of range.
    pub fn set_position(&mut self, index: usize, position: Point2<f64>) -> bool {
        match self.scene.node_at_mut(index) {
            Some(node) if !node.pin.is_fixed() => {
                node.previous = node.position;
                node.position = position;
                true
            }
            _ => false,
        }
    }
}

/// Hands the scene to a [`ForceLayout`] and keeps it bound across merges.
pub struct SimulationAdapter<L> {
    layout: L,
    config: LayoutConfig,
    bound: Option<u64>,
}

impl<L: ForceLayout> SimulationAdapter<L> {
    pub fn new(layout: L, config: LayoutConfig) -> Self {
        Self {
            layout,
            config,
            bound: None,
        }
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Rebinds the layout if the scene was merged since the last bind.
    ///
    /// The renderer receives the new containers whenever a rebind happens.
    ///
    /// # Return
    ///
    /// Returns `true` if the layout was rebound.
    pub fn sync(&mut self, scene: &Scene, renderer: &mut dyn Renderer) -> bool {
        if self.bound == Some(scene.generation()) {
            return false;
        }
        let topology = LayoutTopology::from_scene(scene, &self.config);
        self.layout.bind(&topology);
        let nodes: Vec<&Node> = scene.nodes().collect();
        renderer.on_scene_changed(&nodes, scene.links());
        self.bound = Some(scene.generation());
        debug!(
            generation = topology.generation,
            nodes = topology.nodes.len(),
            springs = topology.springs.len(),
            "Bound force layout to scene."
        );
        true
    }

    /// Runs one layout iteration, rebinding first if needed.
    pub fn tick(&mut self, scene: &mut Scene, renderer: &mut dyn Renderer) {
        self.sync(scene, renderer);
        let mut view = SimulationView::new(scene);
        self.layout.tick(&mut view);
        trace!("Force layout tick.");
    }
}

/// A drag of one or more nodes by the same offset.
///
/// Dragged nodes are held in place for the layout until [`DragGesture::end`], which clears
/// only the drag pin.
#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    nodes: Vec<NodeUid>,
}

impl DragGesture {
    /// Pins every node in `nodes` for dragging.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownNode`] if a uid is not in the scene; no node is pinned
    /// in that case.
    pub fn begin(scene: &mut Scene, nodes: Vec<NodeUid>) -> Result<Self, SceneError> {
        let indices = indices_of(scene, &nodes)?;
        for index in indices {
            if let Some(node) = scene.node_at_mut(index) {
                node.pin.drag_fixed = true;
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[NodeUid] {
        &self.nodes
    }

    /// Moves every dragged node by `delta`. Previous positions move too, so no velocity is
    /// introduced.
    pub fn drag_by(&self, scene: &mut Scene, delta: Vector2<f64>) -> Result<(), SceneError> {
        for index in indices_of(scene, &self.nodes)? {
            if let Some(node) = scene.node_at_mut(index) {
                node.translate(delta);
            }
        }
        Ok(())
    }

    /// Releases the drag pin of every dragged node that is still in the scene.
    pub fn end(self, scene: &mut Scene) {
        for uid in self.nodes {
            if let Some(index) = scene.node_position(uid) {
                if let Some(node) = scene.node_at_mut(index) {
                    node.pin.drag_fixed = false;
                }
            }
        }
    }
}

fn indices_of(scene: &Scene, nodes: &[NodeUid]) -> Result<Vec<usize>, SceneError> {
    nodes
        .iter()
        .map(|&uid| scene.node_position(uid).ok_or(SceneError::UnknownNode(uid)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::builder::{BuildOptions, MoleculeSpec};
    use crate::core::models::link::{Link, LinkKind};
    use crate::core::structure::toolkit::DefaultToolkit;
    use crate::engine::resolver::ResolvedLink;
    use std::sync::Arc;

    /// Pushes every node one unit to the right and records what it was bound to.
    #[derive(Default)]
    struct Drift {
        binds: Vec<LayoutTopology>,
        moved: usize,
    }

    impl ForceLayout for Drift {
        fn bind(&mut self, topology: &LayoutTopology) {
            self.binds.push(topology.clone());
        }

        fn tick(&mut self, view: &mut SimulationView<'_>) {
            for i in 0..view.len() {
                let Some(p) = view.position(i) else { continue };
                if view.set_position(i, p + Vector2::new(1.0, 0.0)) {
                    self.moved += 1;
                }
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        changes: Vec<(usize, usize)>,
    }

    impl Renderer for Recorder {
        fn on_scene_changed(&mut self, nodes: &[&Node], links: &[ResolvedLink]) {
            self.changes.push((nodes.len(), links.len()));
        }
    }

    fn scene(structure: &str) -> Scene {
        let mut scene = Scene::new(Arc::new(DefaultToolkit), BuildOptions::default());
        scene
            .add_structure(MoleculeSpec::new(structure), false)
            .unwrap();
        scene
    }

    fn nucleotide(scene: &Scene, num: usize) -> NodeUid {
        scene
            .nodes()
            .find(|n| n.kind == NodeKind::Nucleotide && n.num == num)
            .unwrap()
            .uid
    }

    mod adapter {
        use super::*;

        #[test]
        fn binds_once_per_generation() {
            let mut scene = scene("((....))");
            let mut adapter = SimulationAdapter::new(Drift::default(), LayoutConfig::default());
            let mut renderer = Recorder::default();

            adapter.tick(&mut scene, &mut renderer);
            adapter.tick(&mut scene, &mut renderer);
            assert_eq!(adapter.layout().binds.len(), 1);
            assert_eq!(renderer.changes.len(), 1);

            let a = nucleotide(&scene, 3);
            let b = nucleotide(&scene, 6);
            scene
                .add_link(Link::new(LinkKind::Basepair, a, b, 1.0))
                .unwrap();
            adapter.tick(&mut scene, &mut renderer);
            assert_eq!(adapter.layout().binds.len(), 2);
            assert_eq!(renderer.changes.len(), 2);
            assert_eq!(adapter.layout().binds[1].generation, scene.generation());
        }

        #[test]
        fn topology_uses_configured_strengths() {
            let scene = scene("(((...)))");
            let topology = LayoutTopology::from_scene(&scene, &LayoutConfig::default());
            assert_eq!(topology.nodes.len(), scene.node_count());
            assert_eq!(topology.springs.len(), scene.links().len());
            let backbone = scene
                .links()
                .iter()
                .position(|l| l.kind == LinkKind::Backbone)
                .unwrap();
            assert_eq!(topology.springs[backbone].strength, 10.0);
            assert_eq!(topology.springs[backbone].distance, 15.0);
            let middle = topology
                .nodes
                .iter()
                .find(|n| n.kind == NodeKind::Middle)
                .unwrap();
            assert!(!middle.collidable);
        }

        #[test]
        fn motion_continues_across_merges() {
            let mut scene = scene("........");
            let mut adapter = SimulationAdapter::new(Drift::default(), LayoutConfig::default());
            adapter.tick(&mut scene, &mut ());
            let a = nucleotide(&scene, 1);
            let before = scene.node(a).unwrap().clone();

            let b = nucleotide(&scene, 8);
            scene
                .add_link(Link::new(LinkKind::Basepair, a, b, 1.0))
                .unwrap();
            let after = scene.node(a).unwrap();
            assert_eq!(after.position, before.position);
            assert_eq!(after.previous, before.previous);
        }

        #[test]
        fn pinned_nodes_are_not_moved() {
            let mut scene = scene("......");
            let pinned = nucleotide(&scene, 2);
            scene.set_user_fixed(pinned, true).unwrap();
            let start = scene.node(pinned).unwrap().position;

            let mut adapter = SimulationAdapter::new(Drift::default(), LayoutConfig::default());
            adapter.tick(&mut scene, &mut ());
            assert_eq!(scene.node(pinned).unwrap().position, start);
            assert_eq!(adapter.layout().moved, scene.node_count() - 1);
        }
    }

    mod dragging {
        use super::*;

        #[test]
        fn drag_moves_all_selected_nodes_by_the_same_delta() {
            let mut scene = scene("......");
            let a = nucleotide(&scene, 1);
            let b = nucleotide(&scene, 4);
            let (pa, pb) = (
                scene.node(a).unwrap().position,
                scene.node(b).unwrap().position,
            );

            let gesture = DragGesture::begin(&mut scene, vec![a, b]).unwrap();
            assert!(scene.node(a).unwrap().pin.drag_fixed);
            gesture.drag_by(&mut scene, Vector2::new(5.0, -2.0)).unwrap();

            let na = scene.node(a).unwrap();
            assert_eq!(na.position, pa + Vector2::new(5.0, -2.0));
            assert_eq!(na.previous, na.position);
            assert_eq!(
                scene.node(b).unwrap().position,
                pb + Vector2::new(5.0, -2.0)
            );
        }

        #[test]
        fn ending_a_drag_keeps_user_pins() {
            let mut scene = scene("......");
            let a = nucleotide(&scene, 1);
            let b = nucleotide(&scene, 2);
            scene.set_user_fixed(a, true).unwrap();

            let gesture = DragGesture::begin(&mut scene, vec![a, b]).unwrap();
            gesture.end(&mut scene);

            let pin_a = scene.node(a).unwrap().pin;
            assert!(pin_a.user_fixed);
            assert!(!pin_a.drag_fixed);
            assert!(!scene.node(b).unwrap().pin.is_fixed());
        }

        #[test]
        fn unknown_nodes_pin_nothing() {
            let mut scene = scene("...");
            let a = nucleotide(&scene, 1);
            assert!(matches!(
                DragGesture::begin(&mut scene, vec![a, NodeUid::new()]),
                Err(SceneError::UnknownNode(_))
            ));
            assert!(!scene.node(a).unwrap().pin.drag_fixed);
        }
    }
}
