use super::resolver::ResolvedLink;
use crate::core::models::node::Node;

/// One structure as shown at a time point.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEntry {
    pub id: String,
    pub structure: String,
    /// One `#rrggbb` color per position, `white` where no stem colors it.
    pub colors: Vec<String>,
    pub size: f64,
    pub energy: f64,
}

/// Everything a renderer needs to draw one playback frame.
///
/// Entries are sorted by descending size and never contain zero-size structures.
#[derive(Debug, Clone, PartialEq)]
pub struct Timepoint {
    pub time: f64,
    pub entries: Vec<ViewEntry>,
}

/// Callbacks an external renderer receives. Every method defaults to doing nothing.
pub trait Renderer {
    /// The scene was merged; `links` index into `nodes`.
    fn on_scene_changed(&mut self, _nodes: &[&Node], _links: &[ResolvedLink]) {}

    /// The structure shown for trajectory `id` is now `structure`.
    fn on_structure_transition(&mut self, _id: &str, _structure: &str) {}

    fn on_view_model_update(&mut self, _timepoint: &Timepoint) {}
}

impl Renderer for () {}
