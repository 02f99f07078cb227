use super::StructureError;
use super::elements::{self, Element};
use super::layout;
use super::pairtable::PairTable;
use nalgebra::Point2;
use std::fmt;

/// The structure operations the graph builder and the trajectory store depend on.
///
/// Implementations must be pure: the same input always yields the same output.
pub trait StructureToolkit: fmt::Debug + Send + Sync {
    /// Parses a structure string into a pairtable that includes crossing pairs.
    fn pairtable(&self, structure: &str) -> Result<PairTable, StructureError>;

    /// Decomposes the nested part of a pairtable into stems and loops.
    fn elements(&self, pairtable: &PairTable) -> Vec<Element>;

    /// Computes initial coordinates for every position of a nested pairtable.
    fn initial_layout(&self, pairtable: &PairTable) -> Vec<Point2<f64>>;
}

/// Dot-bracket parsing, loop decomposition and polygon layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultToolkit;

impl StructureToolkit for DefaultToolkit {
    fn pairtable(&self, structure: &str) -> Result<PairTable, StructureError> {
        PairTable::from_dot_bracket(structure)
    }

    fn elements(&self, pairtable: &PairTable) -> Vec<Element> {
        let (nested, _) = pairtable.split_crossing();
        elements::decompose(&nested)
    }

    fn initial_layout(&self, pairtable: &PairTable) -> Vec<Point2<f64>> {
        let (nested, _) = pairtable.split_crossing();
        layout::simple_xy_coordinates(&nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::elements::ElementKind;

    #[test]
    fn elements_ignore_crossing_pairs() {
        let toolkit = DefaultToolkit;
        let pt = toolkit.pairtable("((..[[..))..]]").unwrap();
        let elements = toolkit.elements(&pt);

        let stems: Vec<_> = elements
            .iter()
            .filter(|e| e.kind == ElementKind::Stem)
            .collect();
        assert_eq!(stems.len(), 1);
        assert_eq!(stems[0].positions, vec![1, 2, 9, 10]);
    }

    #[test]
    fn layout_covers_every_position() {
        let toolkit = DefaultToolkit;
        let pt = toolkit.pairtable("((..[[..))..]]").unwrap();
        assert_eq!(toolkit.initial_layout(&pt).len(), 14);
    }
}
