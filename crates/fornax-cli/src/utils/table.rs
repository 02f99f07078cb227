use fornax::core::color::Rgb;
use fornax::engine::render::Timepoint;
use fornax::engine::scene::Scene;
use fornax::engine::trajectory::StripColumn;
use std::collections::BTreeMap;
use std::fmt::Write;

const STRUCTURE_HEADER: &str = "Structure";

/// Formats one playback frame as an aligned table, largest occupancy first.
pub fn format_timepoint(timepoint: &Timepoint) -> String {
    let id_width = timepoint
        .entries
        .iter()
        .map(|e| e.id.len())
        .max()
        .unwrap_or(0)
        .max(2);
    let structure_width = timepoint
        .entries
        .iter()
        .map(|e| e.structure.chars().count())
        .max()
        .unwrap_or(0)
        .max(STRUCTURE_HEADER.len());

    let mut out = format!("t = {:.2}\n", timepoint.time);
    let _ = writeln!(
        out,
        "{:<id_width$}  {:<structure_width$}  {:>9}  {:>8}",
        "ID", STRUCTURE_HEADER, "Occupancy", "Energy"
    );
    for entry in &timepoint.entries {
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<structure_width$}  {:>9.2}  {:>8.2}",
            entry.id, entry.structure, entry.size, entry.energy
        );
    }
    out
}

/// Renders the dominant-structure strip, one line per time point.
///
/// With `ansi` every position is a truecolor block; otherwise colors are written as hex
/// codes, with `white` for positions outside any stem.
pub fn render_strip(columns: &[StripColumn], ansi: bool) -> String {
    let mut out = String::new();
    for column in columns {
        let _ = write!(out, "{:>8.2} {:>8.2}  {:<6} ", column.time, column.dt, column.id);
        if ansi {
            for color in &column.colors {
                let Rgb { r, g, b } = color.unwrap_or(Rgb::WHITE);
                let _ = write!(out, "\x1b[48;2;{};{};{}m \x1b[0m", r, g, b);
            }
        } else {
            let names: Vec<String> = column
                .colors
                .iter()
                .map(|c| c.map_or_else(|| "white".to_string(), |rgb| rgb.to_string()))
                .collect();
            out.push_str(&names.join(" "));
        }
        out.push('\n');
    }
    out
}

/// Lists the molecules of a scene followed by node and link counts per kind.
pub fn format_scene_summary(scene: &Scene) -> String {
    let mut out = format!(
        "{} molecule(s), {} node(s), {} link(s)\n",
        scene.molecule_count(),
        scene.node_count(),
        scene.links().len()
    );
    for molecule in scene.molecules() {
        let name = if molecule.name().is_empty() {
            "-"
        } else {
            molecule.name()
        };
        let _ = writeln!(
            out,
            "  {}  {:<8} {:<7} {}",
            molecule.uid(),
            name,
            molecule.kind().to_string(),
            molecule.structure()
        );
    }

    let mut node_counts: BTreeMap<String, usize> = BTreeMap::new();
    for node in scene.nodes() {
        *node_counts.entry(node.kind.to_string()).or_default() += 1;
    }
    let mut link_counts: BTreeMap<String, usize> = BTreeMap::new();
    for link in scene.links() {
        *link_counts.entry(link.kind.to_string()).or_default() += 1;
    }

    out.push_str("Nodes:\n");
    for (kind, count) in &node_counts {
        let _ = writeln!(out, "  {:<14}{}", kind, count);
    }
    out.push_str("Links:\n");
    for (kind, count) in &link_counts {
        let _ = writeln!(out, "  {:<14}{}", kind, count);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fornax::core::graph::builder::{BuildOptions, MoleculeSpec};
    use fornax::core::structure::toolkit::DefaultToolkit;
    use fornax::engine::render::ViewEntry;
    use std::sync::Arc;

    #[test]
    fn timepoint_table_is_aligned() {
        let timepoint = Timepoint {
            time: 1.5,
            entries: vec![
                ViewEntry {
                    id: "12".to_string(),
                    structure: "((...))".to_string(),
                    colors: vec![],
                    size: 0.75,
                    energy: -2.4,
                },
                ViewEntry {
                    id: "3".to_string(),
                    structure: ".......".to_string(),
                    colors: vec![],
                    size: 0.25,
                    energy: 0.0,
                },
            ],
        };
        let table = format_timepoint(&timepoint);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "t = 1.50");
        assert!(lines[1].starts_with("ID  Structure"));
        assert_eq!(lines[2], "12  ((...))         0.75     -2.40");
        assert_eq!(lines[3], "3   .......         0.25      0.00");
    }

    #[test]
    fn empty_timepoint_still_has_a_header() {
        let table = format_timepoint(&Timepoint {
            time: 0.1,
            entries: vec![],
        });
        assert_eq!(table.lines().count(), 2);
    }

    #[test]
    fn plain_strip_names_every_position() {
        let columns = vec![StripColumn {
            time: 0.5,
            dt: 0.5,
            id: "1".to_string(),
            colors: vec![Some(Rgb::new(1, 10, 171)), None],
        }];
        let strip = render_strip(&columns, false);
        assert_eq!(strip, "    0.50     0.50  1      #010aab white\n");
    }

    #[test]
    fn ansi_strip_draws_one_block_per_position() {
        let columns = vec![StripColumn {
            time: 0.5,
            dt: 0.0,
            id: "1".to_string(),
            colors: vec![None, Some(Rgb::new(1, 2, 3))],
        }];
        let strip = render_strip(&columns, true);
        assert!(strip.contains("\x1b[48;2;255;255;255m \x1b[0m"));
        assert!(strip.contains("\x1b[48;2;1;2;3m \x1b[0m"));
    }

    #[test]
    fn scene_summary_counts_kinds() {
        let mut scene = Scene::new(
            Arc::new(DefaultToolkit),
            BuildOptions {
                label_interval: 0,
                ..BuildOptions::default()
            },
        );
        scene
            .add_structure(MoleculeSpec::new("((...))").name("hairpin"), true)
            .unwrap();
        let summary = format_scene_summary(&scene);
        assert!(summary.starts_with("1 molecule(s)"));
        assert!(summary.contains("hairpin"));
        assert!(summary.contains("nucleotide    7"));
        assert!(summary.contains("basepair"));
        assert!(summary.contains("backbone      6"));
    }
}
