use super::pairtable::PairTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structural class of a run of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Exterior,
    Hairpin,
    Interior,
    Multiloop,
    Stem,
}

impl ElementKind {
    /// The one-letter code conventionally used for this element class.
    pub fn code(self) -> char {
        match self {
            ElementKind::Exterior => 'e',
            ElementKind::Hairpin => 'h',
            ElementKind::Interior => 'i',
            ElementKind::Multiloop => 'm',
            ElementKind::Stem => 's',
        }
    }

    /// Returns `true` for closed loops, the elements that get a center node in the graph.
    pub fn is_closed_loop(self) -> bool {
        matches!(
            self,
            ElementKind::Hairpin | ElementKind::Interior | ElementKind::Multiloop
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid element kind string: '{0}'")]
pub struct ParseElementKindError(String);

impl FromStr for ElementKind {
    type Err = ParseElementKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "e" | "exterior" => Ok(ElementKind::Exterior),
            "h" | "hairpin" => Ok(ElementKind::Hairpin),
            "i" | "interior" => Ok(ElementKind::Interior),
            "m" | "multiloop" => Ok(ElementKind::Multiloop),
            "s" | "stem" => Ok(ElementKind::Stem),
            _ => Err(ParseElementKindError(s.to_string())),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ElementKind::Exterior => "exterior",
                ElementKind::Hairpin => "hairpin",
                ElementKind::Interior => "interior",
                ElementKind::Multiloop => "multiloop",
                ElementKind::Stem => "stem",
            }
        )
    }
}

/// A maximal run of positions of one structural class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    /// Nesting depth: the number of stacked pairs enclosing the element.
    pub level: usize,
    /// Sorted 1-based positions. Loops include the positions of their closing pairs;
    /// stems list both strands.
    pub positions: Vec<usize>,
}

impl Element {
    /// Arithmetic mean of the element's positions.
    pub fn mean_position(&self) -> Option<f64> {
        if self.positions.is_empty() {
            return None;
        }
        let sum: usize = self.positions.iter().sum();
        Some(sum as f64 / self.positions.len() as f64)
    }
}

/// Decomposes a nested pairtable into stems and loops.
///
/// Crossing pairs must be split off beforehand with [`PairTable::split_crossing`];
/// any that remain are treated as if they were part of the skeleton.
pub fn decompose(pairtable: &PairTable) -> Vec<Element> {
    let mut walker = Walker {
        pairtable,
        len: pairtable.len() as i64,
        elements: Vec::new(),
    };
    walker.walk(0, 1, walker.len);
    walker.elements
}

struct Walker<'a> {
    pairtable: &'a PairTable,
    len: i64,
    elements: Vec<Element>,
}

impl Walker<'_> {
    fn partner(&self, position: i64) -> i64 {
        if position < 1 || position > self.len {
            return 0;
        }
        self.pairtable.partner(position as usize).unwrap_or(0) as i64
    }

    fn emit(&mut self, kind: ElementKind, level: usize, raw: Vec<i64>) {
        let mut positions: Vec<usize> = raw
            .into_iter()
            .filter(|&p| p >= 1 && p <= self.len)
            .map(|p| p as usize)
            .collect();
        positions.sort_unstable();
        positions.dedup();
        if !positions.is_empty() {
            self.elements.push(Element {
                kind,
                level,
                positions,
            });
        }
    }

    fn walk(&mut self, level: usize, mut i: i64, mut j: i64) {
        if i > j {
            return;
        }
        let mut u5 = vec![i - 1];
        let mut u3 = vec![j + 1];

        while i <= j && self.partner(i) == 0 {
            u5.push(i);
            i += 1;
        }
        while j >= i && self.partner(j) == 0 {
            u3.push(j);
            j -= 1;
        }

        if i > j {
            u5.push(i);
            let kind = if level == 0 {
                ElementKind::Exterior
            } else {
                ElementKind::Hairpin
            };
            self.emit(kind, level, u5);
            return;
        }

        if self.partner(i) != j {
            let mut m = u5;
            let mut k = i;
            m.push(k);
            while k <= j {
                let p = self.partner(k);
                if p <= k {
                    // Only reachable with crossing pairs left in the table.
                    break;
                }
                self.walk(level, k, p);
                m.push(p);
                k = p + 1;
                while k <= j && self.partner(k) == 0 {
                    m.push(k);
                    k += 1;
                }
                m.push(k);
            }
            m.pop();
            m.extend(u3);
            let kind = if level == 0 {
                ElementKind::Exterior
            } else {
                ElementKind::Multiloop
            };
            self.emit(kind, level, m);
            return;
        }

        u5.push(i);
        u3.push(j);
        if u5.len() + u3.len() > 4 {
            let kind = if level == 0 {
                ElementKind::Exterior
            } else {
                ElementKind::Interior
            };
            let mut combined = u5;
            combined.extend(u3);
            self.emit(kind, level, combined);
        }

        let mut stem = Vec::new();
        let mut level = level;
        while self.partner(i) == j && i < j {
            stem.push(i);
            stem.push(j);
            i += 1;
            j -= 1;
            level += 1;
        }
        self.emit(ElementKind::Stem, level, stem);
        self.walk(level, i, j);
    }
}
