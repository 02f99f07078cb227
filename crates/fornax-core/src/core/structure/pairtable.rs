use super::StructureError;
use phf::phf_map;
use serde::{Deserialize, Serialize};

/// Maps every closing bracket to its opening counterpart.
static CLOSING_BRACKETS: phf::Map<char, char> = phf_map! {
    ')' => '(',
    ']' => '[',
    '}' => '{',
    '>' => '<',
};

const OPENING_BRACKETS: [char; 4] = ['(', '[', '{', '<'];

/// Bracket pairs available for crossing pairs, in order of preference.
const CROSSING_LEVELS: [(char, char); 3] = [('[', ']'), ('{', '}'), ('<', '>')];

/// Partner table of a structure in 1-based layout.
///
/// `table[0]` holds the structure length and `table[i]` the 1-based partner of
/// position `i`, or 0 when `i` is unpaired. Pairing is always kept symmetric.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct PairTable(Vec<usize>);

impl PairTable {
    /// Creates a table of `len` unpaired positions.
    pub fn unpaired(len: usize) -> Self {
        let mut table = vec![0; len + 1];
        table[0] = len;
        Self(table)
    }

    /// Parses a dot-bracket string.
    ///
    /// `()` denote nested pairs; `[]`, `{}` and `<>` may be used for crossing pairs.
    /// `.` marks an unpaired position.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::Unbalanced`] for a bracket without a partner and
    /// [`StructureError::InvalidCharacter`] for anything else that is not a `.`.
    pub fn from_dot_bracket(structure: &str) -> Result<Self, StructureError> {
        let chars: Vec<char> = structure.trim().chars().collect();
        let mut table = Self::unpaired(chars.len());
        let mut stacks: [Vec<usize>; 4] = Default::default();

        for (index, &c) in chars.iter().enumerate() {
            let position = index + 1;
            if c == '.' {
                continue;
            }
            if let Some(slot) = OPENING_BRACKETS.iter().position(|&o| o == c) {
                stacks[slot].push(position);
            } else if let Some(opening) = CLOSING_BRACKETS.get(&c) {
                let slot = OPENING_BRACKETS
                    .iter()
                    .position(|o| o == opening)
                    .ok_or(StructureError::InvalidCharacter {
                        character: c,
                        position,
                    })?;
                let partner = stacks[slot].pop().ok_or(StructureError::Unbalanced {
                    bracket: c,
                    position,
                })?;
                table.0[position] = partner;
                table.0[partner] = position;
            } else {
                return Err(StructureError::InvalidCharacter {
                    character: c,
                    position,
                });
            }
        }

        for (slot, stack) in stacks.iter().enumerate() {
            if let Some(&position) = stack.first() {
                return Err(StructureError::Unbalanced {
                    bracket: OPENING_BRACKETS[slot],
                    position,
                });
            }
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.0[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw table including the length slot at index 0.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Returns the partner of the 1-based `position`, or `None` if it is unpaired or out of range.
    pub fn partner(&self, position: usize) -> Option<usize> {
        if position == 0 || position > self.len() {
            return None;
        }
        match self.0[position] {
            0 => None,
            p => Some(p),
        }
    }

    /// Pairs `i` with `j`, first releasing any partners either position had.
    pub fn set_pair(&mut self, i: usize, j: usize) -> Result<(), StructureError> {
        self.check_position(i)?;
        self.check_position(j)?;
        if i == j {
            return Err(StructureError::SelfPair(i));
        }
        self.unpair(i)?;
        self.unpair(j)?;
        self.0[i] = j;
        self.0[j] = i;
        Ok(())
    }

    /// Releases `position` and its partner, if any.
    pub fn unpair(&mut self, position: usize) -> Result<(), StructureError> {
        self.check_position(position)?;
        let partner = self.0[position];
        if partner != 0 {
            self.0[partner] = 0;
        }
        self.0[position] = 0;
        Ok(())
    }

    /// Iterates over all pairs as `(i, j)` with `i < j`, ordered by `i`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (1..=self.len()).filter_map(move |i| match self.0[i] {
            j if j > i => Some((i, j)),
            _ => None,
        })
    }

    /// Splits the table into its nested skeleton and the pairs that cross it.
    ///
    /// Pairs are removed one at a time, always the one crossing the most remaining
    /// pairs (the later-opening one on ties), until no crossings remain.
    pub fn split_crossing(&self) -> (PairTable, Vec<(usize, usize)>) {
        let pairs: Vec<(usize, usize)> = self.pairs().collect();
        let mut counts: Vec<usize> = pairs
            .iter()
            .map(|a| pairs.iter().filter(|b| crosses(*a, **b)).count())
            .collect();
        let mut removed = vec![false; pairs.len()];

        loop {
            let worst = counts
                .iter()
                .enumerate()
                .filter(|(idx, _)| !removed[*idx])
                .max_by(|(ia, ca), (ib, cb)| ca.cmp(cb).then(ia.cmp(ib)))
                .filter(|(_, count)| **count > 0)
                .map(|(idx, _)| idx);
            let Some(worst) = worst else {
                break;
            };
            removed[worst] = true;
            for (idx, pair) in pairs.iter().enumerate() {
                if !removed[idx] && crosses(pairs[worst], *pair) {
                    counts[idx] -= 1;
                }
            }
        }

        let mut nested = Self::unpaired(self.len());
        let mut crossing = Vec::new();
        for (idx, &(i, j)) in pairs.iter().enumerate() {
            if removed[idx] {
                crossing.push((i, j));
            } else {
                nested.0[i] = j;
                nested.0[j] = i;
            }
        }
        (nested, crossing)
    }

    /// Writes the table as dot-bracket, using `()` for the nested skeleton and
    /// `[]`, `{}`, `<>` for successive levels of crossing pairs.
    pub fn to_dot_bracket(&self) -> Result<String, StructureError> {
        let (nested, crossing) = self.split_crossing();
        let mut out = vec!['.'; self.len()];
        for (i, j) in nested.pairs() {
            out[i - 1] = '(';
            out[j - 1] = ')';
        }

        let mut levels: Vec<Vec<(usize, usize)>> = vec![Vec::new(); CROSSING_LEVELS.len()];
        for pair in crossing {
            let level = levels
                .iter()
                .position(|assigned| assigned.iter().all(|other| !crosses(pair, *other)))
                .ok_or(StructureError::TooManyCrossingLevels(CROSSING_LEVELS.len()))?;
            levels[level].push(pair);
            let (open, close) = CROSSING_LEVELS[level];
            out[pair.0 - 1] = open;
            out[pair.1 - 1] = close;
        }
        Ok(out.into_iter().collect())
    }

    fn check_position(&self, position: usize) -> Result<(), StructureError> {
        if position == 0 || position > self.len() {
            return Err(StructureError::OutOfRange {
                position,
                length: self.len(),
            });
        }
        Ok(())
    }
}

fn crosses(a: (usize, usize), b: (usize, usize)) -> bool {
    (a.0 < b.0 && b.0 < a.1 && a.1 < b.1) || (b.0 < a.0 && a.0 < b.1 && b.1 < a.1)
}

impl TryFrom<Vec<usize>> for PairTable {
    type Error = StructureError;

    fn try_from(table: Vec<usize>) -> Result<Self, Self::Error> {
        let Some(&len) = table.first() else {
            return Err(StructureError::MalformedPairtable(
                "table is empty; expected the length at index 0".to_string(),
            ));
        };
        if len + 1 != table.len() {
            return Err(StructureError::MalformedPairtable(format!(
                "declared length {} but table holds {} positions",
                len,
                table.len() - 1
            )));
        }
        for i in 1..=len {
            let j = table[i];
            if j == 0 {
                continue;
            }
            if j > len || j == i || table[j] != i {
                return Err(StructureError::MalformedPairtable(format!(
                    "position {} claims partner {} which does not pair back",
                    i, j
                )));
            }
        }
        Ok(Self(table))
    }
}

impl From<PairTable> for Vec<usize> {
    fn from(table: PairTable) -> Self {
        table.0
    }
}
