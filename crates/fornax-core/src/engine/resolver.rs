use crate::core::models::ids::{LinkUid, NodeUid};
use crate::core::models::link::{Link, LinkKind};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Link {link} refers to node {missing}, which is not in the node list")]
    DanglingReference { link: LinkUid, missing: NodeUid },

    #[error("Node uid {0} appears more than once in the node list")]
    DuplicateNode(NodeUid),
}

/// Maps node uids to their positions in a node container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeIndex {
    positions: HashMap<NodeUid, usize>,
}

impl NodeIndex {
    /// Indexes uids in iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DuplicateNode`] if a uid occurs twice.
    pub fn build(uids: impl IntoIterator<Item = NodeUid>) -> Result<Self, ResolveError> {
        let mut positions = HashMap::new();
        for (position, uid) in uids.into_iter().enumerate() {
            match positions.entry(uid) {
                Entry::Occupied(_) => return Err(ResolveError::DuplicateNode(uid)),
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
            }
        }
        Ok(Self { positions })
    }

    pub fn get(&self, uid: NodeUid) -> Option<usize> {
        self.positions.get(&uid).copied()
    }

    pub fn contains(&self, uid: NodeUid) -> bool {
        self.positions.contains_key(&uid)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A link whose endpoints are positions in the merged node container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLink {
    pub uid: LinkUid,
    pub kind: LinkKind,
    pub weight: f64,
    pub source: usize,
    pub target: usize,
}

fn resolve_one(index: &NodeIndex, link: &Link) -> Result<ResolvedLink, ResolveError> {
    let lookup = |uid: NodeUid| {
        index.get(uid).ok_or(ResolveError::DanglingReference {
            link: link.uid,
            missing: uid,
        })
    };
    Ok(ResolvedLink {
        uid: link.uid,
        kind: link.kind,
        weight: link.weight,
        source: lookup(link.source)?,
        target: lookup(link.target)?,
    })
}

/// Resolves every link against `index`, failing on the first dangling endpoint.
pub fn resolve_links<'l>(
    index: &NodeIndex,
    links: impl IntoIterator<Item = &'l Link>,
) -> Result<Vec<ResolvedLink>, ResolveError> {
    links
        .into_iter()
        .map(|link| resolve_one(index, link))
        .collect()
}

/// Resolves every link against `index`, dropping links with a dangling endpoint.
///
/// Each dropped link is logged as a warning and returned alongside the resolved ones.
pub fn resolve_links_lenient<'l>(
    index: &NodeIndex,
    links: impl IntoIterator<Item = &'l Link>,
) -> (Vec<ResolvedLink>, Vec<ResolveError>) {
    let mut resolved = Vec::new();
    let mut dropped = Vec::new();
    for link in links {
        match resolve_one(index, link) {
            Ok(link) => resolved.push(link),
            Err(err) => {
                warn!("Dropping link: {}", err);
                dropped.push(err);
            }
        }
    }
    (resolved, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uids(n: usize) -> Vec<NodeUid> {
        (0..n).map(|_| NodeUid::new()).collect()
    }

    #[test]
    fn index_rejects_duplicates() {
        let a = NodeUid::new();
        assert_eq!(
            NodeIndex::build([a, NodeUid::new(), a]),
            Err(ResolveError::DuplicateNode(a))
        );
    }

    #[test]
    fn resolves_endpoints_to_positions() {
        let nodes = uids(3);
        let index = NodeIndex::build(nodes.iter().copied()).unwrap();
        let link = Link::new(LinkKind::Basepair, nodes[2], nodes[0], 1.0);

        let resolved = resolve_links(&index, [&link]).unwrap();
        assert_eq!(resolved[0].source, 2);
        assert_eq!(resolved[0].target, 0);
        assert_eq!(resolved[0].uid, link.uid);
    }

    #[test]
    fn strict_resolution_reports_the_missing_node() {
        let nodes = uids(2);
        let index = NodeIndex::build(nodes.iter().copied()).unwrap();
        let stranger = NodeUid::new();
        let link = Link::new(LinkKind::Intermolecule, nodes[0], stranger, 1.0);

        assert_eq!(
            resolve_links(&index, [&link]),
            Err(ResolveError::DanglingReference {
                link: link.uid,
                missing: stranger
            })
        );
    }

    #[test]
    fn lenient_resolution_drops_and_continues() {
        let nodes = uids(2);
        let index = NodeIndex::build(nodes.iter().copied()).unwrap();
        let good = Link::new(LinkKind::Backbone, nodes[0], nodes[1], 1.0);
        let bad = Link::new(LinkKind::Intermolecule, NodeUid::new(), nodes[1], 1.0);

        let (resolved, dropped) = resolve_links_lenient(&index, [&bad, &good]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].uid, good.uid);
        assert_eq!(dropped.len(), 1);
    }
}
