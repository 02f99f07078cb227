//! # Core Models Module
//!
//! This module contains the data structures that make up a structure graph.
//!
//! ## Overview
//!
//! A [`molecule::Molecule`] exclusively owns its [`node::Node`]s and [`link::Link`]s. Links
//! never hold references to nodes; they name their endpoints by [`ids::NodeUid`], and every
//! node names its owning molecule by [`ids::MoleculeUid`]. This keeps the model free of
//! cycles, so it can be cloned, compared and serialized without special handling.
//!
//! ## Key Components
//!
//! - [`ids`] - Stable uids for nodes, links and molecules plus the arena key for molecules
//! - [`node`] - Nucleotides, labels, loop centers and protein nodes with their pin state
//! - [`link`] - Backbone, pairing, scaffolding and cross-molecule links
//! - [`molecule`] - A molecule's sequence, structure, pairtable, elements and graph

pub mod ids;
pub mod link;
pub mod molecule;
pub mod node;
