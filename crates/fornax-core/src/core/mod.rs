//! # Core Module
//!
//! This module provides the stateless building blocks of Fornax: the graph data model, the
//! structure toolkit, the molecule graph builder, color math and file formats.
//!
//! ## Overview
//!
//! Everything in `core` is either plain data or a pure function of its inputs. Nothing here
//! keeps track of a scene, an animation clock or a simulation; those concerns live in
//! [`crate::engine`].
//!
//! ## Architecture
//!
//! - **Graph Representation** ([`models`]) - Nodes, links, molecules and their unique identifiers
//! - **Secondary Structure** ([`structure`]) - Dot-bracket parsing, pairtables, structural
//!   element decomposition and the initial polygon layout
//! - **Graph Construction** ([`graph`]) - Turning a pairtable into nucleotide, label and
//!   layout-helper nodes with the links that hold them together
//! - **File I/O** ([`io`]) - The JSON scene document and the whitespace-separated trajectory format
//! - **Color** ([`color`]) - HCL to sRGB conversion and the cyclic position-to-hue scale
//!
//! ## Key Capabilities
//!
//! - **Closed entity kinds** for nodes and links, matched exhaustively everywhere
//! - **Pseudoknot-aware structures** with crossing pairs kept apart from the nested skeleton
//! - **Layout preservation** when a molecule is rebuilt after a pairing edit
//! - **Cycle-free serialization** with legacy index-based documents still loadable

pub mod color;
pub mod graph;
pub mod io;
pub mod models;
pub mod structure;
