//! # Fornax Core Library
//!
//! A library for composing RNA secondary-structure graphs into a single editable scene and for
//! replaying co-transcriptional folding trajectories as a continuously scrubbable animation.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that the pure algorithms can be
//! tested in isolation from the stateful orchestration that drives an interactive front-end.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Node`, `Link`, `Molecule`), the
//!   reference structure toolkit (pairtables, structural elements, initial layout), the molecule
//!   graph builder, color math, and the scene/trajectory file formats.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. It owns the merged [`engine::scene::Scene`],
//!   resolves links by node uid, hands live containers to an external force layout, parses
//!   trajectories into per-structure series and drives the cancellable playback loop.
//!
//! - **[`workflows`]: The Public API.** High-level entry points that tie `engine` and `core`
//!   together: composing scenes from structures, loading and saving scene documents, loading
//!   trajectories and running an animation to completion.

pub mod core;
pub mod engine;
pub mod workflows;
