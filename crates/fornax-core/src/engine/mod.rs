//! # Engine Module
//!
//! This module holds the stateful side of Fornax: the merged scene, the reference
//! resolver, the bridge to an external force layout, trajectory series and the
//! playback clock.
//!
//! ## Overview
//!
//! Every component here is driven synchronously by its owner. Structural edits on a
//! [`scene::Scene`] always finish with a full merge before they return, so a simulation
//! tick or a renderer callback never observes a half-rebuilt graph. The playback engine
//! never arms timers itself; it hands back the next [`playback::Tick`] and leaves the
//! waiting to its driver, which keeps cancellation a matter of checking one flag.
//!
//! ## Architecture
//!
//! - **Scene Store** ([`scene`]) - Molecules, cross-molecule links, merging and structural edits
//! - **Reference Resolution** ([`resolver`]) - Turning uid endpoints into indices into the merged nodes
//! - **Simulation Bridge** ([`simulation`]) - Live position access for a force layout and drag gestures
//! - **Trajectories** ([`trajectory`]) - Grouped, time-ordered samples with precomputed colors
//! - **Playback** ([`playback`]) - Interpolation, scrubbing and the cancellable animation loop
//! - **Rendering Contract** ([`render`]) - Callbacks an external renderer receives
//! - **Configuration** ([`config`]) - Graph, layout and playback parameters
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Scene and playback error types
//!
//! ## Key Capabilities
//!
//! - **Identity-preserving rebuilds** so layout state follows logical nodes across merges
//! - **Atomic edits and imports** that leave the previous scene untouched on failure
//! - **Durable extra links** re-attached on every merge without duplication
//! - **Discrete structures with continuous weights** during trajectory playback

pub mod config;
pub mod error;
pub mod playback;
pub mod progress;
pub mod render;
pub mod resolver;
pub mod scene;
pub mod simulation;
pub mod trajectory;
