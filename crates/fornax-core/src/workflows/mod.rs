//! # Workflows Module
//!
//! High-level entry points that tie the engine and the file formats together.
//!
//! ## Overview
//!
//! Front-ends rarely need to touch a [`Scene`](crate::engine::scene::Scene) or a
//! [`PlaybackEngine`](crate::engine::playback::PlaybackEngine) step by step. The workflows
//! here cover the common paths: building a scene from structure strings, loading and saving
//! scene documents, loading a trajectory file and driving an animation until it ends or is
//! cancelled.
//!
//! ## Architecture
//!
//! - **Scene Composition** ([`compose`]) - Building, loading and saving scenes
//! - **Trajectory Playback** ([`playback`]) - Loading trajectory tables and running animations

pub mod compose;
pub mod playback;
