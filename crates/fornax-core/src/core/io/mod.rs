//! Provides input/output for the two document formats Fornax understands.
//!
//! Scenes are stored as JSON documents keyed by molecule uid; trajectories are read from
//! whitespace-separated tables with a header row. Both formats share the
//! [`traits::DocumentFormat`] interface so callers can read from any buffered reader or
//! straight from a path.

pub mod scene_json;
pub mod traits;
pub mod trajectory;
