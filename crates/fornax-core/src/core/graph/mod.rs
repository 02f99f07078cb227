//! Construction of molecule graphs from secondary structures.

pub mod builder;
