//! Loads game assets from compressed SARC archives into a resolved, shared resource graph.

pub mod asset_graph;
pub mod error;
pub mod io;
pub mod settings;
pub mod util;

pub use crate::error::LoadError;
