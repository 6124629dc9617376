//! This module contains the graph of loaded resources: it keeps track of which resource links to
//! which and makes sure every resource exists exactly once.
//!
//! Resources link to each other by [`strata_files::common::types::ResourceKey`], not by pointer.
//! The keys point into the [`cache::ResourceCache`], which owns every published resource behind an
//! [`std::sync::Arc`]. That way the mutually referencing pairs (terrain and environment, texture
//! and flipbook) don't form reference cycles and can be dropped like everything else.
//!
//! Loading a resource is done by the [`resolver::Resolver`] in two passes. The first pass walks the
//! references breadth first and parses everything that is reachable and not published yet. A link
//! to a resource that is itself still in progress is recorded as a deferred edge instead of being
//! followed again, which is what breaks cycles. The second pass rewrites the deferred edges once
//! everything is staged. Only then the [`manager::AssetManager`] publishes the staged resources,
//! so a failed load leaves no trace in the cache.
//!
//! Values that consumers derive from resources (e.g. [`derived::TerrainBounds`]) live in a
//! [`crate::util::session_cache::SessionCache`], keyed by the same identity.

pub mod cache;
pub mod derived;
pub mod manager;
pub mod resolver;
pub mod resource;
