//! A library for reading SARC archives and the SLZ0 compression scheme they are usually wrapped in.

#![allow(clippy::unreadable_literal)]

#[cfg(any(test, feature = "builder"))]
pub mod builder;
mod compression;
mod container;
mod error;

pub use crate::compression::{Compression, RawArchive, StreamHeader, FOURCC_SLZ, compress, decompress, is_compressed};
pub use crate::container::{Container, Directory, FileEntry, FOURCC_SARC};
pub use crate::error::ArchiveError;
