use strata_archive::ArchiveError;
use strata_files::ParserError;
use strata_files::common::types::{ArchiveId, ResourceKey, ResourceKind};
use strata_files::resource::FieldName;
use thiserror::Error;

/// Failure of a whole load request. Nothing of a failed request is published to the caches.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to fetch '{path}'")]
    Fetch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archive '{path}' is malformed")]
    Archive {
        path: String,
        #[source]
        source: ArchiveError,
    },

    #[error("{key} ('{path}') is malformed")]
    Format {
        key: ResourceKey,
        path: String,
        #[source]
        source: ParserError,
    },

    #[error("{key}.{field} references {target} #{index}, which does not exist")]
    UnresolvedReference {
        key: ResourceKey,
        field: FieldName,
        target: ResourceKind,
        index: u32,
    },

    #[error("{key} does not exist")]
    NotFound { key: ResourceKey },

    #[error("archive {0} is not registered")]
    UnknownArchive(ArchiveId),
}
