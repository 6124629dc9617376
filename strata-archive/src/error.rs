use thiserror::Error;

/// Everything that can go wrong while unpacking an archive. All variants except [`ArchiveError::IOError`]
/// describe malformed input and are fatal to the load in progress.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("invalid magic value {}, expected {}", .found.escape_ascii(), .expected.escape_ascii())]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("buffer is truncated while reading the {what}")]
    Truncated { what: &'static str },

    #[error("the {what} range {offset:#x}+{length:#x} lies outside of {limit:#x}")]
    InvalidRange {
        what: &'static str,
        offset: u64,
        length: u64,
        limit: u64,
    },

    #[error("directory node {node} starts its children at {first_child}, expected at least {minimum}")]
    NonMonotonicChild { node: u32, first_child: u32, minimum: u32 },

    #[error("the root node is not a directory")]
    RootNotDirectory,

    #[error("back-reference distance {distance} exceeds the {written} bytes written so far")]
    BackReferenceOutOfRange { distance: usize, written: usize },

    #[error("decoded length {actual} does not match the declared length {declared}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("directory '{directory}' contains '{name}' more than once")]
    DuplicateName { directory: String, name: String },

    #[error("node {node} has an invalid name")]
    InvalidName { node: u32 },

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}
