use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("The file's magic value {magic} does not match the expectation {expected}")]
    InvalidMagicValue { magic: String, expected: String },

    /// Also covers chunk layouts that changed between versions, unless the reader documents a
    /// fallback for the older layout.
    #[error("Version {version} of {magic} files is not supported")]
    UnsupportedVersion { magic: String, version: u32 },

    #[error("Missing mandatory {chunk} chunk")]
    MissingChunk { chunk: String },

    #[error("The {chunk} chunk may only appear once")]
    DuplicateChunk { chunk: String },

    #[error("The {chunk} chunk is invalid: {reason}")]
    InvalidChunk { chunk: String, reason: String },

    #[error("The file is violating the expected format, because: {reason}")]
    FormatError { reason: &'static str },

    #[error("The {sibling} sibling file is invalid")]
    SiblingError {
        sibling: &'static str,
        #[source]
        source: Box<ParserError>,
    },

    /// Represents a failure to read from input, most notably a truncated buffer.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    StringConversationError(#[from] std::ffi::IntoStringError),

    #[error(transparent)]
    UTF8ConversationError(#[from] std::string::FromUtf8Error),
}

pub mod common;
#[cfg(any(test, feature = "builder"))]
pub mod builder;
pub mod environment;
pub mod resource;
pub mod sequence;
pub mod terrain;
pub mod texture;
