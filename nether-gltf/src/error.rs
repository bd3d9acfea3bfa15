//! Error types for parsing, resolving and writing glTF documents.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Handle;

/// Result alias used throughout the codec.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Callers that only care about "why did this fail" match on this instead
/// of the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structurally invalid JSON or GLB, or a field of the wrong type.
    MalformedInput,
    /// A required key is absent on a parsed entity.
    MissingRequiredField,
    /// An index points past the end of the array it refers to.
    OutOfRangeReference,
    /// Opening, reading, writing or seeking a file failed.
    IoFailure,
    /// The input is well formed but uses a construct the codec does not handle.
    UnsupportedFeature,
    /// A document handed to the serializer breaks a structural rule.
    InvariantViolation,
}

/// Everything that can go wrong inside the codec.
#[derive(Debug, Error)]
pub enum Error {
    /// Input is not a well-formed GLB container or glTF JSON document
    #[error("malformed input: {0}")]
    Malformed(String),

    /// JSON text failed to parse or serialize
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Required key absent on an entity
    #[error("{location}: missing required field `{field}`")]
    MissingField {
        location: String,
        field: &'static str,
    },

    /// Field present but of the wrong JSON type or shape
    #[error("{location}: field `{field}` {reason}")]
    InvalidField {
        location: String,
        field: &'static str,
        reason: String,
    },

    /// Cross-reference between entities points past the target array
    #[error("{location}: `{field}` refers to {target} {handle}, but only {len} exist")]
    OutOfRange {
        location: String,
        field: &'static str,
        target: &'static str,
        handle: Handle,
        len: usize,
    },

    /// Caller asked for an entity that does not exist
    #[error("no {kind} with index {handle}")]
    UnknownHandle { kind: &'static str, handle: Handle },

    /// Decoded or staged buffer size disagrees with `byteLength`
    #[error("buffer {buffer}: byteLength is {declared} but {actual} bytes are available")]
    BufferLengthMismatch {
        buffer: Handle,
        declared: usize,
        actual: usize,
    },

    /// Accessor or buffer view reaches past the bytes backing it
    #[error("{location}: needs {required} bytes but only {available} are available")]
    OutOfBounds {
        location: String,
        required: usize,
        available: usize,
    },

    /// Buffer has no URI and nothing was staged for it
    #[error("buffer {0} has no URI and no embedded bytes")]
    MissingEmbeddedBuffer(Handle),

    /// Base64 payload of a data URI is not valid base64
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// I/O failure on a specific file
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on a stream with no associated path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsed but unhandled construct (sparse accessors, non-triangle meshes, ...)
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Document breaks a rule the serializer relies on
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Codec configuration file is not valid TOML
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Codec configuration could not be rendered as TOML
    #[error("failed to serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Malformed(_)
            | Error::Json(_)
            | Error::InvalidField { .. }
            | Error::BufferLengthMismatch { .. }
            | Error::OutOfBounds { .. }
            | Error::Base64(_)
            | Error::Config(_) => ErrorKind::MalformedInput,
            Error::MissingField { .. } => ErrorKind::MissingRequiredField,
            Error::OutOfRange { .. } | Error::UnknownHandle { .. } => {
                ErrorKind::OutOfRangeReference
            }
            Error::MissingEmbeddedBuffer(_) | Error::File { .. } | Error::Io(_) => {
                ErrorKind::IoFailure
            }
            Error::Unsupported(_) => ErrorKind::UnsupportedFeature,
            Error::Invariant(_) | Error::ConfigWrite(_) => ErrorKind::InvariantViolation,
        }
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let missing = Error::MissingField {
            location: "accessors[0]".into(),
            field: "count",
        };
        assert_eq!(missing.kind(), ErrorKind::MissingRequiredField);
        assert_eq!(
            missing.to_string(),
            "accessors[0]: missing required field `count`"
        );

        let range = Error::OutOfRange {
            location: "bufferViews[1]".into(),
            field: "buffer",
            target: "buffer",
            handle: 3,
            len: 1,
        };
        assert_eq!(range.kind(), ErrorKind::OutOfRangeReference);

        let io = Error::file(
            "missing.bin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(io.kind(), ErrorKind::IoFailure);
        assert!(io.to_string().starts_with("missing.bin"));

        assert_eq!(
            Error::Unsupported("sparse".into()).kind(),
            ErrorKind::UnsupportedFeature
        );
    }
}
