//! Error types for chunkanim.

use std::path::PathBuf;
use thiserror::Error;

use crate::anim::{Interpolation, PayloadKind};
use crate::chunk::ChunkId;

/// Broad failure classes, used by callers to decide between fallback and abort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something looked up by name or id is absent. Recoverable.
    NotFound,
    /// The container or a track inside it is damaged. The load must abort.
    Corruption,
    /// Invalid setup detected at write/bind/authoring time.
    Configuration,
    /// Underlying stream failure.
    Io,
}

/// Main error type for container and animation operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid container: expected CHNKANIM magic bytes")]
    InvalidMagic,

    /// Unsupported container version
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    /// Stream is truncated
    #[error("Unexpected end of stream at position {0}")]
    UnexpectedEof(u64),

    /// Invalid container-level structure (header, trailer, index block)
    #[error("Invalid container structure: {0}")]
    InvalidStructure(String),

    /// Chunk label or id absent from the index
    #[error("Chunk not found: {0}")]
    ChunkNotFound(String),

    /// A chunk's header, length or content is inconsistent
    #[error("Corrupt chunk {id} at offset {offset}: {reason}")]
    CorruptChunk { id: ChunkId, offset: u64, reason: String },

    /// A read would cross the active chunk's end
    #[error("Read of {requested} bytes at offset {offset} exceeds chunk {id} ({available} bytes left)")]
    ChunkBounds { id: ChunkId, offset: u64, requested: u64, available: u64 },

    /// Keyframe times inside a stored track are not strictly increasing
    #[error("Non-monotonic key time {time} after {previous} in chunk {id} at offset {offset}")]
    NonMonotonicKey { id: ChunkId, offset: u64, previous: f32, time: f32 },

    /// Unknown payload kind tag
    #[error("Unknown payload kind tag {0}")]
    UnknownPayloadKind(u8),

    /// Unknown interpolation mode tag
    #[error("Unknown interpolation mode tag {0}")]
    UnknownInterpolation(u8),

    /// Label is already open in this write session
    #[error("Chunk '{0}' is already open")]
    ChunkAlreadyOpen(String),

    /// Label (or its id) was already written in this session
    #[error("Duplicate chunk '{0}'")]
    DuplicateChunk(String),

    /// Label is empty or too long to store
    #[error("Invalid chunk label: {0}")]
    InvalidLabel(String),

    /// Writer stream already holds data
    #[error("Container stream is not empty ({0} bytes)")]
    NonEmptyStream(u64),

    /// end_chunk() without a matching begin_chunk()
    #[error("No chunk is open")]
    NoOpenChunk,

    /// finish() while chunks are still open
    #[error("{0} chunk(s) still open at finish")]
    UnclosedChunks(usize),

    /// Payload kind does not support the requested interpolation
    #[error("{kind} payloads do not support {mode} interpolation")]
    UnsupportedInterpolation { kind: PayloadKind, mode: Interpolation },

    /// Keyframe time is NaN or infinite
    #[error("Invalid key time: {0}")]
    InvalidKeyTime(f32),

    /// Animation duration is negative or not finite
    #[error("Invalid animation duration: {0}")]
    InvalidDuration(f32),

    /// Looping requested on an animation with no length
    #[error("Animation '{0}' has zero duration and cannot loop")]
    ZeroDurationLoop(String),

    /// Animation name contains the label separator '/'
    #[error("Invalid animation name '{0}'")]
    InvalidAnimationName(String),

    /// Two tracks in one animation share a key
    #[error("Duplicate track key '{0}'")]
    DuplicateTrack(String),

    /// Track key not present in an animation
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Animation name not present in a container
    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    /// Target cannot bind a track's key
    #[error("Target has no property '{0}'")]
    MissingProperty(String),

    /// Target property exists with a different payload kind
    #[error("Property '{key}' expects {expected}, track provides {actual}")]
    PropertyTypeMismatch { key: String, expected: PayloadKind, actual: PayloadKind },

    /// Settings file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a corrupt chunk error.
    pub fn corrupt(id: ChunkId, offset: u64, reason: impl Into<String>) -> Self {
        Self::CorruptChunk { id, offset, reason: reason.into() }
    }

    /// Taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_)
            | Self::ChunkNotFound(_)
            | Self::TrackNotFound(_)
            | Self::AnimationNotFound(_) => ErrorKind::NotFound,

            Self::InvalidMagic
            | Self::UnsupportedVersion(_)
            | Self::UnexpectedEof(_)
            | Self::InvalidStructure(_)
            | Self::CorruptChunk { .. }
            | Self::ChunkBounds { .. }
            | Self::NonMonotonicKey { .. }
            | Self::UnknownPayloadKind(_)
            | Self::UnknownInterpolation(_) => ErrorKind::Corruption,

            Self::ChunkAlreadyOpen(_)
            | Self::DuplicateChunk(_)
            | Self::InvalidLabel(_)
            | Self::NonEmptyStream(_)
            | Self::NoOpenChunk
            | Self::UnclosedChunks(_)
            | Self::UnsupportedInterpolation { .. }
            | Self::InvalidKeyTime(_)
            | Self::InvalidDuration(_)
            | Self::ZeroDurationLoop(_)
            | Self::InvalidAnimationName(_)
            | Self::DuplicateTrack(_)
            | Self::MissingProperty(_)
            | Self::PropertyTypeMismatch { .. }
            | Self::Config(_) => ErrorKind::Configuration,

            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for `kind() == ErrorKind::Corruption`.
    #[inline]
    pub fn is_corruption(&self) -> bool {
        self.kind() == ErrorKind::Corruption
    }
}

/// Result type alias for chunkanim operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::ChunkBounds { id: ChunkId(0xab), offset: 40, requested: 8, available: 3 };
        let msg = e.to_string();
        assert!(msg.contains("00000000000000ab"));
        assert!(msg.contains("40"));
        assert!(msg.contains("3 bytes left"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_taxonomy() {
        assert_eq!(Error::ChunkNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert!(Error::corrupt(ChunkId(1), 0, "bad").is_corruption());
        assert_eq!(Error::ZeroDurationLoop("a".into()).kind(), ErrorKind::Configuration);
        assert_eq!(Error::MissingProperty("p".into()).kind(), ErrorKind::Configuration);
    }
}
