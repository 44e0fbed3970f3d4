//! Chunk identifiers.

use std::fmt;

/// 64-bit chunk identifier, the FNV-1a hash of the chunk's label.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u64);

impl ChunkId {
    /// Identifier for a label.
    #[inline]
    pub const fn from_label(label: &str) -> Self {
        Self(fnv1a::hash64_str(label))
    }

    /// Raw numeric value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId(0x{:016x})", self.0)
    }
}

impl From<u64> for ChunkId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Map a label to its chunk identifier.
#[inline]
pub const fn chunk_id(label: &str) -> ChunkId {
    ChunkId::from_label(label)
}

/// Chunk lookup key: by label or by identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKey<'a> {
    Label(&'a str),
    Id(ChunkId),
}

impl ChunkKey<'_> {
    /// Identifier this key resolves to.
    #[inline]
    pub fn id(&self) -> ChunkId {
        match self {
            Self::Label(label) => chunk_id(label),
            Self::Id(id) => *id,
        }
    }
}

impl fmt::Display for ChunkKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "'{}'", label),
            Self::Id(id) => write!(f, "{}", id),
        }
    }
}

impl<'a> From<&'a str> for ChunkKey<'a> {
    fn from(label: &'a str) -> Self {
        Self::Label(label)
    }
}

impl<'a> From<&'a String> for ChunkKey<'a> {
    fn from(label: &'a String) -> Self {
        Self::Label(label.as_str())
    }
}

impl From<ChunkId> for ChunkKey<'_> {
    fn from(id: ChunkId) -> Self {
        Self::Id(id)
    }
}
