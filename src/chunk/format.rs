//! Container format constants.

/// Magic bytes at the start of a container.
pub const CONTAINER_MAGIC: &[u8; 8] = b"CHNKANIM";

/// Magic bytes closing the trailer.
pub const INDEX_MAGIC: &[u8; 8] = b"CHNKINDX";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 8;

/// Offset of the flags word in the header.
pub const FLAGS_OFFSET: usize = 10;

/// Current container format version.
pub const CURRENT_VERSION: u16 = 1;

/// Size of the trailer: index offset (u64) + index magic.
pub const TRAILER_SIZE: usize = 16;

/// Size of the record count that opens the index block.
pub const INDEX_COUNT_SIZE: usize = 4;

/// Size of one index record: id, offset, length (3 x u64).
pub const INDEX_RECORD_SIZE: usize = 24;

/// Fixed part of a chunk header: id (u64), length (u64), label length (u16).
pub const CHUNK_HEADER_FIXED_SIZE: usize = 18;

/// Offset of the length field inside a chunk header.
pub const CHUNK_LENGTH_OFFSET: u64 = 8;

/// Longest label a chunk header can carry.
pub const MAX_LABEL_LEN: usize = u16::MAX as usize;

/// First byte a chunk may start at.
pub const MIN_CHUNK_OFFSET: u64 = HEADER_SIZE as u64;

/// Total header size for a chunk with the given label length.
#[inline]
pub const fn chunk_header_len(label_len: usize) -> u64 {
    (CHUNK_HEADER_FIXED_SIZE + label_len) as u64
}

/// Size of an index block holding `count` records.
#[inline]
pub const fn index_block_len(count: usize) -> u64 {
    (INDEX_COUNT_SIZE + count * INDEX_RECORD_SIZE) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(CONTAINER_MAGIC.len(), 8);
        assert_ne!(CONTAINER_MAGIC, INDEX_MAGIC);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(chunk_header_len(0), 18);
        assert_eq!(chunk_header_len(5), 23);
        assert_eq!(index_block_len(0), 4);
        assert_eq!(index_block_len(2), 52);
        assert!(VERSION_OFFSET + 2 <= HEADER_SIZE);
        assert!(FLAGS_OFFSET + 2 <= HEADER_SIZE);
    }
}
