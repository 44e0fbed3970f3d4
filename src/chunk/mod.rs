//! Chunked binary container format.
//!
//! A container is a sequence of labelled, length-delimited chunks followed by
//! an index that makes every chunk randomly addressable.
//!
//! ## File Structure
//!
//! ```text
//! +------------------------+
//! | Magic: "CHNKANIM"      |  8 bytes
//! | Version                |  2 bytes (u16 LE)
//! | Flags, reserved        |  6 bytes
//! +------------------------+
//! | Chunk block            |  [id u64][length u64][label_len u16][label][content...]
//! | ...                    |  chunks may nest; a parent's length covers its children
//! +------------------------+
//! | Index block            |  [count u32] + count x [id u64][offset u64][length u64]
//! +------------------------+
//! | Index offset           |  8 bytes (u64 LE)
//! | Magic: "CHNKINDX"      |  8 bytes
//! +------------------------+
//! ```

mod format;
mod id;
mod index;
mod reader;
mod writer;

pub use format::*;
pub use id::{chunk_id, ChunkId, ChunkKey};
pub use index::{ChunkIndex, ChunkRecord};
pub use reader::{ChunkHeader, ChunkReader, ContainerSource};
pub use writer::{ChunkHandle, ChunkWriter};
