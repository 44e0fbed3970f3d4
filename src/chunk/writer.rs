//! Container writer.
//!
//! Chunks are written front to back. Each chunk's length is back-patched into
//! its inline header when the chunk closes, and the index block plus trailer
//! are appended by [`ChunkWriter::finish`].

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, trace};

use super::format::*;
use super::id::{chunk_id, ChunkId};
use super::index::{ChunkIndex, ChunkRecord};
use crate::config::WriterConfig;
use crate::util::{Error, Result};

/// Token returned by [`ChunkWriter::begin_chunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHandle {
    pub id: ChunkId,
    /// Offset of the chunk header.
    pub offset: u64,
    /// Nesting depth, 0 for top-level chunks.
    pub depth: usize,
}

#[derive(Debug)]
struct OpenChunk {
    label: String,
    position: usize,
    offset: u64,
}

/// Sequential chunk writer over a seekable stream.
pub struct ChunkWriter<W: Write + Seek> {
    writer: W,
    pos: u64,
    index: ChunkIndex,
    open: Vec<OpenChunk>,
}

impl ChunkWriter<BufWriter<File>> {
    /// Create a container file with default settings.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with(path, &WriterConfig::default())
    }

    /// Create a container file.
    pub fn create_with(path: impl AsRef<Path>, config: &WriterConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        Self::new(BufWriter::with_capacity(config.buffer_capacity, file))
    }
}

impl<W: Write + Seek> ChunkWriter<W> {
    /// Start a container in the empty stream `writer` and emit the file header.
    ///
    /// Streams that already hold data are rejected, since stale bytes past the
    /// trailer would hide it from readers.
    pub fn new(mut writer: W) -> Result<Self> {
        let existing = writer.seek(SeekFrom::End(0))?;
        if existing != 0 {
            return Err(Error::NonEmptyStream(existing));
        }
        let mut this = Self {
            writer,
            pos: 0,
            index: ChunkIndex::new(),
            open: Vec::new(),
        };
        this.write_bytes(CONTAINER_MAGIC)?;
        this.write_u16(CURRENT_VERSION)?;
        this.write_u16(0)?; // flags
        this.write_u32(0)?; // reserved
        debug_assert_eq!(this.pos, HEADER_SIZE as u64);
        Ok(this)
    }

    /// Current write position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Number of chunks currently open.
    #[inline]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Index of all chunks opened so far.
    #[inline]
    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    /// Open a chunk. Content written until the matching [`end_chunk`](Self::end_chunk)
    /// belongs to it, nested chunks included.
    pub fn begin_chunk(&mut self, label: &str) -> Result<ChunkHandle> {
        if label.is_empty() {
            return Err(Error::InvalidLabel("empty label".to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(Error::InvalidLabel(format!("label is {} bytes, max {}", label.len(), MAX_LABEL_LEN)));
        }
        if self.open.iter().any(|c| c.label == label) {
            return Err(Error::ChunkAlreadyOpen(label.to_string()));
        }

        let id = chunk_id(label);
        let offset = self.pos;
        let position = self.index.push(ChunkRecord::new(id, offset, 0), Some(label))?;

        self.write_u64(id.value())?;
        self.write_u64(0)?; // length placeholder
        self.write_u16(label.len() as u16)?;
        self.write_bytes(label.as_bytes())?;

        let depth = self.open.len();
        self.open.push(OpenChunk { label: label.to_string(), position, offset });
        trace!(label, %id, offset, depth, "begin chunk");
        Ok(ChunkHandle { id, offset, depth })
    }

    /// Close the innermost open chunk and back-patch its length.
    pub fn end_chunk(&mut self) -> Result<ChunkRecord> {
        let chunk = self.open.pop().ok_or(Error::NoOpenChunk)?;
        let length = self.pos - chunk.offset;

        let resume = self.pos;
        self.writer.seek(SeekFrom::Start(chunk.offset + CHUNK_LENGTH_OFFSET))?;
        self.writer.write_u64::<LittleEndian>(length)?;
        self.writer.seek(SeekFrom::Start(resume))?;

        self.index.set_length(chunk.position, length);
        let record = self.index.at(chunk.position).copied().ok_or(Error::NoOpenChunk)?;
        trace!(label = %chunk.label, offset = chunk.offset, length, "end chunk");
        Ok(record)
    }

    /// Write one chunk whose content is produced by `f`.
    pub fn write_chunk<F>(&mut self, label: &str, f: F) -> Result<ChunkRecord>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.begin_chunk(label)?;
        f(self)?;
        self.end_chunk()
    }

    /// Append the index block and trailer, flush, and return the stream.
    pub fn finish(mut self) -> Result<W> {
        if !self.open.is_empty() {
            return Err(Error::UnclosedChunks(self.open.len()));
        }

        let index_offset = self.pos;
        let block = self.index.encode()?;
        self.write_bytes(&block)?;
        self.write_u64(index_offset)?;
        self.write_bytes(INDEX_MAGIC)?;
        self.writer.flush()?;

        debug!(chunks = self.index.len(), bytes = self.pos, index_offset, "container finished");
        Ok(self.writer)
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Write an i32 value (little-endian).
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write an f32 value (little-endian).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write an f64 value (little-endian).
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.writer.write_f64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a string as `[len u16][utf-8 bytes]`.
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len())
            .map_err(|_| Error::invalid(format!("string of {} bytes is too long to store", s.len())))?;
        self.write_u16(len)?;
        self.write_bytes(s.as_bytes())
    }
}

impl<W: Write + Seek> Write for ChunkWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn writer() -> ChunkWriter<Cursor<Vec<u8>>> {
        ChunkWriter::new(Cursor::new(Vec::new())).unwrap()
    }

    #[test]
    fn test_header_written() {
        let bytes = writer().finish().unwrap().into_inner();
        assert_eq!(&bytes[..8], CONTAINER_MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), CURRENT_VERSION);
        // header + empty index + trailer
        assert_eq!(bytes.len(), HEADER_SIZE + INDEX_COUNT_SIZE + TRAILER_SIZE);
        assert_eq!(&bytes[bytes.len() - 8..], INDEX_MAGIC);
    }

    #[test]
    fn test_length_backpatched_inline() {
        let mut w = writer();
        let handle = w.begin_chunk("data").unwrap();
        w.write_u32(0xdead_beef).unwrap();
        let record = w.end_chunk().unwrap();
        assert_eq!(record.length, chunk_header_len(4) + 4);
        assert_eq!(handle.offset, HEADER_SIZE as u64);

        let bytes = w.finish().unwrap().into_inner();
        let start = handle.offset as usize;
        let id = u64::from_le_bytes(bytes[start..start + 8].try_into().unwrap());
        let len = u64::from_le_bytes(bytes[start + 8..start + 16].try_into().unwrap());
        assert_eq!(id, chunk_id("data").value());
        assert_eq!(len, record.length);
    }

    #[test]
    fn test_nested_length_covers_children() {
        let mut w = writer();
        w.begin_chunk("outer").unwrap();
        w.write_u8(1).unwrap();
        let inner = w.write_chunk("inner", |w| w.write_u64(7)).unwrap();
        w.write_u8(2).unwrap();
        let outer = w.end_chunk().unwrap();

        assert!(inner.offset > outer.offset);
        assert!(inner.end() < outer.end());
        assert_eq!(outer.length, chunk_header_len(5) + 1 + inner.length + 1);
        assert_eq!(w.index().at(0).unwrap().id, chunk_id("outer"));
    }

    #[test]
    fn test_reject_open_label() {
        let mut w = writer();
        w.begin_chunk("a").unwrap();
        assert!(matches!(w.begin_chunk("a"), Err(Error::ChunkAlreadyOpen(_))));
    }

    #[test]
    fn test_reject_written_label() {
        let mut w = writer();
        w.write_chunk("a", |_| Ok(())).unwrap();
        assert!(matches!(w.begin_chunk("a"), Err(Error::DuplicateChunk(_))));
    }

    #[test]
    fn test_reject_bad_labels() {
        let mut w = writer();
        assert!(matches!(w.begin_chunk(""), Err(Error::InvalidLabel(_))));
        let long = "x".repeat(MAX_LABEL_LEN + 1);
        assert!(matches!(w.begin_chunk(&long), Err(Error::InvalidLabel(_))));
    }

    #[test]
    fn test_reject_non_empty_stream() {
        let used = writer().finish().unwrap().into_inner();
        let len = used.len() as u64;
        match ChunkWriter::new(Cursor::new(used)) {
            Err(Error::NonEmptyStream(n)) => assert_eq!(n, len),
            Err(other) => panic!("unexpected {:?}", other),
            Ok(_) => panic!("writer accepted a used stream"),
        }
    }

    #[test]
    fn test_end_without_begin() {
        let mut w = writer();
        assert!(matches!(w.end_chunk(), Err(Error::NoOpenChunk)));
    }

    #[test]
    fn test_finish_with_open_chunk() {
        let mut w = writer();
        w.begin_chunk("a").unwrap();
        w.begin_chunk("b").unwrap();
        assert!(matches!(w.finish(), Err(Error::UnclosedChunks(2))));
    }
}
