//! Container reader.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;
use tracing::{debug, trace};

use super::format::*;
use super::id::{chunk_id, ChunkId, ChunkKey};
use super::index::{ChunkIndex, ChunkRecord};
use crate::config::ReaderConfig;
use crate::util::{Error, Result};

/// Byte source for a container opened from a file.
pub enum ContainerSource {
    /// Memory-mapped file (preferred for large files)
    #[cfg(feature = "mmap")]
    Mmap(Cursor<Mmap>),
    /// Buffered file access (fallback)
    File(BufReader<File>),
    /// In-memory copy
    Memory(Cursor<Vec<u8>>),
}

impl Read for ContainerSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mmap(c) => c.read(buf),
            Self::File(f) => f.read(buf),
            Self::Memory(c) => c.read(buf),
        }
    }
}

impl Seek for ContainerSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mmap(c) => c.seek(pos),
            Self::File(f) => f.seek(pos),
            Self::Memory(c) => c.seek(pos),
        }
    }
}

/// Chunk currently being read.
#[derive(Clone, Copy, Debug)]
struct ActiveChunk {
    id: ChunkId,
    end: u64,
}

/// Parsed inline chunk header.
#[derive(Clone, Debug)]
pub struct ChunkHeader {
    pub id: ChunkId,
    pub length: u64,
    pub label: String,
}

impl ChunkHeader {
    /// Size of the header on disk.
    #[inline]
    pub fn len(&self) -> u64 {
        chunk_header_len(self.label.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.label.is_empty()
    }
}

/// Random-access chunk reader over a seekable stream.
pub struct ChunkReader<R: Read + Seek> {
    reader: R,
    len: u64,
    pos: u64,
    version: u16,
    index_offset: u64,
    index: ChunkIndex,
    active: Option<ActiveChunk>,
}

impl<R: Read + Seek> fmt::Debug for ChunkReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkReader")
            .field("len", &self.len)
            .field("pos", &self.pos)
            .field("version", &self.version)
            .field("index_offset", &self.index_offset)
            .field("chunks", &self.index.len())
            .field("active", &self.active)
            .finish()
    }
}

impl ChunkReader<ContainerSource> {
    /// Open a container file with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ReaderConfig::default())
    }

    /// Open a container file.
    pub fn open_with(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        let source = Self::source_for(file, size, config)?;
        debug!(path = %path.display(), size, "opening container");
        Self::from_reader_with(source, config)
    }

    #[cfg(feature = "mmap")]
    fn source_for(file: File, size: u64, config: &ReaderConfig) -> Result<ContainerSource> {
        if config.use_mmap && size > 0 {
            // Safety: the file is opened read-only; containers are not modified while open.
            let mmap = unsafe { Mmap::map(&file) }?;
            Ok(ContainerSource::Mmap(Cursor::new(mmap)))
        } else {
            Ok(ContainerSource::File(BufReader::new(file)))
        }
    }

    #[cfg(not(feature = "mmap"))]
    fn source_for(file: File, _size: u64, _config: &ReaderConfig) -> Result<ContainerSource> {
        Ok(ContainerSource::File(BufReader::new(file)))
    }

    /// Open a container held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(ContainerSource::Memory(Cursor::new(bytes)))
    }
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Open a container from any seekable stream with default settings.
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, &ReaderConfig::default())
    }

    /// Open a container from any seekable stream.
    ///
    /// The header, trailer and index block are parsed before anything else;
    /// any inconsistency fails the open.
    pub fn from_reader_with(mut reader: R, config: &ReaderConfig) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        if len < (HEADER_SIZE + TRAILER_SIZE) as u64 {
            return Err(Error::UnexpectedEof(len));
        }

        let mut this = Self {
            reader,
            len,
            pos: 0,
            version: 0,
            index_offset: 0,
            index: ChunkIndex::new(),
            active: None,
        };

        let mut header = [0u8; HEADER_SIZE];
        this.raw_read(0, &mut header)?;
        this.version = Self::parse_header(&header)?;

        let trailer_offset = len - TRAILER_SIZE as u64;
        let mut trailer = [0u8; TRAILER_SIZE];
        this.raw_read(trailer_offset, &mut trailer)?;
        if &trailer[8..] != INDEX_MAGIC {
            return Err(Error::invalid(format!("missing index trailer at offset {}", trailer_offset)));
        }
        let index_offset = u64::from_le_bytes(trailer[..8].try_into().map_err(|_| Error::invalid("trailer"))?);
        let index_end = len - TRAILER_SIZE as u64;
        if index_offset < HEADER_SIZE as u64 || index_offset.saturating_add(INDEX_COUNT_SIZE as u64) > index_end {
            return Err(Error::invalid(format!(
                "index offset {} outside stream of {} bytes",
                index_offset, len
            )));
        }

        let mut count_buf = [0u8; INDEX_COUNT_SIZE];
        this.raw_read(index_offset, &mut count_buf)?;
        let count = u32::from_le_bytes(count_buf) as usize;
        let block_len = index_block_len(count);
        if index_offset + block_len != index_end {
            return Err(Error::invalid(format!(
                "index block at {} declares {} records ({} bytes) but {} bytes remain",
                index_offset,
                count,
                block_len,
                index_end - index_offset
            )));
        }

        let mut records = vec![0u8; count * INDEX_RECORD_SIZE];
        this.raw_read(index_offset + INDEX_COUNT_SIZE as u64, &mut records)?;
        this.index = ChunkIndex::decode(&records, count, index_offset)?;
        this.index_offset = index_offset;

        if config.validate_headers {
            for position in 0..this.index.len() {
                let Some(record) = this.index.at(position).copied() else { break };
                let header = this.read_chunk_header(&record)?;
                this.index.set_label(position, &header.label);
            }
        }

        debug!(version = this.version, chunks = count, index_offset, "container opened");
        Ok(this)
    }

    /// Parse and validate the file header, returning the version.
    fn parse_header(data: &[u8]) -> Result<u16> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        if &data[..CONTAINER_MAGIC.len()] != CONTAINER_MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        if version == 0 || version > CURRENT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(version)
    }

    /// Read at an absolute position, ignoring chunk bounds.
    fn raw_read(&mut self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let end = pos.checked_add(buf.len() as u64).ok_or(Error::UnexpectedEof(pos))?;
        if end > self.len {
            return Err(Error::UnexpectedEof(end));
        }
        self.reader.seek(SeekFrom::Start(pos))?;
        self.reader.read_exact(buf)?;
        self.pos = end;
        Ok(())
    }

    /// Read and verify the inline header of a chunk.
    pub fn read_chunk_header(&mut self, record: &ChunkRecord) -> Result<ChunkHeader> {
        if record.length < CHUNK_HEADER_FIXED_SIZE as u64 {
            return Err(Error::corrupt(
                record.id,
                record.offset,
                format!("length {} is shorter than a chunk header", record.length),
            ));
        }

        let mut fixed = [0u8; CHUNK_HEADER_FIXED_SIZE];
        self.raw_read(record.offset, &mut fixed)?;
        let id = ChunkId(u64::from_le_bytes(fixed[0..8].try_into().map_err(|_| Error::invalid("header"))?));
        let length = u64::from_le_bytes(fixed[8..16].try_into().map_err(|_| Error::invalid("header"))?);
        let label_len = u16::from_le_bytes([fixed[16], fixed[17]]) as usize;

        if id != record.id {
            return Err(Error::corrupt(
                record.id,
                record.offset,
                format!("header carries id {} instead", id),
            ));
        }
        if length != record.length {
            return Err(Error::corrupt(
                record.id,
                record.offset,
                format!("header length {} does not match index length {}", length, record.length),
            ));
        }
        if chunk_header_len(label_len) > record.length {
            return Err(Error::corrupt(
                record.id,
                record.offset,
                format!("label of {} bytes does not fit in chunk", label_len),
            ));
        }

        let mut label = vec![0u8; label_len];
        self.raw_read(record.offset + CHUNK_HEADER_FIXED_SIZE as u64, &mut label)?;
        let label = String::from_utf8(label)
            .map_err(|_| Error::corrupt(record.id, record.offset, "label is not valid UTF-8"))?;
        if chunk_id(&label) != id {
            return Err(Error::corrupt(
                record.id,
                record.offset,
                format!("label '{}' does not hash to the chunk id", label),
            ));
        }

        Ok(ChunkHeader { id, length, label })
    }

    /// Position the cursor at the start of a chunk's content.
    ///
    /// Subsequent reads are bounded by the chunk's end.
    pub fn seek_to_chunk<'k>(&mut self, key: impl Into<ChunkKey<'k>>) -> Result<ChunkRecord> {
        let key = key.into();
        let record = *self
            .index
            .find(key)
            .ok_or_else(|| Error::ChunkNotFound(key.to_string()))?;

        let header = self.read_chunk_header(&record)?;
        if let Some(position) = self.index.position_of(record.id) {
            if self.index.label_of(record.id).is_none() {
                self.index.set_label(position, &header.label);
            }
        }

        let content = record.offset + header.len();
        self.reader.seek(SeekFrom::Start(content))?;
        self.pos = content;
        self.active = Some(ActiveChunk { id: record.id, end: record.end() });
        trace!(label = %header.label, id = %record.id, offset = record.offset, "seek to chunk");
        Ok(record)
    }

    /// Check that `n` more bytes fit inside the active chunk.
    fn reserve(&self, n: u64) -> Result<()> {
        let active = self.active.ok_or(Error::NoOpenChunk)?;
        let available = active.end.saturating_sub(self.pos);
        if n > available {
            return Err(Error::ChunkBounds { id: active.id, offset: self.pos, requested: n, available });
        }
        Ok(())
    }

    /// Fill `buf` from the active chunk.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reserve(buf.len() as u64)?;
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::UnexpectedEof(self.pos + buf.len() as u64)
            } else {
                Error::Io(e)
            }
        })?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Read `n` bytes from the active chunk.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.reserve(n as u64)?;
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a u16 value (little-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read an i32 value (little-endian).
    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Read an f32 value (little-endian).
    pub fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    /// Read an f64 value (little-endian).
    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a `[len u16][utf-8 bytes]` string.
    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| {
            let id = self.active.map(|a| a.id).unwrap_or_default();
            Error::corrupt(id, offset, "string is not valid UTF-8")
        })
    }

    /// Read a whole chunk's content.
    pub fn read_chunk<'k>(&mut self, key: impl Into<ChunkKey<'k>>) -> Result<Vec<u8>> {
        self.seek_to_chunk(key)?;
        let n = self.remaining();
        self.read_bytes(n as usize)
    }

    /// Bytes left in the active chunk (0 when none is active).
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.active.map(|a| a.end.saturating_sub(self.pos)).unwrap_or(0)
    }

    /// Current absolute position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Id of the chunk being read.
    #[inline]
    pub fn active_chunk(&self) -> Option<ChunkId> {
        self.active.map(|a| a.id)
    }

    /// Chunk index parsed at open time.
    #[inline]
    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    /// Container format version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Total stream length.
    #[inline]
    pub fn stream_len(&self) -> u64 {
        self.len
    }

    /// Offset of the index block.
    #[inline]
    pub fn index_offset(&self) -> u64 {
        self.index_offset
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> Read for ChunkReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (buf.len() as u64).min(self.remaining()) as usize;
        if n == 0 {
            return Ok(0);
        }
        let read = self.reader.read(&mut buf[..n])?;
        self.pos += read as u64;
        Ok(read)
    }
}
