//! Chunk records and the chunk index.

use std::collections::HashMap;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::format::{index_block_len, INDEX_RECORD_SIZE, MIN_CHUNK_OFFSET};
use super::id::{chunk_id, ChunkId, ChunkKey};
use crate::util::{Error, Result};

/// One contiguous chunk region in a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRecord {
    pub id: ChunkId,
    /// Start of the chunk header.
    pub offset: u64,
    /// Header plus content, including nested chunks.
    pub length: u64,
}

impl ChunkRecord {
    #[inline]
    pub const fn new(id: ChunkId, offset: u64, length: u64) -> Self {
        Self { id, offset, length }
    }

    /// One past the last byte of the chunk. `None` on overflow.
    #[inline]
    pub fn checked_end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }

    /// One past the last byte of the chunk.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Ordered chunk records with lookup by position, id and label.
///
/// Insertion order is the order chunks were opened in, so a parent precedes
/// its nested children.
#[derive(Clone, Debug, Default)]
pub struct ChunkIndex {
    records: Vec<ChunkRecord>,
    labels: Vec<Option<String>>,
    by_id: HashMap<ChunkId, usize>,
    by_label: HashMap<String, usize>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
            by_id: HashMap::with_capacity(capacity),
            by_label: HashMap::new(),
        }
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at an insertion position.
    #[inline]
    pub fn at(&self, position: usize) -> Option<&ChunkRecord> {
        self.records.get(position)
    }

    /// Record with the given id.
    pub fn find_by_id(&self, id: ChunkId) -> Option<&ChunkRecord> {
        self.by_id.get(&id).map(|&pos| &self.records[pos])
    }

    /// Record with the given label.
    ///
    /// Labels not yet seen by name resolve through their hash, unless the
    /// record already carries a different label.
    pub fn find_by_label(&self, label: &str) -> Option<&ChunkRecord> {
        if let Some(&pos) = self.by_label.get(label) {
            return Some(&self.records[pos]);
        }
        let pos = *self.by_id.get(&chunk_id(label))?;
        match &self.labels[pos] {
            Some(known) if known != label => None,
            _ => Some(&self.records[pos]),
        }
    }

    /// Record for a label or id key.
    pub fn find(&self, key: ChunkKey<'_>) -> Option<&ChunkRecord> {
        match key {
            ChunkKey::Label(label) => self.find_by_label(label),
            ChunkKey::Id(id) => self.find_by_id(id),
        }
    }

    /// Insertion position of the record with the given id.
    #[inline]
    pub fn position_of(&self, id: ChunkId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Label of a record, when known.
    pub fn label_of(&self, id: ChunkId) -> Option<&str> {
        let pos = self.position_of(id)?;
        self.labels[pos].as_deref()
    }

    /// Iterate records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> + '_ {
        self.records.iter()
    }

    /// Iterate records paired with their labels.
    pub fn entries(&self) -> impl Iterator<Item = (&ChunkRecord, Option<&str>)> + '_ {
        self.records.iter().zip(self.labels.iter().map(|l| l.as_deref()))
    }

    /// Append a record. Ids must be unique.
    pub(crate) fn push(&mut self, record: ChunkRecord, label: Option<&str>) -> Result<usize> {
        if let Some(&existing) = self.by_id.get(&record.id) {
            let name = label
                .map(str::to_string)
                .or_else(|| self.labels[existing].clone())
                .unwrap_or_else(|| record.id.to_string());
            return Err(Error::DuplicateChunk(name));
        }
        let pos = self.records.len();
        self.records.push(record);
        self.labels.push(None);
        self.by_id.insert(record.id, pos);
        if let Some(label) = label {
            self.set_label(pos, label);
        }
        Ok(pos)
    }

    pub(crate) fn set_label(&mut self, position: usize, label: &str) {
        self.labels[position] = Some(label.to_string());
        self.by_label.insert(label.to_string(), position);
    }

    pub(crate) fn set_length(&mut self, position: usize, length: u64) {
        self.records[position].length = length;
    }

    /// Encode as an index block: `[count u32]` + records.
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.records.len())
            .map_err(|_| Error::invalid(format!("too many chunks: {}", self.records.len())))?;
        let mut buf = Vec::with_capacity(index_block_len(self.records.len()) as usize);
        buf.write_u32::<LittleEndian>(count)?;
        for record in &self.records {
            buf.write_u64::<LittleEndian>(record.id.value())?;
            buf.write_u64::<LittleEndian>(record.offset)?;
            buf.write_u64::<LittleEndian>(record.length)?;
        }
        Ok(buf)
    }

    /// Decode `count` records. Every record must lie in `[MIN_CHUNK_OFFSET, limit)`.
    pub(crate) fn decode(buf: &[u8], count: usize, limit: u64) -> Result<Self> {
        if buf.len() != count * INDEX_RECORD_SIZE {
            return Err(Error::invalid(format!(
                "index block holds {} bytes, {} records need {}",
                buf.len(),
                count,
                count * INDEX_RECORD_SIZE
            )));
        }

        let mut index = Self::with_capacity(count);
        let mut cursor = buf;
        for _ in 0..count {
            let id = ChunkId(cursor.read_u64::<LittleEndian>()?);
            let offset = cursor.read_u64::<LittleEndian>()?;
            let length = cursor.read_u64::<LittleEndian>()?;
            let record = ChunkRecord::new(id, offset, length);

            if offset < MIN_CHUNK_OFFSET {
                return Err(Error::corrupt(id, offset, "chunk starts inside the file header"));
            }
            match record.checked_end() {
                Some(end) if end <= limit => {}
                Some(end) => {
                    return Err(Error::corrupt(
                        id,
                        offset,
                        format!("length {} extends {} bytes past the chunk area", length, end - limit),
                    ));
                }
                None => return Err(Error::corrupt(id, offset, format!("length {} overflows", length))),
            }
            if index.by_id.contains_key(&id) {
                return Err(Error::corrupt(id, offset, "duplicate chunk id in index"));
            }
            index.push(record, None)?;
        }
        Ok(index)
    }
}
