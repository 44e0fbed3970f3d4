//! Single (time, value) samples.

use std::io::{Read, Seek, Write};

use super::payload::{Payload, MAX_PAYLOAD_SIZE};
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::util::{Error, Result};

/// One key on a track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe<V> {
    /// Time in seconds.
    pub time: f32,
    pub value: V,
}

impl<V: Payload> Keyframe<V> {
    #[inline]
    pub fn new(time: f32, value: V) -> Self {
        Self { time, value }
    }

    /// Encoded size in bytes.
    #[inline]
    pub const fn encoded_len() -> usize {
        4 + V::BYTE_SIZE
    }

    /// Write `[time f32][payload]`.
    pub fn write<W: Write + Seek>(&self, writer: &mut ChunkWriter<W>) -> Result<()> {
        writer.write_f32(self.time)?;
        self.value.encode(writer)?;
        Ok(())
    }

    /// Read `[time f32][payload]` from the active chunk.
    pub fn read<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<Self> {
        let time = reader.read_f32()?;
        let offset = reader.position();
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let bytes = &mut buf[..V::BYTE_SIZE];
        reader.read_into(bytes)?;
        let value = V::decode(bytes).map_err(|e| {
            Error::corrupt(
                reader.active_chunk().unwrap_or_default(),
                offset,
                format!("bad {} payload: {}", V::KIND, e),
            )
        })?;
        Ok(Self { time, value })
    }
}

impl<V> From<(f32, V)> for Keyframe<V> {
    fn from((time, value): (f32, V)) -> Self {
        Self { time, value }
    }
}
