//! Animation persistence on top of the chunk container.
//!
//! ```text
//! "animations"          [count u32] count x [name str]
//! "anim/<name>"         [name str][duration f32][loop u8][track_count u32]
//!                       track_count x [kind u8][key str]
//!   "anim/<name>/<key>" track content, nested in the animation chunk
//! ```

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use tracing::debug;

use super::animation::Animation;
use super::data::TrackData;
use super::payload::PayloadKind;
use crate::chunk::{ChunkReader, ChunkRecord, ChunkWriter, ContainerSource};
use crate::config::{ReaderConfig, WriterConfig};
use crate::util::{Error, Result};

/// Label of the animation catalogue chunk.
pub const CATALOGUE_LABEL: &str = "animations";

/// Chunk label of an animation.
///
/// Animation names never contain `/`, so `anim/<name>/<key>` always splits
/// back into one name and one key.
pub fn animation_label(name: &str) -> String {
    format!("anim/{}", name)
}

/// Chunk label of one animation track.
pub fn track_label(animation: &str, key: &str) -> String {
    format!("anim/{}/{}", animation, key)
}

/// Write one animation chunk with its nested track chunks.
pub fn write_animation<W: Write + Seek>(
    writer: &mut ChunkWriter<W>,
    animation: &Animation,
) -> Result<ChunkRecord> {
    let count = u32::try_from(animation.len())
        .map_err(|_| Error::invalid(format!("animation '{}' has too many tracks", animation.name())))?;

    writer.begin_chunk(&animation_label(animation.name()))?;
    writer.write_str(animation.name())?;
    writer.write_f32(animation.duration())?;
    writer.write_u8(u8::from(animation.is_looping()))?;
    writer.write_u32(count)?;
    for track in animation.tracks() {
        writer.write_u8(track.data.kind().to_u8())?;
        writer.write_str(&track.key)?;
    }
    for track in animation.tracks() {
        writer.write_chunk(&track_label(animation.name(), &track.key), |w| track.data.write(w))?;
    }
    writer.end_chunk()
}

/// Write the catalogue followed by every animation.
pub fn write_animations<W: Write + Seek>(
    writer: &mut ChunkWriter<W>,
    animations: &[Animation],
) -> Result<()> {
    let count = u32::try_from(animations.len())
        .map_err(|_| Error::invalid("too many animations for one container"))?;
    writer.write_chunk(CATALOGUE_LABEL, |w| {
        w.write_u32(count)?;
        for animation in animations {
            w.write_str(animation.name())?;
        }
        Ok(())
    })?;
    for animation in animations {
        write_animation(writer, animation)?;
    }
    Ok(())
}

/// Names listed in the catalogue; empty when the container has none.
pub fn animation_names<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<Vec<String>> {
    if reader.index().find_by_label(CATALOGUE_LABEL).is_none() {
        return Ok(Vec::new());
    }
    let record = reader.seek_to_chunk(CATALOGUE_LABEL)?;
    let count = reader.read_u32()?;
    let mut names = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        names.push(reader.read_str()?);
    }
    if reader.remaining() != 0 {
        return Err(Error::corrupt(record.id, reader.position(), "trailing bytes after catalogue"));
    }
    Ok(names)
}

struct TrackEntry {
    kind: PayloadKind,
    key: String,
    offset: u64,
}

/// Read the animation called `name`.
pub fn read_animation<R: Read + Seek>(reader: &mut ChunkReader<R>, name: &str) -> Result<Animation> {
    let label = animation_label(name);
    let record = match reader.seek_to_chunk(label.as_str()) {
        Err(Error::ChunkNotFound(_)) => return Err(Error::AnimationNotFound(name.to_string())),
        other => other?,
    };
    let id = record.id;

    let offset = reader.position();
    let stored = reader.read_str()?;
    if stored != name {
        return Err(Error::corrupt(id, offset, format!("chunk names animation '{}'", stored)));
    }
    let offset = reader.position();
    let duration = reader.read_f32()?;
    let looping = match reader.read_u8()? {
        0 => false,
        1 => true,
        v => return Err(Error::corrupt(id, offset + 4, format!("loop flag {}", v))),
    };
    let mut animation = Animation::new(name, duration)
        .and_then(|a| a.with_looping(looping))
        .map_err(|e| Error::corrupt(id, offset, e.to_string()))?;

    let count = reader.read_u32()?;
    let mut entries = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let offset = reader.position();
        let tag = reader.read_u8()?;
        let kind = PayloadKind::from_u8(tag).map_err(|e| Error::corrupt(id, offset, e.to_string()))?;
        let key = reader.read_str()?;
        entries.push(TrackEntry { kind, key, offset });
    }

    for entry in entries {
        let label = track_label(name, &entry.key);
        let track = match reader.seek_to_chunk(label.as_str()) {
            Err(Error::ChunkNotFound(_)) => {
                return Err(Error::corrupt(id, entry.offset, format!("missing track chunk '{}'", label)))
            }
            other => other?,
        };
        if track.offset < record.offset || track.end() > record.end() {
            return Err(Error::corrupt(
                track.id,
                track.offset,
                format!("track '{}' lies outside animation '{}'", entry.key, name),
            ));
        }
        let data = TrackData::read(entry.kind, reader)?;
        animation
            .add_track(entry.key, data)
            .map_err(|e| Error::corrupt(id, entry.offset, e.to_string()))?;
    }

    debug!(name, tracks = animation.len(), duration, looping, "read animation");
    Ok(animation)
}

/// Read every animation named in the catalogue, in catalogue order.
pub fn read_animations<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<Vec<Animation>> {
    animation_names(reader)?
        .iter()
        .map(|name| read_animation(reader, name))
        .collect()
}

/// Write `animations` to a new container file.
pub fn save_animations(path: impl AsRef<Path>, animations: &[Animation]) -> Result<()> {
    save_animations_with(path, animations, &WriterConfig::default())
}

pub fn save_animations_with(
    path: impl AsRef<Path>,
    animations: &[Animation],
    config: &WriterConfig,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer: ChunkWriter<BufWriter<File>> = ChunkWriter::create_with(path, config)?;
    write_animations(&mut writer, animations)?;
    writer.finish()?;
    debug!(path = %path.display(), count = animations.len(), "saved animations");
    Ok(())
}

/// Load every animation from a container file.
pub fn load_animations(path: impl AsRef<Path>) -> Result<Vec<Animation>> {
    load_animations_with(path, &ReaderConfig::default())
}

pub fn load_animations_with(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Vec<Animation>> {
    let path = path.as_ref();
    let mut reader: ChunkReader<ContainerSource> = ChunkReader::open_with(path, config)?;
    let animations = read_animations(&mut reader)?;
    debug!(path = %path.display(), count = animations.len(), "loaded animations");
    Ok(animations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{Interpolation, Track};
    use crate::util::{Quat, Vec3};
    use std::io::Cursor;

    fn walk() -> Animation {
        let pos = Track::with_keys(
            Interpolation::Spline,
            [(0.0, Vec3::ZERO), (0.5, Vec3::new(1.0, 0.5, 0.0)), (1.0, Vec3::X * 2.0)],
        )
        .unwrap();
        let rot = Track::with_keys(
            Interpolation::Linear,
            [(0.0, Quat::IDENTITY), (1.0, Quat::from_rotation_y(1.0))],
        )
        .unwrap();
        Animation::new("walk", 1.0)
            .unwrap()
            .with_looping(true)
            .unwrap()
            .with_track("position", pos)
            .unwrap()
            .with_track("rotation", rot)
            .unwrap()
    }

    fn container(animations: &[Animation]) -> ChunkReader<ContainerSource> {
        let mut w = ChunkWriter::new(Cursor::new(Vec::new())).unwrap();
        write_animations(&mut w, animations).unwrap();
        ChunkReader::from_bytes(w.finish().unwrap().into_inner()).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let idle = Animation::new("idle", 0.0).unwrap();
        let mut r = container(&[walk(), idle.clone()]);
        assert_eq!(animation_names(&mut r).unwrap(), vec!["walk", "idle"]);
        let read = read_animations(&mut r).unwrap();
        assert_eq!(read, vec![walk(), idle]);
        assert_eq!(read[0].evaluate(0.3), walk().evaluate(0.3));
    }

    #[test]
    fn test_track_chunks_are_nested() {
        let r = container(&[walk()]);
        let anim = *r.index().find_by_label("anim/walk").unwrap();
        let track = *r.index().find_by_label("anim/walk/position").unwrap();
        assert!(track.offset > anim.offset && track.end() <= anim.end());
    }

    #[test]
    fn test_missing_animation() {
        let mut r = container(&[walk()]);
        assert!(matches!(read_animation(&mut r, "run"), Err(Error::AnimationNotFound(_))));
    }

    #[test]
    fn test_no_catalogue() {
        let mut w = ChunkWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write_chunk("other", |w| w.write_u8(1)).unwrap();
        let mut r = ChunkReader::from_bytes(w.finish().unwrap().into_inner()).unwrap();
        assert!(read_animations(&mut r).unwrap().is_empty());
    }

    #[test]
    fn test_missing_track_chunk_is_corruption() {
        let mut w = ChunkWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write_chunk("anim/broken", |w| {
            w.write_str("broken")?;
            w.write_f32(1.0)?;
            w.write_u8(0)?;
            w.write_u32(1)?;
            w.write_u8(PayloadKind::Float.to_u8())?;
            w.write_str("x")
        })
        .unwrap();
        let mut r = ChunkReader::from_bytes(w.finish().unwrap().into_inner()).unwrap();
        assert!(read_animation(&mut r, "broken").unwrap_err().is_corruption());
    }

    #[test]
    fn test_unknown_kind_tag_names_chunk_and_offset() {
        let mut w = ChunkWriter::new(Cursor::new(Vec::new())).unwrap();
        let record = w
            .write_chunk("anim/odd", |w| {
                w.write_str("odd")?;
                w.write_f32(1.0)?;
                w.write_u8(0)?;
                w.write_u32(1)?;
                w.write_u8(42)?;
                w.write_str("x")
            })
            .unwrap();
        let mut r = ChunkReader::from_bytes(w.finish().unwrap().into_inner()).unwrap();
        // content: [name str "odd"][duration][loop][count] then the tag
        let content = record.offset + crate::chunk::chunk_header_len("anim/odd".len());
        let tag_at = content + 2 + 3 + 4 + 1 + 4;
        match read_animation(&mut r, "odd") {
            Err(Error::CorruptChunk { id, offset, reason }) => {
                assert_eq!(id, crate::chunk::chunk_id("anim/odd"));
                assert_eq!(offset, tag_at);
                assert!(reason.contains("42"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_names_sharing_a_label_prefix() {
        let a = Animation::new("a", 1.0)
            .unwrap()
            .with_track("b", Track::<f32>::default())
            .unwrap();
        let ab = Animation::new("ab", 1.0)
            .unwrap()
            .with_track("c/d", Track::<f32>::default())
            .unwrap();
        let mut r = container(&[a.clone(), ab.clone()]);
        assert_eq!(read_animations(&mut r).unwrap(), vec![a, ab]);
        assert!(matches!(Animation::new("a/b", 1.0), Err(Error::InvalidAnimationName(_))));
    }

    #[test]
    fn test_invalid_stored_loop_is_corruption() {
        let mut w = ChunkWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write_chunk("anim/still", |w| {
            w.write_str("still")?;
            w.write_f32(0.0)?;
            w.write_u8(1)?;
            w.write_u32(0)
        })
        .unwrap();
        let mut r = ChunkReader::from_bytes(w.finish().unwrap().into_inner()).unwrap();
        assert!(read_animation(&mut r, "still").unwrap_err().is_corruption());
    }
}
