//! Generic keyframe track.
//!
//! A track is a time-sorted list of keys plus an interpolation mode. Key
//! times are strictly increasing; adding a key at an existing time replaces
//! that key's value.
//!
//! On-disk content (inside one chunk):
//!
//! ```text
//! [interpolation u8][key_count u32]
//! key_count x [time f32][payload]
//! ```

use std::fmt;
use std::io::{Read, Seek, Write};

use parking_lot::RwLock;

use super::interp::{Interpolation, InterpolationSet};
use super::keyframe::Keyframe;
use super::payload::Payload;
use super::spline::{SplineCache, SplineData};
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::util::{Error, Result};

/// Fold `-0.0` into `0.0` so both name the same key time.
#[inline]
fn canonical_time(time: f32) -> f32 {
    time + 0.0
}

/// Keyframes for one animated property.
pub struct Track<V: Payload> {
    keys: Vec<Keyframe<V>>,
    interpolation: Interpolation,
    spline: RwLock<SplineCache<V>>,
}

impl<V: Payload> Track<V> {
    /// Empty track using `interpolation`.
    pub fn new(interpolation: Interpolation) -> Result<Self> {
        Self::check_mode(interpolation)?;
        Ok(Self::unchecked(Vec::new(), interpolation))
    }

    /// Track from `(time, value)` pairs in any order.
    pub fn with_keys<I>(interpolation: Interpolation, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f32, V)>,
    {
        let mut track = Self::new(interpolation)?;
        for (time, value) in keys {
            track.add_key(time, value)?;
        }
        Ok(track)
    }

    fn unchecked(keys: Vec<Keyframe<V>>, interpolation: Interpolation) -> Self {
        Self {
            keys,
            interpolation,
            spline: RwLock::new(SplineCache::new()),
        }
    }

    fn check_mode(mode: Interpolation) -> Result<()> {
        if V::INTERPOLATION.contains(mode) {
            Ok(())
        } else {
            Err(Error::UnsupportedInterpolation { kind: V::KIND, mode })
        }
    }

    /// Mode used by [`Default`]: linear where supported, step otherwise.
    pub fn default_interpolation() -> Interpolation {
        if V::INTERPOLATION.contains(Interpolation::Linear) {
            Interpolation::Linear
        } else {
            Interpolation::None
        }
    }

    /// Modes this payload kind accepts.
    #[inline]
    pub fn supported_interpolation() -> InterpolationSet {
        V::INTERPOLATION
    }

    #[inline]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, mode: Interpolation) -> Result<()> {
        Self::check_mode(mode)?;
        if mode != self.interpolation {
            self.interpolation = mode;
            self.spline.get_mut().invalidate();
        }
        Ok(())
    }

    /// Insert a key, replacing any key at exactly `time`.
    pub fn add_key(&mut self, time: f32, value: V) -> Result<()> {
        if !time.is_finite() {
            return Err(Error::InvalidKeyTime(time));
        }
        let time = canonical_time(time);
        match self.keys.binary_search_by(|k| k.time.total_cmp(&time)) {
            Ok(i) => self.keys[i].value = value,
            Err(i) => self.keys.insert(i, Keyframe::new(time, value)),
        }
        self.spline.get_mut().invalidate();
        Ok(())
    }

    /// Remove the key at exactly `time`.
    pub fn remove_key(&mut self, time: f32) -> Option<V> {
        let time = canonical_time(time);
        let i = self.keys.binary_search_by(|k| k.time.total_cmp(&time)).ok()?;
        self.remove_at(i).map(|k| k.value)
    }

    /// Remove the key at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<Keyframe<V>> {
        if index >= self.keys.len() {
            return None;
        }
        self.spline.get_mut().invalidate();
        Some(self.keys.remove(index))
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.spline.get_mut().invalidate();
    }

    /// Keys in time order.
    #[inline]
    pub fn keys(&self) -> &[Keyframe<V>] {
        &self.keys
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&Keyframe<V>> {
        self.keys.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&Keyframe<V>> {
        self.keys.last()
    }

    pub fn start_time(&self) -> Option<f32> {
        self.first().map(|k| k.time)
    }

    pub fn end_time(&self) -> Option<f32> {
        self.last().map(|k| k.time)
    }

    /// True when spline data is built and current.
    pub fn is_spline_cache_built(&self) -> bool {
        self.spline.read().get().is_some()
    }

    /// Build the spline cache now instead of on first evaluation.
    /// No-op for non-spline tracks.
    pub fn rebuild_spline_cache(&self) {
        if self.interpolation != Interpolation::Spline {
            return;
        }
        let mut cache = self.spline.write();
        cache.dirty = true;
        cache.ensure(&self.keys);
    }

    /// Value at `time` (seconds).
    ///
    /// Empty tracks yield the payload default. Times outside the key range
    /// clamp to the boundary key; a time exactly on a key yields that key's
    /// stored value in every mode.
    pub fn evaluate(&self, time: f32) -> V {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return V::default(),
        };
        // also catches NaN
        if !(time > first.time) {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        // first.time < time < last.time, so 1 <= next <= len - 1
        let next = self.keys.partition_point(|k| k.time <= time);
        let prev = &self.keys[next - 1];
        let next_key = &self.keys[next];
        if prev.time == time {
            return prev.value;
        }

        let span = next_key.time - prev.time;
        if span <= f32::EPSILON {
            return prev.value;
        }
        let unit = (time - prev.time) / span;

        match self.interpolation {
            Interpolation::None => prev.value,
            Interpolation::Linear => V::lerp(prev.value, next_key.value, unit),
            Interpolation::Spline => self
                .spline_segment(next - 1, span, unit)
                .unwrap_or(prev.value),
        }
    }

    /// Evaluate spline segment `i`, rebuilding the cache first if needed.
    fn spline_segment(&self, i: usize, span: f32, unit: f32) -> Option<V> {
        {
            let cache = self.spline.read();
            if let Some(data) = cache.get() {
                return data.segment(i, span, unit);
            }
        }
        let mut cache = self.spline.write();
        cache.ensure(&self.keys).segment(i, span, unit)
    }

    /// Snapshot of the spline data, building it if needed.
    pub fn spline_data(&self) -> SplineData<V> {
        self.spline.write().ensure(&self.keys).clone()
    }

    /// Write track content into the currently open chunk.
    pub fn write<W: Write + Seek>(&self, writer: &mut ChunkWriter<W>) -> Result<()> {
        let count = u32::try_from(self.keys.len())
            .map_err(|_| Error::invalid(format!("{} keys do not fit a track", self.keys.len())))?;
        writer.write_u8(self.interpolation.to_u8())?;
        writer.write_u32(count)?;
        for key in &self.keys {
            key.write(writer)?;
        }
        Ok(())
    }

    /// Read track content from the active chunk, which must hold exactly one track.
    pub fn read<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<Self> {
        let id = reader.active_chunk().ok_or(Error::NoOpenChunk)?;

        let mode_offset = reader.position();
        let mode = Interpolation::from_u8(reader.read_u8()?)
            .map_err(|e| Error::corrupt(id, mode_offset, e.to_string()))?;
        if !V::INTERPOLATION.contains(mode) {
            return Err(Error::corrupt(
                id,
                mode_offset,
                format!("{} track stored with {} interpolation", V::KIND, mode),
            ));
        }

        let count_offset = reader.position();
        let count = reader.read_u32()? as u64;
        let needed = count.saturating_mul(Keyframe::<V>::encoded_len() as u64);
        if needed > reader.remaining() {
            return Err(Error::corrupt(
                id,
                count_offset,
                format!("{} keys need {} bytes, chunk has {}", count, needed, reader.remaining()),
            ));
        }

        let mut keys: Vec<Keyframe<V>> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let offset = reader.position();
            let key = Keyframe::<V>::read(reader)?;
            if !key.time.is_finite() {
                return Err(Error::corrupt(id, offset, format!("key time {} is not finite", key.time)));
            }
            if let Some(prev) = keys.last() {
                if key.time <= prev.time {
                    return Err(Error::NonMonotonicKey { id, offset, previous: prev.time, time: key.time });
                }
            }
            keys.push(key);
        }

        if reader.remaining() != 0 {
            return Err(Error::corrupt(
                id,
                reader.position(),
                format!("{} trailing bytes after track", reader.remaining()),
            ));
        }
        Ok(Self::unchecked(keys, mode))
    }
}

impl<V: Payload> Default for Track<V> {
    fn default() -> Self {
        Self::unchecked(Vec::new(), Self::default_interpolation())
    }
}

impl<V: Payload> Clone for Track<V> {
    fn clone(&self) -> Self {
        Self::unchecked(self.keys.clone(), self.interpolation)
    }
}

impl<V: Payload> PartialEq for Track<V> {
    fn eq(&self, other: &Self) -> bool {
        self.interpolation == other.interpolation && self.keys == other.keys
    }
}

impl<V: Payload> fmt::Debug for Track<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("kind", &V::KIND)
            .field("interpolation", &self.interpolation)
            .field("keys", &self.keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Quat, Vec2, Vec3};
    use std::io::Cursor;

    fn float_track(mode: Interpolation, keys: &[(f32, f32)]) -> Track<f32> {
        Track::with_keys(mode, keys.iter().copied()).unwrap()
    }

    fn write_track<V: Payload>(track: &Track<V>) -> Vec<u8> {
        let mut w = ChunkWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write_chunk("track", |w| track.write(w)).unwrap();
        w.finish().unwrap().into_inner()
    }

    fn read_track<V: Payload>(bytes: Vec<u8>) -> Result<Track<V>> {
        let mut r = ChunkReader::from_bytes(bytes).unwrap();
        r.seek_to_chunk("track")?;
        Track::read(&mut r)
    }

    #[test]
    fn test_linear_scenario() {
        let t = float_track(Interpolation::Linear, &[(0.0, 0.0), (1.0, 10.0), (2.0, 0.0)]);
        assert_eq!(t.evaluate(0.5), 5.0);
        assert_eq!(t.evaluate(1.5), 5.0);
        assert_eq!(t.evaluate(2.0), 0.0);
        assert_eq!(t.evaluate(3.0), 0.0);
    }

    #[test]
    fn test_linear_midpoint() {
        let t = float_track(Interpolation::Linear, &[(0.0, 0.0), (10.0, 10.0)]);
        assert_eq!(t.evaluate(5.0), 5.0);
        assert_eq!(t.evaluate(2.5), 2.5);
    }

    #[test]
    fn test_boundary_clamp() {
        for mode in Interpolation::ALL {
            let t = float_track(mode, &[(1.0, 3.0), (2.0, 7.0)]);
            assert_eq!(t.evaluate(-100.0), 3.0);
            assert_eq!(t.evaluate(0.999), 3.0);
            assert_eq!(t.evaluate(2.001), 7.0);
            assert_eq!(t.evaluate(1e9), 7.0);
        }
    }

    #[test]
    fn test_exact_key_in_every_mode() {
        let keys = [(0.0, 1.0), (0.3, -2.0), (1.1, 4.5), (1.7, 0.25), (4.0, 9.0)];
        for mode in Interpolation::ALL {
            let t = float_track(mode, &keys);
            for &(time, value) in &keys {
                assert_eq!(t.evaluate(time), value, "{} at {}", mode, time);
            }
        }
    }

    #[test]
    fn test_step_holds_previous() {
        let t = float_track(Interpolation::None, &[(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(t.evaluate(0.99), 1.0);
        assert_eq!(t.evaluate(1.0), 2.0);
    }

    #[test]
    fn test_empty_and_single() {
        let t = Track::<Vec3>::default();
        assert_eq!(t.evaluate(1.0), Vec3::ZERO);
        let t = float_track(Interpolation::Spline, &[(2.0, 5.0)]);
        assert_eq!(t.evaluate(0.0), 5.0);
        assert_eq!(t.evaluate(9.0), 5.0);
    }

    #[test]
    fn test_nan_time_first_key() {
        let t = float_track(Interpolation::Linear, &[(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(t.evaluate(f32::NAN), 1.0);
    }

    #[test]
    fn test_add_key_sorted_and_replace() {
        let mut t = Track::<f32>::new(Interpolation::Linear).unwrap();
        t.add_key(2.0, 20.0).unwrap();
        t.add_key(0.0, 0.0).unwrap();
        t.add_key(1.0, 10.0).unwrap();
        t.add_key(1.0, 11.0).unwrap();
        let times: Vec<f32> = t.keys().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
        assert_eq!(t.evaluate(1.0), 11.0);
        assert!(matches!(t.add_key(f32::INFINITY, 0.0), Err(Error::InvalidKeyTime(_))));
        assert_eq!(t.remove_key(1.0), Some(11.0));
        assert_eq!(t.remove_key(1.0), None);
        assert_eq!((t.start_time(), t.end_time()), (Some(0.0), Some(2.0)));
    }

    #[test]
    fn test_negative_zero_is_the_same_key() {
        let mut t = Track::<f32>::new(Interpolation::Linear).unwrap();
        t.add_key(-0.0, 1.0).unwrap();
        t.add_key(0.0, 2.0).unwrap();
        t.add_key(1.0, 3.0).unwrap();
        assert_eq!(t.len(), 2);
        assert!(t.keys()[0].time.is_sign_positive());
        assert_eq!(t.evaluate(0.0), 2.0);

        let back = read_track::<f32>(write_track(&t)).unwrap();
        assert_eq!(back, t);

        assert_eq!(t.remove_key(-0.0), Some(2.0));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_unsupported_modes() {
        assert!(Track::<bool>::new(Interpolation::None).is_ok());
        assert!(matches!(
            Track::<bool>::new(Interpolation::Linear),
            Err(Error::UnsupportedInterpolation { .. })
        ));
        let mut t = Track::<i32>::default();
        assert_eq!(t.interpolation(), Interpolation::Linear);
        assert!(t.set_interpolation(Interpolation::Spline).is_err());
        assert_eq!(Track::<bool>::default().interpolation(), Interpolation::None);
    }

    #[test]
    fn test_spline_passes_through_keys_and_is_smooth() {
        let keys = [(0.0, 0.0), (0.5, 3.0), (2.0, -1.0), (2.4, 2.0), (4.0, 0.0)];
        let t = float_track(Interpolation::Spline, &keys);

        for &(time, value) in &keys {
            assert_eq!(t.evaluate(time), value);
            // continuity of value
            let eps = 1e-3;
            if time > 0.0 && time < 4.0 {
                assert!((t.evaluate(time - eps) - value).abs() < 0.05);
                assert!((t.evaluate(time + eps) - value).abs() < 0.05);
            }
        }

        // first derivative agrees on both sides of every interior key
        let h = 1e-4;
        for &(time, _) in &keys[1..keys.len() - 1] {
            let (lo, hi) = (time - h, time + h);
            let left = (t.evaluate(time) - t.evaluate(lo)) / (time - lo);
            let right = (t.evaluate(hi) - t.evaluate(time)) / (hi - time);
            assert!((left - right).abs() < 0.1, "kink at {}: {} vs {}", time, left, right);
        }
    }

    #[test]
    fn test_spline_uniform_matches_catmull_rom() {
        let t = float_track(Interpolation::Spline, &[(0.0, 0.0), (1.0, 1.0), (2.0, 4.0), (3.0, 9.0)]);
        // Catmull-Rom segment 1..2 at u = 0.5 with m1 = 2, m2 = 4
        let (p1, p2, m1, m2) = (1.0f32, 4.0f32, 2.0f32, 4.0f32);
        let expected = 0.5 * p1 + 0.125 * m1 + 0.5 * p2 - 0.125 * m2;
        assert!((t.evaluate(1.5) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_spline_cache_lifecycle() {
        let mut t = float_track(Interpolation::Spline, &[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        assert!(!t.is_spline_cache_built());
        t.evaluate(0.5);
        assert!(t.is_spline_cache_built());
        t.add_key(3.0, 1.0).unwrap();
        assert!(!t.is_spline_cache_built());
        t.rebuild_spline_cache();
        assert!(t.is_spline_cache_built());
        assert_eq!(t.spline_data().len(), 4);
    }

    #[test]
    fn test_concurrent_first_reads() {
        let t = float_track(Interpolation::Spline, &[(0.0, 0.0), (1.0, 2.0), (2.0, 1.0), (3.0, 3.0)]);
        let expected = t.clone().evaluate(1.5);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        assert_eq!(t.evaluate(1.5), expected);
                    }
                });
            }
        });
    }

    #[test]
    fn test_quat_spline_normalized() {
        let t = Track::with_keys(
            Interpolation::Spline,
            [
                (0.0, Quat::IDENTITY),
                (1.0, -Quat::from_rotation_y(1.0)),
                (2.0, Quat::from_rotation_y(2.0)),
            ],
        )
        .unwrap();
        let q = t.evaluate(0.5);
        assert!(q.is_normalized());
        assert!(q.angle_between(Quat::from_rotation_y(0.5)) < 0.1);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let t = Track::with_keys(
            Interpolation::Spline,
            [(0.0, Vec2::new(0.0, 1.0)), (0.5, Vec2::new(2.0, 3.0)), (1.5, Vec2::ONE)],
        )
        .unwrap();
        let read = read_track::<Vec2>(write_track(&t)).unwrap();
        assert_eq!(read, t);
        assert_eq!(read.evaluate(0.7), t.evaluate(0.7));
    }

    fn raw_track(mode: u8, keys: &[(f32, f32)], trailing: usize) -> Vec<u8> {
        let mut w = ChunkWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write_chunk("track", |w| {
            w.write_u8(mode)?;
            w.write_u32(keys.len() as u32)?;
            for &(time, value) in keys {
                w.write_f32(time)?;
                w.write_f32(value)?;
            }
            w.write_bytes(&vec![0u8; trailing])
        })
        .unwrap();
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_non_monotonic_is_corruption() {
        let bytes = raw_track(1, &[(0.0, 0.0), (2.0, 1.0), (1.0, 2.0)], 0);
        let err = read_track::<f32>(bytes).unwrap_err();
        assert!(err.is_corruption());
        match err {
            Error::NonMonotonicKey { previous, time, .. } => {
                assert_eq!((previous, time), (2.0, 1.0));
            }
            other => panic!("unexpected {:?}", other),
        }

        let dup = raw_track(1, &[(1.0, 0.0), (1.0, 1.0)], 0);
        assert!(matches!(read_track::<f32>(dup), Err(Error::NonMonotonicKey { .. })));
    }

    #[test]
    fn test_read_rejects_bad_content() {
        let mode_at = (crate::chunk::HEADER_SIZE + crate::chunk::chunk_header_len(5) as usize) as u64;
        match read_track::<f32>(raw_track(9, &[], 0)) {
            Err(Error::CorruptChunk { id, offset, reason }) => {
                assert_eq!(id, crate::chunk::chunk_id("track"));
                assert_eq!(offset, mode_at);
                assert!(reason.contains("tag 9"));
            }
            other => panic!("unexpected {:?}", other.map(|t| t.len())),
        }
        assert!(read_track::<f32>(raw_track(1, &[(0.0, 1.0)], 3)).unwrap_err().is_corruption());
        assert!(read_track::<f32>(raw_track(1, &[(f32::NAN, 1.0)], 0)).unwrap_err().is_corruption());

        // count larger than the chunk
        let mut bytes = raw_track(1, &[(0.0, 1.0)], 0);
        let count_at = crate::chunk::HEADER_SIZE + crate::chunk::chunk_header_len(5) as usize + 1;
        bytes[count_at] = 200;
        assert!(read_track::<f32>(bytes).unwrap_err().is_corruption());
    }
}
