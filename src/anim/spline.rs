//! Precomputed Hermite spline data for spline-interpolated tracks.
//!
//! Tangents are per unit time. Interior keys use the central difference
//! over their neighbours; the first and last key use half the one-sided
//! slope. Segment evaluation scales tangents by the segment length, so the
//! curve is C1 in time even when keys are unevenly spaced.

use super::keyframe::Keyframe;
use super::payload::Payload;

/// Control points and tangents for every key of a track.
#[derive(Clone, Debug)]
pub struct SplineData<V: Payload> {
    /// Key values, sign-aligned to their predecessor where the payload needs it.
    points: Vec<V>,
    tangents: Vec<V::Tangent>,
}

impl<V: Payload> SplineData<V> {
    /// Fit a spline through `keys` (time-sorted, strictly increasing).
    pub fn build(keys: &[Keyframe<V>]) -> Self {
        let mut points: Vec<V> = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match points.last() {
                Some(&prev) => V::align(prev, key.value),
                None => key.value,
            };
            points.push(value);
        }

        let n = points.len();
        let mut tangents = Vec::with_capacity(n);
        if n < 2 {
            tangents.resize(n, V::Tangent::default());
            return Self { points, tangents };
        }

        let time = |i: usize| keys[i].time;
        tangents.push(V::slope(points[0], points[1], 2.0 * (time(1) - time(0))));
        for i in 1..n - 1 {
            tangents.push(V::slope(points[i - 1], points[i + 1], time(i + 1) - time(i - 1)));
        }
        tangents.push(V::slope(points[n - 2], points[n - 1], 2.0 * (time(n - 1) - time(n - 2))));

        Self { points, tangents }
    }

    /// Number of control points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Tangent at key `i`, per unit time.
    #[inline]
    pub fn tangent(&self, i: usize) -> Option<V::Tangent> {
        self.tangents.get(i).copied()
    }

    /// Evaluate segment `i` (between keys `i` and `i + 1`) of length `h`
    /// seconds at local parameter `t` in `[0, 1]`.
    pub fn segment(&self, i: usize, h: f32, t: f32) -> Option<V> {
        let p0 = *self.points.get(i)?;
        let p1 = *self.points.get(i + 1)?;
        let m0 = self.tangents[i];
        let m1 = self.tangents[i + 1];
        Some(V::hermite(p0, m0, p1, m1, h, t))
    }
}

/// Lazily rebuilt spline state of a track.
#[derive(Debug)]
pub(crate) struct SplineCache<V: Payload> {
    pub dirty: bool,
    pub data: Option<SplineData<V>>,
}

impl<V: Payload> SplineCache<V> {
    pub fn new() -> Self {
        Self { dirty: true, data: None }
    }

    /// Valid cached data, if any.
    #[inline]
    pub fn get(&self) -> Option<&SplineData<V>> {
        if self.dirty {
            None
        } else {
            self.data.as_ref()
        }
    }

    /// Drop cached data; the next spline evaluation rebuilds it.
    #[inline]
    pub fn invalidate(&mut self) {
        self.dirty = true;
        self.data = None;
    }

    /// Rebuild from `keys` if dirty and return the fresh data.
    pub fn ensure(&mut self, keys: &[Keyframe<V>]) -> &SplineData<V> {
        if self.dirty {
            self.dirty = false;
            self.data = None;
        }
        self.data.get_or_insert_with(|| SplineData::build(keys))
    }
}
