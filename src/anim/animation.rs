//! Named bundles of tracks.

use super::data::TrackData;
use super::payload::{Payload, Value};
use super::track::Track;
use crate::util::{Error, Result};

/// One keyed track of an animation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTrack {
    /// Property key the track drives.
    pub key: String,
    pub data: TrackData,
}

/// Tracks plus playback length and loop flag.
///
/// Authored through `&mut`, then shared read-only (typically in an `Arc`)
/// between any number of controllers.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    name: String,
    duration: f32,
    looping: bool,
    tracks: Vec<AnimationTrack>,
}

impl Animation {
    /// Empty, non-looping animation.
    ///
    /// `name` must not contain `/`, which separates the animation name from
    /// track keys in chunk labels.
    pub fn new(name: impl Into<String>, duration: f32) -> Result<Self> {
        let name = name.into();
        if name.contains('/') {
            return Err(Error::InvalidAnimationName(name));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidDuration(duration));
        }
        Ok(Self {
            name,
            duration,
            looping: false,
            tracks: Vec::new(),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) -> Result<()> {
        if looping && self.duration <= 0.0 {
            return Err(Error::ZeroDurationLoop(self.name.clone()));
        }
        self.looping = looping;
        Ok(())
    }

    /// Builder form of [`set_looping`](Self::set_looping).
    pub fn with_looping(mut self, looping: bool) -> Result<Self> {
        self.set_looping(looping)?;
        Ok(self)
    }

    /// Add a track under `key`. Keys are unique per animation.
    pub fn add_track(&mut self, key: impl Into<String>, data: impl Into<TrackData>) -> Result<()> {
        let key = key.into();
        if self.track(&key).is_some() {
            return Err(Error::DuplicateTrack(key));
        }
        self.tracks.push(AnimationTrack { key, data: data.into() });
        Ok(())
    }

    /// Builder form of [`add_track`](Self::add_track).
    pub fn with_track(mut self, key: impl Into<String>, data: impl Into<TrackData>) -> Result<Self> {
        self.add_track(key, data)?;
        Ok(self)
    }

    pub fn track(&self, key: &str) -> Option<&TrackData> {
        self.tracks.iter().find(|t| t.key == key).map(|t| &t.data)
    }

    pub fn track_mut(&mut self, key: &str) -> Option<&mut TrackData> {
        self.tracks.iter_mut().find(|t| t.key == key).map(|t| &mut t.data)
    }

    /// Typed track lookup.
    pub fn typed_track<V: Payload>(&self, key: &str) -> Result<&Track<V>> {
        self.track(key)
            .and_then(|d| d.get::<V>())
            .ok_or_else(|| Error::TrackNotFound(key.to_string()))
    }

    /// Position of the track keyed `key`.
    pub fn track_index(&self, key: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.key == key)
    }

    pub fn remove_track(&mut self, key: &str) -> Option<TrackData> {
        let i = self.track_index(key)?;
        Some(self.tracks.remove(i).data)
    }

    /// Tracks in insertion order.
    #[inline]
    pub fn tracks(&self) -> &[AnimationTrack] {
        &self.tracks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Build every spline cache so later evaluation never writes.
    pub fn prepare(&self) {
        for track in &self.tracks {
            track.data.rebuild_spline_cache();
        }
    }

    /// Sample every track at `time`.
    pub fn evaluate(&self, time: f32) -> Vec<(&str, Value)> {
        self.tracks
            .iter()
            .map(|t| (t.key.as_str(), t.data.sample(time)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::Interpolation;
    use crate::util::Vec3;

    fn bounce() -> Animation {
        let height = Track::<f32>::with_keys(Interpolation::Linear, [(0.0, 0.0), (1.0, 10.0), (2.0, 0.0)]).unwrap();
        let visible = Track::with_keys(Interpolation::None, [(0.0, true), (1.5, false)]).unwrap();
        Animation::new("bounce", 2.0)
            .unwrap()
            .with_track("height", height)
            .unwrap()
            .with_track("visible", visible)
            .unwrap()
    }

    #[test]
    fn test_new_validates_duration() {
        assert!(Animation::new("a", 0.0).is_ok());
        assert!(matches!(Animation::new("a", -1.0), Err(Error::InvalidDuration(_))));
        assert!(matches!(Animation::new("a", f32::NAN), Err(Error::InvalidDuration(_))));
    }

    #[test]
    fn test_new_rejects_label_separator() {
        let err = Animation::new("walk/left", 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidAnimationName(ref n) if n == "walk/left"));
        assert_eq!(err.kind(), crate::util::ErrorKind::Configuration);
    }

    #[test]
    fn test_zero_duration_loop() {
        let mut a = Animation::new("still", 0.0).unwrap();
        assert!(matches!(a.set_looping(true), Err(Error::ZeroDurationLoop(_))));
        assert!(a.set_looping(false).is_ok());
        assert!(!a.is_looping());
    }

    #[test]
    fn test_duplicate_track() {
        let mut a = bounce();
        let err = a.add_track("height", Track::<f32>::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateTrack(k) if k == "height"));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_evaluate() {
        let a = bounce();
        let values = a.evaluate(0.5);
        assert_eq!(values, vec![("height", Value::Float(5.0)), ("visible", Value::Bool(true))]);
        assert_eq!(a.evaluate(1.75)[1].1, Value::Bool(false));
    }

    #[test]
    fn test_typed_lookup() {
        let mut a = bounce();
        assert!(a.typed_track::<f32>("height").is_ok());
        assert!(matches!(a.typed_track::<Vec3>("height"), Err(Error::TrackNotFound(_))));
        assert_eq!(a.track_index("visible"), Some(1));
        assert!(a.remove_track("visible").is_some());
        assert!(a.track("visible").is_none());
    }
}
