//! Type-erased track storage for heterogeneous animations.

use std::io::{Read, Seek, Write};

use super::interp::Interpolation;
use super::payload::{Payload, PayloadKind, Value};
use super::track::Track;
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::util::{Color, Quat, Result, Vec2, Vec3, Vec4};

/// A track of any payload kind.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackData {
    Float(Track<f32>),
    Vec2(Track<Vec2>),
    Vec3(Track<Vec3>),
    Vec4(Track<Vec4>),
    Color(Track<Color>),
    Quat(Track<Quat>),
    Int(Track<i32>),
    Bool(Track<bool>),
}

macro_rules! dispatch {
    ($self:expr, $t:ident => $body:expr) => {
        match $self {
            TrackData::Float($t) => $body,
            TrackData::Vec2($t) => $body,
            TrackData::Vec3($t) => $body,
            TrackData::Vec4($t) => $body,
            TrackData::Color($t) => $body,
            TrackData::Quat($t) => $body,
            TrackData::Int($t) => $body,
            TrackData::Bool($t) => $body,
        }
    };
}

impl TrackData {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Float(_) => PayloadKind::Float,
            Self::Vec2(_) => PayloadKind::Vec2,
            Self::Vec3(_) => PayloadKind::Vec3,
            Self::Vec4(_) => PayloadKind::Vec4,
            Self::Color(_) => PayloadKind::Color,
            Self::Quat(_) => PayloadKind::Quat,
            Self::Int(_) => PayloadKind::Int,
            Self::Bool(_) => PayloadKind::Bool,
        }
    }

    /// Typed view of the track.
    #[inline]
    pub fn get<V: Payload>(&self) -> Option<&Track<V>> {
        V::track_ref(self)
    }

    pub fn len(&self) -> usize {
        dispatch!(self, t => t.len())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, t => t.is_empty())
    }

    pub fn interpolation(&self) -> Interpolation {
        dispatch!(self, t => t.interpolation())
    }

    pub fn start_time(&self) -> Option<f32> {
        dispatch!(self, t => t.start_time())
    }

    pub fn end_time(&self) -> Option<f32> {
        dispatch!(self, t => t.end_time())
    }

    /// Evaluate as a dynamic value.
    pub fn sample(&self, time: f32) -> Value {
        dispatch!(self, t => t.evaluate(time).into_value())
    }

    pub fn rebuild_spline_cache(&self) {
        dispatch!(self, t => t.rebuild_spline_cache())
    }

    pub fn write<W: Write + Seek>(&self, writer: &mut ChunkWriter<W>) -> Result<()> {
        dispatch!(self, t => t.write(writer))
    }

    /// Read a track of `kind` from the active chunk.
    pub fn read<R: Read + Seek>(kind: PayloadKind, reader: &mut ChunkReader<R>) -> Result<Self> {
        Ok(match kind {
            PayloadKind::Float => Self::Float(Track::read(reader)?),
            PayloadKind::Vec2 => Self::Vec2(Track::read(reader)?),
            PayloadKind::Vec3 => Self::Vec3(Track::read(reader)?),
            PayloadKind::Vec4 => Self::Vec4(Track::read(reader)?),
            PayloadKind::Color => Self::Color(Track::read(reader)?),
            PayloadKind::Quat => Self::Quat(Track::read(reader)?),
            PayloadKind::Int => Self::Int(Track::read(reader)?),
            PayloadKind::Bool => Self::Bool(Track::read(reader)?),
        })
    }
}

impl<V: Payload> From<Track<V>> for TrackData {
    fn from(track: Track<V>) -> Self {
        V::wrap_track(track)
    }
}
