//! Keyframe payload kinds and their codecs.
//!
//! Every value a track can hold implements [`Payload`]: a fixed-size
//! little-endian encoding plus the blend operations the interpolators need.
//! The set of kinds is closed; [`PayloadKind`] is the on-disk tag.

use std::fmt;
use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::data::TrackData;
use super::interp::{hermite_basis, lerp_f32, InterpolationSet};
use super::target::{PropertySetter, Setter};
use super::track::Track;
use crate::util::{Color, Error, Quat, Result, Vec2, Vec3, Vec4};

/// Largest encoded payload, in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 16;

/// Payload kind tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PayloadKind {
    Float = 0,
    Vec2 = 1,
    Vec3 = 2,
    Vec4 = 3,
    Color = 4,
    Quat = 5,
    Int = 6,
    Bool = 7,
}

impl PayloadKind {
    pub const ALL: [Self; 8] = [
        Self::Float,
        Self::Vec2,
        Self::Vec3,
        Self::Vec4,
        Self::Color,
        Self::Quat,
        Self::Int,
        Self::Bool,
    ];

    /// Tag byte used on disk.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a tag byte.
    pub fn from_u8(v: u8) -> Result<Self> {
        Self::ALL
            .get(v as usize)
            .copied()
            .ok_or(Error::UnknownPayloadKind(v))
    }

    /// Encoded size of one value.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Color => 16,
            Self::Quat => 16,
            Self::Int => 4,
            Self::Bool => 1,
        }
    }

    /// Interpolation modes tracks of this kind accept.
    pub const fn supported_interpolation(self) -> InterpolationSet {
        match self {
            Self::Bool => InterpolationSet::STEP,
            Self::Int => InterpolationSet::LINEAR,
            _ => InterpolationSet::ALL,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Color => "color",
            Self::Quat => "quat",
            Self::Int => "int",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A payload value of any kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Color(Color),
    Quat(Quat),
    Int(i32),
    Bool(bool),
}

impl Value {
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

    /// Typed view of this value.
    #[inline]
    pub fn get<V: Payload>(self) -> Option<V> {
        V::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{}", v),
            Self::Vec2(v) => write!(f, "({}, {})", v.x, v.y),
            Self::Vec3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Self::Vec4(v) => write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w),
            Self::Color(c) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Self::Quat(q) => write!(f, "quat({}, {}, {}, {})", q.x, q.y, q.z, q.w),
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Codec and blend contract for keyframe values.
///
/// `slope` and `hermite` are only reached for kinds whose
/// [`INTERPOLATION`](Self::INTERPOLATION) includes spline mode.
pub trait Payload: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: PayloadKind;
    const BYTE_SIZE: usize = Self::KIND.byte_size();
    const INTERPOLATION: InterpolationSet = Self::KIND.supported_interpolation();

    /// Spline tangent, in value units per second.
    type Tangent: Copy + Default + fmt::Debug + Send + Sync + 'static;

    /// Write exactly `BYTE_SIZE` bytes.
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()>;

    /// Decode from exactly `BYTE_SIZE` bytes.
    fn decode(bytes: &[u8]) -> io::Result<Self>;

    /// Blend from `a` (t = 0) to `b` (t = 1).
    fn lerp(a: Self, b: Self, t: f32) -> Self;

    /// Rate of change from `a` to `b` over `dt` seconds.
    fn slope(a: Self, b: Self, dt: f32) -> Self::Tangent;

    /// Evaluate a Hermite segment of length `h` seconds at local `t`.
    fn hermite(p0: Self, m0: Self::Tangent, p1: Self, m1: Self::Tangent, h: f32, t: f32) -> Self;

    /// Representation of `value` closest to `reference`, for spline fitting.
    #[inline]
    fn align(_reference: Self, value: Self) -> Self {
        value
    }

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;

    /// Typed track inside a [`TrackData`] of this kind.
    fn track_ref(data: &TrackData) -> Option<&Track<Self>>;

    /// Wrap a typed track.
    fn wrap_track(track: Track<Self>) -> TrackData;

    /// Typed setter inside a [`PropertySetter`] of this kind.
    fn setter<T: 'static>(setter: PropertySetter<T>) -> Option<Setter<T, Self>>;
}

macro_rules! float_like_payload {
    ($ty:ty, $kind:ident) => {
        impl Payload for $ty {
            const KIND: PayloadKind = PayloadKind::$kind;
            type Tangent = $ty;

            fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
                for c in self.to_array() {
                    w.write_f32::<LittleEndian>(c)?;
                }
                Ok(())
            }

            fn decode(mut bytes: &[u8]) -> io::Result<Self> {
                let mut c = [0.0f32; { PayloadKind::$kind.byte_size() / 4 }];
                for v in c.iter_mut() {
                    *v = bytes.read_f32::<LittleEndian>()?;
                }
                Ok(<$ty>::from_array(c))
            }

            #[inline]
            fn lerp(a: Self, b: Self, t: f32) -> Self {
                a + (b - a) * t
            }

            #[inline]
            fn slope(a: Self, b: Self, dt: f32) -> Self {
                (b - a) / dt
            }

            #[inline]
            fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, h: f32, t: f32) -> Self {
                let (h00, h10, h01, h11) = hermite_basis(t);
                p0 * h00 + m0 * (h10 * h) + p1 * h01 + m1 * (h11 * h)
            }

            fn into_value(self) -> Value {
                Value::$kind(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$kind(v) => Some(v),
                    _ => None,
                }
            }

            fn track_ref(data: &TrackData) -> Option<&Track<Self>> {
                match data {
                    TrackData::$kind(t) => Some(t),
                    _ => None,
                }
            }

            fn wrap_track(track: Track<Self>) -> TrackData {
                TrackData::$kind(track)
            }

            fn setter<T: 'static>(setter: PropertySetter<T>) -> Option<Setter<T, Self>> {
                match setter {
                    PropertySetter::$kind(f) => Some(f),
                    _ => None,
                }
            }
        }
    };
}

float_like_payload!(Vec2, Vec2);
float_like_payload!(Vec3, Vec3);
float_like_payload!(Vec4, Vec4);

impl Payload for f32 {
    const KIND: PayloadKind = PayloadKind::Float;
    type Tangent = f32;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_f32::<LittleEndian>(*self)
    }

    fn decode(mut bytes: &[u8]) -> io::Result<Self> {
        bytes.read_f32::<LittleEndian>()
    }

    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        lerp_f32(a, b, t)
    }

    #[inline]
    fn slope(a: Self, b: Self, dt: f32) -> Self {
        (b - a) / dt
    }

    #[inline]
    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, h: f32, t: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        p0 * h00 + m0 * (h10 * h) + p1 * h01 + m1 * (h11 * h)
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    fn track_ref(data: &TrackData) -> Option<&Track<Self>> {
        match data {
            TrackData::Float(t) => Some(t),
            _ => None,
        }
    }

    fn wrap_track(track: Track<Self>) -> TrackData {
        TrackData::Float(track)
    }

    fn setter<T: 'static>(setter: PropertySetter<T>) -> Option<Setter<T, Self>> {
        match setter {
            PropertySetter::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl Payload for Color {
    const KIND: PayloadKind = PayloadKind::Color;
    type Tangent = Vec4;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for c in self.to_array() {
            w.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }

    fn decode(mut bytes: &[u8]) -> io::Result<Self> {
        let r = bytes.read_f32::<LittleEndian>()?;
        let g = bytes.read_f32::<LittleEndian>()?;
        let b = bytes.read_f32::<LittleEndian>()?;
        let a = bytes.read_f32::<LittleEndian>()?;
        Ok(Color::new(r, g, b, a))
    }

    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        Color::from_vec4(Vec4::lerp(a.to_vec4(), b.to_vec4(), t))
    }

    #[inline]
    fn slope(a: Self, b: Self, dt: f32) -> Vec4 {
        (b.to_vec4() - a.to_vec4()) / dt
    }

    #[inline]
    fn hermite(p0: Self, m0: Vec4, p1: Self, m1: Vec4, h: f32, t: f32) -> Self {
        Color::from_vec4(<Vec4 as Payload>::hermite(p0.to_vec4(), m0, p1.to_vec4(), m1, h, t))
    }

    fn into_value(self) -> Value {
        Value::Color(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Color(v) => Some(v),
            _ => None,
        }
    }

    fn track_ref(data: &TrackData) -> Option<&Track<Self>> {
        match data {
            TrackData::Color(t) => Some(t),
            _ => None,
        }
    }

    fn wrap_track(track: Track<Self>) -> TrackData {
        TrackData::Color(track)
    }

    fn setter<T: 'static>(setter: PropertySetter<T>) -> Option<Setter<T, Self>> {
        match setter {
            PropertySetter::Color(f) => Some(f),
            _ => None,
        }
    }
}

impl Payload for Quat {
    const KIND: PayloadKind = PayloadKind::Quat;
    type Tangent = Vec4;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for c in self.to_array() {
            w.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }

    fn decode(mut bytes: &[u8]) -> io::Result<Self> {
        let x = bytes.read_f32::<LittleEndian>()?;
        let y = bytes.read_f32::<LittleEndian>()?;
        let z = bytes.read_f32::<LittleEndian>()?;
        let w = bytes.read_f32::<LittleEndian>()?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    /// Shortest-arc normalized lerp.
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        let b = Self::align(a, b);
        Quat::from_vec4(Vec4::lerp(Vec4::from(a), Vec4::from(b), t)).normalize()
    }

    #[inline]
    fn slope(a: Self, b: Self, dt: f32) -> Vec4 {
        (Vec4::from(b) - Vec4::from(a)) / dt
    }

    #[inline]
    fn hermite(p0: Self, m0: Vec4, p1: Self, m1: Vec4, h: f32, t: f32) -> Self {
        Quat::from_vec4(<Vec4 as Payload>::hermite(Vec4::from(p0), m0, Vec4::from(p1), m1, h, t)).normalize()
    }

    #[inline]
    fn align(reference: Self, value: Self) -> Self {
        if reference.dot(value) < 0.0 {
            -value
        } else {
            value
        }
    }

    fn into_value(self) -> Value {
        Value::Quat(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Quat(v) => Some(v),
            _ => None,
        }
    }

    fn track_ref(data: &TrackData) -> Option<&Track<Self>> {
        match data {
            TrackData::Quat(t) => Some(t),
            _ => None,
        }
    }

    fn wrap_track(track: Track<Self>) -> TrackData {
        TrackData::Quat(track)
    }

    fn setter<T: 'static>(setter: PropertySetter<T>) -> Option<Setter<T, Self>> {
        match setter {
            PropertySetter::Quat(f) => Some(f),
            _ => None,
        }
    }
}

impl Payload for i32 {
    const KIND: PayloadKind = PayloadKind::Int;
    type Tangent = f64;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i32::<LittleEndian>(*self)
    }

    fn decode(mut bytes: &[u8]) -> io::Result<Self> {
        bytes.read_i32::<LittleEndian>()
    }

    /// Linear blend rounded to the nearest integer.
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        let (a, b) = (a as f64, b as f64);
        (a + (b - a) * t as f64).round() as i32
    }

    #[inline]
    fn slope(a: Self, b: Self, dt: f32) -> f64 {
        (b as f64 - a as f64) / dt as f64
    }

    #[inline]
    fn hermite(p0: Self, m0: f64, p1: Self, m1: f64, h: f32, t: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        let h = h as f64;
        let v = p0 as f64 * h00 as f64
            + m0 * h10 as f64 * h
            + p1 as f64 * h01 as f64
            + m1 * h11 as f64 * h;
        v.round() as i32
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    fn track_ref(data: &TrackData) -> Option<&Track<Self>> {
        match data {
            TrackData::Int(t) => Some(t),
            _ => None,
        }
    }

    fn wrap_track(track: Track<Self>) -> TrackData {
        TrackData::Int(track)
    }

    fn setter<T: 'static>(setter: PropertySetter<T>) -> Option<Setter<T, Self>> {
        match setter {
            PropertySetter::Int(f) => Some(f),
            _ => None,
        }
    }
}

/// Booleans only step; the blend operations hold `a` until `t` reaches 1.
impl Payload for bool {
    const KIND: PayloadKind = PayloadKind::Bool;
    type Tangent = ();

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(u8::from(*self))
    }

    fn decode(mut bytes: &[u8]) -> io::Result<Self> {
        Ok(bytes.read_u8()? != 0)
    }

    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        if t >= 1.0 {
            b
        } else {
            a
        }
    }

    #[inline]
    fn slope(_a: Self, _b: Self, _dt: f32) -> Self::Tangent {}

    #[inline]
    fn hermite(p0: Self, _m0: (), p1: Self, _m1: (), _h: f32, t: f32) -> Self {
        Self::lerp(p0, p1, t)
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    fn track_ref(data: &TrackData) -> Option<&Track<Self>> {
        match data {
            TrackData::Bool(t) => Some(t),
            _ => None,
        }
    }

    fn wrap_track(track: Track<Self>) -> TrackData {
        TrackData::Bool(track)
    }

    fn setter<T: 'static>(setter: PropertySetter<T>) -> Option<Setter<T, Self>> {
        match setter {
            PropertySetter::Bool(f) => Some(f),
            _ => None,
        }
    }
}

/// Encode a value into a fresh buffer.
pub fn encode_to_vec<V: Payload>(value: &V) -> Vec<u8> {
    let mut buf = Vec::with_capacity(V::BYTE_SIZE);
    // Writing to a Vec cannot fail.
    let _ = value.encode(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<V: Payload>(v: V) -> V {
        let buf = encode_to_vec(&v);
        assert_eq!(buf.len(), V::BYTE_SIZE);
        V::decode(&buf).unwrap()
    }

    #[test]
    fn test_byte_sizes_fit() {
        for kind in PayloadKind::ALL {
            assert!(kind.byte_size() <= MAX_PAYLOAD_SIZE);
            assert_eq!(PayloadKind::from_u8(kind.to_u8()).unwrap(), kind);
        }
        assert!(matches!(PayloadKind::from_u8(8), Err(Error::UnknownPayloadKind(8))));
    }

    #[test]
    fn test_codecs() {
        assert_eq!(roundtrip(2.5f32), 2.5);
        assert_eq!(roundtrip(Vec3::new(1.0, -2.0, 3.5)), Vec3::new(1.0, -2.0, 3.5));
        assert_eq!(roundtrip(Color::rgb(0.1, 0.2, 0.3)), Color::rgb(0.1, 0.2, 0.3));
        assert_eq!(roundtrip(-7i32), -7);
        assert!(roundtrip(true));
        let q = Quat::from_rotation_y(0.7);
        assert_eq!(roundtrip(q), q);
    }

    #[test]
    fn test_float_encoding_is_little_endian() {
        assert_eq!(encode_to_vec(&1.0f32), 1.0f32.to_le_bytes().to_vec());
        assert_eq!(encode_to_vec(&Vec2::new(1.0, 2.0))[4..], 2.0f32.to_le_bytes());
    }

    #[test]
    fn test_lerp() {
        assert_eq!(<f32 as Payload>::lerp(0.0, 10.0, 0.25), 2.5);
        assert_eq!(<i32 as Payload>::lerp(0, 3, 0.5), 2);
        assert!(!<bool as Payload>::lerp(false, true, 0.99));
        let v = <Vec2 as Payload>::lerp(Vec2::ZERO, Vec2::new(2.0, 4.0), 0.5);
        assert_eq!(v, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_quat_lerp_shortest_arc() {
        let a = Quat::IDENTITY;
        let b = -Quat::from_rotation_z(0.2);
        let mid = <Quat as Payload>::lerp(a, b, 0.5);
        assert!(mid.is_normalized());
        assert!(mid.angle_between(Quat::from_rotation_z(0.1)) < 1e-4);
    }

    #[test]
    fn test_value_conversion() {
        let v = Vec3::new(1.0, 2.0, 3.0).into_value();
        assert_eq!(v.kind(), PayloadKind::Vec3);
        assert_eq!(v.get::<Vec3>(), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(v.get::<f32>(), None);
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_supported_interpolation() {
        use crate::anim::Interpolation;
        assert!(!bool::INTERPOLATION.contains(Interpolation::Linear));
        assert!(!i32::INTERPOLATION.contains(Interpolation::Spline));
        assert!(Quat::INTERPOLATION.contains(Interpolation::Spline));
    }
}
