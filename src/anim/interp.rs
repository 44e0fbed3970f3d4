//! Interpolation modes and the cubic Hermite basis.

use std::fmt;

use crate::util::{Error, Result};

/// How a track fills the time between keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Interpolation {
    /// Hold the previous key's value (step).
    None = 0,
    /// Component-wise linear blend.
    #[default]
    Linear = 1,
    /// Catmull-Rom style cubic through every key.
    Spline = 2,
}

impl Interpolation {
    pub const ALL: [Self; 3] = [Self::None, Self::Linear, Self::Spline];

    /// Tag byte used on disk.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a tag byte.
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::None),
            1 => Ok(Self::Linear),
            2 => Ok(Self::Spline),
            _ => Err(Error::UnknownInterpolation(v)),
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Linear => "linear",
            Self::Spline => "spline",
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of interpolation modes a payload kind supports.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterpolationSet(u8);

impl InterpolationSet {
    /// Step only (booleans and other non-numeric payloads).
    pub const STEP: Self = Self(Interpolation::None.bit());
    /// Step and linear.
    pub const LINEAR: Self = Self(Interpolation::None.bit() | Interpolation::Linear.bit());
    /// Every mode.
    pub const ALL: Self =
        Self(Interpolation::None.bit() | Interpolation::Linear.bit() | Interpolation::Spline.bit());

    #[inline]
    pub const fn contains(self, mode: Interpolation) -> bool {
        self.0 & mode.bit() != 0
    }

    /// Modes in the set, in tag order.
    pub fn iter(self) -> impl Iterator<Item = Interpolation> {
        Interpolation::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl fmt::Debug for InterpolationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Cubic Hermite basis weights `(h00, h10, h01, h11)` at `t` in `[0, 1]`.
#[inline]
pub fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
