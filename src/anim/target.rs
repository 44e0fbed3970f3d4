//! Binding animated values to target objects.
//!
//! Targets expose their animatable properties by key. Each key resolves, once
//! at bind time, to a typed setter closure; playback calls only the closures.

use std::fmt;

use super::payload::PayloadKind;
use crate::util::{Color, Quat, Vec2, Vec3, Vec4};

/// Setter writing a `V` into a `T`.
pub type Setter<T, V> = Box<dyn Fn(&mut T, V) + Send + Sync>;

/// A typed property setter on `T`.
pub enum PropertySetter<T> {
    Float(Setter<T, f32>),
    Vec2(Setter<T, Vec2>),
    Vec3(Setter<T, Vec3>),
    Vec4(Setter<T, Vec4>),
    Color(Setter<T, Color>),
    Quat(Setter<T, Quat>),
    Int(Setter<T, i32>),
    Bool(Setter<T, bool>),
}

impl<T> PropertySetter<T> {
    pub fn float(f: impl Fn(&mut T, f32) + Send + Sync + 'static) -> Self {
        Self::Float(Box::new(f))
    }

    pub fn vec2(f: impl Fn(&mut T, Vec2) + Send + Sync + 'static) -> Self {
        Self::Vec2(Box::new(f))
    }

    pub fn vec3(f: impl Fn(&mut T, Vec3) + Send + Sync + 'static) -> Self {
        Self::Vec3(Box::new(f))
    }

    pub fn vec4(f: impl Fn(&mut T, Vec4) + Send + Sync + 'static) -> Self {
        Self::Vec4(Box::new(f))
    }

    pub fn color(f: impl Fn(&mut T, Color) + Send + Sync + 'static) -> Self {
        Self::Color(Box::new(f))
    }

    pub fn quat(f: impl Fn(&mut T, Quat) + Send + Sync + 'static) -> Self {
        Self::Quat(Box::new(f))
    }

    pub fn int(f: impl Fn(&mut T, i32) + Send + Sync + 'static) -> Self {
        Self::Int(Box::new(f))
    }

    pub fn bool(f: impl Fn(&mut T, bool) + Send + Sync + 'static) -> Self {
        Self::Bool(Box::new(f))
    }

    /// Payload kind the setter accepts.
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
}

impl<T> fmt::Debug for PropertySetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertySetter<{}>", self.kind())
    }
}

/// An object whose properties animations can drive.
pub trait AnimationTarget: Sized {
    /// Setter for the property named `key`, or `None` if there is none.
    fn resolve_property(&self, key: &str) -> Option<PropertySetter<Self>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Light {
        intensity: f32,
        tint: Color,
    }

    impl AnimationTarget for Light {
        fn resolve_property(&self, key: &str) -> Option<PropertySetter<Self>> {
            match key {
                "intensity" => Some(PropertySetter::float(|l: &mut Light, v| l.intensity = v)),
                "tint" => Some(PropertySetter::color(|l: &mut Light, v| l.tint = v)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_resolve() {
        let mut light = Light::default();
        let setter = light.resolve_property("intensity").unwrap();
        assert_eq!(setter.kind(), PayloadKind::Float);
        if let PropertySetter::Float(f) = setter {
            f(&mut light, 2.5);
        }
        assert_eq!(light.intensity, 2.5);
        assert_eq!(light.resolve_property("tint").unwrap().kind(), PayloadKind::Color);
        assert!(light.resolve_property("range").is_none());
        assert_eq!(light.tint, Color::BLACK);
    }
}
