//! Keyframe animation engine.
//!
//! ```text
//! Animation ── name, duration, loop
//!   └─ AnimationTrack { key, TrackData }
//!        └─ Track<V: Payload> ── Interpolation, [Keyframe<V>], spline cache
//!
//! AnimationController<T> ── Arc<Animation> + target T + bound setters
//! ```
//!
//! Tracks are generic over a closed set of payload kinds (see [`Payload`]).
//! Animations are authored through `&mut` and then shared read-only; any
//! number of controllers can play the same animation concurrently.

mod animation;
mod controller;
mod data;
mod interp;
pub mod io;
mod keyframe;
mod payload;
mod spline;
mod target;
mod track;

pub use animation::{Animation, AnimationTrack};
pub use controller::{advance_all, AnimationController, PlaybackState};
pub use data::TrackData;
pub use interp::{hermite_basis, Interpolation, InterpolationSet};
pub use keyframe::Keyframe;
pub use payload::{encode_to_vec, Payload, PayloadKind, Value, MAX_PAYLOAD_SIZE};
pub use spline::SplineData;
pub use target::{AnimationTarget, PropertySetter, Setter};
pub use track::Track;
