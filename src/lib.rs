//! # chunkanim
//!
//! A chunked binary container format and a keyframe animation engine that
//! persists through it.
//!
//! ## Modules
//!
//! - [`util`] - Errors and math types
//! - [`chunk`] - Container format: chunk ids, index, writer and reader
//! - [`anim`] - Tracks, animations, target binding and playback
//! - [`config`] - JSON settings for reading, writing and playback
//!
//! ## Example
//!
//! ```no_run
//! use chunkanim::prelude::*;
//!
//! # fn main() -> chunkanim::Result<()> {
//! let height = Track::<f32>::with_keys(Interpolation::Linear, [(0.0, 0.0), (1.0, 10.0), (2.0, 0.0)])?;
//! let bounce = Animation::new("bounce", 2.0)?.with_track("height", height)?;
//! save_animations("bounce.chnk", &[bounce])?;
//!
//! let loaded = load_animations("bounce.chnk")?;
//! assert_eq!(loaded[0].evaluate(0.5)[0].1, Value::Float(5.0));
//! # Ok(())
//! # }
//! ```

pub mod anim;
pub mod chunk;
pub mod config;
pub mod util;

pub use util::{Error, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::anim::io::{load_animations, read_animation, save_animations, write_animations};
    pub use crate::anim::{
        advance_all, Animation, AnimationController, AnimationTarget, Interpolation, Payload,
        PayloadKind, PropertySetter, Track, TrackData, Value,
    };
    pub use crate::chunk::{chunk_id, ChunkId, ChunkReader, ChunkWriter};
    pub use crate::config::Settings;
    pub use crate::util::{Color, Error, ErrorKind, Quat, Result, Vec2, Vec3, Vec4};
}
