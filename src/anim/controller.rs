//! Playback of an animation against one target.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::trace;

use super::animation::Animation;
use super::payload::{Payload, PayloadKind};
use super::target::{AnimationTarget, PropertySetter, Setter};
use crate::config::PlaybackConfig;
use crate::util::{Color, Error, Quat, Result, Vec2, Vec3, Vec4};

/// Playback state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Playing,
    /// Non-looping animation ran past its end; advances are ignored until
    /// [`AnimationController::restart`] or [`AnimationController::seek`].
    Finished,
}

/// One track wired to one target property.
trait TrackBinding<T>: Send + Sync {
    fn apply(&self, animation: &Animation, target: &mut T, time: f32);
}

struct Channel<T, V> {
    track: usize,
    setter: Setter<T, V>,
}

impl<T, V: Payload> TrackBinding<T> for Channel<T, V> {
    fn apply(&self, animation: &Animation, target: &mut T, time: f32) {
        let track = animation.tracks().get(self.track).and_then(|t| t.data.get::<V>());
        if let Some(track) = track {
            (self.setter)(target, track.evaluate(time));
        }
    }
}

fn channel<T: 'static, V: Payload>(
    track: usize,
    key: &str,
    setter: PropertySetter<T>,
) -> Result<Box<dyn TrackBinding<T>>> {
    let expected = setter.kind();
    match V::setter(setter) {
        Some(setter) => Ok(Box::new(Channel { track, setter })),
        None => Err(Error::PropertyTypeMismatch {
            key: key.to_string(),
            expected,
            actual: V::KIND,
        }),
    }
}

/// Drives one target through one shared animation.
pub struct AnimationController<T> {
    animation: Arc<Animation>,
    target: T,
    channels: Vec<Box<dyn TrackBinding<T>>>,
    time: f32,
    speed: f32,
    state: PlaybackState,
}

impl<T: AnimationTarget + 'static> AnimationController<T> {
    /// Resolve every track of `animation` against `target`.
    ///
    /// Fails if the animation loops with zero duration, or if any track key
    /// is missing on the target or bound to a property of another kind.
    pub fn bind(animation: Arc<Animation>, target: T) -> Result<Self> {
        if animation.is_looping() && animation.duration() <= 0.0 {
            return Err(Error::ZeroDurationLoop(animation.name().to_string()));
        }

        let mut channels = Vec::with_capacity(animation.len());
        for (i, track) in animation.tracks().iter().enumerate() {
            let setter = target
                .resolve_property(&track.key)
                .ok_or_else(|| Error::MissingProperty(track.key.clone()))?;
            let key = track.key.as_str();
            let bound = match track.data.kind() {
                PayloadKind::Float => channel::<T, f32>(i, key, setter)?,
                PayloadKind::Vec2 => channel::<T, Vec2>(i, key, setter)?,
                PayloadKind::Vec3 => channel::<T, Vec3>(i, key, setter)?,
                PayloadKind::Vec4 => channel::<T, Vec4>(i, key, setter)?,
                PayloadKind::Color => channel::<T, Color>(i, key, setter)?,
                PayloadKind::Quat => channel::<T, Quat>(i, key, setter)?,
                PayloadKind::Int => channel::<T, i32>(i, key, setter)?,
                PayloadKind::Bool => channel::<T, bool>(i, key, setter)?,
            };
            channels.push(bound);
        }

        animation.prepare();
        trace!(animation = animation.name(), channels = channels.len(), "bound controller");
        Ok(Self {
            animation,
            target,
            channels,
            time: 0.0,
            speed: 1.0,
            state: PlaybackState::Playing,
        })
    }

    /// [`bind`](Self::bind) with playback settings applied.
    pub fn bind_with(animation: Arc<Animation>, target: T, config: &PlaybackConfig) -> Result<Self> {
        let mut controller = Self::bind(animation, target)?;
        controller.set_speed(config.speed);
        Ok(controller)
    }
}

impl<T> AnimationController<T> {
    /// Step playback by `delta` seconds (scaled by speed) and apply the
    /// sampled values to the target.
    pub fn advance(&mut self, delta: f32) {
        if self.state == PlaybackState::Finished || !delta.is_finite() {
            return;
        }
        let duration = self.animation.duration();
        let mut time = self.time + delta * self.speed;
        if self.animation.is_looping() {
            if time > duration || time < 0.0 {
                time = time.rem_euclid(duration);
            }
        } else if time > duration {
            time = duration;
            self.state = PlaybackState::Finished;
        } else if time < 0.0 {
            time = 0.0;
        }
        self.apply(time);
    }

    /// Jump to `time`, apply it, and resume playing.
    pub fn seek(&mut self, time: f32) {
        let duration = self.animation.duration();
        let time = if !time.is_finite() {
            0.0
        } else if self.animation.is_looping() && (time > duration || time < 0.0) {
            time.rem_euclid(duration)
        } else {
            time.clamp(0.0, duration)
        };
        self.state = PlaybackState::Playing;
        self.apply(time);
    }

    /// Back to time zero, playing.
    pub fn restart(&mut self) {
        self.seek(0.0);
    }

    fn apply(&mut self, time: f32) {
        for channel in &self.channels {
            channel.apply(&self.animation, &mut self.target, time);
        }
        self.time = time;
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Playback rate multiplier; non-finite values are ignored.
    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.speed = speed;
        }
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == PlaybackState::Finished
    }

    #[inline]
    pub fn animation(&self) -> &Arc<Animation> {
        &self.animation
    }

    #[inline]
    pub fn target(&self) -> &T {
        &self.target
    }

    #[inline]
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }
}

impl<T: fmt::Debug> fmt::Debug for AnimationController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationController")
            .field("animation", &self.animation.name())
            .field("target", &self.target)
            .field("channels", &self.channels.len())
            .field("time", &self.time)
            .field("speed", &self.speed)
            .field("state", &self.state)
            .finish()
    }
}

/// Advance many controllers in parallel.
pub fn advance_all<T: Send>(controllers: &mut [AnimationController<T>], delta: f32) {
    controllers.par_iter_mut().for_each(|c| c.advance(delta));
}
