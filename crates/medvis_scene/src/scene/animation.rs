//! Keyframe animation playback
//!
//! An [`Animation`] is a small state machine (stopped / playing) over a
//! sorted keyframe track. `SceneGraph::update` advances every playing
//! animation and applies the sampled value to its target.
//!
//! Interpolation between the bracketing pair `[k_i, k_i+1]` uses the mode
//! declared on the right keyframe `k_i+1`:
//! - `Step` holds `k_i`
//! - `Linear` lerps scalars/vectors component-wise and slerps rotations
//! - `Cubic` runs a uniform Catmull-Rom spline through the neighbouring
//!   keyframes for scalars/vectors, and a smoothstep-eased slerp for rotations
//!
//! Booleans and mismatched value kinds always step.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Quat, Vec3};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Not advancing
    Stopped,
    /// Advancing on every update
    Playing,
}

/// Interpolation mode into a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Hold the previous value
    Step,
    /// Straight-line interpolation
    #[default]
    Linear,
    /// Catmull-Rom spline (eased slerp for rotations)
    Cubic,
}

/// Value stored in a keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyframeValue {
    /// Single float (uniforms such as opacity or window level)
    Scalar(f32),
    /// 3-vector (position, scale, colour)
    Vector(Vec3),
    /// Rotation
    Rotation(Quat),
    /// On/off value (visibility)
    Flag(bool),
}

impl KeyframeValue {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(utils::lerp(*a, *b, t)),
            (Self::Vector(a), Self::Vector(b)) => Self::Vector(a.lerp(b, t)),
            (Self::Rotation(a), Self::Rotation(b)) => Self::Rotation(slerp(a, b, t)),
            _ => self.clone(),
        }
    }

    fn catmull_rom(p0: &Self, p1: &Self, p2: &Self, p3: &Self, t: f32) -> Self {
        match (p0, p1, p2, p3) {
            (Self::Scalar(a), Self::Scalar(b), Self::Scalar(c), Self::Scalar(d)) => {
                Self::Scalar(utils::catmull_rom(*a, *b, *c, *d, t))
            }
            (Self::Vector(a), Self::Vector(b), Self::Vector(c), Self::Vector(d)) => {
                Self::Vector(Vec3::from_fn(|i, _| utils::catmull_rom(a[i], b[i], c[i], d[i], t)))
            }
            (_, Self::Rotation(b), Self::Rotation(c), _) => {
                Self::Rotation(slerp(b, c, utils::smoothstep(t)))
            }
            _ => p1.lerp(p2, t),
        }
    }
}

fn slerp(a: &Quat, b: &Quat, t: f32) -> Quat {
    // try_slerp refuses antipodal inputs; those describe the same rotation
    a.try_slerp(b, t, 1.0e-6)
        .unwrap_or_else(|| if t < 0.5 { *a } else { *b })
}

/// A value at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in seconds from the start of the animation
    pub time: f32,
    /// Value at `time`
    pub value: KeyframeValue,
    /// How to interpolate from the previous keyframe into this one
    pub interpolation: Interpolation,
}

impl Keyframe {
    /// Create a linearly interpolated keyframe
    pub fn new(time: f32, value: KeyframeValue) -> Self {
        Self {
            time,
            value,
            interpolation: Interpolation::Linear,
        }
    }

    /// Builder pattern: Set interpolation mode
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// Transform channel driven by an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformProperty {
    /// Overwrites position
    Position,
    /// Overwrites rotation
    Rotation,
    /// Overwrites scale
    Scale,
}

/// What an animation writes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationTarget {
    /// Overwrite a transform channel
    Transform(TransformProperty),
    /// Merge into the named material uniform
    Material {
        /// Uniform name
        uniform: String,
    },
    /// Overwrite `render_state.visible`
    Visibility,
}

/// Keyframe track with playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    /// Name used by `SceneGraph::play_animation` / `stop_animation`
    pub name: String,
    /// Channel written on every update
    pub target: AnimationTarget,
    /// Total length in seconds
    pub duration: f32,
    /// Playback rate multiplier
    pub speed: f32,
    /// Wrap around instead of stopping at `duration`
    pub looping: bool,
    keyframes: Vec<Keyframe>,
    current_time: f32,
    state: PlaybackState,
}

impl Animation {
    /// Create a stopped, non-looping animation at speed 1
    pub fn new(name: impl Into<String>, target: AnimationTarget, duration: f32) -> Self {
        Self {
            name: name.into(),
            target,
            duration,
            speed: 1.0,
            looping: false,
            keyframes: Vec::new(),
            current_time: 0.0,
            state: PlaybackState::Stopped,
        }
    }

    /// Builder pattern: Add a keyframe
    pub fn with_keyframe(mut self, keyframe: Keyframe) -> Self {
        self.add_keyframe(keyframe);
        self
    }

    /// Builder pattern: Enable looping
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Builder pattern: Set speed
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Insert a keyframe keeping the track sorted by time
    pub fn add_keyframe(&mut self, keyframe: Keyframe) {
        let index = self.keyframes.partition_point(|k| k.time <= keyframe.time);
        self.keyframes.insert(index, keyframe);
    }

    /// Keyframes sorted by time
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Playback position in seconds
    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the animation is playing
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Restart from time zero
    pub fn play(&mut self) {
        self.current_time = 0.0;
        self.state = PlaybackState::Playing;
    }

    /// Stop without resetting time
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    /// Continue from the current time
    pub fn resume(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Advance playback by `delta_time * speed`
    ///
    /// Returns `true` if the animation was playing, i.e. its value should be
    /// applied this frame. A non-looping animation that reaches the end
    /// clamps to `duration`, stops, and still reports `true` once.
    pub fn advance(&mut self, delta_time: f32) -> bool {
        if !self.is_playing() {
            return false;
        }

        let step = delta_time * self.speed;
        if !step.is_finite() {
            log::warn!("Animation '{}': ignoring non-finite time step {}", self.name, step);
            return false;
        }

        self.current_time += step;
        let finished = self.current_time >= self.duration || self.current_time < 0.0;
        if finished {
            if self.looping && self.duration > 0.0 {
                self.current_time = self.current_time.rem_euclid(self.duration);
            } else {
                self.current_time = self.current_time.clamp(0.0, self.duration.max(0.0));
                self.state = PlaybackState::Stopped;
            }
        }
        true
    }

    /// Value at the current playback time
    pub fn sample(&self) -> Option<KeyframeValue> {
        self.sample_at(self.current_time)
    }

    /// Value at an arbitrary time; `None` when the track is empty
    ///
    /// A NaN time samples the first keyframe.
    pub fn sample_at(&self, time: f32) -> Option<KeyframeValue> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        if time.is_nan() || time <= first.time {
            return Some(first.value.clone());
        }
        if time >= last.time {
            return Some(last.value.clone());
        }

        // keyframes[left].time <= time < keyframes[left + 1].time
        let left = self.keyframes.partition_point(|k| k.time <= time) - 1;
        let (from, to) = (&self.keyframes[left], &self.keyframes[left + 1]);
        let t = (time - from.time) / (to.time - from.time);

        let value = match to.interpolation {
            Interpolation::Step => from.value.clone(),
            Interpolation::Linear => from.value.lerp(&to.value, t),
            Interpolation::Cubic => {
                let before = &self.keyframes[left.saturating_sub(1)].value;
                let after = &self.keyframes[(left + 2).min(self.keyframes.len() - 1)].value;
                KeyframeValue::catmull_rom(before, &from.value, &to.value, after, t)
            }
        };
        Some(value)
    }
}
