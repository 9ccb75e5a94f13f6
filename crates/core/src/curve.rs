//! Keyframe curves
//!
//! Piecewise-linear animation curves with pre/post infinity. The oscillation
//! controller uses them to describe its scaffold, and scene implementations use
//! them to evaluate animated attributes.

use crate::scene::InfinityMode;

/// Frames closer than this are the same key.
const FRAME_EPSILON: f32 = 1e-5;

/// A (frame, value) sample on an animated attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
}

impl Keyframe {
    pub fn new(frame: f32, value: f32) -> Self {
        Self { frame, value }
    }
}

/// Animation curve: sorted keys plus infinity behaviour on both sides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    keys: Vec<Keyframe>,
    pre: InfinityMode,
    post: InfinityMode,
}

impl Curve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut curve = Self::new();
        for key in keys {
            curve.insert(key);
        }
        curve
    }

    /// Insert a key, replacing any key already at the same frame.
    pub fn insert(&mut self, key: Keyframe) {
        match self
            .keys
            .iter()
            .position(|k| (k.frame - key.frame).abs() < FRAME_EPSILON)
        {
            Some(i) => self.keys[i] = key,
            None => {
                let at = self.keys.partition_point(|k| k.frame < key.frame);
                self.keys.insert(at, key);
            }
        }
    }

    /// Set both pre and post infinity.
    pub fn set_infinity(&mut self, mode: InfinityMode) {
        self.pre = mode;
        self.post = mode;
    }

    pub fn pre_infinity(&self) -> InfinityMode {
        self.pre
    }

    pub fn post_infinity(&self) -> InfinityMode {
        self.post
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// First to last key distance in frames.
    pub fn span(&self) -> f32 {
        match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => last.frame - first.frame,
            _ => 0.0,
        }
    }

    /// Sample the curve. `None` for a curve without keys.
    pub fn evaluate(&self, frame: f32) -> Option<f32> {
        let first = *self.keys.first()?;
        let last = *self.keys.last()?;
        let span = last.frame - first.frame;
        if span <= FRAME_EPSILON {
            return Some(first.value);
        }

        let t = if frame < first.frame {
            match self.pre {
                InfinityMode::Constant => return Some(first.value),
                mode => wrap(frame, first.frame, span, mode),
            }
        } else if frame > last.frame {
            match self.post {
                InfinityMode::Constant => return Some(last.value),
                mode => wrap(frame, first.frame, span, mode),
            }
        } else {
            frame
        };

        Some(self.interpolate(t))
    }

    /// Linear interpolation inside the keyed range.
    fn interpolate(&self, t: f32) -> f32 {
        let next = self.keys.partition_point(|k| k.frame <= t);
        if next == 0 {
            return self.keys[0].value;
        }
        if next >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value;
        }
        let a = self.keys[next - 1];
        let b = self.keys[next];
        let alpha = (t - a.frame) / (b.frame - a.frame);
        a.value + (b.value - a.value) * alpha
    }
}

/// Map a frame outside the keyed range back into it.
fn wrap(frame: f32, first: f32, span: f32, mode: InfinityMode) -> f32 {
    match mode {
        InfinityMode::Constant => frame,
        InfinityMode::Cycle => first + (frame - first).rem_euclid(span),
        InfinityMode::Oscillate => {
            let u = (frame - first).rem_euclid(2.0 * span);
            if u <= span {
                first + u
            } else {
                first + 2.0 * span - u
            }
        }
    }
}
