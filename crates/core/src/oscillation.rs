//! Oscillation controller
//!
//! Drives a moving block back and forth along x. The controller authors three
//! keys once per spawn and sets the curve to repeat; the host's timeline does
//! the rest. Nothing is re-issued per frame.
//!
//! ```text
//! x
//! +10 |        /\
//!     |       /  \
//! -10 |______/    \______ (cycle)
//!        1   P/2   P       frame
//! ```
//!
//! The keyed segment starts and ends at -10, so `Cycle` infinity repeats it
//! seamlessly.

use arrayvec::ArrayVec;
use glam::Vec3;
use tracing::debug;

use crate::block::Block;
use crate::curve::{Curve, Keyframe};
use crate::scene::{Attribute, InfinityMode, SceneAdapter, SceneError};
use crate::types::{FIRST_KEY_FRAME, OSCILLATION_X_MAX, OSCILLATION_X_MIN};

/// Infinity mode used for every oscillation.
pub const OSCILLATION_INFINITY: InfinityMode = InfinityMode::Cycle;

/// The three x keys of one oscillation.
#[derive(Debug, Clone, PartialEq)]
pub struct OscillationScaffold {
    keys: ArrayVec<Keyframe, 3>,
}

impl OscillationScaffold {
    /// Keys at frames 1, `period / 2` and `period`.
    pub fn for_period(period: u32) -> Self {
        let period = period as f32;
        let mut keys = ArrayVec::new();
        keys.push(Keyframe::new(FIRST_KEY_FRAME, OSCILLATION_X_MIN));
        keys.push(Keyframe::new(period / 2.0, OSCILLATION_X_MAX));
        keys.push(Keyframe::new(period, OSCILLATION_X_MIN));
        Self { keys }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// The scaffold as a curve, exactly as a scene evaluates it.
    pub fn curve(&self) -> Curve {
        let mut curve = Curve::with_keys(self.keys.iter().copied());
        curve.set_infinity(OSCILLATION_INFINITY);
        curve
    }

    /// x position at `frame`.
    pub fn sample(&self, frame: f32) -> f32 {
        self.curve().evaluate(frame).unwrap_or(OSCILLATION_X_MIN)
    }
}

/// Author the oscillation scaffold for a freshly materialized block.
///
/// The block keeps its y and z; only x is keyed.
pub fn start<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    block: &Block,
) -> Result<OscillationScaffold, SceneError> {
    let scaffold = OscillationScaffold::for_period(block.period);
    let (y, z) = (block.position.y, block.position.z);

    for key in scaffold.keys() {
        scene.move_to(block.node, Vec3::new(key.value, y, z))?;
        scene.record_keyframe(block.node, Attribute::TranslateX, key.frame)?;
    }
    scene.set_infinity(block.node, Attribute::TranslateX, OSCILLATION_INFINITY)?;

    debug!(index = block.index, period = block.period, "oscillation started");
    Ok(scaffold)
}

/// Delete the block's x curve; the block freezes at its current sampled x.
pub fn stop<S: SceneAdapter + ?Sized>(scene: &mut S, block: &Block) -> Result<(), SceneError> {
    scene.clear_keyframes(block.node, Attribute::TranslateX)
}

/// Put a block whose landing was abandoned back on its scaffold.
///
/// Clears whatever the landing left keyed, returns the block to its spawn
/// position, re-authors the scaffold and moves the timeline back to `frame`, so
/// x continues from where the drop was requested.
pub fn resume<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    block: &Block,
    frame: f32,
) -> Result<(), SceneError> {
    scene.clear_keyframes(block.node, Attribute::TranslateX)?;
    scene.clear_keyframes(block.node, Attribute::TranslateY)?;
    scene.move_to(block.node, block.position)?;
    start(scene, block)?;
    scene.set_timeline_position(frame);
    debug!(index = block.index, frame, "oscillation resumed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_keys_follow_period() {
        let s = OscillationScaffold::for_period(90);
        let frames: Vec<f32> = s.keys().iter().map(|k| k.frame).collect();
        let values: Vec<f32> = s.keys().iter().map(|k| k.value).collect();
        assert_eq!(frames, vec![1.0, 45.0, 90.0]);
        assert_eq!(values, vec![-10.0, 10.0, -10.0]);
    }

    #[test]
    fn sample_hits_turning_points() {
        let s = OscillationScaffold::for_period(180);
        assert_eq!(s.sample(1.0), -10.0);
        assert_eq!(s.sample(90.0), 10.0);
        assert_eq!(s.sample(180.0), -10.0);
    }

    #[test]
    fn sample_repeats_after_the_keyed_range() {
        let s = OscillationScaffold::for_period(40);
        let span = 40.0 - 1.0;
        for frame in [3.0, 12.5, 20.0, 33.0] {
            let a = s.sample(frame);
            let b = s.sample(frame + span);
            let c = s.sample(frame + 5.0 * span);
            assert!((a - b).abs() < 1e-3, "{a} vs {b} at {frame}");
            assert!((a - c).abs() < 1e-3, "{a} vs {c} at {frame}");
        }
    }

    #[test]
    fn sample_stays_between_turning_points() {
        let s = OscillationScaffold::for_period(90);
        let mut frame = -200.0;
        while frame < 2000.0 {
            let x = s.sample(frame);
            assert!((OSCILLATION_X_MIN..=OSCILLATION_X_MAX).contains(&x));
            frame += 3.7;
        }
    }

    #[test]
    fn curve_uses_cycle_infinity() {
        let c = OscillationScaffold::for_period(90).curve();
        assert_eq!(c.pre_infinity(), InfinityMode::Cycle);
        assert_eq!(c.post_infinity(), InfinityMode::Cycle);
    }
}
