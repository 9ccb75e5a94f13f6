//! Drop & landing resolver
//!
//! Converts a moving block into a landed one:
//!
//! 1. stop the oscillation so x freezes at its sampled value
//! 2. read the current world position
//! 3. find the supporting surface (base top, or top of the highest placed block)
//! 4. `target_y = support + height / 2`
//! 5. author a short y tween from the current height to `target_y`
//! 6. move the timeline to the tween's end, clear the x and y curves, and snap
//!    to `(x, target_y, z)`
//!
//! The tween is presentation only: the final resting position is exactly
//! `support + height / 2` regardless of the frames in between.

use glam::Vec3;
use tracing::{debug, warn};

use crate::block::Block;
use crate::collision::Aabb;
use crate::oscillation;
use crate::scene::{Attribute, SceneAdapter, SceneError};
use crate::types::{BASE_NAME, LANDING_TWEEN_FRAMES};

/// Height origin for the first block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundReference {
    pub y: f32,
    /// True when the base lookup failed and the fallback constant was used.
    pub fallback: bool,
}

impl GroundReference {
    /// Top surface of the base platform, or `fallback_y` when the base is missing.
    pub fn lookup<S: SceneAdapter + ?Sized>(scene: &S, fallback_y: f32) -> Self {
        let found = scene
            .find_node(BASE_NAME)
            .ok_or_else(|| SceneError::QueryFailed(format!("{BASE_NAME} not found")))
            .and_then(|node| scene.query_world_aabb(node));

        match found {
            Ok(aabb) => Self {
                y: aabb.top(),
                fallback: false,
            },
            Err(e) => {
                warn!(error = %e, fallback_y, "base reference missing, using fallback ground");
                Self {
                    y: fallback_y,
                    fallback: true,
                }
            }
        }
    }
}

/// Highest placed top surface, `None` for an empty stack.
pub fn stack_top(placed: &[Aabb]) -> Option<f32> {
    placed.iter().map(Aabb::top).reduce(f32::max)
}

/// Resting centre height of a block of `height` on `support`.
pub fn landing_height(support: f32, height: f32) -> f32 {
    support + height / 2.0
}

/// Result of a resolved drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landing {
    /// Final resting centre.
    pub position: Vec3,
    /// Surface the block rests on.
    pub support_y: f32,
    pub start_frame: f32,
    pub end_frame: f32,
}

/// Land `block` on `support_y`.
///
/// Re-running this on a block that already landed on the same support yields the
/// same position, which makes a failed drop safe to retry.
pub fn land<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    block: &Block,
    support_y: f32,
) -> Result<Landing, SceneError> {
    oscillation::stop(scene, block)?;
    let current = scene.world_position(block.node)?;

    let target_y = landing_height(support_y, block.size.y);
    let target = Vec3::new(current.x, target_y, current.z);

    let start_frame = scene.timeline_position();
    let end_frame = start_frame + LANDING_TWEEN_FRAMES;

    scene.record_keyframe(block.node, Attribute::TranslateY, start_frame)?;
    scene.move_to(block.node, target)?;
    scene.record_keyframe(block.node, Attribute::TranslateY, end_frame)?;
    scene.set_timeline_position(end_frame);

    scene.clear_keyframes(block.node, Attribute::TranslateY)?;
    scene.clear_keyframes(block.node, Attribute::TranslateX)?;
    scene.move_to(block.node, target)?;

    debug!(
        index = block.index,
        x = target.x,
        y = target_y,
        support_y,
        end_frame,
        "block landed"
    );

    Ok(Landing {
        position: target,
        support_y,
        start_frame,
        end_frame,
    })
}
