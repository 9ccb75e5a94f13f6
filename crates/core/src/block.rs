//! Block entity model
//!
//! A block is sampled once at spawn ([`spawn_parameters`]) and then materialized
//! in the scene ([`Block::materialize`]). Geometry never changes afterwards;
//! only the position and lifecycle state do.

use glam::Vec3;
use tracing::{debug, warn};

use crate::rng::SimpleRng;
use crate::scene::{NodeHandle, SceneAdapter, SceneError};
use crate::types::{
    BlockState, Difficulty, BLOCK_HEIGHT_RANGE, OSCILLATION_X_MIN, SPAWN_BASE_Y, SPAWN_STEP_Y,
};

/// Sampled parameters of a block about to spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnParams {
    /// Sequence index within the session (0-based).
    pub index: u32,
    /// Width (x), height (y), depth (z).
    pub size: Vec3,
    pub color: [f32; 3],
    /// Spawn centre: left turning point of the oscillation at the index's height.
    pub start: Vec3,
    pub difficulty: Difficulty,
    /// Oscillation period in frames, fixed for the block's whole life.
    pub period: u32,
}

impl SpawnParams {
    pub fn half_height(&self) -> f32 {
        self.size.y / 2.0
    }

    /// Pivot relative to the centre: the middle of the bottom face.
    pub fn pivot_offset(&self) -> Vec3 {
        Vec3::new(0.0, -self.half_height(), 0.0)
    }

    pub fn name(&self) -> String {
        block_name(self.index)
    }
}

/// Scene name of the block at `index` (`block_1` for index 0).
pub fn block_name(index: u32) -> String {
    format!("block_{}", index + 1)
}

/// Spawn height of the block centre for `index`.
pub fn spawn_height(index: u32) -> f32 {
    SPAWN_BASE_Y + index as f32 * SPAWN_STEP_Y
}

/// Sample the parameters of block `index` under `difficulty`.
pub fn spawn_parameters(index: u32, difficulty: Difficulty, rng: &mut SimpleRng) -> SpawnParams {
    let (lo, hi) = difficulty.footprint_range();
    let width = rng.uniform(lo, hi);
    let height = rng.uniform(BLOCK_HEIGHT_RANGE.0, BLOCK_HEIGHT_RANGE.1);
    let depth = rng.uniform(lo, hi);
    let color = [rng.next_f32(), rng.next_f32(), rng.next_f32()];

    SpawnParams {
        index,
        size: Vec3::new(width, height, depth),
        color,
        start: Vec3::new(OSCILLATION_X_MIN, spawn_height(index), 0.0),
        difficulty,
        period: difficulty.period_frames(),
    }
}

fn dress<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    node: NodeHandle,
    params: &SpawnParams,
) -> Result<(), SceneError> {
    scene.set_pivot_offset(node, params.pivot_offset())?;
    scene.set_color(node, params.color)?;
    scene.move_to(node, params.start)
}

/// A block owned by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub index: u32,
    pub node: NodeHandle,
    pub size: Vec3,
    pub color: [f32; 3],
    pub difficulty: Difficulty,
    pub period: u32,
    /// Last position known to the session (spawn or landing position).
    pub position: Vec3,
    pub state: BlockState,
}

impl Block {
    /// Create the block's mesh, relocate its pivot to the bottom centre, color
    /// it and move it to its spawn position.
    ///
    /// If any step after creation fails, the new node is deleted before the
    /// error is returned.
    pub fn materialize<S: SceneAdapter + ?Sized>(
        scene: &mut S,
        params: &SpawnParams,
    ) -> Result<Self, SceneError> {
        let name = params.name();
        let node = scene.create_box(params.size, &name)?;

        if let Err(e) = dress(scene, node, params) {
            if let Err(cleanup) = scene.delete_nodes(&[node]) {
                warn!(%node, error = %cleanup, "failed to delete partially created block");
            }
            return Err(e);
        }

        debug!(
            index = params.index,
            %node,
            size = ?params.size,
            period = params.period,
            "block materialized"
        );

        Ok(Self {
            index: params.index,
            node,
            size: params.size,
            color: params.color,
            difficulty: params.difficulty,
            period: params.period,
            position: params.start,
            state: BlockState::Moving,
        })
    }

    pub fn name(&self) -> String {
        block_name(self.index)
    }

    pub fn half_height(&self) -> f32 {
        self.size.y / 2.0
    }

    pub fn is_moving(&self) -> bool {
        self.state == BlockState::Moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_stay_in_difficulty_ranges() {
        let mut rng = SimpleRng::new(42);
        for mode in Difficulty::ALL {
            let (lo, hi) = mode.footprint_range();
            for index in 0..500 {
                let p = spawn_parameters(index, mode, &mut rng);
                assert!((lo..=hi).contains(&p.size.x), "width {}", p.size.x);
                assert!((lo..=hi).contains(&p.size.z), "depth {}", p.size.z);
                assert!((BLOCK_HEIGHT_RANGE.0..=BLOCK_HEIGHT_RANGE.1).contains(&p.size.y));
                for c in p.color {
                    assert!((0.0..=1.0).contains(&c));
                }
            }
        }
    }

    #[test]
    fn spawn_height_grows_with_index() {
        let mut rng = SimpleRng::new(1);
        let a = spawn_parameters(0, Difficulty::Easy, &mut rng);
        let b = spawn_parameters(1, Difficulty::Easy, &mut rng);
        let c = spawn_parameters(7, Difficulty::Easy, &mut rng);
        assert_eq!(a.start, Vec3::new(OSCILLATION_X_MIN, SPAWN_BASE_Y, 0.0));
        assert!(b.start.y > a.start.y);
        assert!(c.start.y > b.start.y);
    }

    #[test]
    fn period_follows_difficulty() {
        let mut rng = SimpleRng::new(1);
        assert_eq!(spawn_parameters(0, Difficulty::Easy, &mut rng).period, 180);
        assert_eq!(spawn_parameters(0, Difficulty::Normal, &mut rng).period, 90);
        assert_eq!(spawn_parameters(0, Difficulty::Hard, &mut rng).period, 40);
    }

    #[test]
    fn pivot_is_bottom_centre() {
        let mut rng = SimpleRng::new(5);
        let p = spawn_parameters(0, Difficulty::Normal, &mut rng);
        assert_eq!(p.pivot_offset(), Vec3::new(0.0, -p.size.y / 2.0, 0.0));
    }

    #[test]
    fn names_are_one_based() {
        assert_eq!(block_name(0), "block_1");
        assert_eq!(block_name(9), "block_10");
    }

    #[test]
    fn same_seed_same_blocks() {
        let mut a = SimpleRng::new(77);
        let mut b = SimpleRng::new(77);
        for i in 0..10 {
            assert_eq!(
                spawn_parameters(i, Difficulty::Hard, &mut a),
                spawn_parameters(i, Difficulty::Hard, &mut b)
            );
        }
    }
}
