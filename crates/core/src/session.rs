//! Game session state machine
//!
//! One [`GameSession`] owns one scene adapter and everything the game needs
//! between calls: the moving block, the placed stack, counters and the pending
//! event queue. Nothing lives in globals, so sessions are independent.
//!
//! # States
//!
//! ```text
//!          start()                 request_drop(): safe
//! Idle ------------> Oscillating <-----------------------+
//!  ^                     |                               |
//!  |                     | request_drop()                |
//!  |                     v                               |
//!  |                  Landing ---------------------------+
//!  |                     |
//!  |   reset()           | request_drop(): collapse
//!  +---------------- GameOver
//! ```
//!
//! `start()` and `reset()` are accepted in every state. `set_difficulty()` is
//! accepted in every state and only affects blocks spawned afterwards.
//!
//! # Failure Semantics
//!
//! A failed drop leaves score, block count, the placed stack, the moving block
//! and the phase exactly as they were, and reports the error as an event. The
//! block is put back on its oscillation at the frame the drop was requested and
//! the RNG is rewound, so a retry spawns the same next block. Cleanup during
//! `reset()` is best-effort: failures are logged and clearing continues.

use std::collections::VecDeque;

use glam::Vec3;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::block::{spawn_parameters, Block};
use crate::collision::{Aabb, CollapseCause, StackJudge, Verdict};
use crate::config::GameConfig;
use crate::landing::{self, GroundReference, Landing};
use crate::oscillation;
use crate::rng::SimpleRng;
use crate::scene::{NodeHandle, SceneAdapter, SceneError};
use crate::snapshot::{BlockSnapshot, SessionSnapshot};
use crate::types::{
    BlockState, CommandKind, Difficulty, ErrorKind, GameEvent, Phase, BASE_CENTER_Y, BASE_NAME,
    BASE_SIZE, FIRST_KEY_FRAME,
};

/// Errors returned by session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no block is currently moving")]
    NoActiveBlock,
    #[error("scene adapter failure: {0}")]
    Adapter(#[from] SceneError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoActiveBlock => ErrorKind::NoActiveBlock,
            SessionError::Adapter(_) => ErrorKind::AdapterFailure,
        }
    }
}

/// What a successful `request_drop()` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropOutcome {
    Placed {
        index: u32,
        score: u32,
        landing: Landing,
    },
    Collapsed {
        index: u32,
        cause: CollapseCause,
        landing: Landing,
    },
}

impl DropOutcome {
    pub fn is_collapse(&self) -> bool {
        matches!(self, DropOutcome::Collapsed { .. })
    }

    pub fn landing(&self) -> &Landing {
        match self {
            DropOutcome::Placed { landing, .. } | DropOutcome::Collapsed { landing, .. } => landing,
        }
    }
}

/// Scene-side work of a drop, computed before any session field changes.
enum Resolution {
    Placed { landing: Landing, next: Block },
    Collapsed { landing: Landing, cause: CollapseCause },
}

/// A single game of tower building.
pub struct GameSession<S: SceneAdapter> {
    scene: S,
    config: GameConfig,
    rng: SimpleRng,
    judge: StackJudge,
    phase: Phase,
    score: u32,
    block_count: u32,
    difficulty: Difficulty,
    base: Option<NodeHandle>,
    current: Option<Block>,
    placed: Vec<Block>,
    /// The block that collapsed the tower, kept until the scene is cleared.
    wreck: Option<Block>,
    events: VecDeque<GameEvent>,
}

impl<S: SceneAdapter> GameSession<S> {
    pub fn new(scene: S, config: GameConfig) -> Self {
        Self {
            scene,
            rng: SimpleRng::new(config.seed),
            judge: StackJudge::new(config.collision_rule),
            phase: Phase::Idle,
            score: 0,
            block_count: 0,
            difficulty: config.difficulty,
            base: None,
            current: None,
            placed: Vec::new(),
            wreck: None,
            events: VecDeque::new(),
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_running()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.current.as_ref()
    }

    /// Placed blocks in landing order (base excluded).
    pub fn placed_blocks(&self) -> &[Block] {
        &self.placed
    }

    pub fn base(&self) -> Option<NodeHandle> {
        self.base
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Highest placed top surface.
    pub fn stack_top(&self) -> Option<f32> {
        self.placed
            .iter()
            .map(|b| b.position.y + b.half_height())
            .reduce(f32::max)
    }

    /// Remove and return pending events, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    /// Apply a front-end command.
    pub fn apply(&mut self, command: CommandKind) -> Result<(), SessionError> {
        match command {
            CommandKind::Start => self.start(),
            CommandKind::Drop => self.request_drop().map(|_| ()),
            CommandKind::Reset => {
                self.reset();
                Ok(())
            }
            CommandKind::SetDifficulty(mode) => {
                self.set_difficulty(mode);
                Ok(())
            }
        }
    }

    /// Clear the scene, create the base, zero the counters and spawn block 0.
    ///
    /// On failure the session is left `Idle` with an empty scene.
    pub fn start(&mut self) -> Result<(), SessionError> {
        info!(difficulty = self.difficulty.label(), "starting game");
        self.clear_scene();
        self.phase = Phase::Idle;
        self.score = 0;
        self.block_count = 0;

        match self.build_opening() {
            Ok((base, block)) => {
                let (index, period) = (block.index, block.period);
                self.base = Some(base);
                self.current = Some(block);
                self.phase = Phase::Oscillating;
                self.events.push_back(GameEvent::Started);
                self.events.push_back(GameEvent::BlockSpawned { index, period });
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Drop the moving block, judge its landing, and either spawn the next
    /// block or end the game.
    pub fn request_drop(&mut self) -> Result<DropOutcome, SessionError> {
        if self.phase != Phase::Oscillating {
            debug!(phase = self.phase.as_str(), "drop requested with no moving block");
            return Err(self.report(SessionError::NoActiveBlock));
        }
        let Some(block) = self.current.take() else {
            return Err(self.report(SessionError::NoActiveBlock));
        };

        let prior = self.phase;
        let frame = self.scene.timeline_position();
        let rng = self.rng.clone();
        self.phase = Phase::Landing;

        match self.resolve_drop(&block) {
            Ok(resolution) => Ok(self.commit(block, resolution)),
            Err(e) => {
                self.rng = rng;
                if let Err(rewind) = oscillation::resume(&mut self.scene, &block, frame) {
                    warn!(index = block.index, error = %rewind, "failed to resume oscillation");
                }
                self.current = Some(block);
                self.phase = prior;
                Err(self.report(e))
            }
        }
    }

    /// Delete everything and return to `Idle`. Safe in any state, repeatedly.
    pub fn reset(&mut self) {
        info!(phase = self.phase.as_str(), "resetting session");
        self.clear_scene();
        self.phase = Phase::Idle;
        self.score = 0;
        self.block_count = 0;
        self.events.push_back(GameEvent::Reset);
    }

    /// Difficulty for blocks spawned from now on.
    pub fn set_difficulty(&mut self, mode: Difficulty) {
        info!(from = self.difficulty.label(), to = mode.label(), "difficulty changed");
        self.difficulty = mode;
        self.events.push_back(GameEvent::DifficultyChanged(mode));
    }

    /// Advance the scene timeline, as host playback would.
    pub fn advance(&mut self, frames: f32) {
        if !frames.is_finite() || frames <= 0.0 {
            return;
        }
        let now = self.scene.timeline_position();
        self.scene.set_timeline_position(now + frames);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let active = self.current.as_ref().map(|block| {
            let live = self
                .scene
                .world_position(block.node)
                .unwrap_or(block.position);
            BlockSnapshot::at(block, live.to_array())
        });

        SessionSnapshot {
            phase: self.phase,
            score: self.score,
            block_count: self.block_count,
            difficulty: self.difficulty,
            frame: self.scene.timeline_position(),
            stack_top: self.stack_top(),
            active,
            placed: self.placed.iter().map(BlockSnapshot::from).collect(),
        }
    }

    fn build_opening(&mut self) -> Result<(NodeHandle, Block), SessionError> {
        let base = self
            .scene
            .create_box(Vec3::from_array(BASE_SIZE), BASE_NAME)?;
        if let Err(e) = self.scene.move_to(base, Vec3::new(0.0, BASE_CENTER_Y, 0.0)) {
            self.discard(&[base]);
            return Err(e.into());
        }
        debug!(node = %base, "base created");

        match self.spawn(0) {
            Ok(block) => Ok((base, block)),
            Err(e) => {
                self.discard(&[base]);
                Err(e)
            }
        }
    }

    /// Materialize block `index` and start its oscillation from the first key.
    fn spawn(&mut self, index: u32) -> Result<Block, SessionError> {
        let params = spawn_parameters(index, self.difficulty, &mut self.rng);
        self.scene.set_timeline_position(FIRST_KEY_FRAME);

        let block = Block::materialize(&mut self.scene, &params)?;
        if let Err(e) = oscillation::start(&mut self.scene, &block) {
            self.discard(&[block.node]);
            return Err(e.into());
        }

        info!(
            index,
            period = block.period,
            difficulty = block.difficulty.label(),
            "created moving block"
        );
        Ok(block)
    }

    fn resolve_drop(&mut self, block: &Block) -> Result<Resolution, SessionError> {
        let placed = self.placed_bounds()?;
        let support_y = match landing::stack_top(&placed) {
            Some(top) => top,
            None => self.ground_reference().y,
        };

        let landing = landing::land(&mut self.scene, block, support_y)?;
        let landed = self.scene.query_world_aabb(block.node)?;

        match self.judge.judge(&landed, &placed) {
            Verdict::Safe => {
                let next = self.spawn(block.index + 1)?;
                Ok(Resolution::Placed { landing, next })
            }
            Verdict::Collapse(cause) => Ok(Resolution::Collapsed { landing, cause }),
        }
    }

    fn commit(&mut self, mut block: Block, resolution: Resolution) -> DropOutcome {
        block.state = BlockState::Landed;
        let index = block.index;

        match resolution {
            Resolution::Placed { landing, next } => {
                block.position = landing.position;
                self.placed.push(block);
                self.score += 1;
                self.block_count += 1;
                let score = self.score;

                info!(index, score, y = landing.position.y, "block placed");
                self.events
                    .push_back(GameEvent::BlockPlaced { index, score });
                self.events.push_back(GameEvent::BlockSpawned {
                    index: next.index,
                    period: next.period,
                });
                self.current = Some(next);
                self.phase = Phase::Oscillating;

                DropOutcome::Placed {
                    index,
                    score,
                    landing,
                }
            }
            Resolution::Collapsed { landing, cause } => {
                block.position = landing.position;
                self.wreck = Some(block);
                self.phase = Phase::GameOver;

                info!(index, score = self.score, ?cause, "tower collapsed");
                self.events.push_back(GameEvent::Collapsed);

                DropOutcome::Collapsed {
                    index,
                    cause,
                    landing,
                }
            }
        }
    }

    fn placed_bounds(&self) -> Result<Vec<Aabb>, SceneError> {
        self.placed
            .iter()
            .map(|b| self.scene.query_world_aabb(b.node))
            .collect()
    }

    fn ground_reference(&mut self) -> GroundReference {
        let ground = GroundReference::lookup(&self.scene, self.config.ground_fallback_y);
        if ground.fallback {
            self.events
                .push_back(GameEvent::Error(ErrorKind::MissingBaseReference));
        }
        ground
    }

    fn report(&mut self, error: SessionError) -> SessionError {
        warn!(kind = error.kind().as_str(), error = %error, "operation failed");
        self.events.push_back(GameEvent::Error(error.kind()));
        error
    }

    /// Best-effort node deletion.
    fn discard(&mut self, nodes: &[NodeHandle]) {
        if nodes.is_empty() {
            return;
        }
        if let Err(e) = self.scene.delete_nodes(nodes) {
            warn!(error = %e, count = nodes.len(), "failed to delete nodes");
        }
    }

    /// Stop any animation and delete every node this session created.
    fn release_nodes(&mut self) {
        if let Some(block) = self.current.as_ref() {
            if let Err(e) = oscillation::stop(&mut self.scene, block) {
                warn!(index = block.index, error = %e, "failed to stop oscillation");
            }
        }

        let nodes: Vec<NodeHandle> = self
            .base
            .iter()
            .copied()
            .chain(self.current.iter().map(|b| b.node))
            .chain(self.placed.iter().map(|b| b.node))
            .chain(self.wreck.iter().map(|b| b.node))
            .collect();
        self.discard(&nodes);

        for block in self
            .current
            .iter_mut()
            .chain(self.placed.iter_mut())
            .chain(self.wreck.iter_mut())
        {
            block.state = BlockState::Removed;
        }
        self.base = None;
        self.current = None;
        self.placed.clear();
        self.wreck = None;
    }

    fn clear_scene(&mut self) {
        self.release_nodes();
        if let Err(e) = self.scene.delete_all() {
            warn!(error = %e, "failed to clear scene");
        }
    }
}

impl<S: SceneAdapter> Drop for GameSession<S> {
    fn drop(&mut self) {
        self.release_nodes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        assert_eq!(SessionError::NoActiveBlock.kind(), ErrorKind::NoActiveBlock);
        assert_eq!(
            SessionError::from(SceneError::UnknownNode(NodeHandle(1))).kind(),
            ErrorKind::AdapterFailure
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            SessionError::NoActiveBlock.to_string(),
            "no block is currently moving"
        );
        assert_eq!(
            SessionError::Adapter(SceneError::KeyframeFailed("locked".into())).to_string(),
            "scene adapter failure: keyframe operation failed: locked"
        );
    }
}
