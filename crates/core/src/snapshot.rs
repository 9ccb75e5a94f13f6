//! Read-only session views for front-ends and observers.

use crate::block::Block;
use crate::types::{BlockState, Difficulty, Phase};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSnapshot {
    pub index: u32,
    pub size: [f32; 3],
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub period: u32,
    pub state: BlockState,
}

impl BlockSnapshot {
    /// Snapshot with an explicit position (e.g. the live position of a moving block).
    pub fn at(block: &Block, position: [f32; 3]) -> Self {
        Self {
            index: block.index,
            size: block.size.to_array(),
            position,
            color: block.color,
            period: block.period,
            state: block.state,
        }
    }
}

impl From<&Block> for BlockSnapshot {
    fn from(block: &Block) -> Self {
        Self::at(block, block.position.to_array())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub score: u32,
    pub block_count: u32,
    pub difficulty: Difficulty,
    /// Current timeline position.
    pub frame: f32,
    /// Highest placed top surface, `None` while the stack is empty.
    pub stack_top: Option<f32>,
    pub active: Option<BlockSnapshot>,
    pub placed: Vec<BlockSnapshot>,
}

impl SessionSnapshot {
    /// Front-end labels: `["Score: N", "Blocks: N", "Mode: EASY"]`.
    pub fn labels(&self) -> [String; 3] {
        [
            format!("Score: {}", self.score),
            format!("Blocks: {}", self.block_count),
            format!("Mode: {}", self.difficulty.label()),
        ]
    }
}
