//! Shared types module - enums and constants used across the workspace
//!
//! This crate defines the vocabulary shared by the simulation core, the headless
//! scene, and the front-end adapter. Everything here is plain data with no
//! external dependencies, so it can be used from any context (core logic,
//! protocol mapping, UI labels).
//!
//! # Coordinate System
//!
//! World space is right-handed with **y up**. Blocks oscillate along **x**, drop
//! along **y**, and keep their **z** coordinate for their whole life.
//!
//! # Timeline Constants
//!
//! Motion is expressed as keyframes on a frame-based timeline:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `FIRST_KEY_FRAME` | 1 | Frame of the first oscillation key |
//! | `LANDING_TWEEN_FRAMES` | 20 | Length of the vertical landing tween |
//! | `DEFAULT_FPS` | 24 | Frames the host advances per second |
//!
//! # Oscillation Periods
//!
//! | Difficulty | Period (frames) | Footprint range |
//! |------------|-----------------|-----------------|
//! | EASY | 180 | 3.5 - 6.5 |
//! | NORMAL | 90 | 2.5 - 5.5 |
//! | HARD | 40 | 1.5 - 4.5 |
//!
//! Block height is sampled from `BLOCK_HEIGHT_RANGE` for every difficulty.
//!
//! # Examples
//!
//! ```
//! use tower_builder_types::{Difficulty, GameEvent};
//!
//! let mode = Difficulty::from_str("hard").unwrap();
//! assert_eq!(mode.period_frames(), 40);
//! assert_eq!(mode.label(), "HARD");
//!
//! let event = GameEvent::BlockPlaced { index: 0, score: 1 };
//! assert_eq!(event.log_line(), "Block 1 placed successfully.");
//! ```

/// Left turning point of the oscillation.
pub const OSCILLATION_X_MIN: f32 = -10.0;

/// Right turning point of the oscillation.
pub const OSCILLATION_X_MAX: f32 = 10.0;

/// Timeline frame of the first oscillation key.
pub const FIRST_KEY_FRAME: f32 = 1.0;

/// Length of the vertical landing tween in frames.
pub const LANDING_TWEEN_FRAMES: f32 = 20.0;

/// Frames per second advanced by the headless host.
pub const DEFAULT_FPS: u32 = 24;

/// Name of the base platform node.
pub const BASE_NAME: &str = "baseBlock";

/// Base platform extents (width, height, depth).
pub const BASE_SIZE: [f32; 3] = [30.0, 1.0, 30.0];

/// Base platform centre height. The top surface sits at `BASE_CENTER_Y + 0.5`.
pub const BASE_CENTER_Y: f32 = 0.5;

/// Ground height used when the base platform cannot be looked up.
pub const GROUND_FALLBACK_Y: f32 = 0.5;

/// Spawn height of block 0 (centre).
pub const SPAWN_BASE_Y: f32 = 20.0;

/// Spawn height increment per block index.
///
/// Equal to the tallest possible block so a spawn never starts inside the stack.
pub const SPAWN_STEP_Y: f32 = 5.5;

/// Block height sampling range (all difficulties).
pub const BLOCK_HEIGHT_RANGE: (f32, f32) = (3.5, 5.5);

/// Distance under which two faces count as touching.
pub const CONTACT_EPSILON: f32 = 1e-4;

/// Game difficulty
///
/// Selects the oscillation period and footprint range of newly spawned blocks.
/// A block keeps the values it was spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Parse difficulty from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_builder_types::Difficulty;
    ///
    /// assert_eq!(Difficulty::from_str("EASY"), Some(Difficulty::Easy));
    /// assert_eq!(Difficulty::from_str("normal"), Some(Difficulty::Normal));
    /// assert_eq!(Difficulty::from_str("insane"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    /// Uppercase label shown by front-ends ("Mode: EASY").
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Normal => "NORMAL",
            Difficulty::Hard => "HARD",
        }
    }

    /// Oscillation cycle length in timeline frames.
    pub fn period_frames(&self) -> u32 {
        match self {
            Difficulty::Easy => 180,
            Difficulty::Normal => 90,
            Difficulty::Hard => 40,
        }
    }

    /// Sampling range shared by block width and depth.
    pub fn footprint_range(&self) -> (f32, f32) {
        match self {
            Difficulty::Easy => (3.5, 6.5),
            Difficulty::Normal => (2.5, 5.5),
            Difficulty::Hard => (1.5, 4.5),
        }
    }
}

/// Lifecycle of a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// Oscillating along x, waiting for a drop.
    Moving,
    /// Resting at its landing position.
    Landed,
    /// Detached from the scene (reset or teardown).
    Removed,
}

impl BlockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockState::Moving => "moving",
            BlockState::Landed => "landed",
            BlockState::Removed => "removed",
        }
    }
}

/// Session phase
///
/// `Oscillating` and `Landing` are the two sub-states of a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Oscillating,
    Landing,
    GameOver,
}

impl Phase {
    pub fn is_running(&self) -> bool {
        matches!(self, Phase::Oscillating | Phase::Landing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Oscillating => "oscillating",
            Phase::Landing => "landing",
            Phase::GameOver => "gameOver",
        }
    }
}

/// Rule used by the stack judge to decide a collapse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollisionRule {
    /// A landed block whose box touches or overlaps any placed box on all
    /// three axes collapses the tower. Landing on top of the stack counts.
    Overlap,
    /// A landed block that shares no footprint with the block(s) it rests on
    /// collapses the tower.
    #[default]
    Unsupported,
}

impl CollisionRule {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "overlap" => Some(CollisionRule::Overlap),
            "unsupported" => Some(CollisionRule::Unsupported),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionRule::Overlap => "overlap",
            CollisionRule::Unsupported => "unsupported",
        }
    }
}

/// Error kinds reported to front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Drop requested with nothing moving. Recoverable.
    NoActiveBlock,
    /// The scene rejected a geometry or keyframe operation. State unchanged.
    AdapterFailure,
    /// Base platform lookup failed; the fallback ground height was used.
    MissingBaseReference,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoActiveBlock => "noActiveBlock",
            ErrorKind::AdapterFailure => "adapterFailure",
            ErrorKind::MissingBaseReference => "missingBaseReference",
        }
    }
}

/// Notification emitted by a session for front-ends to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// A new game began; base created, counters at zero.
    Started,
    /// A block started oscillating.
    BlockSpawned { index: u32, period: u32 },
    /// A block landed safely. `score` is the score after placement.
    BlockPlaced { index: u32, score: u32 },
    /// The landed block failed the stack judge; the game is over.
    Collapsed,
    /// The scene was cleared and the session is idle.
    Reset,
    /// Difficulty for future spawns changed.
    DifficultyChanged(Difficulty),
    /// A recoverable or reported error.
    Error(ErrorKind),
}

impl GameEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::Started => "started",
            GameEvent::BlockSpawned { .. } => "blockSpawned",
            GameEvent::BlockPlaced { .. } => "blockPlaced",
            GameEvent::Collapsed => "collapsed",
            GameEvent::Reset => "reset",
            GameEvent::DifficultyChanged(_) => "difficultyChanged",
            GameEvent::Error(_) => "error",
        }
    }

    /// Log line as shown in the front-end log box.
    pub fn log_line(&self) -> String {
        match self {
            GameEvent::Started => "Game started.".to_string(),
            GameEvent::BlockSpawned { index, .. } => {
                format!("Created moving block: block_{}", index + 1)
            }
            GameEvent::BlockPlaced { index, .. } => {
                format!("Block {} placed successfully.", index + 1)
            }
            GameEvent::Collapsed => "Game Over! Tower collapsed!".to_string(),
            GameEvent::Reset => "Scene cleared. Ready to restart.".to_string(),
            GameEvent::DifficultyChanged(mode) => format!("Mode: {}", mode.label()),
            GameEvent::Error(ErrorKind::NoActiveBlock) => {
                "Please start the game first!".to_string()
            }
            GameEvent::Error(ErrorKind::AdapterFailure) => {
                "Scene operation failed; nothing was changed.".to_string()
            }
            GameEvent::Error(ErrorKind::MissingBaseReference) => {
                format!("Base not found, using ground height {:.2}.", GROUND_FALLBACK_Y)
            }
        }
    }
}

/// Front-end commands
///
/// The four operations a front-end may invoke on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Drop,
    Reset,
    SetDifficulty(Difficulty),
}

impl CommandKind {
    /// Parse a command from its wire action name and optional difficulty
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_builder_types::{CommandKind, Difficulty};
    ///
    /// assert_eq!(CommandKind::parse("drop", None), Some(CommandKind::Drop));
    /// assert_eq!(
    ///     CommandKind::parse("difficulty", Some("hard")),
    ///     Some(CommandKind::SetDifficulty(Difficulty::Hard))
    /// );
    /// assert_eq!(CommandKind::parse("difficulty", None), None);
    /// ```
    pub fn parse(action: &str, difficulty: Option<&str>) -> Option<Self> {
        match action.to_lowercase().as_str() {
            "start" => Some(CommandKind::Start),
            "drop" => Some(CommandKind::Drop),
            "reset" => Some(CommandKind::Reset),
            "difficulty" | "setdifficulty" => {
                difficulty.and_then(Difficulty::from_str).map(CommandKind::SetDifficulty)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Drop => "drop",
            CommandKind::Reset => "reset",
            CommandKind::SetDifficulty(_) => "difficulty",
        }
    }
}
