//! Core game logic module - the block stacking simulation
//!
//! This crate contains the block lifecycle, its keyframe timing model, and the
//! bounding-box judge that decides between a placed block and a collapsed tower.
//! It talks to the 3D host exclusively through the [`SceneAdapter`] trait, so it
//! has no dependency on any particular host API and can be driven end to end
//! against an in-memory scene.
//!
//! # Module Structure
//!
//! - [`scene`]: the capability interface the host must provide
//! - [`curve`]: keyframe curves with pre/post infinity, shared with scene implementations
//! - [`rng`]: deterministic LCG used for block geometry and color sampling
//! - [`block`]: block entity model and spawn parameters
//! - [`oscillation`]: the cyclic x-axis keyframe scaffold of a moving block
//! - [`landing`]: drop resolution, ground lookup and landing height
//! - [`collision`]: axis-aligned bounding boxes and the stack judge
//! - [`session`]: the game session state machine
//! - [`snapshot`]: read-only views for front-ends
//! - [`config`]: gameplay configuration
//!
//! # Block Lifecycle
//!
//! ```text
//! spawn -> oscillate -> drop -> land -> judge -> placed (next spawn)
//!                                            \-> collapsed (game over)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tower_builder_core::{GameConfig, GameSession};
//!
//! let mut session = GameSession::new(scene, GameConfig::default());
//! session.start()?;
//! session.advance(30.0);
//! session.request_drop()?;
//! assert_eq!(session.score(), 1);
//! ```

pub mod block;
pub mod collision;
pub mod config;
pub mod curve;
pub mod landing;
pub mod oscillation;
pub mod rng;
pub mod scene;
pub mod session;
pub mod snapshot;

pub use tower_builder_types as types;

// Re-export commonly used types for convenience
pub use block::{spawn_parameters, Block, SpawnParams};
pub use collision::{Aabb, CollapseCause, StackJudge, Verdict};
pub use config::GameConfig;
pub use curve::{Curve, Keyframe};
pub use landing::{GroundReference, Landing};
pub use oscillation::OscillationScaffold;
pub use rng::SimpleRng;
pub use scene::{Attribute, InfinityMode, NodeHandle, SceneAdapter, SceneError};
pub use session::{DropOutcome, GameSession, SessionError};
pub use snapshot::{BlockSnapshot, SessionSnapshot};

pub use glam::Vec3;
