//! Scene adapter - the capability surface provided by the 3D host
//!
//! The session never touches host APIs directly. Everything it needs (creating
//! boxes, moving them, authoring keyframes, querying bounds, moving the timeline,
//! deleting nodes) goes through [`SceneAdapter`].
//!
//! # Position Convention
//!
//! A node's translation is its geometric centre. The pivot offset set by
//! [`SceneAdapter::set_pivot_offset`] marks the base point of a block, so a
//! block landed at `ground + height / 2` has its pivot exactly on `ground`.
//!
//! # Keyframe Semantics
//!
//! - `move_to` on an animated attribute stages a value that the next
//!   `record_keyframe` on that attribute captures.
//! - Otherwise an animated attribute reads its curve at the current timeline position.
//! - `clear_keyframes` keeps the value sampled at the current timeline position,
//!   so a stopped block freezes where it is.

use std::fmt;

use glam::Vec3;
use thiserror::Error;

use crate::collision::Aabb;

/// Opaque handle to a node owned by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u32);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Animatable node attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    TranslateX,
    TranslateY,
    TranslateZ,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [
        Attribute::TranslateX,
        Attribute::TranslateY,
        Attribute::TranslateZ,
    ];

    /// Vector component index (x = 0, y = 1, z = 2).
    pub fn axis(&self) -> usize {
        match self {
            Attribute::TranslateX => 0,
            Attribute::TranslateY => 1,
            Attribute::TranslateZ => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::TranslateX => "translateX",
            Attribute::TranslateY => "translateY",
            Attribute::TranslateZ => "translateZ",
        }
    }
}

/// Curve behaviour outside its keyed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InfinityMode {
    /// Hold the first/last key value.
    #[default]
    Constant,
    /// Repeat the keyed segment identically.
    Cycle,
    /// Repeat the keyed segment, mirroring direction every other repetition.
    Oscillate,
}

/// Failure reported by a scene adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("unknown scene node {0}")]
    UnknownNode(NodeHandle),
    #[error("failed to create node: {0}")]
    CreateFailed(String),
    #[error("keyframe operation failed: {0}")]
    KeyframeFailed(String),
    #[error("scene query failed: {0}")]
    QueryFailed(String),
    #[error("failed to delete nodes: {0}")]
    DeleteFailed(String),
}

/// Host capabilities required by a game session.
///
/// Implementations own the scene graph. All calls happen on the session's
/// thread, so no method needs to be thread-safe.
pub trait SceneAdapter {
    /// Create a box mesh centred on the origin.
    fn create_box(&mut self, size: Vec3, name: &str) -> Result<NodeHandle, SceneError>;

    /// Set the node's world translation.
    fn move_to(&mut self, node: NodeHandle, position: Vec3) -> Result<(), SceneError>;

    /// Relocate the node's pivot relative to its centre.
    fn set_pivot_offset(&mut self, node: NodeHandle, offset: Vec3) -> Result<(), SceneError>;

    /// Assign a display color. Purely visual; hosts without materials may ignore it.
    fn set_color(&mut self, node: NodeHandle, rgb: [f32; 3]) -> Result<(), SceneError> {
        let _ = (node, rgb);
        Ok(())
    }

    /// Record the attribute's current value as a key at `frame`.
    fn record_keyframe(
        &mut self,
        node: NodeHandle,
        attribute: Attribute,
        frame: f32,
    ) -> Result<(), SceneError>;

    /// Configure pre and post infinity of the attribute's curve.
    fn set_infinity(
        &mut self,
        node: NodeHandle,
        attribute: Attribute,
        mode: InfinityMode,
    ) -> Result<(), SceneError>;

    /// Delete the attribute's curve, keeping its current sampled value.
    fn clear_keyframes(&mut self, node: NodeHandle, attribute: Attribute)
        -> Result<(), SceneError>;

    /// World translation at the current timeline position.
    fn world_position(&self, node: NodeHandle) -> Result<Vec3, SceneError>;

    fn set_timeline_position(&mut self, frame: f32);

    fn timeline_position(&self) -> f32;

    /// World-space bounding box at the current timeline position.
    fn query_world_aabb(&self, node: NodeHandle) -> Result<Aabb, SceneError>;

    /// Look a node up by name.
    fn find_node(&self, name: &str) -> Option<NodeHandle>;

    /// Delete the given nodes. Implementations should delete every node they can
    /// before reporting a failure.
    fn delete_nodes(&mut self, nodes: &[NodeHandle]) -> Result<(), SceneError>;

    /// Select everything and delete it.
    fn delete_all(&mut self) -> Result<(), SceneError>;
}
