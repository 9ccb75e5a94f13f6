//! Tower Builder (workspace facade crate).
//!
//! Re-exports the workspace crates as `tower_builder::{types,core,scene,adapter}`
//! and holds the pieces shared by the binaries: the headless [`host`] loop and
//! the [`observe`] client.

pub mod host;
pub mod observe;

pub use tower_builder_adapter as adapter;
pub use tower_builder_core as core;
pub use tower_builder_scene as scene;
pub use tower_builder_types as types;
