//! Headless scene - an in-memory [`SceneAdapter`]
//!
//! `MemoryScene` behaves like a content-creation host's scene graph, reduced to
//! what the tower game uses: box nodes with a translation, pivot and color,
//! per-attribute keyframe curves with pre/post infinity, a timeline, and
//! world-space bounding boxes. It backs the headless host binary, the
//! integration tests and the benchmarks.
//!
//! # Evaluation Model
//!
//! - Each node stores a static translation. `move_to` writes it.
//! - An attribute with a curve reads the curve at the current timeline position,
//!   except that a `move_to` since the last timeline change stages a value which
//!   the next `record_keyframe` captures (the "unkeyed change" of a real host).
//! - `clear_keyframes` bakes the sampled value into the static translation.
//! - Geometry is centred on the translation; the pivot offset only moves the
//!   pivot point.
//!
//! # Fault Injection
//!
//! [`MemoryScene::fail_next`] arms a single failure for the next call of the
//! matching kind, so tests can exercise error paths of the session.

use std::cell::Cell;
use std::collections::BTreeMap;

use glam::Vec3;
use tracing::trace;

use tower_builder_core::{
    Aabb, Attribute, Curve, InfinityMode, Keyframe, NodeHandle, SceneAdapter, SceneError,
};

pub use tower_builder_core as core;
pub use tower_builder_types as types;

/// Operation kinds that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Create,
    Move,
    Keyframe,
    Query,
    Delete,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    size: Vec3,
    translate: Vec3,
    pivot_offset: Vec3,
    color: [f32; 3],
    curves: [Option<Curve>; 3],
    /// Attributes moved since the last timeline change.
    staged: [bool; 3],
}

impl Node {
    fn value(&self, attribute: Attribute, frame: f32) -> f32 {
        let axis = attribute.axis();
        if self.staged[axis] {
            return self.translate[axis];
        }
        self.curves[axis]
            .as_ref()
            .and_then(|c| c.evaluate(frame))
            .unwrap_or(self.translate[axis])
    }

    fn position(&self, frame: f32) -> Vec3 {
        Vec3::new(
            self.value(Attribute::TranslateX, frame),
            self.value(Attribute::TranslateY, frame),
            self.value(Attribute::TranslateZ, frame),
        )
    }
}

/// In-memory scene graph.
#[derive(Debug)]
pub struct MemoryScene {
    nodes: BTreeMap<NodeHandle, Node>,
    next_id: u32,
    frame: f32,
    fail_next: Cell<Option<FailPoint>>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    /// Empty scene with the timeline at frame 1.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 1,
            frame: 1.0,
            fail_next: Cell::new(None),
        }
    }

    /// Make the next operation of `point`'s kind fail.
    pub fn fail_next(&self, point: FailPoint) {
        self.fail_next.set(Some(point));
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Node names in creation order.
    pub fn node_names(&self) -> Vec<String> {
        self.nodes.values().map(|n| n.name.clone()).collect()
    }

    pub fn name(&self, node: NodeHandle) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    pub fn size(&self, node: NodeHandle) -> Option<Vec3> {
        self.nodes.get(&node).map(|n| n.size)
    }

    pub fn color(&self, node: NodeHandle) -> Option<[f32; 3]> {
        self.nodes.get(&node).map(|n| n.color)
    }

    /// World position of the node's pivot.
    pub fn pivot_world(&self, node: NodeHandle) -> Option<Vec3> {
        self.nodes
            .get(&node)
            .map(|n| n.position(self.frame) + n.pivot_offset)
    }

    pub fn curve(&self, node: NodeHandle, attribute: Attribute) -> Option<&Curve> {
        self.nodes
            .get(&node)
            .and_then(|n| n.curves[attribute.axis()].as_ref())
    }

    pub fn is_animated(&self, node: NodeHandle) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|n| n.curves.iter().any(Option::is_some))
    }

    fn check(&self, point: FailPoint) -> Result<(), SceneError> {
        if self.fail_next.get() != Some(point) {
            return Ok(());
        }
        self.fail_next.set(None);
        let msg = format!("injected {point:?} failure");
        Err(match point {
            FailPoint::Create => SceneError::CreateFailed(msg),
            FailPoint::Move | FailPoint::Keyframe => SceneError::KeyframeFailed(msg),
            FailPoint::Query => SceneError::QueryFailed(msg),
            FailPoint::Delete => SceneError::DeleteFailed(msg),
        })
    }

    fn node(&self, node: NodeHandle) -> Result<&Node, SceneError> {
        self.nodes.get(&node).ok_or(SceneError::UnknownNode(node))
    }

    fn node_mut(&mut self, node: NodeHandle) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(&node).ok_or(SceneError::UnknownNode(node))
    }
}

impl SceneAdapter for MemoryScene {
    fn create_box(&mut self, size: Vec3, name: &str) -> Result<NodeHandle, SceneError> {
        self.check(FailPoint::Create)?;
        if !size.is_finite() || size.min_element() <= 0.0 {
            return Err(SceneError::CreateFailed(format!(
                "invalid box size {size:?} for {name}"
            )));
        }

        let handle = NodeHandle(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            handle,
            Node {
                name: name.to_string(),
                size,
                translate: Vec3::ZERO,
                pivot_offset: Vec3::ZERO,
                color: [0.5, 0.5, 0.5],
                curves: [None, None, None],
                staged: [false; 3],
            },
        );
        trace!(%handle, name, "box created");
        Ok(handle)
    }

    fn move_to(&mut self, node: NodeHandle, position: Vec3) -> Result<(), SceneError> {
        self.check(FailPoint::Move)?;
        let n = self.node_mut(node)?;
        for attribute in Attribute::ALL {
            let axis = attribute.axis();
            n.translate[axis] = position[axis];
            if n.curves[axis].is_some() {
                n.staged[axis] = true;
            }
        }
        Ok(())
    }

    fn set_pivot_offset(&mut self, node: NodeHandle, offset: Vec3) -> Result<(), SceneError> {
        self.node_mut(node)?.pivot_offset = offset;
        Ok(())
    }

    fn set_color(&mut self, node: NodeHandle, rgb: [f32; 3]) -> Result<(), SceneError> {
        self.node_mut(node)?.color = rgb;
        Ok(())
    }

    fn record_keyframe(
        &mut self,
        node: NodeHandle,
        attribute: Attribute,
        frame: f32,
    ) -> Result<(), SceneError> {
        self.check(FailPoint::Keyframe)?;
        let now = self.frame;
        let n = self.node_mut(node)?;
        let axis = attribute.axis();
        let value = n.value(attribute, now);
        n.curves[axis]
            .get_or_insert_with(Curve::new)
            .insert(Keyframe::new(frame, value));
        n.staged[axis] = false;
        // Later `move_to`s on this attribute stage until the next key.
        n.translate[axis] = value;
        Ok(())
    }

    fn set_infinity(
        &mut self,
        node: NodeHandle,
        attribute: Attribute,
        mode: InfinityMode,
    ) -> Result<(), SceneError> {
        self.check(FailPoint::Keyframe)?;
        let n = self.node_mut(node)?;
        match n.curves[attribute.axis()].as_mut() {
            Some(curve) => {
                curve.set_infinity(mode);
                Ok(())
            }
            None => Err(SceneError::KeyframeFailed(format!(
                "{} has no {} curve",
                n.name,
                attribute.as_str()
            ))),
        }
    }

    fn clear_keyframes(
        &mut self,
        node: NodeHandle,
        attribute: Attribute,
    ) -> Result<(), SceneError> {
        self.check(FailPoint::Keyframe)?;
        let now = self.frame;
        let n = self.node_mut(node)?;
        let axis = attribute.axis();
        let value = n.value(attribute, now);
        n.translate[axis] = value;
        n.curves[axis] = None;
        n.staged[axis] = false;
        Ok(())
    }

    fn world_position(&self, node: NodeHandle) -> Result<Vec3, SceneError> {
        self.check(FailPoint::Query)?;
        Ok(self.node(node)?.position(self.frame))
    }

    fn set_timeline_position(&mut self, frame: f32) {
        self.frame = frame;
        for n in self.nodes.values_mut() {
            n.staged = [false; 3];
        }
    }

    fn timeline_position(&self) -> f32 {
        self.frame
    }

    fn query_world_aabb(&self, node: NodeHandle) -> Result<Aabb, SceneError> {
        self.check(FailPoint::Query)?;
        let n = self.node(node)?;
        Ok(Aabb::from_center_size(n.position(self.frame), n.size))
    }

    fn find_node(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(handle, _)| *handle)
    }

    fn delete_nodes(&mut self, nodes: &[NodeHandle]) -> Result<(), SceneError> {
        self.check(FailPoint::Delete)?;
        let mut missing = None;
        for node in nodes {
            if self.nodes.remove(node).is_none() && missing.is_none() {
                missing = Some(*node);
            }
        }
        match missing {
            Some(node) => Err(SceneError::UnknownNode(node)),
            None => Ok(()),
        }
    }

    fn delete_all(&mut self) -> Result<(), SceneError> {
        self.check(FailPoint::Delete)?;
        self.nodes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(scene: &mut MemoryScene) -> NodeHandle {
        scene.create_box(Vec3::ONE, "box").unwrap()
    }

    #[test]
    fn create_rejects_degenerate_sizes() {
        let mut scene = MemoryScene::new();
        assert!(scene.create_box(Vec3::new(1.0, 0.0, 1.0), "flat").is_err());
        assert!(scene.create_box(Vec3::new(1.0, f32::NAN, 1.0), "nan").is_err());
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn aabb_is_centred_on_translation() {
        let mut scene = MemoryScene::new();
        let node = scene.create_box(Vec3::new(2.0, 4.0, 6.0), "b").unwrap();
        scene.move_to(node, Vec3::new(1.0, 3.0, 0.0)).unwrap();
        let aabb = scene.query_world_aabb(node).unwrap();
        assert_eq!(aabb.min, Vec3::new(0.0, 1.0, -3.0));
        assert_eq!(aabb.max, Vec3::new(2.0, 5.0, 3.0));
    }

    #[test]
    fn pivot_offset_moves_only_the_pivot() {
        let mut scene = MemoryScene::new();
        let node = scene.create_box(Vec3::new(2.0, 4.0, 2.0), "b").unwrap();
        scene.set_pivot_offset(node, Vec3::new(0.0, -2.0, 0.0)).unwrap();
        scene.move_to(node, Vec3::new(0.0, 3.0, 0.0)).unwrap();
        assert_eq!(scene.pivot_world(node), Some(Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(scene.query_world_aabb(node).unwrap().min.y, 1.0);
    }

    #[test]
    fn keyed_attribute_follows_timeline() {
        let mut scene = MemoryScene::new();
        let node = unit_box(&mut scene);
        scene.move_to(node, Vec3::new(0.0, 0.0, 0.0)).unwrap();
        scene.record_keyframe(node, Attribute::TranslateX, 0.0).unwrap();
        scene.move_to(node, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        scene.record_keyframe(node, Attribute::TranslateX, 10.0).unwrap();

        scene.set_timeline_position(5.0);
        assert_eq!(scene.world_position(node).unwrap().x, 5.0);
        scene.set_timeline_position(20.0);
        assert_eq!(scene.world_position(node).unwrap().x, 10.0);

        scene
            .set_infinity(node, Attribute::TranslateX, InfinityMode::Cycle)
            .unwrap();
        assert_eq!(scene.world_position(node).unwrap().x, 0.0);
    }

    #[test]
    fn clear_keyframes_freezes_sampled_value() {
        let mut scene = MemoryScene::new();
        let node = unit_box(&mut scene);
        scene.record_keyframe(node, Attribute::TranslateX, 0.0).unwrap();
        scene.move_to(node, Vec3::new(8.0, 0.0, 0.0)).unwrap();
        scene.record_keyframe(node, Attribute::TranslateX, 8.0).unwrap();
        scene.set_timeline_position(2.0);

        scene.clear_keyframes(node, Attribute::TranslateX).unwrap();
        assert!(!scene.is_animated(node));
        scene.set_timeline_position(7.0);
        assert_eq!(scene.world_position(node).unwrap().x, 2.0);
    }

    #[test]
    fn clear_without_curve_is_a_no_op() {
        let mut scene = MemoryScene::new();
        let node = unit_box(&mut scene);
        scene.move_to(node, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        scene.clear_keyframes(node, Attribute::TranslateY).unwrap();
        assert_eq!(scene.world_position(node).unwrap(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn set_infinity_requires_a_curve() {
        let mut scene = MemoryScene::new();
        let node = unit_box(&mut scene);
        assert!(matches!(
            scene.set_infinity(node, Attribute::TranslateX, InfinityMode::Cycle),
            Err(SceneError::KeyframeFailed(_))
        ));
    }

    #[test]
    fn unknown_nodes_are_reported() {
        let mut scene = MemoryScene::new();
        let ghost = NodeHandle(99);
        assert_eq!(
            scene.move_to(ghost, Vec3::ZERO),
            Err(SceneError::UnknownNode(ghost))
        );
        assert_eq!(
            scene.query_world_aabb(ghost),
            Err(SceneError::UnknownNode(ghost))
        );
    }

    #[test]
    fn delete_nodes_removes_what_exists_then_reports_missing() {
        let mut scene = MemoryScene::new();
        let a = unit_box(&mut scene);
        let b = unit_box(&mut scene);
        let ghost = NodeHandle(99);
        assert_eq!(
            scene.delete_nodes(&[a, ghost, b]),
            Err(SceneError::UnknownNode(ghost))
        );
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn find_node_by_name() {
        let mut scene = MemoryScene::new();
        let base = scene.create_box(Vec3::ONE, "baseBlock").unwrap();
        assert_eq!(scene.find_node("baseBlock"), Some(base));
        assert_eq!(scene.find_node("block_1"), None);
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut scene = MemoryScene::new();
        scene.fail_next(FailPoint::Create);
        assert!(matches!(
            scene.create_box(Vec3::ONE, "a"),
            Err(SceneError::CreateFailed(_))
        ));
        assert!(scene.create_box(Vec3::ONE, "a").is_ok());
    }

    #[test]
    fn injected_failure_waits_for_its_kind() {
        let mut scene = MemoryScene::new();
        scene.fail_next(FailPoint::Delete);
        let node = unit_box(&mut scene);
        assert!(scene.query_world_aabb(node).is_ok());
        assert!(scene.delete_all().is_err());
        assert!(scene.delete_all().is_ok());
    }
}
