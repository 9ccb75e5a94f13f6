//! Collision / stack judge
//!
//! Decides whether a freshly landed block leaves a valid tower or collapses it.
//! The judge only compares world-space axis-aligned bounding boxes; there is no
//! rigid-body simulation.
//!
//! # Rules
//!
//! - [`CollisionRule::Unsupported`] (default): the landed box collapses the
//!   tower when it shares no x/z footprint with any placed box whose top face
//!   it rests on. Vertical adjacency is the expected outcome of a landing.
//! - [`CollisionRule::Overlap`]: the landed box overlapping any placed box (all
//!   three axes, inclusive) collapses the tower. Touching faces overlap, so a
//!   block landed over the stack collapses it and a miss is safe.
//!
//! Both rules short-circuit on the first deciding box and always accept the
//! first block of a session (empty stack).

use glam::Vec3;
use tracing::debug;

use crate::types::{CollisionRule, CONTACT_EPSILON};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// `(minX, minY, minZ, maxX, maxY, maxZ)`, the layout hosts usually report.
    pub fn from_array(v: [f32; 6]) -> Self {
        Self {
            min: Vec3::new(v[0], v[1], v[2]),
            max: Vec3::new(v[3], v[4], v[5]),
        }
    }

    pub fn to_array(&self) -> [f32; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Top surface height.
    pub fn top(&self) -> f32 {
        self.max.y
    }

    /// Inclusive overlap on x, y and z. Faces within [`CONTACT_EPSILON`] touch.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let eps = Vec3::splat(CONTACT_EPSILON);
        self.min.cmple(other.max + eps).all() && self.max.cmpge(other.min - eps).all()
    }

    /// Inclusive overlap on x and z only.
    pub fn overlaps_footprint(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// True when this box's bottom face lies on `other`'s top face.
    pub fn rests_on(&self, other: &Aabb) -> bool {
        (self.min.y - other.max.y).abs() <= CONTACT_EPSILON
    }
}

/// Why a landing collapsed the tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseCause {
    /// Overlapped the placed block at this stack position.
    Overlap { with: usize },
    /// Nothing under the block supports it.
    Unsupported,
}

/// Judge verdict for a landed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Collapse(CollapseCause),
}

impl Verdict {
    pub fn is_collapse(&self) -> bool {
        matches!(self, Verdict::Collapse(_))
    }
}

/// Applies a [`CollisionRule`] to a landed block and the placed stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackJudge {
    rule: CollisionRule,
}

impl StackJudge {
    pub fn new(rule: CollisionRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> CollisionRule {
        self.rule
    }

    /// Judge `landed` against `placed` (base platform excluded), oldest first.
    pub fn judge(&self, landed: &Aabb, placed: &[Aabb]) -> Verdict {
        if placed.is_empty() {
            return Verdict::Safe;
        }

        let verdict = match self.rule {
            CollisionRule::Overlap => placed
                .iter()
                .position(|other| landed.overlaps(other))
                .map_or(Verdict::Safe, |with| {
                    Verdict::Collapse(CollapseCause::Overlap { with })
                }),
            CollisionRule::Unsupported => {
                let supported = placed
                    .iter()
                    .any(|other| landed.rests_on(other) && landed.overlaps_footprint(other));
                if supported {
                    Verdict::Safe
                } else {
                    Verdict::Collapse(CollapseCause::Unsupported)
                }
            }
        };

        debug!(rule = self.rule.as_str(), placed = placed.len(), ?verdict, "stack judged");
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(x: f32, y_min: f32, z: f32, size: f32) -> Aabb {
        Aabb::new(
            Vec3::new(x - size / 2.0, y_min, z - size / 2.0),
            Vec3::new(x + size / 2.0, y_min + size, z + size / 2.0),
        )
    }

    #[test]
    fn overlap_is_symmetric() {
        let cases = [
            (cube(0.0, 0.0, 0.0, 2.0), cube(1.0, 1.0, 1.0, 2.0)),
            (cube(0.0, 0.0, 0.0, 2.0), cube(5.0, 0.0, 0.0, 2.0)),
            (cube(0.0, 0.0, 0.0, 2.0), cube(2.0, 0.0, 0.0, 2.0)),
            (cube(0.0, 0.0, 0.0, 4.0), cube(0.0, 1.0, 0.0, 1.0)),
        ];
        for (a, b) in cases {
            assert_eq!(a.overlaps(&b), b.overlaps(&a));
            assert_eq!(a.overlaps_footprint(&b), b.overlaps_footprint(&a));
        }
    }

    #[test]
    fn overlap_requires_all_three_axes() {
        let a = cube(0.0, 0.0, 0.0, 2.0);
        assert!(a.overlaps(&cube(1.0, 1.0, 1.0, 2.0)));
        assert!(!a.overlaps(&cube(0.0, 0.0, 5.0, 2.0)));
        assert!(!a.overlaps(&cube(0.0, 5.0, 0.0, 2.0)));
        assert!(!a.overlaps(&cube(5.0, 0.0, 0.0, 2.0)));
    }

    #[test]
    fn touching_faces_overlap_inclusively() {
        let a = cube(0.0, 0.0, 0.0, 2.0);
        assert!(a.overlaps(&cube(2.0, 0.0, 0.0, 2.0)));
    }

    #[test]
    fn faces_touch_despite_rounding() {
        let below = cube(0.0, 1.0, 0.0, 4.0);
        let above = cube(0.0, 5.0 + CONTACT_EPSILON / 2.0, 0.0, 4.0);
        assert!(above.overlaps(&below));
        assert!(!cube(0.0, 5.5, 0.0, 4.0).overlaps(&below));
    }

    #[test]
    fn containment_overlaps() {
        let outer = cube(0.0, 0.0, 0.0, 10.0);
        let inner = cube(0.0, 4.0, 0.0, 1.0);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn rests_on_within_epsilon() {
        let below = cube(0.0, 0.0, 0.0, 2.0);
        assert!(cube(0.0, 2.0, 0.0, 2.0).rests_on(&below));
        assert!(cube(0.0, 2.0 + CONTACT_EPSILON / 2.0, 0.0, 2.0).rests_on(&below));
        assert!(!cube(0.0, 2.5, 0.0, 2.0).rests_on(&below));
    }

    #[test]
    fn aabb_array_layout() {
        let b = Aabb::from_array([-1.0, 0.0, -2.0, 1.0, 4.0, 2.0]);
        assert_eq!(b.size(), Vec3::new(2.0, 4.0, 4.0));
        assert_eq!(b.center(), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(b.to_array(), [-1.0, 0.0, -2.0, 1.0, 4.0, 2.0]);
    }

    #[test]
    fn empty_stack_is_always_safe() {
        let landed = cube(0.0, 1.0, 0.0, 3.0);
        for rule in [CollisionRule::Overlap, CollisionRule::Unsupported] {
            assert_eq!(StackJudge::new(rule).judge(&landed, &[]), Verdict::Safe);
        }
    }

    #[test]
    fn overlap_rule_counts_a_resting_block() {
        let judge = StackJudge::new(CollisionRule::Overlap);
        let below = cube(0.0, 1.0, 0.0, 4.0);
        let on_top = cube(0.5, 5.0, 0.0, 4.0);
        assert!(on_top.rests_on(&below));
        assert_eq!(
            judge.judge(&on_top, &[below]),
            Verdict::Collapse(CollapseCause::Overlap { with: 0 })
        );
    }

    #[test]
    fn overlap_rule_collapses_on_interpenetration() {
        let judge = StackJudge::new(CollisionRule::Overlap);
        let placed = [cube(20.0, 1.0, 0.0, 4.0), cube(0.0, 1.0, 0.0, 4.0)];
        let sunk = cube(1.0, 3.0, 0.0, 4.0);
        assert_eq!(
            judge.judge(&sunk, &placed),
            Verdict::Collapse(CollapseCause::Overlap { with: 1 })
        );
    }

    #[test]
    fn overlap_rule_short_circuits_on_first_hit() {
        let judge = StackJudge::new(CollisionRule::Overlap);
        let placed = [cube(0.0, 1.0, 0.0, 4.0), cube(0.0, 1.5, 0.0, 4.0)];
        let sunk = cube(0.0, 2.0, 0.0, 4.0);
        assert_eq!(
            judge.judge(&sunk, &placed),
            Verdict::Collapse(CollapseCause::Overlap { with: 0 })
        );
    }

    #[test]
    fn unsupported_rule_accepts_block_over_the_stack() {
        let judge = StackJudge::new(CollisionRule::Unsupported);
        let below = cube(0.0, 1.0, 0.0, 4.0);
        let on_top = cube(3.0, 5.0, 0.0, 4.0);
        assert_eq!(judge.judge(&on_top, &[below]), Verdict::Safe);
    }

    #[test]
    fn unsupported_rule_collapses_block_beside_the_stack() {
        let judge = StackJudge::new(CollisionRule::Unsupported);
        let below = cube(0.0, 1.0, 0.0, 4.0);
        let beside = cube(9.0, 5.0, 0.0, 4.0);
        assert_eq!(
            judge.judge(&beside, &[below]),
            Verdict::Collapse(CollapseCause::Unsupported)
        );
        assert!(judge.judge(&beside, &[below]).is_collapse());
    }

    #[test]
    fn the_two_rules_are_inverse_on_the_stack_top() {
        let below = cube(0.0, 1.0, 0.0, 4.0);
        let beside = cube(9.0, 5.0, 0.0, 4.0);
        let on_top = cube(1.0, 5.0, 0.0, 4.0);

        let overlap = StackJudge::new(CollisionRule::Overlap);
        assert_eq!(overlap.judge(&beside, &[below]), Verdict::Safe);
        assert!(overlap.judge(&on_top, &[below]).is_collapse());

        let unsupported = StackJudge::new(CollisionRule::Unsupported);
        assert!(unsupported.judge(&beside, &[below]).is_collapse());
        assert_eq!(unsupported.judge(&on_top, &[below]), Verdict::Safe);
    }

    #[test]
    fn default_rule_is_unsupported() {
        assert_eq!(StackJudge::default().rule(), CollisionRule::Unsupported);
    }
}
