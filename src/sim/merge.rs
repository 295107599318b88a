//! Deferred merge resolution
//!
//! Contacts between equal-rank shapes are detected inside the physics step
//! but never applied there. The contact handler only records the pair; the
//! queue is drained at the next frame boundary, where each pair is checked
//! again before anything is retired or spawned.

use glam::Vec2;

use super::arena::Arena;
use super::physics::BodyTag;
use super::pool::{PoolError, ShapePool};
use super::shape::ShapeHandle;
use crate::consts::MAX_SIDES;
use crate::tuning::Tuning;

/// A detected, not yet applied, merge between two shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMerge {
    pub a: ShapeHandle,
    pub b: ShapeHandle,
}

impl PendingMerge {
    fn involves(&self, a: ShapeHandle, b: ShapeHandle) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

/// What a resolved merge produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOutcome {
    pub consumed: [ShapeHandle; 2],
    pub output: ShapeHandle,
    pub rank: u32,
    pub scale: f32,
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Merge tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeRules {
    /// Applied to the sum of input scales past the side cap
    pub scale_factor: f32,
    /// Applied to the averaged input velocity
    pub velocity_damping: f32,
}

impl Default for MergeRules {
    fn default() -> Self {
        Self {
            scale_factor: 0.55,
            velocity_damping: 0.8,
        }
    }
}

impl From<&Tuning> for MergeRules {
    fn from(tuning: &Tuning) -> Self {
        Self {
            scale_factor: tuning.merge_scale_factor,
            velocity_damping: tuning.merge_velocity_damping,
        }
    }
}

/// Rank produced by fusing two shapes
#[inline]
pub fn merged_rank(rank_a: u32, rank_b: u32) -> u32 {
    rank_a.max(rank_b) + 1
}

/// Scale produced by fusing two shapes into `rank`
#[inline]
pub fn merged_scale(rank: u32, scale_a: f32, scale_b: f32, factor: f32) -> f32 {
    if rank <= MAX_SIDES {
        1.0
    } else {
        factor * (scale_a + scale_b)
    }
}

/// Merges waiting for the next frame boundary, in detection order
#[derive(Debug, Default)]
pub struct MergeQueue {
    pending: Vec<PendingMerge>,
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contact-begin handler. Queues equal-rank live shape pairs and returns
    /// whether the physics engine should apply a normal collision response.
    pub fn on_contact(&mut self, pool: &ShapePool, a: BodyTag, b: BodyTag) -> bool {
        let (Some(ha), Some(hb)) = (a.shape(), b.shape()) else {
            return true;
        };
        let (Some(sa), Some(sb)) = (pool.get(ha), pool.get(hb)) else {
            return true;
        };
        if sa.rank != sb.rank {
            return true;
        }

        if !self.pending.iter().any(|p| p.involves(ha, hb)) {
            log::trace!("Merge detected {} + {} (rank {})", ha, hb, sa.rank);
            self.pending.push(PendingMerge { a: ha, b: hb });
        }
        false
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Take every pending merge, leaving the queue empty
    pub fn drain(&mut self) -> Vec<PendingMerge> {
        std::mem::take(&mut self.pending)
    }
}

/// Apply one deferred merge. Returns `Ok(None)` when either participant was
/// already consumed (or otherwise retired) since it was detected.
pub fn resolve(
    arena: &mut Arena,
    pending: PendingMerge,
    rules: &MergeRules,
) -> Result<Option<MergeOutcome>, PoolError> {
    let PendingMerge { a, b } = pending;
    if !arena.is_live(a) || !arena.is_live(b) {
        log::trace!("Merge {} + {} rejected, participant gone", a, b);
        return Ok(None);
    }

    let (Some(shape_a), Some(shape_b)) = (arena.shape(a), arena.shape(b)) else {
        return Ok(None);
    };
    let rank = merged_rank(shape_a.rank, shape_b.rank);
    let scale = merged_scale(rank, shape_a.scale, shape_b.scale, rules.scale_factor);

    let (Some(state_a), Some(state_b)) = (arena.body_state(a), arena.body_state(b)) else {
        return Ok(None);
    };
    let pos = (state_a.pos + state_b.pos) * 0.5;
    let vel = (state_a.vel + state_b.vel) * 0.5 * rules.velocity_damping;

    arena.retire(a);
    arena.retire(b);

    let output = arena.spawn(rank, pos)?;
    arena.set_velocity(output, vel);
    if rank > MAX_SIDES {
        arena.rescale(output, scale);
    }

    log::debug!("Merged {} + {} into {} (rank {}, scale {:.2})", a, b, output, rank, scale);
    Ok(Some(MergeOutcome {
        consumed: [a, b],
        output,
        rank,
        scale,
        pos,
        vel,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::Bounds;
    use crate::sim::collision::CirclePhysics;
    use crate::sim::physics::WallSide;
    use crate::sim::scene::NullScene;

    fn test_arena() -> Arena {
        let tuning = Tuning::default();
        Arena::new(
            Bounds::from_size(400.0, 450.0),
            &tuning,
            Box::new(CirclePhysics::new(Vec2::ZERO)),
            Box::new(NullScene),
        )
    }

    #[test]
    fn test_merged_rank_and_scale() {
        assert_eq!(merged_rank(3, 3), 4);
        assert_eq!(merged_rank(29, 29), 30);
        assert_eq!(merged_scale(30, 1.0, 1.0, 0.55), 1.0);
        assert!((merged_scale(31, 1.0, 1.0, 0.55) - 1.1).abs() < 1e-6);
        assert!((merged_scale(40, 1.5, 2.0, 0.55) - 1.925).abs() < 1e-6);
    }

    #[test]
    fn test_on_contact_queues_equal_ranks_only() {
        let mut arena = test_arena();
        let a = arena.spawn(4, Vec2::new(100.0, 100.0)).unwrap();
        let b = arena.spawn(4, Vec2::new(140.0, 100.0)).unwrap();
        let c = arena.spawn(5, Vec2::new(180.0, 100.0)).unwrap();
        let mut queue = MergeQueue::new();

        assert!(!queue.on_contact(arena.pool(), BodyTag::Shape(a), BodyTag::Shape(b)));
        assert!(queue.on_contact(arena.pool(), BodyTag::Shape(b), BodyTag::Shape(c)));
        assert!(queue.on_contact(
            arena.pool(),
            BodyTag::Shape(a),
            BodyTag::Wall(WallSide::Bottom)
        ));
        assert_eq!(queue.len(), 1);

        // Reported twice (either order) still queues once
        assert!(!queue.on_contact(arena.pool(), BodyTag::Shape(b), BodyTag::Shape(a)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_on_contact_ignores_retired_shapes() {
        let mut arena = test_arena();
        let a = arena.spawn(4, Vec2::new(100.0, 100.0)).unwrap();
        let b = arena.spawn(4, Vec2::new(140.0, 100.0)).unwrap();
        arena.retire(b);
        let mut queue = MergeQueue::new();
        assert!(queue.on_contact(arena.pool(), BodyTag::Shape(a), BodyTag::Shape(b)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_resolve_midpoint_and_damped_velocity() {
        let mut arena = test_arena();
        let a = arena.spawn(6, Vec2::new(100.0, 100.0)).unwrap();
        let b = arena.spawn(6, Vec2::new(140.0, 120.0)).unwrap();
        arena.set_velocity(a, Vec2::new(10.0, 0.0));
        arena.set_velocity(b, Vec2::new(0.0, -20.0));

        let outcome = resolve(&mut arena, PendingMerge { a, b }, &MergeRules::default())
            .unwrap()
            .unwrap();
        assert_eq!(outcome.rank, 7);
        assert_eq!(outcome.scale, 1.0);
        assert_eq!(outcome.pos, Vec2::new(120.0, 110.0));
        assert!((outcome.vel - Vec2::new(4.0, -8.0)).length() < 1e-5);

        assert!(!arena.is_live(a));
        assert!(!arena.is_live(b));
        assert!(arena.is_live(outcome.output));
        assert_eq!(arena.shape_count(), 1);
        let state = arena.body_state(outcome.output).unwrap();
        assert!((state.vel - outcome.vel).length() < 1e-5);
    }

    #[test]
    fn test_resolve_past_side_cap_scales() {
        let mut arena = test_arena();
        let a = arena.spawn(30, Vec2::new(100.0, 200.0)).unwrap();
        let b = arena.spawn(30, Vec2::new(300.0, 200.0)).unwrap();

        let outcome = resolve(&mut arena, PendingMerge { a, b }, &MergeRules::default())
            .unwrap()
            .unwrap();
        assert_eq!(outcome.rank, 31);
        assert!((outcome.scale - 1.1).abs() < 1e-6);
        let shape = arena.shape(outcome.output).unwrap();
        assert_eq!(shape.sides, 30);
        assert!((shape.scale - 1.1).abs() < 1e-6);

        // Next tier keeps growing from the merged scales
        let c = arena.spawn(31, Vec2::new(200.0, 350.0)).unwrap();
        arena.rescale(c, 1.1);
        let outcome = resolve(
            &mut arena,
            PendingMerge { a: outcome.output, b: c },
            &MergeRules::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(outcome.rank, 32);
        assert!((outcome.scale - 0.55 * 2.2).abs() < 1e-5);
    }

    #[test]
    fn test_three_way_contact_merges_exactly_once() {
        let mut arena = test_arena();
        let a = arena.spawn(5, Vec2::new(200.0, 200.0)).unwrap();
        let b = arena.spawn(5, Vec2::new(230.0, 200.0)).unwrap();
        let c = arena.spawn(5, Vec2::new(215.0, 225.0)).unwrap();

        let mut queue = MergeQueue::new();
        arena.step_physics(1.0 / 60.0, &mut queue);
        assert_eq!(queue.len(), 3, "every touching pair is detected");

        let rules = MergeRules::default();
        let outcomes: Vec<_> = queue
            .drain()
            .into_iter()
            .filter_map(|p| resolve(&mut arena, p, &rules).unwrap())
            .collect();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(arena.shape_count(), 2);
        let consumed = outcomes[0].consumed;
        let survivor = [a, b, c]
            .into_iter()
            .find(|h| !consumed.contains(h))
            .unwrap();
        assert!(arena.is_live(survivor));
        assert_eq!(arena.shape(survivor).unwrap().rank, 5);
        assert_eq!(arena.shape(outcomes[0].output).unwrap().rank, 6);
    }

    #[test]
    fn test_stale_handle_rejected_after_slot_reuse() {
        let tuning = Tuning {
            pool_warmup: 0,
            ..Tuning::default()
        };
        let mut arena = Arena::new(
            Bounds::from_size(400.0, 450.0),
            &tuning,
            Box::new(CirclePhysics::new(Vec2::ZERO)),
            Box::new(NullScene),
        );
        let a = arena.spawn(4, Vec2::new(100.0, 200.0)).unwrap();
        let b = arena.spawn(4, Vec2::new(300.0, 200.0)).unwrap();
        let c = arena.spawn(4, Vec2::new(200.0, 300.0)).unwrap();
        let rules = MergeRules::default();

        // a's slot is released first, so the merge output reuses it
        let first = resolve(&mut arena, PendingMerge { a, b }, &rules).unwrap().unwrap();
        assert_eq!(first.output.index(), a.index());
        assert_ne!(first.output, a);

        // A pair queued against the old a must not touch the new occupant
        assert_eq!(resolve(&mut arena, PendingMerge { a, b: c }, &rules).unwrap(), None);
        assert!(arena.is_live(first.output));
        assert!(arena.is_live(c));
        assert_eq!(arena.shape(first.output).unwrap().rank, 5);
    }

    #[test]
    fn test_resolve_rejects_shape_without_body() {
        let mut arena = test_arena();
        let a = arena.spawn(4, Vec2::new(100.0, 200.0)).unwrap();
        let b = arena.spawn(4, Vec2::new(140.0, 200.0)).unwrap();
        arena.physics_mut().remove_body(BodyTag::Shape(b));

        assert_eq!(
            resolve(&mut arena, PendingMerge { a, b }, &MergeRules::default()).unwrap(),
            None
        );
        assert!(arena.is_live(a));
    }
}
