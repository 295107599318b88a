//! Arena state
//!
//! The live set of shapes together with their physics bodies and scene
//! views, the bounding box, and the spacing rule for manual placement.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::merge::MergeQueue;
use super::physics::{BodyDesc, BodyState, BodyTag, PhysicsWorld, WallSide};
use super::pool::{PoolError, ShapePool};
use super::scene::{Scene, ShapeView};
use super::shape::{Shape, ShapeHandle, base_radius};
use crate::tuning::Tuning;

/// Axis-aligned arena rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec2,
    pub size: Vec2,
}

impl Bounds {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self { center, size }
    }

    /// Rectangle of the given size with its bottom-left corner at the origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(Vec2::new(width, height) / 2.0, Vec2::new(width, height))
    }

    /// Size the arena for a viewport: half its width (200..=400) by 70% of
    /// its height (300..=450), centered
    pub fn fit_to_viewport(width: f32, height: f32) -> Self {
        let box_w = (width * 0.5).clamp(200.0, 400.0);
        let box_h = (height * 0.7).clamp(300.0, 450.0);
        Self::new(Vec2::new(width, height) / 2.0, Vec2::new(box_w, box_h))
    }

    #[inline]
    pub fn half(&self) -> Vec2 {
        self.size / 2.0
    }

    pub fn left(&self) -> f32 {
        self.center.x - self.size.x / 2.0
    }

    pub fn right(&self) -> f32 {
        self.center.x + self.size.x / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.center.y - self.size.y / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center.y + self.size.y / 2.0
    }

    /// Whether `p` lies inside the rectangle shrunk by `margin` on every side
    pub fn contains_with_margin(&self, p: Vec2, margin: f32) -> bool {
        p.x >= self.left() + margin
            && p.x <= self.right() - margin
            && p.y >= self.bottom() + margin
            && p.y <= self.top() - margin
    }
}

/// The shapes in play and everything attached to them
pub struct Arena {
    pub bounds: Bounds,
    pool: ShapePool,
    physics: Box<dyn PhysicsWorld>,
    scene: Box<dyn Scene>,
    placement_margin: f32,
    spacing_padding: f32,
}

impl Arena {
    pub fn new(
        bounds: Bounds,
        tuning: &Tuning,
        mut physics: Box<dyn PhysicsWorld>,
        scene: Box<dyn Scene>,
    ) -> Self {
        let t = tuning.wall_thickness;
        let half = bounds.half();
        for side in WallSide::ALL {
            let (offset, extents) = match side {
                WallSide::Left => (Vec2::new(-half.x, 0.0), Vec2::new(t / 2.0, half.y)),
                WallSide::Right => (Vec2::new(half.x, 0.0), Vec2::new(t / 2.0, half.y)),
                WallSide::Bottom => (Vec2::new(0.0, -half.y), Vec2::new(half.x, t / 2.0)),
                WallSide::Top => (Vec2::new(0.0, half.y), Vec2::new(half.x, t / 2.0)),
            };
            physics.add_body(
                BodyTag::Wall(side),
                BodyDesc::wall(extents).with_position(bounds.center + offset),
            );
        }
        physics.set_gravity(tuning.gravity);

        Self {
            bounds,
            pool: ShapePool::with_warmup(tuning.pool_warmup),
            physics,
            scene,
            placement_margin: tuning.placement_margin,
            spacing_padding: tuning.spacing_padding,
        }
    }

    pub fn pool(&self) -> &ShapePool {
        &self.pool
    }

    pub fn physics(&self) -> &dyn PhysicsWorld {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> &mut dyn PhysicsWorld {
        self.physics.as_mut()
    }

    pub fn shape(&self, handle: ShapeHandle) -> Option<&Shape> {
        self.pool.get(handle)
    }

    pub fn shapes(&self) -> impl Iterator<Item = (ShapeHandle, &Shape)> + '_ {
        self.pool.iter_active()
    }

    pub fn shape_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Acquire a shape, give it a body and show it
    pub fn spawn(&mut self, rank: u32, pos: Vec2) -> Result<ShapeHandle, PoolError> {
        let handle = self.pool.acquire(rank, pos)?;
        if let Some(shape) = self.pool.get(handle) {
            self.physics.add_body(BodyTag::Shape(handle), Self::body_for(shape));
            self.scene.attach(handle, &ShapeView::from(shape));
        }
        Ok(handle)
    }

    /// Remove the body, hide the view and return the shape to the pool.
    /// Returns false if the handle was not live.
    pub fn retire(&mut self, handle: ShapeHandle) -> bool {
        if !self.pool.is_active(handle) {
            return false;
        }
        self.physics.remove_body(BodyTag::Shape(handle));
        self.scene.detach(handle);
        self.pool.release(handle)
    }

    /// Retire every shape in play
    pub fn clear(&mut self) -> usize {
        let handles: Vec<_> = self.pool.active_handles().collect();
        handles.into_iter().filter(|&h| self.retire(h)).count()
    }

    /// Still placed in the arena and still owning a body
    pub fn is_live(&self, handle: ShapeHandle) -> bool {
        self.pool.is_active(handle) && self.physics.has_body(BodyTag::Shape(handle))
    }

    /// Current body state, falling back to the mirrored shape state
    pub fn body_state(&self, handle: ShapeHandle) -> Option<BodyState> {
        self.physics
            .body_state(BodyTag::Shape(handle))
            .or_else(|| {
                self.pool.get(handle).map(|s| BodyState {
                    pos: s.pos,
                    vel: s.vel,
                })
            })
    }

    pub fn set_velocity(&mut self, handle: ShapeHandle, vel: Vec2) {
        if let Some(shape) = self.pool.get_mut(handle) {
            shape.vel = vel;
            self.physics.set_velocity(BodyTag::Shape(handle), vel);
        }
    }

    /// Change a shape's scale and rebuild its body and view to match
    pub fn rescale(&mut self, handle: ShapeHandle, scale: f32) {
        let tag = BodyTag::Shape(handle);
        let state = self.physics.body_state(tag);
        let Some(shape) = self.pool.get_mut(handle) else {
            return;
        };
        shape.scale = scale;
        if let Some(state) = state {
            shape.pos = state.pos;
            shape.vel = state.vel;
        }

        let desc = Self::body_for(shape);
        let view = ShapeView::from(&*shape);
        self.physics.remove_body(tag);
        self.physics.add_body(tag, desc);
        self.scene.refresh(handle, &view);
    }

    fn body_for(shape: &Shape) -> BodyDesc {
        BodyDesc::polygon(shape.polygon(), shape.radius())
            .with_position(shape.pos)
            .with_velocity(shape.vel)
    }

    /// Step physics. The contact handler only sees the pool read-only and
    /// can only queue merges, so nothing is retired mid-step.
    pub fn step_physics(&mut self, dt: f32, merges: &mut MergeQueue) {
        let pool = &self.pool;
        self.physics
            .step(dt, &mut |a, b| merges.on_contact(pool, a, b));
    }

    /// Copy body positions and velocities back onto the shapes
    pub fn sync_from_physics(&mut self) {
        let handles: Vec<_> = self.pool.active_handles().collect();
        for handle in handles {
            let Some(state) = self.physics.body_state(BodyTag::Shape(handle)) else {
                continue;
            };
            if let Some(shape) = self.pool.get_mut(handle) {
                shape.pos = state.pos;
                shape.vel = state.vel;
            }
        }
    }

    /// Inside the arena minus the placement margin
    pub fn in_placement_region(&self, p: Vec2) -> bool {
        self.bounds.contains_with_margin(p, self.placement_margin)
    }

    /// Minimum center distance between a new shape of `rank` and `existing`
    pub fn min_spacing(&self, rank: u32, existing: &Shape) -> f32 {
        (base_radius(rank) + base_radius(existing.rank)) * existing.scale + self.spacing_padding
    }

    /// No active shape within its spacing distance of `p`
    pub fn is_space_available(&self, p: Vec2, rank: u32) -> bool {
        self.pool
            .iter_active()
            .all(|(_, s)| p.distance(s.pos) >= self.min_spacing(rank, s))
    }

    /// First free point on a grid over the placement region, scanning from
    /// the top row down
    pub fn find_free_spot(&self, rank: u32) -> Option<Vec2> {
        let step = base_radius(rank);
        let m = self.placement_margin;
        let (left, right) = (self.bounds.left() + m, self.bounds.right() - m);
        let (bottom, top) = (self.bounds.bottom() + m, self.bounds.top() - m);
        if left > right || bottom > top {
            return None;
        }

        let cols = ((right - left) / step).floor() as u32;
        let rows = ((top - bottom) / step).floor() as u32;
        (0..=rows)
            .flat_map(|r| (0..=cols).map(move |c| Vec2::new(left + c as f32 * step, top - r as f32 * step)))
            .find(|&p| self.is_space_available(p, rank))
    }
}
