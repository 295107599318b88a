//! Shape entities and rank geometry
//!
//! A shape's rank drives everything about it: side count (capped), radius,
//! and, past the cap, a scale factor that keeps higher tiers distinguishable.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Generational reference to a pooled shape slot.
///
/// The generation changes every time the slot is handed out again, so a
/// handle captured before a shape was recycled never matches its next life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeHandle {
    index: u32,
    generation: u32,
}

impl ShapeHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the pool
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Acquisition count of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ShapeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Polygon side count for a rank
#[inline]
pub fn sides_for_rank(rank: u32) -> u32 {
    rank.min(MAX_SIDES)
}

/// Unscaled radius for a rank (`20 + (min(rank, 30) - 3) * 3`)
#[inline]
pub fn base_radius(rank: u32) -> f32 {
    BASE_RADIUS + sides_for_rank(rank).saturating_sub(MIN_RANK) as f32 * RADIUS_PER_SIDE
}

/// Scale given to a freshly configured shape of this rank
#[inline]
pub fn default_scale(rank: u32) -> f32 {
    if rank <= MAX_SIDES {
        1.0
    } else {
        1.0 + (rank - MAX_SIDES) as f32 * OVERFLOW_SCALE_STEP
    }
}

/// A poolable polygon shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub rank: u32,
    pub sides: u32,
    pub scale: f32,
    /// Mirrored from the physics body after every step
    pub pos: Vec2,
    pub vel: Vec2,
    pub angular_vel: f32,
    /// False while the shape sits in the pool
    pub visible: bool,
}

impl Shape {
    pub fn new(rank: u32, pos: Vec2) -> Self {
        let mut shape = Self {
            rank: MIN_RANK,
            sides: MIN_RANK,
            scale: 1.0,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            angular_vel: 0.0,
            visible: false,
        };
        shape.configure(rank, pos);
        shape
    }

    /// Reconfigure in place for a new life in the arena
    pub fn configure(&mut self, rank: u32, pos: Vec2) {
        self.rank = rank;
        self.sides = sides_for_rank(rank);
        self.scale = default_scale(rank);
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.angular_vel = 0.0;
        self.visible = true;
    }

    /// Make inert for storage in the pool
    pub fn retire(&mut self) {
        self.vel = Vec2::ZERO;
        self.angular_vel = 0.0;
        self.visible = false;
    }

    /// Scaled radius used for physics and spacing
    #[inline]
    pub fn radius(&self) -> f32 {
        base_radius(self.rank) * self.scale
    }

    /// Body-local polygon vertices, first vertex pointing straight down
    pub fn polygon(&self) -> Vec<Vec2> {
        let radius = self.radius();
        let step = std::f32::consts::TAU / self.sides as f32;
        (0..self.sides)
            .map(|i| {
                let angle = i as f32 * step - std::f32::consts::FRAC_PI_2;
                Vec2::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }
}
