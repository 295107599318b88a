//! Physics collaborator seam
//!
//! The physics engine owns bodies, integration and contact response. The
//! simulation talks to it through `PhysicsWorld` and identifies bodies by
//! `BodyTag`, a closed set of arena entities.

use glam::Vec2;

use super::shape::ShapeHandle;
use crate::consts::{SHAPE_FRICTION, SHAPE_MASS, SHAPE_RESTITUTION};

/// Which arena wall a static body belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WallSide {
    Left,
    Right,
    Bottom,
    Top,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [
        WallSide::Left,
        WallSide::Right,
        WallSide::Bottom,
        WallSide::Top,
    ];
}

/// Identity of a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyTag {
    /// A mergeable shape
    Shape(ShapeHandle),
    /// A static arena wall
    Wall(WallSide),
}

impl BodyTag {
    /// The shape handle, if this body can take part in a merge
    #[inline]
    pub fn shape(self) -> Option<ShapeHandle> {
        match self {
            BodyTag::Shape(handle) => Some(handle),
            BodyTag::Wall(_) => None,
        }
    }
}

/// Whether the engine integrates the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Fixed,
}

/// Collision geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Collider {
    /// Convex polygon in body-local space plus its circumradius
    Polygon { vertices: Vec<Vec2>, radius: f32 },
    /// Axis-aligned box
    Box { half_extents: Vec2 },
}

/// Description of a body before creation
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub collider: Collider,
    pub position: Vec2,
    pub velocity: Vec2,
    pub restitution: f32,
    pub friction: f32,
    pub mass: f32,
}

impl BodyDesc {
    /// Dynamic polygon body with the shape material
    pub fn polygon(vertices: Vec<Vec2>, radius: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            collider: Collider::Polygon { vertices, radius },
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            restitution: SHAPE_RESTITUTION,
            friction: SHAPE_FRICTION,
            mass: SHAPE_MASS,
        }
    }

    /// Static wall box
    pub fn wall(half_extents: Vec2) -> Self {
        Self {
            kind: BodyKind::Fixed,
            collider: Collider::Box { half_extents },
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            restitution: SHAPE_RESTITUTION,
            friction: SHAPE_FRICTION,
            mass: 0.0,
        }
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.position = pos;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.velocity = vel;
        self
    }
}

/// Kinematic state read back from a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Contact-begin callback. Returns whether the engine should apply a
/// physical response to the contact.
pub type ContactHandler<'a> = dyn FnMut(BodyTag, BodyTag) -> bool + 'a;

/// The physics engine as seen by the simulation
pub trait PhysicsWorld {
    fn add_body(&mut self, tag: BodyTag, desc: BodyDesc);

    /// Returns false if no body had this tag
    fn remove_body(&mut self, tag: BodyTag) -> bool;

    fn body_state(&self, tag: BodyTag) -> Option<BodyState>;

    fn has_body(&self, tag: BodyTag) -> bool {
        self.body_state(tag).is_some()
    }

    fn set_velocity(&mut self, tag: BodyTag, vel: Vec2);

    fn gravity(&self) -> Vec2;

    fn set_gravity(&mut self, gravity: Vec2);

    /// Advance the world. `on_contact` fires once when two bodies start
    /// touching; bodies must not be added or removed from inside it.
    fn step(&mut self, dt: f32, on_contact: &mut ContactHandler<'_>);
}
