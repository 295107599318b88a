//! Scene collaborator seam
//!
//! The renderer owns visuals; the simulation only tells it when a shape
//! enters or leaves the arena and what polygon to draw for it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{Shape, ShapeHandle};

/// Everything a renderer needs to build a polygon texture for a shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeView {
    pub rank: u32,
    pub sides: u32,
    pub scale: f32,
    pub radius: f32,
    pub pos: Vec2,
}

impl From<&Shape> for ShapeView {
    fn from(shape: &Shape) -> Self {
        Self {
            rank: shape.rank,
            sides: shape.sides,
            scale: shape.scale,
            radius: shape.radius(),
            pos: shape.pos,
        }
    }
}

/// Rendering side of the arena
pub trait Scene {
    /// A shape was acquired and placed; generate its texture and show it
    fn attach(&mut self, handle: ShapeHandle, view: &ShapeView);

    /// A shape went back to the pool; hide it but keep nothing else
    fn detach(&mut self, handle: ShapeHandle);

    /// The shape's scale changed after a merge past the side cap
    fn refresh(&mut self, handle: ShapeHandle, view: &ShapeView) {
        self.attach(handle, view);
    }
}

/// Headless scene that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScene;

impl Scene for NullScene {
    fn attach(&mut self, _handle: ShapeHandle, _view: &ShapeView) {}

    fn detach(&mut self, _handle: ShapeHandle) {}
}
