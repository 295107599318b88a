//! Polymerge - a merge-puzzle arena
//!
//! Core modules:
//! - `sim`: Shape pool, deferred merge resolution, combo and score (no rendering)
//! - `platform`: Input event routing (taps, tilt)
//! - `persistence`: Best score key-value storage
//! - `tuning`: Data-driven game balance

pub mod persistence;
pub mod platform;
pub mod sim;
pub mod tuning;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use tuning::{GameOverPolicy, Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (the combo clock counts frames at 60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest real frame the fixed-step accumulator will accept
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Lowest rank a shape can have (a triangle)
    pub const MIN_RANK: u32 = 3;
    /// Polygon side count stops growing here; higher ranks grow by scale instead
    pub const MAX_SIDES: u32 = 30;
    /// Rank created by a manual placement
    pub const PLACEMENT_RANK: u32 = MIN_RANK;

    /// Radius of a triangle before scaling
    pub const BASE_RADIUS: f32 = 20.0;
    /// Radius added per extra polygon side
    pub const RADIUS_PER_SIDE: f32 = 3.0;
    /// Scale step per rank past the side cap for a freshly configured shape
    pub const OVERFLOW_SCALE_STEP: f32 = 0.1;

    /// Physical material of every shape body
    pub const SHAPE_RESTITUTION: f32 = 0.3;
    pub const SHAPE_FRICTION: f32 = 0.5;
    pub const SHAPE_MASS: f32 = 1.0;

    /// Starter shapes drop from this far below the arena top
    pub const STARTER_DROP_OFFSET: f32 = 50.0;
    /// Horizontal band excluded from starter spawning (split between both sides)
    pub const STARTER_X_MARGIN: f32 = 60.0;
}
