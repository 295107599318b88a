//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by shape handle)
//! - Rendering and physics reached only through the `Scene` and
//!   `PhysicsWorld` traits

pub mod arena;
pub mod clock;
pub mod collision;
pub mod combo;
pub mod merge;
pub mod physics;
pub mod pool;
pub mod scene;
pub mod score;
pub mod shape;
pub mod state;
pub mod tick;

pub use arena::{Arena, Bounds};
pub use clock::FixedStep;
pub use collision::CirclePhysics;
pub use combo::{ComboTier, ComboTracker};
pub use merge::{MergeOutcome, MergeQueue, MergeRules, PendingMerge};
pub use physics::{BodyDesc, BodyState, BodyTag, PhysicsWorld, WallSide};
pub use pool::{PoolError, ShapePool};
pub use scene::{NullScene, Scene, ShapeView};
pub use score::ScoreLedger;
pub use shape::{Shape, ShapeHandle};
pub use state::{GameEvent, GameOverSummary, GamePhase, GameState, Hud, PlacementOutcome};
pub use tick::{TickInput, tick};
