//! Fixed timestep simulation tick
//!
//! One frame of the session: input, deferred merges, physics, combo timeout.

use glam::Vec2;

use super::state::{GamePhase, GameState, PlacementOutcome};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Taps in arena coordinates, in arrival order
    pub placements: Vec<Vec2>,
    /// Latest accelerometer reading, if it changed
    pub tilt: Option<Vec2>,
}

/// Advance the session by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if let Some(acceleration) = input.tilt {
        state.apply_tilt(acceleration);
    }

    for &p in &input.placements {
        // Later taps in the same frame must not restart the game they just ended
        if state.request_placement(p) == PlacementOutcome::GameOver {
            break;
        }
    }

    if state.phase == GamePhase::GameOver {
        return;
    }

    state.time_ticks += 1;

    // Merges found during the previous step are applied before the next one
    state.resolve_pending_merges();

    state.arena.step_physics(dt, &mut state.merges);
    state.arena.sync_from_physics();

    state.poll_combo();
}
