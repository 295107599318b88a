//! Browser bindings
//!
//! JavaScript owns the canvas and the animation frame; it forwards taps
//! (already mapped to arena coordinates) and device tilt, calls `frame`
//! once per animation frame, and reads back the HUD and events as JSON.

use glam::Vec2;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::Tuning;
use crate::persistence::LocalStore;
use crate::platform::{InputEvent, InputQueue};
use crate::sim::{
    Bounds, CirclePhysics, FixedStep, GamePhase, GameState, NullScene, ShapeHandle, ShapeView,
    tick,
};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Polymerge starting...");
}

#[derive(Serialize)]
struct ShapeSnapshot {
    handle: ShapeHandle,
    #[serde(flatten)]
    view: ShapeView,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::warn!("Failed to serialize for JS: {}", e);
        "null".to_string()
    })
}

/// Game instance holding all state
#[wasm_bindgen]
pub struct WebGame {
    state: GameState,
    clock: FixedStep,
    input: InputQueue,
    last_time: f64,
}

#[wasm_bindgen]
impl WebGame {
    /// New session with an arena sized for a `width` x `height` viewport
    #[wasm_bindgen(constructor)]
    pub fn new(seed: f64, width: f32, height: f32) -> WebGame {
        let tuning = Tuning::load();
        let bounds = Bounds::fit_to_viewport(width, height);

        let clock = FixedStep::new(tuning.sim_dt, tuning.max_substeps);
        let physics = Box::new(CirclePhysics::new(tuning.gravity));
        let state = GameState::with_bounds(
            seed as u64,
            bounds,
            tuning,
            physics,
            Box::new(NullScene),
            Box::new(LocalStore::open()),
        );

        WebGame {
            state,
            clock,
            input: InputQueue::new(),
            last_time: 0.0,
        }
    }

    pub fn tap(&mut self, x: f32, y: f32) {
        self.input.push(InputEvent::Place(Vec2::new(x, y)));
    }

    /// Accelerometer reading in g
    pub fn tilt(&mut self, ax: f32, ay: f32) {
        self.input.push(InputEvent::Tilt(Vec2::new(ax, ay)));
    }

    /// Run the simulation up to `time` (ms, from requestAnimationFrame)
    pub fn frame(&mut self, time: f64) {
        let dt = if self.last_time > 0.0 {
            ((time - self.last_time) / 1000.0) as f32
        } else {
            self.clock.dt
        };
        self.last_time = time;

        for _ in 0..self.clock.advance(dt) {
            let input = self.input.take_tick_input();
            tick(&mut self.state, &input, self.clock.dt);
        }
    }

    pub fn restart(&mut self) {
        self.input.drain();
        self.clock.reset();
        self.state.restart();
    }

    pub fn score(&self) -> f64 {
        self.state.score.current() as f64
    }

    pub fn best(&self) -> f64 {
        self.state.score.best() as f64
    }

    pub fn combo_count(&self) -> u32 {
        self.state.hud().combo_count
    }

    pub fn combo_active(&self) -> bool {
        self.state.hud().combo_active
    }

    pub fn combo_tier(&self) -> String {
        self.state.hud().combo_tier.as_str().to_string()
    }

    pub fn is_game_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    /// Arena rectangle as `[center_x, center_y, width, height]`
    pub fn arena(&self) -> Vec<f32> {
        let b = self.state.arena.bounds;
        vec![b.center.x, b.center.y, b.size.x, b.size.y]
    }

    pub fn hud_json(&self) -> String {
        to_json(&self.state.hud())
    }

    /// Events since the last call, oldest first
    pub fn events_json(&mut self) -> String {
        to_json(&self.state.drain_events())
    }

    /// Every shape in play with what is needed to draw it
    pub fn shapes_json(&self) -> String {
        let shapes: Vec<_> = self
            .state
            .arena
            .shapes()
            .map(|(handle, shape)| ShapeSnapshot {
                handle,
                view: ShapeView::from(shape),
            })
            .collect();
        to_json(&shapes)
    }
}
