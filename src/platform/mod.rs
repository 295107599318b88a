//! Platform input routing
//!
//! Browser and native shells push raw events here as they arrive; the
//! frame loop drains them into one `TickInput` per fixed tick.

use glam::Vec2;

use crate::sim::TickInput;

/// Input the session understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Tap or click at arena coordinates
    Place(Vec2),
    /// Accelerometer reading in g
    Tilt(Vec2),
}

/// Events waiting for the next tick
#[derive(Debug, Default)]
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(16),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events in arrival order
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Fold pending events into one tick's input. Taps keep their order;
    /// only the newest tilt reading matters.
    pub fn take_tick_input(&mut self) -> TickInput {
        let mut input = TickInput::default();
        for event in self.drain() {
            match event {
                InputEvent::Place(p) => input.placements.push(p),
                InputEvent::Tilt(acc) => input.tilt = Some(acc),
            }
        }
        input
    }
}
