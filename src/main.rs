//! Polymerge entry point
//!
//! The browser build is driven from JavaScript through `polymerge::web`.
//! Natively this runs a headless, seeded autoplay session that taps at
//! random until the arena fills up.
//!
//! Usage: `polymerge [tuning.json]`
//! Environment: `POLYMERGE_SEED`, `POLYMERGE_SCORES` (best score file)

#[cfg(not(target_arch = "wasm32"))]
mod autoplay {
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use polymerge::Tuning;
    use polymerge::persistence::{JsonFileStore, KeyValueStore, MemoryStore};
    use polymerge::platform::{InputEvent, InputQueue};
    use polymerge::sim::{
        CirclePhysics, FixedStep, GameEvent, GamePhase, GameState, NullScene, tick,
    };

    const DEFAULT_SEED: u64 = 0x5eed;
    const DEFAULT_SCORES_PATH: &str = "polymerge_scores.json";
    /// Frames between autoplay taps
    const TAP_INTERVAL: u64 = 45;
    /// Frames between tilt changes
    const TILT_INTERVAL: u64 = 600;
    /// Give up after ten simulated minutes
    const MAX_FRAMES: u64 = 60 * 60 * 10;
    /// Real frame time fed to the clock
    const FRAME_DT: f32 = 1.0 / 60.0;

    fn load_tuning() -> Option<Tuning> {
        match std::env::args().nth(1) {
            Some(path) => match Tuning::load_file(&path) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path);
                    Some(tuning)
                }
                Err(e) => {
                    log::error!("Failed to load tuning from {}: {}", path, e);
                    None
                }
            },
            None => Some(Tuning::default()),
        }
    }

    fn open_store() -> Box<dyn KeyValueStore> {
        let path = std::env::var("POLYMERGE_SCORES").unwrap_or_else(|_| DEFAULT_SCORES_PATH.to_string());
        match JsonFileStore::open(&path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("Best score store {} unavailable ({}), not persisting", path, e);
                Box::new(MemoryStore::new())
            }
        }
    }

    pub fn run() -> bool {
        let Some(tuning) = load_tuning() else {
            return false;
        };
        let seed = std::env::var("POLYMERGE_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SEED);

        let mut state = GameState::new(
            seed,
            tuning.clone(),
            Box::new(CirclePhysics::new(tuning.gravity)),
            Box::new(NullScene),
            open_store(),
        );
        let mut clock = FixedStep::new(tuning.sim_dt, tuning.max_substeps);
        let mut input = InputQueue::new();
        let mut player = Pcg32::seed_from_u64(seed.wrapping_add(1));

        let bounds = state.arena.bounds;
        let m = tuning.placement_margin;
        let (mut merges, mut best_combo) = (0u32, 0u32);

        for frame in 1..=MAX_FRAMES {
            if frame % TAP_INTERVAL == 0 {
                let x = player.random_range(bounds.left() + m..=bounds.right() - m);
                let y = player.random_range(bounds.bottom() + m..=bounds.top() - m);
                input.push(InputEvent::Place(Vec2::new(x, y)));
            }
            if frame % TILT_INTERVAL == 0 {
                input.push(InputEvent::Tilt(Vec2::new(player.random_range(-0.3..=0.3), -0.6)));
            }

            for _ in 0..clock.advance(FRAME_DT) {
                let tick_input = input.take_tick_input();
                tick(&mut state, &tick_input, clock.dt);
            }

            for event in state.drain_events() {
                match event {
                    GameEvent::Merged { rank, base, bonus, .. } => {
                        merges += 1;
                        log::debug!("Merged into rank {} for {}+{}", rank, base, bonus);
                    }
                    GameEvent::ComboChanged { count, tier } => {
                        best_combo = best_combo.max(count);
                        log::debug!("Combo x{} ({})", count, tier.as_str());
                    }
                    _ => {}
                }
            }

            if state.phase == GamePhase::GameOver {
                break;
            }
        }

        let hud = state.hud();
        match hud.game_over {
            Some(summary) => log::info!(
                "Final score {} (best {}{}), {} merges, best combo x{}",
                summary.final_score,
                summary.best_score,
                if summary.new_record { ", new record" } else { "" },
                merges,
                best_combo
            ),
            None => log::info!(
                "Stopped after {:.0}s with score {}, {} shapes in play",
                state.now(),
                hud.score,
                hud.shapes
            ),
        }
        true
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Polymerge (native) starting...");

    if !autoplay::run() {
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is polymerge::web, this is just to satisfy the compiler
}
