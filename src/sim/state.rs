//! Game session state
//!
//! Owns the arena, the merge queue, combo and score, and routes player
//! input into them. Everything here runs between physics steps.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, Bounds};
use super::collision::CirclePhysics;
use super::combo::{ComboTier, ComboTracker};
use super::merge::{self, MergeOutcome, MergeQueue, MergeRules};
use super::physics::PhysicsWorld;
use super::scene::{NullScene, Scene};
use super::score::ScoreLedger;
use super::shape::ShapeHandle;
use crate::consts::*;
use crate::persistence::{KeyValueStore, MemoryStore};
use crate::tuning::{GameOverPolicy, Tuning};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Accepting placements, merging
    Playing,
    /// Frozen until the next tap or restart
    GameOver,
}

/// Final numbers shown on the game over screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverSummary {
    pub final_score: u64,
    pub best_score: u64,
    pub new_record: bool,
}

/// Things the presentation layer may want to animate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ShapePlaced { handle: ShapeHandle, pos: Vec2 },
    /// Crowded tap refused without ending the game
    PlacementRejected { pos: Vec2 },
    Merged { rank: u32, pos: Vec2, base: u64, bonus: u64 },
    ScoreChanged { score: u64 },
    ComboChanged { count: u32, tier: ComboTier },
    GameOver(GameOverSummary),
    Restarted,
}

/// What happened to a tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed(ShapeHandle),
    /// Outside the placement region
    Ignored,
    /// Too close to another shape, game continues
    Crowded,
    /// Too close to another shape, game ended
    GameOver,
    /// Tap during game over started a new round
    Restarted,
}

/// Snapshot for score and combo labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub score: u64,
    pub best: u64,
    pub combo_count: u32,
    pub combo_active: bool,
    pub combo_tier: ComboTier,
    pub phase: GamePhase,
    pub shapes: usize,
    pub game_over: Option<GameOverSummary>,
}

/// A whole play session
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    rng: Pcg32,
    pub tuning: Tuning,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub arena: Arena,
    pub merges: MergeQueue,
    rules: MergeRules,
    pub combo: ComboTracker,
    pub score: ScoreLedger,
    store: Box<dyn KeyValueStore>,
    summary: Option<GameOverSummary>,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Start a session and drop in the starter shapes
    pub fn new(
        seed: u64,
        tuning: Tuning,
        physics: Box<dyn PhysicsWorld>,
        scene: Box<dyn Scene>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let bounds = tuning.bounds();
        Self::with_bounds(seed, bounds, tuning, physics, scene, store)
    }

    /// Session in an arena placed at `bounds`, e.g. one fitted to a viewport.
    /// The tuning's arena size is overridden by `bounds.size`.
    pub fn with_bounds(
        seed: u64,
        bounds: Bounds,
        mut tuning: Tuning,
        physics: Box<dyn PhysicsWorld>,
        scene: Box<dyn Scene>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        tuning.arena_width = bounds.size.x;
        tuning.arena_height = bounds.size.y;
        let arena = Arena::new(bounds, &tuning, physics, scene);
        let score = ScoreLedger::load(store.as_ref());

        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            rules: MergeRules::from(&tuning),
            combo: ComboTracker::from_tuning(&tuning),
            tuning,
            phase: GamePhase::Playing,
            time_ticks: 0,
            arena,
            merges: MergeQueue::new(),
            score,
            store,
            summary: None,
            events: Vec::new(),
        };
        state.spawn_starters();
        log::info!("Session started (seed {})", seed);
        state
    }

    /// Session with the built-in physics, no scene and volatile storage
    pub fn headless(seed: u64, tuning: Tuning) -> Self {
        let physics = Box::new(CirclePhysics::new(tuning.gravity));
        Self::new(
            seed,
            tuning,
            physics,
            Box::new(NullScene),
            Box::new(MemoryStore::new()),
        )
    }

    /// Simulated seconds since the session started
    pub fn now(&self) -> f64 {
        self.time_ticks as f64 * self.tuning.sim_dt as f64
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Drop `starter_count` shapes of random low rank along the top
    pub fn spawn_starters(&mut self) {
        let bounds = self.arena.bounds;
        let span = (bounds.size.x - STARTER_X_MARGIN).max(0.0);
        let y = bounds.top() - STARTER_DROP_OFFSET;
        let (min_rank, max_rank) = (
            self.tuning.starter_min_rank,
            self.tuning.starter_max_rank.max(self.tuning.starter_min_rank),
        );

        for _ in 0..self.tuning.starter_count {
            let offset = if span > 0.0 {
                self.rng.random_range(0.0..span)
            } else {
                0.0
            };
            let x = bounds.center.x + offset - span / 2.0;
            let rank = self.rng.random_range(min_rank..=max_rank);
            if let Err(e) = self.arena.spawn(rank, Vec2::new(x, y)) {
                log::warn!("Starter shape not spawned: {}", e);
            }
        }
    }

    /// Handle a tap at `p` in arena coordinates
    pub fn request_placement(&mut self, p: Vec2) -> PlacementOutcome {
        if self.phase == GamePhase::GameOver {
            self.restart();
            return PlacementOutcome::Restarted;
        }

        if !self.arena.in_placement_region(p) {
            log::trace!("Tap at {:?} outside placement region", p);
            return PlacementOutcome::Ignored;
        }

        if !self.arena.is_space_available(p, PLACEMENT_RANK) {
            return match self.tuning.game_over_policy {
                GameOverPolicy::FirstRejection => {
                    self.trigger_game_over();
                    PlacementOutcome::GameOver
                }
                GameOverPolicy::ArenaFull => {
                    if self.arena.find_free_spot(PLACEMENT_RANK).is_none() {
                        self.trigger_game_over();
                        PlacementOutcome::GameOver
                    } else {
                        self.events.push(GameEvent::PlacementRejected { pos: p });
                        PlacementOutcome::Crowded
                    }
                }
            };
        }

        let handle = match self.arena.spawn(PLACEMENT_RANK, p) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Placement failed: {}", e);
                return PlacementOutcome::Ignored;
            }
        };

        self.score.add(PLACEMENT_RANK as u64);
        let had_combo = self.combo.count() > 0;
        self.combo.reset();

        self.events.push(GameEvent::ShapePlaced { handle, pos: p });
        self.events.push(GameEvent::ScoreChanged {
            score: self.score.current(),
        });
        if had_combo {
            self.push_combo_event();
        }
        PlacementOutcome::Placed(handle)
    }

    /// Point gravity along an accelerometer reading
    pub fn apply_tilt(&mut self, acceleration: Vec2) {
        let gravity = self.tuning.tilt_gravity(acceleration);
        self.arena.physics_mut().set_gravity(gravity);
    }

    /// Apply every merge detected during the previous physics step
    pub fn resolve_pending_merges(&mut self) {
        for pending in self.merges.drain() {
            if self.phase != GamePhase::Playing {
                break;
            }
            match merge::resolve(&mut self.arena, pending, &self.rules) {
                Ok(Some(outcome)) => self.on_merged(&outcome),
                Ok(None) => {}
                Err(e) => log::warn!("Merge output not spawned: {}", e),
            }
        }
    }

    fn on_merged(&mut self, outcome: &MergeOutcome) {
        let count = self.combo.register_merge(self.now());
        let base = outcome.rank as u64;
        let bonus = self.combo.bonus(base);
        self.score.add(base + bonus);

        self.events.push(GameEvent::Merged {
            rank: outcome.rank,
            pos: outcome.pos,
            base,
            bonus,
        });
        self.events.push(GameEvent::ScoreChanged {
            score: self.score.current(),
        });
        if count >= 2 {
            self.push_combo_event();
        }
    }

    /// Run the combo timeout watch
    pub fn poll_combo(&mut self) {
        if self.combo.poll(self.now()) {
            self.push_combo_event();
        }
    }

    fn push_combo_event(&mut self) {
        self.events.push(GameEvent::ComboChanged {
            count: self.combo.count(),
            tier: self.combo.tier(),
        });
    }

    /// Freeze the session and settle the best score
    pub fn trigger_game_over(&mut self) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.merges.clear();

        let new_record = self.score.check_record(self.store.as_mut());
        let summary = GameOverSummary {
            final_score: self.score.current(),
            best_score: self.score.best(),
            new_record,
        };
        log::info!(
            "Game over: score {}, best {}{}",
            summary.final_score,
            summary.best_score,
            if new_record { " (new record)" } else { "" }
        );
        self.summary = Some(summary);
        self.events.push(GameEvent::GameOver(summary));
    }

    /// Clear the arena and start a fresh round
    pub fn restart(&mut self) {
        let cleared = self.arena.clear();
        self.merges.clear();
        self.combo.reset();
        self.score.reset();
        self.summary = None;
        self.phase = GamePhase::Playing;
        self.spawn_starters();

        log::info!("Restarted, {} shapes returned to pool", cleared);
        self.events.push(GameEvent::Restarted);
        self.events.push(GameEvent::ScoreChanged { score: 0 });
    }

    pub fn hud(&self) -> Hud {
        let combo_count = self.combo.count_at(self.now());
        Hud {
            score: self.score.current(),
            best: self.score.best(),
            combo_count,
            combo_active: combo_count >= 2,
            combo_tier: ComboTier::for_count(combo_count),
            phase: self.phase,
            shapes: self.arena.shape_count(),
            game_over: self.summary,
        }
    }

    /// Take every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::BEST_SCORE_KEY;

    fn quiet_tuning() -> Tuning {
        Tuning {
            starter_count: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_spawns_starters_along_top() {
        let state = GameState::headless(7, Tuning::default());
        assert_eq!(state.arena.shape_count(), 2);
        for (_, shape) in state.arena.shapes() {
            assert!((3..=5).contains(&shape.rank));
            assert_eq!(shape.pos.y, 450.0 - 50.0);
            assert!(shape.pos.x >= 30.0 && shape.pos.x <= 370.0);
        }
    }

    #[test]
    fn test_viewport_bounds_keep_their_center() {
        let bounds = Bounds::fit_to_viewport(1000.0, 800.0);
        let mut state = GameState::with_bounds(
            3,
            bounds,
            Tuning::default(),
            Box::new(CirclePhysics::new(Vec2::ZERO)),
            Box::new(NullScene),
            Box::new(MemoryStore::new()),
        );
        assert_eq!(state.arena.bounds.center, Vec2::new(500.0, 400.0));
        assert_eq!(state.tuning.arena_width, 400.0);
        assert_eq!(state.tuning.arena_height, 450.0);

        for (_, shape) in state.arena.shapes() {
            assert_eq!(shape.pos.y, 625.0 - 50.0);
            assert!(shape.pos.x >= 330.0 && shape.pos.x <= 670.0);
        }

        // The origin corner is outside this arena, its center is not
        assert_eq!(
            state.request_placement(Vec2::new(100.0, 100.0)),
            PlacementOutcome::Ignored
        );
        assert!(matches!(
            state.request_placement(Vec2::new(500.0, 300.0)),
            PlacementOutcome::Placed(_)
        ));
    }

    #[test]
    fn test_same_seed_same_starters() {
        let a = GameState::headless(42, Tuning::default());
        let b = GameState::headless(42, Tuning::default());
        let ranks_a: Vec<_> = a.arena.shapes().map(|(_, s)| (s.rank, s.pos)).collect();
        let ranks_b: Vec<_> = b.arena.shapes().map(|(_, s)| (s.rank, s.pos)).collect();
        assert_eq!(ranks_a, ranks_b);
    }

    #[test]
    fn test_placement_scores_and_resets_combo() {
        let mut state = GameState::headless(1, quiet_tuning());
        state.combo.register_merge(0.0);
        state.combo.register_merge(0.1);

        let outcome = state.request_placement(Vec2::new(200.0, 100.0));
        assert!(matches!(outcome, PlacementOutcome::Placed(_)));
        assert_eq!(state.score.current(), 3);
        assert_eq!(state.combo.count(), 0);
        assert_eq!(state.arena.shape_count(), 1);

        let events = state.drain_events();
        assert!(matches!(events[0], GameEvent::ShapePlaced { .. }));
        assert!(events.contains(&GameEvent::ScoreChanged { score: 3 }));
        assert!(events.contains(&GameEvent::ComboChanged {
            count: 0,
            tier: ComboTier::None
        }));
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_out_of_region_tap_is_ignored() {
        let mut state = GameState::headless(1, quiet_tuning());
        assert_eq!(
            state.request_placement(Vec2::new(10.0, 200.0)),
            PlacementOutcome::Ignored
        );
        assert_eq!(
            state.request_placement(Vec2::new(200.0, 430.0)),
            PlacementOutcome::Ignored
        );
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.score.current(), 0);
        assert_eq!(state.arena.shape_count(), 0);
    }

    #[test]
    fn test_crowded_placement_ends_game() {
        let mut state = GameState::headless(1, quiet_tuning());
        state.request_placement(Vec2::new(200.0, 100.0));

        // Two triangles need 50 units between centers
        let outcome = state.request_placement(Vec2::new(249.0, 100.0));
        assert_eq!(outcome, PlacementOutcome::GameOver);
        assert_eq!(state.phase, GamePhase::GameOver);

        let summary = state.hud().game_over.unwrap();
        assert_eq!(summary.final_score, 3);
        assert_eq!(summary.best_score, 3);
        assert!(summary.new_record);
        assert!(state.drain_events().contains(&GameEvent::GameOver(summary)));
    }

    #[test]
    fn test_placement_at_exact_spacing_is_allowed() {
        let mut state = GameState::headless(1, quiet_tuning());
        state.request_placement(Vec2::new(200.0, 100.0));
        assert!(matches!(
            state.request_placement(Vec2::new(250.0, 100.0)),
            PlacementOutcome::Placed(_)
        ));
    }

    #[test]
    fn test_arena_full_policy_rejects_without_ending() {
        let tuning = Tuning {
            game_over_policy: GameOverPolicy::ArenaFull,
            ..quiet_tuning()
        };
        let mut state = GameState::headless(1, tuning);
        state.request_placement(Vec2::new(200.0, 100.0));

        let outcome = state.request_placement(Vec2::new(249.0, 100.0));
        assert_eq!(outcome, PlacementOutcome::Crowded);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.score.current(), 3);
        assert!(state
            .drain_events()
            .contains(&GameEvent::PlacementRejected {
                pos: Vec2::new(249.0, 100.0)
            }));
    }

    #[test]
    fn test_tap_during_game_over_restarts() {
        let mut state = GameState::headless(1, Tuning::default());
        state.trigger_game_over();
        assert_eq!(
            state.request_placement(Vec2::new(5.0, 5.0)),
            PlacementOutcome::Restarted
        );
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.hud().game_over.is_none());
    }

    #[test]
    fn test_restart_is_idempotent() {
        let mut state = GameState::headless(3, Tuning::default());
        state.request_placement(Vec2::new(200.0, 100.0));
        state.request_placement(Vec2::new(100.0, 200.0));
        state.combo.register_merge(state.now());
        state.trigger_game_over();
        let best = state.score.best();

        for _ in 0..2 {
            state.restart();
            let hud = state.hud();
            assert_eq!(hud.score, 0);
            assert_eq!(hud.combo_count, 0);
            assert_eq!(hud.phase, GamePhase::Playing);
            assert_eq!(hud.best, best);
            assert_eq!(state.arena.shape_count(), 2);
            assert!(state.merges.is_empty());
        }
    }

    #[test]
    fn test_record_only_settled_at_game_over() {
        let mut state = GameState::headless(1, quiet_tuning());
        state.request_placement(Vec2::new(200.0, 100.0));
        assert_eq!(state.score.current(), 3);
        assert_eq!(state.score.best(), 0);
        assert_eq!(state.store().get_int(BEST_SCORE_KEY, 0), 0);

        state.trigger_game_over();
        assert_eq!(state.score.best(), 3);
        assert_eq!(state.store().get_int(BEST_SCORE_KEY, 0), 3);
    }

    #[test]
    fn test_best_loaded_from_store_and_kept() {
        let mut store = MemoryStore::new();
        store.set_int(BEST_SCORE_KEY, 100);
        let tuning = quiet_tuning();
        let mut state = GameState::new(
            1,
            tuning.clone(),
            Box::new(CirclePhysics::new(tuning.gravity)),
            Box::new(NullScene),
            Box::new(store),
        );
        assert_eq!(state.hud().best, 100);

        state.request_placement(Vec2::new(200.0, 100.0));
        state.trigger_game_over();
        let summary = state.hud().game_over.unwrap();
        assert!(!summary.new_record);
        assert_eq!(summary.best_score, 100);
        assert_eq!(state.store().get_int(BEST_SCORE_KEY, 0), 100);
    }

    #[test]
    fn test_hud_hides_lapsed_combo_before_poll() {
        let mut state = GameState::headless(1, quiet_tuning());
        state.combo.register_merge(0.0);
        state.combo.register_merge(0.01);
        state.time_ticks = 60;
        assert!(state.hud().combo_active);
        assert_eq!(state.hud().combo_tier, ComboTier::Warm);

        // 1.517s: window lapsed, no poll has run
        state.time_ticks = 91;
        assert!(state.combo.is_expired(state.now()));
        let hud = state.hud();
        assert!(!hud.combo_active);
        assert_eq!(hud.combo_count, 0);
        assert_eq!(hud.combo_tier, ComboTier::None);
    }

    #[test]
    fn test_tilt_overrides_gravity() {
        let mut state = GameState::headless(1, quiet_tuning());
        state.apply_tilt(Vec2::new(0.5, -1.0));
        assert_eq!(state.arena.physics().gravity(), Vec2::new(250.0, -500.0));
    }
}
