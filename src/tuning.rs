//! Game balance and timing
//!
//! Every gameplay number lives here so balance can be changed from JSON
//! without a rebuild. Missing fields fall back to the defaults.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_SUBSTEPS, MIN_RANK, SIM_DT};
use crate::sim::arena::Bounds;

/// What a crowded manual placement does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameOverPolicy {
    /// The first crowded placement ends the game
    #[default]
    FirstRejection,
    /// Crowded placements are refused; the game ends once no free spot is left
    ArenaFull,
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("could not read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tuning value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
    TuningError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Data-driven game balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Taps closer than this to the arena edge are ignored
    pub placement_margin: f32,
    /// Added to the summed radii when checking placement spacing
    pub spacing_padding: f32,
    pub wall_thickness: f32,

    // === Spawning ===
    /// Shapes dropped in at the start of every round
    pub starter_count: u32,
    pub starter_min_rank: u32,
    pub starter_max_rank: u32,
    /// Inert shapes created up front
    pub pool_warmup: u32,

    // === Combo ===
    /// Seconds between merges that still chain
    pub combo_window: f64,
    /// Seconds between combo timeout checks
    pub combo_poll_interval: f64,
    /// Bonus fraction of the base score per chained merge
    pub combo_bonus_step: f64,

    // === Merging ===
    /// Applied to the summed input scales past the side cap
    pub merge_scale_factor: f32,
    /// Applied to the averaged input velocity
    pub merge_velocity_damping: f32,

    // === Physics ===
    pub gravity: Vec2,
    /// Accelerometer reading to gravity
    pub tilt_gravity_scale: f32,
    /// Per-axis sign applied to the accelerometer
    pub tilt_axis_sign: Vec2,

    // === Rules ===
    pub game_over_policy: GameOverPolicy,

    // === Timing ===
    pub sim_dt: f32,
    pub max_substeps: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            arena_width: 400.0,
            arena_height: 450.0,
            placement_margin: 30.0,
            spacing_padding: 10.0,
            wall_thickness: 10.0,

            starter_count: 2,
            starter_min_rank: 3,
            starter_max_rank: 5,
            pool_warmup: 5,

            combo_window: 1.5,
            combo_poll_interval: 0.1,
            combo_bonus_step: 0.5,

            merge_scale_factor: 0.55,
            merge_velocity_damping: 0.8,

            gravity: Vec2::new(0.0, -300.0),
            tilt_gravity_scale: 500.0,
            tilt_axis_sign: Vec2::ONE,

            game_over_policy: GameOverPolicy::FirstRejection,

            sim_dt: SIM_DT,
            max_substeps: MAX_SUBSTEPS,
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.arena_width <= 2.0 * self.placement_margin {
            return Err(invalid("arena_width", "no room inside the placement margin"));
        }
        if self.arena_height <= 2.0 * self.placement_margin {
            return Err(invalid("arena_height", "no room inside the placement margin"));
        }
        if self.placement_margin < 0.0 || self.spacing_padding < 0.0 {
            return Err(invalid("placement_margin", "margins must not be negative"));
        }
        if self.starter_min_rank < MIN_RANK {
            return Err(invalid(
                "starter_min_rank",
                format!("must be at least {}", MIN_RANK),
            ));
        }
        if self.starter_max_rank < self.starter_min_rank {
            return Err(invalid("starter_max_rank", "below starter_min_rank"));
        }
        if self.combo_window < 0.0 {
            return Err(invalid("combo_window", "must not be negative"));
        }
        if self.combo_poll_interval <= 0.0 {
            return Err(invalid("combo_poll_interval", "must be positive"));
        }
        if self.merge_scale_factor <= 0.0 {
            return Err(invalid("merge_scale_factor", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.merge_velocity_damping) {
            return Err(invalid("merge_velocity_damping", "must be within 0..=1"));
        }
        if self.sim_dt <= 0.0 {
            return Err(invalid("sim_dt", "must be positive"));
        }
        if self.max_substeps == 0 {
            return Err(invalid("max_substeps", "must be at least 1"));
        }
        Ok(())
    }

    /// Arena rectangle with its bottom-left corner at the origin
    pub fn bounds(&self) -> Bounds {
        Bounds::from_size(self.arena_width, self.arena_height)
    }

    /// Gravity for an accelerometer reading
    pub fn tilt_gravity(&self, acceleration: Vec2) -> Vec2 {
        acceleration * self.tilt_gravity_scale * self.tilt_axis_sign
    }

    /// Load tuning from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_file(path: impl AsRef<std::path::Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "polymerge_tuning";

    /// Load tuning from LocalStorage, falling back to defaults (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(json) = storage.and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten()) {
            match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from LocalStorage");
                    return tuning;
                }
                Err(e) => log::warn!("Ignoring stored tuning: {}", e),
            }
        }

        log::info!("Using default tuning");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let tuning = Tuning::from_json(r#"{ "combo_window": 2.0, "game_over_policy": "ArenaFull" }"#)
            .unwrap();
        assert_eq!(tuning.combo_window, 2.0);
        assert_eq!(tuning.game_over_policy, GameOverPolicy::ArenaFull);
        assert_eq!(tuning.starter_count, 2);
        assert_eq!(tuning.gravity, Vec2::new(0.0, -300.0));
    }

    #[test]
    fn test_json_round_trip() {
        let tuning = Tuning {
            merge_scale_factor: 0.6,
            ..Default::default()
        };
        let json = tuning.to_json().unwrap();
        assert_eq!(Tuning::from_json(&json).unwrap(), tuning);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Tuning::from_json(r#"{ "starter_min_rank": 2 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::Invalid {
                field: "starter_min_rank",
                ..
            }
        ));

        let err = Tuning::from_json(r#"{ "arena_width": 50.0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "arena_width", .. }));

        assert!(matches!(
            Tuning::from_json("{ nope"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_tilt_gravity() {
        let tuning = Tuning::default();
        assert_eq!(tuning.tilt_gravity(Vec2::new(0.5, -1.0)), Vec2::new(250.0, -500.0));

        let flipped = Tuning {
            tilt_axis_sign: Vec2::new(-1.0, 1.0),
            ..Default::default()
        };
        assert_eq!(flipped.tilt_gravity(Vec2::new(0.5, -1.0)), Vec2::new(-250.0, -500.0));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuning.json");
        std::fs::write(&path, r#"{ "starter_count": 4 }"#).unwrap();
        assert_eq!(Tuning::load_file(&path).unwrap().starter_count, 4);
        assert!(matches!(
            Tuning::load_file(dir.path().join("missing.json")),
            Err(TuningError::Io(_))
        ));
    }
}
