// Data-driven simulation configuration.
//
// All tunable parameters live in `SimConfig`, loadable from JSON. The sim
// reads every range, speed, weight and threshold from here rather than from
// literals. Parameters are grouped into nested structs by concern:
// `PopulationParams`, `MovementParams`, `BiasWeights`, `DetectionParams`,
// `PredationParams`, `VolumeParams`, plus the spawn size buckets and the
// per-species table (see `species.rs`).
//
// Every struct is `#[serde(default)]`, so a JSON file only needs the keys
// it overrides.
//
// The config is mutable at runtime, but only through
// `SimState::update_config`, which recomputes `DerivedRanges` (the squared
// detection distances the hot loops compare against) and pushes volume
// limits into the registry. Editing a range therefore can never leave a
// stale squared value behind. `SimConfig::sanitize` runs on the same path
// (and in `SimState::new`): out-of-range values that would otherwise panic
// a tick, such as inverted volume limits or a negative turn rate, are
// repaired with a warning instead of rejected.
//
// See also: `sim.rs` which owns the config, `species.rs` for `SpeciesData`.

use crate::error::SimError;
use crate::species::{SpeciesData, default_species_table};
use crate::types::Species;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// How many agents to keep alive and how schools are formed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationParams {
    /// Number of NPC agents `maintain_population` tops up to each tick.
    pub target: usize,
    /// Probability that a spawn slot is filled with a school.
    pub schooling_probability: f64,
    /// Inclusive `(min, max)` school size.
    pub school_size: (usize, usize),
    /// Consecutive failed spawn attempts before a top-up pass gives up.
    pub max_consecutive_spawn_failures: u32,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            target: 60,
            schooling_probability: 0.3,
            school_size: (4, 8),
            max_consecutive_spawn_failures: 2,
        }
    }
}

/// Path following and steering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementParams {
    /// Grid points per planned path.
    pub path_length: usize,
    /// Distance at which a waypoint counts as reached.
    pub arrival_distance: f32,
    /// Maximum yaw change, radians per second.
    pub turn_rate: f32,
    /// Per-tick blend factor from current heading toward the waypoint.
    pub direction_smoothing: f32,
    /// Speed multiplier while fleeing.
    pub flee_speed_multiplier: f32,
    /// Speed multiplier while chasing.
    pub chase_speed_multiplier: f32,
    /// How far along the prey's path a chaser aims.
    pub prey_lookahead_steps: usize,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            path_length: 10,
            arrival_distance: 2.0,
            turn_rate: 3.0,
            direction_smoothing: 0.15,
            flee_speed_multiplier: 1.5,
            chase_speed_multiplier: 1.3,
            prey_lookahead_steps: 5,
        }
    }
}

/// Weights of the per-step path scoring terms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasWeights {
    /// Pull toward the agent's fixed personal direction.
    pub preferred_direction: f32,
    /// Pull toward continuing straight.
    pub forward: f32,
    /// Pull toward prey (Chase) or push away from a threat (Flee).
    pub target: f32,
    /// Scale of the uniform random jitter.
    pub randomness: f32,
}

impl Default for BiasWeights {
    fn default() -> Self {
        Self {
            preferred_direction: 0.3,
            forward: 1.0,
            target: 2.0,
            randomness: 0.5,
        }
    }
}

/// Threat, prey, and contact distances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub flee_range: f32,
    pub chase_range: f32,
    pub eat_range: f32,
    /// Volume ratio that makes another creature a threat (or prey, inverted).
    pub predator_size_ratio: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            flee_range: 30.0,
            chase_range: 25.0,
            eat_range: 3.0,
            predator_size_ratio: 1.2,
        }
    }
}

/// Growth and consumption rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredationParams {
    /// Fractional scale gain for an NPC per meal.
    pub growth_per_eat: f64,
    /// Scale ceiling for NPC growth.
    pub max_scale: f64,
    /// Seconds of simulated time between a player's meals.
    pub eat_cooldown: f64,
    /// Fraction of prey volume transferred to the predator.
    pub food_ratio: f64,
    /// Entries kept in the meal history ring buffer.
    pub meal_history_capacity: usize,
}

impl Default for PredationParams {
    fn default() -> Self {
        Self {
            growth_per_eat: 0.1,
            max_scale: 3.0,
            eat_cooldown: 0.5,
            food_ratio: 1.0,
            meal_history_capacity: 20,
        }
    }
}

/// World volume limits and the NPC log-normal size distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    pub min_volume: f64,
    pub max_volume: f64,
    /// World volume a player starts with.
    pub starter_volume: f64,
    /// Mean of `ln(volume)` for NPCs registered without an explicit volume.
    pub npc_log_mean: f64,
    /// Standard deviation of `ln(volume)` for the same.
    pub npc_log_stddev: f64,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            min_volume: 1.0,
            max_volume: 1000.0,
            starter_volume: 1.0,
            npc_log_mean: 3.5,
            npc_log_stddev: 1.5,
        }
    }
}

impl VolumeParams {
    /// Clamp a volume into `[min_volume, max_volume]`. Never panics, even on
    /// limits that have not been sanitized.
    pub fn clamp(&self, volume: f64) -> f64 {
        volume.max(self.min_volume).min(self.max_volume)
    }
}

/// One row of the spawn size table: pick a bucket by weight, then a scale
/// uniformly in `[min_scale, max_scale)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeBucket {
    pub name: String,
    pub weight: f32,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl SizeBucket {
    fn new(name: &str, weight: f32, min_scale: f64, max_scale: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            min_scale,
            max_scale,
        }
    }
}

pub fn default_size_buckets() -> Vec<SizeBucket> {
    vec![
        SizeBucket::new("tiny", 0.15, 0.5, 0.7),
        SizeBucket::new("small", 0.30, 0.7, 0.9),
        SizeBucket::new("medium", 0.30, 0.9, 1.15),
        SizeBucket::new("large", 0.18, 1.15, 1.5),
        SizeBucket::new("huge", 0.07, 1.5, 2.0),
    ]
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub population: PopulationParams,
    pub movement: MovementParams,
    pub bias: BiasWeights,
    pub detection: DetectionParams,
    pub predation: PredationParams,
    pub volume: VolumeParams,
    pub size_buckets: Vec<SizeBucket>,
    pub species: BTreeMap<Species, SpeciesData>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            population: PopulationParams::default(),
            movement: MovementParams::default(),
            bias: BiasWeights::default(),
            detection: DetectionParams::default(),
            predation: PredationParams::default(),
            volume: VolumeParams::default(),
            size_buckets: default_size_buckets(),
            species: default_species_table(),
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Repair values the tick cannot run with. Each repair is logged.
    pub fn sanitize(&mut self) {
        let defaults = VolumeParams::default();
        let volume = &mut self.volume;
        if !(volume.min_volume.is_finite() && volume.min_volume > 0.0) {
            warn!(min_volume = volume.min_volume, "invalid min_volume, using default");
            volume.min_volume = defaults.min_volume;
        }
        if !volume.max_volume.is_finite() {
            warn!(max_volume = volume.max_volume, "invalid max_volume, using default");
            volume.max_volume = defaults.max_volume.max(volume.min_volume);
        }
        if volume.min_volume > volume.max_volume {
            warn!(
                min_volume = volume.min_volume,
                max_volume = volume.max_volume,
                "volume limits inverted, swapping"
            );
            std::mem::swap(&mut volume.min_volume, &mut volume.max_volume);
        }

        let movement = &mut self.movement;
        if !movement.turn_rate.is_finite() {
            warn!(turn_rate = movement.turn_rate, "invalid turn_rate, using default");
            movement.turn_rate = MovementParams::default().turn_rate;
        } else if movement.turn_rate < 0.0 {
            warn!(turn_rate = movement.turn_rate, "negative turn_rate, using magnitude");
            movement.turn_rate = movement.turn_rate.abs();
        }
    }
}

/// Squared distances derived from the config, cached for the hot loops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedRanges {
    pub flee_sq: f32,
    pub chase_sq: f32,
    pub eat_sq: f32,
    pub arrival_sq: f32,
}

impl DerivedRanges {
    pub fn from_config(config: &SimConfig) -> Self {
        let sq = |v: f32| v * v;
        Self {
            flee_sq: sq(config.detection.flee_range),
            chase_sq: sq(config.detection.chase_range),
            eat_sq: sq(config.detection.eat_range),
            arrival_sq: sq(config.movement.arrival_distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_json() {
        let config = SimConfig::default();
        let json = config.to_json().unwrap();
        let restored = SimConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "detection": { "eat_range": 5.0 },
            "population": { "target": 12, "school_size": [2, 3] }
        }"#;
        let config = SimConfig::from_json(json).unwrap();
        assert_eq!(config.detection.eat_range, 5.0);
        assert_eq!(config.detection.flee_range, 30.0);
        assert_eq!(config.population.target, 12);
        assert_eq!(config.population.school_size, (2, 3));
        assert_eq!(config.movement.path_length, 10);
        assert_eq!(config.species.len(), Species::ALL.len());
    }

    #[test]
    fn species_table_loads_from_json() {
        let json = r#"{
            "species": {
                "Tuna": {
                    "class": "Fish",
                    "base_speed": 9.0,
                    "capsule": { "radius": 2.0, "half_height": 3.0 },
                    "visual_volume": 70.0,
                    "size_multiplier": 1.0,
                    "schooling": true,
                    "spawn_weight": 1.0,
                    "variants": 1
                }
            }
        }"#;
        let config = SimConfig::from_json(json).unwrap();
        assert_eq!(config.species.len(), 1);
        assert_eq!(config.species[&Species::Tuna].base_speed, 9.0);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            SimConfig::from_json("{ not json"),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            SimConfig::from_json(r#"{ "detection": { "eat_range": "far" } }"#),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn derived_ranges_are_squares() {
        let mut config = SimConfig::default();
        config.detection.eat_range = 4.0;
        config.movement.arrival_distance = 1.5;
        let ranges = DerivedRanges::from_config(&config);
        assert_eq!(ranges.eat_sq, 16.0);
        assert_eq!(ranges.arrival_sq, 2.25);
        assert_eq!(ranges.flee_sq, 900.0);
    }

    #[test]
    fn sanitize_repairs_inverted_limits_and_negative_turn_rate() {
        let mut config = SimConfig::default();
        config.volume.min_volume = 10.0;
        config.volume.max_volume = 5.0;
        config.movement.turn_rate = -1.0;
        config.sanitize();
        assert_eq!(config.volume.min_volume, 5.0);
        assert_eq!(config.volume.max_volume, 10.0);
        assert_eq!(config.movement.turn_rate, 1.0);
    }

    #[test]
    fn sanitize_replaces_non_finite_values() {
        let mut config = SimConfig::default();
        config.volume.min_volume = f64::NAN;
        config.volume.max_volume = f64::INFINITY;
        config.movement.turn_rate = f32::NAN;
        config.sanitize();
        assert_eq!(config.volume, VolumeParams::default());
        assert_eq!(config.movement.turn_rate, MovementParams::default().turn_rate);
    }

    #[test]
    fn sanitize_leaves_defaults_alone() {
        let mut config = SimConfig::default();
        config.sanitize();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn volume_clamp_tolerates_inverted_limits() {
        let limits = VolumeParams {
            min_volume: 10.0,
            max_volume: 5.0,
            ..VolumeParams::default()
        };
        assert_eq!(limits.clamp(7.0), 5.0);
        assert_eq!(limits.clamp(f64::NAN), 5.0);
    }

    #[test]
    fn default_size_buckets_are_ordered_and_weighted() {
        let buckets = default_size_buckets();
        assert_eq!(buckets.len(), 5);
        for pair in buckets.windows(2) {
            assert!(pair[0].max_scale <= pair[1].min_scale + 1e-12);
        }
        let total: f32 = buckets.iter().map(|b| b.weight).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }
}
