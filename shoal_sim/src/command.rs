// Commands that mutate simulation state from outside.
//
// Host input (players joining, leaving, moving, and touching each other)
// arrives as `SimCommand`s passed to `SimState::step`, which applies them
// in slice order before anything else happens in the tick. Every action
// also has a direct method on `SimState` for hosts that drive the sim
// call-by-call.
//
// See also: `sim.rs` for `apply_command()`, `predation.rs` for the
// player-vs-player contact rule.

use crate::types::PlayerId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimCommand {
    pub player_id: PlayerId,
    pub action: SimAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimAction {
    /// Register a player and its volume record.
    Join {
        is_local: bool,
        position: Vec3,
        natural_visual_volume: f64,
        natural_physics_volume: f64,
        /// Starting world volume; the starter volume if absent.
        initial_volume: Option<f64>,
    },
    /// Remove the player and its volume record.
    Leave,
    /// Mirror the player's current world position.
    Move { position: Vec3 },
    /// Two players touched. Volumes are the ones each side reported.
    Contact {
        other: PlayerId,
        own_volume: f64,
        other_volume: f64,
    },
}

impl SimCommand {
    pub fn new(player_id: PlayerId, action: SimAction) -> Self {
        Self { player_id, action }
    }
}
