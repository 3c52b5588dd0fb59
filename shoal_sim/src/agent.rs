// Agents, schools, and players: the mutable entities of the simulation.
//
// An `Agent` is one NPC creature. Its AI state is a tagged enum carrying
// only the fields that state needs (the threat for `Flee`, the prey for
// `Chase`, the leader for `School`), so "chasing nobody" cannot be
// represented. School leaders keep an ordinary state plus `school`; only
// followers are in `AiState::School`.
//
// Sizes are held two ways. `scale` and `capsule` describe the body and are
// what NPC growth changes; the entity's world volume in the
// `VolumeRegistry` is what every size comparison reads. At spawn and after
// each meal the registry is set from the scaled capsule volume.
//
// `Player` is the sim's view of a human-controlled creature: a position the
// host pushes in every tick, a local/remote flag, and the simulated time of
// its last meal for the eat cooldown.
//
// See also: `ai.rs` (state transitions and movement), `population.rs`
// (creation, removal, school hand-off), `registry.rs` (volumes).

use crate::host::CapsuleShape;
use crate::types::{AgentId, CreatureClass, EntityId, GridIndex, PlayerId, SchoolId, Species};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Behavior state of an NPC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiState {
    /// Drift along the personal preferred direction.
    Wander,
    /// Swim away from a larger creature.
    Flee { threat: EntityId },
    /// Swim toward a smaller creature; the agent is an active chaser.
    Chase { prey: EntityId },
    /// Follow a school leader's path.
    School { leader: AgentId },
}

impl AiState {
    pub fn name(&self) -> &'static str {
        match self {
            AiState::Wander => "wander",
            AiState::Flee { .. } => "flee",
            AiState::Chase { .. } => "chase",
            AiState::School { .. } => "school",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub species: Species,
    pub class: CreatureClass,
    /// Visual variant, `0..SpeciesData::variants`.
    pub variant: u8,

    pub position: Vec3,
    /// Unit movement heading, smoothed toward each waypoint.
    pub heading: Vec3,
    /// Rotation about +Y in radians, `atan2(heading.x, heading.z)`.
    pub yaw: f32,

    /// Uniform body scale relative to the species' unit capsule.
    pub scale: f64,
    /// Collision capsule at the current scale.
    pub capsule: CapsuleShape,
    /// Volume of `capsule`.
    pub physics_volume: f64,
    /// Visual mesh volume at the current scale.
    pub visual_volume: f64,

    pub state: AiState,
    pub path: Vec<GridIndex>,
    pub path_cursor: usize,

    pub base_speed: f32,
    pub speed: f32,

    /// Fixed unit vector rolled at spawn; biases every planned step.
    pub preferred_direction: Vec3,
    pub school: Option<SchoolId>,
}

impl Agent {
    pub fn path_exhausted(&self) -> bool {
        self.path_cursor >= self.path.len()
    }

    pub fn current_waypoint(&self) -> Option<GridIndex> {
        self.path.get(self.path_cursor).copied()
    }

    pub fn is_school_follower(&self) -> bool {
        matches!(self.state, AiState::School { .. })
    }

    /// Threat or prey the current state is reacting to.
    pub fn target(&self) -> Option<EntityId> {
        match self.state {
            AiState::Flee { threat } => Some(threat),
            AiState::Chase { prey } => Some(prey),
            AiState::Wander | AiState::School { .. } => None,
        }
    }

    /// Drop the current plan so the agent replans on its next update.
    pub fn clear_path(&mut self) {
        self.path.clear();
        self.path_cursor = 0;
    }
}

/// A group of agents sharing the leader's path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub leader: AgentId,
    /// Members in placement order; the leader is among them.
    pub members: Vec<AgentId>,
    pub species: Species,
    pub class: CreatureClass,
}

impl School {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.members.contains(&agent)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Controlled on this machine. Only local players eat NPCs and can be
    /// eaten here; remote players are resolved by their own peer.
    pub is_local: bool,
    pub position: Vec3,
    /// Simulated time of the last meal, for the eat cooldown.
    pub last_eat_time: Option<f64>,
    /// Cleared when the player is eaten. Terminal.
    pub alive: bool,
}

impl Player {
    pub fn new(id: PlayerId, is_local: bool, position: Vec3) -> Self {
        Self {
            id,
            is_local,
            position,
            last_eat_time: None,
            alive: true,
        }
    }

    /// Whether the cooldown since the last meal has elapsed at `now`.
    pub fn can_eat_at(&self, now: f64, cooldown: f64) -> bool {
        self.last_eat_time.is_none_or(|last| now - last >= cooldown)
    }
}
