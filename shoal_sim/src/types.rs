// Core types shared across the simulation.
//
// Defines the continuous-space vector type (re-exported `glam::Vec3`), the
// strongly-typed entity identifiers, navigation grid indices, and the
// creature classification enums used as keys into the species table.
//
// Agent, player, and school IDs are sequential integers handed out by
// `SimState`; they never come from OS entropy, so two runs with the same
// seed and the same commands allocate the same IDs.
//
// See also: `sim.rs` for the ID counters, `species.rs` for the data each
// `Species` maps to, `nav.rs` for `GridIndex` consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use glam::Vec3;

// ---------------------------------------------------------------------------
// Strongly-typed entity ID wrappers
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $tag, self.0)
            }
        }
    };
}

entity_id!(/// Unique identifier for an NPC agent.
AgentId, "npc");
entity_id!(/// Unique identifier for a player, assigned by the host.
PlayerId, "player");
entity_id!(/// Unique identifier for a school of agents.
SchoolId, "school");

/// Any entity that owns a volume record: an NPC or a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityId {
    Npc(AgentId),
    Player(PlayerId),
}

impl EntityId {
    pub fn is_player(self) -> bool {
        matches!(self, EntityId::Player(_))
    }

    pub fn as_npc(self) -> Option<AgentId> {
        match self {
            EntityId::Npc(id) => Some(id),
            EntityId::Player(_) => None,
        }
    }

    pub fn as_player(self) -> Option<PlayerId> {
        match self {
            EntityId::Player(id) => Some(id),
            EntityId::Npc(_) => None,
        }
    }
}

impl From<AgentId> for EntityId {
    fn from(id: AgentId) -> Self {
        EntityId::Npc(id)
    }
}

impl From<PlayerId> for EntityId {
    fn from(id: PlayerId) -> Self {
        EntityId::Player(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Npc(id) => id.fmt(f),
            EntityId::Player(id) => id.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// Navigation grid index
// ---------------------------------------------------------------------------

/// Index of a sample point in the `NavGrid`. Compact `u32`, not a UUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex(pub u32);

impl GridIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// Creature classification
// ---------------------------------------------------------------------------

/// Broad body plan. Only used to pick defaults in the species table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CreatureClass {
    Fish,
    Mammal,
    Reptile,
    Cephalopod,
    Cnidarian,
}

/// Species tag. Behavior differences live in `SpeciesData`, not in code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Sardine,
    Anchovy,
    Mackerel,
    Tuna,
    Grouper,
    Barracuda,
    Shark,
    Squid,
    Jellyfish,
    SeaTurtle,
    Dolphin,
    Orca,
}

impl Species {
    pub const ALL: [Species; 12] = [
        Species::Sardine,
        Species::Anchovy,
        Species::Mackerel,
        Species::Tuna,
        Species::Grouper,
        Species::Barracuda,
        Species::Shark,
        Species::Squid,
        Species::Jellyfish,
        Species::SeaTurtle,
        Species::Dolphin,
        Species::Orca,
    ];
}

/// Whether player-vs-NPC kills are backfilled locally.
///
/// In a networked session another peer owns the NPC population, so a
/// player's meal removes the NPC without an immediate local respawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    #[default]
    Solo,
    Networked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_display() {
        assert_eq!(EntityId::Npc(AgentId(7)).to_string(), "npc#7");
        assert_eq!(EntityId::Player(PlayerId(3)).to_string(), "player#3");
        assert_eq!(SchoolId(1).to_string(), "school#1");
    }

    #[test]
    fn entity_id_conversions() {
        let npc: EntityId = AgentId(4).into();
        assert_eq!(npc.as_npc(), Some(AgentId(4)));
        assert_eq!(npc.as_player(), None);
        assert!(!npc.is_player());

        let player: EntityId = PlayerId(9).into();
        assert!(player.is_player());
        assert_eq!(player.as_player(), Some(PlayerId(9)));
    }

    #[test]
    fn species_serializes_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Species::Orca, 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"Orca":1}"#);
    }
}
