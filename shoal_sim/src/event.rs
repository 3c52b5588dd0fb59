// Simulation output: narrative events, meal records, and eat listeners.
//
// Everything that happens during a tick that a collaborator might care
// about (spawns, despawns, meals, school changes, players joining) becomes
// a `SimEvent` stamped with the tick. `SimState::step` returns the events
// of that step in `StepResult`; calls made between steps (direct
// `remove_agent`, `join_player`, ...) queue events that the next `step`
// (or `drain_events`) returns.
//
// Meals additionally go to registered listeners the moment they are
// resolved, before the tick finishes: `on_eat` for every meal and
// `on_player_eaten` when the local player is the prey. Listeners must not
// assume async delivery.
//
// See also: `predation.rs` which produces meals, `sim.rs` which owns the
// pending queue and listener set.

use crate::types::{AgentId, EntityId, PlayerId, SchoolId, Species};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// One resolved predation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub predator: EntityId,
    pub prey: EntityId,
    /// `None` when the prey was a player.
    pub prey_species: Option<Species>,
    /// Prey's world volume at the moment it was eaten.
    pub prey_volume: f64,
    /// Volume actually added to the predator after clamping.
    pub volume_gained: f64,
    /// Predator's world volume after the meal.
    pub new_volume: f64,
    /// The unclamped result exceeded the volume ceiling.
    pub was_capped: bool,
    /// Simulated seconds since the start of the run.
    pub time: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    AgentSpawned { agent: AgentId, species: Species },
    AgentDespawned { agent: AgentId },
    Ate(Meal),
    /// A local player was eaten. Terminal for that player.
    PlayerEaten(Meal),
    SchoolFormed {
        school: SchoolId,
        leader: AgentId,
        size: usize,
    },
    SchoolDissolved { school: SchoolId },
    SchoolLeaderChanged { school: SchoolId, leader: AgentId },
    PlayerJoined { player: PlayerId },
    PlayerLeft { player: PlayerId },
}

// ---------------------------------------------------------------------------
// Meal history
// ---------------------------------------------------------------------------

/// Capped ring of recent meals, most recent first.
#[derive(Clone, Debug, Default)]
pub struct MealHistory {
    meals: VecDeque<Meal>,
    capacity: usize,
}

impl MealHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            meals: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, meal: Meal) {
        if self.capacity == 0 {
            return;
        }
        self.meals.push_front(meal);
        self.meals.truncate(self.capacity);
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.meals.truncate(capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Meal> {
        self.meals.iter()
    }

    pub fn latest(&self) -> Option<&Meal> {
        self.meals.front()
    }

    pub fn len(&self) -> usize {
        self.meals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

pub type MealListener = Box<dyn FnMut(&Meal) + Send>;

/// Synchronous meal callbacks.
#[derive(Default)]
pub struct Listeners {
    on_eat: Vec<MealListener>,
    on_player_eaten: Vec<MealListener>,
}

impl Listeners {
    pub fn add_on_eat(&mut self, listener: MealListener) {
        self.on_eat.push(listener);
    }

    pub fn add_on_player_eaten(&mut self, listener: MealListener) {
        self.on_player_eaten.push(listener);
    }

    pub fn fire_eat(&mut self, meal: &Meal) {
        for listener in &mut self.on_eat {
            listener(meal);
        }
    }

    pub fn fire_player_eaten(&mut self, meal: &Meal) {
        for listener in &mut self.on_player_eaten {
            listener(meal);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("on_eat", &self.on_eat.len())
            .field("on_player_eaten", &self.on_player_eaten.len())
            .finish()
    }
}
