// Simulation context and tick loop.
//
// `SimState` owns everything the core mutates: the navigation grid, the
// agent spatial index, agents and schools (`BTreeMap`s, so iteration is
// ordered by ID and deterministic), the active-chaser set, the volume
// registry, players, the meal history, the PRNG, and the clock. There is no
// module-level state; any number of simulations can live in one process.
//
// The behavior is split across modules as `impl SimState` blocks:
// - `ai.rs`: replanning, path following, threat/prey search.
// - `predation.rs`: meal resolution for all three encounter kinds.
// - `population.rs`: spawning, removal, school membership.
// This file holds construction, accessors, players, commands, and `step`.
//
// One `step(commands, dt)`:
//   1. advance tick and simulated time by `dt`
//   2. apply commands in slice order
//   3. top the population up to target
//   4. for each agent in ID order: replan if its path is exhausted,
//      otherwise move along it and re-file it in the spatial index at once
//   5. NPC predation over active chasers (collect, then apply)
//   6. player-vs-NPC predation for every local player
//   7. return the events queued since the last step
//
// Because step 4 re-files each agent right after it moves, agents later in
// ID order see fresher positions of earlier ones during threat/prey search.
// That is deterministic for a given seed and command stream.
//
// See also: `command.rs` for inputs, `event.rs` for outputs, `config.rs`
// for every tunable.
//
// **Critical constraint: determinism.** All randomness comes from `rng`,
// all time from the `dt` passed to `step`. Same seed plus same commands and
// `dt`s gives the same run.

use crate::agent::{Agent, Player, School};
use crate::command::{SimAction, SimCommand};
use crate::config::{DerivedRanges, SimConfig};
use crate::error::SimError;
use crate::event::{Listeners, Meal, MealHistory, SimEvent, SimEventKind};
use crate::host::SamplePointProvider;
use crate::nav::{HASH_CELL_FACTOR, NavGrid};
use crate::registry::{VolumeRecord, VolumeRegistry};
use crate::spatial::SpatialIndex;
use crate::types::{AgentId, EntityId, PlayerId, SchoolId, SessionMode};
use glam::Vec3;
use shoal_prng::GameRng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Output of one `step`.
#[derive(Clone, Debug, Default)]
pub struct StepResult {
    pub events: Vec<SimEvent>,
}

#[derive(Debug)]
pub struct SimState {
    pub(crate) config: SimConfig,
    pub(crate) ranges: DerivedRanges,
    pub(crate) grid: NavGrid,
    pub(crate) spatial: SpatialIndex,
    pub(crate) agents: BTreeMap<AgentId, Agent>,
    pub(crate) schools: BTreeMap<SchoolId, School>,
    pub(crate) active_chasers: BTreeSet<AgentId>,
    pub(crate) registry: VolumeRegistry,
    pub(crate) players: BTreeMap<PlayerId, Player>,
    pub(crate) meals: MealHistory,
    pub(crate) rng: GameRng,
    pub(crate) tick: u64,
    pub(crate) elapsed: f64,
    pub(crate) mode: SessionMode,
    pub(crate) next_agent_id: u64,
    pub(crate) next_school_id: u64,
    pub(crate) pending_events: Vec<SimEvent>,
    pub(crate) listeners: Listeners,
}

impl SimState {
    /// Build a simulation over the given sample points. No agents exist
    /// until the first `step` (or an explicit `maintain_population`).
    pub fn new(
        seed: u64,
        mut config: SimConfig,
        points: Vec<Vec3>,
        spacing: f32,
    ) -> Result<Self, SimError> {
        config.sanitize();
        let grid = NavGrid::build(points, spacing)?;
        let spatial = SpatialIndex::new(spacing * HASH_CELL_FACTOR)?;
        info!(points = grid.len(), spacing, seed, "simulation created");
        Ok(Self {
            ranges: DerivedRanges::from_config(&config),
            registry: VolumeRegistry::new(config.volume.clone()),
            meals: MealHistory::new(config.predation.meal_history_capacity),
            config,
            grid,
            spatial,
            agents: BTreeMap::new(),
            schools: BTreeMap::new(),
            active_chasers: BTreeSet::new(),
            players: BTreeMap::new(),
            rng: GameRng::new(seed),
            tick: 0,
            elapsed: 0.0,
            mode: SessionMode::default(),
            next_agent_id: 0,
            next_school_id: 0,
            pending_events: Vec::new(),
            listeners: Listeners::default(),
        })
    }

    pub fn from_provider(
        seed: u64,
        config: SimConfig,
        provider: &dyn SamplePointProvider,
    ) -> Result<Self, SimError> {
        Self::new(seed, config, provider.sample_points(), provider.spacing())
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds. Negative or non-finite `dt`
    /// is treated as zero.
    pub fn step(&mut self, commands: &[SimCommand], dt: f64) -> StepResult {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.tick += 1;
        self.elapsed += dt;

        for command in commands {
            self.apply_command(command);
        }

        let target = self.config.population.target;
        self.maintain_population(target);
        self.update_agents(dt as f32);
        self.resolve_npc_predation();
        self.resolve_player_predation();

        StepResult {
            events: self.drain_events(),
        }
    }

    fn apply_command(&mut self, command: &SimCommand) {
        let player = command.player_id;
        match &command.action {
            SimAction::Join {
                is_local,
                position,
                natural_visual_volume,
                natural_physics_volume,
                initial_volume,
            } => {
                self.join_player(
                    player,
                    *is_local,
                    *position,
                    *natural_visual_volume,
                    *natural_physics_volume,
                    *initial_volume,
                );
            }
            SimAction::Leave => {
                self.leave_player(player);
            }
            SimAction::Move { position } => {
                if !self.move_player(player, *position) {
                    debug!(%player, "move for unknown player ignored");
                }
            }
            SimAction::Contact {
                other,
                own_volume,
                other_volume,
            } => {
                self.resolve_player_contact(player, *other, *own_volume, *other_volume);
            }
        }
    }

    pub(crate) fn emit(&mut self, kind: SimEventKind) {
        self.pending_events.push(SimEvent {
            tick: self.tick,
            kind,
        });
    }

    /// Take events queued by direct calls since the last step.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Add (or re-add) a player and register its volumes.
    pub fn join_player(
        &mut self,
        id: PlayerId,
        is_local: bool,
        position: Vec3,
        natural_visual_volume: f64,
        natural_physics_volume: f64,
        initial_volume: Option<f64>,
    ) -> VolumeRecord {
        let record = self.registry.register(
            id.into(),
            natural_visual_volume,
            natural_physics_volume,
            initial_volume,
            &mut self.rng,
        );
        self.players.insert(id, Player::new(id, is_local, position));
        info!(player = %id, is_local, volume = record.total_world_volume, "player joined");
        self.emit(SimEventKind::PlayerJoined { player: id });
        record
    }

    /// Remove a player. Agents chasing or fleeing it drop the target at
    /// their next replan.
    pub fn leave_player(&mut self, id: PlayerId) -> bool {
        if self.players.remove(&id).is_none() {
            return false;
        }
        self.registry.unregister(id.into());
        info!(player = %id, "player left");
        self.emit(SimEventKind::PlayerLeft { player: id });
        true
    }

    pub fn move_player(&mut self, id: PlayerId, position: Vec3) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.position = position;
                true
            }
            None => false,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Called synchronously for every meal as it is resolved.
    pub fn on_eat(&mut self, listener: impl FnMut(&Meal) + Send + 'static) {
        self.listeners.add_on_eat(Box::new(listener));
    }

    /// Called synchronously when a local player is eaten.
    pub fn on_player_eaten(&mut self, listener: impl FnMut(&Meal) + Send + 'static) {
        self.listeners.add_on_player_eaten(Box::new(listener));
    }

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn ranges(&self) -> DerivedRanges {
        self.ranges
    }

    /// Mutate the config. The result is sanitized, then cached squared
    /// ranges, registry limits, and the meal history capacity are refreshed.
    pub fn update_config(&mut self, f: impl FnOnce(&mut SimConfig)) {
        f(&mut self.config);
        self.config.sanitize();
        self.ranges = DerivedRanges::from_config(&self.config);
        self.registry.set_limits(self.config.volume.clone());
        self.meals
            .set_capacity(self.config.predation.meal_history_capacity);
        debug!("config updated");
    }

    pub fn session_mode(&self) -> SessionMode {
        self.mode
    }

    pub fn set_session_mode(&mut self, mode: SessionMode) {
        self.mode = mode;
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since creation.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn school(&self, id: SchoolId) -> Option<&School> {
        self.schools.get(&id)
    }

    pub fn schools(&self) -> impl Iterator<Item = &School> {
        self.schools.values()
    }

    pub fn active_chasers(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.active_chasers.iter().copied()
    }

    pub fn is_active_chaser(&self, id: AgentId) -> bool {
        self.active_chasers.contains(&id)
    }

    pub fn registry(&self) -> &VolumeRegistry {
        &self.registry
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn meal_history(&self) -> impl Iterator<Item = &Meal> {
        self.meals.iter()
    }

    /// World volume of any entity, from the registry.
    pub fn volume_of(&self, entity: EntityId) -> Option<f64> {
        self.registry.world_volume(entity)
    }

    /// Current position of an NPC or a living player.
    pub fn position_of(&self, entity: EntityId) -> Option<Vec3> {
        match entity {
            EntityId::Npc(id) => self.agents.get(&id).map(|a| a.position),
            EntityId::Player(id) => self
                .players
                .get(&id)
                .filter(|p| p.alive)
                .map(|p| p.position),
        }
    }
}
