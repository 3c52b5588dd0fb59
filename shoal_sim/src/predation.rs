// Predation: who can eat whom, and what happens when they do.
//
// The feeding rule is the 5% rule: a predator must be at least 1.05 times
// its prey's world volume. `feeding_relationship` reads the same ratio from
// one side and reports `CanBeEaten` at 0.95 or below. The thresholds are
// not reciprocals (1/1.05 ≈ 0.952), so there is a narrow band near parity
// where both sides read Neutral. Growth from a meal is linear: the prey's
// volume times `food_ratio`.
//
// Three kinds of encounter are resolved here:
// - NPC vs NPC (and NPC vs local player): only active chasers are checked,
//   against the prey they are chasing. All meals are collected first and
//   applied after the scan, so removals never disturb the iteration. A
//   predator grows by scale (`growth_per_eat`, capped at `max_scale`) and
//   its world volume is reset to its new capsule volume. NPC prey are
//   always backfilled.
// - Player vs NPC: each local player, once its cooldown has elapsed, eats
//   the first edible NPC the spatial query returns within eat range (not
//   necessarily the nearest). The prey is backfilled only in a solo
//   session; in a networked session another peer owns the population.
// - Player vs player: the host reports both volumes on contact. Growth goes
//   through the registry only if the predator is local; a local prey is
//   killed and gets a `PlayerEaten` event on top of the usual `Ate`.
//
// Every meal lands in the history ring, the event queue, and the `on_eat`
// listeners, in the tick that resolved it.
//
// See also: `registry.rs` for volume clamping and `was_capped`, `ai.rs` for
// how agents become chasers, `population.rs` for removal and backfill.

use crate::agent::AiState;
use crate::event::{Meal, SimEventKind};
use crate::registry::VolumeUpdate;
use crate::sim::SimState;
use crate::types::{AgentId, EntityId, PlayerId, SessionMode, Species};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Minimum predator/prey volume ratio for a meal.
pub const EAT_THRESHOLD: f64 = 1.05;

/// Ratio at or below which the other side can eat you.
pub const BE_EATEN_THRESHOLD: f64 = 0.95;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedingRelationship {
    CanEat,
    CanBeEaten,
    Neutral,
}

pub fn can_eat(predator_volume: f64, prey_volume: f64) -> bool {
    prey_volume > 0.0 && predator_volume / prey_volume >= EAT_THRESHOLD
}

/// How `a` relates to `b`.
pub fn feeding_relationship(a: f64, b: f64) -> FeedingRelationship {
    let ratio = a / b;
    if ratio >= EAT_THRESHOLD {
        FeedingRelationship::CanEat
    } else if ratio <= BE_EATEN_THRESHOLD {
        FeedingRelationship::CanBeEaten
    } else {
        FeedingRelationship::Neutral
    }
}

/// Volume a predator gains from eating `prey_volume`.
pub fn growth_from_consuming(prey_volume: f64, food_ratio: f64) -> f64 {
    prey_volume * food_ratio
}

impl SimState {
    /// Resolve meals for every active chaser within eat range of its prey.
    /// Returns the number of meals.
    pub(crate) fn resolve_npc_predation(&mut self) -> usize {
        let eat_sq = self.ranges.eat_sq;
        let mut claimed: BTreeSet<EntityId> = BTreeSet::new();
        let mut meals: Vec<(AgentId, EntityId)> = Vec::new();

        for &id in &self.active_chasers {
            let Some(agent) = self.agents.get(&id) else {
                continue;
            };
            let AiState::Chase { prey } = agent.state else {
                continue;
            };
            let predator = EntityId::Npc(id);
            if claimed.contains(&predator) || claimed.contains(&prey) {
                continue;
            }
            // Remote players are resolved on their own peer.
            if let EntityId::Player(p) = prey {
                if !self.players.get(&p).is_some_and(|pl| pl.is_local) {
                    continue;
                }
            }
            let Some(prey_position) = self.position_of(prey) else {
                continue;
            };
            if prey_position.distance_squared(agent.position) > eat_sq {
                continue;
            }
            let (Some(own), Some(theirs)) = (
                self.registry.world_volume(predator),
                self.registry.world_volume(prey),
            ) else {
                continue;
            };
            if !can_eat(own, theirs) {
                continue;
            }
            claimed.insert(predator);
            claimed.insert(prey);
            meals.push((id, prey));
        }

        for &(predator, prey) in &meals {
            self.apply_npc_meal(predator, prey);
        }
        if meals.iter().any(|(_, prey)| !prey.is_player()) {
            let target = self.config.population.target;
            self.maintain_population(target);
        }
        meals.len()
    }

    fn apply_npc_meal(&mut self, predator: AgentId, prey: EntityId) {
        let Some(prey_volume) = self.registry.world_volume(prey) else {
            return;
        };
        let prey_species = prey
            .as_npc()
            .and_then(|id| self.agents.get(&id))
            .map(|a| a.species);
        match prey {
            EntityId::Npc(id) => {
                self.remove_agent(id, false);
            }
            EntityId::Player(id) => self.kill_player(id),
        }
        let Some(update) = self.grow_npc(predator) else {
            return;
        };
        let meal = self.meal(predator.into(), prey, prey_species, prey_volume, &update);
        self.record_meal(meal, prey.is_player());
    }

    /// Scale an NPC up by one meal's growth and reset its world volume to
    /// the new capsule volume.
    pub(crate) fn grow_npc(&mut self, id: AgentId) -> Option<VolumeUpdate> {
        let growth = self.config.predation.growth_per_eat;
        let max_scale = self.config.predation.max_scale;
        let agent = self.agents.get_mut(&id)?;
        let data = self.config.species.get(&agent.species)?;

        let scale = (agent.scale * (1.0 + growth)).min(max_scale).max(agent.scale);
        agent.scale = scale;
        agent.capsule = data.capsule.scaled(scale);
        agent.physics_volume = agent.capsule.volume();
        agent.visual_volume = data.visual_volume * scale.powi(3);
        let physics_volume = agent.physics_volume;

        match self.registry.update_world_volume(id.into(), physics_volume) {
            Ok(update) => Some(update),
            Err(err) => {
                warn!(agent = %id, %err, "growth skipped");
                None
            }
        }
    }

    /// Player-vs-NPC for every living local player.
    pub(crate) fn resolve_player_predation(&mut self) -> usize {
        let locals: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.is_local && p.alive)
            .map(|p| p.id)
            .collect();
        locals
            .into_iter()
            .filter(|&id| self.player_try_eat(id).is_some())
            .count()
    }

    /// Let a local player eat the first edible NPC in range, if its
    /// cooldown has elapsed.
    pub fn player_try_eat(&mut self, id: PlayerId) -> Option<Meal> {
        let player = self.players.get(&id).filter(|p| p.alive && p.is_local)?;
        if !player.can_eat_at(self.elapsed, self.config.predation.eat_cooldown) {
            return None;
        }
        let position = player.position;
        let own = self.registry.world_volume(id.into())?;
        let eat_sq = self.ranges.eat_sq;

        let target = self
            .spatial
            .query_radius(position, eat_sq)
            .into_iter()
            .find(|candidate| {
                self.agents
                    .get(candidate)
                    .is_some_and(|a| a.position.distance_squared(position) <= eat_sq)
                    && self
                        .registry
                        .world_volume((*candidate).into())
                        .is_some_and(|v| can_eat(own, v))
            })?;

        let prey_volume = self.registry.world_volume(target.into())?;
        let prey_species = self.agents.get(&target).map(|a| a.species);
        let gain = growth_from_consuming(prey_volume, self.config.predation.food_ratio);
        let update = match self.registry.add_volume(id.into(), gain) {
            Ok(update) => update,
            Err(err) => {
                warn!(player = %id, %err, "player meal skipped");
                return None;
            }
        };
        if let Some(player) = self.players.get_mut(&id) {
            player.last_eat_time = Some(self.elapsed);
        }

        let respawn = self.mode == SessionMode::Solo;
        self.remove_agent(target, respawn);
        let meal = self.meal(id.into(), target.into(), prey_species, prey_volume, &update);
        self.record_meal(meal.clone(), false);
        Some(meal)
    }

    /// Two players touched, reporting `volume_a` and `volume_b`. Returns the
    /// meal if one of them could eat the other.
    pub fn resolve_player_contact(
        &mut self,
        a: PlayerId,
        b: PlayerId,
        volume_a: f64,
        volume_b: f64,
    ) -> Option<Meal> {
        if a == b || [a, b].iter().any(|p| self.players.get(p).is_some_and(|pl| !pl.alive)) {
            return None;
        }
        let (predator, prey, predator_volume, prey_volume) =
            match feeding_relationship(volume_a, volume_b) {
                FeedingRelationship::CanEat => (a, b, volume_a, volume_b),
                FeedingRelationship::CanBeEaten => (b, a, volume_b, volume_a),
                FeedingRelationship::Neutral => return None,
            };
        let gain = growth_from_consuming(prey_volume, self.config.predation.food_ratio);
        let is_local = |id: PlayerId| self.players.get(&id).is_some_and(|p| p.is_local);
        let predator_local = is_local(predator);
        let prey_local = is_local(prey);

        let (volume_gained, new_volume, was_capped) = if predator_local {
            match self.registry.add_volume(predator.into(), gain) {
                Ok(update) => (
                    update.volume_gained,
                    update.record.total_world_volume,
                    update.was_capped,
                ),
                Err(err) => {
                    warn!(player = %predator, %err, "contact growth skipped");
                    return None;
                }
            }
        } else {
            let limits = self.registry.limits();
            let raw = predator_volume + gain;
            let clamped = limits.clamp(raw);
            (clamped - predator_volume, clamped, raw > limits.max_volume)
        };

        if prey_local {
            self.kill_player(prey);
        }
        let meal = Meal {
            predator: predator.into(),
            prey: prey.into(),
            prey_species: None,
            prey_volume,
            volume_gained,
            new_volume,
            was_capped,
            time: self.elapsed,
        };
        self.record_meal(meal.clone(), prey_local);
        Some(meal)
    }

    fn kill_player(&mut self, id: PlayerId) {
        if let Some(player) = self.players.get_mut(&id) {
            player.alive = false;
        }
        self.registry.unregister(id.into());
        info!(player = %id, "player eaten");
    }

    fn meal(
        &self,
        predator: EntityId,
        prey: EntityId,
        prey_species: Option<Species>,
        prey_volume: f64,
        update: &VolumeUpdate,
    ) -> Meal {
        Meal {
            predator,
            prey,
            prey_species,
            prey_volume,
            volume_gained: update.volume_gained,
            new_volume: update.record.total_world_volume,
            was_capped: update.was_capped,
            time: self.elapsed,
        }
    }

    /// History, listeners, and events for a resolved meal.
    fn record_meal(&mut self, meal: Meal, local_player_eaten: bool) {
        info!(
            predator = %meal.predator,
            prey = %meal.prey,
            gained = meal.volume_gained,
            capped = meal.was_capped,
            "meal"
        );
        self.meals.push(meal.clone());
        self.listeners.fire_eat(&meal);
        self.emit(SimEventKind::Ate(meal.clone()));
        if local_player_eaten {
            self.listeners.fire_player_eaten(&meal);
            self.emit(SimEventKind::PlayerEaten(meal));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tests::test_sim;
    use crate::types::GridIndex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn five_percent_rule() {
        assert!(can_eat(10.5, 10.0));
        assert!(!can_eat(10.4, 10.0));
        assert!(!can_eat(10.0, 10.0));
        assert!(!can_eat(5.0, 0.0));
        assert!(!can_eat(5.0, -1.0));
    }

    #[test]
    fn feeding_band_is_asymmetric() {
        use FeedingRelationship::*;
        assert_eq!(feeding_relationship(100.0, 100.0), Neutral);
        assert_eq!(feeding_relationship(106.0, 100.0), CanEat);
        assert_eq!(feeding_relationship(94.0, 100.0), CanBeEaten);
        assert_eq!(feeding_relationship(100.0, 103.0), Neutral);
        assert_eq!(feeding_relationship(103.0, 100.0), Neutral);
        // 100/105.1 ≈ 0.9515: the other side can eat us, but we do not read
        // as edible from here.
        assert!(can_eat(105.1, 100.0));
        assert_eq!(feeding_relationship(100.0, 105.1), Neutral);
    }

    #[test]
    fn growth_is_linear() {
        assert_eq!(growth_from_consuming(10.0, 1.0), 10.0);
        assert_eq!(growth_from_consuming(10.0, 0.5), 5.0);
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnMut(&Meal) + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &Meal| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn ate_count(events: &[crate::event::SimEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e.kind, SimEventKind::Ate(_)))
            .count()
    }

    #[test]
    fn player_eats_npc_end_to_end() {
        let mut sim = test_sim(1, 0);
        let prey = sim.spawn_individual_at(Species::Sardine, GridIndex(40), 1.0).unwrap();
        sim.registry.update_world_volume(prey.into(), 10.0).unwrap();
        let at = sim.grid.point(GridIndex(40));
        let player = PlayerId(1);
        sim.join_player(player, true, at, 1.0, 1.0, Some(10.5));
        let (eaten, listener) = counter();
        sim.on_eat(listener);

        let result = sim.step(&[], 0.1);
        assert_eq!(ate_count(&result.events), 1);
        assert_eq!(eaten.load(Ordering::SeqCst), 1);
        assert_eq!(sim.volume_of(player.into()), Some(20.5));
        assert!(sim.agent(prey).is_none());

        let meal = sim.meal_history().next().unwrap();
        assert_eq!(meal.predator, EntityId::Player(player));
        assert_eq!(meal.prey, EntityId::Npc(prey));
        assert_eq!(meal.prey_species, Some(Species::Sardine));
        assert_eq!(meal.volume_gained, 10.0);
        assert!(!meal.was_capped);
        assert!((meal.time - 0.1).abs() < 1e-12);
    }

    #[test]
    fn one_meal_per_cooldown_window() {
        let mut sim = test_sim(2, 0);
        let at = sim.grid.point(GridIndex(40));
        let first = sim.spawn_individual_at(Species::Sardine, GridIndex(40), 1.0).unwrap();
        let second = sim.spawn_individual_at(Species::Sardine, GridIndex(40), 1.0).unwrap();
        let player = PlayerId(1);
        sim.join_player(player, true, at, 1.0, 1.0, Some(100.0));

        let mut meals = 0;
        for _ in 0..4 {
            meals += ate_count(&sim.step(&[], 0.1).events);
        }
        assert_eq!(meals, 1, "two prey in range within 0.4 s");
        let survivor = if sim.agent(first).is_some() { first } else { second };
        assert!(sim.agent(survivor).is_some());

        for _ in 0..3 {
            let Some(position) = sim.agent(survivor).map(|a| a.position) else {
                break;
            };
            let chase = crate::command::SimCommand::new(
                player,
                crate::command::SimAction::Move { position },
            );
            meals += ate_count(&sim.step(&[chase], 0.1).events);
        }
        assert_eq!(meals, 2);
        assert!(sim.agent(survivor).is_none());
    }

    #[test]
    fn player_meal_caps_at_max_volume() {
        let mut sim = test_sim(1, 0);
        let prey = sim.spawn_individual_at(Species::Tuna, GridIndex(40), 1.0).unwrap();
        sim.registry.update_world_volume(prey.into(), 50.0).unwrap();
        let player = PlayerId(1);
        sim.join_player(player, true, sim.grid.point(GridIndex(40)), 1.0, 1.0, Some(990.0));

        let meal = sim.player_try_eat(player).unwrap();
        assert!(meal.was_capped);
        assert_eq!(meal.new_volume, 1000.0);
        assert_eq!(meal.volume_gained, 10.0);
    }

    #[test]
    fn networked_sessions_do_not_backfill_player_kills() {
        let mut sim = test_sim(1, 5);
        sim.maintain_population(5);
        sim.set_session_mode(SessionMode::Networked);
        let prey = sim.agents().next().map(|a| (a.id, a.position)).unwrap();
        sim.registry.update_world_volume(prey.0.into(), 1.0).unwrap();
        sim.join_player(PlayerId(1), true, prey.1, 1.0, 1.0, Some(500.0));

        assert!(sim.player_try_eat(PlayerId(1)).is_some());
        assert_eq!(sim.agent_count(), 4);
    }

    #[test]
    fn remote_players_do_not_eat_locally() {
        let mut sim = test_sim(1, 0);
        let prey = sim.spawn_individual_at(Species::Sardine, GridIndex(40), 1.0).unwrap();
        sim.join_player(PlayerId(1), false, sim.grid.point(GridIndex(40)), 1.0, 1.0, Some(500.0));
        assert!(sim.player_try_eat(PlayerId(1)).is_none());
        assert!(sim.agent(prey).is_some());
    }

    #[test]
    fn chaser_eats_prey_in_range_and_grows() {
        let mut sim = test_sim(3, 0);
        let tuna = sim.spawn_individual_at(Species::Tuna, GridIndex(40), 1.0).unwrap();
        let sardine = sim.spawn_individual_at(Species::Sardine, GridIndex(40), 1.0).unwrap();
        sim.replan_agent(tuna);
        assert!(sim.is_active_chaser(tuna));
        let before = sim.volume_of(tuna.into()).unwrap();

        assert_eq!(sim.resolve_npc_predation(), 1);
        assert!(sim.agent(sardine).is_none());
        let agent = sim.agent(tuna).unwrap();
        assert!((agent.scale - 1.1).abs() < 1e-12);
        let after = sim.volume_of(tuna.into()).unwrap();
        assert!((after - before * 1.1f64.powi(3)).abs() < 1e-6);
        assert!((after - agent.physics_volume).abs() < 1e-9);

        let meal = sim.meal_history().next().unwrap();
        assert_eq!(meal.predator, EntityId::Npc(tuna));
        assert_eq!(meal.prey_species, Some(Species::Sardine));
    }

    #[test]
    fn chaser_out_of_eat_range_does_not_eat() {
        let mut sim = test_sim(3, 0);
        let tuna = sim.spawn_individual_at(Species::Tuna, GridIndex(40), 1.0).unwrap();
        // Four lattice steps (20 units) along x: inside chase range only.
        let sardine = sim.spawn_individual_at(Species::Sardine, GridIndex(44), 1.0).unwrap();
        sim.replan_agent(tuna);
        assert_eq!(sim.agent(tuna).unwrap().state, AiState::Chase { prey: sardine.into() });
        assert_eq!(sim.resolve_npc_predation(), 0);
        assert!(sim.agent(sardine).is_some());
    }

    #[test]
    fn growth_stops_at_max_scale() {
        let mut sim = test_sim(3, 0);
        let tuna = sim.spawn_individual_at(Species::Tuna, GridIndex(40), 2.95).unwrap();
        sim.grow_npc(tuna).unwrap();
        assert_eq!(sim.agent(tuna).unwrap().scale, 3.0);
        sim.grow_npc(tuna).unwrap();
        assert_eq!(sim.agent(tuna).unwrap().scale, 3.0);
    }

    #[test]
    fn two_chasers_one_prey_is_one_meal() {
        let mut sim = test_sim(3, 0);
        let a = sim.spawn_individual_at(Species::Tuna, GridIndex(40), 1.0).unwrap();
        let b = sim.spawn_individual_at(Species::Tuna, GridIndex(40), 1.0).unwrap();
        sim.spawn_individual_at(Species::Sardine, GridIndex(40), 1.0).unwrap();
        sim.replan_agent(a);
        sim.replan_agent(b);
        assert!(sim.is_active_chaser(a) && sim.is_active_chaser(b));
        assert_eq!(sim.resolve_npc_predation(), 1);
        assert_eq!(sim.agent_count(), 2);
    }

    /// Point `predator` at `prey` without going through a replan.
    fn force_chase(sim: &mut SimState, predator: AgentId, prey: AgentId) {
        sim.agents.get_mut(&predator).unwrap().state = AiState::Chase { prey: prey.into() };
        sim.active_chasers.insert(predator);
    }

    /// Spawn three agents on one grid point with volumes 100, 50, 10, in
    /// spawn order `order`, and chain big -> mid -> small.
    fn food_chain(order: [usize; 3]) -> (SimState, [AgentId; 3]) {
        let mut sim = test_sim(3, 0);
        let specs = [(Species::Shark, 100.0), (Species::Tuna, 50.0), (Species::Sardine, 10.0)];
        let mut ids = [AgentId(0); 3];
        for &slot in &order {
            let (species, volume) = specs[slot];
            let id = sim.spawn_individual_at(species, GridIndex(40), 1.0).unwrap();
            sim.registry.update_world_volume(id.into(), volume).unwrap();
            ids[slot] = id;
        }
        let [big, mid, small] = ids;
        force_chase(&mut sim, big, mid);
        force_chase(&mut sim, mid, small);
        sim.drain_events();
        (sim, ids)
    }

    fn assert_gone(sim: &SimState, id: AgentId) {
        assert!(sim.agent(id).is_none());
        assert!(!sim.spatial().contains(id));
        assert!(!sim.registry().contains(id.into()));
        assert!(!sim.is_active_chaser(id));
    }

    #[test]
    fn chained_meal_resolves_once_when_big_predator_comes_first() {
        let (mut sim, [big, mid, small]) = food_chain([0, 1, 2]);
        assert!(big < mid && mid < small);

        assert_eq!(sim.resolve_npc_predation(), 1);
        assert_gone(&sim, mid);
        assert!(sim.agent(big).is_some());
        assert_eq!(sim.volume_of(small.into()), Some(10.0));

        let events = sim.drain_events();
        assert_eq!(ate_count(&events), 1);
        let despawned: Vec<_> = events
            .iter()
            .filter_map(|e| match e.kind {
                SimEventKind::AgentDespawned { agent } => Some(agent),
                _ => None,
            })
            .collect();
        assert_eq!(despawned, vec![mid]);
        let meal = sim.meal_history().next().unwrap();
        assert_eq!(meal.predator, EntityId::Npc(big));
        assert_eq!(meal.prey, EntityId::Npc(mid));
    }

    #[test]
    fn chained_meal_resolves_once_when_small_prey_comes_first() {
        let (mut sim, [big, mid, small]) = food_chain([2, 1, 0]);
        assert!(small < mid && mid < big);

        assert_eq!(sim.resolve_npc_predation(), 1);
        assert_gone(&sim, small);
        assert_eq!(sim.volume_of(big.into()), Some(100.0));
        // The mid-sized fish ate, so it survives the tick grown.
        let mid_agent = sim.agent(mid).unwrap();
        assert!(mid_agent.scale > 1.0);
        assert_eq!(ate_count(&sim.drain_events()), 1);
        assert_eq!(sim.meal_history().count(), 1);
    }

    #[test]
    fn npc_can_eat_the_local_player() {
        let mut sim = test_sim(3, 0);
        let shark = sim.spawn_individual_at(Species::Shark, GridIndex(40), 1.0).unwrap();
        let player = PlayerId(7);
        sim.join_player(player, true, sim.grid.point(GridIndex(40)), 1.0, 1.0, None);
        let (deaths, listener) = counter();
        sim.on_player_eaten(listener);

        sim.replan_agent(shark);
        assert_eq!(sim.agent(shark).unwrap().state, AiState::Chase { prey: player.into() });
        assert_eq!(sim.resolve_npc_predation(), 1);

        assert_eq!(deaths.load(Ordering::SeqCst), 1);
        assert!(!sim.player(player).unwrap().alive);
        assert!(!sim.registry.contains(player.into()));
        let events = sim.drain_events();
        assert!(events.iter().any(|e| matches!(
            &e.kind,
            SimEventKind::PlayerEaten(m) if m.prey == EntityId::Player(player)
        )));
    }

    #[test]
    fn player_contact_grows_the_local_predator() {
        let mut sim = test_sim(1, 0);
        let local = PlayerId(1);
        let remote = PlayerId(2);
        sim.join_player(local, true, glam::Vec3::ZERO, 1.0, 1.0, Some(50.0));
        sim.join_player(remote, false, glam::Vec3::ZERO, 1.0, 1.0, Some(10.0));

        let meal = sim.resolve_player_contact(local, remote, 50.0, 10.0).unwrap();
        assert_eq!(meal.predator, EntityId::Player(local));
        assert_eq!(sim.volume_of(local.into()), Some(60.0));
        assert!(sim.player(remote).unwrap().alive);

        assert!(sim.resolve_player_contact(local, remote, 100.0, 103.0).is_none());
    }

    #[test]
    fn player_contact_kills_the_local_prey() {
        let mut sim = test_sim(1, 0);
        let local = PlayerId(1);
        let remote = PlayerId(2);
        sim.join_player(local, true, glam::Vec3::ZERO, 1.0, 1.0, Some(20.0));
        sim.join_player(remote, false, glam::Vec3::ZERO, 1.0, 1.0, Some(990.0));
        let (deaths, listener) = counter();
        sim.on_player_eaten(listener);

        let meal = sim.resolve_player_contact(local, remote, 20.0, 990.0).unwrap();
        assert_eq!(meal.predator, EntityId::Player(remote));
        assert!(meal.was_capped);
        assert_eq!(meal.new_volume, 1000.0);
        assert_eq!(deaths.load(Ordering::SeqCst), 1);
        assert!(!sim.player(local).unwrap().alive);
        // Dead players take no part in later contacts.
        assert!(sim.resolve_player_contact(local, remote, 2000.0, 1.0).is_none());
    }
}
