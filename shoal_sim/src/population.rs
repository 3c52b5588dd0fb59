// Population management: spawning, removal, and school membership.
//
// `maintain_population` tops the NPC count up to a target, choosing per
// slot between a solitary agent and a school (`schooling_probability`).
// A pass gives up after `max_consecutive_spawn_failures` failed attempts in
// a row, which is what stops it spinning on an empty grid. School sizes are
// clamped to the slots left; if fewer than two remain the slot becomes a
// solitary spawn instead.
//
// Spawn size: a weighted pick from the size-bucket table, a uniform scale
// within the bucket, then the species' fixed size multiplier. The agent's
// starting world volume is its capsule volume at that scale.
//
// Schools: one schooling species, one rolled scale shared by all members,
// members placed on the spawn point and the grid points within two
// adjacency hops of it (member i at `candidates[i % len]`). The first
// member placed leads.
//
// `remove_agent` is the single exit path. It clears the agent from the
// spatial index, the active-chaser set, the registry, and its school, then
// optionally backfills. Leaving a school either dissolves it (one member or
// fewer left; the survivor reverts to a solitary wanderer) or, if the
// leader left, promotes the first remaining member, who plans a fresh
// Wander path at once.
//
// See also: `agent.rs` for `Agent`/`School`, `ai.rs` for `assign_plan`,
// `config.rs` for `PopulationParams` and the size buckets.

use crate::agent::{Agent, AiState, School};
use crate::ai::{Steering, random_unit_vector, yaw_of};
use crate::event::SimEventKind;
use crate::sim::SimState;
use crate::types::{AgentId, GridIndex, SchoolId, Species};
use tracing::{debug, info, warn};

impl SimState {
    /// Spawn until there are `target` agents or spawning keeps failing.
    /// Returns the number of agents spawned.
    pub fn maintain_population(&mut self, target: usize) -> usize {
        let max_failures = self.config.population.max_consecutive_spawn_failures.max(1);
        let mut failures = 0;
        let mut spawned = 0;

        while self.agents.len() < target {
            let remaining = target - self.agents.len();
            let mut placed = 0;
            if self.rng.random_bool(self.config.population.schooling_probability) {
                let size = self.roll_school_size().min(remaining);
                if size >= 2 {
                    placed = self
                        .spawn_school_of(size)
                        .and_then(|s| self.schools.get(&s))
                        .map_or(0, |s| s.len());
                }
            }
            // Too few slots for a school, or no school could be placed.
            if placed == 0 {
                placed = usize::from(self.spawn_individual().is_some());
            }

            if placed == 0 {
                failures += 1;
                if failures >= max_failures {
                    warn!(
                        agents = self.agents.len(),
                        target, "spawn attempts exhausted, stopping population top-up"
                    );
                    break;
                }
            } else {
                failures = 0;
                spawned += placed;
            }
        }
        spawned
    }

    fn roll_school_size(&mut self) -> usize {
        let (a, b) = self.config.population.school_size;
        self.rng.range_usize_inclusive(a.min(b), a.max(b))
    }

    /// Pick a species by spawn weight, optionally only schooling ones.
    fn pick_species(&mut self, schooling_only: bool) -> Option<Species> {
        let candidates: Vec<(Species, f32)> = self
            .config
            .species
            .iter()
            .filter(|(_, d)| !schooling_only || d.schooling)
            .map(|(s, d)| (*s, d.spawn_weight))
            .collect();
        let weights: Vec<f32> = candidates.iter().map(|(_, w)| *w).collect();
        let i = self.rng.weighted_index(&weights)?;
        Some(candidates[i].0)
    }

    /// Spawn-time scale for a species: bucket roll times the species
    /// multiplier. An empty bucket table rolls 1.0.
    pub fn roll_scale(&mut self, species: Species) -> f64 {
        let weights: Vec<f32> = self.config.size_buckets.iter().map(|b| b.weight).collect();
        let base = match self.rng.weighted_index(&weights) {
            Some(i) => {
                let bucket = &self.config.size_buckets[i];
                let (lo, hi) = (bucket.min_scale, bucket.max_scale);
                lo + self.rng.next_f64() * (hi - lo).max(0.0)
            }
            None => 1.0,
        };
        let multiplier = self
            .config
            .species
            .get(&species)
            .map_or(1.0, |d| d.size_multiplier);
        base * multiplier
    }

    /// Spawn one solitary agent at a random grid point.
    pub fn spawn_individual(&mut self) -> Option<AgentId> {
        let Some(species) = self.pick_species(false) else {
            warn!("no spawnable species");
            return None;
        };
        let index = self.grid.random_index(&mut self.rng)?;
        let scale = self.roll_scale(species);
        self.spawn_individual_at(species, index, scale)
    }

    /// Spawn one agent of `species` at grid point `index` with body scale
    /// `scale`. Fails for an unknown species or index.
    pub fn spawn_individual_at(
        &mut self,
        species: Species,
        index: GridIndex,
        scale: f64,
    ) -> Option<AgentId> {
        let Some(data) = self.config.species.get(&species).cloned() else {
            warn!(?species, "species missing from table");
            return None;
        };
        let position = self.grid.get_point(index)?;

        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;

        let capsule = data.capsule.scaled(scale);
        let physics_volume = capsule.volume();
        let preferred_direction = random_unit_vector(&mut self.rng);
        let variant = if data.variants > 1 {
            self.rng.range_u64(0, u64::from(data.variants)) as u8
        } else {
            0
        };

        self.registry.register(
            id.into(),
            data.visual_volume,
            data.physics_volume(),
            Some(physics_volume),
            &mut self.rng,
        );
        self.spatial.insert(id, position);
        self.agents.insert(
            id,
            Agent {
                id,
                species,
                class: data.class,
                variant,
                position,
                heading: preferred_direction,
                yaw: yaw_of(preferred_direction),
                scale,
                capsule,
                physics_volume,
                visual_volume: data.visual_volume * scale.powi(3),
                state: AiState::Wander,
                path: Vec::new(),
                path_cursor: 0,
                base_speed: data.base_speed,
                speed: data.base_speed,
                preferred_direction,
                school: None,
            },
        );
        debug!(agent = %id, ?species, scale, "agent spawned");
        self.emit(SimEventKind::AgentSpawned { agent: id, species });
        Some(id)
    }

    /// Spawn a school with a size rolled from the configured range.
    pub fn spawn_school(&mut self) -> Option<SchoolId> {
        let size = self.roll_school_size();
        self.spawn_school_of(size)
    }

    /// Spawn a school of `size` members (at least 2). Members that fail to
    /// place are skipped; if fewer than two land the survivors are left as
    /// solitary agents and `None` is returned.
    pub fn spawn_school_of(&mut self, size: usize) -> Option<SchoolId> {
        if size < 2 {
            return None;
        }
        let species = self.pick_species(true)?;
        let class = self.config.species.get(&species)?.class;
        let start = self.grid.random_index(&mut self.rng)?;
        let candidates = self.grid.within_hops(start, 2);
        let scale = self.roll_scale(species);

        let school_id = SchoolId(self.next_school_id);
        self.next_school_id += 1;

        let mut members = Vec::with_capacity(size);
        for i in 0..size {
            let at = candidates[i % candidates.len()];
            if let Some(id) = self.spawn_individual_at(species, at, scale) {
                members.push(id);
            }
        }
        if members.len() < 2 {
            warn!(?species, placed = members.len(), "school spawn came up short");
            return None;
        }

        let leader = members[0];
        for &member in &members {
            if let Some(agent) = self.agents.get_mut(&member) {
                agent.school = Some(school_id);
                if member != leader {
                    agent.state = AiState::School { leader };
                }
            }
        }
        info!(school = %school_id, ?species, size = members.len(), %leader, "school formed");
        self.emit(SimEventKind::SchoolFormed {
            school: school_id,
            leader,
            size: members.len(),
        });
        self.schools.insert(
            school_id,
            School {
                id: school_id,
                leader,
                members,
                species,
                class,
            },
        );
        Some(school_id)
    }

    /// Remove an agent from every structure that references it. With
    /// `respawn`, the population is topped back up to target afterward.
    /// Returns false if the agent did not exist.
    pub fn remove_agent(&mut self, id: AgentId, respawn: bool) -> bool {
        let Some(agent) = self.agents.remove(&id) else {
            return false;
        };
        self.spatial.remove_agent(id);
        self.active_chasers.remove(&id);
        self.registry.unregister(id.into());
        debug!(agent = %id, "agent removed");
        self.emit(SimEventKind::AgentDespawned { agent: id });

        if let Some(school) = agent.school {
            self.leave_school(school, id);
        }
        if respawn {
            let target = self.config.population.target;
            self.maintain_population(target);
        }
        true
    }

    /// Drop `member` from a school, dissolving it or handing off
    /// leadership as needed.
    pub(crate) fn leave_school(&mut self, school_id: SchoolId, member: AgentId) {
        let Some(school) = self.schools.get_mut(&school_id) else {
            return;
        };
        school.members.retain(|m| *m != member);

        if school.members.len() <= 1 {
            let Some(school) = self.schools.remove(&school_id) else {
                return;
            };
            for survivor in school.members {
                if let Some(agent) = self.agents.get_mut(&survivor) {
                    agent.school = None;
                    agent.state = AiState::Wander;
                    agent.speed = agent.base_speed;
                    agent.clear_path();
                }
                self.active_chasers.remove(&survivor);
            }
            info!(school = %school_id, "school dissolved");
            self.emit(SimEventKind::SchoolDissolved { school: school_id });
            return;
        }

        if school.leader != member {
            return;
        }
        let leader = school.members[0];
        school.leader = leader;
        let followers: Vec<AgentId> = school.members[1..].to_vec();
        for follower in followers {
            if let Some(agent) = self.agents.get_mut(&follower) {
                agent.state = AiState::School { leader };
            }
        }
        self.assign_plan(leader, AiState::Wander, 1.0, Steering::None);
        info!(school = %school_id, %leader, "school leader replaced");
        self.emit(SimEventKind::SchoolLeaderChanged {
            school: school_id,
            leader,
        });
    }
}
