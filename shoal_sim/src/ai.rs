// Agent AI: state transitions, path planning, and path following.
//
// Decisions are made only when an agent's path runs out. At that point
// `replan_agent` looks for the nearest threat (anything within flee range
// at least `predator_size_ratio` times the agent's volume), then the
// nearest prey (anything within chase range at most `1 / ratio` times it),
// and picks Flee, Chase, or Wander in that priority. Any living player can
// be a threat, but only local players count as prey: remote players are
// eaten on their own peer, never here. The replan consumes the
// agent's update for that tick; it does not also move.
//
// A plan is exactly `path_length` grid indices. Each step scores every
// neighbor of the current point by
//
//   preferred·dot(preferred_dir, step) + forward·dot(forward, step)
//     ± target·dot(target_dir, step) + random·U[0,1)
//
// and takes the best (first wins ties). The first step is scored from the
// agent's actual position rather than its nearest grid point, so an agent
// slightly ahead of its cell does not double back. Chase aims at the prey's
// own path `prey_lookahead_steps` ahead; Flee subtracts the term to push
// away from the threat's current position. A point with no neighbors
// repeats itself so the plan keeps its length.
//
// School followers never search. They copy the leader's path, take the
// leader's cursor, and match its speed.
//
// `follow_path` is the per-tick mover: advance the cursor on arrival,
// blend the heading toward the waypoint, step `speed * dt`, and turn yaw
// toward the heading at no more than `turn_rate * dt`.
//
// See also: `sim.rs` for where `update_agents` sits in the tick,
// `spatial.rs` for candidate queries, `nav.rs` for the graph.

use crate::agent::{Agent, AiState};
use crate::config::{BiasWeights, MovementParams};
use crate::nav::NavGrid;
use crate::sim::SimState;
use crate::types::{AgentId, EntityId, GridIndex};
use glam::Vec3;
use shoal_prng::GameRng;
use std::f32::consts::{PI, TAU};
use tracing::{debug, warn};

/// What the target term of path scoring does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Steering {
    None,
    Toward(Vec3),
    Away(Vec3),
}

/// Which side of a replan `nearest_entity` is searching for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Search {
    Threat,
    Prey,
}

/// Result of one `follow_path` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The path is used up; the agent did not move and should replan.
    PathComplete,
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI { a + TAU } else { a }
}

/// Yaw about +Y that faces along `direction`.
pub fn yaw_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Uniform random direction on the unit sphere.
pub fn random_unit_vector(rng: &mut GameRng) -> Vec3 {
    let z = rng.range_f32(-1.0, 1.0);
    let theta = rng.range_f32(0.0, TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// Plan `path_length` grid steps starting from `position`.
///
/// Returns an empty path only when the grid is empty.
#[allow(clippy::too_many_arguments)]
pub fn plan_path(
    grid: &NavGrid,
    position: Vec3,
    forward: Vec3,
    preferred: Vec3,
    steering: Steering,
    bias: &BiasWeights,
    path_length: usize,
    rng: &mut GameRng,
) -> Vec<GridIndex> {
    let Some(mut current) = grid.nearest_index(position, rng) else {
        return Vec::new();
    };
    let mut from = position;
    let mut forward = forward.normalize_or_zero();
    let mut path = Vec::with_capacity(path_length);

    for _ in 0..path_length {
        let target_dir = match steering {
            Steering::None => Vec3::ZERO,
            Steering::Toward(t) | Steering::Away(t) => (t - from).normalize_or_zero(),
        };
        let target_sign = match steering {
            Steering::None => 0.0,
            Steering::Toward(_) => 1.0,
            Steering::Away(_) => -1.0,
        };

        let mut best: Option<(f32, GridIndex)> = None;
        for &candidate in grid.neighbors(current) {
            let step = (grid.point(candidate) - from).normalize_or_zero();
            let score = bias.preferred_direction * preferred.dot(step)
                + bias.forward * forward.dot(step)
                + target_sign * bias.target * target_dir.dot(step)
                + rng.next_f32() * bias.randomness;
            if best.is_none_or(|(s, _)| score > s) {
                best = Some((score, candidate));
            }
        }

        let next = best.map_or(current, |(_, idx)| idx);
        let next_pos = grid.point(next);
        let travelled = next_pos - from;
        if travelled.length_squared() > 0.0 {
            forward = travelled.normalize();
        }
        path.push(next);
        from = next_pos;
        current = next;
    }
    path
}

/// Advance an agent one tick along its path.
pub fn follow_path(
    agent: &mut Agent,
    grid: &NavGrid,
    movement: &MovementParams,
    arrival_sq: f32,
    dt: f32,
) -> MoveOutcome {
    let Some(mut waypoint) = agent.current_waypoint() else {
        return MoveOutcome::PathComplete;
    };
    let mut to_target = grid.point(waypoint) - agent.position;
    if to_target.length_squared() < arrival_sq {
        agent.path_cursor += 1;
        match agent.current_waypoint() {
            Some(next) => waypoint = next,
            None => return MoveOutcome::PathComplete,
        }
        to_target = grid.point(waypoint) - agent.position;
    }

    let desired = to_target.normalize_or_zero();
    if desired != Vec3::ZERO {
        let blended = agent
            .heading
            .lerp(desired, movement.direction_smoothing)
            .normalize_or_zero();
        agent.heading = if blended == Vec3::ZERO { desired } else { blended };
    }
    agent.position += agent.heading * agent.speed * dt;

    let max_turn = movement.turn_rate.abs() * dt;
    let delta = wrap_angle(yaw_of(agent.heading) - agent.yaw);
    agent.yaw = wrap_angle(agent.yaw + delta.max(-max_turn).min(max_turn));
    MoveOutcome::Moved
}

// ---------------------------------------------------------------------------
// SimState integration
// ---------------------------------------------------------------------------

impl SimState {
    /// Move or replan every agent, in ID order. Each agent is re-filed in
    /// the spatial index right after it moves.
    pub(crate) fn update_agents(&mut self, dt: f32) {
        let ids: Vec<AgentId> = self.agents.keys().copied().collect();
        for id in ids {
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            if agent.path_exhausted() {
                self.replan_agent(id);
                continue;
            }
            let outcome = follow_path(
                agent,
                &self.grid,
                &self.config.movement,
                self.ranges.arrival_sq,
                dt,
            );
            if outcome == MoveOutcome::Moved {
                let position = agent.position;
                self.spatial.update(id, position);
            }
        }
    }

    /// Pick a new state and path for an agent whose path ran out.
    pub fn replan_agent(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(&id) else {
            return;
        };
        if let AiState::School { leader } = agent.state {
            self.sync_follower(id, leader);
            return;
        }

        let own = self
            .registry
            .world_volume(id.into())
            .unwrap_or(agent.physics_volume);
        let position = agent.position;
        let ratio = self.config.detection.predator_size_ratio;

        let (flee_sq, chase_sq) = (self.ranges.flee_sq, self.ranges.chase_sq);
        let is_threat = |v: f64| v >= own * ratio;
        let is_prey = |v: f64| v <= own / ratio;
        let threat = self.nearest_entity(id, position, flee_sq, Search::Threat, is_threat);
        let (state, multiplier, steering) = if let Some((threat, at)) = threat {
            (
                AiState::Flee { threat },
                self.config.movement.flee_speed_multiplier,
                Steering::Away(at),
            )
        } else if let Some((prey, at)) =
            self.nearest_entity(id, position, chase_sq, Search::Prey, is_prey)
        {
            (
                AiState::Chase { prey },
                self.config.movement.chase_speed_multiplier,
                Steering::Toward(self.predicted_position(prey, at)),
            )
        } else {
            (AiState::Wander, 1.0, Steering::None)
        };

        self.assign_plan(id, state, multiplier, steering);
    }

    /// Set an agent's state and speed, plan a fresh path, and keep the
    /// active-chaser set in step with the state.
    pub(crate) fn assign_plan(
        &mut self,
        id: AgentId,
        state: AiState,
        multiplier: f32,
        steering: Steering,
    ) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        agent.path = plan_path(
            &self.grid,
            agent.position,
            agent.heading,
            agent.preferred_direction,
            steering,
            &self.config.bias,
            self.config.movement.path_length,
            &mut self.rng,
        );
        agent.path_cursor = 0;
        agent.state = state;
        agent.speed = agent.base_speed * multiplier;

        if matches!(state, AiState::Chase { .. }) {
            self.active_chasers.insert(id);
        } else {
            self.active_chasers.remove(&id);
        }
        debug!(agent = %id, state = state.name(), "replanned");
    }

    /// Copy the leader's path onto a follower. A follower whose leader is
    /// gone or no longer leads its school reverts to a solitary wanderer.
    fn sync_follower(&mut self, id: AgentId, leader_id: AgentId) {
        let leader = self.agents.get(&leader_id).and_then(|leader| {
            let school = leader.school?;
            let leads = self.schools.get(&school).is_some_and(|s| s.leader == leader_id);
            leads.then(|| (leader.path.clone(), leader.path_cursor, leader.speed, school))
        });
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };

        match leader {
            Some((path, cursor, speed, school)) if agent.school == Some(school) => {
                agent.path_cursor = cursor.min(path.len());
                agent.path = path;
                agent.speed = speed;
            }
            _ => {
                warn!(
                    agent = %id,
                    leader = %leader_id,
                    "dangling school leader, reverting to wander"
                );
                let school = agent.school.take();
                agent.state = AiState::Wander;
                agent.speed = agent.base_speed;
                agent.clear_path();
                if let Some(school) = school {
                    self.leave_school(school, id);
                }
            }
        }
    }

    /// Nearest agent or living player within `sqrt(range_sq)` whose world
    /// volume passes `accept`. Schoolmates are ignored, and so are remote
    /// players when searching for prey. Ties keep the first candidate found.
    fn nearest_entity(
        &self,
        self_id: AgentId,
        position: Vec3,
        range_sq: f32,
        search: Search,
        accept: impl Fn(f64) -> bool,
    ) -> Option<(EntityId, Vec3)> {
        let school = self.agents.get(&self_id).and_then(|a| a.school);
        let mut best: Option<(f32, EntityId, Vec3)> = None;
        let mut consider = |entity: EntityId, at: Vec3| {
            let d = at.distance_squared(position);
            if d > range_sq || best.is_some_and(|(bd, _, _)| d >= bd) {
                return;
            }
            if self.registry.world_volume(entity).is_some_and(&accept) {
                best = Some((d, entity, at));
            }
        };

        self.spatial.for_each_candidate(position, range_sq, |other| {
            if other == self_id {
                return;
            }
            let Some(agent) = self.agents.get(&other) else {
                return;
            };
            if school.is_some() && agent.school == school {
                return;
            }
            consider(other.into(), agent.position);
        });
        let players = self
            .players
            .values()
            .filter(|p| p.alive && (p.is_local || search == Search::Threat));
        for player in players {
            consider(player.id.into(), player.position);
        }
        best.map(|(_, entity, at)| (entity, at))
    }

    /// Where a chaser should aim: an NPC's own path a few steps ahead, or
    /// the current position if it has none.
    fn predicted_position(&self, target: EntityId, current: Vec3) -> Vec3 {
        let EntityId::Npc(id) = target else {
            return current;
        };
        let Some(prey) = self.agents.get(&id) else {
            return current;
        };
        if prey.path.is_empty() {
            return current;
        }
        let lookahead = self.config.movement.prey_lookahead_steps;
        let ahead = (prey.path_cursor + lookahead).min(prey.path.len() - 1);
        self.grid.point(prey.path[ahead])
    }
}
