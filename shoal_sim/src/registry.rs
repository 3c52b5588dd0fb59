// Volume registry: the single source of truth for entity sizes.
//
// Every player and NPC that can eat or be eaten has a `VolumeRecord`:
// immutable "encyclopedia" volumes measured at scale 1 (visual mesh and
// physics capsule), the mutable "world" volume that gameplay compares, and
// the scale factors derived from them. The world physics volume always
// equals the world volume; the two scale factors differ because the
// encyclopedia visual and physics volumes differ.
//
// Records are plain `Copy` values replaced wholesale on every update, so a
// reader holding a snapshot never sees a half-applied change. Mutation goes
// through `update_world_volume` / `add_volume` only, which clamp to
// `[min_volume, max_volume]` and report whether the request was capped.
//
// Re-registering an existing entity overwrites its record (last write
// wins); the overwrite is logged at debug level.
//
// See also: `volume.rs` for the math, `predation.rs` for the feeding rules
// the relationship helpers delegate to, `config.rs` for `VolumeParams`.

use crate::config::VolumeParams;
use crate::error::SimError;
use crate::host::{CapsuleShape, TransformHandle};
use crate::predation::{self, FeedingRelationship};
use crate::types::EntityId;
use crate::volume::scale_factor_or_unit;
use serde::{Deserialize, Serialize};
use shoal_prng::GameRng;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Size record for one entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub entity: EntityId,
    pub is_player: bool,
    /// Visual mesh volume at scale 1.
    pub total_encyclopedia_volume: f64,
    /// Capsule volume at scale 1.
    pub encyclopedia_physics_volume: f64,
    /// Current gameplay volume, always within the registry limits.
    pub total_world_volume: f64,
    /// Always equal to `total_world_volume`.
    pub world_physics_volume: f64,
    /// `∛(world / encyclopedia visual)`, applied to the mesh.
    pub visual_scale_factor: f64,
    /// `∛(world / encyclopedia physics)`, applied to the capsule.
    pub physics_scale_factor: f64,
}

/// Result of a world volume change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeUpdate {
    pub record: VolumeRecord,
    pub previous_volume: f64,
    /// Applied change after clamping; negative for shrinkage.
    pub volume_gained: f64,
    /// The unclamped request exceeded `max_volume`.
    pub was_capped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct VolumeRegistry {
    records: BTreeMap<EntityId, VolumeRecord>,
    limits: VolumeParams,
}

impl VolumeRegistry {
    pub fn new(limits: VolumeParams) -> Self {
        Self {
            records: BTreeMap::new(),
            limits,
        }
    }

    pub fn limits(&self) -> &VolumeParams {
        &self.limits
    }

    /// Replace the volume limits. Existing records are re-clamped into the
    /// new range so the invariant holds immediately.
    pub fn set_limits(&mut self, limits: VolumeParams) {
        self.limits = limits;
        let ids: Vec<EntityId> = self.records.keys().copied().collect();
        for id in ids {
            let Some(rec) = self.records.get(&id).copied() else {
                continue;
            };
            let clamped = self.clamp(rec.total_world_volume);
            if clamped != rec.total_world_volume {
                self.records.insert(id, with_world_volume(rec, clamped));
            }
        }
    }

    fn clamp(&self, volume: f64) -> f64 {
        self.limits.clamp(volume)
    }

    /// Register an entity with its unit-scale volumes.
    ///
    /// The starting world volume is `initial_world_volume` if given, the
    /// starter volume for players, or a log-normal draw for NPCs. It is
    /// clamped into the limits either way.
    pub fn register(
        &mut self,
        entity: EntityId,
        natural_visual_volume: f64,
        natural_physics_volume: f64,
        initial_world_volume: Option<f64>,
        rng: &mut GameRng,
    ) -> VolumeRecord {
        let world = match initial_world_volume {
            Some(v) if v.is_finite() => v,
            Some(v) => {
                warn!(%entity, v, "non-finite initial volume ignored");
                self.default_world_volume(entity, rng)
            }
            None => self.default_world_volume(entity, rng),
        };
        let world = self.clamp(world);

        let record = build_record(entity, natural_visual_volume, natural_physics_volume, world);
        if self.records.insert(entity, record).is_some() {
            debug!(%entity, "volume record overwritten by re-registration");
        }
        record
    }

    /// Register by measuring a host mesh at scale 1. `capsule` is the
    /// unit-scale collision capsule.
    pub fn register_from_handle(
        &mut self,
        entity: EntityId,
        handle: &dyn TransformHandle,
        capsule: CapsuleShape,
        initial_world_volume: Option<f64>,
        rng: &mut GameRng,
    ) -> VolumeRecord {
        let visual = handle.enclosed_volume_at(1.0);
        self.register(entity, visual, capsule.volume(), initial_world_volume, rng)
    }

    fn default_world_volume(&self, entity: EntityId, rng: &mut GameRng) -> f64 {
        if entity.is_player() {
            self.limits.starter_volume
        } else {
            self.sample_npc_volume(rng)
        }
    }

    /// Log-normal NPC volume via Box–Muller, clamped into the limits.
    pub fn sample_npc_volume(&self, rng: &mut GameRng) -> f64 {
        let z = rng.next_gaussian();
        let v = (self.limits.npc_log_mean + self.limits.npc_log_stddev * z).exp();
        self.clamp(v)
    }

    /// Set an entity's world volume, clamped into the limits.
    pub fn update_world_volume(
        &mut self,
        entity: EntityId,
        new_volume: f64,
    ) -> Result<VolumeUpdate, SimError> {
        let current = *self.records.get(&entity).ok_or(SimError::NotFound(entity))?;
        let previous = current.total_world_volume;

        if new_volume.is_nan() {
            warn!(%entity, "NaN volume update ignored");
            return Ok(VolumeUpdate {
                record: current,
                previous_volume: previous,
                volume_gained: 0.0,
                was_capped: false,
            });
        }

        let was_capped = new_volume > self.limits.max_volume;
        let clamped = self.clamp(new_volume);
        let record = with_world_volume(current, clamped);
        self.records.insert(entity, record);

        Ok(VolumeUpdate {
            record,
            previous_volume: previous,
            volume_gained: clamped - previous,
            was_capped,
        })
    }

    /// `update_world_volume(entity, current + delta)`.
    pub fn add_volume(&mut self, entity: EntityId, delta: f64) -> Result<VolumeUpdate, SimError> {
        let current = self.world_volume(entity).ok_or(SimError::NotFound(entity))?;
        self.update_world_volume(entity, current + delta)
    }

    /// Remove an entity's record. Removing an unknown entity is a no-op.
    pub fn unregister(&mut self, entity: EntityId) -> Option<VolumeRecord> {
        self.records.remove(&entity)
    }

    /// Snapshot of an entity's record.
    pub fn get(&self, entity: EntityId) -> Option<VolumeRecord> {
        self.records.get(&entity).copied()
    }

    pub fn world_volume(&self, entity: EntityId) -> Option<f64> {
        self.records.get(&entity).map(|r| r.total_world_volume)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.records.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn players(&self) -> impl Iterator<Item = &VolumeRecord> {
        self.records.values().filter(|r| r.is_player)
    }

    pub fn npcs(&self) -> impl Iterator<Item = &VolumeRecord> {
        self.records.values().filter(|r| !r.is_player)
    }

    /// Whether `predator` may eat `prey` under the 5% rule.
    pub fn can_eat(&self, predator: EntityId, prey: EntityId) -> Result<bool, SimError> {
        let a = self.world_volume(predator).ok_or(SimError::NotFound(predator))?;
        let b = self.world_volume(prey).ok_or(SimError::NotFound(prey))?;
        Ok(predation::can_eat(a, b))
    }

    /// Relationship of `a` toward `b`.
    pub fn feeding_relationship(
        &self,
        a: EntityId,
        b: EntityId,
    ) -> Result<FeedingRelationship, SimError> {
        let va = self.world_volume(a).ok_or(SimError::NotFound(a))?;
        let vb = self.world_volume(b).ok_or(SimError::NotFound(b))?;
        Ok(predation::feeding_relationship(va, vb))
    }

    /// Push an entity's visual scale factor to its host mesh.
    pub fn apply_visual_scale(
        &self,
        entity: EntityId,
        handle: &mut dyn TransformHandle,
    ) -> Result<(), SimError> {
        let record = self.get(entity).ok_or(SimError::NotFound(entity))?;
        handle.set_scale(record.visual_scale_factor);
        Ok(())
    }
}

fn build_record(
    entity: EntityId,
    natural_visual_volume: f64,
    natural_physics_volume: f64,
    world_volume: f64,
) -> VolumeRecord {
    with_world_volume(
        VolumeRecord {
            entity,
            is_player: entity.is_player(),
            total_encyclopedia_volume: natural_visual_volume,
            encyclopedia_physics_volume: natural_physics_volume,
            total_world_volume: 0.0,
            world_physics_volume: 0.0,
            visual_scale_factor: 1.0,
            physics_scale_factor: 1.0,
        },
        world_volume,
    )
}

fn with_world_volume(record: VolumeRecord, world_volume: f64) -> VolumeRecord {
    VolumeRecord {
        total_world_volume: world_volume,
        world_physics_volume: world_volume,
        visual_scale_factor: scale_factor_or_unit(record.total_encyclopedia_volume, world_volume),
        physics_scale_factor: scale_factor_or_unit(
            record.encyclopedia_physics_volume,
            world_volume,
        ),
        ..record
    }
}
