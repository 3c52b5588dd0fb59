// Species data: data-driven creature configuration.
//
// Every behavioral and size difference between creature species is data in
// `SpeciesData`, keyed by `Species` in the config's species table. The sim
// has a single `Agent` type and looks values up at spawn and replanning
// time; there is no per-species branching in code.
//
// The unit-scale capsule and visual volume are the creature's
// "encyclopedia" facts. They differ on purpose: the capsule is a coarse
// collision hull, the visual volume is what the mesh actually encloses.
// `size_multiplier` is curation data layered on top of the random size
// bucket at spawn (big mammals ×2, bait fish ×0.5).
//
// See also: `config.rs` where the table lives, `population.rs` which reads
// it when spawning, `types.rs` for the `Species` enum.

use crate::host::CapsuleShape;
use crate::types::{CreatureClass, Species};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data-driven parameters for a creature species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesData {
    pub class: CreatureClass,

    /// Cruising speed in world units per second (Wander speed).
    pub base_speed: f32,

    /// Collision capsule at scale 1.
    pub capsule: CapsuleShape,

    /// Volume enclosed by the visual mesh at scale 1.
    pub visual_volume: f64,

    /// Fixed multiplier applied to the rolled spawn scale.
    pub size_multiplier: f64,

    /// Whether this species can spawn as a school.
    pub schooling: bool,

    /// Relative weight when picking a species for a solitary spawn.
    pub spawn_weight: f32,

    /// Number of visual variants (textures/colorways). At least 1.
    pub variants: u8,
}

impl SpeciesData {
    /// Physics (capsule) volume at scale 1.
    pub fn physics_volume(&self) -> f64 {
        self.capsule.volume()
    }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    class: CreatureClass,
    base_speed: f32,
    radius: f64,
    half_height: f64,
    visual_volume: f64,
    size_multiplier: f64,
    schooling: bool,
    spawn_weight: f32,
    variants: u8,
) -> SpeciesData {
    SpeciesData {
        class,
        base_speed,
        capsule: CapsuleShape::new(radius, half_height),
        visual_volume,
        size_multiplier,
        schooling,
        spawn_weight,
        variants,
    }
}

/// The shipped species table.
pub fn default_species_table() -> BTreeMap<Species, SpeciesData> {
    use CreatureClass::*;
    let mut t = BTreeMap::new();
    t.insert(Species::Sardine, entry(Fish, 6.0, 1.0, 1.2, 8.5, 0.5, true, 3.0, 3));
    t.insert(Species::Anchovy, entry(Fish, 6.5, 0.9, 1.1, 6.0, 0.5, true, 3.0, 2));
    t.insert(Species::Mackerel, entry(Fish, 7.0, 1.3, 1.8, 20.0, 1.0, true, 2.0, 2));
    t.insert(Species::Tuna, entry(Fish, 8.0, 2.0, 3.0, 80.0, 1.0, true, 1.0, 2));
    t.insert(Species::Grouper, entry(Fish, 3.5, 2.2, 2.0, 75.0, 1.0, false, 1.5, 3));
    t.insert(Species::Barracuda, entry(Fish, 9.0, 1.2, 3.0, 24.0, 1.0, false, 1.2, 1));
    t.insert(Species::Shark, entry(Fish, 7.5, 2.5, 4.0, 160.0, 1.5, false, 0.5, 3));
    t.insert(Species::Squid, entry(Cephalopod, 5.0, 1.0, 2.0, 11.0, 0.8, true, 1.0, 2));
    t.insert(Species::Jellyfish, entry(Cnidarian, 1.5, 1.5, 0.5, 9.0, 0.5, false, 1.5, 4));
    t.insert(Species::SeaTurtle, entry(Reptile, 3.0, 2.0, 1.2, 45.0, 1.0, false, 0.8, 2));
    t.insert(Species::Dolphin, entry(Mammal, 8.5, 1.8, 2.8, 60.0, 2.0, true, 0.4, 2));
    t.insert(Species::Orca, entry(Mammal, 7.0, 2.6, 4.5, 190.0, 2.0, false, 0.2, 1));
    t
}
