// Uniform-grid spatial hash over agent positions.
//
// World space is cut into cubes of `cell_size`; each occupied cell maps to
// the set of agent IDs inside it. Agents are moved between cells
// incrementally as they cross boundaries, never rebuilt wholesale, so the
// per-tick cost is proportional to the number of agents that changed cell.
//
// Cell keys pack three signed 21-bit cell coordinates into one `i64`
// (±1,048,575 cells per axis), so lookups hash an integer instead of
// building strings. The same key type is used by the navigation grid's
// coarse point hash.
//
// `locations` mirrors `cells` in reverse, which is what guarantees an agent
// sits in exactly one cell: inserting an agent that is already present
// moves it instead of duplicating it.
//
// Radius queries return candidates, not answers. Every caller applies its
// own exact squared-distance test afterward.
//
// See also: `nav.rs` (shares `CellKey`), `ai.rs` and `predation.rs` (the
// query consumers), `sim.rs` which updates the index after each move.
//
// **Determinism.** `FxHashMap`/`FxHashSet` use a fixed hasher, so query
// result order depends only on the sequence of operations, not on process
// state.

use crate::error::SimError;
use crate::types::AgentId;
use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

const AXIS_BITS: u32 = 21;
const AXIS_MASK: i64 = (1 << AXIS_BITS) - 1;
const SIGN_SHIFT: u32 = 64 - AXIS_BITS;

/// Packed integer cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(i64);

impl CellKey {
    pub fn from_coords(x: i32, y: i32, z: i32) -> Self {
        Self(
            ((x as i64 & AXIS_MASK) << (2 * AXIS_BITS))
                | ((y as i64 & AXIS_MASK) << AXIS_BITS)
                | (z as i64 & AXIS_MASK),
        )
    }

    /// Key of the cell containing `position` for a grid with the given
    /// inverse cell size.
    pub fn containing(position: Vec3, inv_cell_size: f32) -> Self {
        Self::from_coords(
            (position.x * inv_cell_size).floor() as i32,
            (position.y * inv_cell_size).floor() as i32,
            (position.z * inv_cell_size).floor() as i32,
        )
    }

    pub fn coords(self) -> (i32, i32, i32) {
        let unpack = |shift: u32| {
            let raw = (self.0 >> shift) & AXIS_MASK;
            ((raw << SIGN_SHIFT) >> SIGN_SHIFT) as i32
        };
        (unpack(2 * AXIS_BITS), unpack(AXIS_BITS), unpack(0))
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        let (x, y, z) = self.coords();
        Self::from_coords(x + dx, y + dy, z + dz)
    }

    pub fn packed(self) -> i64 {
        self.0
    }
}

/// Agent membership per world cell.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    inv_cell_size: f32,
    cells: FxHashMap<CellKey, FxHashSet<AgentId>>,
    locations: FxHashMap<AgentId, CellKey>,
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Result<Self, SimError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SimError::InvalidSpacing(cell_size));
        }
        Ok(Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: FxHashMap::default(),
            locations: FxHashMap::default(),
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_key(&self, position: Vec3) -> CellKey {
        CellKey::containing(position, self.inv_cell_size)
    }

    /// Add an agent at `position`. An agent that is already indexed is moved
    /// rather than duplicated. Returns the agent's cell.
    pub fn insert(&mut self, agent: AgentId, position: Vec3) -> CellKey {
        let key = self.cell_key(position);
        if let Some(old) = self.locations.get(&agent).copied() {
            self.move_agent(agent, old, key);
        } else {
            self.cells.entry(key).or_default().insert(agent);
            self.locations.insert(agent, key);
        }
        key
    }

    /// Remove an agent. `key` is the cell the caller believes it occupies;
    /// the index's own record wins if they disagree. Returns whether the
    /// agent was present.
    pub fn remove(&mut self, agent: AgentId, key: CellKey) -> bool {
        let Some(actual) = self.locations.remove(&agent) else {
            return false;
        };
        if actual != key {
            debug!(%agent, "stale cell key on remove");
        }
        self.detach(agent, actual);
        true
    }

    /// Remove an agent from wherever it is.
    pub fn remove_agent(&mut self, agent: AgentId) -> bool {
        match self.locations.get(&agent).copied() {
            Some(key) => self.remove(agent, key),
            None => false,
        }
    }

    /// Move an agent between cells. No-op when the cells are equal.
    pub fn move_agent(&mut self, agent: AgentId, old_key: CellKey, new_key: CellKey) {
        if old_key == new_key && self.locations.get(&agent) == Some(&new_key) {
            return;
        }
        let from = self.locations.get(&agent).copied().unwrap_or(old_key);
        self.detach(agent, from);
        self.cells.entry(new_key).or_default().insert(agent);
        self.locations.insert(agent, new_key);
    }

    /// Re-file an agent after it moved. Returns the new key if the agent
    /// changed cell (or was not indexed yet).
    pub fn update(&mut self, agent: AgentId, position: Vec3) -> Option<CellKey> {
        let key = self.cell_key(position);
        match self.locations.get(&agent).copied() {
            Some(old) if old == key => None,
            Some(old) => {
                self.move_agent(agent, old, key);
                Some(key)
            }
            None => Some(self.insert(agent, position)),
        }
    }

    fn detach(&mut self, agent: AgentId, key: CellKey) {
        if let Some(set) = self.cells.get_mut(&key) {
            set.remove(&agent);
            if set.is_empty() {
                self.cells.remove(&key);
            }
        }
    }

    /// Candidate agents within `sqrt(radius_sq)` of `position`.
    ///
    /// Scans the cube of cells `ceil(radius / cell_size)` cells out from the
    /// position's cell (at least one), so every agent within the radius is
    /// returned, along with some that are not.
    pub fn query_radius(&self, position: Vec3, radius_sq: f32) -> Vec<AgentId> {
        let mut out = Vec::new();
        self.for_each_candidate(position, radius_sq, |id| out.push(id));
        out
    }

    /// Visitor form of `query_radius` that avoids allocating.
    pub fn for_each_candidate(
        &self,
        position: Vec3,
        radius_sq: f32,
        mut visit: impl FnMut(AgentId),
    ) {
        let reach = self.cell_reach(radius_sq);
        let center = self.cell_key(position);
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    if let Some(set) = self.cells.get(&center.offset(dx, dy, dz)) {
                        for &id in set {
                            visit(id);
                        }
                    }
                }
            }
        }
    }

    fn cell_reach(&self, radius_sq: f32) -> i32 {
        if radius_sq <= self.cell_size * self.cell_size {
            1
        } else {
            (radius_sq.sqrt() * self.inv_cell_size).ceil().max(1.0) as i32
        }
    }

    pub fn cell_of(&self, agent: AgentId) -> Option<CellKey> {
        self.locations.get(&agent).copied()
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.locations.contains_key(&agent)
    }

    /// Number of indexed agents.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Agents filed under `key`.
    pub fn members(&self, key: CellKey) -> impl Iterator<Item = AgentId> + '_ {
        self.cells.get(&key).into_iter().flat_map(|s| s.iter().copied())
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.locations.clear();
    }

    /// Every indexed agent appears in exactly one cell, and that cell is the
    /// one recorded for it.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0usize;
        for (key, set) in &self.cells {
            if set.is_empty() {
                return false;
            }
            for id in set {
                if self.locations.get(id) != Some(key) {
                    return false;
                }
                seen += 1;
            }
        }
        seen == self.locations.len()
    }
}
