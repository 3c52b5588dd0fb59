// shoal_sim: pure Rust simulation library for an aquatic grow-by-eating game.
//
// This crate contains the game-core logic for Shoal: the navigation grid
// that NPC agents swim along, the spatial hash used for proximity queries,
// per-agent AI (wander, flee, chase, school), predation and growth, the
// volume registry that decides who can eat whom, and population upkeep. It
// has no engine dependencies and can be tested, benchmarked, and run
// headless.
//
// Module overview:
// - `sim.rs`:        Top-level SimState, tick loop, command/event processing.
// - `nav.rs`:        NavGrid: sampled water points plus a 26-style neighbor graph.
// - `spatial.rs`:    SpatialIndex: uniform hash grid over agent positions.
// - `ai.rs`:         Path planning, path following, and per-agent replanning.
// - `agent.rs`:      Agent, School, and Player records; AiState.
// - `population.rs`: Spawning individuals and schools, removal, school upkeep.
// - `predation.rs`:  Feeding rule, NPC and player meals, growth.
// - `registry.rs`:   VolumeRegistry: per-entity encyclopedia and world volumes.
// - `volume.rs`:     Capsule volume and scale-factor math.
// - `command.rs`:    SimCommand / SimAction: player input from the host.
// - `event.rs`:      Narrative SimEvents, meal history, meal listeners.
// - `config.rs`:     SimConfig: every tunable, loadable from JSON.
// - `species.rs`:    SpeciesData: data-driven creature stats.
// - `host.rs`:       Traits the host engine implements (water sampling, meshes).
// - `error.rs`:      SimError.
// - `prng`:          Re-exported from `shoal_prng`: xoshiro256++ with SplitMix64 seeding.
// - `types.rs`:      Entity IDs, GridIndex, Species, SessionMode.
//
// The host (renderer, physics, network relay) drives the sim through
// `SimState::step` and reads positions and events back. It never mutates
// sim state directly.
//
// **Critical constraint: determinism.** Given the same seed, sample points,
// config, and command stream, a run produces the same agents, paths, and
// meals. All randomness comes from the seeded `GameRng`. Entity maps are
// `BTreeMap`; the hash maps inside `nav.rs` and `spatial.rs` use
// `rustc_hash`, whose hasher has no per-process random state. No system
// time, no OS entropy.

pub mod agent;
pub mod ai;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod host;
pub mod nav;
pub mod population;
pub mod predation;
pub use shoal_prng as prng;
pub mod registry;
pub mod sim;
pub mod spatial;
pub mod species;
pub mod types;
pub mod volume;
