// Error taxonomy for the simulation core.
//
// Nothing here is fatal to a tick. Configuration errors (bad volumes, bad
// spacing) are usually caught at the call site, logged, and replaced with a
// safe default. `NotFound` is handed back to the caller, who decides whether
// to skip or escalate. Resource exhaustion (no grid points, spawn attempts
// used up) is reported as `None`/counts by the population code rather than
// through this type.

use crate::types::EntityId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Scale-factor math was handed a zero or negative base volume.
    #[error("non-positive volume: {0}")]
    NonPositiveVolume(f64),

    /// The entity has no volume record (never registered or already removed).
    #[error("no volume record for {0}")]
    NotFound(EntityId),

    /// Grid spacing must be positive and finite.
    #[error("invalid grid spacing: {0}")]
    InvalidSpacing(f32),

    /// Config JSON failed to parse.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}
