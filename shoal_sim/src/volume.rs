// Volume math: pure conversions between capsule dimensions, volumes, and
// uniform linear scale factors.
//
// Every "size" comparison in the game reduces to volumes, and every visible
// or physical size change reduces to a uniform scale. The two are linked by
// the cube law: scaling a shape by `s` multiplies its volume by `s³`, so the
// scale that takes a natural volume `V₀` to a target `V` is `∛(V / V₀)`.
//
// Volumes are `f64` throughout the crate; positions stay `f32` (`glam`).
//
// See also: `registry.rs` which applies these to per-entity records,
// `host.rs` for the `CapsuleShape` descriptor.

use crate::error::SimError;
use std::f64::consts::PI;
use tracing::warn;

/// Volume of a capsule: a cylinder of length `2 * half_height` capped by two
/// hemispheres of `radius`.
///
/// `V = π r² (2h + 4r/3)`. Negative inputs are treated as zero.
pub fn capsule_volume(radius: f64, half_height: f64) -> f64 {
    let r = radius.max(0.0);
    let h = half_height.max(0.0);
    PI * r * r * (2.0 * h + 4.0 * r / 3.0)
}

/// Uniform linear scale that takes `natural_volume` to `target_volume`.
///
/// Fails with `NonPositiveVolume` when the natural volume is zero or
/// negative (or NaN). A negative target is treated as zero.
pub fn scale_factor_for(natural_volume: f64, target_volume: f64) -> Result<f64, SimError> {
    if natural_volume.is_nan() || natural_volume <= 0.0 {
        return Err(SimError::NonPositiveVolume(natural_volume));
    }
    Ok((target_volume.max(0.0) / natural_volume).cbrt())
}

/// `scale_factor_for`, substituting a scale of 1 (and a warning) on bad
/// input.
pub fn scale_factor_or_unit(natural_volume: f64, target_volume: f64) -> f64 {
    match scale_factor_for(natural_volume, target_volume) {
        Ok(scale) => scale,
        Err(err) => {
            warn!(%err, target_volume, "scale factor fell back to 1.0");
            1.0
        }
    }
}

/// Volume after applying a uniform `scale` to a shape of `natural_volume`.
pub fn scaled_volume(natural_volume: f64, scale: f64) -> f64 {
    natural_volume * scale * scale * scale
}
