// Narrow interfaces to the host engine's collaborators.
//
// The simulation core never touches meshes, rigid bodies, or terrain
// directly. It sees:
// - `CapsuleShape`: the `{radius, half_height}` collision descriptor the
//   physics side uses, from which physics volumes are computed.
// - `TransformHandle`: a rendered object's world position, uniform scale,
//   and an "enclosed volume at a given scale" query (asked at registration
//   and after growth).
// - `SamplePointProvider`: the terrain-free sample points and spacing that
//   seed the navigation grid.
//
// See also: `registry.rs` (`register_from_handle`, `apply_visual_scale`),
// `sim.rs` (`SimState::from_provider`).

use crate::volume::capsule_volume;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Capsule collision descriptor: a cylinder of length `2 * half_height`
/// with hemispherical caps of `radius`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapsuleShape {
    pub radius: f64,
    pub half_height: f64,
}

impl CapsuleShape {
    pub const fn new(radius: f64, half_height: f64) -> Self {
        Self {
            radius,
            half_height,
        }
    }

    pub fn volume(&self) -> f64 {
        capsule_volume(self.radius, self.half_height)
    }

    /// The same capsule uniformly scaled by `scale`.
    pub fn scaled(&self, scale: f64) -> Self {
        Self::new(self.radius * scale, self.half_height * scale)
    }
}

/// A rendered object owned by the host engine.
pub trait TransformHandle {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    fn scale(&self) -> f64;
    fn set_scale(&mut self, scale: f64);

    /// Volume the visual mesh encloses when drawn at `scale`.
    fn enclosed_volume_at(&self, scale: f64) -> f64;
}

/// Source of navigable sample points (terrain and obstacle free).
pub trait SamplePointProvider {
    /// World-space points in a stable order; the order defines grid indices.
    fn sample_points(&self) -> Vec<Vec3>;

    /// Nominal distance between neighboring samples.
    fn spacing(&self) -> f32;
}

/// A regular lattice of points, mostly for tests, benches, and headless
/// hosts that have no terrain.
#[derive(Clone, Debug)]
pub struct LatticeProvider {
    pub origin: Vec3,
    pub counts: (u32, u32, u32),
    pub spacing: f32,
}

impl SamplePointProvider for LatticeProvider {
    fn sample_points(&self) -> Vec<Vec3> {
        let (nx, ny, nz) = self.counts;
        let mut points = Vec::with_capacity((nx * ny * nz) as usize);
        for y in 0..ny {
            for z in 0..nz {
                for x in 0..nx {
                    points.push(
                        self.origin
                            + Vec3::new(x as f32, y as f32, z as f32) * self.spacing,
                    );
                }
            }
        }
        points
    }

    fn spacing(&self) -> f32 {
        self.spacing
    }
}
