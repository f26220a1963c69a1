//! Spawn placement.
//!
//! Conversational spawns follow a golden-angle spiral keyed by spawn ordinal,
//! so consecutive nodes land far apart in angle while the radius grows slowly.
//! Bulk background imports are spread evenly over a Fibonacci sphere.

use glam::Vec3;

use crate::config::NodeConfig;
use crate::constants::GOLDEN_ANGLE;

/// Position of the `ordinal`-th conversational spawn.
pub fn spiral_position(ordinal: usize, config: &NodeConfig) -> Vec3 {
    let k = ordinal as f32;
    let angle = k * GOLDEN_ANGLE;
    let radius = config.spiral_base_radius + config.spiral_radius_step * k.sqrt();
    let height = (k * 0.7).sin() * config.spiral_height;
    Vec3::new(angle.cos() * radius, height, angle.sin() * radius)
}

/// `count` points evenly spread over a sphere of `radius`.
pub fn fibonacci_sphere(count: usize, radius: f32) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }
    let n = count as f32;
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / n;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = i as f32 * GOLDEN_ANGLE;
            Vec3::new(theta.cos() * ring, y, theta.sin() * ring) * radius
        })
        .collect()
}
