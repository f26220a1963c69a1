//! Ambient particle field.
//!
//! A fixed buffer of particles whose rendered positions and colours are
//! recomputed every frame from their base positions: ambient bob, an optional
//! ripple, and convergence toward text-formation targets. The count is fixed
//! at construction; every particle is processed every frame.

use glam::Vec3;
use rand::Rng;

use crate::config::ParticleConfig;
use crate::constants::FRAME_DT;
use crate::noise::NoiseField;

#[derive(Clone, Debug)]
pub struct Particle {
    pub base_position: Vec3,
    /// Reserved; ambient drift is positional, not integrated.
    pub velocity: Vec3,
    pub phase: f32,
    pub color: Vec3,
}

/// A decaying radial height wave.
#[derive(Clone, Copy, Debug)]
pub struct Ripple {
    pub origin: Vec3,
    pub elapsed: f32,
}

pub struct ParticleField {
    config: ParticleConfig,
    particles: Vec<Particle>,
    /// Derived render buffer, one entry per particle.
    positions: Vec<Vec3>,
    targets: Vec<Vec3>,
    formation_requested: bool,
    progress: f32,
    ripple: Option<Ripple>,
}

impl ParticleField {
    /// Scatter `config.count` particles. With a noise field the base heights
    /// follow a stable simplex terrain; without one they stay flat.
    pub fn new(
        config: ParticleConfig,
        noise: Option<&NoiseField>,
        initial_color: Vec3,
        rng: &mut impl Rng,
    ) -> Self {
        if noise.is_none() {
            tracing::warn!("particle terrain disabled, using static heights");
        }

        let spread = config.spread;
        let half_depth = config.depth / 2.0;
        let particles: Vec<Particle> = (0..config.count)
            .map(|_| {
                let x = rng.random_range(-spread..spread);
                let z = rng.random_range(-spread..spread);
                let scatter = if half_depth > 0.0 {
                    rng.random_range(-half_depth..half_depth)
                } else {
                    0.0
                };
                let terrain = noise
                    .map(|n| {
                        n.noise3d(x * config.terrain_frequency, 0.0, z * config.terrain_frequency)
                            * config.terrain_amplitude
                    })
                    .unwrap_or(0.0);
                Particle {
                    base_position: Vec3::new(x, terrain + scatter, z),
                    velocity: Vec3::ZERO,
                    phase: rng.random_range(0.0..std::f32::consts::TAU),
                    color: initial_color,
                }
            })
            .collect();
        let positions = particles.iter().map(|p| p.base_position).collect();

        Self {
            config,
            particles,
            positions,
            targets: Vec::new(),
            formation_requested: false,
            progress: 0.0,
            ripple: None,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn formation_requested(&self) -> bool {
        self.formation_requested
    }

    pub fn targets(&self) -> &[Vec3] {
        &self.targets
    }

    pub fn ripple(&self) -> Option<Ripple> {
        self.ripple
    }

    /// Replace the formation target list. Progress is left untouched so a new
    /// text eases from wherever the previous one got to.
    pub fn set_targets(&mut self, targets: Vec<Vec3>) {
        self.targets = targets;
    }

    pub fn set_formation(&mut self, requested: bool) {
        self.formation_requested = requested;
    }

    pub fn trigger_ripple(&mut self, origin: Vec3) {
        self.ripple = Some(Ripple {
            origin,
            elapsed: 0.0,
        });
    }

    /// Retrigger the ripple on a loud enough voice sample. Returns whether a
    /// ripple was started.
    pub fn voice_amplitude(&mut self, level: f32, origin: Vec3) -> bool {
        if level <= self.config.ripple_spike_threshold {
            return false;
        }
        let ready = self
            .ripple
            .is_none_or(|r| r.elapsed >= self.config.ripple_retrigger_seconds);
        if ready {
            self.trigger_ripple(origin);
        }
        ready
    }

    /// Advance one frame at simulation time `time`, blending colours toward
    /// `zone_color`.
    pub fn update(&mut self, time: f32, zone_color: Vec3) {
        let step = self.config.formation_step;
        self.progress = if self.formation_requested {
            (self.progress + step).min(1.0)
        } else {
            (self.progress - step).max(0.0)
        };
        if self.progress == 0.0 && !self.formation_requested && !self.targets.is_empty() {
            self.targets.clear();
        }

        let ease = 1.0 - (1.0 - self.progress).powi(3);
        let smoothing = self.config.color_smoothing;
        let brighten = self.progress > 0.5;
        let bob_amp = self.config.bob_amplitude;
        let bob_speed = self.config.bob_speed;

        let ripple = self.ripple.map(|r| {
            let decay = 1.0 - r.elapsed / self.config.ripple_duration;
            let k = std::f32::consts::TAU / self.config.ripple_wavelength;
            (r, decay.max(0.0), k)
        });

        for (i, (particle, out)) in self
            .particles
            .iter_mut()
            .zip(self.positions.iter_mut())
            .enumerate()
        {
            particle.color += (zone_color - particle.color) * smoothing;

            let mut pos = particle.base_position;
            pos.y += (time * bob_speed + particle.phase).sin() * bob_amp;

            if let Some((r, decay, k)) = ripple {
                let d = Vec3::new(pos.x - r.origin.x, 0.0, pos.z - r.origin.z).length();
                let wave = (d * k - r.elapsed * self.config.ripple_speed * k).sin();
                pos.y += wave
                    * self.config.ripple_amplitude
                    * decay
                    * (-d * self.config.ripple_falloff).exp();
            }

            if self.progress > 0.0
                && let Some(target) = self.targets.get(i)
            {
                pos = pos.lerp(*target, ease);
                if brighten {
                    particle.color = particle.color.lerp(Vec3::ONE, self.config.brighten_rate);
                }
            }

            *out = pos;
        }

        if let Some(r) = self.ripple.as_mut() {
            r.elapsed += FRAME_DT;
            if r.elapsed >= self.config.ripple_duration {
                self.ripple = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn small_config() -> ParticleConfig {
        ParticleConfig {
            count: 400,
            ..ParticleConfig::default()
        }
    }

    fn field() -> ParticleField {
        let mut rng = rng();
        let noise = NoiseField::new(&mut rng);
        ParticleField::new(small_config(), Some(&noise), Vec3::ZERO, &mut rng)
    }

    #[test]
    fn test_count_fixed() {
        let mut f = field();
        for frame in 0..50 {
            f.update(frame as f32 * FRAME_DT, Vec3::ONE);
        }
        assert_eq!(f.len(), 400);
        assert_eq!(f.positions().len(), 400);
    }

    #[test]
    fn test_terrain_is_stable() {
        let mut rng = rng();
        let noise = NoiseField::new(&mut rng);
        let mut rng_a = SmallRng::seed_from_u64(5);
        let mut rng_b = SmallRng::seed_from_u64(5);
        let a = ParticleField::new(small_config(), Some(&noise), Vec3::ZERO, &mut rng_a);
        let b = ParticleField::new(small_config(), Some(&noise), Vec3::ZERO, &mut rng_b);
        for (pa, pb) in a.particles().iter().zip(b.particles()) {
            assert_eq!(pa.base_position, pb.base_position);
        }
    }

    #[test]
    fn test_flat_without_noise() {
        let config = ParticleConfig {
            count: 100,
            depth: 0.0,
            ..ParticleConfig::default()
        };
        let f = ParticleField::new(config, None, Vec3::ZERO, &mut rng());
        assert!(f.particles().iter().all(|p| p.base_position.y == 0.0));
    }

    #[test]
    fn test_color_smoothing_is_exponential() {
        let mut f = field();
        f.update(0.0, Vec3::ONE);
        let c = f.particles()[0].color;
        // From black toward white at rate 0.02: exactly 0.02 after one frame.
        assert!((c.x - 0.02).abs() < 1e-6);
        f.update(FRAME_DT, Vec3::ONE);
        let c = f.particles()[0].color;
        assert!((c.x - (0.02 + 0.98 * 0.02)).abs() < 1e-6);
    }

    #[test]
    fn test_progress_steps_and_clamps() {
        let mut f = field();
        f.set_targets(vec![Vec3::new(0.0, 50.0, 0.0)]);
        f.set_formation(true);
        for _ in 0..10 {
            f.update(0.0, Vec3::ZERO);
        }
        assert!((f.progress() - 0.2).abs() < 1e-5);
        for _ in 0..100 {
            f.update(0.0, Vec3::ZERO);
        }
        assert_eq!(f.progress(), 1.0);
        f.set_formation(false);
        for _ in 0..100 {
            f.update(0.0, Vec3::ZERO);
        }
        assert_eq!(f.progress(), 0.0);
        assert!(f.targets().is_empty(), "targets dropped once fully dispersed");
    }

    #[test]
    fn test_full_progress_reaches_targets() {
        let mut f = field();
        let target = Vec3::new(1.0, 2.0, 3.0);
        f.set_targets(vec![target; 10]);
        f.set_formation(true);
        for _ in 0..60 {
            f.update(0.0, Vec3::ZERO);
        }
        for p in &f.positions()[..10] {
            assert!(p.distance(target) < 1e-4);
        }
        // Particles past the target list keep their ambient position.
        assert!(f.positions()[10].distance(target) > 1.0);
    }

    #[test]
    fn test_formation_brightens_participants_only() {
        let mut f = field();
        f.set_targets(vec![Vec3::ZERO; 5]);
        f.set_formation(true);
        for _ in 0..40 {
            f.update(0.0, Vec3::ZERO);
        }
        assert!(f.particles()[0].color.x > 0.1);
        assert_eq!(f.particles()[5].color, Vec3::ZERO);
    }

    #[test]
    fn test_ripple_expires() {
        let mut f = field();
        f.trigger_ripple(Vec3::ZERO);
        f.update(0.0, Vec3::ZERO);
        assert!(f.ripple().is_some());
        let frames = (f.config.ripple_duration / FRAME_DT).ceil() as usize;
        for i in 1..=frames {
            f.update(i as f32 * FRAME_DT, Vec3::ZERO);
        }
        assert!(f.ripple().is_none());
    }

    #[test]
    fn test_ripple_displaces_heights() {
        let mut a = field();
        let mut b = field();
        b.trigger_ripple(Vec3::ZERO);
        a.update(1.0, Vec3::ZERO);
        b.update(1.0, Vec3::ZERO);
        let moved = a
            .positions()
            .iter()
            .zip(b.positions())
            .filter(|(pa, pb)| (pa.y - pb.y).abs() > 1e-3)
            .count();
        assert!(moved > 0);
        // Horizontal positions are untouched.
        for (pa, pb) in a.positions().iter().zip(b.positions()) {
            assert_eq!(pa.x, pb.x);
            assert_eq!(pa.z, pb.z);
        }
    }

    #[test]
    fn test_voice_spike_retrigger() {
        let mut f = field();
        assert!(!f.voice_amplitude(0.1, Vec3::ZERO));
        assert!(f.voice_amplitude(0.9, Vec3::ZERO));
        // Too soon after the last trigger.
        assert!(!f.voice_amplitude(0.9, Vec3::ZERO));
        for _ in 0..40 {
            f.update(0.0, Vec3::ZERO);
        }
        assert!(f.voice_amplitude(0.9, Vec3::ZERO));
    }
}
