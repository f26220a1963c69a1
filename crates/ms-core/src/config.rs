//! Engine configuration.
//!
//! Every section deserializes with defaults so a partial TOML file (or none
//! at all) yields a working engine. Per-frame rates assume the fixed 16 ms
//! step of [`FRAME_DT`](crate::constants::FRAME_DT).

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{EngineError, Result};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub particles: ParticleConfig,
    pub nodes: NodeConfig,
    pub connections: ConnectionConfig,
    pub camera: CameraConfig,
    pub text: TextConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    pub spread: f32,
    pub depth: f32,
    /// Displace particle heights with simplex terrain. When off, heights
    /// stay flat (plus the scatter in `depth`).
    pub terrain: bool,
    pub terrain_frequency: f32,
    pub terrain_amplitude: f32,
    pub bob_amplitude: f32,
    pub bob_speed: f32,
    pub color_smoothing: f32,
    pub formation_step: f32,
    pub brighten_rate: f32,
    pub ripple_duration: f32,
    pub ripple_amplitude: f32,
    pub ripple_wavelength: f32,
    pub ripple_speed: f32,
    pub ripple_falloff: f32,
    pub ripple_spike_threshold: f32,
    pub ripple_retrigger_seconds: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: PARTICLE_COUNT,
            spread: PARTICLE_SPREAD,
            depth: PARTICLE_DEPTH,
            terrain: true,
            terrain_frequency: TERRAIN_FREQUENCY,
            terrain_amplitude: TERRAIN_AMPLITUDE,
            bob_amplitude: BOB_AMPLITUDE,
            bob_speed: BOB_SPEED,
            color_smoothing: COLOR_SMOOTHING,
            formation_step: TEXT_FORMATION_STEP,
            brighten_rate: TEXT_BRIGHTEN_RATE,
            ripple_duration: RIPPLE_DURATION,
            ripple_amplitude: RIPPLE_AMPLITUDE,
            ripple_wavelength: RIPPLE_WAVELENGTH,
            ripple_speed: RIPPLE_SPEED,
            ripple_falloff: RIPPLE_FALLOFF,
            ripple_spike_threshold: RIPPLE_SPIKE_THRESHOLD,
            ripple_retrigger_seconds: RIPPLE_RETRIGGER_SECONDS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub base_scale: f32,
    pub max_scale: f32,
    pub scale_ease: f32,
    pub fade_in_step: f32,
    pub fade_out_step: f32,
    pub aging_factor: f32,
    pub aging_exempt: usize,
    pub retire_scale: f32,
    pub arrival_bump: f32,
    pub drift_speed: f32,
    pub bob_amplitude: f32,
    pub bob_speed: f32,
    pub spiral_base_radius: f32,
    pub spiral_radius_step: f32,
    pub spiral_height: f32,
    pub background_radius: f32,
    pub placeholder_size: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            base_scale: NODE_BASE_SCALE,
            max_scale: NODE_MAX_SCALE,
            scale_ease: SCALE_EASE,
            fade_in_step: FADE_IN_STEP,
            fade_out_step: FADE_OUT_STEP,
            aging_factor: AGING_FACTOR,
            aging_exempt: AGING_EXEMPT,
            retire_scale: RETIRE_SCALE,
            arrival_bump: ARRIVAL_BUMP,
            drift_speed: NODE_DRIFT_SPEED,
            bob_amplitude: NODE_BOB_AMPLITUDE,
            bob_speed: NODE_BOB_SPEED,
            spiral_base_radius: SPIRAL_BASE_RADIUS,
            spiral_radius_step: SPIRAL_RADIUS_STEP,
            spiral_height: SPIRAL_HEIGHT,
            background_radius: BACKGROUND_SPHERE_RADIUS,
            placeholder_size: PLACEHOLDER_SIZE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub capacity: usize,
    pub w_same_zone: f32,
    pub w_same_panel: f32,
    pub temporal_near_bonus: f32,
    pub temporal_far_bonus: f32,
    pub temporal_near_seconds: f64,
    pub temporal_far_seconds: f64,
    pub spatial_near_bonus: f32,
    pub spatial_far_bonus: f32,
    pub spatial_near_distance: f32,
    pub spatial_far_distance: f32,
    pub max_distance: f32,
    pub strength_threshold: f32,
    pub visibility_threshold: f32,
    pub base_opacity: f32,
    pub pulse_depth: f32,
    pub pulse_speed: f32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_CONNECTIONS,
            w_same_zone: W_SAME_ZONE,
            w_same_panel: W_SAME_PANEL,
            temporal_near_bonus: TEMPORAL_NEAR_BONUS,
            temporal_far_bonus: TEMPORAL_FAR_BONUS,
            temporal_near_seconds: TEMPORAL_NEAR_SECONDS,
            temporal_far_seconds: TEMPORAL_FAR_SECONDS,
            spatial_near_bonus: SPATIAL_NEAR_BONUS,
            spatial_far_bonus: SPATIAL_FAR_BONUS,
            spatial_near_distance: SPATIAL_NEAR_DISTANCE,
            spatial_far_distance: SPATIAL_FAR_DISTANCE,
            max_distance: MAX_CONNECTION_DISTANCE,
            strength_threshold: STRENGTH_THRESHOLD,
            visibility_threshold: VISIBILITY_THRESHOLD,
            base_opacity: LINE_BASE_OPACITY,
            pulse_depth: LINE_PULSE_DEPTH,
            pulse_speed: LINE_PULSE_SPEED,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Queue newly spawned nodes for the focus tour.
    pub tour: bool,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub ambient_lerp: f32,
    pub focus_lerp: f32,
    pub ambient_orbit_speed: f32,
    pub focus_radius: f32,
    pub focus_height: f32,
    pub focus_orbit_speed: f32,
    pub dwell_phase: f32,
    pub move_step: f32,
    pub zoom_step: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            tour: true,
            fov_degrees: CAMERA_FOV_DEGREES,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            ambient_lerp: CAMERA_AMBIENT_LERP,
            focus_lerp: CAMERA_FOCUS_LERP,
            ambient_orbit_speed: AMBIENT_ORBIT_SPEED,
            focus_radius: FOCUS_RADIUS,
            focus_height: FOCUS_HEIGHT,
            focus_orbit_speed: FOCUS_ORBIT_SPEED,
            dwell_phase: FOCUS_DWELL_PHASE,
            move_step: CAMERA_MOVE_STEP,
            zoom_step: CAMERA_ZOOM_STEP,
            min_distance: CAMERA_MIN_DISTANCE,
            max_distance: CAMERA_MAX_DISTANCE,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub glyph_scale: u32,
    pub sample_stride: u32,
    pub luma_threshold: u8,
    pub point_scale: f32,
    pub depth_jitter: f32,
    pub max_canvas: u32,
    pub anchor_y: f32,
    pub anchor_z: f32,
    pub formation_seconds: f32,
}

impl TextConfig {
    pub fn anchor(&self) -> Vec3 {
        Vec3::new(0.0, self.anchor_y, self.anchor_z)
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            glyph_scale: TEXT_GLYPH_SCALE,
            sample_stride: TEXT_SAMPLE_STRIDE,
            luma_threshold: TEXT_LUMA_THRESHOLD,
            point_scale: TEXT_POINT_SCALE,
            depth_jitter: TEXT_DEPTH_JITTER,
            max_canvas: TEXT_MAX_CANVAS,
            anchor_y: TEXT_ANCHOR_Y,
            anchor_z: TEXT_ANCHOR_Z,
            formation_seconds: TEXT_FORMATION_SECONDS,
        }
    }
}

fn check(ok: bool, msg: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(msg.to_string()))
    }
}

fn unit_rate(v: f32) -> bool {
    v > 0.0 && v <= 1.0
}

impl EngineConfig {
    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.particles;
        check(p.count > 0, "particles.count must be positive")?;
        check(p.spread > 0.0, "particles.spread must be positive")?;
        check(unit_rate(p.color_smoothing), "particles.color_smoothing must be in (0, 1]")?;
        check(unit_rate(p.formation_step), "particles.formation_step must be in (0, 1]")?;
        check(p.ripple_duration > 0.0, "particles.ripple_duration must be positive")?;
        check(p.ripple_wavelength > 0.0, "particles.ripple_wavelength must be positive")?;

        let n = &self.nodes;
        check(n.base_scale > 0.0, "nodes.base_scale must be positive")?;
        check(n.max_scale >= n.base_scale, "nodes.max_scale must be >= base_scale")?;
        check(unit_rate(n.scale_ease), "nodes.scale_ease must be in (0, 1]")?;
        check(unit_rate(n.fade_in_step), "nodes.fade_in_step must be in (0, 1]")?;
        check(unit_rate(n.fade_out_step), "nodes.fade_out_step must be in (0, 1]")?;
        check(
            n.aging_factor > 0.0 && n.aging_factor < 1.0,
            "nodes.aging_factor must be in (0, 1)",
        )?;
        check(
            n.retire_scale > 0.0 && n.retire_scale < n.base_scale,
            "nodes.retire_scale must be in (0, base_scale)",
        )?;
        check(n.arrival_bump >= 1.0, "nodes.arrival_bump must be >= 1")?;
        check(n.placeholder_size > 0, "nodes.placeholder_size must be positive")?;

        let c = &self.connections;
        check(c.capacity > 0, "connections.capacity must be positive")?;
        check(c.max_distance > 0.0, "connections.max_distance must be positive")?;

        let cam = &self.camera;
        check(
            cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0,
            "camera.fov_degrees must be in (0, 180)",
        )?;
        check(cam.near > 0.0 && cam.far > cam.near, "camera near/far planes are inverted")?;
        check(unit_rate(cam.ambient_lerp), "camera.ambient_lerp must be in (0, 1]")?;
        check(unit_rate(cam.focus_lerp), "camera.focus_lerp must be in (0, 1]")?;
        check(cam.dwell_phase > 0.0, "camera.dwell_phase must be positive")?;
        check(
            cam.min_distance > 0.0 && cam.max_distance > cam.min_distance,
            "camera distance limits are inverted",
        )?;

        let t = &self.text;
        check(t.glyph_scale > 0, "text.glyph_scale must be positive")?;
        check(
            u64::from(t.glyph_scale) * 8 <= u64::from(t.max_canvas),
            "text.glyph_scale must fit one glyph inside text.max_canvas",
        )?;
        check(t.sample_stride > 0, "text.sample_stride must be positive")?;
        check(t.formation_seconds > 0.0, "text.formation_seconds must be positive")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"seed": 7, "particles": {"count": 500}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.particles.count, 500);
        assert_eq!(config.particles.spread, PARTICLE_SPREAD);
        assert_eq!(config.connections.capacity, MAX_CONNECTIONS);
    }

    #[test]
    fn test_rejects_zero_particles() {
        let mut config = EngineConfig::default();
        config.particles.count = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(ref m) if m.contains("particles.count")));
    }

    #[test]
    fn test_rejects_glyph_larger_than_canvas() {
        let mut config = EngineConfig::default();
        config.text.glyph_scale = 1 << 30;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(ref m) if m.contains("text.glyph_scale")));

        config.text.glyph_scale = config.text.max_canvas / 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut config = EngineConfig::default();
        config.connections.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_aging_factor_of_one() {
        let mut config = EngineConfig::default();
        config.nodes.aging_factor = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_anchor() {
        let t = TextConfig::default();
        assert_eq!(t.anchor(), Vec3::new(0.0, TEXT_ANCHOR_Y, TEXT_ANCHOR_Z));
    }
}
