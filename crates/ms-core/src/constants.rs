/// Nominal fixed timestep in seconds. Every "per frame" rate below assumes it.
pub const FRAME_DT: f32 = 0.016;

/// Golden ratio: (1 + √5) / 2
pub const PHI: f32 = 1.618_034;

/// Golden angle in radians: 2π / φ²
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f32 = 1e-6;

// --- Particle field ---

/// Ambient particle count. Fixed for the lifetime of a field.
pub const PARTICLE_COUNT: usize = 25_000;

/// Half-width of the square the particles are scattered over.
pub const PARTICLE_SPREAD: f32 = 120.0;

/// Vertical thickness of the particle layer before terrain displacement.
pub const PARTICLE_DEPTH: f32 = 30.0;

/// Noise-terrain frequency and height.
pub const TERRAIN_FREQUENCY: f32 = 0.02;
pub const TERRAIN_AMPLITUDE: f32 = 12.0;

/// Ambient bob: amplitude in units, speed in radians/second.
pub const BOB_AMPLITUDE: f32 = 0.6;
pub const BOB_SPEED: f32 = 0.8;

/// Exponential colour smoothing toward the active zone, per frame.
pub const COLOR_SMOOTHING: f32 = 0.02;

/// Text-formation progress step per frame (both directions).
pub const TEXT_FORMATION_STEP: f32 = 0.02;

/// Per-frame blend toward white for particles forming text past half progress.
pub const TEXT_BRIGHTEN_RATE: f32 = 0.1;

/// Ripple lifetime in seconds.
pub const RIPPLE_DURATION: f32 = 5.0;
pub const RIPPLE_AMPLITUDE: f32 = 3.0;
pub const RIPPLE_WAVELENGTH: f32 = 8.0;
pub const RIPPLE_SPEED: f32 = 20.0;
pub const RIPPLE_FALLOFF: f32 = 0.015;

/// Voice amplitude above which a ripple is retriggered.
pub const RIPPLE_SPIKE_THRESHOLD: f32 = 0.6;

/// Minimum ripple age before a voice spike may retrigger it.
pub const RIPPLE_RETRIGGER_SECONDS: f32 = 0.5;

// --- Constellation ---

/// Target scale of a freshly spawned node.
pub const NODE_BASE_SCALE: f32 = 8.0;

/// Upper bound on any node scale.
pub const NODE_MAX_SCALE: f32 = 12.0;

/// Exponential scale easing per frame.
pub const SCALE_EASE: f32 = 0.05;

/// Opacity ramps per frame.
pub const FADE_IN_STEP: f32 = 0.02;
pub const FADE_OUT_STEP: f32 = 0.05;

/// Aging: factor applied to every node but the newest `AGING_EXEMPT`.
pub const AGING_FACTOR: f32 = 0.7;
pub const AGING_EXEMPT: usize = 4;

/// A target scale below this snaps to zero and the node starts fading out.
pub const RETIRE_SCALE: f32 = 0.5;

/// Multiplier applied to target scale when a real texture first arrives.
pub const ARRIVAL_BUMP: f32 = 1.15;

/// Node drift speed in units/second and bob parameters.
pub const NODE_DRIFT_SPEED: f32 = 0.3;
pub const NODE_BOB_AMPLITUDE: f32 = 0.01;
pub const NODE_BOB_SPEED: f32 = 1.2;

/// Golden spiral placement.
pub const SPIRAL_BASE_RADIUS: f32 = 12.0;
pub const SPIRAL_RADIUS_STEP: f32 = 4.0;
pub const SPIRAL_HEIGHT: f32 = 6.0;

/// Fibonacci sphere radius for background imports.
pub const BACKGROUND_SPHERE_RADIUS: f32 = 70.0;

/// Placeholder sprite edge length in pixels.
pub const PLACEHOLDER_SIZE: u32 = 64;

// --- Connections ---

pub const W_SAME_ZONE: f32 = 0.35;
pub const W_SAME_PANEL: f32 = 0.15;
pub const TEMPORAL_NEAR_BONUS: f32 = 0.25;
pub const TEMPORAL_FAR_BONUS: f32 = 0.1;
pub const TEMPORAL_NEAR_SECONDS: f64 = 60.0;
pub const TEMPORAL_FAR_SECONDS: f64 = 300.0;
pub const SPATIAL_NEAR_BONUS: f32 = 0.25;
pub const SPATIAL_FAR_BONUS: f32 = 0.1;
pub const SPATIAL_NEAR_DISTANCE: f32 = 20.0;
pub const SPATIAL_FAR_DISTANCE: f32 = 40.0;

/// Pairs farther apart than this are never connected.
pub const MAX_CONNECTION_DISTANCE: f32 = 80.0;

/// Minimum strength for an edge to be drawn.
pub const STRENGTH_THRESHOLD: f32 = 0.2;

/// Nodes fainter than this are ignored by connections and picking.
pub const VISIBILITY_THRESHOLD: f32 = 0.1;

/// Preallocated line-buffer capacity, in segments.
pub const MAX_CONNECTIONS: usize = 48;

/// Neural pulse: base line opacity and modulation.
pub const LINE_BASE_OPACITY: f32 = 0.35;
pub const LINE_PULSE_DEPTH: f32 = 0.25;
pub const LINE_PULSE_SPEED: f32 = 0.7;

// --- Camera ---

pub const CAMERA_FOV_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 2_000.0;

/// Exponential positional easing per frame.
pub const CAMERA_AMBIENT_LERP: f32 = 0.02;
pub const CAMERA_FOCUS_LERP: f32 = 0.04;

/// Ambient orbit speed around the origin, radians/second.
pub const AMBIENT_ORBIT_SPEED: f32 = 0.05;

/// Focus orbit: radius, height above the node, angular speed (rad/s).
pub const FOCUS_RADIUS: f32 = 18.0;
pub const FOCUS_HEIGHT: f32 = 5.0;
pub const FOCUS_ORBIT_SPEED: f32 = 0.4;

/// Orbit phase (radians) after which the tour advances to the next node.
pub const FOCUS_DWELL_PHASE: f32 = 3.2;

/// Manual input steps.
pub const CAMERA_MOVE_STEP: f32 = 4.0;
pub const CAMERA_ZOOM_STEP: f32 = 0.1;
pub const CAMERA_MIN_DISTANCE: f32 = 5.0;
pub const CAMERA_MAX_DISTANCE: f32 = 400.0;

// --- Text formation ---

pub const TEXT_MAX_CHARS: usize = 20;
pub const TEXT_GLYPH_SCALE: u32 = 4;
pub const TEXT_SAMPLE_STRIDE: u32 = 2;
pub const TEXT_LUMA_THRESHOLD: u8 = 100;
pub const TEXT_POINT_SCALE: f32 = 0.25;
pub const TEXT_DEPTH_JITTER: f32 = 1.5;
pub const TEXT_MAX_CANVAS: u32 = 4096;

/// Distance in front of the default framing where text forms.
pub const TEXT_ANCHOR_Y: f32 = 20.0;
pub const TEXT_ANCHOR_Z: f32 = 40.0;

/// Seconds a formation request stays active before clearing itself.
pub const TEXT_FORMATION_SECONDS: f32 = 4.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_angle_from_phi() {
        let expected = std::f32::consts::TAU / (PHI * PHI);
        assert!((GOLDEN_ANGLE - expected).abs() < 1e-5);
    }

    #[test]
    fn test_rates_are_per_frame_fractions() {
        for rate in [COLOR_SMOOTHING, TEXT_FORMATION_STEP, SCALE_EASE, FADE_IN_STEP, FADE_OUT_STEP] {
            assert!(rate > 0.0 && rate < 1.0);
        }
    }
}
