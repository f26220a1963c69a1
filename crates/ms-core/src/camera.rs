//! Camera state machine.
//!
//! Three modes: `Manual` (user input only, autonomous state suspended but
//! kept), `AmbientAutopilot` (slow orbit of the origin at the zone's framing)
//! and `FocusTour` (orbit the focused node, advancing through the focus
//! queue after a dwell). Every autonomous move is an exponential lerp toward
//! a target, never a snap.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;
use crate::constants::EPSILON;
use crate::node::NodeId;
use crate::registry::ConstellationRegistry;
use crate::zone::Framing;

const MAX_PITCH: f32 = 1.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    Manual,
    AmbientAutopilot,
    FocusTour,
}

impl CameraMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AmbientAutopilot => "ambient_autopilot",
            Self::FocusTour => "focus_tour",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraDirection {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
}

pub struct CameraController {
    config: CameraConfig,
    mode: CameraMode,
    position: Vec3,
    look_at: Vec3,
    focus_queue: Vec<NodeId>,
    focus_index: usize,
    focus_target: Option<NodeId>,
    orbit_phase: f32,
    ambient_angle: f32,
    width: u32,
    height: u32,
}

impl CameraController {
    pub fn new(config: CameraConfig, framing: Framing) -> Self {
        let width = config.viewport_width.max(1);
        let height = config.viewport_height.max(1);
        Self {
            config,
            mode: CameraMode::AmbientAutopilot,
            position: Vec3::new(0.0, framing.height, framing.distance),
            look_at: Vec3::ZERO,
            focus_queue: Vec::new(),
            focus_index: 0,
            focus_target: None,
            orbit_phase: 0.0,
            ambient_angle: std::f32::consts::FRAC_PI_2,
            width,
            height,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn focus_target(&self) -> Option<NodeId> {
        self.focus_target
    }

    pub fn focus_queue(&self) -> &[NodeId] {
        &self.focus_queue
    }

    pub fn focus_index(&self) -> usize {
        self.focus_index
    }

    pub fn orbit_phase(&self) -> f32 {
        self.orbit_phase
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_mode(&mut self, mode: CameraMode) -> Option<CameraMode> {
        if self.mode == mode {
            return None;
        }
        tracing::info!(from = self.mode.as_str(), to = mode.as_str(), "camera mode");
        if mode == CameraMode::AmbientAutopilot {
            // Continue the ambient orbit from wherever the camera is now.
            self.ambient_angle = self.position.z.atan2(self.position.x);
        }
        self.mode = mode;
        Some(mode)
    }

    /// Queue a freshly spawned node. Outside manual control the tour jumps
    /// to it immediately. Returns the new mode if it changed.
    pub fn enqueue(&mut self, id: NodeId) -> Option<CameraMode> {
        self.focus_queue.push(id);
        if self.mode == CameraMode::Manual {
            return None;
        }
        self.focus_index = self.focus_queue.len() - 1;
        self.focus_target = Some(id);
        self.orbit_phase = 0.0;
        self.set_mode(CameraMode::FocusTour)
    }

    pub fn set_manual(&mut self, manual: bool) -> Option<CameraMode> {
        if manual {
            self.set_mode(CameraMode::Manual)
        } else {
            self.resume()
        }
    }

    /// Hand control back to the autopilot: tour the queue if anything is
    /// queued, at the index that was active before, otherwise orbit.
    pub fn resume(&mut self) -> Option<CameraMode> {
        if self.focus_queue.is_empty() {
            self.focus_target = None;
            return self.set_mode(CameraMode::AmbientAutopilot);
        }
        self.focus_index = self.focus_index.min(self.focus_queue.len() - 1);
        let target = self.focus_queue[self.focus_index];
        if self.focus_target != Some(target) {
            self.focus_target = Some(target);
            self.orbit_phase = 0.0;
        }
        self.set_mode(CameraMode::FocusTour)
    }

    /// Drop queue entries whose nodes no longer exist, keeping the index on
    /// the same node (or the one after it, if the focused node is gone).
    fn prune(&mut self, registry: &ConstellationRegistry) {
        if self.focus_queue.iter().all(|id| registry.contains(*id)) {
            return;
        }
        let before = self.focus_queue[..self.focus_index.min(self.focus_queue.len())]
            .iter()
            .filter(|id| registry.contains(**id))
            .count();
        self.focus_queue.retain(|id| registry.contains(*id));
        self.focus_index = before.min(self.focus_queue.len().saturating_sub(1));
        if let Some(target) = self.focus_target
            && !registry.contains(target)
        {
            tracing::debug!(node = target.as_u64(), "focused node removed");
            self.focus_target = None;
        }
    }

    /// Target position of the ambient orbit for the current angle.
    pub fn ambient_target(&self, framing: Framing) -> Vec3 {
        Vec3::new(
            self.ambient_angle.cos() * framing.distance,
            framing.height,
            self.ambient_angle.sin() * framing.distance,
        )
    }

    /// One frame of autonomous motion. Returns the new mode if it changed.
    pub fn update(
        &mut self,
        registry: &ConstellationRegistry,
        framing: Framing,
        dt: f32,
    ) -> Option<CameraMode> {
        self.prune(registry);

        let mut changed = None;
        match self.mode {
            CameraMode::Manual => return None,
            CameraMode::FocusTour => {
                if self.focus_target.is_none() {
                    changed = self.set_mode(CameraMode::AmbientAutopilot);
                }
            }
            CameraMode::AmbientAutopilot => {}
        }

        if self.mode == CameraMode::FocusTour
            && let Some(node) = self.focus_target.and_then(|id| registry.get(id))
        {
            self.orbit_phase += self.config.focus_orbit_speed * dt;
            let center = node.position;
            let target = center
                + Vec3::new(
                    self.orbit_phase.cos() * self.config.focus_radius,
                    self.config.focus_height,
                    self.orbit_phase.sin() * self.config.focus_radius,
                );
            let rate = self.config.focus_lerp;
            self.position = self.position.lerp(target, rate);
            self.look_at = self.look_at.lerp(center, rate);

            if self.orbit_phase > self.config.dwell_phase
                && self.focus_index + 1 < self.focus_queue.len()
            {
                self.focus_index += 1;
                self.focus_target = Some(self.focus_queue[self.focus_index]);
                self.orbit_phase = 0.0;
            }
            return changed;
        }

        self.ambient_angle += self.config.ambient_orbit_speed * dt;
        let target = self.ambient_target(framing);
        let rate = self.config.ambient_lerp;
        self.position = self.position.lerp(target, rate);
        self.look_at = self.look_at.lerp(Vec3::ZERO, rate);
        changed
    }

    // --- Manual input ---

    /// Drag-orbit around the look-at point by yaw/pitch radians.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) -> Option<CameraMode> {
        let changed = self.set_mode(CameraMode::Manual);
        let offset = self.position - self.look_at;
        let r = offset.length().max(self.config.min_distance);
        let cur_yaw = offset.z.atan2(offset.x);
        let cur_pitch = (offset.y / r).clamp(-1.0, 1.0).asin();
        let new_yaw = cur_yaw + yaw;
        let new_pitch = (cur_pitch + pitch).clamp(-MAX_PITCH, MAX_PITCH);
        self.position = self.look_at
            + Vec3::new(
                new_pitch.cos() * new_yaw.cos(),
                new_pitch.sin(),
                new_pitch.cos() * new_yaw.sin(),
            ) * r;
        changed
    }

    /// Zoom toward (positive) or away from (negative) the look-at point.
    pub fn zoom(&mut self, delta: f32) -> Option<CameraMode> {
        let changed = self.set_mode(CameraMode::Manual);
        let offset = self.position - self.look_at;
        let r = offset.length();
        let dir = if r > EPSILON { offset / r } else { Vec3::Z };
        let new_r = (r * (1.0 - delta * self.config.zoom_step))
            .clamp(self.config.min_distance, self.config.max_distance);
        self.position = self.look_at + dir * new_r;
        changed
    }

    /// Translate camera and look-at point together.
    pub fn move_direction(&mut self, direction: CameraDirection) -> Option<CameraMode> {
        let changed = self.set_mode(CameraMode::Manual);
        let forward = (self.look_at - self.position).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let v = match direction {
            CameraDirection::Up => Vec3::Y,
            CameraDirection::Down => -Vec3::Y,
            CameraDirection::Left => -right,
            CameraDirection::Right => right,
            CameraDirection::Forward => forward,
            CameraDirection::Backward => -forward,
        };
        let offset = v * self.config.move_step;
        self.position += offset;
        self.look_at += offset;
        changed
    }

    // --- Projection ---

    /// Update the viewport. Zero sizes are ignored; returns whether the
    /// size actually changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn view_projection(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(
            self.config.fov_degrees.to_radians(),
            self.aspect(),
            self.config.near,
            self.config.far,
        );
        let view = Mat4::look_at_rh(self.position, self.look_at, Vec3::Y);
        proj * view
    }

    /// Project a world point to pixel coordinates (origin top-left) plus its
    /// view depth. `None` when behind the camera or outside the depth range.
    pub fn project(&self, world: Vec3) -> Option<(Vec2, f32)> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= self.config.near {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        let x = (ndc.x + 1.0) * 0.5 * self.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * self.height as f32;
        Some((Vec2::new(x, y), clip.w))
    }

    /// On-screen radius in pixels of a world-space radius at view depth `depth`.
    pub fn pixel_radius(&self, world_radius: f32, depth: f32) -> f32 {
        let half_fov = (self.config.fov_degrees.to_radians() * 0.5).tan();
        world_radius * (self.height as f32 * 0.5) / (half_fov * depth)
    }

    /// Nearest visible node whose billboard covers the pixel.
    pub fn hit_test(
        &self,
        registry: &ConstellationRegistry,
        x: f32,
        y: f32,
        visibility: f32,
    ) -> Option<NodeId> {
        let point = Vec2::new(x, y);
        registry
            .iter()
            .filter(|n| n.is_visible(visibility) && n.current_scale > 0.0)
            .filter_map(|n| {
                let (screen, depth) = self.project(n.position)?;
                let radius = self.pixel_radius(n.current_scale * 0.5, depth);
                (screen.distance(point) <= radius).then_some((n.id, depth))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}
