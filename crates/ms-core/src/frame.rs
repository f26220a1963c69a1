//! Frame output: the borrowed per-frame view handed to a renderer, and the
//! owned JSON snapshot used for export.
//!
//! The snapshot uses camelCase field names and stores vectors as `[x, y, z]`
//! arrays.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::CameraMode;
use crate::particles::Particle;
use crate::texture::{TextureHandle, TextureKind};
use crate::zone::Zone;

pub const CURRENT_VERSION: &str = "0.1.0";

/// One constellation node as the renderer draws it.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeBillboard {
    pub id: u64,
    pub position: Vec3,
    /// Rendered scale, including the placeholder pulse.
    pub scale: f32,
    pub opacity: f32,
    pub zone: Zone,
    pub kind: TextureKind,
    pub texture: TextureHandle,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
    pub mode: CameraMode,
}

/// Everything a renderer needs for one frame. Particle and line buffers are
/// borrowed from the engine; only the small node list is built per frame.
pub struct FrameView<'a> {
    pub frame: u64,
    pub clock: f64,
    pub particle_positions: &'a [Vec3],
    pub particles: &'a [Particle],
    pub nodes: Vec<NodeBillboard>,
    pub line_segments: &'a [[Vec3; 2]],
    /// Number of populated line slots at the front of `line_segments`.
    pub line_count: usize,
    pub line_opacity: f32,
    pub camera: CameraPose,
    pub view_projection: Mat4,
}

/// Receives each finished frame.
pub trait FrameSink {
    fn submit(&mut self, frame: &FrameView<'_>);
}

/// Collects summary numbers instead of drawing. Handy for headless hosts.
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    pub frames: u64,
    pub max_nodes: usize,
    pub max_lines: usize,
    pub last_line_opacity: f32,
}

impl FrameSink for FrameStats {
    fn submit(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        self.max_nodes = self.max_nodes.max(frame.nodes.len());
        self.max_lines = self.max_lines.max(frame.line_count);
        self.last_line_opacity = frame.line_opacity;
    }
}

// --- Snapshot ---

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub version: String,
    pub timestamp: String,
    pub frame: u64,
    pub clock: f64,
    pub camera: CameraPose,
    pub zone: Zone,
    pub formation_progress: f32,
    pub particle_count: usize,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: u64,
    pub position: Vec3,
    pub scale: f32,
    pub target_scale: f32,
    pub opacity: f32,
    pub zone: Zone,
    pub content: TextureKind,
    pub created_at: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EdgeSnapshot {
    pub a: u64,
    pub b: u64,
    pub strength: f32,
}

/// Serialize a snapshot to pretty JSON.
pub fn export_json(snapshot: &FrameSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

/// Parse a snapshot back, e.g. for tooling that diffs exported frames.
pub fn import_json(json: &str) -> serde_json::Result<FrameSnapshot> {
    serde_json::from_str(json)
}
