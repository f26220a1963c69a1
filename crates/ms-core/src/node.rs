use glam::Vec3;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::texture::{TextureHandle, TextureKind};
use crate::zone::Zone;

new_key_type! {
    /// Stable node identifier. Survives removal of other nodes; never reused
    /// for a different node.
    pub struct NodeId;
}

impl NodeId {
    /// Opaque integer form for logs and exported frames.
    pub fn as_u64(self) -> u64 {
        slotmap::Key::data(&self).as_ffi()
    }
}

/// Playback state of a video node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoStream {
    pub playhead: f32,
    pub duration: f32,
    pub playing: bool,
}

impl VideoStream {
    pub fn new(duration: f32) -> Self {
        Self {
            playhead: 0.0,
            duration,
            playing: true,
        }
    }

    /// Advance the playhead, looping at the duration.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing || self.duration <= 0.0 {
            return;
        }
        self.playhead = (self.playhead + dt).rem_euclid(self.duration);
    }
}

/// What a node is currently displaying.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeContent {
    Placeholder(TextureHandle),
    Image(TextureHandle),
    Video {
        handle: TextureHandle,
        stream: VideoStream,
    },
}

impl NodeContent {
    pub fn handle(&self) -> TextureHandle {
        match self {
            NodeContent::Placeholder(h) | NodeContent::Image(h) => *h,
            NodeContent::Video { handle, .. } => *handle,
        }
    }

    pub fn kind(&self) -> TextureKind {
        match self {
            NodeContent::Placeholder(_) => TextureKind::Placeholder,
            NodeContent::Image(_) => TextureKind::Image,
            NodeContent::Video { .. } => TextureKind::Video,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, NodeContent::Placeholder(_))
    }
}

/// A request to add a node, as issued by the image-generation pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpawnRequest {
    #[serde(default)]
    pub position_hint: Option<Vec3>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub zone: Zone,
    /// Panel/category the image belongs to, for connection scoring.
    #[serde(default)]
    pub panel: Option<String>,
    /// Creation time on the engine clock. Defaults to "now".
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub user_input: Option<String>,
}

impl SpawnRequest {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_panel(mut self, panel: &str) -> Self {
        self.panel = Some(panel.to_string());
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position_hint = Some(position);
        self
    }

    pub fn created_at(mut self, t: f64) -> Self {
        self.created_at = Some(t);
        self
    }
}

/// An image-bearing billboard in the constellation.
#[derive(Clone, Debug)]
pub struct ConstellationNode {
    pub id: NodeId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub current_scale: f32,
    pub target_scale: f32,
    pub opacity: f32,
    pub zone: Zone,
    pub panel: Option<String>,
    pub created_at: f64,
    pub content: NodeContent,
    pub label: Option<String>,
    pub source_text: Option<String>,
    pub user_input: Option<String>,
    /// Per-node phase for the idle bob.
    pub bob_phase: f32,
    /// Set once the first real texture arrives.
    pub arrived: bool,
}

impl ConstellationNode {
    /// Fully faded and shrinking to nothing: ready for removal.
    pub fn is_expired(&self) -> bool {
        self.opacity <= 0.0 && self.target_scale == 0.0
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.opacity > threshold
    }

    /// Scale as rendered: placeholders breathe gently while they wait.
    pub fn display_scale(&self, time: f32) -> f32 {
        match &self.content {
            NodeContent::Placeholder(_) => {
                self.current_scale * (1.0 + 0.04 * (time * 3.0 + self.bob_phase).sin())
            }
            NodeContent::Image(_) | NodeContent::Video { .. } => self.current_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_stream_loops() {
        let mut s = VideoStream::new(2.0);
        s.advance(1.5);
        s.advance(1.0);
        assert!((s.playhead - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_paused_stream_holds() {
        let mut s = VideoStream::new(2.0);
        s.playing = false;
        s.advance(1.0);
        assert_eq!(s.playhead, 0.0);
    }

    #[test]
    fn test_content_kind() {
        let h = TextureHandle(3);
        assert_eq!(NodeContent::Placeholder(h).kind(), TextureKind::Placeholder);
        assert_eq!(NodeContent::Image(h).handle(), h);
        let v = NodeContent::Video {
            handle: h,
            stream: VideoStream::new(1.0),
        };
        assert_eq!(v.kind(), TextureKind::Video);
        assert!(!v.is_placeholder());
    }

    #[test]
    fn test_spawn_request_json_defaults() {
        let req: SpawnRequest = serde_json::from_str(r#"{"zone": "family"}"#).unwrap();
        assert_eq!(req.zone, Zone::Family);
        assert!(req.label.is_none());
        assert!(req.position_hint.is_none());
    }
}
