//! Texture ownership for constellation nodes.
//!
//! The bank owns every texture the core knows about and hands out opaque
//! handles. Nodes hold handles only; releasing a node releases its handle.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::zone::Zone;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureKind {
    Placeholder,
    Image,
    Video,
}

/// Description of a video stream supplied by the generation pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoSource {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    /// Loop length in seconds.
    pub duration: f32,
}

/// A completed (or failed) texture generation, delivered for one node.
#[derive(Clone, Debug)]
pub enum TextureSource {
    Image(RgbaImage),
    Video(VideoSource),
    Failed(String),
}

#[derive(Debug)]
pub struct TextureEntry {
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub pixels: Option<RgbaImage>,
}

#[derive(Debug, Default)]
pub struct TextureBank {
    entries: HashMap<TextureHandle, TextureEntry>,
    next: u64,
}

impl TextureBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, entry: TextureEntry) -> TextureHandle {
        let handle = TextureHandle(self.next);
        self.next += 1;
        self.entries.insert(handle, entry);
        handle
    }

    pub fn insert_image(&mut self, image: RgbaImage, kind: TextureKind) -> TextureHandle {
        let (width, height) = image.dimensions();
        self.insert(TextureEntry {
            kind,
            width,
            height,
            pixels: Some(image),
        })
    }

    pub fn insert_video(&mut self, video: &VideoSource) -> TextureHandle {
        self.insert(TextureEntry {
            kind: TextureKind::Video,
            width: video.width,
            height: video.height,
            pixels: None,
        })
    }

    /// Release a texture. Releasing an unknown or already released handle is
    /// a no-op; returns whether anything was freed.
    pub fn release(&mut self, handle: TextureHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureEntry> {
        self.entries.get(&handle)
    }

    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Radial-gradient sprite in the zone's placeholder palette, fading to
/// transparent at the rim.
pub fn placeholder_sprite(zone: Zone, size: u32) -> RgbaImage {
    let (inner, outer) = zone.placeholder_palette();
    let center = (size as f32 - 1.0) / 2.0;
    let radius = (size as f32 / 2.0).max(1.0);

    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        let t = ((dx * dx + dy * dy).sqrt() / radius).min(1.0);
        let c = inner.lerp(outer, t);
        let alpha = (1.0 - t) * (1.0 - t);
        Rgba([
            channel(c.x),
            channel(c.y),
            channel(c.z),
            channel(alpha),
        ])
    })
}

fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
