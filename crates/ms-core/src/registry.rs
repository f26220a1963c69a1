//! Constellation registry: sole owner of the image-bearing nodes.
//!
//! Nodes live in a slot map keyed by stable [`NodeId`]s, with a side vector
//! recording creation order for the aging policy. Everything else in the
//! engine (connections, camera, picking) refers to nodes by id only.

use glam::Vec3;
use rand::Rng;
use slotmap::SlotMap;

use crate::config::NodeConfig;
use crate::error::{EngineError, Result};
use crate::node::{ConstellationNode, NodeContent, NodeId, SpawnRequest, VideoStream};
use crate::placement::{fibonacci_sphere, spiral_position};
use crate::texture::{TextureBank, TextureKind, TextureSource, placeholder_sprite};

/// Current scale below which a vanishing node is treated as fully shrunk.
const SCALE_SNAP: f32 = 1e-3;

/// Longest label kept on a node; longer labels are truncated.
const MAX_LABEL_CHARS: usize = 120;

/// Outcome of a texture delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The node now shows the delivered texture.
    Ready,
    /// Generation failed; the placeholder stays.
    Failed,
}

pub struct ConstellationRegistry {
    config: NodeConfig,
    nodes: SlotMap<NodeId, ConstellationNode>,
    order: Vec<NodeId>,
    textures: TextureBank,
    spawn_ordinal: usize,
}

impl ConstellationRegistry {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            nodes: SlotMap::with_key(),
            order: Vec::new(),
            textures: TextureBank::new(),
            spawn_ordinal: 0,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&ConstellationNode> {
        self.nodes.get(id)
    }

    /// Node ids in creation order.
    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &ConstellationNode> {
        self.order.iter().filter_map(|id| self.nodes.get(*id))
    }

    pub fn textures(&self) -> &TextureBank {
        &self.textures
    }

    /// Spawn a conversational node: spiral placement, then aging.
    pub fn spawn(&mut self, request: SpawnRequest, now: f64, rng: &mut impl Rng) -> Result<NodeId> {
        validate(&request)?;
        let position = request
            .position_hint
            .unwrap_or_else(|| spiral_position(self.spawn_ordinal, &self.config));
        self.spawn_ordinal += 1;

        let id = self.insert(request, position, now, rng);
        self.age();
        Ok(id)
    }

    /// Spawn a batch of background nodes over a Fibonacci sphere. Invalid
    /// requests are skipped and logged; background spawns do not age the
    /// constellation.
    pub fn spawn_background(
        &mut self,
        requests: Vec<SpawnRequest>,
        now: f64,
        rng: &mut impl Rng,
    ) -> Vec<NodeId> {
        let positions = fibonacci_sphere(requests.len(), self.config.background_radius);
        let mut ids = Vec::with_capacity(requests.len());
        for (request, position) in requests.into_iter().zip(positions) {
            if let Err(e) = validate(&request) {
                tracing::warn!("skipping background node: {e}");
                continue;
            }
            let position = request.position_hint.unwrap_or(position);
            ids.push(self.insert(request, position, now, rng));
        }
        ids
    }

    fn insert(
        &mut self,
        request: SpawnRequest,
        position: Vec3,
        now: f64,
        rng: &mut impl Rng,
    ) -> NodeId {
        let sprite = placeholder_sprite(request.zone, self.config.placeholder_size);
        let handle = self.textures.insert_image(sprite, TextureKind::Placeholder);

        let heading = rng.random_range(0.0..std::f32::consts::TAU);
        let climb = rng.random_range(-0.3..0.3);
        let velocity = Vec3::new(heading.cos(), climb, heading.sin()).normalize_or_zero()
            * self.config.drift_speed;

        let label = request
            .label
            .map(|l| l.chars().take(MAX_LABEL_CHARS).collect::<String>());
        let created_at = request.created_at.unwrap_or(now);
        let base_scale = self.config.base_scale;
        let bob_phase = rng.random_range(0.0..std::f32::consts::TAU);

        let id = self.nodes.insert_with_key(|id| ConstellationNode {
            id,
            position,
            velocity,
            current_scale: 0.0,
            target_scale: base_scale,
            opacity: 0.0,
            zone: request.zone,
            panel: request.panel,
            created_at,
            content: NodeContent::Placeholder(handle),
            label,
            source_text: request.source_text,
            user_input: request.user_input,
            bob_phase,
            arrived: false,
        });
        self.order.push(id);
        tracing::debug!(node = id.as_u64(), zone = request.zone.as_str(), "spawned node");
        id
    }

    /// Shrink every node except the newest `aging_exempt` by the aging
    /// factor. Targets that fall under the retirement scale snap to zero.
    pub fn age(&mut self) {
        let exempt = self.config.aging_exempt;
        if self.order.len() <= exempt {
            return;
        }
        let cutoff = self.order.len() - exempt;
        for id in &self.order[..cutoff] {
            if let Some(node) = self.nodes.get_mut(*id) {
                node.target_scale *= self.config.aging_factor;
                if node.target_scale < self.config.retire_scale {
                    node.target_scale = 0.0;
                }
            }
        }
    }

    /// Start a node's fade-out. It is removed once fully transparent.
    pub fn retire(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or(EngineError::UnknownNode(id))?;
        node.target_scale = 0.0;
        tracing::debug!(node = id.as_u64(), "retiring node");
        Ok(())
    }

    /// Swap a node's texture for a delivered one. The first real texture
    /// bumps the target scale to mark its arrival; later deliveries only swap.
    pub fn replace_texture(&mut self, id: NodeId, source: TextureSource) -> Result<Delivery> {
        let node = self.nodes.get_mut(id).ok_or(EngineError::UnknownNode(id))?;

        let content = match source {
            TextureSource::Failed(reason) => {
                tracing::warn!(node = id.as_u64(), "texture generation failed: {reason}");
                return Ok(Delivery::Failed);
            }
            TextureSource::Image(image) => {
                NodeContent::Image(self.textures.insert_image(image, TextureKind::Image))
            }
            TextureSource::Video(video) => NodeContent::Video {
                handle: self.textures.insert_video(&video),
                stream: VideoStream::new(video.duration),
            },
        };

        let old = std::mem::replace(&mut node.content, content);
        self.textures.release(old.handle());

        if !node.arrived && node.target_scale > 0.0 {
            node.target_scale = (node.target_scale * self.config.arrival_bump).min(self.config.max_scale);
        }
        node.arrived = true;
        Ok(Delivery::Ready)
    }

    /// Advance every node one frame and remove the ones that have fully
    /// faded. Returns the removed ids.
    pub fn tick(&mut self, dt: f32, time: f32) -> Vec<NodeId> {
        let c = &self.config;
        let mut expired = Vec::new();

        for node in self.nodes.values_mut() {
            node.current_scale += (node.target_scale - node.current_scale) * c.scale_ease;
            if node.target_scale == 0.0 && node.current_scale < SCALE_SNAP {
                node.current_scale = 0.0;
            }
            node.current_scale = node.current_scale.clamp(0.0, c.max_scale);

            if node.target_scale > 0.0 {
                if node.opacity < 1.0 {
                    node.opacity = (node.opacity + c.fade_in_step).min(1.0);
                }
            } else {
                node.opacity = (node.opacity - c.fade_out_step).max(0.0);
            }

            node.position += node.velocity * dt;
            node.position.y += (time * c.bob_speed + node.bob_phase).sin() * c.bob_amplitude;

            match &mut node.content {
                NodeContent::Video { stream, .. } => stream.advance(dt),
                NodeContent::Placeholder(_) | NodeContent::Image(_) => {}
            }

            if node.is_expired() {
                expired.push(node.id);
            }
        }

        for id in &expired {
            self.remove(*id);
        }
        expired
    }

    fn remove(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            self.textures.release(node.content.handle());
            self.order.retain(|o| *o != id);
            tracing::debug!(node = id.as_u64(), "removed node");
        }
    }

    /// Drop every node and texture. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.textures.clear();
    }
}

fn validate(request: &SpawnRequest) -> Result<()> {
    if let Some(hint) = request.position_hint
        && !hint.is_finite()
    {
        return Err(EngineError::InvalidSpawn(format!(
            "position hint is not finite: {hint:?}"
        )));
    }
    if let Some(t) = request.created_at
        && !t.is_finite()
    {
        return Err(EngineError::InvalidSpawn(format!(
            "created_at is not finite: {t}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FRAME_DT;
    use crate::zone::Zone;
    use image::RgbaImage;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn registry() -> ConstellationRegistry {
        ConstellationRegistry::new(NodeConfig::default())
    }

    fn spawn(reg: &mut ConstellationRegistry, zone: Zone, rng: &mut SmallRng) -> NodeId {
        reg.spawn(SpawnRequest::new(zone), 0.0, rng).unwrap()
    }

    fn run(reg: &mut ConstellationRegistry, frames: usize) -> Vec<NodeId> {
        let mut removed = Vec::new();
        for f in 0..frames {
            removed.extend(reg.tick(FRAME_DT, f as f32 * FRAME_DT));
        }
        removed
    }

    #[test]
    fn test_spawn_starts_invisible() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Family, &mut rng);
        let node = reg.get(id).unwrap();
        assert_eq!(node.current_scale, 0.0);
        assert_eq!(node.opacity, 0.0);
        assert_eq!(node.target_scale, NodeConfig::default().base_scale);
        assert!(node.content.is_placeholder());
        assert_eq!(reg.textures().live_count(), 1);
    }

    #[test]
    fn test_fade_in() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Family, &mut rng);
        run(&mut reg, 10);
        let node = reg.get(id).unwrap();
        assert!((node.opacity - 0.2).abs() < 1e-5);
        assert!(node.current_scale > 0.0 && node.current_scale < node.target_scale);
        run(&mut reg, 100);
        assert_eq!(reg.get(id).unwrap().opacity, 1.0);
    }

    #[test]
    fn test_scale_eases_exponentially() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Family, &mut rng);
        reg.tick(FRAME_DT, 0.0);
        let s1 = reg.get(id).unwrap().current_scale;
        reg.tick(FRAME_DT, 0.0);
        let s2 = reg.get(id).unwrap().current_scale;
        let target = NodeConfig::default().base_scale;
        assert!((s1 - target * 0.05).abs() < 1e-5);
        // Second step covers 5% of the remaining gap, not a fixed amount.
        assert!((s2 - s1 - (target - s1) * 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_small_registry_is_exempt_from_aging() {
        let mut rng = rng();
        let mut reg = registry();
        let ids: Vec<NodeId> = [Zone::Technology, Zone::Family, Zone::Projects]
            .into_iter()
            .map(|z| spawn(&mut reg, z, &mut rng))
            .collect();
        for id in ids {
            assert_eq!(reg.get(id).unwrap().target_scale, NodeConfig::default().base_scale);
        }
    }

    #[test]
    fn test_aging_spares_newest_four() {
        let mut rng = rng();
        let mut reg = registry();
        let ids: Vec<NodeId> = (0..6).map(|_| spawn(&mut reg, Zone::Family, &mut rng)).collect();
        let base = NodeConfig::default().base_scale;
        // Oldest saw two aging passes (spawns 5 and 6), second oldest one.
        assert!((reg.get(ids[0]).unwrap().target_scale - base * 0.7 * 0.7).abs() < 1e-5);
        assert!((reg.get(ids[1]).unwrap().target_scale - base * 0.7).abs() < 1e-5);
        for id in &ids[2..] {
            assert_eq!(reg.get(*id).unwrap().target_scale, base);
        }
    }

    #[test]
    fn test_aging_retires_and_removes() {
        let mut rng = rng();
        let mut reg = registry();
        let first = spawn(&mut reg, Zone::Family, &mut rng);
        run(&mut reg, 60);
        for _ in 0..12 {
            spawn(&mut reg, Zone::Family, &mut rng);
        }
        assert_eq!(reg.get(first).unwrap().target_scale, 0.0);
        let textures_before = reg.textures().live_count();
        let removed = run(&mut reg, 40);
        assert!(removed.contains(&first));
        assert!(!reg.contains(first));
        assert!(!reg.ids().contains(&first));
        assert!(reg.textures().live_count() < textures_before);
    }

    #[test]
    fn test_replace_texture_bumps_once() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Family, &mut rng);
        let base = NodeConfig::default().base_scale;

        let d = reg
            .replace_texture(id, TextureSource::Image(RgbaImage::new(8, 8)))
            .unwrap();
        assert_eq!(d, Delivery::Ready);
        let bumped = reg.get(id).unwrap().target_scale;
        assert!((bumped - base * 1.15).abs() < 1e-5);
        assert_eq!(reg.get(id).unwrap().content.kind(), TextureKind::Image);

        reg.replace_texture(id, TextureSource::Image(RgbaImage::new(8, 8)))
            .unwrap();
        assert_eq!(reg.get(id).unwrap().target_scale, bumped);
        // Old placeholder and first image were both released.
        assert_eq!(reg.textures().live_count(), 1);
    }

    #[test]
    fn test_failed_texture_keeps_placeholder() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Family, &mut rng);
        let d = reg
            .replace_texture(id, TextureSource::Failed("timeout".into()))
            .unwrap();
        assert_eq!(d, Delivery::Failed);
        let node = reg.get(id).unwrap();
        assert!(node.content.is_placeholder());
        assert!(!node.arrived);
        assert_eq!(node.target_scale, NodeConfig::default().base_scale);
    }

    #[test]
    fn test_replace_unknown_node() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Family, &mut rng);
        reg.clear();
        let err = reg
            .replace_texture(id, TextureSource::Image(RgbaImage::new(1, 1)))
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownNode(id));
    }

    #[test]
    fn test_video_node_advances() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Projects, &mut rng);
        reg.replace_texture(
            id,
            TextureSource::Video(crate::texture::VideoSource {
                uri: "v.mp4".into(),
                width: 64,
                height: 64,
                duration: 10.0,
            }),
        )
        .unwrap();
        run(&mut reg, 10);
        match &reg.get(id).unwrap().content {
            NodeContent::Video { stream, .. } => {
                assert!((stream.playhead - 10.0 * FRAME_DT).abs() < 1e-4)
            }
            other => panic!("expected video, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_hint_rejected() {
        let mut rng = rng();
        let mut reg = registry();
        let req = SpawnRequest::new(Zone::Family).at(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(matches!(
            reg.spawn(req, 0.0, &mut rng),
            Err(EngineError::InvalidSpawn(_))
        ));
        assert!(reg.is_empty());
        assert_eq!(reg.textures().live_count(), 0);
    }

    #[test]
    fn test_position_hint_used() {
        let mut rng = rng();
        let mut reg = registry();
        let p = Vec3::new(1.0, 2.0, 3.0);
        let id = reg.spawn(SpawnRequest::new(Zone::Family).at(p), 0.0, &mut rng).unwrap();
        assert_eq!(reg.get(id).unwrap().position, p);
    }

    #[test]
    fn test_background_does_not_age() {
        let mut rng = rng();
        let mut reg = registry();
        let requests = (0..10).map(|_| SpawnRequest::new(Zone::Ambient)).collect();
        let ids = reg.spawn_background(requests, 0.0, &mut rng);
        assert_eq!(ids.len(), 10);
        let base = NodeConfig::default().base_scale;
        assert!(reg.iter().all(|n| n.target_scale == base));
        let radius = NodeConfig::default().background_radius;
        for id in ids {
            assert!((reg.get(id).unwrap().position.length() - radius).abs() < 1e-2);
        }
    }

    #[test]
    fn test_retire_fades_then_removes() {
        let mut rng = rng();
        let mut reg = registry();
        let id = spawn(&mut reg, Zone::Family, &mut rng);
        run(&mut reg, 60);
        reg.retire(id).unwrap();
        let removed = run(&mut reg, 10);
        assert!(removed.is_empty(), "still fading");
        assert!(reg.get(id).unwrap().opacity > 0.0);
        let removed = run(&mut reg, 20);
        assert_eq!(removed, vec![id]);
        assert_eq!(reg.retire(id), Err(EngineError::UnknownNode(id)));
    }

    #[test]
    fn test_label_truncated() {
        let mut rng = rng();
        let mut reg = registry();
        let long = "x".repeat(500);
        let id = reg
            .spawn(SpawnRequest::new(Zone::Family).with_label(&long), 0.0, &mut rng)
            .unwrap();
        assert_eq!(reg.get(id).unwrap().label.as_ref().unwrap().len(), MAX_LABEL_CHARS);
    }
}
