//! The orchestrator.
//!
//! `Mindscape` owns every subsystem and advances them in a fixed order each
//! tick: drain the texture inbox, zone and formation timers, particles,
//! nodes, connections, camera. All mutation happens on the thread that owns
//! the engine; other threads reach it only through [`TextureSender`].

use std::sync::mpsc::{self, Receiver, Sender};

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::camera::{CameraController, CameraDirection, CameraMode};
use crate::config::EngineConfig;
use crate::constants::FRAME_DT;
use crate::error::{EngineError, Result};
use crate::frame::{
    CURRENT_VERSION, CameraPose, EdgeSnapshot, FrameSink, FrameSnapshot, FrameView,
    NodeBillboard, NodeSnapshot,
};
use crate::graph::ConnectionGraph;
use crate::node::{NodeId, SpawnRequest};
use crate::noise::NoiseField;
use crate::particles::ParticleField;
use crate::raster::{TextRasterizer, formation_text};
use crate::registry::{ConstellationRegistry, Delivery};
use crate::texture::{TextureKind, TextureSource};
use crate::time::now_iso8601;
use crate::zone::{Zone, ZoneState};

/// Lifecycle notifications for the host UI.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    Spawned { id: NodeId, zone: Zone },
    TextureReady { id: NodeId, kind: TextureKind },
    TextureFailed { id: NodeId, reason: String },
    Removed { id: NodeId },
    CameraModeChanged { mode: CameraMode },
}

/// Cloneable handle for delivering textures from other threads or tasks.
/// Deliveries are applied at the start of the next tick.
#[derive(Clone, Debug)]
pub struct TextureSender {
    tx: Sender<(NodeId, TextureSource)>,
}

impl TextureSender {
    /// Queue a delivery. Returns `false` if the engine has been dropped.
    pub fn send(&self, id: NodeId, source: TextureSource) -> bool {
        self.tx.send((id, source)).is_ok()
    }
}

pub struct Mindscape {
    config: EngineConfig,
    rng: SmallRng,
    zone: ZoneState,
    particles: ParticleField,
    registry: ConstellationRegistry,
    graph: ConnectionGraph,
    camera: CameraController,
    rasterizer: TextRasterizer,
    /// Seconds left before an active text formation clears itself.
    formation_timer: f32,
    inbox_tx: Sender<(NodeId, TextureSource)>,
    inbox_rx: Receiver<(NodeId, TextureSource)>,
    events: Vec<EngineEvent>,
    frame: u64,
    clock: f64,
    disposed: bool,
}

impl Mindscape {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let zone = ZoneState::default();
        let noise = config.particles.terrain.then(|| NoiseField::new(&mut rng));
        let particles = ParticleField::new(
            config.particles.clone(),
            noise.as_ref(),
            zone.target_color(),
            &mut rng,
        );
        let registry = ConstellationRegistry::new(config.nodes.clone());
        let graph = ConnectionGraph::new(config.connections.clone());
        let camera = CameraController::new(config.camera.clone(), zone.framing);
        let rasterizer = TextRasterizer::new(config.text.clone());
        let (inbox_tx, inbox_rx) = mpsc::channel();

        tracing::info!(
            particles = particles.len(),
            capacity = graph.capacity(),
            seed = ?config.seed,
            "mindscape ready"
        );

        Ok(Self {
            config,
            rng,
            zone,
            particles,
            registry,
            graph,
            camera,
            rasterizer,
            formation_timer: 0.0,
            inbox_tx,
            inbox_rx,
            events: Vec::new(),
            frame: 0,
            clock: 0.0,
            disposed: false,
        })
    }

    // --- Accessors ---

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn zone(&self) -> &ZoneState {
        &self.zone
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn registry(&self) -> &ConstellationRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera.mode()
    }

    pub fn formation_progress(&self) -> f32 {
        self.particles.progress()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulation seconds elapsed, in fixed frame steps.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn texture_sender(&self) -> TextureSender {
        TextureSender {
            tx: self.inbox_tx.clone(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn live(&self, op: &str) -> bool {
        if self.disposed {
            tracing::debug!("{op} ignored after dispose");
        }
        !self.disposed
    }

    fn mode_event(&mut self, changed: Option<CameraMode>) {
        if let Some(mode) = changed {
            self.events.push(EngineEvent::CameraModeChanged { mode });
        }
    }

    // --- Collaborator inputs ---

    pub fn set_active_zone(&mut self, zone: Zone) {
        if !self.live("set_active_zone") || self.zone.active == zone {
            return;
        }
        tracing::info!(zone = zone.as_str(), "active zone");
        self.zone.set_active(zone);
    }

    /// Start forming `text` out of particles. Returns the number of target
    /// points; zero means nothing could be drawn and the call was a no-op.
    pub fn request_text_formation(&mut self, text: &str) -> usize {
        if !self.live("request_text_formation") {
            return 0;
        }
        let text = formation_text(text);
        let points = self.rasterizer.rasterize(&text, &mut self.rng);
        if points.is_empty() {
            return 0;
        }
        let count = points.len();
        tracing::debug!(text = %text, points = count, "text formation");
        self.particles.set_targets(points);
        self.particles.set_formation(true);
        self.formation_timer = self.config.text.formation_seconds;
        count
    }

    pub fn spawn_node(&mut self, request: SpawnRequest) -> Result<NodeId> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        let zone = request.zone;
        let id = self.registry.spawn(request, self.clock, &mut self.rng)?;
        self.events.push(EngineEvent::Spawned { id, zone });
        if self.config.camera.tour {
            let changed = self.camera.enqueue(id);
            self.mode_event(changed);
        }
        Ok(id)
    }

    /// Bulk import onto the background sphere. Never touches the tour.
    pub fn spawn_background(&mut self, requests: Vec<SpawnRequest>) -> Vec<NodeId> {
        if !self.live("spawn_background") {
            return Vec::new();
        }
        let requested = requests.len();
        let ids = self
            .registry
            .spawn_background(requests, self.clock, &mut self.rng);
        for &id in &ids {
            let zone = self.registry.get(id).map(|n| n.zone).unwrap_or_default();
            self.events.push(EngineEvent::Spawned { id, zone });
        }
        tracing::info!(requested, spawned = ids.len(), "background import");
        ids
    }

    /// Dismiss a node. It fades out and is removed by a later tick.
    pub fn retire_node(&mut self, id: NodeId) -> Result<()> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        self.registry.retire(id)
    }

    /// Apply a texture delivery immediately. Prefer [`TextureSender`] from
    /// other threads.
    pub fn replace_texture(&mut self, id: NodeId, source: TextureSource) -> Result<Delivery> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        let reason = match &source {
            TextureSource::Failed(reason) => Some(reason.clone()),
            TextureSource::Image(_) | TextureSource::Video(_) => None,
        };
        let delivery = self.registry.replace_texture(id, source)?;
        let event = match (delivery, reason) {
            (Delivery::Failed, reason) => EngineEvent::TextureFailed {
                id,
                reason: reason.unwrap_or_default(),
            },
            (Delivery::Ready, _) => EngineEvent::TextureReady {
                id,
                kind: self
                    .registry
                    .get(id)
                    .map(|n| n.content.kind())
                    .unwrap_or(TextureKind::Image),
            },
        };
        self.events.push(event);
        Ok(delivery)
    }

    pub fn trigger_ripple(&mut self, origin: Vec3) {
        if self.live("trigger_ripple") {
            self.particles.trigger_ripple(origin);
        }
    }

    /// Feed a voice level sample; loud spikes restart the ripple at the origin.
    pub fn voice_amplitude(&mut self, level: f32) -> bool {
        self.live("voice_amplitude") && self.particles.voice_amplitude(level, Vec3::ZERO)
    }

    // --- Camera input ---

    pub fn set_manual_control(&mut self, manual: bool) {
        if self.live("set_manual_control") {
            let changed = self.camera.set_manual(manual);
            self.mode_event(changed);
        }
    }

    pub fn resume_autopilot(&mut self) {
        if self.live("resume_autopilot") {
            let changed = self.camera.resume();
            self.mode_event(changed);
        }
    }

    pub fn orbit_camera(&mut self, dx: f32, dy: f32) {
        if self.live("orbit_camera") {
            let changed = self.camera.orbit(dx, dy);
            self.mode_event(changed);
        }
    }

    pub fn zoom_camera(&mut self, delta: f32) {
        if self.live("zoom_camera") {
            let changed = self.camera.zoom(delta);
            self.mode_event(changed);
        }
    }

    pub fn move_camera(&mut self, direction: CameraDirection) {
        if self.live("move_camera") {
            let changed = self.camera.move_direction(direction);
            self.mode_event(changed);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.live("resize") && self.camera.resize(width, height) {
            tracing::debug!(width, height, "viewport resized");
        }
    }

    pub fn hit_test(&self, x: f32, y: f32) -> Option<NodeId> {
        if self.disposed {
            return None;
        }
        self.camera.hit_test(
            &self.registry,
            x,
            y,
            self.config.connections.visibility_threshold,
        )
    }

    // --- Frame loop ---

    /// Apply every queued texture delivery now, without advancing a frame.
    /// Hosts call this at shutdown so late deliveries are not lost.
    /// Returns how many deliveries were taken from the inbox.
    pub fn flush_textures(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.drain_inbox()
    }

    fn drain_inbox(&mut self) -> usize {
        let mut taken = 0;
        while let Ok((id, source)) = self.inbox_rx.try_recv() {
            taken += 1;
            match self.replace_texture(id, source) {
                Ok(_) => {}
                Err(EngineError::UnknownNode(_)) => {
                    tracing::debug!(node = id.as_u64(), "texture arrived for removed node");
                }
                Err(e) => tracing::warn!("texture delivery dropped: {e}"),
            }
        }
        taken
    }

    /// Advance the simulation one fixed step.
    pub fn tick(&mut self) {
        if self.disposed {
            return;
        }
        self.drain_inbox();

        if self.formation_timer > 0.0 {
            self.formation_timer -= FRAME_DT;
            if self.formation_timer <= 0.0 {
                self.formation_timer = 0.0;
                self.particles.set_formation(false);
            }
        }
        self.zone.advance();

        let time = self.clock as f32;
        self.particles.update(time, self.zone.target_color());

        for id in self.registry.tick(FRAME_DT, time) {
            self.events.push(EngineEvent::Removed { id });
        }

        self.graph.recompute(&self.registry, time);

        let changed = self.camera.update(&self.registry, self.zone.framing, FRAME_DT);
        self.mode_event(changed);

        self.frame += 1;
        self.clock += FRAME_DT as f64;
    }

    pub fn tick_and_submit(&mut self, sink: &mut impl FrameSink) {
        if self.disposed {
            return;
        }
        self.tick();
        sink.submit(&self.frame_view());
    }

    pub fn frame_view(&self) -> FrameView<'_> {
        let time = self.clock as f32;
        let nodes = self
            .registry
            .iter()
            .map(|n| NodeBillboard {
                id: n.id.as_u64(),
                position: n.position,
                scale: n.display_scale(time),
                opacity: n.opacity,
                zone: n.zone,
                kind: n.content.kind(),
                texture: n.content.handle(),
            })
            .collect();
        FrameView {
            frame: self.frame,
            clock: self.clock,
            particle_positions: self.particles.positions(),
            particles: self.particles.particles(),
            nodes,
            line_segments: self.graph.segments(),
            line_count: self.graph.edges().len(),
            line_opacity: self.graph.line_opacity(),
            camera: self.camera_pose(),
            view_projection: self.camera.view_projection(),
        }
    }

    fn camera_pose(&self) -> CameraPose {
        CameraPose {
            position: self.camera.position(),
            look_at: self.camera.look_at(),
            mode: self.camera.mode(),
        }
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let nodes = self
            .registry
            .iter()
            .map(|n| NodeSnapshot {
                id: n.id.as_u64(),
                position: n.position,
                scale: n.current_scale,
                target_scale: n.target_scale,
                opacity: n.opacity,
                zone: n.zone,
                content: n.content.kind(),
                created_at: n.created_at,
                panel: n.panel.clone(),
                label: n.label.clone(),
            })
            .collect();
        let edges = self
            .graph
            .edges()
            .iter()
            .map(|e| EdgeSnapshot {
                a: e.a.as_u64(),
                b: e.b.as_u64(),
                strength: e.strength,
            })
            .collect();
        FrameSnapshot {
            version: CURRENT_VERSION.to_string(),
            timestamp: now_iso8601(),
            frame: self.frame,
            clock: self.clock,
            camera: self.camera_pose(),
            zone: self.zone.active,
            formation_progress: self.particles.progress(),
            particle_count: self.particles.len(),
            nodes,
            edges,
        }
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(crate::frame::export_json(&self.snapshot())?)
    }

    /// Release every node and texture and stop ticking. Safe to call twice.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.registry.clear();
        self.graph.clear();
        while self.inbox_rx.try_recv().is_ok() {}
        self.disposed = true;
        tracing::info!(frames = self.frame, "mindscape disposed");
    }
}
