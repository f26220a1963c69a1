//! Replays a script against the engine.
//!
//! The driver plays every external collaborator at once: it fires scripted
//! events when the engine clock reaches them, and stands in for the image
//! pipeline by painting artwork on tokio's blocking pool and handing it back
//! through the engine's `TextureSender`.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use ms_core::{
    CameraMode, EngineEvent, FrameStats, Mindscape, NodeId, SpawnRequest, TextureSource, Zone,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use crate::script::{Action, Script};

const ARTWORK_SIZE: u32 = 128;

pub struct RunOptions {
    pub frames: u64,
    /// Pace frames at 16 ms instead of running flat out.
    pub realtime: bool,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub stats: FrameStats,
    pub spawned: usize,
    pub textures_ready: usize,
    pub textures_failed: usize,
    pub removed: usize,
    pub mode_changes: usize,
    pub clicks: usize,
    pub hits: usize,
}

struct Pending {
    due: f64,
    id: NodeId,
    label: String,
    zone: Zone,
    fail: bool,
}

struct Session<'a> {
    engine: &'a mut Mindscape,
    labels: HashMap<String, NodeId>,
    pending: Vec<Pending>,
    in_flight: Vec<JoinHandle<bool>>,
    summary: Summary,
}

pub async fn run(engine: &mut Mindscape, script: &Script, opts: RunOptions) -> Result<Summary> {
    let mut session = Session {
        engine,
        labels: HashMap::new(),
        pending: Vec::new(),
        in_flight: Vec::new(),
        summary: Summary::default(),
    };

    let mut interval = tokio::time::interval(Duration::from_millis(16));

    let mut next = 0;
    for _ in 0..opts.frames {
        if opts.realtime {
            interval.tick().await;
        }

        let now = session.engine.clock();
        while let Some(event) = script.events.get(next)
            && event.at <= now + 1e-9
        {
            session.apply(&event.action);
            next += 1;
        }
        session.generate_due(now, opts.realtime).await?;

        session.engine.tick_and_submit(&mut session.summary.stats);
        session.count_events();
    }

    for handle in session.in_flight.drain(..) {
        handle.await.context("artwork task panicked")?;
    }
    let late = session.engine.flush_textures();
    if late > 0 {
        tracing::debug!(late, "applied deliveries that landed after the last frame");
    }
    session.count_events();
    Ok(session.summary)
}

impl Session<'_> {
    fn apply(&mut self, action: &Action) {
        tracing::debug!(?action, clock = self.engine.clock(), "script event");
        match action {
            Action::Zone { zone } => self.engine.set_active_zone(Zone::from_str_lossy(zone)),
            Action::Spawn {
                label,
                zone,
                panel,
                texture_after,
                fail,
            } => {
                let zone = zone.as_deref().map(Zone::from_str_lossy).unwrap_or_default();
                let request = SpawnRequest {
                    label: label.clone(),
                    zone,
                    panel: panel.clone(),
                    ..SpawnRequest::default()
                };
                match self.engine.spawn_node(request) {
                    Ok(id) => {
                        let label = label.clone().unwrap_or_else(|| format!("node-{}", id.as_u64()));
                        self.labels.insert(label.clone(), id);
                        if let Some(after) = texture_after {
                            self.pending.push(Pending {
                                due: self.engine.clock() + after.max(0.0),
                                id,
                                label,
                                zone,
                                fail: *fail,
                            });
                        }
                    }
                    Err(e) => tracing::warn!("spawn rejected: {e}"),
                }
            }
            Action::Background { count, zone } => {
                let zone = zone.as_deref().map(Zone::from_str_lossy).unwrap_or_default();
                self.engine
                    .spawn_background(vec![SpawnRequest::new(zone); *count]);
            }
            Action::Text { text } => {
                let points = self.engine.request_text_formation(text);
                tracing::debug!(points, "formation requested");
            }
            Action::Manual { on } => self.engine.set_manual_control(*on),
            Action::Move { direction } => self.engine.move_camera(*direction),
            Action::Orbit { dx, dy } => self.engine.orbit_camera(*dx, *dy),
            Action::Zoom { delta } => self.engine.zoom_camera(*delta),
            Action::Resume => self.engine.resume_autopilot(),
            Action::Ripple { x, z } => self.engine.trigger_ripple(Vec3::new(*x, 0.0, *z)),
            Action::Voice { level } => {
                self.engine.voice_amplitude(*level);
            }
            Action::Click { x, y } => {
                self.summary.clicks += 1;
                if let Some(id) = self.engine.hit_test(*x, *y) {
                    self.summary.hits += 1;
                    let label = self
                        .engine
                        .registry()
                        .get(id)
                        .and_then(|n| n.label.clone())
                        .unwrap_or_default();
                    tracing::info!(node = id.as_u64(), label = %label, "click hit");
                }
            }
            Action::Resize { width, height } => self.engine.resize(*width, *height),
            Action::Retire { label } => match self.labels.get(label) {
                Some(id) => {
                    if let Err(e) = self.engine.retire_node(*id) {
                        tracing::warn!("cannot retire {label}: {e}");
                    }
                }
                None => tracing::warn!("retire: no node labelled {label}"),
            },
        }
    }

    /// Start generation for every delivery that has come due. Batch runs wait
    /// for each result so replays are reproducible; realtime runs let them
    /// land whenever they finish.
    async fn generate_due(&mut self, now: f64, realtime: bool) -> Result<()> {
        let (due, waiting): (Vec<Pending>, Vec<Pending>) =
            std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|p| p.due <= now + 1e-9);
        self.pending = waiting;

        for job in due {
            let sender = self.engine.texture_sender();
            let handle = tokio::task::spawn_blocking(move || {
                let source = if job.fail {
                    TextureSource::Failed("simulated generation failure".to_string())
                } else {
                    TextureSource::Image(artwork(&job.label, job.zone, ARTWORK_SIZE))
                };
                sender.send(job.id, source)
            });
            if realtime {
                self.in_flight.push(handle);
            } else {
                handle.await.context("artwork task panicked")?;
            }
        }
        Ok(())
    }

    fn count_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                EngineEvent::Spawned { .. } => self.summary.spawned += 1,
                EngineEvent::TextureReady { .. } => self.summary.textures_ready += 1,
                EngineEvent::TextureFailed { .. } => self.summary.textures_failed += 1,
                EngineEvent::Removed { .. } => self.summary.removed += 1,
                EngineEvent::CameraModeChanged { mode } => {
                    self.summary.mode_changes += 1;
                    if mode == CameraMode::Manual {
                        tracing::debug!("camera under manual control");
                    }
                }
            }
        }
    }
}

/// Stand-in artwork: a zone-tinted gradient with a few label-seeded blobs.
pub fn artwork(label: &str, zone: Zone, size: u32) -> RgbaImage {
    let mut hasher = DefaultHasher::new();
    label.hash(&mut hasher);
    let mut rng = SmallRng::seed_from_u64(hasher.finish());

    let base = zone.color();
    let accent = Vec3::new(rng.random(), rng.random(), rng.random());
    let extent = size as f32;
    let blobs: Vec<(Vec2, f32)> = (0..5)
        .map(|_| {
            let center = Vec2::new(rng.random_range(0.0..extent), rng.random_range(0.0..extent));
            (center, rng.random_range(extent * 0.1..extent * 0.3))
        })
        .collect();

    RgbaImage::from_fn(size, size, |x, y| {
        let p = Vec2::new(x as f32, y as f32);
        let mut c = base.lerp(accent, 0.5 * y as f32 / extent);
        for (center, radius) in &blobs {
            if p.distance(*center) < *radius {
                c = c.lerp(accent, 0.6);
            }
        }
        let c = c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
        Rgba([c.x as u8, c.y as u8, c.z as u8, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_core::{EngineConfig, ParticleConfig, TextureKind};

    fn engine() -> Mindscape {
        Mindscape::new(EngineConfig {
            seed: Some(3),
            particles: ParticleConfig {
                count: 200,
                ..ParticleConfig::default()
            },
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn opts(frames: u64) -> RunOptions {
        RunOptions {
            frames,
            realtime: false,
        }
    }

    #[test]
    fn test_artwork_is_deterministic() {
        let a = artwork("dog", Zone::Family, 32);
        let b = artwork("dog", Zone::Family, 32);
        let c = artwork("cat", Zone::Family, 32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.dimensions(), (32, 32));
    }

    #[tokio::test]
    async fn test_spawn_then_texture_arrives() {
        let script = Script::parse(
            r#"{"events": [
                {"at": 0, "kind": "spawn", "label": "dog", "zone": "family", "texture_after": 0.5}
            ]}"#,
        )
        .unwrap();
        let mut e = engine();
        let summary = run(&mut e, &script, opts(60)).await.unwrap();
        assert_eq!(summary.spawned, 1);
        assert_eq!(summary.textures_ready, 1);
        let node = e.registry().iter().next().unwrap();
        assert_eq!(node.content.kind(), TextureKind::Image);
        assert_eq!(summary.stats.frames, 60);
    }

    #[tokio::test]
    async fn test_realtime_keeps_late_deliveries() {
        let script = Script::parse(
            r#"{"events": [
                {"at": 0, "kind": "spawn", "label": "late", "texture_after": 0}
            ]}"#,
        )
        .unwrap();
        let mut e = engine();
        let summary = run(
            &mut e,
            &script,
            RunOptions {
                frames: 1,
                realtime: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.textures_ready, 1);
        assert_eq!(e.frame(), 1);
        let node = e.registry().iter().next().unwrap();
        assert_eq!(node.content.kind(), TextureKind::Image);
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_placeholder() {
        let script = Script::parse(
            r#"{"events": [
                {"at": 0, "kind": "spawn", "label": "x", "texture_after": 0.1, "fail": true}
            ]}"#,
        )
        .unwrap();
        let mut e = engine();
        let summary = run(&mut e, &script, opts(30)).await.unwrap();
        assert_eq!(summary.textures_failed, 1);
        assert_eq!(summary.textures_ready, 0);
        assert!(e.registry().iter().next().unwrap().content.is_placeholder());
    }

    #[tokio::test]
    async fn test_manual_and_resume() {
        let script = Script::parse(
            r#"{"events": [
                {"at": 0, "kind": "spawn", "label": "a"},
                {"at": 0.2, "kind": "orbit", "dx": 0.5, "dy": 0.1},
                {"at": 0.4, "kind": "resume"}
            ]}"#,
        )
        .unwrap();
        let mut e = engine();
        let summary = run(&mut e, &script, opts(40)).await.unwrap();
        // FocusTour, Manual, FocusTour
        assert_eq!(summary.mode_changes, 3);
        assert_eq!(e.camera_mode(), CameraMode::FocusTour);
    }

    #[tokio::test]
    async fn test_retire_by_label() {
        let script = Script::parse(
            r#"{"events": [
                {"at": 0, "kind": "spawn", "label": "gone"},
                {"at": 1.0, "kind": "retire", "label": "gone"},
                {"at": 1.0, "kind": "retire", "label": "missing"}
            ]}"#,
        )
        .unwrap();
        let mut e = engine();
        let summary = run(&mut e, &script, opts(150)).await.unwrap();
        assert_eq!(summary.removed, 1);
        assert!(e.registry().is_empty());
    }
}
