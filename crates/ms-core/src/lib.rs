//! Mindscape visualization core.
//!
//! A dense ambient particle field overlaid with a constellation of
//! image-bearing nodes, joined by a pulsing relationship graph and watched by
//! a camera that tours new content or yields to manual control. The
//! [`Mindscape`] orchestrator advances everything one fixed 16 ms step per
//! tick.
//!
//! Zero I/O: pure simulation with no opinions about rendering, transport or
//! persistence.

pub mod camera;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod frame;
pub mod graph;
pub mod node;
pub mod noise;
pub mod particles;
pub mod placement;
pub mod raster;
pub mod registry;
pub mod texture;
pub mod time;
pub mod zone;

pub use camera::{CameraController, CameraDirection, CameraMode};
pub use config::{
    CameraConfig, ConnectionConfig, EngineConfig, NodeConfig, ParticleConfig, TextConfig,
};
pub use constants::{FRAME_DT, GOLDEN_ANGLE, PHI};
pub use engine::{EngineEvent, Mindscape, TextureSender};
pub use error::{EngineError, Result};
pub use frame::{
    CURRENT_VERSION, CameraPose, FrameSink, FrameSnapshot, FrameStats, FrameView, NodeBillboard,
    export_json, import_json,
};
pub use graph::{ConnectionEdge, ConnectionGraph, connection_strength};
pub use node::{ConstellationNode, NodeContent, NodeId, SpawnRequest, VideoStream};
pub use noise::NoiseField;
pub use particles::{Particle, ParticleField, Ripple};
pub use raster::{TextRasterizer, formation_text};
pub use registry::{ConstellationRegistry, Delivery};
pub use texture::{TextureBank, TextureHandle, TextureKind, TextureSource, VideoSource};
pub use zone::{Framing, Zone, ZoneState};
