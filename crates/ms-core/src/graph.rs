//! Relationship graph between constellation nodes.
//!
//! Rebuilt from scratch every frame: score every visible pair, keep those
//! above the strength threshold, sort strongest first and write the top-K
//! into a fixed-capacity line buffer. Unused slots are zeroed so the
//! renderer can upload the whole buffer unconditionally.

use glam::Vec3;

use crate::config::ConnectionConfig;
use crate::node::{ConstellationNode, NodeId};
use crate::registry::ConstellationRegistry;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionEdge {
    pub a: NodeId,
    pub b: NodeId,
    pub strength: f32,
}

/// Temporal affinity: larger bonus for pairs created close together.
pub fn temporal_bonus(a: &ConstellationNode, b: &ConstellationNode, c: &ConnectionConfig) -> f32 {
    let dt = (a.created_at - b.created_at).abs();
    if dt < c.temporal_near_seconds {
        c.temporal_near_bonus
    } else if dt < c.temporal_far_seconds {
        c.temporal_far_bonus
    } else {
        0.0
    }
}

/// Spatial affinity from the current (drifted) distance.
pub fn spatial_bonus(distance: f32, c: &ConnectionConfig) -> f32 {
    if distance < c.spatial_near_distance {
        c.spatial_near_bonus
    } else if distance < c.spatial_far_distance {
        c.spatial_far_bonus
    } else {
        0.0
    }
}

/// Pair strength in [0, 1].
pub fn connection_strength(
    a: &ConstellationNode,
    b: &ConstellationNode,
    c: &ConnectionConfig,
) -> f32 {
    let mut s = 0.0;
    if a.zone == b.zone {
        s += c.w_same_zone;
    }
    if let (Some(pa), Some(pb)) = (&a.panel, &b.panel)
        && pa == pb
    {
        s += c.w_same_panel;
    }
    s += temporal_bonus(a, b, c);
    s += spatial_bonus(a.position.distance(b.position), c);
    s.min(1.0)
}

pub struct ConnectionGraph {
    config: ConnectionConfig,
    edges: Vec<ConnectionEdge>,
    /// Two endpoints per slot, `capacity` slots.
    segments: Vec<[Vec3; 2]>,
    line_opacity: f32,
}

impl ConnectionGraph {
    pub fn new(config: ConnectionConfig) -> Self {
        let capacity = config.capacity;
        Self {
            config,
            edges: Vec::with_capacity(capacity),
            segments: vec![[Vec3::ZERO; 2]; capacity],
            line_opacity: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.segments.len()
    }

    /// Edges written this frame, strongest first.
    pub fn edges(&self) -> &[ConnectionEdge] {
        &self.edges
    }

    /// The full line buffer, including zeroed unused slots.
    pub fn segments(&self) -> &[[Vec3; 2]] {
        &self.segments
    }

    pub fn line_opacity(&self) -> f32 {
        self.line_opacity
    }

    pub fn recompute(&mut self, registry: &ConstellationRegistry, time: f32) {
        let c = &self.config;
        let visible: Vec<&ConstellationNode> = registry
            .iter()
            .filter(|n| n.is_visible(c.visibility_threshold))
            .collect();

        self.edges.clear();
        for (i, a) in visible.iter().enumerate() {
            for b in &visible[i + 1..] {
                if a.position.distance(b.position) > c.max_distance {
                    continue;
                }
                let strength = connection_strength(a, b, c);
                if strength > c.strength_threshold {
                    self.edges.push(ConnectionEdge {
                        a: a.id,
                        b: b.id,
                        strength,
                    });
                }
            }
        }

        self.edges.sort_by(|x, y| y.strength.total_cmp(&x.strength));
        self.edges.truncate(self.segments.len());

        for (slot, segment) in self.segments.iter_mut().enumerate() {
            *segment = match self.edges.get(slot) {
                Some(edge) => match (registry.get(edge.a), registry.get(edge.b)) {
                    (Some(a), Some(b)) => [a.position, b.position],
                    _ => [Vec3::ZERO; 2],
                },
                None => [Vec3::ZERO; 2],
            };
        }

        self.line_opacity =
            (c.base_opacity + c.pulse_depth * (time * c.pulse_speed).sin()).clamp(0.0, 1.0);
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.segments.fill([Vec3::ZERO; 2]);
    }
}
