use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::COLOR_SMOOTHING;

/// Coarse topic classification set by the conversation classifier.
/// Drives the particle palette and the ambient camera framing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Technology,
    Family,
    Consciousness,
    Projects,
    #[default]
    Ambient,
}

/// Ambient camera framing: orbit distance from the origin and eye height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Framing {
    pub distance: f32,
    pub height: f32,
}

impl Framing {
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            distance: self.distance + (other.distance - self.distance) * t,
            height: self.height + (other.height - self.height) * t,
        }
    }
}

impl Zone {
    pub const ALL: [Zone; 5] = [
        Zone::Technology,
        Zone::Family,
        Zone::Consciousness,
        Zone::Projects,
        Zone::Ambient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Family => "family",
            Self::Consciousness => "consciousness",
            Self::Projects => "projects",
            Self::Ambient => "ambient",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "technology" => Self::Technology,
            "family" => Self::Family,
            "consciousness" => Self::Consciousness,
            "projects" => Self::Projects,
            _ => Self::Ambient,
        }
    }

    /// Target particle colour (linear RGB, 0..1).
    pub fn color(&self) -> Vec3 {
        match self {
            Self::Technology => Vec3::new(0.20, 0.60, 1.00),
            Self::Family => Vec3::new(1.00, 0.62, 0.30),
            Self::Consciousness => Vec3::new(0.66, 0.36, 1.00),
            Self::Projects => Vec3::new(0.26, 0.90, 0.55),
            Self::Ambient => Vec3::new(0.55, 0.60, 0.75),
        }
    }

    /// Inner and outer colours of the placeholder radial gradient.
    pub fn placeholder_palette(&self) -> (Vec3, Vec3) {
        let c = self.color();
        (c.lerp(Vec3::ONE, 0.6), c * 0.25)
    }

    pub fn framing(&self) -> Framing {
        match self {
            Self::Technology => Framing { distance: 90.0, height: 25.0 },
            Self::Family => Framing { distance: 60.0, height: 12.0 },
            Self::Consciousness => Framing { distance: 120.0, height: 45.0 },
            Self::Projects => Framing { distance: 75.0, height: 20.0 },
            Self::Ambient => Framing { distance: 100.0, height: 30.0 },
        }
    }
}

/// The externally injected zone configuration, read once per tick.
///
/// `active` is what the classifier last reported and sets the particle
/// colour target directly. `framing` is the current camera framing, easing
/// toward the active zone every tick.
#[derive(Clone, Copy, Debug)]
pub struct ZoneState {
    pub active: Zone,
    pub framing: Framing,
}

impl ZoneState {
    pub fn new(zone: Zone) -> Self {
        Self {
            active: zone,
            framing: zone.framing(),
        }
    }

    pub fn set_active(&mut self, zone: Zone) {
        self.active = zone;
    }

    /// Target particle colour for this tick.
    pub fn target_color(&self) -> Vec3 {
        self.active.color()
    }

    /// Ease the current framing toward the active zone.
    pub fn advance(&mut self) {
        self.framing = self.framing.lerp(self.active.framing(), COLOR_SMOOTHING);
    }
}

impl Default for ZoneState {
    fn default() -> Self {
        Self::new(Zone::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossy_parse() {
        assert_eq!(Zone::from_str_lossy("Family"), Zone::Family);
        assert_eq!(Zone::from_str_lossy(" projects "), Zone::Projects);
        assert_eq!(Zone::from_str_lossy("cooking"), Zone::Ambient);
        for z in Zone::ALL {
            assert_eq!(Zone::from_str_lossy(z.as_str()), z);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Zone::Consciousness).unwrap();
        assert_eq!(json, "\"consciousness\"");
        let z: Zone = serde_json::from_str("\"technology\"").unwrap();
        assert_eq!(z, Zone::Technology);
    }

    #[test]
    fn test_state_eases_toward_active() {
        let mut state = ZoneState::new(Zone::Family);
        state.set_active(Zone::Technology);
        assert_eq!(state.target_color(), Zone::Technology.color());

        let target = Zone::Technology.framing();
        let before = (state.framing.distance - target.distance).abs();
        state.advance();
        let after = (state.framing.distance - target.distance).abs();
        assert!(after < before);
        // Asymptotic: one step covers exactly the smoothing fraction.
        assert!((after - before * (1.0 - COLOR_SMOOTHING)).abs() < 1e-3);
    }

    #[test]
    fn test_palette_inner_brighter_than_outer() {
        for z in Zone::ALL {
            let (inner, outer) = z.placeholder_palette();
            assert!(inner.length() > outer.length());
        }
    }
}
