//! Scripted conversation sessions.
//!
//! A script is a JSON document of timed events standing in for the
//! classifier, the image pipeline and the user:
//!
//! ```json
//! { "events": [
//!     { "at": 0.0, "kind": "zone", "zone": "family" },
//!     { "at": 0.5, "kind": "spawn", "label": "dog", "zone": "family", "texture_after": 1.0 },
//!     { "at": 2.0, "kind": "text", "text": "good dog" }
//! ] }
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use ms_core::CameraDirection;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEvent {
    /// Simulation seconds at which the event fires.
    pub at: f64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Action {
    Zone {
        zone: String,
    },
    Spawn {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        zone: Option<String>,
        #[serde(default)]
        panel: Option<String>,
        /// Seconds until the generated image is ready. No texture if absent.
        #[serde(default)]
        texture_after: Option<f64>,
        /// Simulate a generation failure instead of an image.
        #[serde(default)]
        fail: bool,
    },
    Background {
        count: usize,
        #[serde(default)]
        zone: Option<String>,
    },
    Text {
        text: String,
    },
    Manual {
        #[serde(default = "default_true")]
        on: bool,
    },
    Move {
        direction: CameraDirection,
    },
    Orbit {
        dx: f32,
        dy: f32,
    },
    Zoom {
        delta: f32,
    },
    Resume,
    Ripple {
        #[serde(default)]
        x: f32,
        #[serde(default)]
        z: f32,
    },
    Voice {
        level: f32,
    },
    Click {
        x: f32,
        y: f32,
    },
    Resize {
        width: u32,
        height: u32,
    },
    Retire {
        label: String,
    },
}

fn default_true() -> bool {
    true
}

impl Script {
    pub fn parse(json: &str) -> Result<Self> {
        let mut script: Script = serde_json::from_str(json).context("failed to parse script")?;
        for (i, event) in script.events.iter().enumerate() {
            if !event.at.is_finite() || event.at < 0.0 {
                bail!("event {i} has invalid time {}", event.at);
            }
        }
        // Stable: same-time events keep their file order.
        script.events.sort_by(|a, b| a.at.total_cmp(&b.at));
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Time of the last event, or zero for an empty script.
    pub fn duration(&self) -> f64 {
        self.events.last().map(|e| e.at).unwrap_or(0.0)
    }
}
