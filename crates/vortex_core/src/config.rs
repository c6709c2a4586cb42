//! Settings
//!
//! Everything a demo run can be tuned by, loaded from a JSON file. Every field
//! has a default, so a settings file only needs the keys it changes:
//!
//! ```json
//! { "demo": "fluid", "fluid": { "count": 200000, "integrator": "scalar" } }
//! ```

use crate::encoder::EncoderKind;
use crate::graph::GraphPhysics;
use crate::integrator::{BallisticParams, IntegratorKind};
use crate::store::{Coloring, SpawnParams, StoreLayout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a settings file when none is passed on the
/// command line.
pub const SETTINGS_ENV: &str = "VORTEX_SETTINGS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub world: WorldSettings,
    pub demo: Demo,
    pub fluid: FluidSettings,
    pub graph: GraphSettings,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Demo {
    #[default]
    Fluid,
    Graph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Vortex".to_string(),
            width: 1024,
            height: 1024,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// World height in world units; the width follows the window aspect.
    pub height: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self { height: 100.0 }
    }
}

/// Where the vortex attractor sits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractorMode {
    #[default]
    Center,
    /// Follows the pointer while it is inside the window.
    Pointer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidSettings {
    pub count: usize,
    pub store: StoreLayout,
    pub integrator: IntegratorKind,
    pub encoder: EncoderKind,
    /// Draw points as instanced quads of `node_size`.
    pub expanded: bool,
    pub node_size: f32,
    /// Spawn margin from every world edge.
    pub border: f32,
    pub coloring: Coloring,
    /// Vortex strength, in world units per second at unit distance.
    pub scaler: f32,
    pub min_distance: f32,
    pub attractor: AttractorMode,
    /// Upper bound of initial velocity components (ballistic only).
    pub max_speed: f32,
    pub ballistic_speed: f32,
    /// Drop entities that leave `[-w, 2w] × [-h, 2h]`.
    pub cull: bool,
    pub seed: u64,
}

impl Default for FluidSettings {
    fn default() -> Self {
        Self {
            count: 50_000,
            store: StoreLayout::Planar,
            integrator: IntegratorKind::Simd,
            encoder: EncoderKind::PlanarPoints,
            expanded: false,
            node_size: 0.2,
            border: 2.1,
            coloring: Coloring::Position,
            scaler: 100.0,
            min_distance: 0.5,
            attractor: AttractorMode::Center,
            max_speed: 1.0,
            ballistic_speed: 12.5,
            cull: false,
            seed: 300,
        }
    }
}

impl FluidSettings {
    pub fn spawn_params(&self) -> SpawnParams {
        let max_speed = match self.integrator {
            IntegratorKind::Ballistic => self.max_speed,
            _ => 0.0,
        };
        SpawnParams {
            border: self.border,
            max_speed,
            coloring: self.coloring,
        }
    }

    pub fn ballistic_params(&self) -> BallisticParams {
        BallisticParams {
            speed: self.ballistic_speed,
            border: 0.5 * self.node_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub node_size: f32,
    /// Squared world distance under which the pointer picks a node.
    pub pick_threshold: f32,
    pub physics: GraphPhysics,
    pub seed: u64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            node_size: 8.0,
            pick_threshold: 5.0,
            physics: GraphPhysics::default(),
            seed: 300,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading settings");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window size must be positive".into());
        }
        if !(self.world.height > 0.0) {
            return invalid(format!("world height must be positive, got {}", self.world.height));
        }

        let fluid = &self.fluid;
        if fluid.count == 0 {
            return invalid("fluid.count must be positive".into());
        }
        if !(fluid.node_size > 0.0) {
            return invalid(format!("fluid.node_size must be positive, got {}", fluid.node_size));
        }
        if !(fluid.min_distance > 0.0) {
            return invalid(format!(
                "fluid.min_distance must be positive, got {}",
                fluid.min_distance
            ));
        }
        if fluid.border < 0.0 || 2.0 * fluid.border >= self.world.height {
            return invalid(format!(
                "fluid.border {} leaves no room in a world of height {}",
                fluid.border, self.world.height
            ));
        }
        if fluid.integrator == IntegratorKind::Simd && fluid.store != StoreLayout::Planar {
            return invalid("the simd integrator requires the planar store".into());
        }
        if fluid.integrator == IntegratorKind::Gpu && fluid.encoder != EncoderKind::Points {
            return invalid("the gpu integrator draws from its own buffers and requires the points encoder".into());
        }
        if fluid.integrator == IntegratorKind::Gpu && fluid.cull {
            return invalid("the gpu integrator keeps positions on the device and cannot cull".into());
        }

        let graph = &self.graph;
        if !(graph.node_size > 0.0) {
            return invalid(format!("graph.node_size must be positive, got {}", graph.node_size));
        }
        if !(graph.pick_threshold > 0.0) {
            return invalid("graph.pick_threshold must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = Settings::from_json(
            r#"{ "demo": "graph", "fluid": { "count": 12, "integrator": "scalar", "store": "interleaved", "encoder": "quads" } }"#,
        )
        .unwrap();
        assert_eq!(settings.demo, Demo::Graph);
        assert_eq!(settings.fluid.count, 12);
        assert_eq!(settings.fluid.integrator, IntegratorKind::Scalar);
        assert_eq!(settings.fluid.seed, FluidSettings::default().seed);
        assert_eq!(settings.window, WindowSettings::default());
        assert_eq!(settings.graph.physics, GraphPhysics::default());
    }

    #[test]
    fn json_round_trip() {
        let mut settings = Settings::default();
        settings.fluid.attractor = AttractorMode::Pointer;
        settings.graph.physics.spring = 0.25;
        let text = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&text).unwrap(), settings);
    }

    #[test]
    fn simd_requires_planar_store() {
        let mut settings = Settings::default();
        settings.fluid.store = StoreLayout::Interleaved;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn gpu_requires_points_encoder() {
        let mut settings = Settings::default();
        settings.fluid.integrator = IntegratorKind::Gpu;
        assert!(settings.validate().is_err());
        settings.fluid.encoder = EncoderKind::Points;
        settings.validate().unwrap();
    }

    #[test]
    fn gpu_rejects_culling() {
        let mut settings = Settings::default();
        settings.fluid.integrator = IntegratorKind::Gpu;
        settings.fluid.encoder = EncoderKind::Points;
        settings.fluid.cull = true;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_values() {
        let err = Settings::from_json(r#"{ "fluid": { "count": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Settings::from_json(r#"{ "world": { "height": -1.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Settings::from_json(r#"{ "demo": "sprites" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Settings::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(Settings::load_or_default(None).unwrap(), Settings::default());
    }
}
