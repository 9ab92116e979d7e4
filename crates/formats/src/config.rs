//! Explorer configuration file.
//!
//! Every field has a default, so `{}` is a complete configuration. Colors
//! are written as `#rrggbb` strings and validated on conversion.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use foundation::color::Rgb;
use scene::camera::CameraOptions;
use scene::explorer::ExplorerOptions;
use scene::legend::DEFAULT_TOPIC_COLORS;
use scene::mesh::{AtlasGrid, MeshOptions, QuadSize};
use scene::palette::{CategoryPalette, SelectionColors};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplorerConfig {
    pub atlas: AtlasConfig,
    pub quad: QuadConfig,
    pub depth_offset: f64,
    pub neighbor_count: usize,
    pub click_threshold_px: f64,
    pub camera: CameraConfig,
    pub selection_colors: SelectionColorConfig,
    pub default_category_color: String,
    pub category_colors: BTreeMap<String, String>,
    pub topic_colors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtlasConfig {
    pub cols: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuadConfig {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
    pub view_offset: f64,
    pub animation_ms: f64,
    pub frame_margin: f64,
    pub initial_distance: f64,
    pub pan_speed: f64,
    pub zoom_speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionColorConfig {
    pub primary: String,
    pub secondary: String,
    pub neutral: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        let grid = AtlasGrid::default();
        Self {
            cols: grid.cols,
            rows: grid.rows,
        }
    }
}

impl Default for QuadConfig {
    fn default() -> Self {
        let quad = QuadSize::default();
        Self {
            width: quad.width,
            height: quad.height,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        let c = CameraOptions::default();
        Self {
            fov_y_deg: c.fov_y_deg,
            near: c.near,
            far: c.far,
            view_offset: c.view_offset,
            animation_ms: c.animation_ms,
            frame_margin: c.frame_margin,
            initial_distance: c.initial_distance,
            pan_speed: c.pan_speed,
            zoom_speed: c.zoom_speed,
        }
    }
}

impl Default for SelectionColorConfig {
    fn default() -> Self {
        let c = SelectionColors::default();
        Self {
            primary: c.primary.to_string(),
            secondary: c.secondary.to_string(),
            neutral: c.neutral.to_string(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        let options = ExplorerOptions::default();
        Self {
            atlas: AtlasConfig::default(),
            quad: QuadConfig::default(),
            depth_offset: options.mesh.depth_offset,
            neighbor_count: options.neighbor_count,
            click_threshold_px: options.click_threshold_px,
            camera: CameraConfig::default(),
            selection_colors: SelectionColorConfig::default(),
            default_category_color: options.palette.default_color().to_string(),
            category_colors: BTreeMap::new(),
            topic_colors: DEFAULT_TOPIC_COLORS.iter().map(Rgb::to_string).collect(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    InvalidColor { field: String, value: String },
    OutOfRange { field: &'static str, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error: {err}"),
            ConfigError::Parse(err) => write!(f, "config parse error: {err}"),
            ConfigError::InvalidColor { field, value } => {
                write!(f, "invalid color for {field}: {value:?}")
            }
            ConfigError::OutOfRange { field, reason } => write!(f, "{field} {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn color(field: impl Into<String>, value: &str) -> Result<Rgb, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidColor {
        field: field.into(),
        value: value.to_string(),
    })
}

fn require(ok: bool, field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, reason })
    }
}

impl ExplorerConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(ConfigError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let payload = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&payload)
    }

    /// Validates the configuration and converts it into explorer options.
    pub fn to_options(&self) -> Result<ExplorerOptions, ConfigError> {
        require(
            self.atlas.cols > 0 && self.atlas.rows > 0,
            "atlas",
            "must have at least one cell",
        )?;
        require(
            self.atlas.cols.checked_mul(self.atlas.rows).is_some(),
            "atlas",
            "has too many cells",
        )?;
        require(
            self.quad.width > 0.0 && self.quad.height > 0.0,
            "quad",
            "must have a positive size",
        )?;
        require(self.depth_offset.is_finite(), "depth_offset", "must be finite")?;
        require(self.click_threshold_px > 0.0, "click_threshold_px", "must be positive")?;
        let cam = &self.camera;
        require(
            cam.fov_y_deg > 0.0 && cam.fov_y_deg < 180.0,
            "camera.fov_y_deg",
            "must be between 0 and 180",
        )?;
        require(
            cam.near > 0.0 && cam.far > cam.near,
            "camera.near",
            "must be positive and below camera.far",
        )?;
        require(cam.animation_ms >= 0.0, "camera.animation_ms", "must not be negative")?;
        require(
            cam.view_offset.is_finite() && cam.view_offset > 0.0,
            "camera.view_offset",
            "must be positive",
        )?;
        require(cam.frame_margin.is_finite(), "camera.frame_margin", "must be finite")?;
        for (field, value) in [
            ("camera.initial_distance", cam.initial_distance),
            ("camera.pan_speed", cam.pan_speed),
            ("camera.zoom_speed", cam.zoom_speed),
        ] {
            require(value.is_finite() && value >= 0.0, field, "must not be negative")?;
        }

        let mut palette = CategoryPalette::new(color(
            "default_category_color",
            &self.default_category_color,
        )?);
        for (name, value) in &self.category_colors {
            palette.insert(name.clone(), color(format!("category_colors.{name}"), value)?);
        }

        let topic_colors = self
            .topic_colors
            .iter()
            .enumerate()
            .map(|(i, v)| color(format!("topic_colors[{i}]"), v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExplorerOptions {
            mesh: MeshOptions {
                quad: QuadSize {
                    width: self.quad.width,
                    height: self.quad.height,
                },
                atlas: AtlasGrid {
                    cols: self.atlas.cols,
                    rows: self.atlas.rows,
                },
                depth_offset: self.depth_offset,
            },
            camera: CameraOptions {
                fov_y_deg: cam.fov_y_deg,
                near: cam.near,
                far: cam.far,
                view_offset: cam.view_offset,
                animation_ms: cam.animation_ms,
                frame_margin: cam.frame_margin,
                initial_distance: cam.initial_distance,
                pan_speed: cam.pan_speed,
                zoom_speed: cam.zoom_speed,
            },
            neighbor_count: self.neighbor_count,
            click_threshold_px: self.click_threshold_px,
            selection_colors: SelectionColors {
                primary: color("selection_colors.primary", &self.selection_colors.primary)?,
                secondary: color("selection_colors.secondary", &self.selection_colors.secondary)?,
                neutral: color("selection_colors.neutral", &self.selection_colors.neutral)?,
            },
            palette,
            topic_colors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ExplorerConfig};
    use foundation::color::Rgb;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_the_default_config() {
        let config = ExplorerConfig::from_json_str("{}").expect("parse");
        assert_eq!(config, ExplorerConfig::default());

        let options = config.to_options().expect("valid");
        assert_eq!(options.neighbor_count, 10);
        assert_eq!(options.click_threshold_px, 6.0);
        assert_eq!(options.mesh.atlas.cols, 10);
        assert_eq!(options.mesh.depth_offset, 1.0);
        assert_eq!(options.camera.animation_ms, 1200.0);
        assert_eq!(options.selection_colors.primary, Rgb(0xffc266));
        assert_eq!(options.topic_colors.len(), 6);
        assert_eq!(options.topic_colors[0], Rgb(0xc6759c));
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config = ExplorerConfig::from_json_str(
            r##"{
                "neighbor_count": 4,
                "camera": {"pan_speed": 0.1},
                "category_colors": {"treatment": "#00ff00"}
            }"##,
        )
        .expect("parse");
        let options = config.to_options().expect("valid");
        assert_eq!(options.neighbor_count, 4);
        assert_eq!(options.camera.pan_speed, 0.1);
        assert_eq!(options.camera.zoom_speed, 0.25);
        assert_eq!(options.palette.color_of("treatment"), Rgb(0x00ff00));
        assert_eq!(options.palette.color_of("unknown"), Rgb::WHITE);
    }

    #[test]
    fn bad_color_names_the_field() {
        let config = ExplorerConfig::from_json_str(r##"{"topic_colors": ["#123456", "teal"]}"##)
            .expect("parse");
        match config.to_options() {
            Err(ConfigError::InvalidColor { field, value }) => {
                assert_eq!(field, "topic_colors[1]");
                assert_eq!(value, "teal");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn loads_fixture_config() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../apps/viewer_web/assets/explorer.json");
        let options = ExplorerConfig::load(path)
            .expect("load fixture")
            .to_options()
            .expect("valid");
        assert_eq!(options.palette.color_of("treatment"), Rgb(0x5b8ff9));
    }

    #[test]
    fn rejects_degenerate_camera_and_atlas() {
        let bad_atlas = ExplorerConfig::from_json_str(r#"{"atlas": {"cols": 0}}"#).expect("parse");
        assert!(matches!(
            bad_atlas.to_options(),
            Err(ConfigError::OutOfRange { field: "atlas", .. })
        ));
        let bad_planes =
            ExplorerConfig::from_json_str(r#"{"camera": {"near": 5, "far": 1}}"#).expect("parse");
        assert!(matches!(
            bad_planes.to_options(),
            Err(ConfigError::OutOfRange { field: "camera.near", .. })
        ));
    }

    #[test]
    fn rejects_atlas_grids_with_too_many_cells() {
        let huge = ExplorerConfig::from_json_str(r#"{"atlas": {"cols": 65536, "rows": 65536}}"#)
            .expect("parse");
        match huge.to_options() {
            Err(ConfigError::OutOfRange { field, reason }) => {
                assert_eq!(field, "atlas");
                assert_eq!(reason, "has too many cells");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        let wide = ExplorerConfig::from_json_str(r#"{"atlas": {"cols": 65536, "rows": 65535}}"#)
            .expect("parse");
        assert!(wide.to_options().is_ok());
    }

    #[test]
    fn rejects_camera_without_a_look_distance_or_with_negative_speeds() {
        let flat = ExplorerConfig::from_json_str(r#"{"camera": {"view_offset": 0}}"#)
            .expect("parse");
        assert!(matches!(
            flat.to_options(),
            Err(ConfigError::OutOfRange { field: "camera.view_offset", .. })
        ));
        let backwards = ExplorerConfig::from_json_str(r#"{"camera": {"zoom_speed": -1}}"#)
            .expect("parse");
        assert!(matches!(
            backwards.to_options(),
            Err(ConfigError::OutOfRange { field: "camera.zoom_speed", .. })
        ));
        let frozen = ExplorerConfig::from_json_str(r#"{"camera": {"pan_speed": 0}}"#)
            .expect("parse");
        assert_eq!(frozen.to_options().expect("valid").camera.pan_speed, 0.0);
    }
}
