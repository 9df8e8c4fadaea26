//! Recognized configuration options of a `GLContext`.

use crate::driver::types::DepthFormat;
use crate::driver::Capabilities;
use crate::errors::*;
use crate::state::{Policy, Slot};

/// Diagnostic detail for GL errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLogging {
    /// Never polls `glGetError`, apart from the poll after each draw call.
    Off,
    /// Polls once when the state cache is opened and once when it is closed.
    OnFrameBoundary,
    /// Polls after every driver call, naming the failing entry point.
    OnEveryCall,
}

/// Whether a GL error aborts the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAssertion {
    Off,
    Abort,
}

/// Whether the program cache pins its entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrength {
    Weak,
    Strong,
}

/// The pipeline flavour the context drives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// GL ES 1.1 style: built-in lighting and matrix stacks.
    Fixed,
    /// GL ES 2.0 style: application supplied shaders.
    Programmable,
}

/// A setup of `GLContext`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub error_logging: ErrorLogging,
    pub error_assertion: ErrorAssertion,
    pub multisample_pixel_samples: u32,
    pub depth_format: DepthFormat,
    pub shader_cache_strength: CacheStrength,
    pub should_cache_picking_shaders: bool,
    pub max_lights: u32,
    pub max_clip_planes: u32,
    pub max_palette_matrices: u32,
    pub max_bone_influences_per_vertex: u32,
    pub pipeline: Pipeline,
    pub modelview_stack_depth: usize,
    pub projection_stack_depth: usize,
    pub texture_stack_depth: usize,
    pub palette_stack_depth: usize,
    /// Original-value handling overrides applied on top of the defaults.
    pub policies: Vec<(Slot, Policy)>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            error_logging: ErrorLogging::OnFrameBoundary,
            error_assertion: ErrorAssertion::Off,
            multisample_pixel_samples: 1,
            depth_format: DepthFormat::D16,
            shader_cache_strength: CacheStrength::Strong,
            should_cache_picking_shaders: true,
            max_lights: 8,
            max_clip_planes: 6,
            max_palette_matrices: 11,
            max_bone_influences_per_vertex: 4,
            pipeline: Pipeline::Programmable,
            modelview_stack_depth: 16,
            projection_stack_depth: 16,
            texture_stack_depth: 4,
            palette_stack_depth: 1,
            policies: Vec::new(),
        }
    }
}

impl Settings {
    /// Parses settings from JSON. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Settings> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.multisample_pixel_samples == 0 {
            return Err(Error::InvalidSettings(
                "multisample_pixel_samples must be at least 1".into(),
            ));
        }

        let depths = [
            self.modelview_stack_depth,
            self.projection_stack_depth,
            self.texture_stack_depth,
            self.palette_stack_depth,
        ];

        if depths.iter().any(|v| *v == 0) {
            return Err(Error::InvalidSettings(
                "matrix stack depths must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Clamps the requested maxima to what the platform reports.
    pub fn clamp(&mut self, caps: &Capabilities) {
        let clamp = |name: &str, v: &mut u32, max: u32| {
            if *v > max {
                info!("Clamps {} from {} to {}.", name, *v, max);
                *v = max;
            }
        };

        if self.pipeline == Pipeline::Fixed {
            clamp("max_lights", &mut self.max_lights, caps.max_lights);
            clamp("max_clip_planes", &mut self.max_clip_planes, caps.max_clip_planes);
            clamp(
                "max_palette_matrices",
                &mut self.max_palette_matrices,
                caps.max_palette_matrices,
            );
            clamp(
                "max_bone_influences_per_vertex",
                &mut self.max_bone_influences_per_vertex,
                caps.max_vertex_units,
            );
        }

        clamp(
            "multisample_pixel_samples",
            &mut self.multisample_pixel_samples,
            caps.max_samples.max(1),
        );

        if self.depth_format == DepthFormat::D24S8 && !caps.has_packed_depth_stencil() {
            warn!("Packed depth stencil is unavailable, falls back to D16.");
            self.depth_format = DepthFormat::D16;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::types::Capability;

    #[test]
    fn json() {
        let settings = Settings::from_json(
            r#"{
                "error_logging": "on_every_call",
                "depth_format": "d24s8",
                "shader_cache_strength": "weak",
                "max_lights": 4,
                "policies": [[{ "Capability": "Fog" }, "ReadOnceAndRestore"]]
            }"#,
        )
        .unwrap();

        assert_eq!(settings.error_logging, ErrorLogging::OnEveryCall);
        assert_eq!(settings.depth_format, DepthFormat::D24S8);
        assert_eq!(settings.shader_cache_strength, CacheStrength::Weak);
        assert_eq!(settings.max_lights, 4);
        assert_eq!(settings.modelview_stack_depth, 16);
        assert_eq!(
            settings.policies,
            vec![(Slot::Capability(Capability::Fog), Policy::ReadOnceAndRestore)]
        );
    }

    #[test]
    fn invalid() {
        assert!(Settings::from_json(r#"{ "multisample_pixel_samples": 0 }"#).is_err());
        assert!(Settings::from_json(r#"{ "modelview_stack_depth": 0 }"#).is_err());
        assert!(Settings::from_json(r#"{ "pipeline": "vulkan" }"#).is_err());
    }
}
