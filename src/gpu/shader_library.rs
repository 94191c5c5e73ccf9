//! Embedded WGSL sources with `#include` resolution
//!
//! Every shader is compiled into the binary so nothing depends on the working
//! directory at runtime. Includes are looked up by file name in the same
//! embedded table.

use crate::error::{pipeline_error, WaterError, WaterResult};
use std::collections::HashSet;

/// Fullscreen triangle vertex stage shared by the image passes
pub const FULLSCREEN_WGSL: &str = include_str!("shaders/fullscreen.wgsl");
/// Field texel layout and neighbour helpers
pub const FIELD_COMMON_WGSL: &str = include_str!("shaders/field_common.wgsl");

pub const MASK_WGSL: &str = include_str!("shaders/mask.wgsl");
pub const PAINT_WGSL: &str = include_str!("shaders/paint.wgsl");
pub const MERGE_WGSL: &str = include_str!("shaders/merge.wgsl");
pub const FIELD_STEP_WGSL: &str = include_str!("shaders/field_step.wgsl");
pub const SKY_WGSL: &str = include_str!("shaders/sky.wgsl");
pub const SHAPE_WGSL: &str = include_str!("shaders/shape.wgsl");
pub const WATER_SURFACE_WGSL: &str = include_str!("shaders/water_surface.wgsl");
pub const PREVIEW_WGSL: &str = include_str!("shaders/preview.wgsl");

/// Shaders that are built into pipelines, by name
pub const PIPELINE_SHADERS: [(&str, &str); 8] = [
    ("mask.wgsl", MASK_WGSL),
    ("paint.wgsl", PAINT_WGSL),
    ("merge.wgsl", MERGE_WGSL),
    ("field_step.wgsl", FIELD_STEP_WGSL),
    ("sky.wgsl", SKY_WGSL),
    ("shape.wgsl", SHAPE_WGSL),
    ("water_surface.wgsl", WATER_SURFACE_WGSL),
    ("preview.wgsl", PREVIEW_WGSL),
];

/// Get shader include content by name
pub fn get_shader_include(name: &str) -> Option<&'static str> {
    match name {
        "fullscreen.wgsl" => Some(FULLSCREEN_WGSL),
        "field_common.wgsl" => Some(FIELD_COMMON_WGSL),
        _ => None,
    }
}

/// Resolves `#include` directives against the embedded include table
pub struct ShaderPreprocessor {
    processed: HashSet<String>,
}

impl ShaderPreprocessor {
    pub fn new() -> Self {
        Self {
            processed: HashSet::new(),
        }
    }

    /// Expand every include in `source`. Each include is pasted at most once.
    pub fn process(&mut self, source: &str) -> WaterResult<String> {
        let mut result = String::with_capacity(source.len());

        for line in source.lines() {
            match parse_include_directive(line) {
                Some(name) => {
                    if !self.processed.insert(name.to_string()) {
                        result.push_str("// Skipped repeated include: ");
                        result.push_str(name);
                        result.push('\n');
                        continue;
                    }
                    let included = get_shader_include(name).ok_or_else(|| {
                        WaterError::ShaderInclude {
                            name: name.to_string(),
                        }
                    })?;
                    let expanded = self.process(included)?;
                    result.push_str("// Begin include: ");
                    result.push_str(name);
                    result.push('\n');
                    result.push_str(&expanded);
                    result.push_str("// End include: ");
                    result.push_str(name);
                    result.push('\n');
                }
                None => {
                    result.push_str(line);
                    result.push('\n');
                }
            }
        }

        Ok(result)
    }
}

impl Default for ShaderPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `#include "file.wgsl"` or `#include <file.wgsl>`
fn parse_include_directive(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?.trim();
    rest.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')))
}

/// Expand a shader's includes with a fresh preprocessor
pub fn preprocess_shader(source: &str) -> WaterResult<String> {
    ShaderPreprocessor::new().process(source)
}

/// Expand and compile a shader module. Parse and validation failures come
/// back as `WaterError::PipelineCreation` instead of reaching the device's
/// uncaptured-error handler.
pub fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> WaterResult<wgpu::ShaderModule> {
    let expanded = preprocess_shader(source)?;
    log::debug!(
        "[shader_library] Compiling '{}' ({} bytes after includes)",
        label,
        expanded.len()
    );

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(expanded.into()),
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        log::error!("[shader_library] '{}' failed to compile: {}", label, error);
        return Err(pipeline_error(label, error));
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga;

    #[test]
    fn test_parse_include_forms() {
        let quoted = parse_include_directive("#include \"a.wgsl\"");
        assert_eq!(quoted, Some("a.wgsl"));
        let angled = parse_include_directive("  #include <b.wgsl>");
        assert_eq!(angled, Some("b.wgsl"));
        assert_eq!(parse_include_directive("#include c.wgsl"), None);
        assert_eq!(parse_include_directive("let x = 1;"), None);
    }

    #[test]
    fn test_all_pipeline_shaders_expand() {
        for (name, source) in PIPELINE_SHADERS {
            let expanded = preprocess_shader(source)
                .unwrap_or_else(|e| panic!("{name} failed to expand: {e}"));
            assert!(!expanded.contains("#include"), "{name} kept a directive");
        }
    }

    #[test]
    fn test_pipeline_shaders_parse_and_validate() {
        for (name, source) in PIPELINE_SHADERS {
            let expanded = preprocess_shader(source).unwrap();
            let module = naga::front::wgsl::parse_str(&expanded)
                .unwrap_or_else(|e| panic!("{name}: {}", e.emit_to_string(&expanded)));
            let mut validator = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::all(),
            );
            if let Err(error) = validator.validate(&module) {
                panic!("{name} failed validation: {error:?}");
            }
        }
    }

    #[test]
    fn test_paint_uniform_member_is_not_reserved() {
        let expanded = preprocess_shader(PAINT_WGSL).unwrap();
        assert!(expanded.contains("is_active: f32"));
        assert!(naga::front::wgsl::parse_str(&expanded).is_ok());

        let reserved = expanded.replace("is_active", "active");
        assert!(naga::front::wgsl::parse_str(&reserved).is_err());
    }

    #[test]
    fn test_repeated_include_pasted_once() {
        let source = "#include \"fullscreen.wgsl\"\n#include \"fullscreen.wgsl\"\n";
        let expanded = preprocess_shader(source).unwrap();
        let marker = "// Begin include: fullscreen.wgsl";
        assert_eq!(expanded.matches(marker).count(), 1);
        assert!(expanded.contains("Skipped repeated include"));
    }

    #[test]
    fn test_unknown_include_is_an_error() {
        let err = preprocess_shader("#include \"missing.wgsl\"").unwrap_err();
        match err {
            WaterError::ShaderInclude { name } => assert_eq!(name, "missing.wgsl"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
