use crate::camera::SceneView;
use crate::sim::{BrushStroke, ShadingParams};
use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, SquareMatrix};

fn matrix(m: Matrix4<f32>) -> [[f32; 4]; 4] {
    m.into()
}

/// Top-down orthographic bake of barrier footprints
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MaskUniform {
    pub half_extent: f32,
    pub _padding: [f32; 3],
}

impl MaskUniform {
    pub fn new(half_extent: f32) -> Self {
        Self {
            half_extent,
            _padding: [0.0; 3],
        }
    }
}

/// Brush stroke for the paint pass
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PaintUniform {
    pub pointer: [f32; 2],
    pub size: f32,
    pub power: f32,
    /// 1.0 while painting, 0.0 otherwise
    pub is_active: f32,
    pub _padding: [f32; 3],
}

impl From<&BrushStroke> for PaintUniform {
    fn from(stroke: &BrushStroke) -> Self {
        Self {
            pointer: stroke.pointer.position,
            size: stroke.brush.size,
            power: stroke.brush.power,
            is_active: if stroke.pointer.active { 1.0 } else { 0.0 },
            _padding: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MergeUniform {
    pub frame_delta: f32,
    pub _padding: [f32; 3],
}

/// Wave kernel coefficients
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct StepUniform {
    pub wave_speed: f32,
    pub damping: f32,
    pub cell_size: f32,
    pub _padding: f32,
}

/// Camera for opaque scene geometry
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl From<&SceneView> for SceneUniform {
    fn from(view: &SceneView) -> Self {
        Self {
            view_proj: matrix(view.view_projection()),
            eye: [view.eye.x, view.eye.y, view.eye.z, 1.0],
        }
    }
}

/// Unprojects far-plane positions into sky directions
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SkyUniform {
    pub inv_view_proj: [[f32; 4]; 4],
    /// Far plane distance written as the backdrop's view depth
    pub depth: [f32; 4],
}

impl From<&SceneView> for SkyUniform {
    fn from(view: &SceneView) -> Self {
        let rotation_only = view.projection * view.rotation_only_view();
        Self {
            inv_view_proj: matrix(rotation_only.invert().unwrap_or_else(Matrix4::identity)),
            depth: [view.zfar, 0.0, 0.0, 0.0],
        }
    }
}

/// Everything the field shading pass reads besides textures
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WaterUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    /// fog density, turbulence, refraction, reflection
    pub shading: [f32; 4],
    /// Viewport origin and size in framebuffer pixels
    pub viewport: [f32; 4],
    /// half extent, resolution, near, far
    pub field: [f32; 4],
}

impl WaterUniform {
    pub fn new(
        view: &SceneView,
        shading: &ShadingParams,
        viewport: [f32; 4],
        half_extent: f32,
        resolution: u32,
    ) -> Self {
        Self {
            view_proj: matrix(view.view_projection()),
            eye: [view.eye.x, view.eye.y, view.eye.z, 1.0],
            shading: [
                shading.fog_density,
                shading.turbulence,
                shading.refraction,
                shading.reflection,
            ],
            viewport,
            field: [half_extent, resolution as f32, view.znear, view.zfar],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BrushParams, PointerState};

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        for size in [
            std::mem::size_of::<MaskUniform>(),
            std::mem::size_of::<PaintUniform>(),
            std::mem::size_of::<MergeUniform>(),
            std::mem::size_of::<StepUniform>(),
            std::mem::size_of::<SceneUniform>(),
            std::mem::size_of::<SkyUniform>(),
            std::mem::size_of::<WaterUniform>(),
        ] {
            assert_eq!(size % 16, 0);
        }
    }

    #[test]
    fn test_sky_unprojects_forward_through_centre() {
        let camera = crate::camera::OrbitCamera::new(30.0, 512, 600);
        let view = camera.scene_view();
        let sky = SkyUniform::from(&view);
        let inv = Matrix4::from(sky.inv_view_proj);
        let far = inv * cgmath::Vector4::new(0.0, 0.0, 1.0, 1.0);
        let dir = cgmath::Vector3::new(far.x / far.w, far.y / far.w, far.z / far.w);

        // The camera sits on +z looking back towards the origin
        assert!(dir.z < 0.0);
        assert!(dir.z.abs() > dir.x.abs());
    }

    #[test]
    fn test_sky_carries_far_plane_as_backdrop_depth() {
        let view = crate::camera::OrbitCamera::new(30.0, 512, 600).scene_view();
        let sky = SkyUniform::from(&view);
        assert_eq!(sky.depth, [view.zfar, 0.0, 0.0, 0.0]);
        assert_eq!(std::mem::size_of::<SkyUniform>(), 80);
    }

    #[test]
    fn test_paint_uniform_encodes_activity() {
        let stroke = BrushStroke {
            pointer: PointerState {
                position: [0.25, 0.75],
                active: true,
            },
            brush: BrushParams {
                size: 0.15,
                power: -5.0,
            },
        };
        let uniform = PaintUniform::from(&stroke);
        assert_eq!(uniform.is_active, 1.0);
        assert_eq!(uniform.pointer, [0.25, 0.75]);
        assert_eq!(uniform.power, -5.0);
    }
}
