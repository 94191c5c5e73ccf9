//! Render pipelines for every stage and their bind group layouts

use super::mesh::Vertex;
use super::shader_library::{self, create_shader_module};
use super::textures::{
    DEPTH_FORMAT, HEIGHT_FORMAT, MASK_FORMAT, PAINT_FORMAT, SURFACE_FORMAT, VIEW_DEPTH_FORMAT,
};
use crate::error::{pipeline_error, WaterResult};
use wgpu::{BindGroupLayout, Device, RenderPipeline};

pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// 2D float texture read with `textureLoad`
pub fn texel_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn filtered_entry(
    binding: u32,
    dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Bind group layouts, one per pipeline
pub struct StageLayouts {
    pub mask: BindGroupLayout,
    pub paint: BindGroupLayout,
    pub merge: BindGroupLayout,
    pub step: BindGroupLayout,
    pub sky: BindGroupLayout,
    pub shape: BindGroupLayout,
    pub water: BindGroupLayout,
    pub preview: BindGroupLayout,
}

impl StageLayouts {
    pub fn new(device: &Device) -> Self {
        use wgpu::ShaderStages as S;
        let both = S::VERTEX | S::FRAGMENT;
        let layout = |label: &str, entries: &[wgpu::BindGroupLayoutEntry]| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            })
        };

        Self {
            mask: layout("Mask Layout", &[uniform_entry(0, S::VERTEX)]),
            paint: layout(
                "Paint Layout",
                &[uniform_entry(0, S::FRAGMENT), texel_entry(1, S::FRAGMENT)],
            ),
            merge: layout(
                "Merge Layout",
                &[
                    uniform_entry(0, S::FRAGMENT),
                    texel_entry(1, S::FRAGMENT),
                    texel_entry(2, S::FRAGMENT),
                ],
            ),
            step: layout(
                "Field Step Layout",
                &[
                    uniform_entry(0, S::FRAGMENT),
                    texel_entry(1, S::FRAGMENT),
                    texel_entry(2, S::FRAGMENT),
                ],
            ),
            sky: layout(
                "Sky Layout",
                &[
                    uniform_entry(0, S::FRAGMENT),
                    filtered_entry(1, wgpu::TextureViewDimension::Cube),
                    sampler_entry(2),
                ],
            ),
            shape: layout("Shape Layout", &[uniform_entry(0, both)]),
            water: layout(
                "Water Surface Layout",
                &[
                    uniform_entry(0, both),
                    texel_entry(1, both),
                    texel_entry(2, S::FRAGMENT),
                    filtered_entry(3, wgpu::TextureViewDimension::D2),
                    texel_entry(4, S::FRAGMENT),
                    filtered_entry(5, wgpu::TextureViewDimension::Cube),
                    sampler_entry(6),
                ],
            ),
            preview: layout(
                "Preview Layout",
                &[texel_entry(0, S::FRAGMENT), texel_entry(1, S::FRAGMENT)],
            ),
        }
    }
}

/// How a pipeline treats depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepthMode {
    None,
    /// Test and write
    Opaque,
    /// Always pass, never write
    Backdrop,
}

struct PipelineSpec<'a> {
    label: &'a str,
    source: &'a str,
    layout: &'a BindGroupLayout,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    targets: &'a [Option<wgpu::ColorTargetState>],
    depth: DepthMode,
}

fn replace_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })
}

fn create_pipeline(device: &Device, spec: PipelineSpec<'_>) -> WaterResult<RenderPipeline> {
    let shader = create_shader_module(device, spec.label, spec.source)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.label),
        bind_group_layouts: &[spec.layout],
        push_constant_ranges: &[],
    });

    let depth_stencil = match spec.depth {
        DepthMode::None => None,
        DepthMode::Opaque => Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        DepthMode::Backdrop => Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: spec.vertex_entry,
            buffers: spec.vertex_buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: spec.fragment_entry,
            targets: spec.targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        log::error!("[create_pipeline] '{}' rejected: {}", spec.label, error);
        return Err(pipeline_error(spec.label, error));
    }
    log::debug!("[create_pipeline] Created '{}'", spec.label);
    Ok(pipeline)
}

/// Every render pipeline the backend uses
pub struct StagePipelines {
    pub layouts: StageLayouts,
    pub mask: RenderPipeline,
    pub paint: RenderPipeline,
    pub merge: RenderPipeline,
    pub step: RenderPipeline,
    pub sky: RenderPipeline,
    pub shape: RenderPipeline,
    /// Sky and shapes for the scene capture, which adds a view depth target
    pub sky_capture: RenderPipeline,
    pub shape_capture: RenderPipeline,
    pub water: RenderPipeline,
    pub preview: RenderPipeline,
}

impl StagePipelines {
    /// Build all pipelines. `output_format` is the colour format shared by
    /// the scene capture and the displayed frame.
    pub fn new(device: &Device, output_format: wgpu::TextureFormat) -> WaterResult<Self> {
        let layouts = StageLayouts::new(device);
        let vertex = [Vertex::desc()];
        let output = [replace_target(output_format)];
        let capture = [
            replace_target(output_format),
            replace_target(VIEW_DEPTH_FORMAT),
        ];

        let mask = create_pipeline(
            device,
            PipelineSpec {
                label: "Mask Bake Pipeline",
                source: shader_library::MASK_WGSL,
                layout: &layouts.mask,
                vertex_entry: "mask_vertex",
                fragment_entry: "mask_fragment",
                vertex_buffers: &vertex,
                targets: &[replace_target(MASK_FORMAT)],
                depth: DepthMode::None,
            },
        )?;
        let paint = create_pipeline(
            device,
            PipelineSpec {
                label: "Paint Pipeline",
                source: shader_library::PAINT_WGSL,
                layout: &layouts.paint,
                vertex_entry: "fullscreen_vertex",
                fragment_entry: "paint_fragment",
                vertex_buffers: &[],
                targets: &[replace_target(PAINT_FORMAT)],
                depth: DepthMode::None,
            },
        )?;
        let merge = create_pipeline(
            device,
            PipelineSpec {
                label: "Paint Merge Pipeline",
                source: shader_library::MERGE_WGSL,
                layout: &layouts.merge,
                vertex_entry: "fullscreen_vertex",
                fragment_entry: "merge_fragment",
                vertex_buffers: &[],
                targets: &[replace_target(HEIGHT_FORMAT)],
                depth: DepthMode::None,
            },
        )?;
        let step = create_pipeline(
            device,
            PipelineSpec {
                label: "Field Step Pipeline",
                source: shader_library::FIELD_STEP_WGSL,
                layout: &layouts.step,
                vertex_entry: "fullscreen_vertex",
                fragment_entry: "step_fragment",
                vertex_buffers: &[],
                targets: &[replace_target(HEIGHT_FORMAT), replace_target(SURFACE_FORMAT)],
                depth: DepthMode::None,
            },
        )?;
        let sky = create_pipeline(
            device,
            PipelineSpec {
                label: "Sky Pipeline",
                source: shader_library::SKY_WGSL,
                layout: &layouts.sky,
                vertex_entry: "sky_vertex",
                fragment_entry: "sky_fragment",
                vertex_buffers: &[],
                targets: &output,
                depth: DepthMode::Backdrop,
            },
        )?;
        let shape = create_pipeline(
            device,
            PipelineSpec {
                label: "Shape Pipeline",
                source: shader_library::SHAPE_WGSL,
                layout: &layouts.shape,
                vertex_entry: "shape_vertex",
                fragment_entry: "shape_fragment",
                vertex_buffers: &vertex,
                targets: &output,
                depth: DepthMode::Opaque,
            },
        )?;
        let sky_capture = create_pipeline(
            device,
            PipelineSpec {
                label: "Sky Capture Pipeline",
                source: shader_library::SKY_WGSL,
                layout: &layouts.sky,
                vertex_entry: "sky_vertex",
                fragment_entry: "sky_capture_fragment",
                vertex_buffers: &[],
                targets: &capture,
                depth: DepthMode::Backdrop,
            },
        )?;
        let shape_capture = create_pipeline(
            device,
            PipelineSpec {
                label: "Shape Capture Pipeline",
                source: shader_library::SHAPE_WGSL,
                layout: &layouts.shape,
                vertex_entry: "shape_vertex",
                fragment_entry: "shape_capture_fragment",
                vertex_buffers: &vertex,
                targets: &capture,
                depth: DepthMode::Opaque,
            },
        )?;
        let water = create_pipeline(
            device,
            PipelineSpec {
                label: "Water Surface Pipeline",
                source: shader_library::WATER_SURFACE_WGSL,
                layout: &layouts.water,
                vertex_entry: "water_vertex",
                fragment_entry: "water_fragment",
                vertex_buffers: &vertex,
                targets: &output,
                depth: DepthMode::Opaque,
            },
        )?;
        let preview = create_pipeline(
            device,
            PipelineSpec {
                label: "Preview Pipeline",
                source: shader_library::PREVIEW_WGSL,
                layout: &layouts.preview,
                vertex_entry: "fullscreen_vertex",
                fragment_entry: "preview_fragment",
                vertex_buffers: &[],
                targets: &output,
                depth: DepthMode::Backdrop,
            },
        )?;

        log::info!(
            "[StagePipelines::new] Built 10 pipelines for {:?}",
            output_format
        );
        Ok(Self {
            layouts,
            mask,
            paint,
            merge,
            step,
            sky,
            shape,
            sky_capture,
            shape_capture,
            water,
            preview,
        })
    }
}
