//! GPU implementation of the frame stages
//!
//! Owns every texture, uniform buffer and bind group the stages touch. A
//! frame records into one command encoder between `begin_frame` and
//! `end_frame`, so stage order on the queue is exactly call order.

use super::context::{AcquiredFrame, GpuContext, RenderTarget};
use super::diagnostics::GpuErrorSink;
use super::mesh::{barrier_mesh, field_plane, pool_mesh, GpuMesh};
use super::pipelines::StagePipelines;
use super::textures::{
    create_depth_texture, create_sky_cube, create_target, TargetTexture, HEIGHT_FORMAT, MASK_FORMAT,
    PAINT_FORMAT, SURFACE_FORMAT, VIEW_DEPTH_FORMAT,
};
use super::uniforms::{
    MaskUniform, MergeUniform, PaintUniform, SceneUniform, SkyUniform, StepUniform, WaterUniform,
};
use crate::camera::SceneView;
use crate::config::WaterConfig;
use crate::error::{resource_error, WaterResult};
use crate::layout::ViewLayout;
use crate::pipeline::{FieldBackend, PipelineStage};
use crate::sim::{BarrierSet, BrushStroke, FieldFootprint, HeightRoles, ShadingParams};
use bytemuck::Zeroable;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, Buffer, CommandEncoder, Device, Queue};

/// Field geometry and kernel coefficients the backend needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuFieldSettings {
    pub resolution: u32,
    pub half_extent: f32,
    pub surface_height: f32,
    pub mesh_density: u32,
    pub wave_speed: f32,
    pub damping: f32,
}

impl From<&WaterConfig> for GpuFieldSettings {
    fn from(config: &WaterConfig) -> Self {
        Self {
            resolution: config.simulation.resolution,
            half_extent: config.field.half_extent,
            surface_height: config.field.surface_height,
            mesh_density: config.field.mesh_density,
            wave_speed: config.simulation.wave_speed,
            damping: config.simulation.damping,
        }
    }
}

struct StageUniforms {
    mask: Buffer,
    paint: Buffer,
    merge: Buffer,
    step: Buffer,
    scene: Buffer,
    sky: Buffer,
    water: Buffer,
}

/// Bind groups indexed by which height buffer is current
struct StageBindGroups {
    mask: BindGroup,
    paint: BindGroup,
    merge: [BindGroup; 2],
    step: [BindGroup; 2],
    sky: BindGroup,
    shape: BindGroup,
    water: [BindGroup; 2],
    preview: [BindGroup; 2],
}

struct FrameInFlight {
    encoder: CommandEncoder,
    output: AcquiredFrame,
}

pub struct GpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    errors: GpuErrorSink,
    target: RenderTarget,
    pipelines: StagePipelines,
    settings: GpuFieldSettings,
    layout: ViewLayout,

    heights: [TargetTexture; 2],
    surface_data: TargetTexture,
    mask: TargetTexture,
    paint: TargetTexture,
    scene_color: TargetTexture,
    scene_depth: TargetTexture,
    scene_view_depth: TargetTexture,
    screen_depth: TargetTexture,
    sky_cube: TargetTexture,
    sampler: wgpu::Sampler,

    uniforms: StageUniforms,
    bind_groups: StageBindGroups,

    pool_mesh: GpuMesh,
    field_mesh: GpuMesh,
    barrier_mesh: Option<GpuMesh>,
    barrier_generation: Option<u64>,

    frame: Option<FrameInFlight>,
}

fn uniform_buffer<T: bytemuck::Pod>(device: &Device, label: &str, value: &T) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn color_attachment(
    view: &wgpu::TextureView,
    clear: Option<wgpu::Color>,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: match clear {
                Some(color) => wgpu::LoadOp::Clear(color),
                None => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        },
    })
}

fn depth_attachment(
    view: &wgpu::TextureView,
) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
    Some(wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    })
}

fn begin_pass<'a>(
    encoder: &'a mut CommandEncoder,
    label: &str,
    color_attachments: &'a [Option<wgpu::RenderPassColorAttachment<'a>>],
    depth_stencil_attachment: Option<wgpu::RenderPassDepthStencilAttachment<'a>>,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments,
        depth_stencil_attachment,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

fn binding<'a>(index: u32, resource: wgpu::BindingResource<'a>) -> wgpu::BindGroupEntry<'a> {
    wgpu::BindGroupEntry {
        binding: index,
        resource,
    }
}

const REST_SURFACE: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 1.0,
    b: 0.0,
    a: 0.0,
};
const CLEAR_TRANSPARENT: Option<wgpu::Color> = Some(wgpu::Color::TRANSPARENT);
const CLEAR_BLACK: Option<wgpu::Color> = Some(wgpu::Color::BLACK);

impl GpuBackend {
    pub fn new(
        context: &GpuContext,
        target: RenderTarget,
        settings: GpuFieldSettings,
    ) -> WaterResult<Self> {
        let device = Arc::clone(&context.device);
        let queue = Arc::clone(&context.queue);
        let errors = context.errors.clone();
        let (width, height) = target.size();
        let layout = ViewLayout::split(width, height);
        let (scene_width, scene_height) = layout.scene.pixel_size();
        let resolution = settings.resolution;
        let footprint = FieldFootprint::new(settings.half_extent);

        log::info!(
            "[GpuBackend::new] Field {}x{}, output {}x{} {:?}",
            resolution,
            resolution,
            width,
            height,
            target.format()
        );

        let pipelines = StagePipelines::new(&device, target.format())?;

        let copy_usage = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
        let heights = ["Height A", "Height B"].map(|label| {
            create_target(
                &device,
                label,
                resolution,
                resolution,
                HEIGHT_FORMAT,
                copy_usage,
            )
        });
        let surface_data = create_target(
            &device,
            "Surface Data",
            resolution,
            resolution,
            SURFACE_FORMAT,
            wgpu::TextureUsages::COPY_SRC,
        );
        let mask = create_target(
            &device,
            "Barrier Mask",
            resolution,
            resolution,
            MASK_FORMAT,
            wgpu::TextureUsages::COPY_SRC,
        );
        let paint = create_target(
            &device,
            "Paint Delta",
            resolution,
            resolution,
            PAINT_FORMAT,
            wgpu::TextureUsages::COPY_SRC,
        );
        let scene_color = create_target(
            &device,
            "Scene Color",
            scene_width,
            scene_height,
            target.format(),
            wgpu::TextureUsages::empty(),
        );
        let scene_depth = create_depth_texture(&device, "Scene Depth", scene_width, scene_height);
        let scene_view_depth = create_target(
            &device,
            "Scene View Depth",
            scene_width,
            scene_height,
            VIEW_DEPTH_FORMAT,
            wgpu::TextureUsages::empty(),
        );
        let screen_depth = create_depth_texture(&device, "Screen Depth", width, height);
        let sky_cube = create_sky_cube(&device, &queue);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = StageUniforms {
            mask: uniform_buffer(
                &device,
                "Mask Uniform",
                &MaskUniform::new(settings.half_extent),
            ),
            paint: uniform_buffer(&device, "Paint Uniform", &PaintUniform::zeroed()),
            merge: uniform_buffer(&device, "Merge Uniform", &MergeUniform::zeroed()),
            step: uniform_buffer(
                &device,
                "Step Uniform",
                &StepUniform {
                    wave_speed: settings.wave_speed,
                    damping: settings.damping,
                    cell_size: 2.0 * settings.half_extent / resolution as f32,
                    _padding: 0.0,
                },
            ),
            scene: uniform_buffer(&device, "Scene Uniform", &SceneUniform::zeroed()),
            sky: uniform_buffer(&device, "Sky Uniform", &SkyUniform::zeroed()),
            water: uniform_buffer(&device, "Water Uniform", &WaterUniform::zeroed()),
        };

        let bind_groups = Self::create_bind_groups(
            &device,
            &pipelines,
            &uniforms,
            &heights,
            &mask,
            &paint,
            &surface_data,
            &scene_color,
            &scene_view_depth,
            &sky_cube,
            &sampler,
        );

        let pool_mesh = GpuMesh::upload(&device, "Pool", &pool_mesh())?;
        let field_mesh = GpuMesh::upload(
            &device,
            "Field Plane",
            &field_plane(&footprint, settings.mesh_density, settings.surface_height),
        )?;

        let backend = Self {
            device,
            queue,
            errors,
            target,
            pipelines,
            settings,
            layout,
            heights,
            surface_data,
            mask,
            paint,
            scene_color,
            scene_depth,
            scene_view_depth,
            screen_depth,
            sky_cube,
            sampler,
            uniforms,
            bind_groups,
            pool_mesh,
            field_mesh,
            barrier_mesh: None,
            barrier_generation: None,
            frame: None,
        };
        backend.clear_field();

        let provisioning = backend.errors.drain();
        if !provisioning.is_empty() {
            return Err(resource_error("GPU field resources", provisioning.join("; ")));
        }
        Ok(backend)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_bind_groups(
        device: &Device,
        pipelines: &StagePipelines,
        uniforms: &StageUniforms,
        heights: &[TargetTexture; 2],
        mask: &TargetTexture,
        paint: &TargetTexture,
        surface_data: &TargetTexture,
        scene_color: &TargetTexture,
        scene_view_depth: &TargetTexture,
        sky_cube: &TargetTexture,
        sampler: &wgpu::Sampler,
    ) -> StageBindGroups {
        use wgpu::BindingResource as R;
        let layouts = &pipelines.layouts;
        let group =
            |label: &str, layout: &wgpu::BindGroupLayout, entries: &[wgpu::BindGroupEntry]| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout,
                    entries,
                })
            };
        let water = Self::create_water_bind_groups(
            device,
            pipelines,
            uniforms,
            heights,
            surface_data,
            scene_color,
            scene_view_depth,
            sky_cube,
            sampler,
        );

        StageBindGroups {
            mask: group(
                "Mask Bind Group",
                &layouts.mask,
                &[binding(0, uniforms.mask.as_entire_binding())],
            ),
            paint: group(
                "Paint Bind Group",
                &layouts.paint,
                &[
                    binding(0, uniforms.paint.as_entire_binding()),
                    binding(1, R::TextureView(&mask.view)),
                ],
            ),
            merge: [0, 1].map(|i| {
                group(
                    &format!("Merge Bind Group {i}"),
                    &layouts.merge,
                    &[
                        binding(0, uniforms.merge.as_entire_binding()),
                        binding(1, R::TextureView(&heights[i].view)),
                        binding(2, R::TextureView(&paint.view)),
                    ],
                )
            }),
            step: [0, 1].map(|i| {
                group(
                    &format!("Step Bind Group {i}"),
                    &layouts.step,
                    &[
                        binding(0, uniforms.step.as_entire_binding()),
                        binding(1, R::TextureView(&heights[i].view)),
                        binding(2, R::TextureView(&mask.view)),
                    ],
                )
            }),
            sky: group(
                "Sky Bind Group",
                &layouts.sky,
                &[
                    binding(0, uniforms.sky.as_entire_binding()),
                    binding(1, R::TextureView(&sky_cube.view)),
                    binding(2, R::Sampler(sampler)),
                ],
            ),
            shape: group(
                "Shape Bind Group",
                &layouts.shape,
                &[binding(0, uniforms.scene.as_entire_binding())],
            ),
            water,
            preview: [0, 1].map(|i| {
                group(
                    &format!("Preview Bind Group {i}"),
                    &layouts.preview,
                    &[
                        binding(0, R::TextureView(&heights[i].view)),
                        binding(1, R::TextureView(&mask.view)),
                    ],
                )
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create_water_bind_groups(
        device: &Device,
        pipelines: &StagePipelines,
        uniforms: &StageUniforms,
        heights: &[TargetTexture; 2],
        surface_data: &TargetTexture,
        scene_color: &TargetTexture,
        scene_view_depth: &TargetTexture,
        sky_cube: &TargetTexture,
        sampler: &wgpu::Sampler,
    ) -> [BindGroup; 2] {
        use wgpu::BindingResource as R;
        [0, 1].map(|i| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Water Bind Group {i}")),
                layout: &pipelines.layouts.water,
                entries: &[
                    binding(0, uniforms.water.as_entire_binding()),
                    binding(1, R::TextureView(&heights[i].view)),
                    binding(2, R::TextureView(&surface_data.view)),
                    binding(3, R::TextureView(&scene_color.view)),
                    binding(4, R::TextureView(&scene_view_depth.view)),
                    binding(5, R::TextureView(&sky_cube.view)),
                    binding(6, R::Sampler(sampler)),
                ],
            })
        })
    }

    /// Put both height buffers at rest and the surface buffer flat
    fn clear_field(&self) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Field Clear Encoder"),
            });
        for height in &self.heights {
            let attachments = [color_attachment(&height.view, CLEAR_TRANSPARENT)];
            begin_pass(&mut encoder, "Height Clear", &attachments, None);
        }
        for (texture, clear) in [
            (&self.surface_data, REST_SURFACE),
            (&self.mask, wgpu::Color::TRANSPARENT),
            (&self.paint, wgpu::Color::TRANSPARENT),
        ] {
            let attachments = [color_attachment(&texture.view, Some(clear))];
            begin_pass(&mut encoder, "Field Clear", &attachments, None);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    pub fn layout(&self) -> ViewLayout {
        self.layout
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.target.size()
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn settings(&self) -> &GpuFieldSettings {
        &self.settings
    }

    /// Follow a window resize: output, screen depth and the scene capture
    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.target.resize(&self.device, width, height) {
            return;
        }
        self.layout = ViewLayout::split(width, height);
        let (scene_width, scene_height) = self.layout.scene.pixel_size();
        log::info!(
            "[GpuBackend::resize] Output {}x{}, scene capture {}x{}",
            width,
            height,
            scene_width,
            scene_height
        );

        self.screen_depth = create_depth_texture(&self.device, "Screen Depth", width, height);
        self.scene_color = create_target(
            &self.device,
            "Scene Color",
            scene_width,
            scene_height,
            self.target.format(),
            wgpu::TextureUsages::empty(),
        );
        self.scene_depth =
            create_depth_texture(&self.device, "Scene Depth", scene_width, scene_height);
        self.scene_view_depth = create_target(
            &self.device,
            "Scene View Depth",
            scene_width,
            scene_height,
            VIEW_DEPTH_FORMAT,
            wgpu::TextureUsages::empty(),
        );
        self.bind_groups.water = Self::create_water_bind_groups(
            &self.device,
            &self.pipelines,
            &self.uniforms,
            &self.heights,
            &self.surface_data,
            &self.scene_color,
            &self.scene_view_depth,
            &self.sky_cube,
            &self.sampler,
        );
    }

    /// Upload barrier geometry when the set changed since the last upload
    fn sync_barrier_mesh(&mut self, barriers: &BarrierSet) {
        if self.barrier_generation == Some(barriers.generation()) {
            return;
        }
        self.barrier_generation = Some(barriers.generation());
        let mesh = barrier_mesh(barriers);
        self.barrier_mesh = if mesh.is_empty() {
            None
        } else {
            match GpuMesh::upload(&self.device, "Barriers", &mesh) {
                Ok(mesh) => Some(mesh),
                Err(e) => {
                    self.errors.push(e.to_string());
                    None
                }
            }
        };
        log::debug!(
            "[GpuBackend] Barrier mesh now {} boxes (configuration {})",
            barriers.len(),
            barriers.configuration()
        );
    }

    fn missing_frame(&self, stage: PipelineStage) {
        self.errors
            .push(format!("{stage} issued outside begin_frame/end_frame"));
    }

    /// Read the height channel of buffer `index`, row 0 first
    pub fn read_heights(&self, index: usize) -> WaterResult<Vec<f32>> {
        let texture = &self.heights[index & 1];
        let bytes = self.read_texture(texture, 16)?;
        let texels: &[[f32; 4]] = bytemuck::cast_slice(&bytes);
        Ok(texels.iter().map(|t| t[0]).collect())
    }

    /// Read the mask occupancy, 1.0 on barrier cells
    pub fn read_mask(&self) -> WaterResult<Vec<f32>> {
        let bytes = self.read_texture(&self.mask, 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|texel| texel[0] as f32 / 255.0)
            .collect())
    }

    /// Copy a texture into a mapped buffer and return its tightly packed rows
    fn read_texture(&self, texture: &TargetTexture, bytes_per_texel: u32) -> WaterResult<Vec<u8>> {
        let row_bytes = texture.width * bytes_per_texel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = row_bytes.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded_row * texture.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(texture.height),
                },
            },
            wgpu::Extent3d {
                width: texture.width,
                height: texture.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| resource_error("readback", e.to_string()))?
            .map_err(|e| resource_error("readback", e.to_string()))?;

        let mut packed = Vec::with_capacity((row_bytes * texture.height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded_row as usize) {
                packed.extend_from_slice(&row[..row_bytes as usize]);
            }
        }
        buffer.unmap();
        Ok(packed)
    }
}

impl FieldBackend for GpuBackend {
    fn begin_frame(&mut self) -> WaterResult<()> {
        if self.frame.take().is_some() {
            self.errors.push("previous frame was never submitted");
        }
        let output = self.target.acquire()?;
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.frame = Some(FrameInFlight { encoder, output });
        Ok(())
    }

    fn bake_mask(&mut self, barriers: &BarrierSet) {
        self.sync_barrier_mesh(barriers);
        let Some(frame) = self.frame.as_mut() else {
            self.missing_frame(PipelineStage::MaskBake);
            return;
        };

        let attachments = [color_attachment(&self.mask.view, CLEAR_TRANSPARENT)];
        let mut pass = begin_pass(&mut frame.encoder, "Mask Bake Pass", &attachments, None);
        if let Some(mesh) = &self.barrier_mesh {
            pass.set_pipeline(&self.pipelines.mask);
            pass.set_bind_group(0, &self.bind_groups.mask, &[]);
            mesh.draw(&mut pass);
        }
    }

    fn paint(&mut self, stroke: &BrushStroke) {
        self.queue.write_buffer(
            &self.uniforms.paint,
            0,
            bytemuck::bytes_of(&PaintUniform::from(stroke)),
        );
        let Some(frame) = self.frame.as_mut() else {
            self.missing_frame(PipelineStage::Paint);
            return;
        };

        let attachments = [color_attachment(&self.paint.view, CLEAR_TRANSPARENT)];
        let mut pass = begin_pass(&mut frame.encoder, "Paint Pass", &attachments, None);
        pass.set_pipeline(&self.pipelines.paint);
        pass.set_bind_group(0, &self.bind_groups.paint, &[]);
        pass.draw(0..3, 0..1);
    }

    fn merge_paint(&mut self, roles: HeightRoles, frame_delta: f32) {
        self.queue.write_buffer(
            &self.uniforms.merge,
            0,
            bytemuck::bytes_of(&MergeUniform {
                frame_delta,
                _padding: [0.0; 3],
            }),
        );
        let Some(frame) = self.frame.as_mut() else {
            self.missing_frame(PipelineStage::PaintMerge);
            return;
        };

        let current = &self.heights[roles.current];
        let scratch = &self.heights[roles.next];
        {
            let attachments = [color_attachment(&scratch.view, None)];
            let mut pass = begin_pass(&mut frame.encoder, "Paint Merge Pass", &attachments, None);
            pass.set_pipeline(&self.pipelines.merge);
            pass.set_bind_group(0, &self.bind_groups.merge[roles.current], &[]);
            pass.draw(0..3, 0..1);
        }
        // Publish the merged heights back into the current buffer
        frame.encoder.copy_texture_to_texture(
            scratch.texture.as_image_copy(),
            current.texture.as_image_copy(),
            wgpu::Extent3d {
                width: current.width,
                height: current.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn step_field(&mut self, roles: HeightRoles) {
        let Some(frame) = self.frame.as_mut() else {
            self.missing_frame(PipelineStage::FieldTick);
            return;
        };

        let attachments = [
            color_attachment(&self.heights[roles.next].view, None),
            color_attachment(&self.surface_data.view, None),
        ];
        let mut pass = begin_pass(&mut frame.encoder, "Field Step Pass", &attachments, None);
        pass.set_pipeline(&self.pipelines.step);
        pass.set_bind_group(0, &self.bind_groups.step[roles.current], &[]);
        pass.draw(0..3, 0..1);
    }

    fn capture_scene(&mut self, view: &SceneView, barriers: &BarrierSet) {
        self.sync_barrier_mesh(barriers);
        let scene = SceneUniform::from(view);
        let sky = SkyUniform::from(view);
        self.queue
            .write_buffer(&self.uniforms.scene, 0, bytemuck::bytes_of(&scene));
        self.queue
            .write_buffer(&self.uniforms.sky, 0, bytemuck::bytes_of(&sky));
        let Some(frame) = self.frame.as_mut() else {
            self.missing_frame(PipelineStage::SceneCapture);
            return;
        };

        // Texels nothing covers keep the far plane as their view depth
        let far = wgpu::Color {
            r: view.zfar as f64,
            g: 0.0,
            b: 0.0,
            a: 0.0,
        };
        let attachments = [
            color_attachment(&self.scene_color.view, CLEAR_BLACK),
            color_attachment(&self.scene_view_depth.view, Some(far)),
        ];
        let mut pass = begin_pass(
            &mut frame.encoder,
            "Scene Capture Pass",
            &attachments,
            depth_attachment(&self.scene_depth.view),
        );
        pass.set_pipeline(&self.pipelines.sky_capture);
        pass.set_bind_group(0, &self.bind_groups.sky, &[]);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(&self.pipelines.shape_capture);
        pass.set_bind_group(0, &self.bind_groups.shape, &[]);
        self.pool_mesh.draw(&mut pass);
        if let Some(mesh) = &self.barrier_mesh {
            mesh.draw(&mut pass);
        }
    }

    fn present(&mut self, view: &SceneView, shading: &ShadingParams, current_height: usize) {
        let water = WaterUniform::new(
            view,
            shading,
            self.layout.scene.as_array(),
            self.settings.half_extent,
            self.settings.resolution,
        );
        self.queue
            .write_buffer(&self.uniforms.water, 0, bytemuck::bytes_of(&water));
        let Some(frame) = self.frame.as_mut() else {
            self.missing_frame(PipelineStage::Presentation);
            return;
        };
        let current = current_height & 1;

        let attachments = [color_attachment(&frame.output.view, CLEAR_BLACK)];
        let mut pass = begin_pass(
            &mut frame.encoder,
            "Presentation Pass",
            &attachments,
            depth_attachment(&self.screen_depth.view),
        );

        self.layout.preview.apply(&mut pass);
        pass.set_pipeline(&self.pipelines.preview);
        pass.set_bind_group(0, &self.bind_groups.preview[current], &[]);
        pass.draw(0..3, 0..1);

        self.layout.scene.apply(&mut pass);
        pass.set_pipeline(&self.pipelines.sky);
        pass.set_bind_group(0, &self.bind_groups.sky, &[]);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(&self.pipelines.shape);
        pass.set_bind_group(0, &self.bind_groups.shape, &[]);
        self.pool_mesh.draw(&mut pass);
        if let Some(mesh) = &self.barrier_mesh {
            mesh.draw(&mut pass);
        }

        pass.set_pipeline(&self.pipelines.water);
        pass.set_bind_group(0, &self.bind_groups.water[current], &[]);
        self.field_mesh.draw(&mut pass);
    }

    fn end_frame(&mut self) -> WaterResult<()> {
        let Some(frame) = self.frame.take() else {
            self.errors.push("end_frame without begin_frame");
            return Ok(());
        };
        self.queue.submit(Some(frame.encoder.finish()));
        frame.output.present();
        Ok(())
    }

    fn report(&mut self, _stage: PipelineStage) -> Vec<String> {
        self.errors.drain()
    }
}
