//! Texture allocation for the field and scene buffers

pub const HEIGHT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const PAINT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Linear view depth written by the scene capture and read by the field shading
pub const VIEW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
pub const SKY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Edge length of each sky cube face
pub const SKY_FACE_SIZE: u32 = 64;

/// A texture together with its default view
pub struct TargetTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// Clamp requested dimensions to the device limit.
/// Returns (width, height, was_clamped).
pub fn validate_texture_dimensions(
    requested_width: u32,
    requested_height: u32,
    max_dimension: u32,
) -> (u32, u32, bool) {
    let width = requested_width.clamp(1, max_dimension);
    let height = requested_height.clamp(1, max_dimension);
    let was_clamped = width != requested_width || height != requested_height;
    (width, height, was_clamped)
}

/// Allocate a 2D render target that can also be sampled
pub fn create_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    extra_usage: wgpu::TextureUsages,
) -> TargetTexture {
    let max_dimension = device.limits().max_texture_dimension_2d;
    let (width, height, was_clamped) = validate_texture_dimensions(width, height, max_dimension);
    if was_clamped {
        log::warn!(
            "[create_target] '{}' clamped to {}x{} (device limit {})",
            label,
            width,
            height,
            max_dimension
        );
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | extra_usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    log::debug!(
        "[create_target] Allocated '{}' {}x{} {:?}",
        label,
        width,
        height,
        format
    );

    TargetTexture {
        texture,
        view,
        width,
        height,
    }
}

/// Depth attachment for the scene capture and the displayed frame
pub fn create_depth_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> TargetTexture {
    create_target(
        device,
        label,
        width,
        height,
        DEPTH_FORMAT,
        wgpu::TextureUsages::empty(),
    )
}

/// Sky colour for a view direction: blue zenith fading to a pale horizon,
/// dark sandy ground below
pub fn sky_color(direction: [f32; 3]) -> [u8; 4] {
    let length = (direction[0] * direction[0]
        + direction[1] * direction[1]
        + direction[2] * direction[2])
        .sqrt()
        .max(f32::EPSILON);
    let up = direction[1] / length;

    let (low, high, t) = if up >= 0.0 {
        ([0.85, 0.9, 0.95], [0.25, 0.45, 0.85], up.sqrt())
    } else {
        ([0.85, 0.9, 0.95], [0.35, 0.3, 0.25], (-up).sqrt().min(1.0))
    };
    let mut rgba = [255u8; 4];
    for c in 0..3 {
        let value = low[c] + (high[c] - low[c]) * t;
        rgba[c] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    rgba
}

/// Direction through texel centre `(x, y)` of cube face `face`
/// (+X, -X, +Y, -Y, +Z, -Z order)
fn cube_direction(face: u32, x: u32, y: u32, size: u32) -> [f32; 3] {
    let s = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let t = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
    match face {
        0 => [1.0, -t, -s],
        1 => [-1.0, -t, s],
        2 => [s, 1.0, t],
        3 => [s, -1.0, -t],
        4 => [s, -t, 1.0],
        _ => [-s, -t, -1.0],
    }
}

/// Procedural environment cube used as the distant backdrop and reflection
/// fallback
pub fn create_sky_cube(device: &wgpu::Device, queue: &wgpu::Queue) -> TargetTexture {
    let size = SKY_FACE_SIZE;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Sky Cube"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SKY_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let mut face_pixels = Vec::with_capacity((size * size * 4) as usize);
    for face in 0..6 {
        face_pixels.clear();
        for y in 0..size {
            for x in 0..size {
                face_pixels.extend_from_slice(&sky_color(cube_direction(face, x, y, size)));
            }
        }
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: face,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &face_pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size * 4),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Sky Cube View"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });
    log::info!("[create_sky_cube] Generated {}x{} sky cube", size, size);

    TargetTexture {
        texture,
        view,
        width: size,
        height: size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_texture_dimensions() {
        let validate = |width, height| validate_texture_dimensions(width, height, 8192);
        assert_eq!(validate(512, 600), (512, 600, false));
        assert_eq!(validate(9000, 600), (8192, 600, true));
        assert_eq!(validate(0, 600), (1, 600, true));
    }

    #[test]
    fn test_sky_is_brighter_blue_above() {
        let zenith = sky_color([0.0, 1.0, 0.0]);
        let ground = sky_color([0.0, -1.0, 0.0]);
        assert!(zenith[2] > zenith[0]);
        assert!(ground[2] < zenith[2]);
        assert_eq!(zenith[3], 255);
    }

    #[test]
    fn test_cube_faces_point_along_axes() {
        let size = 8;
        assert!(cube_direction(0, 4, 4, size)[0] > 0.9);
        assert!(cube_direction(3, 4, 4, size)[1] < -0.9);
        assert!(cube_direction(5, 4, 4, size)[2] < -0.9);
    }
}
