//! Static geometry: pool enclosure, barrier boxes and the field plane

use crate::error::{resource_error, WaterResult};
use crate::sim::{BarrierSet, BarrierVolume, FieldFootprint};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // UV
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// CPU-side indexed triangle list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append another mesh, rebasing its indices
    pub fn append(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

/// Axis-aligned box. Face normals point outward, or inward when `inward` is
/// set (the pool is seen from inside). UVs are in world units so tiling
/// stays square on every face.
pub fn cuboid(center: [f32; 3], half_extents: [f32; 3], inward: bool) -> MeshData {
    let [cx, cy, cz] = center;
    let [hx, hy, hz] = half_extents;
    let sign = if inward { -1.0 } else { 1.0 };

    // (normal, tangent u, tangent v, u extent, v extent)
    let faces: [([f32; 3], [f32; 3], [f32; 3], f32, f32); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0], hz, hy),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], hz, hy),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0], hx, hz),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], hx, hz),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], hx, hy),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], hx, hy),
    ];

    let mut mesh = MeshData::default();
    for (normal, tu, tv, eu, ev) in faces {
        let base = mesh.vertices.len() as u32;
        let face_center = [
            cx + normal[0] * hx,
            cy + normal[1] * hy,
            cz + normal[2] * hz,
        ];
        for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [
                face_center[0] + tu[0] * eu * su + tv[0] * ev * sv,
                face_center[1] + tu[1] * eu * su + tv[1] * ev * sv,
                face_center[2] + tu[2] * eu * su + tv[2] * ev * sv,
            ];
            mesh.vertices.push(Vertex::new(
                position,
                [normal[0] * sign, normal[1] * sign, normal[2] * sign],
                [eu * (su + 1.0), ev * (sv + 1.0)],
            ));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// The pool the field sits in
pub fn pool_mesh() -> MeshData {
    cuboid([0.0, 5.0, 0.0], [8.0, 5.0, 8.0], true)
}

/// All volumes of a barrier set combined into one mesh
pub fn barrier_mesh(set: &BarrierSet) -> MeshData {
    let mut mesh = MeshData::default();
    for BarrierVolume {
        center,
        half_extents,
    } in set.volumes()
    {
        mesh.append(&cuboid(*center, *half_extents, false));
    }
    mesh
}

/// `density` x `density` quad grid covering the field footprint at `height`.
/// UVs follow the field convention `((x + E) / 2E, (z + E) / 2E)`.
pub fn field_plane(footprint: &FieldFootprint, density: u32, height: f32) -> MeshData {
    let density = density.max(1);
    let row = density + 1;
    let mut mesh = MeshData::default();

    for j in 0..=density {
        for i in 0..=density {
            let uv = [i as f32 / density as f32, j as f32 / density as f32];
            let [x, z] = footprint.uv_to_world(uv);
            mesh.vertices
                .push(Vertex::new([x, height, z], [0.0, 1.0, 0.0], uv));
        }
    }
    for j in 0..density {
        for i in 0..density {
            let a = j * row + i;
            let b = a + 1;
            let c = a + row;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    mesh
}

/// Vertex and index buffers for one mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> WaterResult<Self> {
        if mesh.is_empty() {
            return Err(resource_error(label, "mesh has no triangles"));
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        })
    }

    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::BarrierController;

    #[test]
    fn test_cuboid_bounds_and_counts() {
        let mesh = cuboid([0.0, 5.0, 0.0], [8.0, 5.0, 8.0], false);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for v in &mesh.vertices {
            assert!(v.position[0].abs() <= 8.0 + 1e-5);
            assert!(v.position[1] >= -1e-5 && v.position[1] <= 10.0 + 1e-5);
        }
    }

    #[test]
    fn test_pool_normals_point_inward() {
        let mesh = pool_mesh();
        for v in &mesh.vertices {
            let to_center = [-v.position[0], 5.0 - v.position[1], -v.position[2]];
            let dot = to_center[0] * v.normal[0]
                + to_center[1] * v.normal[1]
                + to_center[2] * v.normal[2];
            assert!(dot > 0.0);
        }
    }

    #[test]
    fn test_barrier_mesh_follows_configuration() {
        let mut controller = BarrierController::new();
        assert!(barrier_mesh(controller.set()).is_empty());
        controller.advance();
        controller.advance();
        controller.advance();
        let mesh = barrier_mesh(controller.set());
        assert_eq!(mesh.indices.len(), 3 * 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_field_plane_uvs_match_footprint() {
        let footprint = FieldFootprint::new(8.0);
        let mesh = field_plane(&footprint, 4, 5.0);
        assert_eq!(mesh.vertices.len(), 25);
        assert_eq!(mesh.indices.len(), 4 * 4 * 6);
        for v in &mesh.vertices {
            let uv = footprint.world_to_uv([v.position[0], v.position[2]]);
            assert!((uv[0] - v.uv[0]).abs() < 1e-6);
            assert!((uv[1] - v.uv[1]).abs() < 1e-6);
            assert_eq!(v.position[1], 5.0);
        }
    }
}
