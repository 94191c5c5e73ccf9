//! Orbit camera around the pool
//!
//! The eye orbits the origin and always looks at a fixed point above the
//! pool floor. Matrices are produced in wgpu clip space.

use cgmath::{
    perspective, Deg, InnerSpace, Matrix3, Matrix4, Point3, Quaternion, Rotation, Rotation3,
    Vector3,
};

/// cgmath builds OpenGL clip space (z in [-1, 1]); wgpu expects z in [0, 1]
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Camera matrices for one displayed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneView {
    pub eye: Point3<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl SceneView {
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// View matrix with the translation removed, for the backdrop
    pub fn rotation_only_view(&self) -> Matrix4<f32> {
        let v = self.view;
        let rotation = Matrix3::from_cols(v.x.truncate(), v.y.truncate(), v.z.truncate());
        Matrix4::from(rotation)
    }
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    distance: f32,
    aspect: f32,
    fovy: Deg<f32>,
    znear: f32,
    zfar: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 8.0, distance),
            target: Point3::new(0.0, 4.0, 0.0),
            distance,
            aspect: width as f32 / height.max(1) as f32,
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 100.0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Slide the eye along its direction from the origin to the new distance
    pub fn set_distance(&mut self, distance: f32) {
        if distance == self.distance {
            return;
        }
        let offset = self.position - Point3::new(0.0, 0.0, 0.0);
        if offset.magnitude2() > f32::EPSILON {
            self.position += offset.normalize() * (distance - self.distance);
        } else {
            // Collapsed onto the origin; restart from the home direction
            let home = Vector3::new(0.0, 8.0, 30.0).normalize();
            self.position = Point3::new(0.0, 0.0, 0.0) + home * distance;
        }
        self.distance = distance;
    }

    /// Rotate the eye around the origin: `yaw` about the camera's up vector,
    /// `pitch` about its right vector, both in degrees
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        if yaw == 0.0 && pitch == 0.0 {
            return;
        }
        let offset = self.position - Point3::new(0.0, 0.0, 0.0);
        if offset.magnitude2() <= f32::EPSILON {
            return;
        }
        let view_vector = offset.normalize();
        let right = Vector3::unit_y().cross(view_vector);
        if right.magnitude2() <= f32::EPSILON {
            return;
        }
        let right = right.normalize();
        let up = right.cross(view_vector).normalize();

        let mut rotated = Quaternion::from_axis_angle(up, Deg(yaw)).rotate_vector(offset);
        rotated = Quaternion::from_axis_angle(right, Deg(pitch)).rotate_vector(rotated);
        self.position = Point3::new(rotated.x, rotated.y.max(0.0), rotated.z);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn scene_view(&self) -> SceneView {
        SceneView {
            eye: self.position,
            view: self.view_matrix(),
            projection: self.projection_matrix(),
            znear: self.znear,
            zfar: self.zfar,
        }
    }
}
