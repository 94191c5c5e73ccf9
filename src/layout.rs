//! Window split: height preview on the left, 3D view on the right

/// Rectangle of the framebuffer in pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn as_array(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn apply(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(self.x, self.y, self.width, self.height, 0.0, 1.0);
    }

    /// Size in whole pixels, at least 1x1
    pub fn pixel_size(&self) -> (u32, u32) {
        ((self.width as u32).max(1), (self.height as u32).max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLayout {
    pub preview: Viewport,
    pub scene: Viewport,
}

impl ViewLayout {
    pub fn split(width: u32, height: u32) -> Self {
        let height = height.max(1) as f32;
        let half = (width / 2).max(1);
        let rest = width.saturating_sub(half).max(1);
        Self {
            preview: Viewport {
                x: 0.0,
                y: 0.0,
                width: half as f32,
                height,
            },
            scene: Viewport {
                x: half as f32,
                y: 0.0,
                width: rest as f32,
                height,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_splits_in_half() {
        let layout = ViewLayout::split(1024, 600);
        assert_eq!(layout.preview.as_array(), [0.0, 0.0, 512.0, 600.0]);
        assert_eq!(layout.scene.as_array(), [512.0, 0.0, 512.0, 600.0]);
        assert_eq!(layout.scene.pixel_size(), (512, 600));
    }

    #[test]
    fn test_odd_and_degenerate_sizes() {
        let layout = ViewLayout::split(1025, 600);
        assert_eq!(layout.preview.width + layout.scene.width, 1025.0);

        let tiny = ViewLayout::split(0, 0);
        assert_eq!(tiny.scene.pixel_size(), (1, 1));
        assert!(tiny.scene.width >= 1.0 && tiny.scene.height >= 1.0);
    }
}
