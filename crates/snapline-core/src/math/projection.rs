use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

/// Camera view-projection matrix exactly as the host stores it.
///
/// Row-major, applied to row vectors (`clip = [x y z 1] * M`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewMatrix(pub [f32; 16]);

impl ViewMatrix {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Column-major equivalent usable as `m * v`.
    ///
    /// Loading row-major data as columns yields the transpose, which turns
    /// the row-vector convention into glam's column-vector one.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array(&self.0)
    }

    /// A zeroed matrix means the camera has not been set up yet.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl Default for ViewMatrix {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f32,
    pub height: f32,
}

impl ScreenSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width && point.y <= self.height
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// Project a world position into screen pixels.
///
/// Returns `None` when the point is behind the camera (clip W not positive)
/// or lands outside the viewport.
pub fn world_to_screen(world: Vec3, matrix: &ViewMatrix, screen: ScreenSize) -> Option<Vec2> {
    let clip = matrix.to_mat4() * world.extend(1.0);
    if clip.w <= 0.0 || !clip.w.is_finite() {
        return None;
    }

    let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
    let point = Vec2::new(
        (ndc.x + 1.0) * 0.5 * screen.width,
        (1.0 - ndc.y) * 0.5 * screen.height,
    );

    screen.contains(point).then_some(point)
}
