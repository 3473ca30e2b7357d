/*!
Wireframe scene: a fixed camera and a small airplane model.

The model's nose points along +Z, its wings along X and its fin along +Y,
so roll turns it about its own fuselage and pitch lifts the nose.
*/

use eframe::egui::{Pos2, Rect};
use glam::{Mat4, Vec3};

/// Fixed right-handed camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 4.5, -24.0),
            target: Vec3::new(0.0, -1.0, 0.0),
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl ViewCamera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Screen position of a world point inside `viewport`, `None` if behind the eye
    pub fn project(&self, view_projection: &Mat4, point: Vec3, viewport: Rect) -> Option<Pos2> {
        let clip = *view_projection * point.extend(1.0);
        if clip.w <= self.near {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Pos2::new(
            viewport.left() + (ndc.x + 1.0) * 0.5 * viewport.width(),
            viewport.top() + (1.0 - ndc.y) * 0.5 * viewport.height(),
        ))
    }
}

/// Vertices of the airplane in model space
pub const AIRPLANE_VERTICES: [[f32; 3]; 14] = [
    // fuselage
    [0.0, 0.0, 5.0],
    [0.0, 0.0, -5.0],
    // main wing
    [-6.0, 0.0, 0.0],
    [0.0, 0.0, 2.0],
    [6.0, 0.0, 0.0],
    [0.0, 0.0, -1.0],
    // tailplane
    [-2.5, 0.0, -4.5],
    [0.0, 0.0, -3.5],
    [2.5, 0.0, -4.5],
    // fin
    [0.0, 2.0, -5.0],
    // canopy
    [0.0, 0.6, 2.5],
    [0.0, 0.6, 1.0],
    // wing tips
    [-6.0, 0.3, -0.3],
    [6.0, 0.3, -0.3],
];

/// Line segments between vertices
pub const AIRPLANE_EDGES: [(usize, usize); 18] = [
    (0, 1),
    (2, 3),
    (3, 4),
    (4, 5),
    (5, 2),
    (6, 7),
    (7, 8),
    (8, 1),
    (1, 6),
    (7, 9),
    (9, 1),
    (0, 10),
    (10, 11),
    (11, 5),
    (2, 12),
    (12, 5),
    (4, 13),
    (13, 5),
];

/// Model edges transformed by `world` and projected into `viewport`
pub fn airplane_segments(
    camera: &ViewCamera,
    world: &Mat4,
    viewport: Rect,
) -> Vec<[Pos2; 2]> {
    let aspect = if viewport.height() > 0.0 {
        viewport.width() / viewport.height()
    } else {
        1.0
    };
    let view_projection = camera.view_projection(aspect) * *world;

    let projected: Vec<Option<Pos2>> = AIRPLANE_VERTICES
        .iter()
        .map(|v| camera.project(&view_projection, Vec3::from_array(*v), viewport))
        .collect();

    AIRPLANE_EDGES
        .iter()
        .filter_map(|&(a, b)| Some([projected[a]?, projected[b]?]))
        .collect()
}
