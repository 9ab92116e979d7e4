use foundation::color::Rgb;
use foundation::math::{Mat4, Vec2, Vec3};
use scene::camera::CameraController;
use scene::mesh::{MaterialTier, PointMesh, UvRect};

/// Face opacity per tier while a selection is active.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TierOpacity {
    pub primary: f64,
    pub secondary: f64,
    pub dimmed: f64,
}

impl Default for TierOpacity {
    fn default() -> Self {
        Self {
            primary: 1.0,
            secondary: 0.5,
            dimmed: 0.1,
        }
    }
}

impl TierOpacity {
    /// Everything is solid when nothing is selected.
    pub fn for_tier(&self, tier: MaterialTier, selection_active: bool) -> f64 {
        if !selection_active {
            return 1.0;
        }
        match tier {
            MaterialTier::Primary => self.primary,
            MaterialTier::Secondary => self.secondary,
            MaterialTier::Default => self.dimmed,
        }
    }
}

/// One paper quad in screen space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadDraw {
    pub paper: usize,
    /// Pixel corners in mesh corner order, y down.
    pub corners: [Vec2; 4],
    /// Normalized depth in `[0, 1]`; larger is farther.
    pub depth: f64,
    pub color: Rgb,
    pub opacity: f64,
    pub uv: UvRect,
}

impl QuadDraw {
    /// Axis-aligned pixel rectangle `(x, y, width, height)` around the corners.
    pub fn screen_rect(&self) -> (f64, f64, f64, f64) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for c in &self.corners[1..] {
            min = Vec2::new(min.x.min(c.x), min.y.min(c.y));
            max = Vec2::new(max.x.max(c.x), max.y.max(c.y));
        }
        (min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

#[derive(Debug, Default)]
pub struct RenderFrame {
    /// Back to front.
    pub draws: Vec<QuadDraw>,
    pub culled: usize,
}

pub struct Renderer;

impl Renderer {
    /// Projects every quad of `mesh` through `camera`.
    ///
    /// Quads with a corner behind the camera or outside the depth range, and
    /// quads entirely off screen, are culled. Draws are sorted farthest
    /// first; equal depths keep paper order.
    pub fn collect(
        mesh: &PointMesh,
        camera: &CameraController,
        selection_active: bool,
        opacity: TierOpacity,
    ) -> RenderFrame {
        let mut frame = RenderFrame::default();
        let Some(view_proj) = camera.view_proj() else {
            frame.culled = mesh.paper_count();
            return frame;
        };
        let viewport = camera.viewport();

        for paper in 0..mesh.paper_count() {
            let (Some(corners), Some((color, tier))) =
                (mesh.quad_corners(paper), mesh.paper_style(paper))
            else {
                continue;
            };
            match project_quad(&view_proj, corners, viewport) {
                Some((corners, depth)) => frame.draws.push(QuadDraw {
                    paper,
                    corners,
                    depth,
                    color,
                    opacity: opacity.for_tier(tier, selection_active),
                    uv: mesh.uv_rect(paper),
                }),
                None => frame.culled += 1,
            }
        }

        frame.draws.sort_by(|a, b| {
            b.depth
                .total_cmp(&a.depth)
                .then_with(|| a.paper.cmp(&b.paper))
        });
        frame
    }
}

fn project_quad(view_proj: &Mat4, corners: [Vec3; 4], viewport: Vec2) -> Option<([Vec2; 4], f64)> {
    let mut out = [Vec2::ZERO; 4];
    let mut depth: f64 = 0.0;
    let mut ndc_min = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut ndc_max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);

    for (slot, corner) in out.iter_mut().zip(corners) {
        let [x, y, z, w] = view_proj.transform([corner.x, corner.y, corner.z, 1.0]);
        if w <= 1e-12 {
            return None;
        }
        let ndc = Vec3::new(x / w, y / w, z / w);
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        depth = depth.max(ndc.z);
        ndc_min = Vec2::new(ndc_min.x.min(ndc.x), ndc_min.y.min(ndc.y));
        ndc_max = Vec2::new(ndc_max.x.max(ndc.x), ndc_max.y.max(ndc.y));
        *slot = Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.x,
            (1.0 - ndc.y) * 0.5 * viewport.y,
        );
    }

    let off_screen = ndc_max.x < -1.0 || ndc_min.x > 1.0 || ndc_max.y < -1.0 || ndc_min.y > 1.0;
    if off_screen {
        return None;
    }
    Some((out, depth))
}
