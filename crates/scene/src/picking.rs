use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::mesh::{FACES_PER_POINT, PointMesh};
use crate::spatial::{Bvh, Item as BvhItem};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub paper: usize,
    pub face: usize,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

/// Broad-phase index over the quads of a [`PointMesh`].
///
/// Built once per mesh; quad positions never change after construction.
#[derive(Debug, Clone, Default)]
pub struct PickIndex {
    bvh: Bvh,
}

impl PickIndex {
    pub fn build(mesh: &PointMesh) -> Self {
        let items = (0..mesh.paper_count())
            .filter_map(|paper| {
                mesh.quad_bounds(paper)
                    .map(|bounds| BvhItem { paper, bounds })
            })
            .collect();
        Self {
            bvh: Bvh::build(items),
        }
    }

    /// Nearest face hit by `ray`.
    ///
    /// Ordering contract:
    /// - The closest hit along the (normalized) ray wins.
    /// - Equal distances resolve to the lower face index.
    pub fn pick_ray(&self, mesh: &PointMesh, ray: Ray, opts: PickOptions) -> Option<PickHit> {
        let dir = ray.dir.normalized()?;
        let mut best: Option<(f64, usize)> = None;

        for paper in self.bvh.query_ray(ray.origin, dir, 0.0, opts.max_distance) {
            for face in PointMesh::face_range(paper) {
                let Some(tri) = mesh.triangle(face) else {
                    continue;
                };
                let Some(t) = ray_triangle_t(ray.origin, dir, tri) else {
                    continue;
                };
                if t > opts.max_distance {
                    continue;
                }
                best = match best {
                    Some((bt, bf)) => {
                        let ord = stable_total_cmp_f64(t, bt).then_with(|| face.cmp(&bf));
                        if ord.is_lt() { Some((t, face)) } else { Some((bt, bf)) }
                    }
                    None => Some((t, face)),
                };
            }
        }

        let (t, face) = best?;
        Some(PickHit {
            paper: face / FACES_PER_POINT,
            face,
            distance: t,
            point: ray.origin + dir * t,
        })
    }

    /// Screen picking wrapper.
    ///
    /// The caller supplies the screen->ray mapping via `make_ray`.
    pub fn pick_screen<F>(
        &self,
        mesh: &PointMesh,
        x_px: f64,
        y_px: f64,
        mut make_ray: F,
        opts: PickOptions,
    ) -> Option<PickHit>
    where
        F: FnMut(f64, f64) -> Option<Ray>,
    {
        let ray = make_ray(x_px, y_px)?;
        self.pick_ray(mesh, ray, opts)
    }
}

/// Double-sided Möller–Trumbore intersection; returns the ray parameter.
fn ray_triangle_t(origin: Vec3, dir: Vec3, [a, b, c]: [Vec3; 3]) -> Option<f64> {
    const EPS: f64 = 1e-15;
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}
