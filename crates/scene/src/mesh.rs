//! Quad-per-paper mesh.
//!
//! Paper `i` owns vertices `4i..4i+4` and faces `2i` and `2i+1`. The mapping
//! is fixed at construction; only face colors and tiers change afterwards.

use std::ops::Range;

use foundation::bounds::Aabb3;
use foundation::color::Rgb;
use foundation::math::{Vec2, Vec3};

use crate::palette::CategoryPalette;
use crate::paper::Paper;

pub const FACES_PER_POINT: usize = 2;
pub const VERTICES_PER_POINT: usize = 4;

/// Triangles of one quad, as corner indices `0..4`.
const QUAD_FACES: [[usize; 3]; FACES_PER_POINT] = [[0, 1, 2], [0, 2, 3]];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadSize {
    pub width: f64,
    pub height: f64,
}

impl Default for QuadSize {
    fn default() -> Self {
        Self {
            width: 0.005,
            height: 0.005,
        }
    }
}

/// Grid layout of the thumbnail atlas image.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AtlasGrid {
    pub cols: u32,
    pub rows: u32,
}

impl Default for AtlasGrid {
    fn default() -> Self {
        Self { cols: 10, rows: 10 }
    }
}

/// Normalized texture rectangle `[u0, u1] x [v0, v1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UvRect {
    pub u0: f64,
    pub v0: f64,
    pub u1: f64,
    pub v1: f64,
}

impl AtlasGrid {
    /// Cells in the grid, saturating at `usize::MAX` for oversized grids.
    pub fn cell_count(&self) -> usize {
        (self.cols.max(1) as usize).saturating_mul(self.rows.max(1) as usize)
    }

    /// `(column, row)` of the atlas cell used by paper `index`.
    ///
    /// Cells repeat every `cols * rows` papers. The column is taken modulo
    /// `rows` and the row divides by `cols`, matching how the atlas images
    /// are packed; both agree for square grids.
    pub fn cell(&self, index: usize) -> (u32, u32) {
        let cols = self.cols.max(1) as usize;
        let rows = self.rows.max(1) as usize;
        let idx = index % self.cell_count();
        // idx < cols * rows, so both parts are below `rows`.
        ((idx % rows) as u32, (idx / cols) as u32)
    }

    pub fn uv_rect(&self, index: usize) -> UvRect {
        let cols = self.cols.max(1) as f64;
        let rows = self.rows.max(1) as f64;
        let (col, row) = self.cell(index);
        let u0 = col as f64 / cols;
        let v0 = row as f64 / rows;
        UvRect {
            u0,
            v0,
            u1: u0 + 1.0 / cols,
            v1: v0 + 1.0 / rows,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshOptions {
    pub quad: QuadSize,
    pub atlas: AtlasGrid,
    /// Added to every point's z so quads sit in front of the origin plane.
    pub depth_offset: f64,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            quad: QuadSize::default(),
            atlas: AtlasGrid::default(),
            depth_offset: 1.0,
        }
    }
}

/// Material slot of a face.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash)]
pub enum MaterialTier {
    #[default]
    Default,
    Primary,
    Secondary,
}

impl MaterialTier {
    pub fn is_highlighted(self) -> bool {
        !matches!(self, MaterialTier::Default)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Face {
    pub vertices: [u32; 3],
    pub uvs: [Vec2; 3],
    pub color: Rgb,
    pub tier: MaterialTier,
}

#[derive(Debug, Clone, Default)]
pub struct PointMesh {
    positions: Vec<Vec3>,
    faces: Vec<Face>,
    options: MeshOptions,
    dirty: bool,
}

impl PointMesh {
    /// Builds one textured quad per paper, colored by dominant category.
    ///
    /// An empty paper slice yields an empty mesh.
    pub fn build(papers: &[Paper], options: MeshOptions, palette: &CategoryPalette) -> Self {
        let mut positions = Vec::with_capacity(papers.len() * VERTICES_PER_POINT);
        let mut faces = Vec::with_capacity(papers.len() * FACES_PER_POINT);
        let QuadSize { width, height } = options.quad;

        for (i, paper) in papers.iter().enumerate() {
            let x = paper.point.x;
            let y = paper.point.y;
            let z = paper.point.z + options.depth_offset;

            let base = positions.len();
            positions.push(Vec3::new(x, y, z));
            positions.push(Vec3::new(x + width, y, z));
            positions.push(Vec3::new(x + width, y + height, z));
            positions.push(Vec3::new(x, y + height, z));

            let uv = options.atlas.uv_rect(i);
            let corner_uvs = [
                Vec2::new(uv.u0, uv.v0),
                Vec2::new(uv.u1, uv.v0),
                Vec2::new(uv.u1, uv.v1),
                Vec2::new(uv.u0, uv.v1),
            ];

            let color = palette.color_for_paper(paper);
            for corners in QUAD_FACES {
                faces.push(Face {
                    vertices: corners.map(|c| (base + c) as u32),
                    uvs: corners.map(|c| corner_uvs[c]),
                    color,
                    tier: MaterialTier::Default,
                });
            }
        }

        Self {
            positions,
            faces,
            options,
            dirty: true,
        }
    }

    pub fn options(&self) -> MeshOptions {
        self.options
    }

    pub fn paper_count(&self) -> usize {
        self.faces.len() / FACES_PER_POINT
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn face_range(paper: usize) -> Range<usize> {
        let start = paper * FACES_PER_POINT;
        start..start + FACES_PER_POINT
    }

    pub fn paper_for_face(face: usize) -> usize {
        face / FACES_PER_POINT
    }

    pub fn triangle(&self, face: usize) -> Option<[Vec3; 3]> {
        let f = self.faces.get(face)?;
        let mut out = [Vec3::ZERO; 3];
        for (slot, v) in out.iter_mut().zip(f.vertices) {
            *slot = *self.positions.get(v as usize)?;
        }
        Some(out)
    }

    /// The four corners of paper `paper`'s quad, counter-clockwise from bottom-left.
    pub fn quad_corners(&self, paper: usize) -> Option<[Vec3; 4]> {
        let base = paper * VERTICES_PER_POINT;
        let corners = self.positions.get(base..base + VERTICES_PER_POINT)?;
        Some([corners[0], corners[1], corners[2], corners[3]])
    }

    pub fn quad_bounds(&self, paper: usize) -> Option<Aabb3> {
        self.quad_corners(paper).map(Aabb3::from_points)
    }

    pub fn uv_rect(&self, paper: usize) -> UvRect {
        self.options.atlas.uv_rect(paper)
    }

    /// Color and tier shared by both faces of `paper`.
    pub fn paper_style(&self, paper: usize) -> Option<(Rgb, MaterialTier)> {
        self.faces
            .get(paper * FACES_PER_POINT)
            .map(|f| (f.color, f.tier))
    }

    /// Recolors both faces of `paper`. Out-of-range indices are ignored.
    pub fn set_paper_style(&mut self, paper: usize, color: Rgb, tier: MaterialTier) {
        let range = Self::face_range(paper);
        if range.end > self.faces.len() {
            return;
        }
        for face in &mut self.faces[range] {
            if face.color != color || face.tier != tier {
                face.color = color;
                face.tier = tier;
                self.dirty = true;
            }
        }
    }

    pub fn highlighted_count(&self) -> usize {
        (0..self.paper_count())
            .filter(|&p| {
                self.paper_style(p)
                    .is_some_and(|(_, tier)| tier.is_highlighted())
            })
            .count()
    }

    /// Whether colors changed since the last `take_dirty`.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
