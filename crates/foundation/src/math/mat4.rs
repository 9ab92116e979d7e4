use super::Vec3;

/// Column-major 4x4 matrix (`cols[c][r]`), right-handed, clip depth in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn mul(&self, b: &Mat4) -> Mat4 {
        let a = &self.cols;
        let mut c = [[0.0f64; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a[0][row] * b.cols[col][0]
                    + a[1][row] * b.cols[col][1]
                    + a[2][row] * b.cols[col][2]
                    + a[3][row] * b.cols[col][3];
            }
        }
        Mat4 { cols: c }
    }

    pub fn perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let aspect = aspect.max(1e-6);
        // [ f/a  0   0    0  ]
        // [ 0    f   0    0  ]
        // [ 0    0  m22  m23 ]
        // [ 0    0  -1    0  ]
        Mat4 {
            cols: [
                [f / aspect, 0.0, 0.0, 0.0],
                [0.0, f, 0.0, 0.0],
                [0.0, 0.0, far / (near - far), -1.0],
                [0.0, 0.0, (near * far) / (near - far), 0.0],
            ],
        }
    }

    /// View matrix looking from `eye` towards `target`.
    ///
    /// Returns `None` when `eye == target` or `up` is parallel to the view axis.
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Mat4> {
        let f = (target - eye).normalized()?;
        let s = f.cross(up).normalized()?;
        let u = s.cross(f);

        Some(Mat4 {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        })
    }

    /// Transforms a point and applies the perspective divide.
    pub fn project_point(&self, p: Vec3) -> Option<Vec3> {
        let [x, y, z, w] = self.transform([p.x, p.y, p.z, 1.0]);
        if w.abs() < 1e-12 {
            return None;
        }
        Some(Vec3::new(x / w, y / w, z / w))
    }

    /// Homogeneous transform without the divide.
    pub fn transform(&self, v: [f64; 4]) -> [f64; 4] {
        let m = &self.cols;
        let mut out = [0.0; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = m[0][row] * v[0] + m[1][row] * v[1] + m[2][row] * v[2] + m[3][row] * v[3];
        }
        out
    }

    pub fn inverse(&self) -> Option<Mat4> {
        // Flatten column-major into m[c * 4 + r] and invert via cofactors.
        let mut m = [0.0f64; 16];
        for c in 0..4 {
            for r in 0..4 {
                m[c * 4 + r] = self.cols[c][r];
            }
        }

        let mut inv = [0.0f64; 16];
        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det.abs() < 1e-300 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;

        let mut cols = [[0.0f64; 4]; 4];
        for c in 0..4 {
            for r in 0..4 {
                cols[c][r] = inv[c * 4 + r] * inv_det;
            }
        }
        Some(Mat4 { cols })
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::Vec3;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn look_at_maps_target_onto_negative_z() {
        let view = Mat4::look_at_rh(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(1.0, 2.0, -2.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .expect("view");
        let p = view.project_point(Vec3::new(1.0, 2.0, -2.0)).expect("p");
        assert!(approx(p, Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn inverse_round_trips_view_projection() {
        let view = Mat4::look_at_rh(
            Vec3::new(0.5, -0.25, 2.5),
            Vec3::new(0.5, -0.25, -2.5),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .expect("view");
        let proj = Mat4::perspective_rh_z0(75f64.to_radians(), 16.0 / 9.0, 0.001, 1000.0);
        let vp = proj.mul(&view);
        let inv = vp.inverse().expect("invertible");

        let world = Vec3::new(0.6, -0.2, 0.0);
        let ndc = vp.project_point(world).expect("ndc");
        let back = inv.project_point(ndc).expect("back");
        assert!((back - world).length() < 1e-6);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Mat4 { cols: [[0.0; 4]; 4] };
        assert!(m.inverse().is_none());
        assert_eq!(Mat4::IDENTITY.inverse(), Some(Mat4::IDENTITY));
    }
}
