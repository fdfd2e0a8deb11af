use bytemuck::{Pod, Zeroable};

/// Column-major 4×4 matrix, laid out exactly as uploaded to the matrix uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    cols: [f32; 16],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    #[inline]
    pub const fn from_cols_array(cols: [f32; 16]) -> Self {
        Self { cols }
    }

    #[inline]
    pub const fn to_cols_array(self) -> [f32; 16] {
        self.cols
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32; 16] {
        &self.cols
    }

    /// Applies the matrix to `p` (w = 1) and returns the un-divided xyz.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 3] {
        let c = &self.cols;
        let mut out = [0.0f32; 3];
        for (row, o) in out.iter_mut().enumerate() {
            *o = c[row] * p[0] + c[4 + row] * p[1] + c[8 + row] * p[2] + c[12 + row];
        }
        out
    }

    /// Matrix product `self * rhs`.
    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let (a, b) = (&self.cols, &rhs.cols);
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
            }
        }
        Mat4 { cols: out }
    }

    /// Right-handed perspective projection with a `[0, 1]` depth range.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();
        let range = far / (near - far);
        let mut m = [0.0f32; 16];
        m[0] = f / aspect;
        m[5] = f;
        m[10] = range;
        m[11] = -1.0;
        m[14] = range * near;
        Mat4 { cols: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f32) -> Mat4 {
        let (s, c) = angle.sin_cos();
        let mut m = Self::IDENTITY.cols;
        m[0] = c;
        m[2] = -s;
        m[8] = s;
        m[10] = c;
        Mat4 { cols: m }
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = Self::IDENTITY.cols;
        m[12] = x;
        m[13] = y;
        m[14] = z;
        Mat4 { cols: m }
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f32; 16]> for Mat4 {
    fn from(cols: [f32; 16]) -> Self {
        Self::from_cols_array(cols)
    }
}
