// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the `Mat4` type and associated operations.

use super::vector::{Vec3, Vec4};
use std::ops::Mul;

/// A 4x4 column-major matrix, used for world, view, projection and texture
/// transforms.
///
/// The memory layout is column-major, which is what `glLoadMatrixf` and
/// `glUniformMatrix4fv` (with `transpose = false`) expect, so a matrix can be
/// handed to the driver without reordering.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// A 4x4 matrix with all elements set to 0.
    pub const ZERO: Self = Self {
        cols: [Vec4::ZERO; 4],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Creates a matrix from 16 floats in column-major order.
    #[inline]
    pub fn from_cols_array(values: &[f32; 16]) -> Self {
        bytemuck::cast(*values)
    }

    /// Returns the 16 elements in column-major order.
    #[inline]
    pub fn to_cols_array(&self) -> [f32; 16] {
        bytemuck::cast(*self)
    }

    /// Returns a row of the matrix as a `Vec4`.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec4 {
        Vec4 {
            x: self.cols[0].get(index),
            y: self.cols[1].get(index),
            z: self.cols[2].get(index),
            w: self.cols[3].get(index),
        }
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self::from_cols(Vec4::X, Vec4::Y, Vec4::Z, v.extend(1.0))
    }

    /// Creates a non-uniform scaling matrix.
    #[inline]
    pub fn from_scale(scale: Vec3) -> Self {
        Self::from_cols(
            Vec4::new(scale.x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, scale.y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, scale.z, 0.0),
            Vec4::W,
        )
    }

    /// Returns the transpose of the matrix, where rows and columns are swapped.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(
            self.get_row(0),
            self.get_row(1),
            self.get_row(2),
            self.get_row(3),
        )
    }

    /// Transforms a point (w = 1), without the perspective divide.
    #[inline]
    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        (*self * p.extend(1.0)).truncate()
    }

    /// Transforms a direction (w = 0), ignoring translation.
    #[inline]
    pub fn transform_vector3(&self, v: Vec3) -> Vec3 {
        (*self * v.extend(0.0)).truncate()
    }
}

impl Default for Mat4 {
    /// Returns the 4x4 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    /// Multiplies this matrix by another `Mat4`. Note that matrix multiplication is not commutative.
    #[inline]
    fn mul(self, rhs: Mat4) -> Self::Output {
        let mut result_cols = [Vec4::ZERO; 4];
        for (c_idx, target_col) in result_cols.iter_mut().enumerate() {
            let col_from_rhs = rhs.cols[c_idx];
            *target_col = Vec4 {
                x: self.get_row(0).dot(col_from_rhs),
                y: self.get_row(1).dot(col_from_rhs),
                z: self.get_row(2).dot(col_from_rhs),
                w: self.get_row(3).dot(col_from_rhs),
            };
        }
        Mat4 { cols: result_cols }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    /// Transforms a `Vec4` by this matrix.
    #[inline]
    fn mul(self, rhs: Vec4) -> Self::Output {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_is_neutral() {
        let t = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t * Mat4::IDENTITY, t);
        assert_eq!(Mat4::IDENTITY * t, t);
    }

    #[test]
    fn cols_array_is_column_major() {
        let t = Mat4::from_translation(Vec3::new(7.0, 8.0, 9.0));
        let raw = t.to_cols_array();
        assert_eq!(&raw[12..15], &[7.0, 8.0, 9.0]);
        assert_eq!(Mat4::from_cols_array(&raw), t);
    }

    #[test]
    fn view_times_world_applies_world_first() {
        let world = Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0));
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let p = (view * world).transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 2.0);
        assert_relative_eq!(p.z, -10.0);
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let t = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let tt = t.transpose();
        assert_eq!(tt.get_row(3), Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(tt.cols[3], Vec4::W);
        assert_eq!(tt.transpose(), t);
    }
}
