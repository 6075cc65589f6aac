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

//! Planes and integer rectangles used by clipping, scissoring and viewports.

use super::vector::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A plane in the form `a*x + b*y + c*z + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Plane {
    /// The coefficients `(a, b, c, d)`.
    pub coefficients: Vec4,
}

impl Plane {
    /// The degenerate plane with all coefficients set to zero.
    pub const ZERO: Self = Self {
        coefficients: Vec4::ZERO,
    };

    /// Creates a plane from its four coefficients.
    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            coefficients: Vec4::new(a, b, c, d),
        }
    }

    /// Creates a plane from a normal and the signed distance from the origin.
    #[inline]
    pub fn from_normal_distance(normal: Vec3, d: f32) -> Self {
        Self {
            coefficients: normal.extend(d),
        }
    }

    /// Coefficients widened to `f64`, which is what `glClipPlane` consumes.
    #[inline]
    pub fn to_f64_array(&self) -> [f64; 4] {
        let c = self.coefficients;
        [c.x as f64, c.y as f64, c.z as f64, c.w as f64]
    }
}

/// An integer rectangle in target pixels, with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// The left edge.
    pub left: i32,
    /// The top edge.
    pub top: i32,
    /// The right edge (exclusive).
    pub right: i32,
    /// The bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// Creates a rectangle from its edges.
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rectangle from an origin and a size.
    #[inline]
    pub const fn from_origin_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    /// The width of the rectangle.
    #[inline]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    /// The height of the rectangle.
    #[inline]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_dimensions() {
        let r = Rect::from_origin_size(10, 20, 300, 200);
        assert_eq!(r.right, 310);
        assert_eq!(r.bottom, 220);
        assert_eq!(r.width(), 300);
        assert_eq!(r.height(), 200);
    }

    #[test]
    fn plane_widens_to_f64() {
        let p = Plane::new(1.0, 0.0, 0.0, 5.0);
        assert_eq!(p.to_f64_array(), [1.0, 0.0, 0.0, 5.0]);
        assert_eq!(Plane::default(), Plane::ZERO);
    }
}
