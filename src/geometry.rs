//! Page-space geometry and the overlay placement transform.
//!
//! PDF page space has its origin at the bottom-left corner with y growing
//! upward. A rendered page view (device space) has its origin at the top-left
//! and its own resolution, and it is shown in *display* orientation, i.e. with
//! the page's `/Rotate` already applied. The OCR engine reports text in a page
//! sized to that rendered image, so mapping it back onto the original page
//! means undoing the display rotation, undoing the resolution change, and
//! moving the result to the crop box corner where the rotated origin lands.
//!
//! Matrices follow the PDF convention: points are row vectors and
//! `p' = p × M`, so `M1 × M2` applies `M1` first.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// An axis-aligned rectangle in page-space units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Rect {
    /// Create a rectangle from any two opposite corners.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            left: x0.min(x1),
            bottom: y0.min(y1),
            right: x0.max(x1),
            top: y0.max(y1),
        }
    }

    /// US Letter, the fallback page size when a page declares none.
    pub fn letter() -> Self {
        Self::new(0.0, 0.0, 612.0, 792.0)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Overlapping area of two rectangles, if they overlap at all.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let bottom = self.bottom.max(other.bottom);
        let right = self.right.min(other.right);
        let top = self.top.min(other.top);
        (left < right && bottom < top).then_some(Rect {
            left,
            bottom,
            right,
            top,
        })
    }

    /// Corners in counter-clockwise order starting at the origin corner.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.left, self.bottom),
            (self.right, self.bottom),
            (self.right, self.top),
            (self.left, self.top),
        ]
    }

    /// Whether a point lies inside the rectangle, allowing `tolerance` slack.
    pub fn contains(&self, x: f64, y: f64, tolerance: f64) -> bool {
        x >= self.left - tolerance
            && x <= self.right + tolerance
            && y >= self.bottom - tolerance
            && y <= self.top + tolerance
    }

    /// The `[left bottom right top]` array form used in PDF dictionaries.
    pub fn to_array(&self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }
}

/// Page rotation, always a whole number of clockwise quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Normalize a `/Rotate` value. Negative and over-full turns wrap around.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(Error::Geometry(format!(
                "rotation {} is not a multiple of 90 degrees",
                degrees
            )));
        }
        Ok(Self::from_quadrant((degrees / 90).rem_euclid(4) as u8))
    }

    /// Rotation from a quadrant number, taken modulo 4.
    pub fn from_quadrant(quadrant: u8) -> Self {
        match quadrant % 4 {
            0 => Rotation::None,
            1 => Rotation::Cw90,
            2 => Rotation::Cw180,
            _ => Rotation::Cw270,
        }
    }

    /// Number of quarter turns, `0..=3`.
    pub fn quadrant(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    pub fn degrees(self) -> u16 {
        u16::from(self.quadrant()) * 90
    }

    /// Whether the rotation exchanges the horizontal and vertical axes.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A 2D affine transform `(x, y) → (a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Counter-clockwise rotation by whole quarter turns, with exact
    /// coefficients.
    pub fn quarter_turns(quadrant: u8) -> Self {
        let (cos, sin) = match quadrant % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Counter-clockwise rotation by an arbitrary angle in radians.
    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: the result applies `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn then_rotate_quarter_turns(&self, quadrant: u8) -> Matrix {
        self.multiply(&Matrix::quarter_turns(quadrant))
    }

    pub fn then_scale(&self, sx: f64, sy: f64) -> Matrix {
        self.multiply(&Matrix::scaling(sx, sy))
    }

    pub fn then_translate(&self, tx: f64, ty: f64) -> Matrix {
        self.multiply(&Matrix::translation(tx, ty))
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        Self::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        )
    }

    /// Coefficient-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Matrix, epsilon: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(x, y)| (x - y).abs() <= epsilon)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The placement of an OCR-derived page over a destination page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayTransform {
    pub rotation: Rotation,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Destination crop box corner the rotated origin is moved to.
    pub anchor: (f64, f64),
    pub matrix: Matrix,
}

impl OverlayTransform {
    /// Compute the transform that lays `ocr_box` exactly over `dest_box`.
    ///
    /// The OCR page is in display orientation, so for quarter and three-quarter
    /// turns its width corresponds to the destination height and vice versa.
    /// The matrix is built as `identity × rotate × scale × translate`; the order
    /// matters.
    pub fn compute(dest_box: &Rect, rotation: Rotation, ocr_box: &Rect) -> Result<Self> {
        let q = rotation.quadrant();

        let dest_width = dest_box.width();
        let dest_height = dest_box.height();
        let (ocr_width, ocr_height) = if rotation.swaps_axes() {
            (ocr_box.height(), ocr_box.width())
        } else {
            (ocr_box.width(), ocr_box.height())
        };

        let scale_x = scale_ratio("horizontal", dest_width, ocr_width)?;
        let scale_y = scale_ratio("vertical", dest_height, ocr_height)?;

        let anchor = match q {
            0 => (dest_box.left, dest_box.bottom),
            1 => (dest_box.right, dest_box.bottom),
            2 => (dest_box.right, dest_box.top),
            _ => (dest_box.left, dest_box.top),
        };

        let matrix = Matrix::identity()
            .then_rotate_quarter_turns(q)
            .then_scale(scale_x, scale_y)
            .then_translate(anchor.0, anchor.1);

        if !matrix.is_finite() {
            return Err(Error::Geometry(format!(
                "overlay matrix is not finite: {:?}",
                matrix.to_array()
            )));
        }

        Ok(Self {
            rotation,
            scale_x,
            scale_y,
            anchor,
            matrix,
        })
    }
}

/// `dest / ocr`, rejecting degenerate or non-finite inputs.
fn scale_ratio(axis: &str, dest: f64, ocr: f64) -> Result<f64> {
    if !(ocr.is_finite() && ocr > 0.0) {
        return Err(Error::Geometry(format!(
            "{} extent of the OCR page must be positive, got {}",
            axis, ocr
        )));
    }
    let ratio = dest / ocr;
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(Error::Geometry(format!(
            "{} scale {} / {} is not a positive finite number",
            axis, dest, ocr
        )));
    }
    Ok(ratio)
}
