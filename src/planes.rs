//! Contains the Viewport struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a window on the complex plane described by its center, its
//! half-extents along each axis, and a zoom factor.
use num::complex::Complex64;

use crate::errors::FractalError;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the x, y of a pixel in the integral plane.  Row indices
/// grow downward.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of an image onto the complex plane.  The image's
/// midpoint lands on `center`; at zoom 1 the image spans
/// `range` on either side of it.
#[derive(Copy, Clone, Debug)]
pub struct Viewport {
    /// The width and height of the image.
    pub integral_plane: IntegralPlane,
    /// The point at the middle of the image.  The imaginary part
    /// moves the window in the direction of decreasing row index.
    pub center: Complex64,
    /// Half the width and half the height of the window at zoom 1.
    pub range: (f64, f64),
    /// Magnification; larger values show a smaller window.
    pub zoom: f64,
}

impl Viewport {
    /// Rejects empty images and non-positive zoom.
    pub fn new(
        width: usize,
        height: usize,
        center: Complex64,
        range: (f64, f64),
        zoom: f64,
    ) -> Result<Viewport, FractalError> {
        // Images address pixels with u32.
        if width == 0
            || height == 0
            || width > u32::MAX as usize
            || height > u32::MAX as usize
        {
            return Err(FractalError::InvalidDimensions(width, height));
        }

        if !(zoom > 0.0) || zoom.is_infinite() {
            return Err(FractalError::InvalidZoom(zoom));
        }

        Ok(Viewport {
            integral_plane: IntegralPlane(width, height),
            center,
            range,
            zoom,
        })
    }

    /// The image width.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// The image height.
    pub fn height(&self) -> usize {
        self.integral_plane.1
    }

    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Given a pixel on the integral cartesian plane, return the point
    /// on the complex plane it stands for.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex64 {
        let (w, h) = (self.integral_plane.0 as f64, self.integral_plane.1 as f64);
        Complex64::new(
            self.range.0 * (pixel.0 as f64 - w / 2.0) / (0.5 * self.zoom * w) + self.center.re,
            self.range.1 * (pixel.1 as f64 - h / 2.0) / (0.5 * self.zoom * h) - self.center.im,
        )
    }
}
