// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The render loop: every pixel is mapped to the complex plane, its
//! escape time is measured, normalized, and looked up in the palette.
//!
//! Pixels never look at each other, so the multi-threaded renderer
//! simply hands each worker its own band of rows in the output buffer.

use crossbeam::thread::ScopedJoinHandle;
use image::{Rgb, RgbImage};
use itertools::iproduct;
use log::{debug, warn};

use crate::errors::FractalError;
use crate::escape::{stability, Fractal, Recurrence};
use crate::palette::Palette;
use crate::planes::{Pixel, Viewport};

/// Everything needed to paint one image.  Once built, this object
/// should not be mutable.
pub struct Renderer<R> {
    fractal: Fractal<R>,
    viewport: Viewport,
    palette: Palette,
    invert: bool,
}

impl<R: Recurrence> Renderer<R> {
    /// Rendering always smooths escape times, so the fractal's
    /// divergence threshold must be greater than one.
    pub fn new(
        fractal: Fractal<R>,
        viewport: Viewport,
        palette: Palette,
        invert: bool,
    ) -> Result<Self, FractalError> {
        fractal.check_smoothing()?;
        debug!(
            "Renderer for {}x{} pixels, {} iterations, divergence {}, {} colors",
            viewport.width(),
            viewport.height(),
            fractal.max_iterations(),
            fractal.divergence(),
            palette.len()
        );
        Ok(Renderer {
            fractal,
            viewport,
            palette,
            invert,
        })
    }

    /// The fractal being drawn.
    pub fn fractal(&self) -> &Fractal<R> {
        &self.fractal
    }

    /// The mapping from pixels to points.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    // The color of one pixel, and whether its recurrence read an
    // iterate it never computed.
    fn shade(&self, pixel: &Pixel) -> (Rgb<u8>, bool) {
        let point = self.viewport.pixel_to_point(pixel);
        let escape = self.fractal.evaluate(point, true);
        let s = stability(escape.value, self.fractal.max_iterations(), true);
        (
            self.palette.quantize(s, self.invert),
            escape.defaulted_reads > 0,
        )
    }

    /// The main function for single-threaded renders.  Pixels are
    /// visited in row-major order.
    pub fn render_single(&self) -> RgbImage {
        let (width, height) = (self.viewport.width(), self.viewport.height());
        let mut image = RgbImage::new(width as u32, height as u32);
        let mut defaulted = 0;
        for (row, column) in iproduct!(0..height, 0..width) {
            let (color, fell_through) = self.shade(&Pixel(column, row));
            if fell_through {
                defaulted += 1;
            }
            image.put_pixel(column as u32, row as u32, color);
        }
        self.report_defaults(defaulted);
        image
    }

    /// A multi-threaded version of the render function that takes a
    /// thread count as an option.
    pub fn render(&self, threads: usize) -> Result<RgbImage, FractalError> {
        self.render_with_progress(threads, |_| {})
    }

    /// As `render`, calling `progress` with the index of every row as
    /// soon as that row is finished.  Rows finish in no particular
    /// order.
    pub fn render_with_progress<P>(&self, threads: usize, progress: P) -> Result<RgbImage, FractalError>
    where
        P: Fn(usize) + Sync,
    {
        let (width, height) = (self.viewport.width(), self.viewport.height());
        let threads = threads.max(1).min(height);
        let rows_per_band = (height + threads - 1) / threads;
        let mut buffer = vec![0 as u8; self.viewport.len() * 3];

        let counts = crossbeam::scope(|spawner| {
            let progress = &progress;
            let handles: Vec<ScopedJoinHandle<usize>> = buffer
                .chunks_mut(rows_per_band * width * 3)
                .enumerate()
                .map(|(band, rows)| {
                    spawner.spawn(move |_| self.render_band(rows, band * rows_per_band, progress))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join())
                .collect::<Result<Vec<usize>, _>>()
        })
        .map_err(|_| FractalError::WorkerPanicked)?
        .map_err(|_| FractalError::WorkerPanicked)?;

        self.report_defaults(counts.iter().sum());
        RgbImage::from_raw(width as u32, height as u32, buffer)
            .ok_or(FractalError::InvalidDimensions(width, height))
    }

    // Paint a contiguous run of rows starting at `first_row`.  Returns
    // the number of pixels whose recurrence fell through to a default.
    fn render_band<P>(&self, rows: &mut [u8], first_row: usize, progress: &P) -> usize
    where
        P: Fn(usize),
    {
        let width = self.viewport.width();
        debug!(
            "Band of {} rows from row {}",
            rows.len() / (width * 3),
            first_row
        );
        let mut defaulted = 0;
        for (offset, row) in rows.chunks_mut(width * 3).enumerate() {
            let y = first_row + offset;
            for (x, cell) in row.chunks_mut(3).enumerate() {
                let (color, fell_through) = self.shade(&Pixel(x, y));
                if fell_through {
                    defaulted += 1;
                }
                cell.copy_from_slice(&color.0);
            }
            progress(y);
        }
        defaulted
    }

    fn report_defaults(&self, pixels: usize) {
        if pixels > 0 {
            warn!(
                "The recurrence read iterates it never computed for {} pixels; those reads used zero",
                pixels
            );
        }
    }
}
