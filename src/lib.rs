#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time fractal renderer
//!
//! An escape-time fractal takes a point on the complex plane and
//! repeatedly feeds it through some formula, measuring how quickly
//! the result goes to infinity.  This "velocity" is the number used to
//! render the image: points that never escape form the set itself,
//! and the points around it are shaded by how long they held out.
//!
//! The formula is pluggable.  Each step is handed the entire orbit so
//! far, so a formula can be built from any of the earlier iterates,
//! not just the last one.  The first iterate is either the pixel's
//! own coordinate (Julia-style) or a fixed parameter (Mandelbrot-style,
//! in which case the coordinate is the constant the formula adds).
//!
//! Escape times are smoothed with the usual `log(log(|z|))` correction,
//! normalized against the iteration cap, and quantized into a palette.

pub mod errors;
pub mod escape;
pub mod formulas;
pub mod palette;
pub mod planes;
pub mod render;

pub use errors::{ArithmeticFault, FractalError};
pub use escape::{from_fn, stability, Escape, Fractal, IterationCache, Recurrence, Seed};
pub use formulas::Formula;
pub use palette::Palette;
pub use planes::{Pixel, Viewport};
pub use render::Renderer;
