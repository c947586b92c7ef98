// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors raised while configuring a render, and the faults a
//! recurrence may report while it is being iterated.

use failure::Fail;

/// Everything that can stop a render before (or, for a panicking
/// worker, during) pixel evaluation.
#[derive(Debug, Fail, PartialEq)]
pub enum FractalError {
    /// The iteration cap must be at least one.
    #[fail(display = "Iteration count must be at least 1, got {}", _0)]
    InvalidIterations(usize),

    /// The divergence threshold must be a positive, finite number.
    #[fail(display = "Divergence threshold must be greater than 0, got {}", _0)]
    InvalidDivergence(f64),

    /// Both image dimensions must be at least one pixel.
    #[fail(display = "Image dimensions must be at least 1x1, got {}x{}", _0, _1)]
    InvalidDimensions(usize, usize),

    /// Zoom must be a positive, finite number.
    #[fail(display = "Zoom must be greater than 0, got {}", _0)]
    InvalidZoom(f64),

    /// A palette needs at least one color.
    #[fail(display = "The palette contains no colors")]
    EmptyPalette,

    /// No palette is known by the requested name.
    #[fail(display = "Unknown palette '{}'", _0)]
    UnknownPalette(String),

    /// Smoothed escape times take `log(log(|z|))`, which is undefined
    /// when the threshold does not exceed one.
    #[fail(
        display = "Smoothing requires a divergence threshold greater than 1, got {}",
        _0
    )]
    SmoothingDomain(f64),

    /// A render worker thread panicked.
    #[fail(display = "A render worker panicked")]
    WorkerPanicked,
}

/// A numeric fault raised by a recurrence step.  The evaluator never
/// passes these on: a faulting step counts as an immediate escape.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum ArithmeticFault {
    /// The step overflowed, or produced a non-finite value.
    #[fail(display = "Arithmetic overflow")]
    Overflow,

    /// The step divided by zero.
    #[fail(display = "Division by zero")]
    DivisionByZero,

    /// The step left the domain of some function it uses.
    #[fail(display = "Domain error: {}", _0)]
    Domain(String),
}
