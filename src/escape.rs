// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time evaluator.
//!
//! A point is fed to a recurrence over and over, and we count how many
//! steps it takes for the result to run away past the divergence
//! threshold.  Unlike the classic `z = z * z + c` loop, the recurrence
//! here is handed the whole history of the orbit (the
//! `IterationCache`), so formulas may depend on any earlier iterate,
//! not just the most recent one.

use log::trace;
use num::clamp;
use num::complex::Complex64;
use std::cell::Cell;

use crate::errors::{ArithmeticFault, FractalError};

/// The orbit of a single point, indexed by iteration.  A cache lives
/// for exactly one call to `Fractal::evaluate` and is never shared
/// between points.
#[derive(Debug)]
pub struct IterationCache {
    entries: Vec<Option<Complex64>>,
    defaulted: Cell<usize>,
}

impl IterationCache {
    /// An empty cache with room for `capacity` iterates.
    pub fn with_capacity(capacity: usize) -> Self {
        IterationCache {
            entries: Vec::with_capacity(capacity),
            defaulted: Cell::new(0),
        }
    }

    /// The iterate stored at `index`.  Unset entries read as zero, and
    /// every such read is counted; a well-behaved recurrence never
    /// triggers one.
    pub fn get(&self, index: usize) -> Complex64 {
        match self.entries.get(index) {
            Some(Some(z)) => *z,
            _ => {
                self.defaulted.set(self.defaulted.get() + 1);
                Complex64::new(0.0, 0.0)
            }
        }
    }

    /// Whether anything has been stored at `index`.
    pub fn contains(&self, index: usize) -> bool {
        match self.entries.get(index) {
            Some(entry) => entry.is_some(),
            None => false,
        }
    }

    /// Store an iterate.  Recurrences may use this to fill entries
    /// ahead of the evaluator.
    pub fn insert(&mut self, index: usize, value: Complex64) {
        if index >= self.entries.len() {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(value);
    }

    /// How many reads fell through to the zero default.
    pub fn defaulted_reads(&self) -> usize {
        self.defaulted.get()
    }
}

/// A single step of an escape-time formula.
///
/// `step` receives the pixel's coordinate, the orbit so far, the index
/// of the iterate being computed, and the fractal's parameter, and
/// returns the iterate at that index.  It may read any entry of the
/// cache, and may store entries at or after `iteration`, but must not
/// rewrite the ones already computed.
pub trait Recurrence: Sync {
    /// Compute the iterate at `iteration`.
    fn step(
        &self,
        coordinate: Complex64,
        cache: &mut IterationCache,
        iteration: usize,
        param: Complex64,
    ) -> Result<Complex64, ArithmeticFault>;
}

impl<F> Recurrence for F
where
    F: Fn(Complex64, &mut IterationCache, usize, Complex64) -> Result<Complex64, ArithmeticFault>
        + Sync,
{
    fn step(
        &self,
        coordinate: Complex64,
        cache: &mut IterationCache,
        iteration: usize,
        param: Complex64,
    ) -> Result<Complex64, ArithmeticFault> {
        self(coordinate, cache, iteration, param)
    }
}

/// Pins a closure to the `Recurrence` signature so its argument types
/// can be inferred at the call site.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(Complex64, &mut IterationCache, usize, Complex64) -> Result<Complex64, ArithmeticFault>
        + Sync,
{
    f
}

/// Whether a pixel's coordinate is the first iterate (Julia-like), or
/// the fractal's parameter is (Mandelbrot-like, with the coordinate
/// acting as the constant).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Seed {
    /// `cache[0]` is the pixel's coordinate.
    Coordinate,
    /// `cache[0]` is the fractal's parameter.
    Parameter,
}

/// The result of evaluating one point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Escape {
    /// Escape time in `[0, max_iterations]`, fractional when smoothed.
    pub value: f64,
    /// False when the point never passed the threshold.
    pub escaped: bool,
    /// Cache reads that fell through to the zero default.
    pub defaulted_reads: usize,
}

// Faults and overshoots both collapse into `Escaped`.
enum Step {
    Bounded,
    Escaped(f64),
}

/// An escape-time fractal: a recurrence plus everything needed to
/// decide when its orbits escape.  Immutable once built.
pub struct Fractal<R> {
    recurrence: R,
    param: Complex64,
    divergence: f64,
    max_iterations: usize,
    seed: Seed,
}

impl<R: Recurrence> Fractal<R> {
    /// Rejects a zero iteration cap and non-positive (or NaN)
    /// divergence thresholds.
    pub fn new(
        recurrence: R,
        param: Complex64,
        divergence: f64,
        max_iterations: usize,
        seed: Seed,
    ) -> Result<Self, FractalError> {
        if max_iterations < 1 {
            return Err(FractalError::InvalidIterations(max_iterations));
        }
        if !(divergence > 0.0) || divergence.is_infinite() {
            return Err(FractalError::InvalidDivergence(divergence));
        }
        Ok(Fractal {
            recurrence,
            param,
            divergence,
            max_iterations,
            seed,
        })
    }

    /// The parameter handed to every step.
    pub fn param(&self) -> Complex64 {
        self.param
    }

    /// The magnitude past which an orbit has escaped.
    pub fn divergence(&self) -> f64 {
        self.divergence
    }

    /// The iteration cap.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// The seed mode.
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Smoothed escape times need `|z| > 1` at the moment of escape,
    /// which only a threshold above one guarantees.
    pub fn check_smoothing(&self) -> Result<(), FractalError> {
        if self.divergence > 1.0 {
            Ok(())
        } else {
            Err(FractalError::SmoothingDomain(self.divergence))
        }
    }

    /// Iterate `coordinate` until it escapes or the cap is reached.
    pub fn evaluate(&self, coordinate: Complex64, smooth: bool) -> Escape {
        let mut cache = IterationCache::with_capacity(self.max_iterations);
        cache.insert(
            0,
            match self.seed {
                Seed::Coordinate => coordinate,
                Seed::Parameter => self.param,
            },
        );

        for iteration in 1..self.max_iterations {
            let step = if cache.contains(iteration) {
                self.classify(cache.get(iteration))
            } else {
                match self
                    .recurrence
                    .step(coordinate, &mut cache, iteration, self.param)
                {
                    Ok(z) => {
                        cache.insert(iteration, z);
                        self.classify(z)
                    }
                    // A fault always escapes, even where divergence + 1
                    // rounds back down to divergence.
                    Err(fault) => {
                        trace!("{} at iteration {} for {}", fault, iteration, coordinate);
                        cache.insert(iteration, Complex64::new(self.divergence + 1.0, 0.0));
                        Step::Escaped(self.divergence + 1.0)
                    }
                }
            };

            if let Step::Escaped(magnitude) = step {
                return Escape {
                    value: self.escape_time(iteration, magnitude, smooth),
                    escaped: true,
                    defaulted_reads: cache.defaulted_reads(),
                };
            }
        }

        Escape {
            value: self.max_iterations as f64,
            escaped: false,
            defaulted_reads: cache.defaulted_reads(),
        }
    }

    /// Escape time divided by the iteration cap; 1 means the point
    /// never escaped.
    pub fn stability(&self, coordinate: Complex64, smooth: bool, clamp: bool) -> f64 {
        stability(
            self.evaluate(coordinate, smooth).value,
            self.max_iterations,
            clamp,
        )
    }

    /// A point belongs to the set when its orbit never escapes.
    pub fn contains(&self, coordinate: Complex64) -> bool {
        self.stability(coordinate, false, true) == 1.0
    }

    // Non-finite iterates are overflow that the float arithmetic
    // didn't report, and get the same treatment as a fault.
    fn classify(&self, z: Complex64) -> Step {
        if !(z.re.is_finite() && z.im.is_finite()) {
            return Step::Escaped(self.divergence + 1.0);
        }
        let magnitude = z.norm();
        if magnitude > self.divergence {
            Step::Escaped(magnitude)
        } else {
            Step::Bounded
        }
    }

    fn escape_time(&self, iteration: usize, magnitude: f64, smooth: bool) -> f64 {
        let count = iteration as f64;
        if !smooth || magnitude <= 1.0 {
            return count;
        }
        let smoothed = count + 1.0 - magnitude.ln().ln() / 2.0_f64.ln();
        if smoothed.is_finite() {
            clamp(smoothed, 0.0, self.max_iterations as f64)
        } else {
            count
        }
    }
}

/// Normalize an escape time against the iteration cap, optionally
/// clamping the result to `[0, 1]`.
pub fn stability(escape_value: f64, max_iterations: usize, clamp_result: bool) -> f64 {
    let value = escape_value / max_iterations as f64;
    if clamp_result {
        clamp(value, 0.0, 1.0)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mandelbrot(
        divergence: f64,
        max_iterations: usize,
        seed: Seed,
    ) -> Fractal<impl Recurrence> {
        let step = from_fn(|c, cache, i, _param| {
            let z = cache.get(i - 1);
            Ok(z * z + c)
        });
        Fractal::new(step, Complex64::new(0.0, 0.0), divergence, max_iterations, seed).unwrap()
    }

    #[test]
    fn cache_counts_default_reads() {
        let mut cache = IterationCache::with_capacity(4);
        cache.insert(0, Complex64::new(1.0, 1.0));
        assert_eq!(cache.get(0), Complex64::new(1.0, 1.0));
        assert_eq!(cache.defaulted_reads(), 0);
        assert_eq!(cache.get(3), Complex64::new(0.0, 0.0));
        assert_eq!(cache.defaulted_reads(), 1);
        assert!(!cache.contains(3));
        cache.insert(6, Complex64::new(2.0, 0.0));
        assert!(cache.contains(6));
        assert!(!cache.contains(5));
    }

    #[test]
    fn origin_never_escapes() {
        let fractal = mandelbrot(2.0, 50, Seed::Parameter);
        let escape = fractal.evaluate(Complex64::new(0.0, 0.0), true);
        assert!(!escape.escaped);
        assert_eq!(escape.value, 50.0);
        assert!(fractal.contains(Complex64::new(0.0, 0.0)));
        assert!(fractal.contains(Complex64::new(-1.0, 0.0)));
    }

    #[test]
    fn two_escapes_on_the_second_step_from_zero() {
        // z1 = 2 sits on the threshold, z2 = 6 is past it.
        let fractal = mandelbrot(2.0, 50, Seed::Parameter);
        let escape = fractal.evaluate(Complex64::new(2.0, 0.0), false);
        assert!(escape.escaped);
        assert_eq!(escape.value, 2.0);
        assert!(!fractal.contains(Complex64::new(2.0, 0.0)));
    }

    #[test]
    fn two_escapes_on_the_first_step_when_seeded_from_itself() {
        let fractal = mandelbrot(2.0, 50, Seed::Coordinate);
        let escape = fractal.evaluate(Complex64::new(2.0, 0.0), false);
        assert!(escape.escaped);
        assert_eq!(escape.value, 1.0);
    }

    #[test]
    fn smoothing_matches_the_log_log_correction() {
        let fractal = mandelbrot(2.0, 50, Seed::Coordinate);
        let escape = fractal.evaluate(Complex64::new(2.0, 0.0), true);
        let expected = 1.0 + 1.0 - 6.0_f64.ln().ln() / 2.0_f64.ln();
        assert!((escape.value - expected).abs() < 1e-12);
    }

    #[test]
    fn faults_escape_at_the_faulting_step() {
        let step = from_fn(|_c, cache, i, _param| {
            if i == 3 {
                Err(ArithmeticFault::DivisionByZero)
            } else {
                Ok(cache.get(i - 1) * 0.5)
            }
        });
        let fractal =
            Fractal::new(step, Complex64::new(1.0, 0.0), 2.0, 20, Seed::Parameter).unwrap();
        let plain = fractal.evaluate(Complex64::new(0.0, 0.0), false);
        assert!(plain.escaped);
        assert_eq!(plain.value, 3.0);

        let smooth = fractal.evaluate(Complex64::new(0.0, 0.0), true);
        assert!(smooth.escaped);
        assert!(smooth.value >= 3.0 && smooth.value < 4.0);
    }

    #[test]
    fn faults_escape_under_huge_thresholds() {
        let step = from_fn(|_c, _cache, _i, _param| Err(ArithmeticFault::Overflow));
        let fractal =
            Fractal::new(step, Complex64::new(0.0, 0.0), 1e17, 10, Seed::Coordinate).unwrap();
        let escape = fractal.evaluate(Complex64::new(0.0, 0.0), false);
        assert!(escape.escaped);
        assert_eq!(escape.value, 1.0);
        let smooth = fractal.evaluate(Complex64::new(0.0, 0.0), true);
        assert!(smooth.escaped);
        assert!(smooth.value >= 0.0 && smooth.value <= 10.0);
    }

    #[test]
    fn non_finite_iterates_count_as_faults() {
        let step = from_fn(|_c, cache, i, _param| {
            if i == 2 {
                Ok(Complex64::new(std::f64::NAN, 0.0))
            } else {
                Ok(cache.get(i - 1))
            }
        });
        let fractal =
            Fractal::new(step, Complex64::new(0.5, 0.0), 10.0, 20, Seed::Parameter).unwrap();
        let escape = fractal.evaluate(Complex64::new(0.0, 0.0), false);
        assert!(escape.escaped);
        assert_eq!(escape.value, 2.0);
    }

    #[test]
    fn prefilled_entries_are_not_recomputed() {
        let calls = AtomicUsize::new(0);
        let step = from_fn(|c, cache, i, _param| {
            calls.fetch_add(1, Ordering::SeqCst);
            let z = cache.get(i - 1);
            let next = z * z + c;
            cache.insert(i + 1, next * next + c);
            Ok(next)
        });
        let fractal =
            Fractal::new(step, Complex64::new(0.0, 0.0), 2.0, 11, Seed::Parameter).unwrap();
        let escape = fractal.evaluate(Complex64::new(0.0, 0.0), false);
        assert!(!escape.escaped);
        // Iterations 1, 3, 5, 7, 9 compute; the rest were filled ahead.
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn reads_of_unset_entries_are_reported() {
        let step = from_fn(|c, cache, i, _param| Ok(cache.get(i + 5) + c));
        let fractal =
            Fractal::new(step, Complex64::new(0.0, 0.0), 2.0, 4, Seed::Parameter).unwrap();
        let escape = fractal.evaluate(Complex64::new(0.1, 0.0), false);
        assert_eq!(escape.defaulted_reads, 3);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let fractal = mandelbrot(1000.0, 200, Seed::Parameter);
        let c = Complex64::new(-0.7436, 0.1318);
        let a = fractal.evaluate(c, true);
        let b = fractal.evaluate(c, true);
        assert_eq!(a.value.to_bits(), b.value.to_bits());
        assert_eq!(a.escaped, b.escaped);
    }

    #[test]
    fn escape_values_stay_in_range() {
        let fractal = mandelbrot(1.5, 30, Seed::Parameter);
        for re in -20..20 {
            for im in -20..20 {
                let c = Complex64::new(re as f64 / 8.0, im as f64 / 8.0);
                let escape = fractal.evaluate(c, true);
                assert!(escape.value >= 0.0 && escape.value <= 30.0, "{:?}", escape);
            }
        }
    }

    #[test]
    fn small_thresholds_fall_back_to_counts() {
        let fractal = mandelbrot(0.5, 30, Seed::Parameter);
        assert_eq!(
            fractal.check_smoothing(),
            Err(FractalError::SmoothingDomain(0.5))
        );
        let escape = fractal.evaluate(Complex64::new(0.6, 0.0), true);
        assert!(escape.escaped);
        assert_eq!(escape.value, 1.0);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let step = from_fn(|c, _cache, _i, _param| Ok(c));
        let zero = Complex64::new(0.0, 0.0);
        assert_eq!(
            Fractal::new(&step, zero, 2.0, 0, Seed::Parameter).err(),
            Some(FractalError::InvalidIterations(0))
        );
        assert_eq!(
            Fractal::new(&step, zero, 0.0, 10, Seed::Parameter).err(),
            Some(FractalError::InvalidDivergence(0.0))
        );
        assert!(Fractal::new(&step, zero, std::f64::NAN, 10, Seed::Parameter).is_err());
    }

    #[test]
    fn stability_clamps_on_request() {
        assert_eq!(stability(25.0, 50, true), 0.5);
        assert_eq!(stability(60.0, 50, true), 1.0);
        assert_eq!(stability(-1.0, 50, true), 0.0);
        assert_eq!(stability(60.0, 50, false), 1.2);
    }

    #[test]
    fn single_iteration_cap_never_steps() {
        let fractal = mandelbrot(2.0, 1, Seed::Parameter);
        let escape = fractal.evaluate(Complex64::new(100.0, 0.0), true);
        assert!(!escape.escaped);
        assert_eq!(escape.value, 1.0);
    }
}
