// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A handful of well-known recurrences, selectable by name.  Anything
//! else can be plugged in as a closure through `escape::from_fn`.

use num::complex::Complex64;
use std::fmt;
use std::str::FromStr;

use crate::errors::ArithmeticFault;
use crate::escape::{IterationCache, Recurrence, Seed};

/// The built-in formulas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Formula {
    /// `z' = z^2 + c`
    Mandelbrot,
    /// `z' = z^2 + p`, with the pixel as the starting value.
    Julia,
    /// `z' = (|re z| + i|im z|)^2 + c`
    BurningShip,
    /// `z' = conj(z)^2 + c`
    Tricorn,
    /// `z'' = z'^2 + z + c`, a recurrence over two earlier iterates.
    Fibonacci,
    /// `z' = 1 / z^2 + p`.  Faults on zero.
    Inverse,
}

const NAMES: [(&str, Formula); 6] = [
    ("mandelbrot", Formula::Mandelbrot),
    ("julia", Formula::Julia),
    ("burning-ship", Formula::BurningShip),
    ("tricorn", Formula::Tricorn),
    ("fibonacci", Formula::Fibonacci),
    ("inverse", Formula::Inverse),
];

impl Formula {
    /// Every name `from_str` accepts.
    pub fn names() -> Vec<&'static str> {
        NAMES.iter().map(|(name, _)| *name).collect()
    }

    /// The seed mode the formula is usually drawn with.
    pub fn default_seed(self) -> Seed {
        match self {
            Formula::Julia | Formula::Inverse => Seed::Coordinate,
            _ => Seed::Parameter,
        }
    }
}

impl FromStr for Formula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, formula)| *formula)
            .ok_or_else(|| format!("Unknown formula '{}'", s))
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = NAMES
            .iter()
            .find(|(_, formula)| formula == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown");
        write!(f, "{}", name)
    }
}

impl Recurrence for Formula {
    fn step(
        &self,
        coordinate: Complex64,
        cache: &mut IterationCache,
        iteration: usize,
        param: Complex64,
    ) -> Result<Complex64, ArithmeticFault> {
        let z = cache.get(iteration - 1);
        match self {
            Formula::Mandelbrot => Ok(z * z + coordinate),
            Formula::Julia => Ok(z * z + param),
            Formula::BurningShip => {
                let folded = Complex64::new(z.re.abs(), z.im.abs());
                Ok(folded * folded + coordinate)
            }
            Formula::Tricorn => {
                let conj = z.conj();
                Ok(conj * conj + coordinate)
            }
            Formula::Fibonacci => {
                // z_{-1} is zero by definition, not by cache default.
                let previous = if iteration >= 2 {
                    cache.get(iteration - 2)
                } else {
                    Complex64::new(0.0, 0.0)
                };
                Ok(z * z + previous + coordinate)
            }
            Formula::Inverse => {
                let square = z * z;
                if square.norm_sqr() == 0.0 {
                    return Err(ArithmeticFault::DivisionByZero);
                }
                Ok(square.inv() + param)
            }
        }
    }
}
