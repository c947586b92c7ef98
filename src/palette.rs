// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning a stability into a color.  A palette is an ordered table of
//! colors that quantizes `[0, 1)`; a few named gradients are sampled
//! into such tables for convenience.

use image::Rgb;
use num::clamp;

use crate::errors::FractalError;

/// The number of entries a named palette is sampled into.
pub const PALETTE_SIZE: usize = 256;

/// An ordered, non-empty table of colors.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
}

// (position, color) pairs, positions ascending from 0 to 1.
type Stops = &'static [(f64, [u8; 3])];

const TWILIGHT: Stops = &[
    (0.00, [226, 217, 226]),
    (0.15, [152, 171, 200]),
    (0.30, [95, 106, 183]),
    (0.50, [47, 20, 54]),
    (0.70, [170, 68, 70]),
    (0.85, [209, 149, 124]),
    (1.00, [226, 217, 226]),
];

const VIRIDIS: Stops = &[
    (0.00, [68, 1, 84]),
    (0.25, [59, 82, 139]),
    (0.50, [33, 145, 140]),
    (0.75, [94, 201, 98]),
    (1.00, [253, 231, 37]),
];

const MAGMA: Stops = &[
    (0.00, [0, 0, 4]),
    (0.25, [81, 18, 124]),
    (0.50, [183, 55, 121]),
    (0.75, [252, 137, 97]),
    (1.00, [252, 253, 191]),
];

const GREYS: Stops = &[(0.00, [255, 255, 255]), (1.00, [0, 0, 0])];

const HSV: Stops = &[
    (0.0, [255, 0, 0]),
    (1.0 / 6.0, [255, 255, 0]),
    (2.0 / 6.0, [0, 255, 0]),
    (3.0 / 6.0, [0, 255, 255]),
    (4.0 / 6.0, [0, 0, 255]),
    (5.0 / 6.0, [255, 0, 255]),
    (1.0, [255, 0, 0]),
];

const NAMED: [(&str, Stops); 5] = [
    ("twilight", TWILIGHT),
    ("viridis", VIRIDIS),
    ("magma", MAGMA),
    ("greys", GREYS),
    ("hsv", HSV),
];

impl Palette {
    /// Wraps a table of colors.  The table may not be empty.
    pub fn new(colors: Vec<Rgb<u8>>) -> Result<Palette, FractalError> {
        if colors.is_empty() {
            return Err(FractalError::EmptyPalette);
        }
        Ok(Palette { colors })
    }

    /// A named gradient sampled at `PALETTE_SIZE` evenly spaced
    /// positions from 0 to 1 inclusive.
    pub fn named(name: &str) -> Result<Palette, FractalError> {
        NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, stops)| Palette::from_stops(stops, PALETTE_SIZE))
            .ok_or_else(|| FractalError::UnknownPalette(name.to_string()))?
    }

    /// The names `named` understands.
    pub fn names() -> Vec<&'static str> {
        NAMED.iter().map(|(name, _)| *name).collect()
    }

    fn from_stops(stops: Stops, size: usize) -> Result<Palette, FractalError> {
        let colors = (0..size)
            .map(|i| {
                let position = if size > 1 {
                    i as f64 / (size - 1) as f64
                } else {
                    0.0
                };
                sample(stops, position)
            })
            .collect();
        Palette::new(colors)
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The color table, in order.
    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    /// Pick the entry that covers `stability`.  With `invert`, the
    /// palette is read from the far end.
    pub fn quantize(&self, stability: f64, invert: bool) -> Rgb<u8> {
        let t = if invert { 1.0 - stability } else { stability };
        let size = self.colors.len();
        let index = clamp((t * size as f64).floor(), 0.0, (size - 1) as f64) as usize;
        self.colors[index % size]
    }
}

// Linear interpolation between the two stops around `position`.
fn sample(stops: Stops, position: f64) -> Rgb<u8> {
    let upper = stops
        .iter()
        .position(|(at, _)| *at >= position)
        .unwrap_or(stops.len() - 1);
    if upper == 0 {
        return Rgb(stops[0].1);
    }
    let (lo_at, lo) = stops[upper - 1];
    let (hi_at, hi) = stops[upper];
    let t = if hi_at > lo_at {
        (position - lo_at) / (hi_at - lo_at)
    } else {
        0.0
    };
    let mut channels = [0u8; 3];
    for (c, channel) in channels.iter_mut().enumerate() {
        let value = f64::from(lo[c]) + t * (f64::from(hi[c]) - f64::from(lo[c]));
        *channel = clamp(value.round(), 0.0, 255.0) as u8;
    }
    Rgb(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ramp() -> Palette {
        Palette::new((0..=255).map(|i| Rgb([i as u8, 0, 0])).collect()).unwrap()
    }

    #[test]
    fn empty_palettes_are_rejected() {
        assert_eq!(Palette::new(vec![]), Err(FractalError::EmptyPalette));
    }

    #[test]
    fn ends_of_the_range_pick_the_ends_of_the_palette() {
        let palette = ramp();
        assert_eq!(palette.quantize(0.0, false), Rgb([0, 0, 0]));
        assert_eq!(palette.quantize(1.0, false), Rgb([255, 0, 0]));
        assert_eq!(palette.quantize(1.0, true), Rgb([0, 0, 0]));
        assert_eq!(palette.quantize(0.0, true), Rgb([255, 0, 0]));
    }

    #[test]
    fn interior_values_floor() {
        let palette = ramp();
        assert_eq!(palette.quantize(0.5, false), Rgb([128, 0, 0]));
        assert_eq!(palette.quantize(0.999, false), Rgb([255, 0, 0]));
        assert_eq!(palette.quantize(1.0 / 256.0, false), Rgb([1, 0, 0]));
    }

    #[test]
    fn out_of_range_values_clamp() {
        let palette = ramp();
        assert_eq!(palette.quantize(-3.0, false), Rgb([0, 0, 0]));
        assert_eq!(palette.quantize(7.5, false), Rgb([255, 0, 0]));
        assert_eq!(palette.quantize(std::f64::NAN, false), Rgb([0, 0, 0]));
    }

    #[test]
    fn inversion_is_a_reflection() {
        let palette = ramp();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..1000 {
            let s: f64 = rng.gen_range(0.0, 1.0);
            assert_eq!(palette.quantize(s, true), palette.quantize(1.0 - s, false));
        }
    }

    #[test]
    fn single_color_palettes_always_answer() {
        let palette = Palette::new(vec![Rgb([9, 8, 7])]).unwrap();
        assert_eq!(palette.quantize(0.0, false), Rgb([9, 8, 7]));
        assert_eq!(palette.quantize(1.0, true), Rgb([9, 8, 7]));
    }

    #[test]
    fn named_palettes_hit_their_stops() {
        for name in Palette::names() {
            let palette = Palette::named(name).unwrap();
            assert_eq!(palette.len(), PALETTE_SIZE);
        }
        let greys = Palette::named("greys").unwrap();
        assert_eq!(greys.colors()[0], Rgb([255, 255, 255]));
        assert_eq!(greys.colors()[255], Rgb([0, 0, 0]));
        let viridis = Palette::named("viridis").unwrap();
        assert_eq!(viridis.colors()[0], Rgb([68, 1, 84]));
        assert_eq!(viridis.colors()[255], Rgb([253, 231, 37]));
        let twilight = Palette::named("twilight").unwrap();
        assert_eq!(twilight.colors()[0], twilight.colors()[255]);
    }

    #[test]
    fn unknown_palettes_are_reported() {
        assert_eq!(
            Palette::named("jet"),
            Err(FractalError::UnknownPalette("jet".to_string()))
        );
    }
}
