//! # Spline Module
//!
//! Piecewise-linear curves used to reshape terrain parameters. Each noise
//! parameter is normalized into [0, 1] and run through one of these before it
//! contributes to height or biome classification, which is where most of the
//! character of the terrain comes from: an s-shaped continentalness spline
//! produces sharp coastlines, a bowed peaks-and-valleys spline exaggerates
//! ridges.

use serde::Deserialize;

/// A piecewise-linear curve over [0, 1].
///
/// Keys are `(input, output)` pairs. Evaluation clamps to the first and last
/// key outside the keyed range, and an empty spline is the identity, so a
/// parameter without a configured curve passes through unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Spline {
    keys: Vec<(f32, f32)>,
}

impl Spline {
    /// Builds a spline from `(input, output)` keys. Keys are sorted by input.
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Spline { keys }
    }

    /// The identity spline.
    pub fn identity() -> Self {
        Spline { keys: Vec::new() }
    }

    /// Evaluates the curve at `input`.
    pub fn evaluate(&self, input: f32) -> f32 {
        if self.keys.is_empty() {
            return input;
        }
        if self.keys.len() == 1 || input <= self.keys[0].0 {
            return self.keys[0].1;
        }
        let last = self.keys.len() - 1;
        if input >= self.keys[last].0 {
            return self.keys[last].1;
        }

        for pair in self.keys.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if input <= x1 {
                let span = x1 - x0;
                if span <= f32::EPSILON {
                    return y1;
                }
                let t = (input - x0) / span;
                return y0 + (y1 - y0) * t;
            }
        }

        self.keys[last].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spline_is_identity() {
        let spline = Spline::identity();
        assert_eq!(spline.evaluate(0.37), 0.37);
    }

    #[test]
    fn single_key_is_constant() {
        let spline = Spline::new(vec![(0.5, 0.8)]);
        assert_eq!(spline.evaluate(0.0), 0.8);
        assert_eq!(spline.evaluate(1.0), 0.8);
    }

    #[test]
    fn interpolates_between_keys() {
        let spline = Spline::new(vec![(0.0, 0.0), (1.0, 2.0)]);
        assert!((spline.evaluate(0.25) - 0.5).abs() < 1e-6);
        assert!((spline.evaluate(0.75) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn clamps_outside_key_range() {
        let spline = Spline::new(vec![(0.2, 0.1), (0.8, 0.9)]);
        assert_eq!(spline.evaluate(0.0), 0.1);
        assert_eq!(spline.evaluate(1.0), 0.9);
    }

    #[test]
    fn keys_are_sorted_on_construction() {
        let spline = Spline::new(vec![(1.0, 1.0), (0.0, 0.0), (0.5, 0.9)]);
        assert!((spline.evaluate(0.25) - 0.45).abs() < 1e-6);
    }
}
