use serde::{Deserialize, Serialize};

/// Monotonic piecewise-linear map from a raw metric to a [0, 10] sub-score.
///
/// Knots are `(raw, score)` pairs sorted by raw value. Between knots the score is
/// linearly interpolated; outside them it is held at the end values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseScale {
    knots: Vec<(f64, f64)>,
}

impl PiecewiseScale {
    /// Panics in debug builds if knots are unsorted, empty, or leave [0, 10].
    pub fn new(knots: Vec<(f64, f64)>) -> Self {
        debug_assert!(!knots.is_empty());
        debug_assert!(knots.windows(2).all(|w| w[0].0 < w[1].0));
        debug_assert!(knots.iter().all(|(_, s)| (0.0..=10.0).contains(s)));
        Self { knots }
    }

    pub fn knots(&self) -> &[(f64, f64)] {
        &self.knots
    }

    /// True when the score never decreases as the raw value grows
    pub fn is_increasing(&self) -> bool {
        self.knots.windows(2).all(|w| w[0].1 <= w[1].1)
    }

    pub fn apply(&self, raw: f64) -> f64 {
        let (first, last) = match (self.knots.first(), self.knots.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return 10.0,
        };

        if raw.is_nan() {
            return first.1.max(last.1);
        }
        if raw <= first.0 {
            return first.1;
        }
        if raw >= last.0 {
            return last.1;
        }

        for w in self.knots.windows(2) {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if raw <= x1 {
                let t = (raw - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        last.1
    }
}
