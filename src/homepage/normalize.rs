//! Per-signal rescaling into a common [0,1] range. Every denominator is the
//! maximum observed within the current pool (or the fetched top-K window for
//! popularity primitives), floored at 1 so an all-zero field normalizes to 0
//! instead of dividing by zero.

use super::pool::Candidate;

/// value / max(observed_max, 1). Inputs never exceed their observed maximum,
/// so the result lies in [0,1].
pub fn normalize(value: f64, observed_max: f64) -> f64 {
    value / observed_max.max(1.0)
}

/// Pool-wide maxima for the directly scored raw fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMaxima {
    pub hype: f64,
    pub follows: f64,
    pub rating: f64,
}

pub fn pool_maxima(candidates: &[Candidate]) -> FieldMaxima {
    let mut maxima = FieldMaxima::default();
    for c in candidates {
        if c.hype > maxima.hype {
            maxima.hype = c.hype;
        }
        if c.follows > maxima.follows {
            maxima.follows = c.follows;
        }
        if let Some(rating) = c.rating {
            if rating > maxima.rating {
                maxima.rating = rating;
            }
        }
    }
    maxima
}
