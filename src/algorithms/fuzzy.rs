//! Mamdani fuzzy inference over three normalized signals.
//!
//! Inputs are fuzzified into `low`/`med`/`high`, combined through a fixed
//! rule base (AND = min, OR = max), aggregated over five output sets and
//! collapsed to a crisp relevance by a sampled centroid.

use super::RelevanceModel;
use crate::utils::clamp01;
use serde::{Deserialize, Serialize};

/// Number of samples taken on the output axis, `x = i / 200`.
pub const CENTROID_SAMPLES: usize = 201;

/// Triangle given as (left foot, apex, right foot).
///
/// A foot that coincides with the apex turns that side into a shoulder
/// which stays at 1.0 beyond the apex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Triangle {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn membership(&self, x: f64) -> f64 {
        let Triangle { a, b, c } = *self;
        if a == b {
            if x <= b {
                return 1.0;
            }
            if x >= c {
                return 0.0;
            }
            return (c - x) / (c - b);
        }
        if b == c {
            if x >= b {
                return 1.0;
            }
            if x <= a {
                return 0.0;
            }
            return (x - a) / (b - a);
        }

        if x <= a || x >= c {
            0.0
        } else if x == b {
            1.0
        } else if x < b {
            (x - a) / (b - a)
        } else {
            (c - x) / (c - b)
        }
    }
}

const INPUT_LOW: Triangle = Triangle::new(0.0, 0.0, 0.4);
const INPUT_MED: Triangle = Triangle::new(0.2, 0.5, 0.8);
const INPUT_HIGH: Triangle = Triangle::new(0.6, 1.0, 1.0);

const OUT_VERY_LOW: Triangle = Triangle::new(0.0, 0.0, 0.2);
const OUT_LOW: Triangle = Triangle::new(0.1, 0.25, 0.4);
const OUT_MED: Triangle = Triangle::new(0.35, 0.5, 0.65);
const OUT_HIGH: Triangle = Triangle::new(0.6, 0.75, 0.9);
const OUT_VERY_HIGH: Triangle = Triangle::new(0.8, 1.0, 1.0);

/// Membership degrees of one input in the three linguistic sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Degrees {
    pub low: f64,
    pub med: f64,
    pub high: f64,
}

impl Degrees {
    pub fn fuzzify(x: f64) -> Self {
        Self {
            low: INPUT_LOW.membership(x),
            med: INPUT_MED.membership(x),
            high: INPUT_HIGH.membership(x),
        }
    }
}

/// Firing strength of each output label after rule evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputStrengths {
    pub verylow: f64,
    pub low: f64,
    pub med: f64,
    pub high: f64,
    pub veryhigh: f64,
}

impl OutputStrengths {
    fn labels(&self) -> [(f64, Triangle); 5] {
        [
            (self.verylow, OUT_VERY_LOW),
            (self.low, OUT_LOW),
            (self.med, OUT_MED),
            (self.high, OUT_HIGH),
            (self.veryhigh, OUT_VERY_HIGH),
        ]
    }

    /// Aggregated output membership at `x`.
    pub fn aggregate(&self, x: f64) -> f64 {
        self.labels()
            .iter()
            .map(|(strength, set)| strength * set.membership(x))
            .fold(0.0, f64::max)
    }
}

/// Intermediate values of one inference, for explaining a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyBreakdown {
    pub affinity: f64,
    pub popularity: f64,
    pub rating_similarity: f64,
    pub fuzzy_affinity: Degrees,
    pub fuzzy_popularity: Degrees,
    pub fuzzy_rating: Degrees,
    pub output_strengths: OutputStrengths,
    #[serde(rename = "final")]
    pub final_score: f64,
}

fn and(values: &[f64]) -> f64 {
    values.iter().copied().fold(1.0, f64::min)
}

fn or(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// Applies the rule base to fuzzified inputs.
pub fn evaluate_rules(aff: &Degrees, pop: &Degrees, rat: &Degrees) -> OutputStrengths {
    OutputStrengths {
        veryhigh: and(&[aff.high, rat.high]),
        high: or(&[
            and(&[aff.high, pop.high]),
            and(&[aff.med, rat.high]),
            and(&[aff.high, pop.med]),
        ]),
        med: or(&[
            and(&[aff.med, pop.med]),
            and(&[aff.low, pop.high]),
            and(&[aff.high, pop.low]),
        ]),
        low: or(&[and(&[aff.low, rat.med]), and(&[aff.low, rat.low])]),
        verylow: and(&[aff.low, pop.low, rat.low]),
    }
}

/// Point `i` of the output axis grid.
fn sample_point(i: usize) -> f64 {
    i as f64 / (CENTROID_SAMPLES - 1) as f64
}

/// Centroid of the aggregated output, 0.0 when nothing fired.
pub fn centroid(strengths: &OutputStrengths) -> f64 {
    let (num, den) = (0..CENTROID_SAMPLES)
        .map(sample_point)
        .fold((0.0, 0.0), |(num, den), x| {
            let mu = strengths.aggregate(x);
            (num + x * mu, den + mu)
        });

    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyEngine;

impl FuzzyEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RelevanceModel for FuzzyEngine {
    fn relevance_with_breakdown(
        &self,
        affinity: f64,
        popularity: f64,
        rating_similarity: f64,
    ) -> (f64, FuzzyBreakdown) {
        let affinity = clamp01(affinity);
        let popularity = clamp01(popularity);
        let rating_similarity = clamp01(rating_similarity);

        let fuzzy_affinity = Degrees::fuzzify(affinity);
        let fuzzy_popularity = Degrees::fuzzify(popularity);
        let fuzzy_rating = Degrees::fuzzify(rating_similarity);

        let output_strengths = evaluate_rules(&fuzzy_affinity, &fuzzy_popularity, &fuzzy_rating);
        let final_score = clamp01(centroid(&output_strengths));

        let breakdown = FuzzyBreakdown {
            affinity,
            popularity,
            rating_similarity,
            fuzzy_affinity,
            fuzzy_popularity,
            fuzzy_rating,
            output_strengths,
            final_score,
        };
        (final_score, breakdown)
    }
}
