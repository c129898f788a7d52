use crate::models::*;
use std::collections::{BTreeMap, HashMap};

/// Graded averages at or below this map to zero affinity.
const GRADED_FLOOR: f64 = 2.0;
/// Graded averages at or above this map to full affinity.
const GRADED_CEILING: f64 = 5.0;
const LIKE_THRESHOLD: u8 = 4;
const DISLIKE_THRESHOLD: u8 = 2;

#[derive(Debug, Default)]
struct Tally {
    likes: u32,
    dislikes: u32,
    score_sum: u32,
    score_count: u32,
}

/// Folds an interaction stream into a [`UserPreferenceProfile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileBuilder;

impl ProfileBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the profile for `user_id`.
    ///
    /// Once any graded interaction contributes, affinities come from graded
    /// averages only and binary decisions are ignored for them. The preferred
    /// rating averages every liked, rated item either way, scaling graded
    /// likes by `score / 5`.
    pub fn build(
        &self,
        user_id: UserId,
        interactions: &[Interaction],
        items_by_id: &HashMap<ItemId, Item>,
    ) -> UserPreferenceProfile {
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        let mut liked_ratings: Vec<f64> = Vec::new();
        let mut graded = false;

        for interaction in interactions {
            if !interaction.is_valid_evaluation() {
                continue;
            }

            let Some(item) = items_by_id.get(&interaction.item_id) else {
                continue;
            };
            let categories = item.normalized_categories();
            if categories.is_empty() {
                continue;
            }

            match interaction.score {
                Some(score) => {
                    graded = true;
                    for category in &categories {
                        let tally = tallies.entry(category.clone()).or_default();
                        tally.score_sum += u32::from(score);
                        tally.score_count += 1;
                    }
                    if score >= LIKE_THRESHOLD {
                        for category in &categories {
                            tallies.entry(category.clone()).or_default().likes += 1;
                        }
                        if let Some(rating) = item.rating {
                            liked_ratings.push(rating * (f64::from(score) / 5.0));
                        }
                    } else if score <= DISLIKE_THRESHOLD {
                        for category in &categories {
                            tallies.entry(category.clone()).or_default().dislikes += 1;
                        }
                    }
                }
                None => match interaction.decision {
                    Decision::Like => {
                        for category in &categories {
                            tallies.entry(category.clone()).or_default().likes += 1;
                        }
                        if let Some(rating) = item.rating {
                            liked_ratings.push(rating);
                        }
                    }
                    Decision::Dislike => {
                        for category in &categories {
                            tallies.entry(category.clone()).or_default().dislikes += 1;
                        }
                    }
                    Decision::NotEvaluated => {}
                },
            }
        }

        let category_affinities = tallies
            .into_iter()
            .filter_map(|(category, tally)| {
                let affinity = if graded {
                    if tally.score_count == 0 {
                        return None;
                    }
                    graded_affinity(f64::from(tally.score_sum) / f64::from(tally.score_count))
                } else {
                    let total = tally.likes + tally.dislikes;
                    if total == 0 {
                        return None;
                    }
                    f64::from(tally.likes) / f64::from(total)
                };
                Some((category, affinity))
            })
            .collect();

        let preferred_rating = if liked_ratings.is_empty() {
            None
        } else {
            Some(liked_ratings.iter().sum::<f64>() / liked_ratings.len() as f64)
        };

        UserPreferenceProfile {
            user_id,
            category_affinities,
            preferred_rating,
        }
    }
}

/// Linear remap of an average score from `[2, 5]` onto `[0, 1]`.
///
/// A neutral 3 lands at one third, not one half.
pub fn graded_affinity(average: f64) -> f64 {
    if average <= GRADED_FLOOR {
        0.0
    } else if average >= GRADED_CEILING {
        1.0
    } else {
        ((average - GRADED_FLOOR) / (GRADED_CEILING - GRADED_FLOOR)).clamp(0.0, 1.0)
    }
}
