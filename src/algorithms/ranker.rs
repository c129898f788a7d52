use super::{FuzzyEngine, RelevanceModel};
use crate::models::*;
use crate::utils::{clamp01, normalize_popularity};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Rating differences are measured against half of the 0-10 rating scale.
const RATING_DIFF_SCALE: f64 = 5.0;
const NEUTRAL_RATING_SIMILARITY: f64 = 0.5;

/// Scores candidate items for a profile and keeps the best `k`.
#[derive(Clone)]
pub struct Ranker {
    model: Arc<dyn RelevanceModel>,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(Arc::new(FuzzyEngine::new()))
    }
}

impl Ranker {
    pub fn new(model: Arc<dyn RelevanceModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn RelevanceModel> {
        &self.model
    }

    /// Ranks `candidates` for `profile`.
    ///
    /// Ordering is affinity first and relevance second, both descending;
    /// equal pairs keep their position in `candidates`.
    pub fn rank(
        &self,
        candidates: &[Item],
        profile: &UserPreferenceProfile,
        already_evaluated: &HashSet<ItemId>,
        filters: &RecommendationFilters,
        k: usize,
        include_breakdown: bool,
    ) -> Vec<RecommendationItem> {
        if k == 0 {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let eligible: Vec<&Item> = candidates
            .iter()
            .filter(|item| !already_evaluated.contains(&item.id))
            .filter(|item| filters.matches(item))
            .filter(|item| seen.insert(item.id))
            .collect();

        let mut scored: Vec<RecommendationItem> = eligible
            .par_iter()
            .map(|item| {
                let affinity = affinity(item, profile);
                let popularity = normalize_popularity(item.popularity);
                let rating_similarity = rating_similarity(item, profile);
                let (score, breakdown) = if include_breakdown {
                    let (score, breakdown) = self
                        .model
                        .relevance_with_breakdown(affinity, popularity, rating_similarity);
                    (score, Some(breakdown))
                } else {
                    (self.model.relevance(affinity, popularity, rating_similarity), None)
                };
                RecommendationItem {
                    item: (*item).clone(),
                    score,
                    affinity,
                    breakdown,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.affinity
                .total_cmp(&a.affinity)
                .then_with(|| b.score.total_cmp(&a.score))
        });
        scored.truncate(k);
        scored
    }
}

/// Strongest matching category affinity, scaled by how many of the item's
/// categories the profile knows about.
pub fn affinity(item: &Item, profile: &UserPreferenceProfile) -> f64 {
    let categories = item.normalized_categories();
    if categories.is_empty() {
        return 0.0;
    }

    let overlapping: Vec<f64> = categories
        .iter()
        .map(|c| profile.affinity(c))
        .filter(|a| *a > 0.0)
        .collect();
    if overlapping.is_empty() {
        return 0.0;
    }

    let best = overlapping
        .iter()
        .copied()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);
    let coverage = overlapping.len() as f64 / categories.len() as f64;
    best * coverage
}

pub fn rating_similarity(item: &Item, profile: &UserPreferenceProfile) -> f64 {
    match (item.rating, profile.preferred_rating) {
        (Some(rating), Some(preferred)) => {
            clamp01(1.0 - (rating - preferred).abs() / RATING_DIFF_SCALE)
        }
        _ => NEUTRAL_RATING_SIMILARITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(affinities: &[(&str, f64)], preferred: Option<f64>) -> UserPreferenceProfile {
        let mut profile = UserPreferenceProfile::new(1);
        for (category, value) in affinities {
            profile.category_affinities.insert(category.to_string(), *value);
        }
        profile.preferred_rating = preferred;
        profile
    }

    fn ids(ranked: &[RecommendationItem]) -> Vec<ItemId> {
        ranked.iter().map(|r| r.item.id).collect()
    }

    #[test]
    fn test_affinity_uses_best_times_coverage() {
        let p = profile(&[("action", 0.8), ("drama", 0.4)], None);
        let item = Item::new(1, "x").with_categories(&["Action", "Drama", "Comedy", "War"]);
        assert!((affinity(&item, &p) - 0.8 * 0.5).abs() < 1e-12);

        let untagged = Item::new(2, "y");
        assert_eq!(affinity(&untagged, &p), 0.0);

        let unrelated = Item::new(3, "z").with_categories(&["Horror"]);
        assert_eq!(affinity(&unrelated, &p), 0.0);
    }

    #[test]
    fn test_rating_similarity() {
        let item = Item::new(1, "x").with_rating(7.0);
        assert_eq!(rating_similarity(&item, &profile(&[], None)), 0.5);
        assert_eq!(rating_similarity(&Item::new(2, "y"), &profile(&[], Some(7.0))), 0.5);
        assert!((rating_similarity(&item, &profile(&[], Some(8.0))) - 0.8).abs() < 1e-12);
        assert_eq!(rating_similarity(&item, &profile(&[], Some(0.0))), 0.0);
    }

    #[test]
    fn test_excludes_evaluated_items() {
        let candidates: Vec<Item> = (1..=6)
            .map(|id| Item::new(id, "m").with_categories(&["Action"]).with_popularity(0.5))
            .collect();
        let evaluated: HashSet<ItemId> = [1, 2, 3].into_iter().collect();
        let ranker = Ranker::default();
        for k in [1, 3, 10] {
            let ranked = ranker.rank(
                &candidates,
                &profile(&[("action", 1.0)], None),
                &evaluated,
                &RecommendationFilters::default(),
                k,
                false,
            );
            assert!(ranked.iter().all(|r| !evaluated.contains(&r.item.id)));
            assert_eq!(ranked.len(), k.min(3));
        }
    }

    #[test]
    fn test_affinity_beats_popularity() {
        let candidates = vec![
            Item::new(1, "B").with_categories(&["Comedy"]).with_popularity(0.95),
            Item::new(2, "A").with_categories(&["Action"]).with_popularity(0.9),
        ];
        let ranked = Ranker::default().rank(
            &candidates,
            &profile(&[("action", 1.0)], None),
            &HashSet::new(),
            &RecommendationFilters::default(),
            2,
            false,
        );
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn test_relevance_breaks_affinity_ties() {
        let candidates = vec![
            Item::new(1, "low").with_categories(&["Action"]).with_popularity(0.1),
            Item::new(2, "high").with_categories(&["Action"]).with_popularity(95.0),
        ];
        let ranked = Ranker::default().rank(
            &candidates,
            &profile(&[("action", 1.0)], None),
            &HashSet::new(),
            &RecommendationFilters::default(),
            2,
            true,
        );
        assert_eq!(ids(&ranked), vec![2, 1]);
        assert!(ranked[0].score >= ranked[1].score);
        let breakdown = ranked[0].breakdown.as_ref().unwrap();
        assert!((breakdown.popularity - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_filters_and_duplicates() {
        let candidates = vec![
            Item::new(1, "short").with_categories(&["Action"]).with_duration(90),
            Item::new(2, "long").with_categories(&["Action"]).with_duration(150),
            Item::new(3, "unknown").with_categories(&["Action"]),
            Item::new(1, "short again").with_categories(&["Action"]).with_duration(90),
            Item::new(4, "comedy").with_categories(&["Comedy"]).with_duration(90),
        ];
        let filters = RecommendationFilters {
            categories: vec!["action".to_string()],
            duration: Some(DurationBucket::Short),
        };
        let ranked = Ranker::default().rank(
            &candidates,
            &profile(&[], None),
            &HashSet::new(),
            &filters,
            10,
            false,
        );
        assert_eq!(ids(&ranked), vec![1]);
    }

    #[test]
    fn test_empty_candidates() {
        let ranked = Ranker::default().rank(
            &[],
            &profile(&[], None),
            &HashSet::new(),
            &RecommendationFilters::default(),
            5,
            false,
        );
        assert!(ranked.is_empty());
    }
}
