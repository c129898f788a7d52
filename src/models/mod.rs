use crate::algorithms::fuzzy::FuzzyBreakdown;
use crate::utils::normalize_category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ItemId = u64;
pub type UserId = u64;
pub type SessionId = u64;
pub type InteractionId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default, rename = "genres")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default, rename = "is_top_100")]
    pub curated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Like,
    Dislike,
    #[serde(alias = "NOT_SEEN")]
    NotEvaluated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub session_id: SessionId,
    pub decision: Decision,
    /// Graded score on a 1-5 scale.
    pub score: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub target_evaluations: u32,
    pub valid_evaluations: u32,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Per-category affinities and preferred rating derived from interactions.
///
/// Rebuilt for every request; it is stale as soon as a new interaction lands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferenceProfile {
    pub user_id: UserId,
    pub category_affinities: BTreeMap<String, f64>,
    pub preferred_rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBucket {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationFilters {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub duration: Option<DurationBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub num_recommendations: usize,
    #[serde(default)]
    pub include_breakdown: bool,
    #[serde(default)]
    pub filters: RecommendationFilters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub recommendations: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub item: Item,
    pub score: f64,
    pub affinity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<FuzzyBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub status: SessionStatus,
    pub current: u32,
    pub target: u32,
    pub remaining_for_recommendations: u32,
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            year: 0,
            categories: Vec::new(),
            duration_minutes: None,
            popularity: 0.0,
            rating: None,
            poster_url: None,
            curated: false,
        }
    }

    pub fn with_categories<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        self.categories = categories.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn curated(mut self) -> Self {
        self.curated = true;
        self
    }

    /// Trimmed, lowercased, non-empty category names.
    pub fn normalized_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| normalize_category(c))
            .filter(|c| !c.is_empty())
            .collect()
    }
}

impl Interaction {
    /// Graded interactions and definite likes/dislikes count toward session progress.
    pub fn is_valid_evaluation(&self) -> bool {
        self.score.is_some() || matches!(self.decision, Decision::Like | Decision::Dislike)
    }
}

impl EvaluationSession {
    /// A session whose target is already met starts out completed.
    pub fn new(id: SessionId, user_id: UserId, target_evaluations: u32) -> Self {
        let mut session = Self {
            id,
            user_id,
            target_evaluations,
            valid_evaluations: 0,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            finished_at: None,
        };
        if target_evaluations == 0 {
            session.mark_completed();
        }
        session
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Counts one more valid evaluation. Returns `true` when this call closed the session.
    pub fn register_valid_evaluation(&mut self) -> bool {
        if self.status == SessionStatus::Completed {
            return false;
        }
        self.valid_evaluations += 1;
        if self.valid_evaluations >= self.target_evaluations {
            self.mark_completed();
            return true;
        }
        false
    }

    pub fn mark_completed(&mut self) {
        self.status = SessionStatus::Completed;
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn progress(&self, min_for_recommendations: u32) -> SessionProgress {
        SessionProgress {
            session_id: self.id,
            user_id: self.user_id,
            status: self.status,
            current: self.valid_evaluations,
            target: self.target_evaluations,
            remaining_for_recommendations: min_for_recommendations
                .saturating_sub(self.valid_evaluations),
        }
    }
}

impl UserPreferenceProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            category_affinities: BTreeMap::new(),
            preferred_rating: None,
        }
    }

    /// Affinity for `category`, 0.0 when the category was never touched.
    pub fn affinity(&self, category: &str) -> f64 {
        self.category_affinities
            .get(&normalize_category(category))
            .copied()
            .unwrap_or(0.0)
    }
}

impl DurationBucket {
    /// Unknown durations never satisfy a bucket.
    pub fn matches(&self, minutes: Option<u32>) -> bool {
        match (self, minutes) {
            (_, None) => false,
            (DurationBucket::Short, Some(m)) => m < 100,
            (DurationBucket::Medium, Some(m)) => (100..=140).contains(&m),
            (DurationBucket::Long, Some(m)) => m > 140,
        }
    }
}

impl std::str::FromStr for DurationBucket {
    type Err = crate::utils::validation::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(DurationBucket::Short),
            "medium" => Ok(DurationBucket::Medium),
            "long" => Ok(DurationBucket::Long),
            other => Err(crate::utils::validation::ValidationError::UnknownDuration(
                other.to_string(),
            )),
        }
    }
}

impl RecommendationFilters {
    pub fn matches(&self, item: &Item) -> bool {
        if !self.categories.is_empty() {
            let allowed: Vec<String> = self
                .categories
                .iter()
                .map(|c| normalize_category(c))
                .filter(|c| !c.is_empty())
                .collect();
            if !allowed.is_empty()
                && !item
                    .normalized_categories()
                    .iter()
                    .any(|c| allowed.contains(c))
            {
                return false;
            }
        }
        match self.duration {
            Some(bucket) => bucket.matches(item.duration_minutes),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(decision: Decision, score: Option<u8>) -> Interaction {
        Interaction {
            id: 1,
            user_id: 1,
            item_id: 1,
            session_id: 1,
            decision,
            score,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_valid_evaluation() {
        assert!(interaction(Decision::Like, None).is_valid_evaluation());
        assert!(interaction(Decision::Dislike, None).is_valid_evaluation());
        assert!(interaction(Decision::NotEvaluated, Some(3)).is_valid_evaluation());
        assert!(!interaction(Decision::NotEvaluated, None).is_valid_evaluation());
    }

    #[test]
    fn test_session_completes_once() {
        let mut session = EvaluationSession::new(1, 7, 2);
        assert!(!session.register_valid_evaluation());
        assert_eq!(session.status, SessionStatus::Active);
        assert!(session.register_valid_evaluation());
        assert_eq!(session.status, SessionStatus::Completed);
        let finished = session.finished_at;
        assert!(finished.is_some());

        assert!(!session.register_valid_evaluation());
        assert_eq!(session.valid_evaluations, 2);
        assert_eq!(session.finished_at, finished);
    }

    #[test]
    fn test_zero_target_session_starts_completed() {
        let mut session = EvaluationSession::new(1, 7, 0);
        assert!(session.is_completed());
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.finished_at.is_some());
        assert!(!session.register_valid_evaluation());
        assert_eq!(session.valid_evaluations, 0);
    }

    #[test]
    fn test_completion_follows_status() {
        let mut session = EvaluationSession::new(1, 7, 1);
        session.valid_evaluations = 3;
        assert!(!session.is_completed());
        session.mark_completed();
        assert!(session.is_completed());
    }

    #[test]
    fn test_duration_buckets() {
        assert!(DurationBucket::Short.matches(Some(99)));
        assert!(!DurationBucket::Short.matches(Some(100)));
        assert!(DurationBucket::Medium.matches(Some(100)));
        assert!(DurationBucket::Medium.matches(Some(140)));
        assert!(DurationBucket::Long.matches(Some(141)));
        assert!(!DurationBucket::Long.matches(None));
        assert!(!DurationBucket::Medium.matches(None));
    }

    #[test]
    fn test_filters_normalize_categories() {
        let item = Item::new(1, "x").with_categories(&[" Action ", "Drama"]);
        let filters = RecommendationFilters {
            categories: vec!["ACTION".to_string()],
            duration: None,
        };
        assert!(filters.matches(&item));

        let filters = RecommendationFilters {
            categories: vec!["comedy".to_string()],
            duration: None,
        };
        assert!(!filters.matches(&item));

        // unknown duration passes when no bucket is requested
        assert!(RecommendationFilters::default().matches(&item));
    }

    #[test]
    fn test_decision_serde_names() {
        let json = serde_json::to_string(&Decision::NotEvaluated).unwrap();
        assert_eq!(json, "\"NOT_EVALUATED\"");
        let parsed: Decision = serde_json::from_str("\"NOT_SEEN\"").unwrap();
        assert_eq!(parsed, Decision::NotEvaluated);
    }
}
