use crate::algorithms::{FuzzyBreakdown, Ranker, RelevanceModel};
use crate::config::Config;
use crate::models::*;
use crate::services::preference::PreferenceService;
use crate::services::store::{CatalogView, InteractionLog, SessionStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<FuzzyBreakdown>,
}

pub struct RecommendationService {
    catalog: Arc<dyn CatalogView>,
    interactions: Arc<dyn InteractionLog>,
    sessions: Arc<dyn SessionStore>,
    preference_service: Arc<PreferenceService>,
    ranker: Ranker,
    config: Arc<Config>,
}

impl RecommendationService {
    pub fn new(
        catalog: Arc<dyn CatalogView>,
        interactions: Arc<dyn InteractionLog>,
        sessions: Arc<dyn SessionStore>,
        preference_service: Arc<PreferenceService>,
        ranker: Ranker,
        config: Arc<Config>,
    ) -> Self {
        Self {
            catalog,
            interactions,
            sessions,
            preference_service,
            ranker,
            config,
        }
    }

    pub fn score_relevance(
        &self,
        affinity: f64,
        popularity: f64,
        rating_similarity: f64,
        diagnostics: bool,
    ) -> RelevanceScore {
        let model = self.ranker.model();
        if diagnostics {
            let (score, breakdown) =
                model.relevance_with_breakdown(affinity, popularity, rating_similarity);
            RelevanceScore {
                score,
                breakdown: Some(breakdown),
            }
        } else {
            RelevanceScore {
                score: model.relevance(affinity, popularity, rating_similarity),
                breakdown: None,
            }
        }
    }

    /// Top-k items for the session owner.
    ///
    /// `None` when the session does not exist, belongs to another user, or has
    /// not collected enough valid evaluations yet.
    pub fn recommend(&self, request: &RecommendationRequest) -> Option<RecommendationResponse> {
        let start_time = std::time::Instant::now();

        let session = self.sessions.get(request.session_id)?;
        if session.user_id != request.user_id {
            debug!(
                "Session {} does not belong to user {}",
                request.session_id, request.user_id
            );
            return None;
        }
        let required = self.config.recommendation.min_evaluations_for_recommendations;
        if session.valid_evaluations < required {
            debug!(
                "Session {} has {}/{} evaluations, recommendations locked",
                session.id, session.valid_evaluations, required
            );
            return None;
        }

        let evaluated = self.interactions.item_ids_by_session(session.id);
        let profile = self
            .preference_service
            .build_profile(request.user_id, Some(session.id));
        let catalog = self
            .catalog
            .list_catalog(self.config.recommendation.catalog_limit);

        let recommendations = self.ranker.rank(
            &catalog,
            &profile,
            &evaluated,
            &request.filters,
            request.num_recommendations,
            request.include_breakdown,
        );

        info!(
            "Served {} recommendations for user {} (session {}) in {}ms",
            recommendations.len(),
            request.user_id,
            session.id,
            start_time.elapsed().as_millis()
        );

        Some(RecommendationResponse {
            user_id: request.user_id,
            session_id: session.id,
            recommendations,
            generated_at: Utc::now(),
        })
    }
}
