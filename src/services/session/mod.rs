use crate::config::Config;
use crate::models::*;
use crate::services::store::{CatalogView, InteractionLog, NewInteraction, SessionStore};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives evaluation sessions: serving candidates and recording decisions.
///
/// Every mutation of a session runs under that session's lock, so two
/// concurrent registrations cannot both count toward the same slot.
pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    interactions: Arc<dyn InteractionLog>,
    catalog: Arc<dyn CatalogView>,
    config: Arc<Config>,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        interactions: Arc<dyn InteractionLog>,
        catalog: Arc<dyn CatalogView>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            sessions,
            interactions,
            catalog,
            config,
            locks: DashMap::new(),
        }
    }

    /// Lock for a live session. Unknown and completed sessions never get an entry.
    fn session_lock(&self, session_id: SessionId) -> Option<Arc<Mutex<()>>> {
        if self.sessions.get(session_id)?.is_completed() {
            return None;
        }
        let lock = self
            .locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        Some(lock)
    }

    pub fn start_session(&self, user_id: UserId, target_evaluations: Option<u32>) -> EvaluationSession {
        let requested = target_evaluations.unwrap_or(self.config.session.target_evaluations);
        if requested == 0 {
            warn!("Session target of 0 requested for user {}, using 1", user_id);
        }
        let target = requested.max(1);
        let session = self.sessions.create(user_id, target);
        info!(
            "Started session {} for user {} (target {})",
            session.id, user_id, target
        );
        session
    }

    pub fn get_session(&self, session_id: SessionId) -> Option<EvaluationSession> {
        self.sessions.get(session_id)
    }

    pub fn progress(&self, session_id: SessionId) -> Option<SessionProgress> {
        self.sessions
            .get(session_id)
            .map(|s| s.progress(self.config.recommendation.min_evaluations_for_recommendations))
    }

    /// Random unseen item from the curated pool, or `None` once the session
    /// is closed or the pool is exhausted.
    pub fn next_candidate(
        &self,
        session_id: SessionId,
        filters: &RecommendationFilters,
    ) -> Option<Item> {
        let session = self.sessions.get(session_id)?;
        if session.is_completed() {
            return None;
        }

        let seen = self.interactions.item_ids_by_session(session_id);
        let candidates: Vec<Item> = self
            .catalog
            .list_top_excluding(&seen, self.config.session.top_pool_size)
            .into_iter()
            .filter(|item| filters.matches(item))
            .collect();

        candidates.choose(&mut rand::thread_rng()).cloned()
    }

    /// Records a decision on `item_id` and advances the session.
    ///
    /// Returns `None` without recording anything when the session is
    /// unknown or closed, or the item is not in the catalog. A score makes
    /// the interaction a valid evaluation whatever the decision.
    pub fn register_decision(
        &self,
        session_id: SessionId,
        item_id: ItemId,
        decision: Decision,
        score: Option<u8>,
    ) -> Option<Interaction> {
        let lock = self.session_lock(session_id)?;
        let _guard = lock.lock();

        let mut session = self.sessions.get(session_id)?;
        if session.is_completed() {
            debug!("Ignoring decision on completed session {}", session_id);
            self.locks.remove(&session_id);
            return None;
        }
        self.catalog.get(item_id)?;

        let interaction = self.interactions.append(NewInteraction {
            user_id: session.user_id,
            item_id,
            session_id,
            decision,
            score,
        });

        let closed = interaction.is_valid_evaluation() && session.register_valid_evaluation();
        self.sessions.update(session);
        if closed {
            // frozen from here on, later callers bail out on the status check
            self.locks.remove(&session_id);
            info!("Session {} completed", session_id);
        }

        Some(interaction)
    }

    /// Graded feedback on a recommended item.
    ///
    /// Allowed once the session unlocked recommendations, including after it
    /// completed; never changes session progress.
    pub fn rate_recommendation(
        &self,
        session_id: SessionId,
        item_id: ItemId,
        score: u8,
    ) -> Option<Interaction> {
        let session = self.sessions.get(session_id)?;
        if session.valid_evaluations < self.config.recommendation.min_evaluations_for_recommendations {
            return None;
        }
        self.catalog.get(item_id)?;

        let interaction = self.interactions.append(NewInteraction {
            user_id: session.user_id,
            item_id,
            session_id,
            decision: Decision::Like,
            score: Some(score),
        });
        debug!(
            "Recorded rating {} for item {} in session {}",
            score, item_id, session_id
        );
        Some(interaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::{InMemoryCatalog, InMemoryInteractionLog, InMemorySessionStore};

    fn service() -> (SessionService, Arc<InMemoryInteractionLog>) {
        let catalog = Arc::new(InMemoryCatalog::with_items(vec![
            Item::new(1, "Action One")
                .with_categories(&["Action"])
                .with_rating(8.0)
                .with_popularity(0.9)
                .curated(),
            Item::new(2, "Drama Story")
                .with_categories(&["Drama"])
                .with_rating(7.0)
                .with_popularity(0.6)
                .curated(),
            Item::new(3, "Comedy Time")
                .with_categories(&["Comedy"])
                .with_rating(6.5)
                .with_popularity(0.5)
                .with_duration(95)
                .curated(),
        ]));
        let log = Arc::new(InMemoryInteractionLog::default());
        let service = SessionService::new(
            Arc::new(InMemorySessionStore::default()),
            log.clone(),
            catalog,
            Arc::new(Config::default()),
        );
        (service, log)
    }

    #[test]
    fn test_session_flow_marks_completion() {
        let (service, log) = service();
        let session = service.start_session(42, Some(2));

        let first = service
            .next_candidate(session.id, &RecommendationFilters::default())
            .unwrap();
        assert!(service
            .register_decision(session.id, first.id, Decision::Like, None)
            .is_some());
        assert_eq!(service.get_session(session.id).unwrap().status, SessionStatus::Active);

        let second = service
            .next_candidate(session.id, &RecommendationFilters::default())
            .unwrap();
        assert_ne!(first.id, second.id);
        service.register_decision(session.id, second.id, Decision::Dislike, None);

        let updated = service.get_session(session.id).unwrap();
        assert_eq!(updated.valid_evaluations, 2);
        assert_eq!(updated.status, SessionStatus::Completed);
        assert!(updated.finished_at.is_some());

        // frozen after completion
        assert!(service
            .register_decision(session.id, 3, Decision::Like, None)
            .is_none());
        assert_eq!(service.get_session(session.id).unwrap().valid_evaluations, 2);
        assert_eq!(log.list_by_session(session.id).len(), 2);
        assert!(service
            .next_candidate(session.id, &RecommendationFilters::default())
            .is_none());
    }

    #[test]
    fn test_not_evaluated_marks_seen_without_progress() {
        let (service, _log) = service();
        let session = service.start_session(1, Some(2));

        let interaction = service
            .register_decision(session.id, 1, Decision::NotEvaluated, None)
            .unwrap();
        assert!(!interaction.is_valid_evaluation());
        assert_eq!(service.get_session(session.id).unwrap().valid_evaluations, 0);

        for _ in 0..10 {
            let next = service
                .next_candidate(session.id, &RecommendationFilters::default())
                .unwrap();
            assert_ne!(next.id, 1);
        }
    }

    #[test]
    fn test_scored_not_evaluated_counts_as_valid() {
        let (service, _log) = service();
        let session = service.start_session(1, Some(1));

        let interaction = service
            .register_decision(session.id, 1, Decision::NotEvaluated, Some(4))
            .unwrap();
        assert_eq!(interaction.score, Some(4));
        assert!(interaction.is_valid_evaluation());

        let updated = service.get_session(session.id).unwrap();
        assert_eq!(updated.valid_evaluations, 1);
        assert_eq!(updated.status, SessionStatus::Completed);
        assert!(updated.finished_at.is_some());
    }

    #[test]
    fn test_zero_target_is_raised_to_one() {
        let (service, log) = service();
        let session = service.start_session(1, Some(0));
        assert_eq!(session.target_evaluations, 1);
        assert_eq!(session.status, SessionStatus::Active);

        assert!(service
            .register_decision(session.id, 1, Decision::Like, None)
            .is_some());
        let updated = service.get_session(session.id).unwrap();
        assert_eq!(updated.status, SessionStatus::Completed);
        assert!(updated.finished_at.is_some());
        assert_eq!(log.list_by_session(session.id).len(), 1);
    }

    #[test]
    fn test_locks_only_for_live_sessions() {
        let (service, _log) = service();
        for session_id in 1000..2000 {
            assert!(service
                .register_decision(session_id, 1, Decision::Like, None)
                .is_none());
            assert!(service.rate_recommendation(session_id, 1, 5).is_none());
        }
        assert!(service.locks.is_empty());

        let session = service.start_session(1, Some(2));
        service.register_decision(session.id, 1, Decision::Like, None);
        assert_eq!(service.locks.len(), 1);
        service.register_decision(session.id, 2, Decision::Like, None);
        assert!(service.get_session(session.id).unwrap().is_completed());
        assert!(service.locks.is_empty());

        assert!(service
            .register_decision(session.id, 3, Decision::Like, None)
            .is_none());
        assert!(service.locks.is_empty());
    }

    #[test]
    fn test_graded_score_counts_as_valid() {
        let (service, _log) = service();
        let session = service.start_session(1, Some(1));
        service.register_decision(session.id, 2, Decision::Like, Some(5));
        assert_eq!(
            service.get_session(session.id).unwrap().status,
            SessionStatus::Completed
        );
    }

    #[test]
    fn test_unknown_session_or_item() {
        let (service, _log) = service();
        assert!(service.register_decision(99, 1, Decision::Like, None).is_none());
        assert!(service
            .next_candidate(99, &RecommendationFilters::default())
            .is_none());

        let session = service.start_session(1, None);
        assert!(service
            .register_decision(session.id, 404, Decision::Like, None)
            .is_none());
        assert_eq!(service.progress(session.id).unwrap().target, 20);
    }

    #[test]
    fn test_next_candidate_filters() {
        let (service, _log) = service();
        let session = service.start_session(1, None);
        let filters = RecommendationFilters {
            categories: vec![],
            duration: Some(DurationBucket::Short),
        };
        let item = service.next_candidate(session.id, &filters).unwrap();
        assert_eq!(item.id, 3);

        service.register_decision(session.id, 3, Decision::Like, None);
        assert!(service.next_candidate(session.id, &filters).is_none());
    }

    #[test]
    fn test_rate_recommendation_requires_threshold() {
        let (service, log) = service();
        let session = service.start_session(1, Some(20));
        assert!(service.rate_recommendation(session.id, 1, 5).is_none());

        let mut unlocked = service.get_session(session.id).unwrap();
        unlocked.valid_evaluations = 5;
        service.sessions.update(unlocked);

        let rating = service.rate_recommendation(session.id, 1, 5).unwrap();
        assert_eq!(rating.score, Some(5));
        assert_eq!(rating.decision, Decision::Like);
        assert_eq!(service.get_session(session.id).unwrap().valid_evaluations, 5);
        assert_eq!(log.list_by_session(session.id).len(), 1);
    }

    #[test]
    fn test_concurrent_registrations_complete_once() {
        let (service, log) = service();
        let service = Arc::new(service);
        let session = service.start_session(1, Some(2));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service.register_decision(session.id, (i % 3) + 1, Decision::Like, None)
                })
            })
            .collect();
        let accepted = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();

        assert_eq!(accepted, 2);
        assert_eq!(service.get_session(session.id).unwrap().valid_evaluations, 2);
        assert_eq!(log.list_by_session(session.id).len(), 2);
    }
}
