use crate::algorithms::ProfileBuilder;
use crate::models::*;
use crate::services::store::{CatalogView, InteractionLog};
use std::sync::Arc;
use tracing::debug;

/// Builds preference profiles from the stored interaction history.
pub struct PreferenceService {
    interactions: Arc<dyn InteractionLog>,
    catalog: Arc<dyn CatalogView>,
    builder: ProfileBuilder,
}

impl PreferenceService {
    pub fn new(interactions: Arc<dyn InteractionLog>, catalog: Arc<dyn CatalogView>) -> Self {
        Self {
            interactions,
            catalog,
            builder: ProfileBuilder::new(),
        }
    }

    /// Profile from one session's interactions, or from the whole user history
    /// when no session is given.
    pub fn build_profile(&self, user_id: UserId, session_id: Option<SessionId>) -> UserPreferenceProfile {
        let interactions = match session_id {
            Some(session_id) => self.interactions.list_by_session(session_id),
            None => self.interactions.list_by_user(user_id),
        };

        let items_by_id = self.catalog.items_by_id();
        let profile = self.builder.build(user_id, &interactions, &items_by_id);

        debug!(
            "Built profile for user {} from {} interactions ({} categories)",
            user_id,
            interactions.len(),
            profile.category_affinities.len()
        );
        profile
    }
}
