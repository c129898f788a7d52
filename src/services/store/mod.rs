//! Capability traits over catalog, interaction and session storage.
//!
//! Services only talk to these traits; the in-memory implementations in
//! [`memory`] back the server and the tests.

pub mod memory;

use crate::models::*;
use std::collections::{HashMap, HashSet};

pub use memory::{InMemoryCatalog, InMemoryInteractionLog, InMemorySessionStore};

/// Read-only view of the item catalog.
pub trait CatalogView: Send + Sync {
    fn get(&self, item_id: ItemId) -> Option<Item>;

    fn list_all(&self) -> Vec<Item>;

    fn len(&self) -> usize {
        self.list_all().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn items_by_id(&self) -> HashMap<ItemId, Item> {
        self.list_all().into_iter().map(|item| (item.id, item)).collect()
    }

    /// Most popular items first, at most `limit`.
    fn list_catalog(&self, limit: usize) -> Vec<Item> {
        let mut items = self.list_all();
        sort_by_popularity(&mut items);
        items.truncate(limit);
        items
    }

    /// Curated items by popularity, topped up with the rest by popularity.
    fn list_top_pool(&self, limit: usize) -> Vec<Item> {
        let (mut curated, mut others): (Vec<Item>, Vec<Item>) =
            self.list_all().into_iter().partition(|item| item.curated);
        sort_by_popularity(&mut curated);
        if curated.len() >= limit {
            curated.truncate(limit);
            return curated;
        }
        sort_by_popularity(&mut others);
        curated.extend(others);
        curated.truncate(limit);
        curated
    }

    fn list_top_excluding(&self, excluded: &HashSet<ItemId>, limit: usize) -> Vec<Item> {
        self.list_top_pool(limit)
            .into_iter()
            .filter(|item| !excluded.contains(&item.id))
            .collect()
    }
}

/// Append-only interaction log.
pub trait InteractionLog: Send + Sync {
    /// Allocates an id and stores the interaction.
    fn append(&self, interaction: NewInteraction) -> Interaction;

    fn list_by_session(&self, session_id: SessionId) -> Vec<Interaction>;

    fn list_by_user(&self, user_id: UserId) -> Vec<Interaction>;

    /// Every item that already has an interaction in the session.
    fn item_ids_by_session(&self, session_id: SessionId) -> HashSet<ItemId> {
        self.list_by_session(session_id)
            .into_iter()
            .map(|interaction| interaction.item_id)
            .collect()
    }
}

/// Session records with last-write-wins updates.
pub trait SessionStore: Send + Sync {
    fn create(&self, user_id: UserId, target_evaluations: u32) -> EvaluationSession;

    fn get(&self, session_id: SessionId) -> Option<EvaluationSession>;

    fn update(&self, session: EvaluationSession);
}

/// Interaction fields supplied by the caller; the log assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub session_id: SessionId,
    pub decision: Decision,
    pub score: Option<u8>,
}

fn sort_by_popularity(items: &mut [Item]) {
    items.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
}
