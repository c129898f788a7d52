use super::{CatalogView, InteractionLog, NewInteraction, SessionStore};
use crate::models::*;
use crate::utils::IdAllocator;
use anyhow::{Context, Result};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Catalog held in memory, iterated in id order.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<BTreeMap<ItemId, Item>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let catalog = Self::new();
        catalog.add_items(items);
        catalog
    }

    /// Adds or replaces items by id.
    pub fn add_items(&self, items: impl IntoIterator<Item = Item>) {
        let mut guard = self.items.write();
        for item in items {
            guard.insert(item.id, item);
        }
    }

    /// Parses a JSON array of catalog entries.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let items: Vec<Item> = serde_json::from_str(json).context("invalid catalog JSON")?;
        Ok(Self::with_items(items))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&raw)?;
        info!("Loaded {} catalog items from {}", catalog.len(), path.display());
        Ok(catalog)
    }
}

impl CatalogView for InMemoryCatalog {
    fn get(&self, item_id: ItemId) -> Option<Item> {
        self.items.read().get(&item_id).cloned()
    }

    fn list_all(&self) -> Vec<Item> {
        self.items.read().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.items.read().len()
    }
}

pub struct InMemoryInteractionLog {
    interactions: DashMap<InteractionId, Interaction>,
    ids: Arc<IdAllocator>,
}

impl InMemoryInteractionLog {
    pub fn new(ids: Arc<IdAllocator>) -> Self {
        Self {
            interactions: DashMap::new(),
            ids,
        }
    }

    fn collect_sorted(&self, predicate: impl Fn(&Interaction) -> bool) -> Vec<Interaction> {
        let mut found: Vec<Interaction> = self
            .interactions
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|interaction| interaction.id);
        found
    }
}

impl Default for InMemoryInteractionLog {
    fn default() -> Self {
        Self::new(Arc::new(IdAllocator::new()))
    }
}

impl InteractionLog for InMemoryInteractionLog {
    fn append(&self, new: NewInteraction) -> Interaction {
        let interaction = Interaction {
            id: self.ids.next_id(),
            user_id: new.user_id,
            item_id: new.item_id,
            session_id: new.session_id,
            decision: new.decision,
            score: new.score,
            timestamp: Utc::now(),
        };
        self.interactions.insert(interaction.id, interaction.clone());
        interaction
    }

    fn list_by_session(&self, session_id: SessionId) -> Vec<Interaction> {
        self.collect_sorted(|interaction| interaction.session_id == session_id)
    }

    fn list_by_user(&self, user_id: UserId) -> Vec<Interaction> {
        self.collect_sorted(|interaction| interaction.user_id == user_id)
    }
}

pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, EvaluationSession>,
    ids: Arc<IdAllocator>,
}

impl InMemorySessionStore {
    pub fn new(ids: Arc<IdAllocator>) -> Self {
        Self {
            sessions: DashMap::new(),
            ids,
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Arc::new(IdAllocator::new()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, user_id: UserId, target_evaluations: u32) -> EvaluationSession {
        let session = EvaluationSession::new(self.ids.next_id(), user_id, target_evaluations);
        self.sessions.insert(session.id, session.clone());
        session
    }

    fn get(&self, session_id: SessionId) -> Option<EvaluationSession> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
    }

    fn update(&self, session: EvaluationSession) {
        self.sessions.insert(session.id, session);
    }
}
