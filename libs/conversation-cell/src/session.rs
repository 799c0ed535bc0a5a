// libs/conversation-cell/src/session.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use shared_models::UserId;

use crate::models::ConversationState;

#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub user_id: UserId,
    pub state: ConversationState,
}

impl ConversationSession {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: ConversationState::Idle,
        }
    }

    pub fn transition(&mut self, next: ConversationState) {
        if self.state != next {
            debug!("User {} moves {:?} -> {:?}", self.user_id, self.state, next);
        }
        self.state = next;
    }

    /// Returns to `Idle`, handing back whatever was buffered.
    pub fn reset(&mut self) -> ConversationState {
        std::mem::take(&mut self.state)
    }
}

/// Sessions keyed by user. Each session sits behind its own async mutex so
/// a user's events run one at a time while other users proceed.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Arc<Mutex<ConversationSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Created on first use.
    pub async fn session(&self, user_id: UserId) -> Arc<Mutex<ConversationSession>> {
        if let Some(session) = self.sessions.read().await.get(&user_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(ConversationSession::new(user_id))))
            .clone()
    }

    pub async fn state_of(&self, user_id: UserId) -> ConversationState {
        let session = self.sessions.read().await.get(&user_id).cloned();
        match session {
            Some(session) => session.lock().await.state.clone(),
            None => ConversationState::Idle,
        }
    }

    pub async fn clear(&self, user_id: UserId) {
        let session = self.sessions.read().await.get(&user_id).cloned();
        if let Some(session) = session {
            session.lock().await.reset();
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
