use crate::dashboard::TopicView;
use crate::llm::Message;
use crate::records::{AuthUser, BaselineReport, DropdownData, Topic, TopicRecords};
use crate::selection::{Level, SelectionChange, SelectionError, SelectionState};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

pub const CHAT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("log in first")]
    NotLoggedIn,
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotLoggedIn => "not_logged_in",
            SessionError::Selection(_) => "bad_selection",
        }
    }
}

/// Composite cache key, e.g. `12:4` for batch 12 / subject 4.
pub fn cache_key(parts: &[i64]) -> String {
    parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// Independent cache namespaces. Raw fetches are keyed by the full
/// composite they were fetched for; `views` holds derived aggregates and is
/// the only namespace pruned on selection changes.
#[derive(Debug, Default)]
pub struct SessionCaches {
    pub dropdowns: HashMap<String, DropdownData>,
    pub topics: HashMap<String, Vec<Topic>>,
    pub merged: HashMap<String, TopicRecords>,
    pub views: HashMap<String, TopicView>,
    pub baseline: HashMap<String, BaselineReport>,
}

impl SessionCaches {
    pub fn stats(&self) -> serde_json::Value {
        json!({
            "dropdowns": self.dropdowns.len(),
            "topics": self.topics.len(),
            "merged": self.merged.len(),
            "views": self.views.len(),
            "baseline": self.baseline.len(),
        })
    }

    fn drop_views_with_prefix(&mut self, prefix: &str) -> usize {
        let before = self.views.len();
        self.views
            .retain(|k, _| !(k == prefix || k.starts_with(&format!("{}:", prefix))));
        before - self.views.len()
    }
}

/// Everything one user session owns. Handed to every handler explicitly;
/// logout replaces it wholesale.
#[derive(Debug)]
pub struct SessionContext {
    pub session_id: String,
    pub user: Option<AuthUser>,
    pub logged_in_at: Option<DateTime<Utc>>,
    pub selection: SelectionState,
    pub caches: SessionCaches,
    pub chat: Vec<Message>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user: None,
            logged_in_at: None,
            selection: SelectionState::default(),
            caches: SessionCaches::default(),
            chat: Vec::new(),
        }
    }

    pub fn login(&mut self, user: AuthUser) {
        *self = Self::new();
        info!(session_id = %self.session_id, user_id = user.user_id, "session started");
        self.user = Some(user);
        self.logged_in_at = Some(Utc::now());
    }

    pub fn logout(&mut self) {
        info!(session_id = %self.session_id, "session cleared");
        *self = Self::new();
    }

    pub fn user(&self) -> Result<&AuthUser, SessionError> {
        self.user.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    /// Move the drill-down cursor and drop derived views keyed by the
    /// combination that just went stale.
    pub fn select(
        &mut self,
        level: Level,
        id: Option<i64>,
    ) -> Result<SelectionChange, SessionError> {
        self.user()?;
        let change = self.selection.select(level, id)?;
        if change.changed {
            let prev = &change.previous;
            let stale = match level {
                Level::Batch => prev.batch_id.map(|b| cache_key(&[b])),
                Level::Subject => match (prev.batch_id, prev.subject_id) {
                    (Some(b), Some(s)) => Some(cache_key(&[b, s])),
                    _ => None,
                },
                Level::Topic => match (prev.batch_id, prev.subject_id, prev.topic_id) {
                    (Some(b), Some(s), Some(t)) => Some(cache_key(&[b, s, t])),
                    _ => None,
                },
                Level::Concept | Level::Student => None,
            };
            if let Some(prefix) = stale {
                let dropped = self.caches.drop_views_with_prefix(&prefix);
                debug!(
                    level = level.as_str(),
                    prefix = %prefix,
                    dropped,
                    "invalidated cached views"
                );
            }
        }
        Ok(change)
    }

    pub fn push_chat(&mut self, message: Message) {
        self.chat.push(message);
        if self.chat.len() > CHAT_HISTORY_LIMIT {
            let excess = self.chat.len() - CHAT_HISTORY_LIMIT;
            self.chat.drain(0..excess);
        }
    }

    pub fn summary(&self) -> serde_json::Value {
        json!({
            "sessionId": self.session_id,
            "user": self.user,
            "loggedInAt": self.logged_in_at.map(|t| t.to_rfc3339()),
            "selection": self.selection,
            "phase": self.selection.phase(),
            "caches": self.caches.stats(),
            "chatTurns": self.chat.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::TopicView;

    fn logged_in() -> SessionContext {
        let mut ctx = SessionContext::new();
        ctx.login(AuthUser {
            user_id: 5,
            user_name: "teacher".into(),
            ..Default::default()
        });
        ctx
    }

    #[test]
    fn cache_key_joins_with_colons() {
        assert_eq!(cache_key(&[12, 4]), "12:4");
        assert_eq!(cache_key(&[]), "");
    }

    #[test]
    fn selection_requires_login() {
        let mut ctx = SessionContext::new();
        let e = ctx.select(Level::Batch, Some(1)).unwrap_err();
        assert_eq!(e.code(), "not_logged_in");
    }

    #[test]
    fn changing_topic_drops_only_the_stale_view() {
        let mut ctx = logged_in();
        ctx.select(Level::Batch, Some(1)).expect("batch");
        ctx.select(Level::Subject, Some(2)).expect("subject");
        ctx.select(Level::Topic, Some(3)).expect("topic");
        ctx.caches.views.insert("1:2:3".into(), TopicView::empty(1, 2, 3));
        ctx.caches.views.insert("1:2:30".into(), TopicView::empty(1, 2, 30));
        ctx.caches.views.insert("1:20:3".into(), TopicView::empty(1, 20, 3));

        ctx.select(Level::Topic, Some(4)).expect("new topic");
        assert!(!ctx.caches.views.contains_key("1:2:3"));
        assert!(ctx.caches.views.contains_key("1:2:30"));
        assert!(ctx.caches.views.contains_key("1:20:3"));

        ctx.select(Level::Batch, Some(9)).expect("new batch");
        assert!(ctx.caches.views.is_empty());
    }

    #[test]
    fn logout_clears_everything() {
        let mut ctx = logged_in();
        let first_id = ctx.session_id.clone();
        ctx.select(Level::Batch, Some(1)).expect("batch");
        ctx.caches.merged.insert("1:3".into(), TopicRecords::default());
        ctx.push_chat(Message::user("hi"));

        ctx.logout();
        assert!(ctx.user.is_none());
        assert_eq!(ctx.selection, SelectionState::default());
        assert!(ctx.caches.merged.is_empty());
        assert!(ctx.chat.is_empty());
        assert_ne!(ctx.session_id, first_id);
    }

    #[test]
    fn chat_history_is_bounded() {
        let mut ctx = logged_in();
        for i in 0..(CHAT_HISTORY_LIMIT + 5) {
            ctx.push_chat(Message::user(format!("m{}", i)));
        }
        assert_eq!(ctx.chat.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(ctx.chat[0].content, "m5");
    }
}
