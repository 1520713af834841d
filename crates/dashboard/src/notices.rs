//! One-shot notices ("flash" messages).
//!
//! A notice is queued in the visitor's session and shown on the next page
//! that renders the notice area, then discarded.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session key holding the queued notices.
const NOTICES_KEY: &str = "notices";

/// Severity of a notice; also the CSS modifier of its banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    /// CSS class suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Queue a notice for the next rendered page.
///
/// A session store failure only loses the notice, so it is logged and
/// swallowed.
pub async fn push_notice(session: &Session, notice: Notice) {
    let mut queued: Vec<Notice> = session
        .get(NOTICES_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    // The same warning twice in a row (e.g. repeated redirects) shows once.
    if queued.last() != Some(&notice) {
        queued.push(notice);
    }

    if let Err(e) = session.insert(NOTICES_KEY, queued).await {
        tracing::warn!(error = %e, "Failed to queue notice");
    }
}

/// Take every queued notice, leaving the queue empty.
pub async fn take_notices(session: &Session) -> Vec<Notice> {
    match session.remove::<Vec<Notice>>(NOTICES_KEY).await {
        Ok(notices) => notices.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read notices");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_notices_are_one_shot() {
        let session = session();
        push_notice(&session, Notice::success("Signed out.")).await;
        push_notice(&session, Notice::warning("Managers only.")).await;

        let notices = take_notices(&session).await;
        assert_eq!(
            notices,
            vec![Notice::success("Signed out."), Notice::warning("Managers only.")]
        );
        assert!(take_notices(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_consecutive_duplicates_collapse() {
        let session = session();
        push_notice(&session, Notice::warning("Managers only.")).await;
        push_notice(&session, Notice::warning("Managers only.")).await;

        assert_eq!(take_notices(&session).await.len(), 1);
    }

    #[test]
    fn test_level_css_class() {
        assert_eq!(Notice::error("x").level.as_str(), "error");
        assert_eq!(Notice::info("x").level.as_str(), "info");
    }
}
