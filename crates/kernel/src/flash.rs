//! One-shot flash messages carried in the session across a redirect.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

const FLASH_SESSION_KEY: &str = "flash_messages";

/// Severity of a flash message, used as the CSS class when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub value: String,
}

/// Queue a message for the next rendered page.
pub async fn push_flash(session: &Session, level: FlashLevel, message: impl Into<String>) {
    let mut messages: Vec<FlashMessage> = session
        .get(FLASH_SESSION_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    messages.push(FlashMessage {
        level,
        value: message.into(),
    });

    if let Err(e) = session.insert(FLASH_SESSION_KEY, messages).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}

/// Remove and return all queued messages.
pub async fn take_flash(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(FLASH_SESSION_KEY).await {
        Ok(messages) => messages.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read flash messages");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn messages_are_consumed_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_flash(&session, FlashLevel::Success, "Saved.").await;
        push_flash(&session, FlashLevel::Warning, "Careful.").await;

        let messages = take_flash(&session).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].level, FlashLevel::Success);
        assert_eq!(messages[1].value, "Careful.");

        assert!(take_flash(&session).await.is_empty());
    }

    #[test]
    fn levels_serialize_lowercase() {
        let json = serde_json::to_string(&FlashLevel::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
