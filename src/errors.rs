use crate::db::StoreError;

/// Failure of a single inbound event. The display text is what the
/// requester receives in its `error` event; nothing is sent to other members.
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("Access denied to project")]
    AccessDenied,
    #[error("Join project {0} before sending events to it")]
    NotJoined(String),
    #[error("Malformed event payload: {0}")]
    Malformed(String),
    #[error("{action}")]
    Persistence {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl CollabError {
    pub fn persistence(action: &'static str, source: StoreError) -> Self {
        CollabError::Persistence { action, source }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        CollabError::Malformed(reason.into())
    }
}
