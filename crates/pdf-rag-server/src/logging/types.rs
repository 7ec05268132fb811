use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    Ingest,
    Ask,
    Reset,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Ingest => "ingest",
            ActivityType::Ask => "ask",
            ActivityType::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Success,
    Error,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Success => "success",
            ActivityStatus::Error => "error",
        }
    }
}

/// One engine operation as recorded by the background activity logger.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub activity_type: ActivityType,
    pub status: ActivityStatus,
    pub document_id: Option<String>,
    pub conversation_id: Option<String>,
    pub detail: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn success(activity_type: ActivityType, duration_ms: i64) -> Self {
        Self {
            activity_type,
            status: ActivityStatus::Success,
            document_id: None,
            conversation_id: None,
            detail: None,
            duration_ms,
            created_at: Utc::now(),
        }
    }

    pub fn error(activity_type: ActivityType, duration_ms: i64, detail: impl Into<String>) -> Self {
        Self {
            activity_type,
            status: ActivityStatus::Error,
            document_id: None,
            conversation_id: None,
            detail: Some(detail.into()),
            duration_ms,
            created_at: Utc::now(),
        }
    }

    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}
