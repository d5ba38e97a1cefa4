use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEvent {
    pub id: String,
    pub message: String,
    pub status: StageStatus,
    pub timestamp: DateTime<Utc>,
}

/// Append-only record of one run. Only the newest entry ever changes status.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    events: Vec<StageEvent>,
}

impl ActivityLog {
    pub fn begin(&mut self, message: impl Into<String>) -> &StageEvent {
        self.events.push(StageEvent {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            status: StageStatus::Pending,
            timestamp: Utc::now(),
        });
        &self.events[self.events.len() - 1]
    }

    pub fn resolve_last(&mut self, status: StageStatus) -> Option<&StageEvent> {
        let last = self.events.last_mut()?;
        last.status = status;
        Some(last)
    }

    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
