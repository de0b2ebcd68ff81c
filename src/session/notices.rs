//! Transient on-screen notices.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
}

/// Active notices, newest first. Expiry is scheduled by the driver.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> Uuid {
        let notice = Notice {
            id: Uuid::new_v4(),
            severity,
            message: message.into(),
        };
        let id = notice.id;
        self.notices.insert(0, notice);
        id
    }

    /// Returns whether the notice was still showing.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    pub fn active(&self) -> &[Notice] {
        &self.notices
    }
}
