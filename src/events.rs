use serde::{Deserialize, Serialize};

/// How long a notice should stay visible to the consumer.
///
/// Transient notices are the per-upload toasts (auto-dismissed by the UI
/// after a fixed delay); persistent notices stay up until resolved, e.g.
/// the device-unavailable banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Transient,
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Info,
    Error,
}

/// User-facing status message emitted by the capture core.
///
/// The core never renders anything; notices go out over a channel and the
/// embedding UI decides how to show them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub severity: NoticeSeverity,
    pub message: String,
}

impl Notice {
    pub fn transient(severity: NoticeSeverity, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Transient,
            severity,
            message: message.into(),
        }
    }

    pub fn persistent(severity: NoticeSeverity, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Persistent,
            severity,
            message: message.into(),
        }
    }
}
