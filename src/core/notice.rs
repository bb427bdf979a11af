use std::time::{
    Duration,
    Instant,
};

use tracing::{
    error,
    info,
};

use super::AnkimorphError;

pub const VISIBLE_NOTICES: usize = 2;
pub const INFO_LIFETIME: Duration = Duration::from_secs(3);
pub const ERROR_LIFETIME: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Short-lived messages shown in the corner of the screen.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, text: impl Into<String>, lifetime: Duration) {
        self.push_at(severity, text, lifetime, Instant::now());
    }

    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.push(Severity::Info, text, INFO_LIFETIME);
    }

    pub fn error(&mut self, err: &AnkimorphError) {
        error!("{}", err);
        self.push(Severity::Error, err.to_string(), ERROR_LIFETIME);
    }

    pub fn push_at(&mut self, severity: Severity, text: impl Into<String>, lifetime: Duration, now: Instant) {
        self.notices.push(Notice { severity, text: text.into(), expires_at: now + lifetime });
    }

    /// Drops expired notices. Called once per UI tick.
    pub fn prune(&mut self, now: Instant) {
        self.notices.retain(|notice| !notice.is_expired(now));
    }

    /// The most recent notices, newest last.
    pub fn visible(&self) -> &[Notice] {
        let skip = self.notices.len().saturating_sub(VISIBLE_NOTICES);
        &self.notices[skip..]
    }

    pub fn hidden_count(&self) -> usize {
        self.notices.len().saturating_sub(VISIBLE_NOTICES)
    }

    /// "There are N more logs" when notices are hidden.
    pub fn overflow_line(&self) -> Option<String> {
        match self.hidden_count() {
            0 => None,
            n => Some(format!("There are {} more logs", n)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
