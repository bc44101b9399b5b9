// src/broadcast.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fmt;

pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Display format of scheduled starts, `M/d/yyyy h:mm:ss tt`.
pub const START_DISPLAY_FORMAT: &str = "%-m/%-d/%Y %-I:%M:%S %p";

// chrono's parser accepts unpadded fields for these specifiers.
const START_PARSE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

// === VIDEO ID ===
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl VideoId {
    pub fn new(s: &str) -> Self {
        VideoId(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// === STATUS ===
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStatus {
    Live,
    Upcoming,
    /// `new`, `past`, `missing` and anything Holodex adds later.
    #[serde(other)]
    Other,
}

impl fmt::Display for BroadcastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BroadcastStatus::Live => "live",
            BroadcastStatus::Upcoming => "upcoming",
            BroadcastStatus::Other => "other",
        };
        f.write_str(label)
    }
}

// === BROADCAST ===
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    id: VideoId,
    title: String,
    channel_name: String,
    status: BroadcastStatus,
    scheduled_start: String,
}

impl Broadcast {
    pub fn new(
        id: VideoId,
        title: String,
        channel_name: String,
        status: BroadcastStatus,
        scheduled_start: String,
    ) -> Self {
        Self { id, title, channel_name, status, scheduled_start }
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn status(&self) -> BroadcastStatus {
        self.status
    }

    pub fn is_live(&self) -> bool {
        self.status == BroadcastStatus::Live
    }

    /// Raw scheduled-start text as received.
    pub fn scheduled_start(&self) -> &str {
        &self.scheduled_start
    }

    /// Scheduled start as a UTC instant, `None` when the text does not parse.
    pub fn scheduled_start_utc(&self) -> Option<DateTime<Utc>> {
        parse_scheduled_start(&self.scheduled_start)
    }

    pub fn watch_url(&self) -> String {
        watch_url(&self.id)
    }
}

pub fn watch_url(id: &VideoId) -> String {
    format!("{}{}", WATCH_URL_BASE, id)
}

/// Accepts `M/d/yyyy h:mm:ss tt` (taken as UTC) and RFC 3339.
pub fn parse_scheduled_start(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, START_PARSE_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

impl fmt::Display for Broadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {} ({})", self.status, self.channel_name, self.title, self.id)
    }
}
