// src/notify.rs
use crate::broadcast::Broadcast;
use chrono::{DateTime, Local};
use log::info;
use std::collections::VecDeque;

pub const NOTIFICATION_TAG: &str = "VTAlert";
pub const MANUAL_REFRESH_MESSAGE: &str = "Manually Refreshed";

/// One-way line sink for user-facing alerts.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

pub fn live_alert(broadcast: &Broadcast) -> String {
    format!(
        "{} is live: {} Link: {}",
        broadcast.channel_name(),
        broadcast.title(),
        broadcast.watch_url()
    )
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub received_at: DateTime<Local>,
    pub message: String,
}

/// Notification panel contents, newest first.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    capacity: usize,
    pub scroll_offset: u16,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}

impl NotificationLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: VecDeque::new(), capacity: capacity.max(1), scroll_offset: 0 }
    }

    pub fn entries(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.front()
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        let max = self.entries.len().saturating_sub(1) as u16;
        self.scroll_offset = self.scroll_offset.saturating_add(amount).min(max);
    }
}

impl Notifier for NotificationLog {
    fn notify(&mut self, message: &str) {
        info!("[{}] {}", NOTIFICATION_TAG, message);
        self.entries.push_front(Notification { received_at: Local::now(), message: message.to_string() });
        self.entries.truncate(self.capacity);
        // Keep the newest line in view.
        self.scroll_offset = 0;
    }
}

/// Headless sink: writes tagged lines to stderr.
#[derive(Debug, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&mut self, message: &str) {
        info!("[{}] {}", NOTIFICATION_TAG, message);
        eprintln!("[{}] {}", NOTIFICATION_TAG, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{BroadcastStatus, VideoId};

    #[test]
    fn live_alert_format() {
        let b = Broadcast::new(
            VideoId::new("v1"),
            "Morning stream".to_string(),
            "Some Channel".to_string(),
            BroadcastStatus::Live,
            String::new(),
        );
        assert_eq!(
            live_alert(&b),
            "Some Channel is live: Morning stream Link: https://www.youtube.com/watch?v=v1"
        );
    }

    #[test]
    fn log_keeps_newest_first_and_caps() {
        let mut log = NotificationLog::with_capacity(2);
        log.notify("one");
        log.notify("two");
        log.notify("three");

        let messages: Vec<&str> = log.entries().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["three", "two"]);
        assert_eq!(log.latest().map(|n| n.message.as_str()), Some("three"));
    }

    #[test]
    fn scrolling_is_clamped() {
        let mut log = NotificationLog::default();
        log.notify("a");
        log.notify("b");
        log.scroll_down(10);
        assert_eq!(log.scroll_offset, 1);
        log.scroll_up(5);
        assert_eq!(log.scroll_offset, 0);
    }
}
