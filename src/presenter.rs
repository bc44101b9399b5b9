// src/presenter.rs
use crate::broadcast::{Broadcast, BroadcastStatus, START_DISPLAY_FORMAT};
use crate::config::Config;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

pub const LIVE_LABEL: &str = "Currently Live";
pub const UNKNOWN_TIME_LABEL: &str = "Unknown";

/// Display-time visibility, re-read from the config every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFilter {
    pub show_live: bool,
    pub show_upcoming: bool,
}

impl DisplayFilter {
    pub fn from_config(config: &Config) -> Self {
        Self { show_live: config.show_live, show_upcoming: config.show_upcoming }
    }

    fn shows(&self, status: BroadcastStatus) -> bool {
        match status {
            BroadcastStatus::Live => self.show_live,
            BroadcastStatus::Upcoming => self.show_upcoming,
            BroadcastStatus::Other => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub time: String,
    pub channel: String,
    pub title: String,
    pub url: String,
}

/// Sorted, filtered rows for one frame. Start times are shown in `tz`.
pub fn build_rows<Tz>(snapshot: &[Broadcast], filter: DisplayFilter, tz: &Tz) -> Vec<TableRow>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    sorted_by_start(snapshot)
        .into_iter()
        .filter(|b| filter.shows(b.status()))
        .map(|b| TableRow {
            time: time_label(b, tz),
            channel: b.channel_name().to_string(),
            title: b.title().to_string(),
            url: b.watch_url(),
        })
        .collect()
}

/// Stable ascending sort by scheduled start; unparsable starts come first.
pub fn sorted_by_start(snapshot: &[Broadcast]) -> Vec<&Broadcast> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &Broadcast)> =
        snapshot.iter().map(|b| (b.scheduled_start_utc(), b)).collect();
    // `None` orders before any `Some`.
    keyed.sort_by_key(|(start, _)| *start);
    keyed.into_iter().map(|(_, b)| b).collect()
}

pub fn time_label<Tz>(broadcast: &Broadcast, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if broadcast.is_live() {
        return LIVE_LABEL.to_string();
    }
    match broadcast.scheduled_start_utc() {
        Some(start) => start.with_timezone(tz).format(START_DISPLAY_FORMAT).to_string(),
        None if broadcast.scheduled_start().trim().is_empty() => UNKNOWN_TIME_LABEL.to_string(),
        None => broadcast.scheduled_start().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::VideoId;
    use chrono::FixedOffset;

    const BOTH: DisplayFilter = DisplayFilter { show_live: true, show_upcoming: true };

    fn b(id: &str, status: BroadcastStatus, start: &str) -> Broadcast {
        Broadcast::new(
            VideoId::new(id),
            format!("title {id}"),
            format!("channel {id}"),
            status,
            start.to_string(),
        )
    }

    #[test]
    fn sorts_ascending_with_unparsable_first() {
        let snapshot = vec![
            b("ten", BroadcastStatus::Upcoming, "1/1/2024 10:00:00 AM"),
            b("nine", BroadcastStatus::Upcoming, "1/1/2024 09:00:00 AM"),
            b("bad", BroadcastStatus::Upcoming, "not a date"),
        ];
        let rows = build_rows(&snapshot, BOTH, &Utc);
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["title bad", "title nine", "title ten"]);
        assert_eq!(rows[0].time, "not a date");
    }

    #[test]
    fn live_rows_sort_by_schedule_and_show_label() {
        let snapshot = vec![
            b("later", BroadcastStatus::Upcoming, "1/2/2024 1:00:00 PM"),
            b("live", BroadcastStatus::Live, "1/3/2024 1:00:00 PM"),
        ];
        let rows = build_rows(&snapshot, BOTH, &Utc);
        assert_eq!(rows[0].time, "1/2/2024 1:00:00 PM");
        assert_eq!(rows[1].time, LIVE_LABEL);
        assert_eq!(rows[1].url, "https://www.youtube.com/watch?v=live");
    }

    #[test]
    fn converts_start_into_display_timezone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let upcoming = b("v", BroadcastStatus::Upcoming, "1/1/2024 10:00:00 PM");
        assert_eq!(time_label(&upcoming, &tokyo), "1/2/2024 7:00:00 AM");

        let missing = b("m", BroadcastStatus::Upcoming, "");
        assert_eq!(time_label(&missing, &tokyo), UNKNOWN_TIME_LABEL);
    }

    #[test]
    fn toggling_filter_changes_rows_not_snapshot() {
        let snapshot = vec![
            b("live", BroadcastStatus::Live, "1/1/2024 09:00:00 AM"),
            b("soon", BroadcastStatus::Upcoming, "1/1/2024 10:00:00 AM"),
        ];
        let before = snapshot.clone();

        let hidden = build_rows(&snapshot, DisplayFilter { show_live: false, show_upcoming: true }, &Utc);
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].title, "title soon");

        let shown = build_rows(&snapshot, BOTH, &Utc);
        assert_eq!(shown.len(), 2);
        assert_eq!(snapshot, before);

        let no_upcoming =
            build_rows(&snapshot, DisplayFilter { show_live: true, show_upcoming: false }, &Utc);
        assert_eq!(no_upcoming.len(), 1);
        assert_eq!(no_upcoming[0].time, LIVE_LABEL);
    }
}
