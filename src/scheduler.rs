// src/scheduler.rs
use crate::broadcast::{Broadcast, VideoId};
use crate::config::Config;
use crate::errors::HolodexError;
use crate::event::AppEvent;
use crate::notify::{Notifier, live_alert};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::video_client::{FetchFilter, VideoSourceClient};
use chrono::Utc;
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Periodic,
    Manual,
}

/// Inputs of one refresh cycle, captured from the config when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshQuery {
    pub channels: String,
    pub organizations: String,
    pub filter: FetchFilter,
}

impl RefreshQuery {
    /// Tracks every live and upcoming broadcast regardless of the display
    /// flags, so hidden upcoming entries still raise go-live alerts and a
    /// toggled flag has rows to show right away.
    pub fn from_config(config: &Config) -> Self {
        Self {
            channels: config.channels.clone(),
            organizations: config.organizations.clone(),
            filter: FetchFilter::default(),
        }
    }

    pub fn with_filter(self, filter: FetchFilter) -> Self {
        Self { filter, ..self }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RefreshOutcome {
    pub broadcasts: Vec<Broadcast>,
    /// One line per query that failed this cycle.
    pub failures: Vec<String>,
}

/// Owns the snapshot and decides when refreshes run. At most one refresh is
/// in flight; a manual request made meanwhile is held and runs right after.
#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    state: RefreshState,
    last_completed: Option<Instant>,
    manual_pending: bool,
    store: SnapshotStore,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: RefreshState::Idle,
            last_completed: None,
            manual_pending: false,
            store: SnapshotStore::new(),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn last_completed(&self) -> Option<Instant> {
        self.last_completed
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.current()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_completed {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.interval,
        }
    }

    pub fn request_manual(&mut self) {
        self.manual_pending = true;
    }

    /// Called every frame. Returns the trigger when a refresh should start
    /// now, and moves to `Refreshing`.
    pub fn poll(&mut self, now: Instant) -> Option<RefreshTrigger> {
        if self.state == RefreshState::Refreshing {
            return None;
        }
        let trigger = if self.manual_pending {
            self.manual_pending = false;
            RefreshTrigger::Manual
        } else if self.is_due(now) {
            RefreshTrigger::Periodic
        } else {
            return None;
        };
        self.state = RefreshState::Refreshing;
        Some(trigger)
    }

    /// Applies a finished cycle: reports failures and transitions, swaps the
    /// snapshot, returns to `Idle`. Returns the number of transitions.
    pub fn complete(
        &mut self,
        outcome: RefreshOutcome,
        notifier: &mut impl Notifier,
        now: Instant,
    ) -> usize {
        for failure in &outcome.failures {
            notifier.notify(failure);
        }

        let transitions = self.store.replace(outcome.broadcasts);
        for broadcast in &transitions {
            notifier.notify(&live_alert(broadcast));
        }

        info!(
            "Refresh complete: {} broadcasts tracked, {} went live",
            self.store.current().len(),
            transitions.len()
        );
        self.state = RefreshState::Idle;
        self.last_completed = Some(now);
        transitions.len()
    }
}

/// Concatenates channel results then organization results, keeping the
/// first occurrence of each id.
pub fn merge_results(channel: Vec<Broadcast>, organization: Vec<Broadcast>) -> Vec<Broadcast> {
    let mut seen: HashSet<VideoId> = HashSet::new();
    channel
        .into_iter()
        .chain(organization)
        .filter(|b| seen.insert(b.id().clone()))
        .collect()
}

fn log_query_failure(query: &str, e: &HolodexError) {
    if e.is_transient() {
        warn!("Query '{}' failed, retrying next cycle: {}", query, e);
    } else {
        error!("Query '{}' failed: {}", query, e);
    }
}

/// Runs both query dimensions concurrently and waits for both. A failed
/// query counts as empty and is recorded in `failures`.
pub async fn run_refresh_cycle(client: &VideoSourceClient, query: &RefreshQuery) -> RefreshOutcome {
    let channel_fut = async {
        match client.fetch_by_channels(&query.channels, query.filter).await {
            Ok(videos) => (videos, None),
            Err(e) => {
                log_query_failure("channels", &e);
                (Vec::new(), Some(format!("Holodex request failed (channels): {}", e)))
            }
        }
    };

    let organization_fut = async {
        if query.organizations.is_empty() {
            return (Vec::new(), Vec::new());
        }
        let per_org = join_all(query.organizations.split(',').map(|org| async move {
            (org, client.fetch_by_organization(org, query.filter).await)
        }))
        .await;

        let mut videos = Vec::new();
        let mut failures = Vec::new();
        for (org, result) in per_org {
            match result {
                Ok(found) => videos.extend(found),
                Err(e) => {
                    log_query_failure(org, &e);
                    failures.push(format!("Holodex request failed ({}): {}", org, e));
                }
            }
        }
        (videos, failures)
    };

    let ((channel_videos, channel_failure), (org_videos, mut failures)) =
        tokio::join!(channel_fut, organization_fut);

    debug!(
        "Refresh cycle fetched {} channel and {} organization videos",
        channel_videos.len(),
        org_videos.len()
    );
    if let Some(failure) = channel_failure {
        failures.insert(0, failure);
    }

    RefreshOutcome { broadcasts: merge_results(channel_videos, org_videos), failures }
}

/// Spawns a refresh cycle on `handle`; the outcome comes back as
/// `AppEvent::RefreshCompleted`.
pub fn spawn_refresh(
    handle: &Handle,
    client: Arc<VideoSourceClient>,
    query: RefreshQuery,
    trigger: RefreshTrigger,
    events: UnboundedSender<AppEvent>,
) {
    handle.spawn(async move {
        info!("Starting {:?} refresh", trigger);
        let outcome = run_refresh_cycle(&client, &query).await;
        let event = AppEvent::RefreshCompleted { outcome, trigger, timestamp: Utc::now() };
        if events.send(event).is_err() {
            debug!("Refresh finished after the UI closed; result dropped");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::BroadcastStatus;
    use crate::holodex::FakeVideoSource;
    use crate::notify::NotificationLog;

    fn b(id: &str, status: BroadcastStatus) -> Broadcast {
        Broadcast::new(
            VideoId::new(id),
            format!("title {id}"),
            format!("channel {id}"),
            status,
            "1/1/2024 10:00:00 AM".to_string(),
        )
    }

    fn query(channels: &str, organizations: &str) -> RefreshQuery {
        RefreshQuery {
            channels: channels.to_string(),
            organizations: organizations.to_string(),
            filter: FetchFilter::default(),
        }
    }

    #[test]
    fn first_poll_refreshes_immediately_then_waits_for_interval() {
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(600));
        let start = Instant::now();

        assert_eq!(scheduler.poll(start), Some(RefreshTrigger::Periodic));
        assert_eq!(scheduler.state(), RefreshState::Refreshing);
        assert_eq!(scheduler.poll(start), None);

        scheduler.complete(RefreshOutcome::default(), &mut NotificationLog::default(), start);
        assert_eq!(scheduler.state(), RefreshState::Idle);
        assert_eq!(scheduler.poll(start + Duration::from_secs(599)), None);
        assert_eq!(scheduler.poll(start + Duration::from_secs(600)), Some(RefreshTrigger::Periodic));
    }

    #[test]
    fn manual_request_during_refresh_is_queued_not_overlapped() {
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(600));
        let start = Instant::now();
        scheduler.poll(start);

        scheduler.request_manual();
        scheduler.request_manual();
        assert_eq!(scheduler.poll(start), None);

        scheduler.complete(RefreshOutcome::default(), &mut NotificationLog::default(), start);
        assert_eq!(scheduler.poll(start), Some(RefreshTrigger::Manual));
        scheduler.complete(RefreshOutcome::default(), &mut NotificationLog::default(), start);
        // Both requests were coalesced into one.
        assert_eq!(scheduler.poll(start), None);
    }

    #[test]
    fn query_from_config_ignores_display_flags_until_narrowed() {
        let config = Config {
            channels: "UC1".to_string(),
            show_live: false,
            show_upcoming: false,
            ..Config::default()
        };

        assert_eq!(RefreshQuery::from_config(&config).filter, FetchFilter::default());
        let narrowed = RefreshQuery::from_config(&config).with_filter(config.fetch_filter());
        assert_eq!(narrowed.filter, FetchFilter { live: false, upcoming: false });
        assert_eq!(narrowed.channels, "UC1");
    }

    #[test]
    fn merge_puts_channels_first_and_drops_repeated_ids() {
        let merged = merge_results(
            vec![b("c1", BroadcastStatus::Live), b("shared", BroadcastStatus::Upcoming)],
            vec![b("o1", BroadcastStatus::Upcoming), b("shared", BroadcastStatus::Upcoming)],
        );
        let ids: Vec<&str> = merged.iter().map(|b| b.id().as_str()).collect();
        assert_eq!(ids, vec!["c1", "shared", "o1"]);
    }

    #[tokio::test]
    async fn empty_configuration_yields_empty_snapshot_and_no_notifications() {
        let fake = Arc::new(FakeVideoSource::new());
        let client = VideoSourceClient::new(fake.clone());
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(600));
        let mut log = NotificationLog::default();

        for _ in 0..2 {
            let outcome = run_refresh_cycle(&client, &query("", "")).await;
            scheduler.poll(Instant::now());
            scheduler.complete(outcome, &mut log, Instant::now());
        }

        assert!(scheduler.snapshot().is_empty());
        assert!(log.is_empty());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn failed_query_counts_as_empty_and_other_dimension_survives() {
        let fake = Arc::new(FakeVideoSource::new());
        fake.push_channel_response(Err(HolodexError::Status { status: 503, body: String::new() }));
        fake.push_organization_response("Hololive", Ok(vec![b("o1", BroadcastStatus::Live)]));
        fake.push_organization_response("Nijisanji", Ok(vec![b("o2", BroadcastStatus::Upcoming)]));
        let client = VideoSourceClient::new(fake.clone());

        let outcome = run_refresh_cycle(&client, &query("UC1", "Hololive,Nijisanji")).await;

        let ids: Vec<&str> = outcome.broadcasts.iter().map(|b| b.id().as_str()).collect();
        assert_eq!(ids, vec!["o1", "o2"]);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].contains("channels"));
    }

    #[tokio::test]
    async fn transition_notifies_once_and_updates_snapshot() {
        let fake = Arc::new(FakeVideoSource::new());
        fake.push_channel_response(Ok(vec![b("v1", BroadcastStatus::Upcoming)]));
        fake.push_channel_response(Ok(vec![b("v1", BroadcastStatus::Live)]));
        let client = VideoSourceClient::new(fake.clone());
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(600));
        let mut log = NotificationLog::default();
        let q = query("abc123", "");

        let first = run_refresh_cycle(&client, &q).await;
        assert_eq!(scheduler.complete(first, &mut log, Instant::now()), 0);
        let second = run_refresh_cycle(&client, &q).await;
        assert_eq!(scheduler.complete(second, &mut log, Instant::now()), 1);

        assert_eq!(log.len(), 1);
        assert!(log.latest().unwrap().message.starts_with("channel v1 is live: title v1"));
        assert!(scheduler.snapshot()[0].is_live());
    }

    #[tokio::test]
    async fn spawned_refresh_reports_through_event_channel() {
        let fake = Arc::new(FakeVideoSource::new());
        fake.push_channel_response(Ok(vec![b("v1", BroadcastStatus::Live)]));
        let client = Arc::new(VideoSourceClient::new(fake));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        spawn_refresh(&Handle::current(), client, query("abc", ""), RefreshTrigger::Manual, tx);

        match rx.recv().await {
            Some(AppEvent::RefreshCompleted { outcome, trigger, .. }) => {
                assert_eq!(trigger, RefreshTrigger::Manual);
                assert_eq!(outcome.broadcasts.len(), 1);
            }
            None => panic!("refresh task dropped without reporting"),
        }
    }
}
