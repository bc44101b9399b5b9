// src/video_client.rs
use crate::broadcast::{Broadcast, BroadcastStatus};
use crate::errors::HolodexError;
use crate::holodex::VideoSource;
use log::debug;
use std::sync::Arc;

/// Which statuses a fetch keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchFilter {
    pub live: bool,
    pub upcoming: bool,
}

impl Default for FetchFilter {
    fn default() -> Self {
        Self { live: true, upcoming: true }
    }
}

/// Generic "holding" streams that are not real scheduled content.
pub fn is_placeholder_stream(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower.contains("free chat") || lower.contains("schedule")
}

/// Keeps live entries when `filter.live`, and upcoming non-placeholder
/// entries when `filter.upcoming`. Every other status is dropped.
pub fn is_tracked(broadcast: &Broadcast, filter: FetchFilter) -> bool {
    match broadcast.status() {
        BroadcastStatus::Live => filter.live,
        BroadcastStatus::Upcoming => filter.upcoming && !is_placeholder_stream(broadcast.title()),
        BroadcastStatus::Other => false,
    }
}

pub struct VideoSourceClient {
    source: Arc<dyn VideoSource>,
}

impl VideoSourceClient {
    pub fn new(source: Arc<dyn VideoSource>) -> Self {
        Self { source }
    }

    /// `channels` is the comma-separated id list from the config. Tokens are
    /// passed through as-is.
    pub async fn fetch_by_channels(
        &self,
        channels: &str,
        filter: FetchFilter,
    ) -> Result<Vec<Broadcast>, HolodexError> {
        if channels.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = channels.split(',').map(str::to_string).collect();
        let videos = self.source.live_by_channels(&ids).await?;
        Ok(retain_tracked(videos, filter))
    }

    pub async fn fetch_by_organization(
        &self,
        organization: &str,
        filter: FetchFilter,
    ) -> Result<Vec<Broadcast>, HolodexError> {
        if organization.is_empty() {
            return Ok(Vec::new());
        }
        let videos = self.source.live_by_organization(organization).await?;
        Ok(retain_tracked(videos, filter))
    }

    pub fn set_api_key(&self, api_key: &str) {
        self.source.set_api_key(api_key);
    }
}

fn retain_tracked(videos: Vec<Broadcast>, filter: FetchFilter) -> Vec<Broadcast> {
    let total = videos.len();
    let kept: Vec<Broadcast> = videos.into_iter().filter(|b| is_tracked(b, filter)).collect();
    debug!("VideoSourceClient: kept {} of {} videos", kept.len(), total);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::VideoId;
    use crate::holodex::FakeVideoSource;

    fn video(id: &str, title: &str, status: BroadcastStatus) -> Broadcast {
        Broadcast::new(
            VideoId::new(id),
            title.to_string(),
            "Channel".to_string(),
            status,
            "1/1/2024 10:00:00 AM".to_string(),
        )
    }

    #[test]
    fn placeholder_detection_is_case_insensitive() {
        assert!(is_placeholder_stream("【FREE CHAT】 room"));
        assert!(is_placeholder_stream("Weekly Schedule"));
        assert!(!is_placeholder_stream("Karaoke night"));
    }

    #[test]
    fn free_chat_only_dropped_while_upcoming() {
        let filter = FetchFilter::default();
        assert!(!is_tracked(&video("a", "Free Chat", BroadcastStatus::Upcoming), filter));
        assert!(is_tracked(&video("a", "Free Chat", BroadcastStatus::Live), filter));
    }

    #[test]
    fn upcoming_respects_its_own_flag() {
        let upcoming = video("a", "Karaoke", BroadcastStatus::Upcoming);
        let live = video("b", "Karaoke", BroadcastStatus::Live);
        let live_only = FetchFilter { live: true, upcoming: false };
        let upcoming_only = FetchFilter { live: false, upcoming: true };

        assert!(!is_tracked(&upcoming, live_only));
        assert!(is_tracked(&live, live_only));
        assert!(is_tracked(&upcoming, upcoming_only));
        assert!(!is_tracked(&live, upcoming_only));
        assert!(!is_tracked(&video("c", "Old", BroadcastStatus::Other), FetchFilter::default()));
    }

    #[tokio::test]
    async fn empty_query_short_circuits_without_network() {
        let fake = Arc::new(FakeVideoSource::new());
        let client = VideoSourceClient::new(fake.clone());

        assert!(client.fetch_by_channels("", FetchFilter::default()).await.unwrap().is_empty());
        assert!(client.fetch_by_organization("", FetchFilter::default()).await.unwrap().is_empty());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn channel_list_is_split_without_trimming() {
        let fake = Arc::new(FakeVideoSource::new());
        fake.push_channel_response(Ok(vec![
            video("v1", "Free Chat", BroadcastStatus::Upcoming),
            video("v2", "Free Chat", BroadcastStatus::Live),
            video("v3", "Singing", BroadcastStatus::Upcoming),
        ]));
        let client = VideoSourceClient::new(fake.clone());

        let result = client.fetch_by_channels("abc, def,,x", FetchFilter::default()).await.unwrap();

        let ids: Vec<&str> = result.iter().map(|b| b.id().as_str()).collect();
        assert_eq!(ids, vec!["v2", "v3"]);
        assert_eq!(
            fake.last_channel_query(),
            Some(vec!["abc".to_string(), " def".to_string(), String::new(), "x".to_string()])
        );
    }
}
