// src/holodex.rs
use crate::broadcast::{Broadcast, BroadcastStatus, VideoId};
use crate::errors::HolodexError;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

pub const HOLODEX_API_BASE: &str = "https://holodex.net/api/v2/";

// ===== wire types
#[derive(Debug, Deserialize)]
pub struct ApiVideo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: BroadcastStatus,
    #[serde(default)]
    pub start_scheduled: Option<String>,
    pub channel: ApiChannel,
}

#[derive(Debug, Deserialize)]
pub struct ApiChannel {
    pub name: String,
}

impl From<ApiVideo> for Broadcast {
    fn from(video: ApiVideo) -> Self {
        Broadcast::new(
            VideoId::new(&video.id),
            video.title,
            video.channel.name,
            video.status,
            video.start_scheduled.unwrap_or_default(),
        )
    }
}

// ===== source
/// Raw query seam over the Holodex API. Implementations return everything
/// the API reports; filtering is the caller's job.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn live_by_channels(&self, channel_ids: &[String]) -> Result<Vec<Broadcast>, HolodexError>;

    async fn live_by_organization(&self, organization: &str) -> Result<Vec<Broadcast>, HolodexError>;

    /// Swaps the key used by later queries.
    fn set_api_key(&self, api_key: &str);
}

// ===== Live http source
pub struct HttpVideoSource {
    client: Client,
    base_url: Url,
    api_key: RwLock<String>,
}

impl HttpVideoSource {
    pub fn new(api_key: &str) -> Result<Self, HolodexError> {
        Self::with_base_url(api_key, Url::parse(HOLODEX_API_BASE)?)
    }

    pub fn with_base_url(api_key: &str, base_url: Url) -> Result<Self, HolodexError> {
        const APP_USER_AGENT: &str = concat!("vtschedule/", env!("CARGO_PKG_VERSION"));

        let client: Client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self { client, base_url, api_key: RwLock::new(api_key.to_string()) })
    }

    fn api_key(&self) -> String {
        match self.api_key.read() {
            Ok(key) => key.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key().trim().is_empty()
    }

    async fn get_videos(&self, url: Url) -> Result<Vec<Broadcast>, HolodexError> {
        debug!("HttpVideoSource: GET {}", url);
        let response: Response = self.client.get(url).header("X-APIKEY", self.api_key()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HolodexError::Status { status: status.as_u16(), body });
        }

        let videos: Vec<ApiVideo> = response.json().await?;
        Ok(videos.into_iter().map(Broadcast::from).collect())
    }
}

#[async_trait]
impl VideoSource for HttpVideoSource {
    async fn live_by_channels(&self, channel_ids: &[String]) -> Result<Vec<Broadcast>, HolodexError> {
        if !self.has_key() {
            warn!("HttpVideoSource: no API key configured, skipping channel query");
            return Ok(Vec::new());
        }
        let mut url = self.base_url.join("users/live")?;
        url.query_pairs_mut().append_pair("channels", &channel_ids.join(","));

        let videos = self.get_videos(url).await?;
        info!("HttpVideoSource: {} videos for {} channels", videos.len(), channel_ids.len());
        Ok(videos)
    }

    async fn live_by_organization(&self, organization: &str) -> Result<Vec<Broadcast>, HolodexError> {
        if !self.has_key() {
            warn!("HttpVideoSource: no API key configured, skipping organization '{}'", organization);
            return Ok(Vec::new());
        }
        let mut url = self.base_url.join("live")?;
        url.query_pairs_mut()
            .append_pair("org", organization)
            .append_pair("status", "live,upcoming")
            .append_pair("type", "stream");

        let videos = self.get_videos(url).await?;
        info!("HttpVideoSource: {} videos for organization '{}'", videos.len(), organization);
        Ok(videos)
    }

    fn set_api_key(&self, api_key: &str) {
        match self.api_key.write() {
            Ok(mut key) => *key = api_key.to_string(),
            Err(poisoned) => *poisoned.into_inner() = api_key.to_string(),
        }
        info!("HttpVideoSource: API key updated");
    }
}

// ===== Fake source for testing
/// Scripted source. Channel responses are consumed in order, one per call.
/// Organization responses are queued per organization name and consumed
/// the same way. An exhausted queue answers with an empty list.
#[derive(Default)]
pub struct FakeVideoSource {
    channel_responses: Mutex<VecDeque<Result<Vec<Broadcast>, HolodexError>>>,
    organization_responses: Mutex<HashMap<String, VecDeque<Result<Vec<Broadcast>, HolodexError>>>>,
    calls: AtomicUsize,
    last_channel_query: Mutex<Option<Vec<String>>>,
    api_key: Mutex<Option<String>>,
}

impl FakeVideoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_channel_response(&self, response: Result<Vec<Broadcast>, HolodexError>) {
        if let Ok(mut queue) = self.channel_responses.lock() {
            queue.push_back(response);
        }
    }

    pub fn push_organization_response(
        &self,
        organization: &str,
        response: Result<Vec<Broadcast>, HolodexError>,
    ) {
        if let Ok(mut map) = self.organization_responses.lock() {
            map.entry(organization.to_string()).or_default().push_back(response);
        }
    }

    /// Number of queries that reached the source.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_channel_query(&self) -> Option<Vec<String>> {
        self.last_channel_query.lock().ok().and_then(|q| q.clone())
    }

    /// The last key passed to `set_api_key`, if any.
    pub fn api_key(&self) -> Option<String> {
        self.api_key.lock().ok().and_then(|k| k.clone())
    }
}

#[async_trait]
impl VideoSource for FakeVideoSource {
    async fn live_by_channels(&self, channel_ids: &[String]) -> Result<Vec<Broadcast>, HolodexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_channel_query.lock() {
            *last = Some(channel_ids.to_vec());
        }
        let next = self.channel_responses.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn live_by_organization(&self, organization: &str) -> Result<Vec<Broadcast>, HolodexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .organization_responses
            .lock()
            .ok()
            .and_then(|mut map| map.get_mut(organization).and_then(|q| q.pop_front()));
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn set_api_key(&self, api_key: &str) {
        if let Ok(mut key) = self.api_key.lock() {
            *key = Some(api_key.to_string());
        }
    }
}
