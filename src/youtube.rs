use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use snafu::{Location, ResultExt, Snafu};
use tracing::instrument;
use url::Url;

use crate::config::{Config, Settings};
use crate::error::{ApplicationError, HttpClientSnafu};
use crate::time::Timestamp;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub fn connect(settings: &Settings) -> Result<YouTube, ApplicationError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context(HttpClientSnafu)?;

    Ok(YouTube::new(client, settings.endpoint.clone()))
}

/// One search result describing an active livestream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveItem {
    pub id: String,
    pub title: String,
    pub channel_title: Option<String>,
    pub published_at: Option<Timestamp>,
}

impl LiveItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            channel_title: None,
            published_at: None,
        }
    }
}

/// Client for the `search.list` endpoint of the YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct YouTube {
    client: reqwest::Client,
    endpoint: Url,
}

impl YouTube {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Search the configured channel for videos that are live right now.
    ///
    /// Only the first page of results is fetched.
    #[instrument(skip(self, config), fields(channel = %config.channel))]
    pub async fn search_live(&self, config: &Config) -> Result<Vec<LiveItem>> {
        let url = self.endpoint.join("search").context(EndpointSnafu {
            endpoint: self.endpoint.to_string(),
        })?;

        let response = self
            .client
            .get(url)
            .query(&[
                ("part", "snippet"),
                ("channelId", config.channel.as_str()),
                ("eventType", "live"),
                ("type", "video"),
                ("key", config.api_key()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context(SendSnafu)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context(SendSnafu)?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let response: SearchListResponse =
            serde_json::from_str(&body).context(InvalidBodySnafu { original: body })?;
        tracing::debug!(?response, "received search response");

        if let Some(token) = &response.next_page_token {
            tracing::warn!(
                next_page_token = %token,
                total_results = response.page_info.as_ref().map(|info| info.total_results),
                "more live items are available than the first page holds"
            );
        }

        Ok(response.items.into_iter().filter_map(SearchResult::into_live_item).collect())
    }
}

fn api_error(status: StatusCode, body: &str) -> YouTubeError {
    let location = Location::default();

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) => YouTubeError::Api {
            status,
            reason: error.errors.into_iter().next().map(|detail| detail.reason),
            message: error.message,
            location,
        },
        Err(_) => YouTubeError::Api {
            status,
            reason: None,
            message: body.to_string(),
            location,
        },
    }
}

/// Response of `search.list`.
///
/// See: <https://developers.google.com/youtube/v3/docs/search/list>
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
    pub next_page_token: Option<String>,
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_results: u64,
    pub results_per_page: u64,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: ResourceId,
    pub snippet: Option<Snippet>,
}

impl SearchResult {
    fn into_live_item(self) -> Option<LiveItem> {
        let Some(id) = self.id.video_id else {
            tracing::warn!(kind = %self.id.kind, "skipping search result without a video id");
            return None;
        };

        let snippet = self.snippet.unwrap_or_default();

        Some(LiveItem {
            id,
            title: snippet.title,
            channel_title: snippet.channel_title,
            published_at: snippet.published_at,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    pub channel_title: Option<String>,
    pub published_at: Option<Timestamp>,
    pub live_broadcast_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: String,
}

pub type Result<T, E = YouTubeError> = ::std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum YouTubeError {
    #[snafu(display("invalid api endpoint `{endpoint}`: {source}"))]
    Endpoint {
        endpoint: String,
        source: url::ParseError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("error occurred while sending the search request: {source}"))]
    Send {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("API returned {status} ({}): {message}", reason.as_deref().unwrap_or("unknown reason")))]
    Api {
        status: StatusCode,
        reason: Option<String>,
        message: String,
        location: Location,
    },

    #[snafu(display("malformed search response: {source}"))]
    InvalidBody {
        original: String,
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },
}
