use std::future::Future;

use tracing::instrument;

use crate::config::Config;
use crate::youtube::{LiveItem, YouTube, YouTubeError};

/// Something that can look up the live videos of a channel.
pub trait LiveSearch {
    type Error: std::error::Error + Send + Sync + 'static;

    fn search_live(
        &self, config: &Config,
    ) -> impl Future<Output = Result<Vec<LiveItem>, Self::Error>> + Send;
}

impl LiveSearch for YouTube {
    type Error = YouTubeError;

    fn search_live(
        &self, config: &Config,
    ) -> impl Future<Output = Result<Vec<LiveItem>, Self::Error>> + Send {
        YouTube::search_live(self, config)
    }
}

/// Run a single live search and log what came back.
///
/// Errors are passed through untouched, the caller decides what to do with them.
#[instrument(skip_all, fields(channel = %config.channel))]
pub async fn poll_once<S: LiveSearch>(search: &S, config: &Config) -> Result<Vec<LiveItem>, S::Error> {
    let items = search.search_live(config).await?;

    if items.is_empty() {
        tracing::info!("no livestream");
        return Ok(items);
    }

    tracing::info!(count = items.len(), "found livestreams");
    for item in &items {
        tracing::info!(
            video.id = %item.id,
            video.title = %item.title,
            video.channel = item.channel_title.as_deref(),
            video.published_at = ?item.published_at,
            "live"
        );
    }

    Ok(items)
}
