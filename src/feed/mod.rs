use crate::error::AppError;
use serde_json::Value;

pub mod adapter;
pub mod http;
pub mod mock;

/// One pull from the upstream realtime feed.
///
/// The snapshot is an arbitrary JSON value; shape is normalized by
/// [`adapter::normalize`]. A fetch error means the feed is unreachable,
/// nothing more: recovery is left to the next poll.
pub trait FeedSource {
    fn fetch_snapshot(&mut self) -> Result<Value, AppError>;
}
