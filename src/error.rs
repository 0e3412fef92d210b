use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("feed error: {0}")]
    Feed(String),
    #[error("unknown road segment: {0}")]
    UnknownSegment(u32),
    #[error("watch channel send failed")]
    WatchSend,
    #[error("state lock poisoned")]
    StateLock,
}
