use crate::error::AppError;
use crate::feed::FeedSource;
use serde_json::Value;

/// Scripted outcome for one poll of the mock feed.
#[derive(Debug, Clone)]
pub enum MockFeedStep {
    Snapshot(Value),
    Error(String),
}

/// Feed source replaying a fixed script, one step per poll.
#[derive(Debug)]
pub struct MockFeedSource {
    steps: Vec<MockFeedStep>,
    next_index: usize,
}

impl MockFeedSource {
    pub fn new(steps: Vec<MockFeedStep>) -> Self {
        Self {
            steps,
            next_index: 0,
        }
    }

    pub fn with_snapshots(snapshots: Vec<Value>) -> Self {
        Self::new(snapshots.into_iter().map(MockFeedStep::Snapshot).collect())
    }
}

impl FeedSource for MockFeedSource {
    fn fetch_snapshot(&mut self) -> Result<Value, AppError> {
        let step = self
            .steps
            .get(self.next_index)
            .cloned()
            .unwrap_or_else(|| MockFeedStep::Error("mock feed exhausted".to_string()));
        self.next_index += 1;
        match step {
            MockFeedStep::Snapshot(value) => Ok(value),
            MockFeedStep::Error(reason) => Err(AppError::Feed(reason)),
        }
    }
}
