use crate::model::bar::Bar;

/// Chart mutation queued by the feed task for the render loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    History(Vec<Bar>),
    FinalizedBar(Bar),
    LiveTick {
        timestamp_ms: i64,
        price: f64,
        interval_ms: i64,
    },
}

/// Connection state shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedStatus {
    #[default]
    Connecting,
    Connected,
    HistoryLoaded(usize),
    Subscribed,
    Disconnected(String),
}

impl FeedStatus {
    pub fn label(&self) -> String {
        match self {
            FeedStatus::Connecting => "CONNECTING".to_string(),
            FeedStatus::Connected => "CONNECTED".to_string(),
            FeedStatus::HistoryLoaded(n) => format!("HISTORY {}", n),
            FeedStatus::Subscribed => "LIVE".to_string(),
            FeedStatus::Disconnected(reason) => format!("DOWN: {}", reason),
        }
    }
}
