pub mod chart_feed;
pub mod pipeline;

pub use chart_feed::ChartFeed;
pub use pipeline::BarPipeline;

use crate::model::bar::Bar;

/// Receiver of decoded feed data. The session calls these in arrival order
/// from a single task.
pub trait FeedHandler {
    /// Initial history, sorted ascending by start time.
    fn on_history(&mut self, bars: Vec<Bar>);

    /// One live best-bid tick.
    fn on_tick(&mut self, timestamp_ms: i64, price: f64);

    /// An authoritative bar pushed by the server.
    fn on_server_bar(&mut self, bar: Bar);
}
