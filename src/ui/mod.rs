pub mod chart;
pub mod dashboard;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;
use serde::Deserialize;

use crate::channel::UpdateReceiver;
use crate::event::FeedStatus;
use crate::feed::ChartFeed;

use chart::PriceChart;
use dashboard::{KeybindBar, StatusBar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Candles,
    Line,
}

impl ChartMode {
    pub fn toggled(self) -> Self {
        match self {
            ChartMode::Candles => ChartMode::Line,
            ChartMode::Line => ChartMode::Candles,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartMode::Candles => "Candles",
            ChartMode::Line => "Line",
        }
    }
}

pub struct AppState {
    pub symbol: String,
    pub periodicity: String,
    pub mode: ChartMode,
    pub visible_bars: usize,
    pub feed_status: FeedStatus,
    pub chart: ChartFeed,
}

impl AppState {
    pub fn new(
        symbol: &str,
        periodicity: &str,
        mode: ChartMode,
        visible_bars: usize,
        updates: UpdateReceiver,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            periodicity: periodicity.to_string(),
            mode,
            visible_bars,
            feed_status: FeedStatus::default(),
            chart: ChartFeed::new(updates),
        }
    }

    /// Apply all queued chart updates. Returns whether a redraw is needed.
    pub fn refresh(&mut self) -> bool {
        self.chart.drain()
    }

    pub fn set_feed_status(&mut self, status: FeedStatus) -> bool {
        if self.feed_status == status {
            return false;
        }
        tracing::info!(status = %status.label(), "Feed status changed");
        self.feed_status = status;
        true
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn last_price(&self) -> Option<f64> {
        self.chart.last_price()
    }
}

pub fn render(frame: &mut Frame, state: &AppState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(6),    // chart
            Constraint::Length(1), // keybinds
        ])
        .split(frame.area());

    frame.render_widget(
        StatusBar {
            symbol: &state.symbol,
            periodicity: &state.periodicity,
            feed_status: &state.feed_status,
            bar_count: state.chart.bars().len(),
            last_price: state.last_price(),
            mode: state.mode,
        },
        outer[0],
    );

    frame.render_widget(
        PriceChart::new(state.chart.bars(), &state.symbol)
            .mode(state.mode)
            .max_bars(state.visible_bars),
        outer[1],
    );

    frame.render_widget(KeybindBar { mode: state.mode }, outer[2]);
}
