use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use super::ChartMode;
use crate::event::FeedStatus;

pub struct StatusBar<'a> {
    pub symbol: &'a str,
    pub periodicity: &'a str,
    pub feed_status: &'a FeedStatus,
    pub bar_count: usize,
    pub last_price: Option<f64>,
    pub mode: ChartMode,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let status_color = match self.feed_status {
            FeedStatus::Subscribed => Color::Green,
            FeedStatus::Disconnected(_) => Color::Red,
            _ => Color::Yellow,
        };
        let price = self
            .last_price
            .map(|p| format!("{:.5}", p))
            .unwrap_or_else(|| "---".to_string());

        let line = Line::from(vec![
            Span::styled(
                " fxview ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("| ", Style::default().fg(Color::DarkGray)),
            Span::styled(self.symbol, Style::default().fg(Color::Cyan)),
            Span::styled(" ", Style::default()),
            Span::styled(self.periodicity, Style::default().fg(Color::Cyan)),
            Span::styled(" | ", Style::default().fg(Color::DarkGray)),
            Span::styled(self.feed_status.label(), Style::default().fg(status_color)),
            Span::styled(" | ", Style::default().fg(Color::DarkGray)),
            Span::styled(price, Style::default().fg(Color::White)),
            Span::styled(" | ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("bars: {}", self.bar_count),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(" | ", Style::default().fg(Color::DarkGray)),
            Span::styled(self.mode.label(), Style::default().fg(Color::DarkGray)),
        ]);

        buf.set_line(area.x, area.y, &line, area.width);
    }
}

pub struct KeybindBar {
    pub mode: ChartMode,
}

impl Widget for KeybindBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(vec![
            Span::styled(" [Q]", Style::default().fg(Color::Yellow)),
            Span::styled("uit  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[T]", Style::default().fg(Color::Yellow)),
            Span::styled(
                format!(" Switch to {}  ", self.mode.toggled().label()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);

        buf.set_line(area.x, area.y, &line, area.width);
    }
}
