use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Widget},
};

use super::ChartMode;
use crate::model::bar::Bar;
use crate::model::bar_sequence::clamp_last_n;

/// Columns reserved on the right for price labels.
const PRICE_LABEL_WIDTH: u16 = 9;

pub struct PriceChart<'a> {
    bars: &'a [Bar],
    symbol: &'a str,
    mode: ChartMode,
    max_bars: usize,
}

impl<'a> PriceChart<'a> {
    pub fn new(bars: &'a [Bar], symbol: &'a str) -> Self {
        Self {
            bars,
            symbol,
            mode: ChartMode::Candles,
            max_bars: usize::MAX,
        }
    }

    pub fn mode(mut self, mode: ChartMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn max_bars(mut self, n: usize) -> Self {
        self.max_bars = n.max(1);
        self
    }
}

/// Maps prices onto rows of the plot area, highest price on top.
struct PriceScale {
    min: f64,
    range: f64,
    top: u16,
    height: u16,
}

impl PriceScale {
    fn new(min: f64, max: f64, top: u16, height: u16) -> Self {
        let range = max - min;
        let range = if range < 1e-9 { 1.0 } else { range };
        Self {
            min,
            range,
            top,
            height,
        }
    }

    fn row(&self, price: f64) -> u16 {
        let span = self.height.saturating_sub(1) as f64;
        let normalized = ((price - self.min) / self.range).clamp(0.0, 1.0);
        let offset = (normalized * span).round() as u16;
        self.top + self.height.saturating_sub(1) - offset.min(self.height.saturating_sub(1))
    }
}

impl Widget for PriceChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.symbol))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 3 || inner.width < PRICE_LABEL_WIDTH + 2 {
            return;
        }
        if self.bars.is_empty() {
            buf.set_string(
                inner.x + 1,
                inner.y,
                "waiting for history...",
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let plot_width = inner.width - PRICE_LABEL_WIDTH;
        let column_width: u16 = match self.mode {
            ChartMode::Candles => 2,
            ChartMode::Line => 1,
        };
        let fit = (plot_width / column_width).max(1) as usize;
        let visible = clamp_last_n(self.bars, fit.min(self.max_bars));

        let (min_price, max_price) = match self.mode {
            ChartMode::Candles => visible.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, b| {
                (acc.0.min(b.low), acc.1.max(b.high))
            }),
            ChartMode::Line => visible.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, b| {
                (acc.0.min(b.close), acc.1.max(b.close))
            }),
        };
        let scale = PriceScale::new(min_price, max_price, inner.y, inner.height);

        for (i, bar) in visible.iter().enumerate() {
            let x = inner.x + i as u16 * column_width;
            match self.mode {
                ChartMode::Candles => {
                    let color = if bar.is_bullish() {
                        Color::Green
                    } else {
                        Color::Red
                    };
                    for y in scale.row(bar.high)..=scale.row(bar.low) {
                        buf.set_string(x, y, "│", Style::default().fg(color));
                    }
                    let body_top = scale.row(bar.open.max(bar.close));
                    let body_bottom = scale.row(bar.open.min(bar.close));
                    for y in body_top..=body_bottom {
                        buf.set_string(x, y, "█", Style::default().fg(color));
                    }
                }
                ChartMode::Line => {
                    buf.set_string(x, scale.row(bar.close), "•", Style::default().fg(Color::Cyan));
                }
            }
        }

        // Current price line and label
        let label_x = inner.x + plot_width;
        let Some(last) = visible.last() else {
            return;
        };
        let price_row = scale.row(last.close);
        for x in inner.x..label_x {
            if buf[(x, price_row)].symbol() == " " {
                buf.set_string(x, price_row, "╌", Style::default().fg(Color::Yellow));
            }
        }

        let axis_style = Style::default().fg(Color::DarkGray);
        let bottom_row = inner.y + inner.height - 1;
        if price_row != inner.y {
            buf.set_string(label_x, inner.y, format!(" {:.5}", max_price), axis_style);
        }
        if price_row != bottom_row {
            buf.set_string(label_x, bottom_row, format!(" {:.5}", min_price), axis_style);
        }
        buf.set_string(
            label_x,
            price_row,
            format!(" {:.5}", last.close),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_scale_puts_extremes_on_edges() {
        let scale = PriceScale::new(1.0, 2.0, 5, 10);
        assert_eq!(scale.row(2.0), 5);
        assert_eq!(scale.row(1.0), 14);
        assert_eq!(scale.row(10.0), 5);
    }

    #[test]
    fn flat_prices_do_not_divide_by_zero() {
        let scale = PriceScale::new(1.1, 1.1, 0, 4);
        assert_eq!(scale.row(1.1), 3);
    }
}
