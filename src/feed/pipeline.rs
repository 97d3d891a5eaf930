use anyhow::{bail, Result};

use super::FeedHandler;
use crate::channel::UpdateSender;
use crate::model::bar::{fold_tick, Bar, CurrentBar};
use crate::session_filter::is_outside_session;

/// Producer side of the chart: filters feed data, folds ticks into the
/// in-progress bar and queues the resulting updates for the render loop.
#[derive(Debug)]
pub struct BarPipeline {
    updates: UpdateSender,
    interval_ms: i64,
    current: Option<CurrentBar>,
}

impl BarPipeline {
    pub fn new(updates: UpdateSender, interval_ms: i64) -> Result<Self> {
        if interval_ms <= 0 {
            bail!("bar interval must be > 0 ms, got {}", interval_ms);
        }
        Ok(Self {
            updates,
            interval_ms,
            current: None,
        })
    }

    pub fn current_bar(&self) -> Option<&CurrentBar> {
        self.current.as_ref()
    }
}

impl FeedHandler for BarPipeline {
    fn on_history(&mut self, bars: Vec<Bar>) {
        let received = bars.len();
        let bars: Vec<Bar> = bars
            .into_iter()
            .filter(|b| b.is_finite() && !is_outside_session(b.start_time_ms))
            .collect();
        if bars.len() != received {
            tracing::debug!(
                received,
                kept = bars.len(),
                "Dropped malformed or off-session history bars"
            );
        }
        tracing::info!(count = bars.len(), "History received");
        self.updates.enqueue_history(bars);
    }

    fn on_tick(&mut self, timestamp_ms: i64, price: f64) {
        if !price.is_finite() {
            tracing::debug!(timestamp_ms, "Skipping tick with non-finite price");
            return;
        }
        if is_outside_session(timestamp_ms) {
            return;
        }

        let Some((rolled_over, next)) =
            fold_tick(self.current, timestamp_ms, price, self.interval_ms)
        else {
            tracing::debug!(timestamp_ms, "Skipping tick outside any interval");
            return;
        };
        if rolled_over {
            if let Some(prev) = self.current.take() {
                tracing::debug!(start = prev.start_time_ms, "Bar finalized");
                self.updates.enqueue_bar(prev.finish());
            }
        }
        self.current = Some(next);

        self.updates.enqueue_bar(next.finish());
        self.updates.enqueue_tick(timestamp_ms, price, self.interval_ms);
    }

    fn on_server_bar(&mut self, bar: Bar) {
        if !bar.is_finite() {
            tracing::debug!(start = bar.start_time_ms, "Skipping malformed server bar");
            return;
        }
        if is_outside_session(bar.start_time_ms) {
            return;
        }
        self.updates.enqueue_bar(bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::update_channel;
    use crate::event::UpdateEvent;

    // Wednesday 2024-01-03 00:00 UTC
    const WED_MS: i64 = 1_704_240_000_000;

    #[test]
    fn rejects_non_positive_interval() {
        let (tx, _rx) = update_channel();
        assert!(BarPipeline::new(tx.clone(), 0).is_err());
        assert!(BarPipeline::new(tx, -60_000).is_err());
    }

    #[test]
    fn rollover_enqueues_previous_bar_before_new_one() {
        let (tx, mut rx) = update_channel();
        let mut p = BarPipeline::new(tx, 60_000).unwrap();
        p.on_tick(WED_MS + 10, 1.0);
        rx.drain();

        p.on_tick(WED_MS + 60_000, 2.0);
        let events = rx.drain();
        assert_eq!(
            events,
            vec![
                UpdateEvent::FinalizedBar(Bar::new(WED_MS, 1.0, 1.0, 1.0, 1.0)),
                UpdateEvent::FinalizedBar(Bar::new(WED_MS + 60_000, 2.0, 2.0, 2.0, 2.0)),
                UpdateEvent::LiveTick {
                    timestamp_ms: WED_MS + 60_000,
                    price: 2.0,
                    interval_ms: 60_000,
                },
            ]
        );
    }

    #[test]
    fn non_finite_tick_leaves_state_untouched() {
        let (tx, mut rx) = update_channel();
        let mut p = BarPipeline::new(tx, 60_000).unwrap();
        p.on_tick(WED_MS, f64::NAN);
        p.on_tick(WED_MS, f64::INFINITY);
        assert!(p.current_bar().is_none());
        assert!(rx.drain().is_empty());
    }
}
