use crate::channel::UpdateReceiver;
use crate::event::UpdateEvent;
use crate::model::bar::Bar;
use crate::model::bar_sequence::BarSequence;

/// Render-side owner of the bar sequence. Only the render loop touches it;
/// the feed task reaches it through the update channel.
#[derive(Debug)]
pub struct ChartFeed {
    updates: UpdateReceiver,
    bars: BarSequence,
}

impl ChartFeed {
    pub fn new(updates: UpdateReceiver) -> Self {
        Self {
            updates,
            bars: BarSequence::new(),
        }
    }

    /// Apply one event. Malformed events are dropped. Returns whether the
    /// sequence changed.
    pub fn apply(&mut self, event: UpdateEvent) -> bool {
        match event {
            UpdateEvent::History(mut bars) => {
                bars.retain(Bar::is_finite);
                self.bars.replace_all(bars);
                true
            }
            UpdateEvent::FinalizedBar(bar) => {
                if !bar.is_finite() {
                    tracing::debug!(start = bar.start_time_ms, "Dropping non-finite bar");
                    return false;
                }
                self.bars.upsert_last_or_append(bar);
                true
            }
            UpdateEvent::LiveTick {
                timestamp_ms,
                price,
                interval_ms,
            } => {
                if !price.is_finite() {
                    return false;
                }
                self.bars
                    .extend_last_with_price(timestamp_ms, price, interval_ms)
            }
        }
    }

    /// Apply everything queued since the last call. Returns whether any
    /// event changed the sequence.
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        for event in self.updates.drain() {
            changed |= self.apply(event);
        }
        changed
    }

    pub fn drain_and_get_current_sequence(&mut self) -> &[Bar] {
        self.drain();
        self.bars.bars()
    }

    pub fn bars(&self) -> &[Bar] {
        self.bars.bars()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::update_channel;

    #[test]
    fn history_drops_non_finite_rows() {
        let (tx, rx) = update_channel();
        let mut feed = ChartFeed::new(rx);
        tx.enqueue_history(vec![
            Bar::new(0, 1.0, 1.0, 1.0, 1.0),
            Bar::new(60_000, f64::NAN, 1.0, 1.0, 1.0),
        ]);
        assert_eq!(feed.drain_and_get_current_sequence().len(), 1);
    }

    #[test]
    fn drain_reports_no_change_when_idle() {
        let (_tx, rx) = update_channel();
        let mut feed = ChartFeed::new(rx);
        assert!(!feed.drain());
        assert!(feed.last_price().is_none());
    }
}
