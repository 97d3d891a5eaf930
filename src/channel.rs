use tokio::sync::mpsc;

use crate::event::UpdateEvent;
use crate::model::bar::Bar;

/// Create the unbounded FIFO between the feed task and the render loop.
pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UpdateSender { tx }, UpdateReceiver { rx })
}

/// Producer half. Enqueueing never blocks.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: mpsc::UnboundedSender<UpdateEvent>,
}

impl UpdateSender {
    pub fn enqueue(&self, event: UpdateEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Update receiver dropped, discarding event");
        }
    }

    pub fn enqueue_history(&self, bars: Vec<Bar>) {
        self.enqueue(UpdateEvent::History(bars));
    }

    pub fn enqueue_bar(&self, bar: Bar) {
        self.enqueue(UpdateEvent::FinalizedBar(bar));
    }

    pub fn enqueue_tick(&self, timestamp_ms: i64, price: f64, interval_ms: i64) {
        self.enqueue(UpdateEvent::LiveTick {
            timestamp_ms,
            price,
            interval_ms,
        });
    }
}

/// Consumer half, owned by the render loop.
#[derive(Debug)]
pub struct UpdateReceiver {
    rx: mpsc::UnboundedReceiver<UpdateEvent>,
}

impl UpdateReceiver {
    /// Take every event queued so far, oldest first. Returns an empty vec
    /// when nothing is pending.
    pub fn drain(&mut self) -> Vec<UpdateEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }
}
