use fxview::channel::update_channel;
use fxview::event::UpdateEvent;
use fxview::model::bar::Bar;

#[test]
fn drain_preserves_fifo_order_and_empties_queue() {
    let (tx, mut rx) = update_channel();
    let history = vec![Bar::new(0, 1.0, 1.0, 1.0, 1.0)];
    let bar = Bar::new(60_000, 2.0, 2.0, 2.0, 2.0);

    tx.enqueue_history(history.clone());
    tx.enqueue_bar(bar);
    tx.enqueue_tick(60_001, 2.5, 60_000);

    assert_eq!(
        rx.drain(),
        vec![
            UpdateEvent::History(history),
            UpdateEvent::FinalizedBar(bar),
            UpdateEvent::LiveTick {
                timestamp_ms: 60_001,
                price: 2.5,
                interval_ms: 60_000,
            },
        ]
    );
    assert!(rx.drain().is_empty());
}

#[test]
fn drain_on_empty_queue_returns_immediately() {
    let (_tx, mut rx) = update_channel();
    assert!(rx.drain().is_empty());
}

#[test]
fn enqueue_after_receiver_dropped_does_not_panic() {
    let (tx, rx) = update_channel();
    drop(rx);
    tx.enqueue_tick(0, 1.0, 60_000);
}

#[test]
fn events_from_producer_thread_arrive_in_order() {
    let (tx, mut rx) = update_channel();
    let producer = std::thread::spawn(move || {
        for i in 0..1_000 {
            tx.enqueue_tick(i, i as f64, 60_000);
        }
    });
    producer.join().unwrap();

    let stamps: Vec<i64> = rx
        .drain()
        .into_iter()
        .map(|evt| match evt {
            UpdateEvent::LiveTick { timestamp_ms, .. } => timestamp_ms,
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(stamps, (0..1_000).collect::<Vec<i64>>());
}
