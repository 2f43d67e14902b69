use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::event::{CallEvent, unix_now};
use crate::log::Subscription;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("statistics interval must be at least one second")]
    ZeroInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInterval(Duration);

impl StatInterval {
    pub fn from_secs(seconds: u64) -> Result<Self, StatsError> {
        if seconds == 0 {
            return Err(StatsError::ZeroInterval);
        }
        Ok(Self(Duration::from_secs(seconds)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatSnapshot {
    pub timestamp: i64,
    pub by_method: HashMap<String, u64>,
    pub by_consumer: HashMap<String, u64>,
}

impl StatSnapshot {
    pub fn total(&self) -> u64 {
        self.by_method.values().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatWindow {
    window_start: i64,
    by_method: HashMap<String, u64>,
    by_consumer: HashMap<String, u64>,
}

impl StatWindow {
    pub fn new(window_start: i64) -> Self {
        Self {
            window_start,
            ..Self::default()
        }
    }

    pub fn record(&mut self, event: &CallEvent) {
        *self.by_method.entry(event.method.clone()).or_insert(0) += 1;
        *self.by_consumer.entry(event.consumer.clone()).or_insert(0) += 1;
    }

    pub fn window_start(&self) -> i64 {
        self.window_start
    }

    pub fn is_empty(&self) -> bool {
        self.by_method.is_empty()
    }

    pub fn take(&mut self, now: i64) -> StatSnapshot {
        self.window_start = now;
        StatSnapshot {
            timestamp: now,
            by_method: std::mem::take(&mut self.by_method),
            by_consumer: std::mem::take(&mut self.by_consumer),
        }
    }
}

pub async fn run_aggregator<F, Fut, E>(
    mut subscription: Subscription,
    interval: StatInterval,
    cancel: CancellationToken,
    mut emit: F,
) where
    F: FnMut(StatSnapshot) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let period = interval.as_duration();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut window = StatWindow::new(unix_now());
    tracing::debug!(
        subscription = %subscription.id(),
        interval_secs = period.as_secs(),
        "statistics aggregation started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = window.take(unix_now());
                let sent = tokio::select! {
                    result = emit(snapshot) => result,
                    _ = cancel.cancelled() => break,
                };
                if let Err(e) = sent {
                    tracing::debug!(error = %e, "statistics receiver gone");
                    break;
                }
            }
            event = subscription.recv() => match event {
                Some(event) => window.record(&event),
                None => break,
            },
        }
    }

    tracing::debug!(subscription = %subscription.id(), "statistics aggregation stopped");
    subscription.unsubscribe();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::EventLog;
    use tokio::sync::mpsc;

    fn spawn_aggregator(
        log: &EventLog,
        seconds: u64,
        cancel: CancellationToken,
    ) -> (
        mpsc::Receiver<StatSnapshot>,
        tokio::task::JoinHandle<()>,
    ) {
        let (tx, rx) = mpsc::channel(8);
        let subscription = log.subscribe();
        let interval = StatInterval::from_secs(seconds).unwrap();
        let handle = tokio::spawn(run_aggregator(subscription, interval, cancel, move |s| {
            let tx = tx.clone();
            async move { tx.send(s).await }
        }));
        (rx, handle)
    }

    #[test]
    fn window_counts_by_method_and_consumer() {
        let mut window = StatWindow::new(0);
        window.record(&CallEvent::new(1, "alice", "/main.Biz/Check", ""));
        window.record(&CallEvent::new(1, "alice", "/main.Biz/Add", ""));
        window.record(&CallEvent::new(2, "bob", "/main.Biz/Check", ""));

        let snapshot = window.take(5);

        assert_eq!(snapshot.timestamp, 5);
        assert_eq!(snapshot.by_method["/main.Biz/Check"], 2);
        assert_eq!(snapshot.by_method["/main.Biz/Add"], 1);
        assert_eq!(snapshot.by_consumer["alice"], 2);
        assert_eq!(snapshot.by_consumer["bob"], 1);
        assert_eq!(snapshot.total(), 3);
    }

    #[test]
    fn take_resets_the_window() {
        let mut window = StatWindow::new(0);
        window.record(&CallEvent::new(1, "alice", "/main.Biz/Check", ""));

        let _ = window.take(10);

        assert!(window.is_empty());
        assert_eq!(window.window_start(), 10);
        assert_eq!(
            window.take(11),
            StatSnapshot {
                timestamp: 11,
                ..StatSnapshot::default()
            }
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert_eq!(StatInterval::from_secs(0), Err(StatsError::ZeroInterval));
        assert_eq!(
            StatInterval::from_secs(3).unwrap().as_duration(),
            Duration::from_secs(3)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_tick_emits_empty_window() {
        let log = EventLog::new();
        let cancel = CancellationToken::new();
        let (mut rx, handle) = spawn_aggregator(&log, 1, cancel.clone());

        let snapshot = rx.recv().await.unwrap();

        assert!(snapshot.by_method.is_empty());
        assert!(snapshot.by_consumer.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_counted_in_the_window_they_arrive_in() {
        let log = EventLog::new();
        let cancel = CancellationToken::new();
        let (mut rx, handle) = spawn_aggregator(&log, 1, cancel.clone());

        log.append(CallEvent::new(1, "alice", "/main.Biz/Check", "")).await;
        log.append(CallEvent::new(1, "alice", "/main.Biz/Check", "")).await;
        log.append(CallEvent::new(1, "bob", "/main.Biz/Add", "")).await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.by_method.get("/main.Biz/Check"), Some(&2));
        assert_eq!(first.by_method.get("/main.Biz/Add"), Some(&1));
        assert_eq!(first.by_consumer.get("alice"), Some(&2));
        assert_eq!(first.by_consumer.get("bob"), Some(&1));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.total(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_and_unsubscribes() {
        let log = EventLog::new();
        let cancel = CancellationToken::new();
        let (_rx, handle) = spawn_aggregator(&log, 60, cancel.clone());
        assert_eq!(log.subscriber_count(), 1);

        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(log.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_emit_terminates_the_loop() {
        let log = EventLog::new();
        let (rx, handle) = spawn_aggregator(&log, 1, CancellationToken::new());
        drop(rx);

        handle.await.unwrap();

        assert_eq!(log.subscriber_count(), 0);
        log.append(CallEvent::new(1, "alice", "/main.Biz/Check", "")).await;
    }
}
