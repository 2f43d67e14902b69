use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use turnstile_core::{EventLog, StatInterval, run_aggregator, unix_now};

use crate::metrics::Metrics;
use crate::proto::main::{self as v1, admin_server::Admin};

use super::conversions;

const STREAM_BUFFER: usize = 16;

pub struct AdminServiceImpl {
    log: EventLog,
    shutdown: CancellationToken,
    metrics: Option<Arc<Metrics>>,
}

impl AdminServiceImpl {
    pub fn new(log: EventLog, shutdown: CancellationToken) -> Self {
        Self {
            log,
            shutdown,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn stream_opened(&self) -> StreamGuard {
        if let Some(m) = &self.metrics {
            m.record_stream_opened();
        }
        StreamGuard(self.metrics.clone())
    }
}

struct StreamGuard(Option<Arc<Metrics>>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Some(m) = &self.0 {
            m.record_stream_closed();
        }
    }
}

#[tonic::async_trait]
impl Admin for AdminServiceImpl {
    type LoggingStream = ReceiverStream<Result<v1::Event, Status>>;

    async fn logging(
        &self,
        _request: Request<v1::Nothing>,
    ) -> Result<Response<Self::LoggingStream>, Status> {
        let mut subscription = self.log.subscribe();
        let cancel = self.shutdown.child_token();
        let guard = self.stream_opened();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let _guard = guard;
            let id = subscription.id();
            tracing::debug!(subscription = %id, "logging stream opened");

            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tx.closed() => break,
                    event = subscription.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                let sent = tokio::select! {
                    result = tx.send(Ok(conversions::event_to_proto(event))) => result,
                    _ = cancel.cancelled() => break,
                };
                if sent.is_err() {
                    tracing::debug!(subscription = %id, "logging client disconnected");
                    break;
                }
            }

            subscription.unsubscribe();
            tracing::debug!(subscription = %id, "logging stream closed");
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type StatisticsStream = ReceiverStream<Result<v1::Stat, Status>>;

    async fn statistics(
        &self,
        request: Request<v1::StatInterval>,
    ) -> Result<Response<Self::StatisticsStream>, Status> {
        let interval = StatInterval::from_secs(request.into_inner().interval_seconds)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let subscription = self.log.subscribe();
        let cancel = self.shutdown.child_token();
        let guard = self.stream_opened();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let _guard = guard;
            let closed = tx.clone();
            let emit = move |snapshot| {
                let tx = tx.clone();
                async move { tx.send(Ok(conversions::snapshot_to_proto(snapshot))).await }
            };

            tokio::select! {
                _ = closed.closed() => {
                    tracing::debug!("statistics client disconnected");
                }
                _ = run_aggregator(subscription, interval, cancel, emit) => {}
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn snapshot(
        &self,
        request: Request<v1::StatRange>,
    ) -> Result<Response<v1::Stat>, Status> {
        let range = request.into_inner();
        let to = if range.to == 0 { unix_now() } else { range.to };

        if to < range.since {
            return Err(Status::invalid_argument("`to` must not precede `since`"));
        }

        let snapshot = self.log.list_since(range.since, to);
        Ok(Response::new(conversions::snapshot_to_proto(snapshot)))
    }
}
