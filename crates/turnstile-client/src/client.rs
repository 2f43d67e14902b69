use std::pin::Pin;

use tokio_stream::{Stream, StreamExt};
use tonic::transport::{Channel, Endpoint};
use turnstile_core::{CallEvent, StatSnapshot};

use crate::config::ClientOptions;
use crate::error::ClientError;
use crate::interceptor::ConsumerInterceptor;
use crate::proto::main::{self as v1, admin_client::AdminClient, biz_client::BizClient};

type InterceptedChannel =
    tonic::service::interceptor::InterceptedService<Channel, ConsumerInterceptor>;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<CallEvent, ClientError>> + Send>>;
pub type StatStream = Pin<Box<dyn Stream<Item = Result<StatSnapshot, ClientError>> + Send>>;

pub struct TurnstileClient {
    admin: AdminClient<InterceptedChannel>,
    biz: BizClient<InterceptedChannel>,
}

impl TurnstileClient {
    pub async fn connect(endpoint: &str, options: ClientOptions) -> Result<Self, ClientError> {
        let mut endpoint = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| ClientError::Connection(e.to_string()))?
            .connect_timeout(options.connect_timeout);
        if let Some(timeout) = options.timeout {
            endpoint = endpoint.timeout(timeout);
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        Self::from_channel(channel, options)
    }

    pub fn from_channel(channel: Channel, options: ClientOptions) -> Result<Self, ClientError> {
        let interceptor = ConsumerInterceptor::new(&options.consumer)?;
        Ok(Self {
            admin: AdminClient::with_interceptor(channel.clone(), interceptor.clone()),
            biz: BizClient::with_interceptor(channel, interceptor),
        })
    }

    pub async fn check(&mut self) -> Result<(), ClientError> {
        self.biz.check(v1::Nothing::default()).await?;
        Ok(())
    }

    pub async fn add(&mut self) -> Result<(), ClientError> {
        self.biz.add(v1::Nothing::default()).await?;
        Ok(())
    }

    pub async fn test(&mut self) -> Result<(), ClientError> {
        self.biz.test(v1::Nothing::default()).await?;
        Ok(())
    }

    pub async fn logging(&mut self) -> Result<EventStream, ClientError> {
        let stream = self
            .admin
            .logging(v1::Nothing::default())
            .await?
            .into_inner();

        Ok(Box::pin(stream.map(|event| {
            event.map(event_from_proto).map_err(ClientError::from)
        })))
    }

    pub async fn statistics(&mut self, interval_seconds: u64) -> Result<StatStream, ClientError> {
        let stream = self
            .admin
            .statistics(v1::StatInterval { interval_seconds })
            .await?
            .into_inner();

        Ok(Box::pin(stream.map(|stat| {
            stat.map(snapshot_from_proto).map_err(ClientError::from)
        })))
    }

    /// Distinct calls with `since <= timestamp <= to`. A `to` of zero means now.
    pub async fn snapshot(&mut self, since: i64, to: i64) -> Result<StatSnapshot, ClientError> {
        let stat = self
            .admin
            .snapshot(v1::StatRange { since, to })
            .await?
            .into_inner();

        Ok(snapshot_from_proto(stat))
    }
}

fn event_from_proto(event: v1::Event) -> CallEvent {
    CallEvent::new(event.timestamp, event.consumer, event.method, event.host)
}

fn snapshot_from_proto(stat: v1::Stat) -> StatSnapshot {
    StatSnapshot {
        timestamp: stat.timestamp,
        by_method: stat.by_method.into_iter().collect(),
        by_consumer: stat.by_consumer.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_from_proto_keeps_fields() {
        let event = event_from_proto(v1::Event {
            timestamp: 7,
            consumer: "biz_user".to_string(),
            method: "/main.Biz/Check".to_string(),
            host: "10.0.0.1".to_string(),
        });

        assert_eq!(event, CallEvent::new(7, "biz_user", "/main.Biz/Check", "10.0.0.1"));
    }

    #[test]
    fn snapshot_from_proto_keeps_counts() {
        let stat = v1::Stat {
            timestamp: 9,
            by_method: [("/main.Biz/Add".to_string(), 3)].into_iter().collect(),
            by_consumer: [("biz_user".to_string(), 3)].into_iter().collect(),
        };

        let snapshot = snapshot_from_proto(stat);

        assert_eq!(snapshot.timestamp, 9);
        assert_eq!(snapshot.by_method.get("/main.Biz/Add"), Some(&3));
        assert_eq!(snapshot.total(), 3);
    }
}
