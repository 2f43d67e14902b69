use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tonic::body::BoxBody;
use tonic::codegen::http;
use tonic::server::NamedService;
use tonic::transport::server::TcpConnectInfo;
use tower::{Layer, Service};
use turnstile_core::{AccessPolicy, CallEvent, EventLog};

use crate::audit;
use crate::metrics::Metrics;

pub const CONSUMER_METADATA_KEY: &str = "consumer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("consumer is not provided")]
    MissingConsumer,

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl From<Denied> for tonic::Status {
    fn from(denied: Denied) -> Self {
        tonic::Status::unauthenticated(denied.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CallGate {
    policy: Arc<AccessPolicy>,
    log: EventLog,
    metrics: Arc<Metrics>,
}

impl CallGate {
    pub fn new(policy: Arc<AccessPolicy>, log: EventLog) -> Self {
        Self {
            policy,
            log,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub async fn admit(
        &self,
        consumer: Option<&str>,
        full_method: &str,
        host: &str,
    ) -> Result<CallEvent, Denied> {
        let Some(consumer) = consumer else {
            return Err(self.deny(Denied::MissingConsumer, None, full_method));
        };

        if !self.policy.is_allowed(consumer, full_method) {
            return Err(self.deny(Denied::MethodNotAllowed, Some(consumer), full_method));
        }

        let event = CallEvent::now(consumer, full_method, host);
        self.log.append(event.clone()).await;

        self.metrics.record_admitted();
        audit::audit_call_admitted(consumer, full_method, host);
        Ok(event)
    }

    fn deny(&self, denied: Denied, consumer: Option<&str>, full_method: &str) -> Denied {
        self.metrics.record_denied();
        audit::audit_call_denied(&denied.to_string(), consumer, full_method);
        denied
    }
}

#[derive(Debug, Clone)]
pub struct GateLayer {
    gate: CallGate,
}

impl GateLayer {
    pub fn new(gate: CallGate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GatedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GatedService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatedService<S> {
    inner: S,
    gate: CallGate,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for GatedService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        // Drive the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();

        Box::pin(async move {
            let consumer = consumer_of(&req).map(str::to_owned);
            let host = peer_host_of(&req);
            let method = req.uri().path().to_owned();

            match gate.admit(consumer.as_deref(), &method, &host).await {
                Ok(_) => inner.call(req).await,
                Err(denied) => Ok(tonic::Status::from(denied).into_http()),
            }
        })
    }
}

impl<S: NamedService> NamedService for GatedService<S> {
    const NAME: &'static str = S::NAME;
}

fn consumer_of<B>(req: &http::Request<B>) -> Option<&str> {
    req.headers()
        .get(CONSUMER_METADATA_KEY)
        .and_then(|v| v.to_str().ok())
}

fn peer_host_of<B>(req: &http::Request<B>) -> String {
    req.extensions()
        .get::<TcpConnectInfo>()
        .and_then(TcpConnectInfo::remote_addr)
        .map(|addr| addr.to_string())
        .unwrap_or_default()
}
