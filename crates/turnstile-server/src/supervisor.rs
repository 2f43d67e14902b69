use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tower::Layer;
use turnstile_core::{AccessPolicy, EventLog};

use crate::error::{ServeError, StartupError};
use crate::grpc::{AdminServiceImpl, BizServiceImpl};
use crate::health;
use crate::interceptor::{CallGate, GateLayer};
use crate::metrics::Metrics;
use crate::proto::main::{admin_server::AdminServer, biz_server::BizServer};

pub struct RunningService {
    local_addr: SocketAddr,
    log: EventLog,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl RunningService {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub async fn wait(self) -> Result<(), ServeError> {
        self.handle.await??;
        Ok(())
    }
}

pub async fn start_service(
    shutdown: CancellationToken,
    listen_addr: &str,
    policy_json: &str,
) -> Result<RunningService, StartupError> {
    start_service_with_metrics(shutdown, listen_addr, policy_json, Arc::new(Metrics::new())).await
}

pub async fn start_service_with_metrics(
    shutdown: CancellationToken,
    listen_addr: &str,
    policy_json: &str,
    metrics: Arc<Metrics>,
) -> Result<RunningService, StartupError> {
    let policy = Arc::new(AccessPolicy::from_json(policy_json)?);

    let bind_error = |source| StartupError::Bind {
        addr: listen_addr.to_string(),
        source,
    };
    let listener = TcpListener::bind(listen_addr).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    let log = EventLog::new();
    let gate = GateLayer::new(
        CallGate::new(Arc::clone(&policy), log.clone()).with_metrics(Arc::clone(&metrics)),
    );

    let admin_svc = gate.layer(AdminServer::new(
        AdminServiceImpl::new(log.clone(), shutdown.clone()).with_metrics(metrics),
    ));
    let biz_svc = gate.layer(BizServer::new(BizServiceImpl::new()));

    let (mut health_reporter, health_service) = health::create_health_service();
    health::set_serving(&mut health_reporter).await;

    tracing::info!(
        %local_addr,
        consumers = policy.len(),
        "turnstile listening"
    );

    let incoming = TcpListenerStream::new(listener);
    let handle = tokio::spawn(async move {
        let result = Server::builder()
            .add_service(health_service)
            .add_service(admin_svc)
            .add_service(biz_svc)
            .serve_with_incoming_shutdown(incoming, async move {
                shutdown.cancelled().await;
                tracing::info!("shutdown requested, no longer accepting connections");
            })
            .await;

        // Keep statuses alive for as long as the server runs.
        drop(health_reporter);
        match &result {
            Ok(()) => tracing::info!("turnstile stopped"),
            Err(e) => tracing::error!(error = %e, "turnstile server error"),
        }
        result
    });

    Ok(RunningService {
        local_addr,
        log,
        handle,
    })
}
