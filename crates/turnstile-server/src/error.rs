use turnstile_core::PolicyError;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid access policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("failed to bind '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("grpc transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
