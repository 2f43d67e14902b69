use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    Connection(String),
    Metadata(String),
    Unauthenticated(String),
    InvalidArgument(String),
    Internal(String),
    Timeout,
    Status(tonic::Status),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connection(msg) => write!(f, "connection error: {msg}"),
            ClientError::Metadata(msg) => write!(f, "invalid metadata: {msg}"),
            ClientError::Unauthenticated(msg) => write!(f, "unauthenticated: {msg}"),
            ClientError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            ClientError::Internal(msg) => write!(f, "internal error: {msg}"),
            ClientError::Timeout => write!(f, "request timed out"),
            ClientError::Status(status) => write!(f, "grpc status: {status}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Unauthenticated => {
                ClientError::Unauthenticated(status.message().to_string())
            }
            tonic::Code::InvalidArgument => {
                ClientError::InvalidArgument(status.message().to_string())
            }
            tonic::Code::DeadlineExceeded => ClientError::Timeout,
            tonic::Code::Internal => ClientError::Internal(status.message().to_string()),
            tonic::Code::Unavailable => ClientError::Connection(status.message().to_string()),
            _ => ClientError::Status(status),
        }
    }
}
