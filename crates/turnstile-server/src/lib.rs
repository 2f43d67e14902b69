pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod grpc;
pub mod health;
pub mod interceptor;
pub mod metrics;
pub mod proto;
pub mod supervisor;

pub use error::{ServeError, StartupError};
pub use interceptor::{CallGate, Denied, GateLayer, GatedService};
pub use supervisor::{RunningService, start_service, start_service_with_metrics};
