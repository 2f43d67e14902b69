pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod proto;

pub use client::{EventStream, StatStream, TurnstileClient};
pub use config::ClientOptions;
pub use error::ClientError;
pub use interceptor::ConsumerInterceptor;
