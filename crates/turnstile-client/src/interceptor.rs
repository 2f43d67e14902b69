use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct ConsumerInterceptor {
    consumer: Option<MetadataValue<Ascii>>,
}

impl ConsumerInterceptor {
    pub fn new(consumer: &str) -> Result<Self, ClientError> {
        if consumer.is_empty() {
            return Ok(Self { consumer: None });
        }
        let value = consumer
            .parse()
            .map_err(|_| ClientError::Metadata(format!("invalid consumer name: {consumer:?}")))?;
        Ok(Self {
            consumer: Some(value),
        })
    }
}

impl Interceptor for ConsumerInterceptor {
    fn call(
        &mut self,
        mut request: tonic::Request<()>,
    ) -> Result<tonic::Request<()>, tonic::Status> {
        if let Some(ref consumer) = self.consumer {
            request.metadata_mut().insert("consumer", consumer.clone());
        }
        Ok(request)
    }
}
