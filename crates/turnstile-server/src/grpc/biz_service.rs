use tonic::{Request, Response, Status};

use crate::proto::main::{self as v1, biz_server::Biz};

#[derive(Debug, Clone, Default)]
pub struct BizServiceImpl;

impl BizServiceImpl {
    pub fn new() -> Self {
        Self
    }
}

#[tonic::async_trait]
impl Biz for BizServiceImpl {
    async fn check(&self, _request: Request<v1::Nothing>) -> Result<Response<v1::Nothing>, Status> {
        Ok(Response::new(v1::Nothing::default()))
    }

    async fn add(&self, _request: Request<v1::Nothing>) -> Result<Response<v1::Nothing>, Status> {
        Ok(Response::new(v1::Nothing::default()))
    }

    async fn test(&self, _request: Request<v1::Nothing>) -> Result<Response<v1::Nothing>, Status> {
        Ok(Response::new(v1::Nothing::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_biz_method_succeeds() {
        let svc = BizServiceImpl::new();

        assert!(svc.check(Request::new(v1::Nothing::default())).await.is_ok());
        assert!(svc.add(Request::new(v1::Nothing::default())).await.is_ok());
        assert!(svc.test(Request::new(v1::Nothing::default())).await.is_ok());
    }
}
