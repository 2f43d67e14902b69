use tonic_health::pb::health_server::HealthServer;
use tonic_health::server::HealthReporter;

use crate::grpc::{AdminServiceImpl, BizServiceImpl};
use crate::proto::main::{admin_server::AdminServer, biz_server::BizServer};

pub fn create_health_service() -> (
    HealthReporter,
    HealthServer<impl tonic_health::pb::health_server::Health>,
) {
    tonic_health::server::health_reporter()
}

pub async fn set_serving(reporter: &mut HealthReporter) {
    reporter.set_serving::<AdminServer<AdminServiceImpl>>().await;
    reporter.set_serving::<BizServer<BizServiceImpl>>().await;
}
