#[allow(clippy::all)]
pub mod main {
    tonic::include_proto!("main");
}
