mod admin_service;
mod biz_service;
mod conversions;

pub use admin_service::AdminServiceImpl;
pub use biz_service::BizServiceImpl;
