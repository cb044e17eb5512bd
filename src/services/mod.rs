pub mod engagement_service;
pub mod notification_service;
pub mod report_service;
