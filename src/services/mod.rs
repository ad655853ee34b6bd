pub mod assist_service;
pub mod auth_service;
pub mod file_service;
