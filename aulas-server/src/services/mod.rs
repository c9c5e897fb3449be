pub mod assignment;
pub mod assignment_service;
