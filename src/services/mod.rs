pub mod profile_service;
pub mod transfer_service;
pub mod user_repository;
