pub mod local_storage;
pub mod naming;
pub mod object_storage;
pub mod s3_storage;
pub mod video_repository;
pub mod video_service;
