//! Core data models for the video catalog.
//!
//! A video is split across two stores: the binary lives in the object store
//! and the descriptive metadata lives in the repository as a `VideoRecord`.

pub mod format;
pub mod patch;
pub mod video;
pub mod video_id;
