//! Routine Composer - physical-therapy routine authoring
//!
//! Composes a routine from exercises, uploads each exercise's video to
//! object storage through presigned URLs and persists everything to the
//! REST backend as a best-effort sequence of writes.

pub mod backend;
pub mod cli;
pub mod config;
pub mod draft;
pub mod error;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod picker;
pub mod storage;
pub mod upload;
