//! s3-presigned-delete - presigned S3 bulk delete submitted over plain HTTP

pub mod config;
pub mod core;
pub mod s3;

pub use config::Config;
pub use core::Core;
