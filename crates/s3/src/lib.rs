//! nav-s3: S3 SDK adapter for s3nav
//!
//! This crate implements the nav-core ObjectStore trait on top of
//! aws-sdk-s3. It is the only crate that depends on the AWS SDK.

mod error;
pub mod client;
pub mod multipart;

pub use client::{S3Client, normalize_region, public_read_policy};
pub use multipart::MultipartConfig;
