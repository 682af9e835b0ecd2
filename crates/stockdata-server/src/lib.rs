#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stockdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTTP surface for the stockdata fetchers.
//!
//! - [`ServerConfig`] - Environment-driven settings
//! - [`create_router`] - The axum route table with its middleware stack
//! - [`ApiError`] - Mapping from data errors to HTTP responses

/// Server configuration.
pub mod config;
/// HTTP error responses.
pub mod error;
/// Request logging and default cache headers.
pub mod middleware;
/// Route table and request handlers.
pub mod routes;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::{AppState, create_router};
