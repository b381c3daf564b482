//! # Request Extractors
//!
//! Wrappers around `axum::Json` and `axum::extract::Query` whose
//! rejections are [`ApiError`] bodies, so a malformed payload or query
//! string gets the same `{ "code", "message" }` shape as every other
//! error:
//!
//! ```text
//! GET /api/v2/reports/pnl?from=yesterday
//!   → 400 { "code": "VALIDATION_ERROR", "message": "Failed to deserialize query string: ..." }
//! ```

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
